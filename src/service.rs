//! Token issuance and redemption.
//!
//! `TokenService` is the single place the three unit operations live; the
//! HTTP handlers and the CLI subcommands are thin callers.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::Config;
use crate::errors::AppError;
use crate::models::{IssuedToken, TokenRecord, Unit};
use crate::qr::QrRenderer;
use crate::store::postgres::PgStore;

#[derive(Clone)]
pub struct TokenService {
    db: PgStore,
    qr: QrRenderer,
    base_url: String,
    image_dir: PathBuf,
}

impl TokenService {
    pub fn new(db: PgStore, cfg: &Config) -> anyhow::Result<Self> {
        let base_url = base_url(&cfg.host, cfg.port)?;
        Ok(Self {
            db,
            qr: QrRenderer::new(cfg.qr_min_size),
            base_url,
            image_dir: cfg.image_dir.clone(),
        })
    }

    pub fn db(&self) -> &PgStore {
        &self.db
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// `http://<host>:<port>/<unit>/<token>`
    pub fn token_url(&self, unit: &Unit, token: &str) -> String {
        format!("{}/{}/{}", self.base_url, unit, token)
    }

    /// `<image_dir>/<unit>/<token>.png`
    pub fn image_path(&self, unit: &Unit, token: &str) -> PathBuf {
        self.image_dir
            .join(unit.as_str())
            .join(format!("{token}.png"))
    }

    pub async fn init_unit(&self, unit: &Unit) -> Result<(), AppError> {
        self.db.create_unit_table(unit).await?;
        tracing::info!(
            unit = %unit,
            table = %unit.table_name(),
            "table has been created or already exists"
        );
        Ok(())
    }

    /// Store a fresh token for `unit` and render its QR image.
    ///
    /// The row is written before the image; if rendering fails the row
    /// stays and the error is returned to the caller.
    pub async fn issue(&self, unit: &Unit) -> Result<IssuedToken, AppError> {
        let token = uuid::Uuid::new_v4().to_string();
        let id = self.db.insert_token(unit, &token).await?;

        let url = self.token_url(unit, &token);
        let unit_dir = self.image_dir.join(unit.as_str());
        tokio::fs::create_dir_all(&unit_dir).await?;

        let image_path = self.image_path(unit, &token);
        if let Err(e) = self.qr.write_png(&image_path, &url).await {
            tracing::error!(
                unit = %unit,
                token = %token,
                path = %image_path.display(),
                "failed to write QR image: {}",
                e
            );
            return Err(e);
        }

        tracing::info!(unit = %unit, id, url = %url, "issued token");
        Ok(IssuedToken {
            id,
            token,
            url,
            image_path,
        })
    }

    pub async fn resolve(&self, unit: &Unit, token: &str) -> Result<TokenRecord, AppError> {
        match self.db.find_token(unit, token).await? {
            Some(record) => {
                tracing::debug!(unit = %unit, id = record.id, "resolved token");
                Ok(record)
            }
            None => Err(AppError::TokenNotFound),
        }
    }
}

/// `http://<host>:<port>` with the port always spelled out, even when it
/// is the scheme default.
fn base_url(host: &str, port: u16) -> anyhow::Result<String> {
    let base = format!("http://{host}:{port}");
    url::Url::parse(&base).with_context(|| format!("HOST '{host}' does not form a valid URL"))?;
    Ok(base)
}
