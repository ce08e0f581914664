//! End-to-end token flow against a real Postgres.
//!
//! **Requirements:**
//! - PostgreSQL reachable through DATABASE_URL
//! - Without it every test here returns early.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use qrpass::config::{self, Config};
use qrpass::errors::AppError;
use qrpass::models::Unit;
use qrpass::service::TokenService;
use qrpass::store::postgres::PgStore;
use qrpass::{api, AppState};

struct Harness {
    app: Router,
    tokens: TokenService,
    unit: Unit,
    images: TempDir,
}

impl Harness {
    async fn new() -> Option<Self> {
        if std::env::var("DATABASE_URL").is_err() {
            eprintln!("DATABASE_URL not set, skipping");
            return None;
        }

        let images = tempfile::tempdir().unwrap();
        let mut cfg: Config = config::from_lookup(|k| std::env::var(k).ok());
        cfg.host = "127.0.0.1".into();
        cfg.port = 3000;
        cfg.image_dir = images.path().to_path_buf();

        let db = PgStore::connect(&cfg.db).await.unwrap();
        let tokens = TokenService::new(db, &cfg).unwrap();
        let app = api::router(Arc::new(AppState {
            tokens: tokens.clone(),
        }));

        // Fresh unit per test so runs never see each other's rows.
        let simple = uuid::Uuid::new_v4().simple().to_string();
        let unit = Unit::parse(&format!("t{}", &simple[..16])).unwrap();

        Some(Self {
            app,
            tokens,
            unit,
            images,
        })
    }

    async fn get(&self, uri: &str) -> (StatusCode, String) {
        let resp = self
            .app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    async fn cleanup(self) {
        let table = self.unit.table_name();
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(self.tokens.db().pool())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_init_is_idempotent() {
    let Some(h) = Harness::new().await else { return };

    for _ in 0..2 {
        let (status, body) = h.get(&format!("/init/{}", h.unit)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, format!("Initialized or already exists for unit: {}", h.unit));
    }

    let columns: Vec<String> = sqlx::query_scalar(
        "SELECT column_name::TEXT FROM information_schema.columns WHERE table_name = $1 ORDER BY ordinal_position",
    )
    .bind(h.unit.table_name())
    .fetch_all(h.tokens.db().pool())
    .await
    .unwrap();
    assert_eq!(columns, ["id", "token", "used", "result"]);

    h.cleanup().await;
}

#[tokio::test]
async fn test_concurrent_inits_all_succeed() {
    let Some(h) = Harness::new().await else { return };
    let uri = format!("/init/{}", h.unit);

    let (a, b, c, d) = tokio::join!(h.get(&uri), h.get(&uri), h.get(&uri), h.get(&uri));
    for (status, body) in [a, b, c, d] {
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    // The table is usable after the race.
    h.tokens.issue(&h.unit).await.unwrap();

    h.cleanup().await;
}

#[tokio::test]
async fn test_generate_then_resolve() {
    let Some(h) = Harness::new().await else { return };
    h.get(&format!("/init/{}", h.unit)).await;

    let (status, body) = h.get(&format!("/generate/{}", h.unit)).await;
    assert_eq!(status, StatusCode::OK);

    let prefix = format!("Generated URL for unit {}: http://127.0.0.1:3000/{}/", h.unit, h.unit);
    let token = body
        .strip_prefix(&prefix)
        .unwrap_or_else(|| panic!("unexpected body: {body}"))
        .to_string();
    assert!(uuid::Uuid::parse_str(&token).is_ok());

    let record = h.tokens.resolve(&h.unit, &token).await.unwrap();
    assert_eq!(record.token, token);
    assert!(!record.used);
    assert_eq!(record.result, 0);

    let image = h.images.path().join(h.unit.as_str()).join(format!("{token}.png"));
    assert!(image.exists(), "QR image must be written before the response");

    let (status, body) = h.get(&format!("/{}/{}", h.unit, token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!("Accessed URL for unit {}: {}", h.unit, token));

    let other = uuid::Uuid::new_v4();
    let (status, body) = h.get(&format!("/{}/{}", h.unit, other)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Not Found");

    let (status, _) = h.get(&format!("/{}/{}.png", h.unit, token)).await;
    assert_eq!(status, StatusCode::OK);

    h.cleanup().await;
}

#[tokio::test]
async fn test_uninitialized_unit_is_consistently_not_found() {
    let Some(h) = Harness::new().await else { return };

    let (status, _) = h.get(&format!("/generate/{}", h.unit)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = h.get(&format!("/{}/{}", h.unit, uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Not Found");

    let err = h.tokens.issue(&h.unit).await.unwrap_err();
    assert!(matches!(err, AppError::UnitNotInitialized(_)));
    assert!(
        !h.images.path().join(h.unit.as_str()).exists(),
        "no image directory for a unit that was never initialized"
    );

    h.cleanup().await;
}

#[tokio::test]
async fn test_image_write_failure_is_500_and_keeps_the_row() {
    let Some(h) = Harness::new().await else { return };
    h.tokens.init_unit(&h.unit).await.unwrap();

    // A regular file where the image directory should be.
    let blocker = h.images.path().join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();
    let mut cfg: Config = config::from_lookup(|k| std::env::var(k).ok());
    cfg.host = "127.0.0.1".into();
    cfg.image_dir = blocker;
    let tokens = TokenService::new(h.tokens.db().clone(), &cfg).unwrap();
    let app = api::router(Arc::new(AppState { tokens }));

    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/generate/{}", h.unit))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", h.unit.table_name()))
        .fetch_one(h.tokens.db().pool())
        .await
        .unwrap();
    assert_eq!(rows, 1, "the inserted row stays when the image cannot be written");

    h.cleanup().await;
}

#[tokio::test]
async fn test_concurrent_generates_do_not_interfere() {
    let Some(h) = Harness::new().await else { return };
    h.tokens.init_unit(&h.unit).await.unwrap();

    let (a, b) = tokio::join!(h.tokens.issue(&h.unit), h.tokens.issue(&h.unit));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.token, b.token);
    assert_ne!(a.id, b.id);
    assert_ne!(a.image_path, b.image_path);
    assert!(a.image_path.exists());
    assert!(b.image_path.exists());

    h.cleanup().await;
}
