use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgConnectOptions;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the server binds to and the host embedded in generated URLs.
    /// Set via HOST. Default: the machine's primary network address.
    pub host: String,
    /// Set via PORT. Default: 3000.
    pub port: u16,
    pub db: DbConfig,
    /// Root of the generated QR images, served at `/`.
    /// Set via IMAGE_DIR. Default: `images`.
    pub image_dir: PathBuf,
    /// Minimum edge length in pixels of a rendered QR code.
    pub qr_min_size: u32,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full connection string. When present it wins over the DB_* parts.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    /// How long a query waits for a pooled connection before failing.
    /// Set via DB_ACQUIRE_TIMEOUT_SECS. Default: 30.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse::<PgConnectOptions>()
                .context("DATABASE_URL is not a valid postgres connection string");
        }

        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database))
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    Ok(from_lookup(|key| std::env::var(key).ok()))
}

/// Build a [`Config`] from an arbitrary variable source.
/// `load` feeds it the process environment; tests feed it a map.
pub fn from_lookup<F>(lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    Config {
        host: non_empty("HOST").unwrap_or_else(|| network_address().to_string()),
        port: non_empty("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000),
        db: DbConfig {
            url: non_empty("DATABASE_URL"),
            host: non_empty("DB_HOST").unwrap_or_else(|| "localhost".into()),
            port: non_empty("DB_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5432),
            user: non_empty("DB_USER").unwrap_or_else(|| "postgres".into()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            database: non_empty("DB_DATABASE").unwrap_or_else(|| "qrpass".into()),
            max_connections: non_empty("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(
                non_empty("DB_ACQUIRE_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
        },
        image_dir: non_empty("IMAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("images")),
        qr_min_size: non_empty("QR_MIN_SIZE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(256),
    }
}

/// Best-effort lookup of the address other machines would reach us on.
/// Connecting a UDP socket sends nothing; it only asks the kernel for a route.
fn network_address() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
