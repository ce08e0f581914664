use serde::Serialize;

/// One row of a unit's `<unit>_urls` table.
///
/// `used` and `result` are only ever read here; nothing in this service
/// writes them after the row is created.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TokenRecord {
    pub id: i32,
    pub token: String,
    pub used: bool,
    pub result: i32,
}

/// What a successful issue hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub id: i32,
    pub token: String,
    pub url: String,
    pub image_path: std::path::PathBuf,
}
