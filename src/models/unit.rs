use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::AppError;

/// Unit names double as SQL identifiers and directory names, so only a
/// conservative ASCII shape is accepted.
static UNIT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{0,47}$").expect("unit pattern is valid")
});

/// A validated unit name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit(String);

impl Unit {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if UNIT_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(AppError::InvalidUnit(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the table backing this unit. Postgres folds unquoted
    /// identifiers to lower case, so `Lobby` and `lobby` share a table.
    pub fn table_name(&self) -> String {
        format!("{}_urls", self.0.to_ascii_lowercase())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
