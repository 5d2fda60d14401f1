//! Error type for `vitrine-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vitrine_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("feature not found: {0}")]
  FeatureNotFound(vitrine_core::id::FeatureId),

  #[error("value not found: {0}")]
  ValueNotFound(vitrine_core::id::ValueId),

  #[error("catalog not found: {0}")]
  CatalogNotFound(vitrine_core::id::CatalogId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
