//! Error types for `vitrine-core`.

use thiserror::Error;

use crate::id::{CatalogId, FeatureId, ProductId, ValueId, WebsiteId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("feature not found: {0}")]
  UnknownFeature(FeatureId),

  #[error("value not found: {0}")]
  UnknownValue(ValueId),

  #[error("value {value} does not belong to feature {feature}")]
  ValueFeatureMismatch { feature: FeatureId, value: ValueId },

  /// Removal refused because the catalog declares the attribute as default.
  #[error(
    "feature {feature} (value {value:?}) is a default of catalog {catalog}"
  )]
  CatalogDefault {
    catalog: CatalogId,
    feature: FeatureId,
    value:   Option<ValueId>,
  },

  #[error("catalog not found: {0}")]
  CatalogNotFound(CatalogId),

  #[error("product not found: {0}")]
  ProductNotFound(ProductId),

  #[error("catalog {catalog} belongs to website {actual}, batch is for {expected}")]
  TenantMismatch {
    catalog:  CatalogId,
    expected: WebsiteId,
    actual:   WebsiteId,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error into [`Error::Store`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
