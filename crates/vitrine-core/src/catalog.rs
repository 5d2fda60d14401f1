//! Catalogs and their declared defaults.

use serde::{Deserialize, Serialize};

use crate::{
  attribute::{Feature, Value},
  id::{CatalogId, FeatureId, ValueId, WebsiteId},
};

/// A group of products within a website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
  pub id:         CatalogId,
  pub slug:       String,
  pub website_id: WebsiteId,
}

/// Input to [`crate::store::CatalogStore::create_catalog`].
#[derive(Debug, Clone)]
pub struct NewCatalog {
  pub website_id: WebsiteId,
  pub slug:       String,
}

/// The features and values every product of a catalog must carry.
///
/// Fetched once per catalog per resolution batch and shared by all of that
/// catalog's products.
#[derive(Debug, Clone)]
pub struct CatalogDefaults {
  pub catalog_id: CatalogId,
  /// Default values, ascending by id.
  pub values:     Vec<Value>,
  /// Default features, ascending by id.
  pub features:   Vec<Feature>,
}

impl CatalogDefaults {
  pub fn has_feature(&self, id: FeatureId) -> bool {
    self.features.iter().any(|f| f.id == id)
  }

  pub fn has_value(&self, id: ValueId) -> bool {
    self.values.iter().any(|v| v.id == id)
  }
}
