//! Features and values, the per-website attribute vocabulary.
//!
//! A feature is an attribute category ("color"); a value is one possible
//! answer to it ("red"). Both carry localised titles.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{FeatureId, ValueId, WebsiteId};

// ─── Titles ──────────────────────────────────────────────────────────────────

/// Display titles keyed by locale (e.g. `"en"`, `"fr"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(BTreeMap<String, String>);

impl Translations {
  pub fn new() -> Self { Self::default() }

  /// Builder-style insert, handy for fixtures and seeding.
  pub fn with(mut self, locale: &str, title: &str) -> Self {
    self.0.insert(locale.to_owned(), title.to_owned());
    self
  }

  pub fn get(&self, locale: &str) -> Option<&str> {
    self.0.get(locale).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

// ─── Feature ─────────────────────────────────────────────────────────────────

/// An attribute category scoped to one website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
  pub id:         FeatureId,
  pub slug:       String,
  pub website_id: WebsiteId,
  pub titles:     Translations,
}

/// Input to [`crate::store::CatalogStore::create_feature`].
#[derive(Debug, Clone)]
pub struct NewFeature {
  pub website_id: WebsiteId,
  pub slug:       String,
  pub titles:     Translations,
}

// ─── Value ───────────────────────────────────────────────────────────────────

/// One possible value of a [`Feature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
  pub id:         ValueId,
  pub slug:       String,
  pub feature_id: FeatureId,
  pub titles:     Translations,
}

/// Input to [`crate::store::CatalogStore::create_value`].
#[derive(Debug, Clone)]
pub struct NewValue {
  pub feature_id: FeatureId,
  pub slug:       String,
  pub titles:     Translations,
}
