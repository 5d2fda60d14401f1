//! [`AttributeCatalog`]: the per-batch lookup table of a website's features
//! and values.
//!
//! Built once at the start of a resolution batch and discarded with it. It is
//! never a process-wide cache: holding it across requests would leak one
//! tenant's vocabulary into another's render.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
  attribute::{Feature, Value},
  id::{FeatureId, ValueId, WebsiteId},
};

// ─── Titles ──────────────────────────────────────────────────────────────────

/// Resolves the display title of a feature or value.
pub trait TitleResolver: Send + Sync {
  fn feature_title(&self, feature: &Feature) -> String;
  fn value_title(&self, value: &Value) -> String;
}

/// Picks the title for a locale, then a fallback locale, then the slug.
#[derive(Debug, Clone)]
pub struct LocaleTitles {
  pub locale:   String,
  pub fallback: Option<String>,
}

impl LocaleTitles {
  pub fn new(locale: impl Into<String>) -> Self {
    Self { locale: locale.into(), fallback: None }
  }

  pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
    self.fallback = Some(fallback.into());
    self
  }

  fn pick(&self, titles: &crate::attribute::Translations, slug: &str) -> String {
    titles
      .get(&self.locale)
      .or_else(|| self.fallback.as_deref().and_then(|l| titles.get(l)))
      .unwrap_or(slug)
      .to_owned()
  }
}

impl TitleResolver for LocaleTitles {
  fn feature_title(&self, feature: &Feature) -> String {
    self.pick(&feature.titles, &feature.slug)
  }

  fn value_title(&self, value: &Value) -> String {
    self.pick(&value.titles, &value.slug)
  }
}

// ─── Resolved records ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedFeature {
  pub id:    FeatureId,
  pub slug:  String,
  pub title: String,
}

/// A value joined with its feature, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedValue {
  pub id:            ValueId,
  pub slug:          String,
  pub title:         String,
  pub feature_id:    FeatureId,
  pub feature_slug:  String,
  pub feature_title: String,
}

// ─── AttributeCatalog ────────────────────────────────────────────────────────

/// Read-only index of one website's features and values.
#[derive(Debug, Clone)]
pub struct AttributeCatalog {
  website_id:     WebsiteId,
  features_by_id: BTreeMap<FeatureId, ResolvedFeature>,
  values_by_id:   BTreeMap<ValueId, ResolvedValue>,
}

impl AttributeCatalog {
  /// Index `features` and `values` for `website_id`.
  ///
  /// Features are visited in ascending id order, then each feature's values
  /// in ascending id order. Features of other websites, and values whose
  /// feature is not indexed, are ignored. A website without features yields
  /// an empty catalog.
  pub fn build(
    website_id: WebsiteId,
    features: &[Feature],
    values: &[Value],
    titles: &dyn TitleResolver,
  ) -> Self {
    let mut own: Vec<&Feature> = features
      .iter()
      .filter(|f| f.website_id == website_id)
      .collect();
    own.sort_by_key(|f| f.id);

    let mut values_by_feature: BTreeMap<FeatureId, Vec<&Value>> = BTreeMap::new();
    for value in values {
      values_by_feature.entry(value.feature_id).or_default().push(value);
    }

    let mut features_by_id = BTreeMap::new();
    let mut values_by_id = BTreeMap::new();

    for feature in own {
      let resolved = ResolvedFeature {
        id:    feature.id,
        slug:  feature.slug.clone(),
        title: titles.feature_title(feature),
      };

      if let Some(vals) = values_by_feature.get_mut(&feature.id) {
        vals.sort_by_key(|v| v.id);
        for value in vals.iter() {
          values_by_id.insert(value.id, ResolvedValue {
            id:            value.id,
            slug:          value.slug.clone(),
            title:         titles.value_title(value),
            feature_id:    feature.id,
            feature_slug:  resolved.slug.clone(),
            feature_title: resolved.title.clone(),
          });
        }
      }

      features_by_id.insert(feature.id, resolved);
    }

    tracing::debug!(
      website = %website_id,
      features = features_by_id.len(),
      values = values_by_id.len(),
      "built attribute catalog"
    );

    Self { website_id, features_by_id, values_by_id }
  }

  pub fn website_id(&self) -> WebsiteId { self.website_id }

  pub fn feature(&self, id: FeatureId) -> Option<&ResolvedFeature> {
    self.features_by_id.get(&id)
  }

  pub fn value(&self, id: ValueId) -> Option<&ResolvedValue> {
    self.values_by_id.get(&id)
  }

  pub fn features(&self) -> impl Iterator<Item = &ResolvedFeature> {
    self.features_by_id.values()
  }

  pub fn values(&self) -> impl Iterator<Item = &ResolvedValue> {
    self.values_by_id.values()
  }

  pub fn is_empty(&self) -> bool { self.features_by_id.is_empty() }
}
