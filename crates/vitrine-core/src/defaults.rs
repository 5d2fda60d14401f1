//! Rendering-ready views over a decoded [`Projection`].
//!
//! Pure functions: no persistence, no I/O. Missing data is represented as
//! `false` or an empty map, never as an error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

use crate::{
  attribute_catalog::ResolvedValue,
  id::ProductId,
  projection::Projection,
  slug::content_key,
};

// ─── Unique defaults ─────────────────────────────────────────────────────────

/// The single value shown in a named slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueDefault {
  /// Display title of the slot; the value's title.
  pub title:         String,
  /// Feature slug.
  pub feature:       String,
  pub feature_title: String,
  /// Value slug.
  pub value:         String,
  pub value_title:   String,
}

impl From<&ResolvedValue> for UniqueDefault {
  fn from(v: &ResolvedValue) -> Self {
    Self {
      title:         v.title.clone(),
      feature:       v.feature_slug.clone(),
      feature_title: v.feature_title.clone(),
      value:         v.slug.clone(),
      value_title:   v.title.clone(),
    }
  }
}

/// A unique-default slot. Serialises [`UniqueSlot::Missing`] as the literal
/// `false` so consumers can tell "not configured" apart from an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueSlot {
  Missing,
  Found(UniqueDefault),
}

impl UniqueSlot {
  pub fn is_missing(&self) -> bool { matches!(self, Self::Missing) }

  pub fn found(&self) -> Option<&UniqueDefault> {
    match self {
      Self::Found(d) => Some(d),
      Self::Missing => None,
    }
  }
}

impl Serialize for UniqueSlot {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Self::Missing => serializer.serialize_bool(false),
      Self::Found(d) => d.serialize(serializer),
    }
  }
}

/// For each `output key → feature slug` alias, the lowest-position resolved
/// value of that feature, or [`UniqueSlot::Missing`].
pub fn unique_defaults(
  projection: &Projection,
  aliases: &BTreeMap<String, String>,
) -> BTreeMap<String, UniqueSlot> {
  aliases
    .iter()
    .map(|(key, feature_slug)| {
      let slot = projection
        .by_feature_slug(feature_slug)
        .and_then(|by_position| by_position.values().next())
        .map_or(UniqueSlot::Missing, |v| UniqueSlot::Found(v.into()));
      (key.clone(), slot)
    })
    .collect()
}

// ─── Multi defaults ──────────────────────────────────────────────────────────

/// For each `output key → feature slug`, the feature's resolved values keyed
/// by [`content_key`] of their title.
///
/// Keys order the output, so reordering positions does not reshuffle a group.
/// Two titles with the same key collide: the later position replaces the
/// earlier one.
pub fn multi_defaults(
  projection: &Projection,
  slugs: &BTreeMap<String, String>,
) -> BTreeMap<String, BTreeMap<String, ResolvedValue>> {
  slugs
    .iter()
    .map(|(key, feature_slug)| {
      let mut group = BTreeMap::new();
      if let Some(by_position) = projection.by_feature_slug(feature_slug) {
        for value in by_position.values() {
          group.insert(content_key(&value.title), value.clone());
        }
      }
      (key.clone(), group)
    })
    .collect()
}

// ─── Product view ────────────────────────────────────────────────────────────

/// Which features feed which named slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewConfig {
  /// Output key → feature slug, one value per slot.
  #[serde(default)]
  pub unique: BTreeMap<String, String>,
  /// Output key → feature slug, values grouped by content key.
  #[serde(default)]
  pub multi:  BTreeMap<String, String>,
}

/// The read model handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
  pub product: ProductId,
  pub unique:  BTreeMap<String, UniqueSlot>,
  pub multi:   BTreeMap<String, BTreeMap<String, ResolvedValue>>,
}

pub fn render(
  product: ProductId,
  projection: &Projection,
  config: &ViewConfig,
) -> ProductView {
  ProductView {
    product,
    unique: unique_defaults(projection, &config.unique),
    multi: multi_defaults(projection, &config.multi),
  }
}
