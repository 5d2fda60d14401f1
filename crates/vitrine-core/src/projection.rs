//! Decoding a product's stored JSON projection into queryable indexes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
  attribute_catalog::{AttributeCatalog, ResolvedValue},
  id::{FeatureId, ValueId},
  product::Product,
};

/// Immutable snapshot of a decoded projection.
///
/// Every map iterates in ascending key order (value id, feature id, or entry
/// position). Decoding again is the only way to observe later writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
  by_ids:                 BTreeMap<ValueId, ResolvedValue>,
  by_feature_slug:        BTreeMap<String, BTreeMap<i64, ResolvedValue>>,
  by_feature_id:          BTreeMap<FeatureId, BTreeMap<i64, ResolvedValue>>,
  features_present_by_id: BTreeSet<FeatureId>,
  /// Entries pointing at features or values that no longer exist.
  #[serde(skip)]
  dangling:               usize,
}

impl Projection {
  pub fn value(&self, id: ValueId) -> Option<&ResolvedValue> {
    self.by_ids.get(&id)
  }

  pub fn has_value(&self, id: ValueId) -> bool { self.by_ids.contains_key(&id) }

  /// Whether a feature-only entry (no chosen value) exists for `id`.
  pub fn has_feature(&self, id: FeatureId) -> bool {
    self.features_present_by_id.contains(&id)
  }

  /// Resolved values of a feature keyed by entry position.
  pub fn by_feature_slug(&self, slug: &str) -> Option<&BTreeMap<i64, ResolvedValue>> {
    self.by_feature_slug.get(slug)
  }

  pub fn by_feature_id(&self, id: FeatureId) -> Option<&BTreeMap<i64, ResolvedValue>> {
    self.by_feature_id.get(&id)
  }

  pub fn values(&self) -> impl Iterator<Item = &ResolvedValue> { self.by_ids.values() }

  pub fn features_present(&self) -> impl Iterator<Item = FeatureId> + '_ {
    self.features_present_by_id.iter().copied()
  }

  /// Number of entries skipped because their reference no longer resolves.
  pub fn dangling(&self) -> usize { self.dangling }
}

/// Decode `product`'s JSON projection against `catalog`.
///
/// Entries are visited in ascending key order. A value entry is indexed by
/// value id, feature slug and feature id; a feature-only entry marks its
/// feature as present. Entries whose feature or value cannot be resolved are
/// skipped.
pub fn decode(product: &Product, catalog: &AttributeCatalog) -> Projection {
  let mut out = Projection::default();

  for (key, entry) in product.json_projection.iter() {
    match entry.value {
      Some(value_id) => {
        let Some(resolved) = catalog.value(value_id) else {
          tracing::debug!(
            product = %product.id,
            key,
            value = %value_id,
            "skipping projection entry with dangling value"
          );
          out.dangling += 1;
          continue;
        };
        out
          .by_feature_slug
          .entry(resolved.feature_slug.clone())
          .or_default()
          .insert(entry.position, resolved.clone());
        out
          .by_feature_id
          .entry(resolved.feature_id)
          .or_default()
          .insert(entry.position, resolved.clone());
        out.by_ids.insert(value_id, resolved.clone());
      }
      None => {
        if catalog.feature(entry.feature).is_some() {
          out.features_present_by_id.insert(entry.feature);
        } else {
          tracing::debug!(
            product = %product.id,
            key,
            feature = %entry.feature,
            "skipping projection entry with dangling feature"
          );
          out.dangling += 1;
        }
      }
    }
  }

  out
}
