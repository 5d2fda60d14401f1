//! Products, their attribute assignments and the stored JSON projection.
//!
//! An [`Assignment`] row links a product to a feature and, optionally, one of
//! its values. The [`JsonProjection`] is a denormalised copy of the same facts
//! keyed by position, persisted next to the product for the read path. The
//! assignment rows are the source of truth; the projection is regenerated from
//! them with [`Product::rebuild_projection`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
  Result,
  id::{AssignmentId, CatalogId, FeatureId, ProductId, ValueId},
};

// ─── Entry ───────────────────────────────────────────────────────────────────

/// One slot of a product's JSON projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
  pub feature:          FeatureId,
  pub value:            Option<ValueId>,
  #[serde(default)]
  pub display_in_array: bool,
  pub position:         i64,
}

impl Entry {
  pub fn from_assignment(a: &Assignment) -> Self {
    Self {
      feature:          a.feature_id,
      value:            a.value_id,
      display_in_array: a.display_in_array,
      position:         a.position,
    }
  }
}

// ─── JsonProjection ──────────────────────────────────────────────────────────

/// The persisted `json_values` blob: position → [`Entry`].
///
/// Serialises as a JSON object with string-encoded integer keys. Older rows
/// may hold `[]` or a plain list of entries; both decode, keyed by each
/// entry's own `position`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JsonProjection(BTreeMap<i64, Entry>);

impl JsonProjection {
  pub fn new() -> Self { Self::default() }

  pub fn parse(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }

  pub fn to_json_string(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Entries in ascending key order.
  pub fn iter(&self) -> impl Iterator<Item = (i64, &Entry)> {
    self.0.iter().map(|(k, e)| (*k, e))
  }

  pub fn get(&self, key: i64) -> Option<&Entry> { self.0.get(&key) }

  /// Insert at `key`, returning the entry previously stored there.
  pub fn insert(&mut self, key: i64, entry: Entry) -> Option<Entry> {
    self.0.insert(key, entry)
  }

  pub fn remove(&mut self, key: i64) -> Option<Entry> { self.0.remove(&key) }

  /// Drop every entry matching `(feature, value)`; returns how many went.
  pub fn remove_matching(
    &mut self,
    feature: FeatureId,
    value: Option<ValueId>,
  ) -> usize {
    let before = self.0.len();
    self
      .0
      .retain(|_, e| !(e.feature == feature && e.value == value));
    before - self.0.len()
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<'de> Deserialize<'de> for JsonProjection {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = serde_json::Value::deserialize(deserializer)?;
    let mut map = BTreeMap::new();
    match raw {
      serde_json::Value::Null => {}
      serde_json::Value::Object(obj) => {
        for (key, value) in obj {
          let position = key.parse::<i64>().map_err(|_| {
            de::Error::custom(format!("non-integer projection key: {key:?}"))
          })?;
          let entry: Entry =
            serde_json::from_value(value).map_err(de::Error::custom)?;
          map.insert(position, entry);
        }
      }
      serde_json::Value::Array(items) => {
        for value in items {
          let entry: Entry =
            serde_json::from_value(value).map_err(de::Error::custom)?;
          map.insert(entry.position, entry);
        }
      }
      other => {
        return Err(de::Error::custom(format!(
          "expected object or array for projection, found {other}"
        )));
      }
    }
    Ok(Self(map))
  }
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// A product ↔ feature (↔ value) link carrying two ordering fields.
///
/// `feature_position` is the user-editable ordering within a feature group and
/// is authoritative; `position` is a global flattening used as the projection
/// key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  /// `None` until the row has been flushed.
  pub id:               Option<AssignmentId>,
  pub product_id:       ProductId,
  pub feature_id:       FeatureId,
  pub value_id:         Option<ValueId>,
  pub position:         i64,
  pub feature_position: i64,
  pub is_default:       bool,
  pub display_in_array: bool,
}

impl Assignment {
  pub fn matches(&self, feature: FeatureId, value: Option<ValueId>) -> bool {
    self.feature_id == feature && self.value_id == value
  }
}

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id:              ProductId,
  pub catalog_id:      CatalogId,
  pub assignments:     Vec<Assignment>,
  pub json_projection: JsonProjection,
  /// Set by the store whenever the product is flushed.
  pub updated_at:      Option<DateTime<Utc>>,
  #[serde(skip)]
  removed:             Vec<AssignmentId>,
}

impl Product {
  /// A product with no assignments and an empty projection.
  pub fn new(id: ProductId, catalog_id: CatalogId) -> Self {
    Self::from_parts(id, catalog_id, Vec::new(), JsonProjection::new(), None)
  }

  /// Reassemble a product loaded from storage.
  pub fn from_parts(
    id: ProductId,
    catalog_id: CatalogId,
    assignments: Vec<Assignment>,
    json_projection: JsonProjection,
    updated_at: Option<DateTime<Utc>>,
  ) -> Self {
    Self {
      id,
      catalog_id,
      assignments,
      json_projection,
      updated_at,
      removed: Vec::new(),
    }
  }

  pub fn find_assignment(
    &self,
    feature: FeatureId,
    value: Option<ValueId>,
  ) -> Option<&Assignment> {
    self.assignments.iter().find(|a| a.matches(feature, value))
  }

  /// Remove the assignment for `(feature, value)` and its projection entries.
  ///
  /// Flushed rows are remembered so the store can delete them.
  pub(crate) fn take_assignment(
    &mut self,
    feature: FeatureId,
    value: Option<ValueId>,
  ) -> Option<Assignment> {
    let index = self
      .assignments
      .iter()
      .position(|a| a.matches(feature, value))?;
    let removed = self.assignments.remove(index);
    if let Some(id) = removed.id {
      self.removed.push(id);
    }
    self.json_projection.remove_matching(feature, value);
    Some(removed)
  }

  /// Ids of flushed assignments removed since the product was loaded.
  pub fn removed_assignments(&self) -> &[AssignmentId] { &self.removed }

  /// The projection implied by the current assignment rows, plus the number
  /// of rows that lost their slot to a later row at the same position.
  pub fn derived_projection(&self) -> (JsonProjection, usize) {
    let mut ordered: Vec<&Assignment> = self.assignments.iter().collect();
    ordered.sort_by_key(|a| (a.position, a.id));

    let mut projection = JsonProjection::new();
    let mut collisions = 0;
    for a in ordered {
      if projection.insert(a.position, Entry::from_assignment(a)).is_some() {
        collisions += 1;
      }
    }
    (projection, collisions)
  }

  /// Regenerate the stored projection from the assignment rows.
  pub fn rebuild_projection(&mut self) -> usize {
    let (projection, collisions) = self.derived_projection();
    if collisions > 0 {
      tracing::warn!(
        product = %self.id,
        collisions,
        "assignments share a position; later rows win the projection slot"
      );
    }
    self.json_projection = projection;
    collisions
  }
}
