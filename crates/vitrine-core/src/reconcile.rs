//! Backfilling catalog defaults and the guarded assignment mutations.
//!
//! Every mutation here touches the assignment rows and the JSON projection
//! together, so both copies move in the same step.

use crate::{
  Error, Result,
  attribute_catalog::AttributeCatalog,
  catalog::CatalogDefaults,
  id::{FeatureId, ValueId},
  product::{Assignment, Entry, Product},
  projection::Projection,
};

/// Add every catalog default missing from `projection` to `product`.
///
/// Returns `true` if anything was written. The caller persists the product
/// and must decode it again before building views, since the fresh slots are
/// not part of `projection`.
pub fn reconcile(
  product: &mut Product,
  catalog: &AttributeCatalog,
  defaults: &CatalogDefaults,
  projection: &Projection,
) -> bool {
  let mut dirty = false;

  for value in &defaults.values {
    if projection.has_value(value.id) {
      continue;
    }
    dirty |= add_assignment(product, catalog, value.feature_id, Some(value.id));
  }

  for feature in &defaults.features {
    if projection.has_feature(feature.id) {
      continue;
    }
    dirty |= add_assignment(product, catalog, feature.id, None);
  }

  if dirty {
    tracing::debug!(
      product = %product.id,
      catalog = %defaults.catalog_id,
      "backfilled catalog defaults"
    );
  }
  dirty
}

/// Find-or-create the default assignment for `(feature, value)` and write its
/// projection entry.
///
/// A feature or value that vanished from `catalog` (deleted mid-batch) makes
/// this a no-op. Returns whether anything changed.
pub fn add_assignment(
  product: &mut Product,
  catalog: &AttributeCatalog,
  feature: FeatureId,
  value: Option<ValueId>,
) -> bool {
  if catalog.feature(feature).is_none() {
    tracing::debug!(product = %product.id, %feature, "default feature vanished");
    return false;
  }
  if let Some(value) = value {
    match catalog.value(value) {
      Some(v) if v.feature_id == feature => {}
      _ => {
        tracing::debug!(product = %product.id, %value, "default value vanished");
        return false;
      }
    }
  }

  let (index, created) = find_or_create(product, feature, value, true);
  let moved = claim_slot(product, index);
  let entry = Entry::from_assignment(&product.assignments[index]);
  write_entry(product, entry) || created || moved
}

/// Explicitly assign `(feature, value)` to `product`.
///
/// Unlike the default backfill this validates its input: unknown ids and a
/// value from another feature are errors. Re-assigning an existing pair only
/// updates `display_in_array`.
pub fn assign(
  product: &mut Product,
  catalog: &AttributeCatalog,
  feature: FeatureId,
  value: Option<ValueId>,
  display_in_array: bool,
) -> Result<bool> {
  if catalog.feature(feature).is_none() {
    return Err(Error::UnknownFeature(feature));
  }
  if let Some(value) = value {
    let resolved = catalog.value(value).ok_or(Error::UnknownValue(value))?;
    if resolved.feature_id != feature {
      return Err(Error::ValueFeatureMismatch { feature, value });
    }
  }

  let (index, created) = find_or_create(product, feature, value, false);
  let row = &mut product.assignments[index];
  let toggled = row.display_in_array != display_in_array;
  row.display_in_array = display_in_array;
  let moved = claim_slot(product, index);
  let entry = Entry::from_assignment(&product.assignments[index]);
  Ok(write_entry(product, entry) || created || toggled || moved)
}

/// Remove the assignment for `(feature, value)` unless the catalog declares it
/// as a default.
///
/// Returns whether anything was removed.
pub fn remove_assignment(
  product: &mut Product,
  defaults: &CatalogDefaults,
  feature: FeatureId,
  value: Option<ValueId>,
) -> Result<bool> {
  let protected = match value {
    Some(v) => defaults.has_value(v),
    None => defaults.has_feature(feature),
  };
  if protected {
    return Err(Error::CatalogDefault {
      catalog: defaults.catalog_id,
      feature,
      value,
    });
  }

  if product.take_assignment(feature, value).is_some() {
    return Ok(true);
  }
  Ok(product.json_projection.remove_matching(feature, value) > 0)
}

/// Index of the assignment for `(feature, value)`, creating it when absent.
fn find_or_create(
  product: &mut Product,
  feature: FeatureId,
  value: Option<ValueId>,
  is_default: bool,
) -> (usize, bool) {
  if let Some(index) = product
    .assignments
    .iter()
    .position(|a| a.matches(feature, value))
  {
    return (index, false);
  }

  let position = next_position(product);
  product.assignments.push(Assignment {
    id: None,
    product_id: product.id,
    feature_id: feature,
    value_id: value,
    position,
    feature_position: position,
    is_default,
    display_in_array: false,
  });
  (product.assignments.len() - 1, true)
}

/// One past the highest position used by any row or stored entry.
fn next_position(product: &Product) -> i64 {
  let rows = product.assignments.iter().map(|a| a.position);
  let keys = product.json_projection.iter().map(|(key, _)| key);
  rows.chain(keys).max().unwrap_or(0) + 1
}

/// Move the row at `index` to a free position when its slot is held by the
/// entry of a different pair. Returns whether the row moved.
fn claim_slot(product: &mut Product, index: usize) -> bool {
  let row = &product.assignments[index];
  let taken = product
    .json_projection
    .get(row.position)
    .is_some_and(|e| !(e.feature == row.feature_id && e.value == row.value_id));
  if !taken {
    return false;
  }

  let position = next_position(product);
  let product_id = product.id;
  let row = &mut product.assignments[index];
  tracing::warn!(
    product = %product_id,
    feature = %row.feature_id,
    from = row.position,
    to = position,
    "assignment slot taken by another pair; moved"
  );
  row.position = position;
  row.feature_position = position;
  true
}

/// Store `entry` at its position; returns whether the slot changed.
///
/// A slot holding a different `(feature, value)` pair is never overwritten.
fn write_entry(product: &mut Product, entry: Entry) -> bool {
  let key = entry.position;
  if let Some(current) = product.json_projection.get(key) {
    if *current == entry {
      return false;
    }
    if !(current.feature == entry.feature && current.value == entry.value) {
      tracing::warn!(
        product = %product.id,
        key,
        owner = %current.feature,
        "projection slot owned by another assignment; left as is"
      );
      return false;
    }
  }
  product.json_projection.insert(key, entry);
  true
}
