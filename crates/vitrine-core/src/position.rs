//! Ordering drift between assignment rows, and between rows and the stored
//! projection.

use serde::Serialize;

use crate::{
  id::{FeatureId, ValueId},
  product::{Entry, Product},
};

/// Align every assignment's `position` with its `feature_position`.
///
/// `feature_position` is authoritative. When any row moved, the projection is
/// regenerated from the rows so its keys follow; decode again afterwards.
pub fn synchronize(product: &mut Product) -> bool {
  let mut corrected = 0usize;
  for row in &mut product.assignments {
    if row.position != row.feature_position {
      row.position = row.feature_position;
      corrected += 1;
    }
  }

  if corrected == 0 {
    return false;
  }

  tracing::info!(product = %product.id, corrected, "corrected position drift");
  product.rebuild_projection();
  true
}

// ─── Drift report ────────────────────────────────────────────────────────────

/// An entry stored under a key other than its assignment's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Misplaced {
  pub feature:  FeatureId,
  pub value:    Option<ValueId>,
  pub stored:   i64,
  pub expected: i64,
}

/// Differences between a product's assignment rows and its stored projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionDrift {
  /// Rows with no entry anywhere in the projection.
  pub missing_entries:  Vec<(FeatureId, Option<ValueId>)>,
  /// Stored entries backed by no row, by key.
  pub orphan_entries:   Vec<i64>,
  pub misplaced:        Vec<Misplaced>,
  /// Rows whose `position` disagrees with `feature_position`.
  pub unsynced_rows:    usize,
}

impl ProjectionDrift {
  pub fn is_clean(&self) -> bool {
    self.missing_entries.is_empty()
      && self.orphan_entries.is_empty()
      && self.misplaced.is_empty()
      && self.unsynced_rows == 0
  }
}

/// Compare `product`'s rows with its stored projection without writing.
pub fn detect_drift(product: &Product) -> ProjectionDrift {
  let mut drift = ProjectionDrift::default();
  let stored: Vec<(i64, &Entry)> = product.json_projection.iter().collect();

  for row in &product.assignments {
    if row.position != row.feature_position {
      drift.unsynced_rows += 1;
    }

    let found = stored
      .iter()
      .find(|(_, e)| e.feature == row.feature_id && e.value == row.value_id);
    match found {
      None => drift.missing_entries.push((row.feature_id, row.value_id)),
      Some((key, _)) if *key != row.position => {
        drift.misplaced.push(Misplaced {
          feature:  row.feature_id,
          value:    row.value_id,
          stored:   *key,
          expected: row.position,
        });
      }
      Some(_) => {}
    }
  }

  for (key, entry) in &stored {
    if product.find_assignment(entry.feature, entry.value).is_none() {
      drift.orphan_entries.push(*key);
    }
  }

  drift
}
