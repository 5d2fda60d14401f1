//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Titles and the product
//! projection are stored as compact JSON. Ids are plain integers.

use chrono::{DateTime, Utc};
use vitrine_core::{
  attribute::{Feature, Translations, Value},
  id::{AssignmentId, CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  product::{Assignment, JsonProjection, Product},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Titles ──────────────────────────────────────────────────────────────────

pub fn encode_titles(t: &Translations) -> Result<String> {
  Ok(serde_json::to_string(t)?)
}

pub fn decode_titles(s: &str) -> Result<Translations> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a `feature` row.
pub struct RawFeature {
  pub id:         i64,
  pub website_id: i64,
  pub slug:       String,
  pub titles:     String,
}

impl RawFeature {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      website_id: row.get(1)?,
      slug:       row.get(2)?,
      titles:     row.get(3)?,
    })
  }

  pub fn into_feature(self) -> Result<Feature> {
    Ok(Feature {
      id:         FeatureId(self.id),
      slug:       self.slug,
      website_id: WebsiteId(self.website_id),
      titles:     decode_titles(&self.titles)?,
    })
  }
}

/// Raw columns of a `feature_value` row.
pub struct RawValue {
  pub id:         i64,
  pub feature_id: i64,
  pub slug:       String,
  pub titles:     String,
}

impl RawValue {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      feature_id: row.get(1)?,
      slug:       row.get(2)?,
      titles:     row.get(3)?,
    })
  }

  pub fn into_value(self) -> Result<Value> {
    Ok(Value {
      id:         ValueId(self.id),
      slug:       self.slug,
      feature_id: FeatureId(self.feature_id),
      titles:     decode_titles(&self.titles)?,
    })
  }
}

/// Read an assignment row selected with [`ASSIGNMENT_COLUMNS`].
pub fn assignment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Assignment> {
  Ok(Assignment {
    id:               Some(AssignmentId(row.get(0)?)),
    product_id:       ProductId(row.get(1)?),
    feature_id:       FeatureId(row.get(2)?),
    value_id:         row.get::<_, Option<i64>>(3)?.map(ValueId),
    position:         row.get(4)?,
    feature_position: row.get(5)?,
    is_default:       row.get(6)?,
    display_in_array: row.get(7)?,
  })
}

pub const ASSIGNMENT_COLUMNS: &str = "id, product_id, feature_id, value_id, \
  position, feature_position, as_default, display_in_array";

/// Raw columns of a `product` row, plus its assignment rows.
pub struct RawProduct {
  pub id:          i64,
  pub catalog_id:  i64,
  pub json_values: String,
  pub updated_at:  Option<String>,
  pub assignments: Vec<Assignment>,
}

impl RawProduct {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      catalog_id:  row.get(1)?,
      json_values: row.get(2)?,
      updated_at:  row.get(3)?,
      assignments: Vec::new(),
    })
  }

  pub fn into_product(self) -> Result<Product> {
    let updated_at = self.updated_at.as_deref().map(decode_dt).transpose()?;
    Ok(Product::from_parts(
      ProductId(self.id),
      CatalogId(self.catalog_id),
      self.assignments,
      JsonProjection::parse(&self.json_values)?,
      updated_at,
    ))
  }
}
