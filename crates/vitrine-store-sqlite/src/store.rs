//! [`SqliteStore`]: the SQLite implementation of [`CatalogStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use vitrine_core::{
  attribute::{Feature, NewFeature, NewValue, Value},
  catalog::{Catalog, NewCatalog},
  id::{CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  product::{Assignment, Product},
  store::{CatalogStore, FlushReport, PendingWrites},
};

use crate::{
  Error, Result,
  encode::{
    ASSIGNMENT_COLUMNS, RawFeature, RawProduct, RawValue, assignment_from_row,
    encode_dt, encode_titles,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vitrine catalog store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load products matching `filter` (a condition on `?1`) with their
  /// assignment rows ordered by position.
  async fn load_products(
    &self,
    filter: &'static str,
    param: i64,
  ) -> Result<Vec<Product>> {
    let raws: Vec<RawProduct> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT id, catalog_id, json_values, updated_at
           FROM product WHERE {filter} ORDER BY id"
        ))?;
        let mut products = stmt
          .query_map(rusqlite::params![param], RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {ASSIGNMENT_COLUMNS} FROM feature_value_product
           WHERE product_id = ?1 ORDER BY position, id"
        ))?;
        for product in &mut products {
          product.assignments = stmt
            .query_map(rusqlite::params![product.id], assignment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        }
        Ok(products)
      })
      .await?;

    raws.into_iter().map(RawProduct::into_product).collect()
  }

  /// Insert a catalog-default link after checking both ends exist.
  ///
  /// Returns `(catalog_exists, target_exists)`; nothing is written unless both
  /// are true.
  async fn link_default(
    &self,
    catalog: CatalogId,
    target_table: &'static str,
    link_sql: &'static str,
    target: i64,
  ) -> Result<(bool, bool)> {
    let catalog_id = catalog.get();
    let found = self
      .conn
      .call(move |conn| {
        let catalog_exists = conn
          .query_row(
            "SELECT 1 FROM catalog WHERE id = ?1",
            rusqlite::params![catalog_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        let target_exists = conn
          .query_row(
            &format!("SELECT 1 FROM {target_table} WHERE id = ?1"),
            rusqlite::params![target],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if catalog_exists && target_exists {
          conn.execute(link_sql, rusqlite::params![catalog_id, target])?;
        }
        Ok((catalog_exists, target_exists))
      })
      .await?;
    Ok(found)
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Vocabulary ────────────────────────────────────────────────────────────

  async fn create_feature(&self, input: NewFeature) -> Result<Feature> {
    let titles_str = encode_titles(&input.titles)?;
    let website    = input.website_id.get();
    let slug       = input.slug.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feature (website_id, slug, titles) VALUES (?1, ?2, ?3)",
          rusqlite::params![website, slug, titles_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Feature {
      id:         FeatureId(id),
      slug:       input.slug,
      website_id: input.website_id,
      titles:     input.titles,
    })
  }

  async fn create_value(&self, input: NewValue) -> Result<Value> {
    let titles_str = encode_titles(&input.titles)?;
    let feature_id = input.feature_id.get();
    let slug       = input.slug.clone();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM feature WHERE id = ?1",
            rusqlite::params![feature_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO feature_value (feature_id, slug, titles) VALUES (?1, ?2, ?3)",
          rusqlite::params![feature_id, slug, titles_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::FeatureNotFound(input.feature_id))?;
    Ok(Value {
      id:         ValueId(id),
      slug:       input.slug,
      feature_id: input.feature_id,
      titles:     input.titles,
    })
  }

  async fn delete_feature(&self, id: FeatureId) -> Result<bool> {
    let raw = id.get();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM feature WHERE id = ?1", rusqlite::params![raw])?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete_value(&self, id: ValueId) -> Result<bool> {
    let raw = id.get();
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM feature_value WHERE id = ?1",
          rusqlite::params![raw],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_features(&self, website: WebsiteId) -> Result<Vec<Feature>> {
    let raw = website.get();
    let raws: Vec<RawFeature> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, website_id, slug, titles FROM feature
           WHERE website_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![raw], RawFeature::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeature::into_feature).collect()
  }

  async fn list_values(&self, website: WebsiteId) -> Result<Vec<Value>> {
    let raw = website.get();
    let raws: Vec<RawValue> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT v.id, v.feature_id, v.slug, v.titles
           FROM feature_value v
           JOIN feature f ON f.id = v.feature_id
           WHERE f.website_id = ?1
           ORDER BY v.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![raw], RawValue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValue::into_value).collect()
  }

  // ── Catalogs ──────────────────────────────────────────────────────────────

  async fn create_catalog(&self, input: NewCatalog) -> Result<Catalog> {
    let website = input.website_id.get();
    let slug    = input.slug.clone();

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO catalog (website_id, slug) VALUES (?1, ?2)",
          rusqlite::params![website, slug],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Catalog {
      id:         CatalogId(id),
      slug:       input.slug,
      website_id: input.website_id,
    })
  }

  async fn get_catalog(&self, id: CatalogId) -> Result<Option<Catalog>> {
    let raw = id.get();
    let row: Option<(i64, String, i64)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, slug, website_id FROM catalog WHERE id = ?1",
            rusqlite::params![raw],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?)
      })
      .await?;

    Ok(row.map(|(id, slug, website)| Catalog {
      id:         CatalogId(id),
      slug,
      website_id: WebsiteId(website),
    }))
  }

  async fn set_default_feature(
    &self,
    catalog: CatalogId,
    feature: FeatureId,
  ) -> Result<()> {
    let (has_catalog, has_feature) = self
      .link_default(
        catalog,
        "feature",
        "INSERT OR IGNORE INTO catalog_default_feature (catalog_id, feature_id)
         VALUES (?1, ?2)",
        feature.get(),
      )
      .await?;

    if !has_catalog {
      return Err(Error::CatalogNotFound(catalog));
    }
    if !has_feature {
      return Err(Error::FeatureNotFound(feature));
    }
    Ok(())
  }

  async fn set_default_value(&self, catalog: CatalogId, value: ValueId) -> Result<()> {
    let (has_catalog, has_value) = self
      .link_default(
        catalog,
        "feature_value",
        "INSERT OR IGNORE INTO catalog_default_value (catalog_id, value_id)
         VALUES (?1, ?2)",
        value.get(),
      )
      .await?;

    if !has_catalog {
      return Err(Error::CatalogNotFound(catalog));
    }
    if !has_value {
      return Err(Error::ValueNotFound(value));
    }
    Ok(())
  }

  async fn default_features(&self, catalog: CatalogId) -> Result<Vec<Feature>> {
    let raw = catalog.get();
    let raws: Vec<RawFeature> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT f.id, f.website_id, f.slug, f.titles
           FROM feature f
           JOIN catalog_default_feature d ON d.feature_id = f.id
           WHERE d.catalog_id = ?1
           ORDER BY f.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![raw], RawFeature::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeature::into_feature).collect()
  }

  async fn default_values(&self, catalog: CatalogId) -> Result<Vec<Value>> {
    let raw = catalog.get();
    let raws: Vec<RawValue> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT v.id, v.feature_id, v.slug, v.titles
           FROM feature_value v
           JOIN catalog_default_value d ON d.value_id = v.id
           WHERE d.catalog_id = ?1
           ORDER BY v.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![raw], RawValue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValue::into_value).collect()
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn create_product(&self, catalog: CatalogId) -> Result<Product> {
    let raw = catalog.get();
    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM catalog WHERE id = ?1",
            rusqlite::params![raw],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO product (catalog_id, json_values) VALUES (?1, '{}')",
          rusqlite::params![raw],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::CatalogNotFound(catalog))?;
    Ok(Product::new(ProductId(id), catalog))
  }

  async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
    let mut found = self.load_products("id = ?1", id.get()).await?;
    Ok(found.pop())
  }

  async fn list_products(&self, catalog: CatalogId) -> Result<Vec<Product>> {
    self.load_products("catalog_id = ?1", catalog.get()).await
  }

  async fn find_assignment(
    &self,
    product: ProductId,
    feature: FeatureId,
    value:   Option<ValueId>,
  ) -> Result<Option<Assignment>> {
    let product_id = product.get();
    let feature_id = feature.get();
    let value_id   = value.map(ValueId::get);

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {ASSIGNMENT_COLUMNS} FROM feature_value_product
               WHERE product_id = ?1 AND feature_id = ?2 AND value_id IS ?3"
            ),
            rusqlite::params![product_id, feature_id, value_id],
            assignment_from_row,
          )
          .optional()?)
      })
      .await?;
    Ok(found)
  }

  // ── Persistence boundary ──────────────────────────────────────────────────

  async fn flush(&self, writes: PendingWrites) -> Result<FlushReport> {
    let now = encode_dt(Utc::now());
    let rows = writes
      .into_products()
      .map(|p| -> Result<(Product, String)> {
        let json = p.json_projection.to_json_string()?;
        Ok((p, json))
      })
      .collect::<Result<Vec<_>>>()?;

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut report = FlushReport::default();

        for (product, json) in &rows {
          let product_id = product.id.get();
          let touched = tx.execute(
            "UPDATE product SET json_values = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![json, now, product_id],
          )?;
          if touched == 0 {
            // Deleted since it was loaded.
            report.skipped += product.assignments.len();
            continue;
          }
          report.products += 1;

          for removed in product.removed_assignments() {
            report.deleted += tx.execute(
              "DELETE FROM feature_value_product WHERE id = ?1 AND product_id = ?2",
              rusqlite::params![removed.get(), product_id],
            )?;
          }

          for a in &product.assignments {
            if let Some(id) = a.id {
              report.updated += tx.execute(
                "UPDATE feature_value_product
                 SET position = ?1, feature_position = ?2,
                     as_default = ?3, display_in_array = ?4
                 WHERE id = ?5",
                rusqlite::params![
                  a.position,
                  a.feature_position,
                  a.is_default,
                  a.display_in_array,
                  id.get(),
                ],
              )?;
              continue;
            }

            // Vanished references and concurrent duplicates insert nothing.
            let inserted = tx.execute(
              "INSERT OR IGNORE INTO feature_value_product (
                 product_id, feature_id, value_id, position, feature_position,
                 as_default, display_in_array
               )
               SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
               WHERE EXISTS (SELECT 1 FROM feature WHERE id = ?2)
                 AND (?3 IS NULL OR EXISTS (
                   SELECT 1 FROM feature_value WHERE id = ?3 AND feature_id = ?2
                 ))",
              rusqlite::params![
                product_id,
                a.feature_id.get(),
                a.value_id.map(ValueId::get),
                a.position,
                a.feature_position,
                a.is_default,
                a.display_in_array,
              ],
            )?;
            if inserted == 0 {
              report.skipped += 1;
            } else {
              report.inserted += inserted;
            }
          }
        }

        tx.commit()?;
        Ok(report)
      })
      .await?;

    tracing::debug!(
      products = report.products,
      inserted = report.inserted,
      updated = report.updated,
      deleted = report.deleted,
      skipped = report.skipped,
      "flush committed"
    );
    Ok(report)
  }
}
