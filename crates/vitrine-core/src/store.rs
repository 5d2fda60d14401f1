//! The `CatalogStore` trait and the unit of work it flushes.
//!
//! The trait is implemented by storage backends (e.g. `vitrine-store-sqlite`).
//! The engine never talks to a database directly: a [`crate::batch`] reads
//! through this trait, mutates products in memory and hands the result back
//! as [`PendingWrites`].

use std::{collections::BTreeMap, future::Future};

use serde::Serialize;

use crate::{
  attribute::{Feature, NewFeature, NewValue, Value},
  catalog::{Catalog, NewCatalog},
  id::{CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  product::{Assignment, Product},
};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// Products queued for persistence within one batch.
///
/// Persisting the same product twice keeps only its latest state, so a batch
/// writes each product once no matter how many passes touched it.
#[derive(Debug, Clone, Default)]
pub struct PendingWrites {
  products: BTreeMap<ProductId, Product>,
}

impl PendingWrites {
  pub fn new() -> Self { Self::default() }

  pub fn persist(&mut self, product: &Product) {
    self.products.insert(product.id, product.clone());
  }

  pub fn len(&self) -> usize { self.products.len() }

  pub fn is_empty(&self) -> bool { self.products.is_empty() }

  /// Queued products in ascending id order.
  pub fn into_products(self) -> impl Iterator<Item = Product> {
    self.products.into_values()
  }
}

/// What a flush committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
  pub products: usize,
  pub inserted: usize,
  pub updated:  usize,
  pub deleted:  usize,
  /// New rows dropped because their feature/value vanished or an identical
  /// row was created concurrently.
  pub skipped:  usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Vitrine catalog store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Vocabulary ────────────────────────────────────────────────────────

  fn create_feature(
    &self,
    input: NewFeature,
  ) -> impl Future<Output = Result<Feature, Self::Error>> + Send + '_;

  fn create_value(
    &self,
    input: NewValue,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  /// Delete a feature, its values and every assignment referencing them.
  /// Stored projections are left as they are. Returns `false` if absent.
  fn delete_feature(
    &self,
    id: FeatureId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete a value and every assignment referencing it. Stored projections
  /// are left as they are. Returns `false` if absent.
  fn delete_value(
    &self,
    id: ValueId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All features of a website, ascending by id.
  fn list_features(
    &self,
    website: WebsiteId,
  ) -> impl Future<Output = Result<Vec<Feature>, Self::Error>> + Send + '_;

  /// All values of a website's features, ascending by id.
  fn list_values(
    &self,
    website: WebsiteId,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  // ── Catalogs ──────────────────────────────────────────────────────────

  fn create_catalog(
    &self,
    input: NewCatalog,
  ) -> impl Future<Output = Result<Catalog, Self::Error>> + Send + '_;

  fn get_catalog(
    &self,
    id: CatalogId,
  ) -> impl Future<Output = Result<Option<Catalog>, Self::Error>> + Send + '_;

  fn set_default_feature(
    &self,
    catalog: CatalogId,
    feature: FeatureId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn set_default_value(
    &self,
    catalog: CatalogId,
    value: ValueId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Default features of a catalog, ascending by id.
  fn default_features(
    &self,
    catalog: CatalogId,
  ) -> impl Future<Output = Result<Vec<Feature>, Self::Error>> + Send + '_;

  /// Default values of a catalog, ascending by id.
  fn default_values(
    &self,
    catalog: CatalogId,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  // ── Products ──────────────────────────────────────────────────────────

  /// Create an empty product (no assignments, empty projection).
  fn create_product(
    &self,
    catalog: CatalogId,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  fn get_product(
    &self,
    id: ProductId,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// All products of a catalog, ascending by id.
  fn list_products(
    &self,
    catalog: CatalogId,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  fn find_assignment(
    &self,
    product: ProductId,
    feature: FeatureId,
    value: Option<ValueId>,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  // ── Persistence boundary ──────────────────────────────────────────────

  /// Commit every queued product atomically: all writes land or none do.
  fn flush(
    &self,
    writes: PendingWrites,
  ) -> impl Future<Output = Result<FlushReport, Self::Error>> + Send + '_;
}
