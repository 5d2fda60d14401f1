//! [`ResolutionBatch`]: one render pass over a website's products.
//!
//! A batch owns every cache the engine uses: the [`AttributeCatalog`] and the
//! per-catalog default lists. They live exactly as long as the batch; drop it
//! and they are gone. Writes accumulate in [`PendingWrites`] and reach the
//! store once, in [`ResolutionBatch::finish`].
//!
//! Two batches resolving the same product concurrently may both backfill the
//! same default. The store's uniqueness guarantee, not this type, decides
//! which insert wins.

use std::collections::HashMap;

use crate::{
  Error, Result,
  attribute_catalog::{AttributeCatalog, TitleResolver},
  catalog::CatalogDefaults,
  defaults::{ProductView, ViewConfig, render},
  id::{CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  position::synchronize,
  product::Product,
  projection::{Projection, decode},
  reconcile::{assign, reconcile, remove_assignment},
  store::{CatalogStore, FlushReport, PendingWrites},
};

/// A product after backfill and drift correction, with its fresh projection.
#[derive(Debug, Clone)]
pub struct ResolvedProduct {
  pub product:      Product,
  pub projection:   Projection,
  /// Catalog defaults were added during this pass.
  pub backfilled:   bool,
  /// Position drift was corrected during this pass.
  pub synchronized: bool,
}

impl ResolvedProduct {
  pub fn view(&self, config: &ViewConfig) -> ProductView {
    render(self.product.id, &self.projection, config)
  }
}

pub struct ResolutionBatch<'s, S: CatalogStore> {
  store:      &'s S,
  attributes: AttributeCatalog,
  defaults:   HashMap<CatalogId, CatalogDefaults>,
  pending:    PendingWrites,
}

impl<'s, S: CatalogStore> ResolutionBatch<'s, S> {
  /// Start a batch for `website`, loading its features and values once.
  pub async fn open(
    store: &'s S,
    website: WebsiteId,
    titles: &dyn TitleResolver,
  ) -> Result<Self> {
    let features = store.list_features(website).await.map_err(Error::store)?;
    let values = store.list_values(website).await.map_err(Error::store)?;
    let attributes = AttributeCatalog::build(website, &features, &values, titles);

    Ok(Self {
      store,
      attributes,
      defaults: HashMap::new(),
      pending: PendingWrites::new(),
    })
  }

  pub fn attributes(&self) -> &AttributeCatalog { &self.attributes }

  pub fn pending(&self) -> &PendingWrites { &self.pending }

  /// The default lists of `catalog`, fetched on first use and memoised for
  /// the rest of the batch.
  pub async fn catalog_defaults(
    &mut self,
    catalog: CatalogId,
  ) -> Result<&CatalogDefaults> {
    if !self.defaults.contains_key(&catalog) {
      let loaded = self.load_defaults(catalog).await?;
      self.defaults.insert(catalog, loaded);
    }
    Ok(&self.defaults[&catalog])
  }

  async fn load_defaults(&self, catalog: CatalogId) -> Result<CatalogDefaults> {
    let found = self
      .store
      .get_catalog(catalog)
      .await
      .map_err(Error::store)?
      .ok_or(Error::CatalogNotFound(catalog))?;

    let expected = self.attributes.website_id();
    if found.website_id != expected {
      return Err(Error::TenantMismatch {
        catalog,
        expected,
        actual: found.website_id,
      });
    }

    let values = self.store.default_values(catalog).await.map_err(Error::store)?;
    let features = self
      .store
      .default_features(catalog)
      .await
      .map_err(Error::store)?;

    tracing::debug!(
      %catalog,
      values = values.len(),
      features = features.len(),
      "loaded catalog defaults"
    );

    Ok(CatalogDefaults { catalog_id: catalog, values, features })
  }

  /// Backfill defaults, correct drift and decode `product`.
  ///
  /// The product is queued for persistence if either step wrote anything.
  pub async fn resolve(&mut self, mut product: Product) -> Result<ResolvedProduct> {
    self.catalog_defaults(product.catalog_id).await?;
    let defaults = &self.defaults[&product.catalog_id];

    let mut projection = decode(&product, &self.attributes);

    let backfilled = reconcile(&mut product, &self.attributes, defaults, &projection);
    if backfilled {
      self.pending.persist(&product);
      projection = decode(&product, &self.attributes);
    }

    let synchronized = synchronize(&mut product);
    if synchronized {
      self.pending.persist(&product);
      projection = decode(&product, &self.attributes);
    }

    Ok(ResolvedProduct { product, projection, backfilled, synchronized })
  }

  pub async fn resolve_product(&mut self, id: ProductId) -> Result<ResolvedProduct> {
    let product = self
      .store
      .get_product(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ProductNotFound(id))?;
    self.resolve(product).await
  }

  /// Resolve every product of `catalog`, in ascending id order.
  pub async fn resolve_catalog(
    &mut self,
    catalog: CatalogId,
  ) -> Result<Vec<ResolvedProduct>> {
    self.catalog_defaults(catalog).await?;
    let products = self.store.list_products(catalog).await.map_err(Error::store)?;

    let mut resolved = Vec::with_capacity(products.len());
    for product in products {
      resolved.push(self.resolve(product).await?);
    }
    Ok(resolved)
  }

  /// Explicitly assign `(feature, value)` to `product` and queue it.
  pub async fn assign(
    &mut self,
    product: &mut Product,
    feature: FeatureId,
    value: Option<ValueId>,
    display_in_array: bool,
  ) -> Result<bool> {
    self.catalog_defaults(product.catalog_id).await?;
    let changed = assign(product, &self.attributes, feature, value, display_in_array)?;
    if changed {
      self.pending.persist(product);
    }
    Ok(changed)
  }

  /// Remove `(feature, value)` from `product` unless it is a catalog default.
  pub async fn remove(
    &mut self,
    product: &mut Product,
    feature: FeatureId,
    value: Option<ValueId>,
  ) -> Result<bool> {
    self.catalog_defaults(product.catalog_id).await?;
    let defaults = &self.defaults[&product.catalog_id];
    let removed = remove_assignment(product, defaults, feature, value)?;
    if removed {
      self.pending.persist(product);
    }
    Ok(removed)
  }

  /// Flush everything queued during the batch and end it.
  pub async fn finish(self) -> Result<FlushReport> {
    if self.pending.is_empty() {
      return Ok(FlushReport::default());
    }
    let report = self.store.flush(self.pending).await.map_err(Error::store)?;
    tracing::info!(
      website = %self.attributes.website_id(),
      products = report.products,
      inserted = report.inserted,
      updated = report.updated,
      deleted = report.deleted,
      skipped = report.skipped,
      "flushed resolution batch"
    );
    Ok(report)
  }
}
