//! Integration tests for `SqliteStore` and `ResolutionBatch` against an
//! in-memory database.

use std::collections::BTreeMap;

use vitrine_core::{
  attribute::{Feature, NewFeature, NewValue, Translations, Value},
  attribute_catalog::LocaleTitles,
  batch::ResolutionBatch,
  catalog::{Catalog, NewCatalog},
  defaults::ViewConfig,
  id::{CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  position::detect_drift,
  product::Product,
  projection::decode,
  store::{CatalogStore, FlushReport, PendingWrites},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn titles() -> LocaleTitles { LocaleTitles::new("en") }

/// Website 1 with a `main` catalog and a small attribute vocabulary.
struct Seed {
  store:    SqliteStore,
  catalog:  Catalog,
  color:    Feature,
  size:     Feature,
  tag:      Feature,
  material: Feature,
  red:      Value,
  blue:     Value,
  m:        Value,
  eco:      Value,
  eco_alt:  Value,
}

async fn feature(s: &SqliteStore, website: i64, slug: &str, title: &str) -> Feature {
  s.create_feature(NewFeature {
    website_id: WebsiteId(website),
    slug:       slug.into(),
    titles:     Translations::new().with("en", title),
  })
  .await
  .unwrap()
}

async fn value(s: &SqliteStore, feature: &Feature, slug: &str, title: &str) -> Value {
  s.create_value(NewValue {
    feature_id: feature.id,
    slug:       slug.into(),
    titles:     Translations::new().with("en", title),
  })
  .await
  .unwrap()
}

async fn seed() -> Seed {
  let store = store().await;
  let catalog = store
    .create_catalog(NewCatalog { website_id: WebsiteId(1), slug: "main".into() })
    .await
    .unwrap();

  let color = feature(&store, 1, "color", "Colour").await;
  let size = feature(&store, 1, "size", "Size").await;
  let tag = feature(&store, 1, "tag", "Tag").await;
  let material = feature(&store, 1, "material", "Material").await;

  let red = value(&store, &color, "red", "Red").await;
  let blue = value(&store, &color, "blue", "Blue").await;
  let m = value(&store, &size, "m", "M").await;
  let eco_alt = value(&store, &tag, "eco-accent", "Éco").await;
  let eco = value(&store, &tag, "eco", "Eco").await;

  Seed {
    store,
    catalog,
    color,
    size,
    tag,
    material,
    red,
    blue,
    m,
    eco,
    eco_alt,
  }
}

async fn batch(s: &SqliteStore) -> ResolutionBatch<'_, SqliteStore> {
  ResolutionBatch::open(s, WebsiteId(1), &titles())
    .await
    .expect("batch")
}

// ─── Vocabulary ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn features_and_values_are_scoped_and_ordered() {
  let sd = seed().await;
  let foreign = feature(&sd.store, 2, "color", "Couleur").await;
  value(&sd.store, &foreign, "rouge", "Rouge").await;

  let features = sd.store.list_features(WebsiteId(1)).await.unwrap();
  let slugs: Vec<&str> = features.iter().map(|f| f.slug.as_str()).collect();
  assert_eq!(slugs, vec!["color", "size", "tag", "material"]);

  let values = sd.store.list_values(WebsiteId(1)).await.unwrap();
  assert_eq!(values.len(), 5);
  assert!(values.windows(2).all(|w| w[0].id < w[1].id));
  assert_eq!(values[0].titles.get("en"), Some("Red"));
}

#[tokio::test]
async fn create_value_for_missing_feature_errors() {
  let s = store().await;
  let err = s
    .create_value(NewValue {
      feature_id: FeatureId(42),
      slug:       "x".into(),
      titles:     Translations::new(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::FeatureNotFound(FeatureId(42))));
}

#[tokio::test]
async fn website_without_features_builds_empty_catalog() {
  let s = store().await;
  let b = ResolutionBatch::open(&s, WebsiteId(9), &titles()).await.unwrap();
  assert!(b.attributes().is_empty());
}

// ─── Catalog defaults ────────────────────────────────────────────────────────

#[tokio::test]
async fn catalog_defaults_roundtrip() {
  let sd = seed().await;
  let c = sd.catalog.id;
  sd.store.set_default_value(c, sd.m.id).await.unwrap();
  sd.store.set_default_value(c, sd.red.id).await.unwrap();
  sd.store.set_default_value(c, sd.red.id).await.unwrap();
  sd.store.set_default_feature(c, sd.material.id).await.unwrap();

  let values = sd.store.default_values(c).await.unwrap();
  let ids: Vec<ValueId> = values.iter().map(|v| v.id).collect();
  assert_eq!(ids, vec![sd.red.id, sd.m.id]);

  let features = sd.store.default_features(c).await.unwrap();
  assert_eq!(features.len(), 1);
  assert_eq!(features[0].slug, "material");

  let err = sd
    .store
    .set_default_value(CatalogId(404), sd.red.id)
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::CatalogNotFound(_)));
}

// ─── Backfill ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn default_value_is_backfilled_and_persisted() {
  let sd = seed().await;
  sd.store.set_default_value(sd.catalog.id, sd.red.id).await.unwrap();
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut b = batch(&sd.store).await;
  let resolved = b.resolve_product(product.id).await.unwrap();
  assert!(resolved.backfilled);
  assert!(resolved.projection.has_value(sd.red.id));
  let report = b.finish().await.unwrap();
  assert_eq!(report.products, 1);
  assert_eq!(report.inserted, 1);

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments.len(), 1);
  let row = &stored.assignments[0];
  assert_eq!(row.feature_id, sd.color.id);
  assert_eq!(row.value_id, Some(sd.red.id));
  assert_eq!((row.position, row.feature_position), (1, 1));
  assert!(row.is_default);
  assert!(stored.updated_at.is_some());

  let expected = format!(
    r#"{{"1":{{"feature":{},"value":{},"displayInArray":false,"position":1}}}}"#,
    sd.color.id, sd.red.id
  );
  assert_eq!(stored.json_projection.to_json_string().unwrap(), expected);
}

#[tokio::test]
async fn second_batch_writes_nothing() {
  let sd = seed().await;
  sd.store.set_default_value(sd.catalog.id, sd.red.id).await.unwrap();
  sd.store.set_default_feature(sd.catalog.id, sd.material.id).await.unwrap();
  sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut first = batch(&sd.store).await;
  first.resolve_catalog(sd.catalog.id).await.unwrap();
  first.finish().await.unwrap();

  let mut second = batch(&sd.store).await;
  let resolved = second.resolve_catalog(sd.catalog.id).await.unwrap();
  assert!(resolved.iter().all(|r| !r.backfilled && !r.synchronized));
  assert!(second.pending().is_empty());
  assert_eq!(second.finish().await.unwrap(), FlushReport::default());
}

#[tokio::test]
async fn every_product_gains_every_default() {
  let sd = seed().await;
  let c = sd.catalog.id;
  sd.store.set_default_value(c, sd.blue.id).await.unwrap();
  sd.store.set_default_value(c, sd.m.id).await.unwrap();
  sd.store.set_default_feature(c, sd.tag.id).await.unwrap();
  for _ in 0..3 {
    sd.store.create_product(c).await.unwrap();
  }

  let mut b = batch(&sd.store).await;
  b.resolve_catalog(c).await.unwrap();
  assert_eq!(b.finish().await.unwrap().inserted, 9);

  let mut check = batch(&sd.store).await;
  for r in check.resolve_catalog(c).await.unwrap() {
    assert!(r.projection.has_value(sd.blue.id));
    assert!(r.projection.has_value(sd.m.id));
    assert!(r.projection.has_feature(sd.tag.id));
    assert!(detect_drift(&r.product).is_clean());
  }
}

#[tokio::test]
async fn default_deleted_mid_batch_is_skipped_at_flush() {
  let sd = seed().await;
  sd.store.set_default_value(sd.catalog.id, sd.eco.id).await.unwrap();
  sd.store.set_default_value(sd.catalog.id, sd.red.id).await.unwrap();
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut b = batch(&sd.store).await;
  b.catalog_defaults(sd.catalog.id).await.unwrap();
  assert!(sd.store.delete_value(sd.eco.id).await.unwrap());

  b.resolve_product(product.id).await.unwrap();
  let report = b.finish().await.unwrap();
  assert_eq!(report.inserted, 1);
  assert_eq!(report.skipped, 1);

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments.len(), 1);
  assert_eq!(stored.assignments[0].value_id, Some(sd.red.id));
}

#[tokio::test]
async fn concurrent_batches_create_one_row() {
  let sd = seed().await;
  sd.store.set_default_value(sd.catalog.id, sd.red.id).await.unwrap();
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut a = batch(&sd.store).await;
  let mut b = batch(&sd.store).await;
  a.resolve_product(product.id).await.unwrap();
  b.resolve_product(product.id).await.unwrap();

  assert_eq!(a.finish().await.unwrap().inserted, 1);
  let report = b.finish().await.unwrap();
  assert_eq!(report.inserted, 0);
  assert_eq!(report.skipped, 1);

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments.len(), 1);
}

#[tokio::test]
async fn flush_skips_products_deleted_since_load() {
  let sd = seed().await;
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut b = batch(&sd.store).await;
  let mut real = product.clone();
  b.assign(&mut real, sd.color.id, Some(sd.blue.id), false).await.unwrap();
  let mut ghost = Product::new(ProductId(999), sd.catalog.id);
  b.assign(&mut ghost, sd.color.id, Some(sd.red.id), false).await.unwrap();

  let report = b.finish().await.unwrap();
  assert_eq!(report.products, 1);
  assert_eq!(report.inserted, 1);
  assert_eq!(report.skipped, 1);

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments[0].value_id, Some(sd.blue.id));
  assert!(sd.store.get_product(ProductId(999)).await.unwrap().is_none());
}

// ─── Drift ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn drifted_position_is_corrected_and_rekeyed() {
  let sd = seed().await;
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut setup = batch(&sd.store).await;
  let mut p = product.clone();
  setup.assign(&mut p, sd.size.id, Some(sd.m.id), false).await.unwrap();
  setup.finish().await.unwrap();

  // An admin reorders the size group without touching the global position.
  let mut p = sd.store.get_product(product.id).await.unwrap().unwrap();
  p.assignments[0].feature_position = 2;
  let mut writes = PendingWrites::new();
  writes.persist(&p);
  sd.store.flush(writes).await.unwrap();

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments[0].position, 1);
  assert!(stored.json_projection.get(1).is_some());
  assert_eq!(detect_drift(&stored).unsynced_rows, 1);

  let mut b = batch(&sd.store).await;
  let resolved = b.resolve_product(product.id).await.unwrap();
  assert!(resolved.synchronized);
  let keys: Vec<i64> = resolved
    .projection
    .by_feature_slug("size")
    .unwrap()
    .keys()
    .copied()
    .collect();
  assert_eq!(keys, vec![2]);
  b.finish().await.unwrap();

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments[0].position, 2);
  assert!(stored.json_projection.get(1).is_none());
  assert_eq!(stored.json_projection.get(2).unwrap().position, 2);
}

#[tokio::test]
async fn deleted_value_leaves_dangling_entry_that_decodes_cleanly() {
  let sd = seed().await;
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut setup = batch(&sd.store).await;
  let mut p = product.clone();
  setup.assign(&mut p, sd.tag.id, Some(sd.eco.id), true).await.unwrap();
  setup.assign(&mut p, sd.color.id, Some(sd.red.id), false).await.unwrap();
  setup.finish().await.unwrap();

  assert!(sd.store.delete_value(sd.eco.id).await.unwrap());

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments.len(), 1);
  assert_eq!(stored.json_projection.len(), 2);
  assert_eq!(detect_drift(&stored).orphan_entries, vec![1]);

  let b = batch(&sd.store).await;
  let projection = decode(&stored, b.attributes());
  assert_eq!(projection.dangling(), 1);
  assert!(projection.has_value(sd.red.id));
  assert!(!projection.has_value(sd.eco.id));
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_assignment_matches_null_values() {
  let sd = seed().await;
  sd.store.set_default_feature(sd.catalog.id, sd.material.id).await.unwrap();
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut b = batch(&sd.store).await;
  b.resolve_product(product.id).await.unwrap();
  b.finish().await.unwrap();

  let found = sd
    .store
    .find_assignment(product.id, sd.material.id, None)
    .await
    .unwrap();
  assert!(found.is_some_and(|a| a.is_default && a.value_id.is_none()));

  let missing = sd
    .store
    .find_assignment(product.id, sd.material.id, Some(sd.red.id))
    .await
    .unwrap();
  assert!(missing.is_none());
}

#[tokio::test]
async fn removal_is_guarded_by_catalog_defaults() {
  let sd = seed().await;
  sd.store.set_default_value(sd.catalog.id, sd.red.id).await.unwrap();
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut setup = batch(&sd.store).await;
  let mut p = setup.resolve_product(product.id).await.unwrap().product;
  setup.assign(&mut p, sd.size.id, Some(sd.m.id), false).await.unwrap();
  setup.finish().await.unwrap();

  let mut b = batch(&sd.store).await;
  let mut p = sd.store.get_product(product.id).await.unwrap().unwrap();
  let err = b.remove(&mut p, sd.color.id, Some(sd.red.id)).await.unwrap_err();
  assert!(matches!(err, vitrine_core::Error::CatalogDefault { .. }));

  assert!(b.remove(&mut p, sd.size.id, Some(sd.m.id)).await.unwrap());
  assert_eq!(b.finish().await.unwrap().deleted, 1);

  let stored = sd.store.get_product(product.id).await.unwrap().unwrap();
  assert_eq!(stored.assignments.len(), 1);
  assert_eq!(stored.json_projection.len(), 1);
}

// ─── Tenancy ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn foreign_catalog_is_rejected() {
  let sd = seed().await;
  let foreign = sd
    .store
    .create_catalog(NewCatalog { website_id: WebsiteId(2), slug: "main".into() })
    .await
    .unwrap();

  let mut b = batch(&sd.store).await;
  let err = b.resolve_catalog(foreign.id).await.unwrap_err();
  assert!(matches!(
    err,
    vitrine_core::Error::TenantMismatch { actual: WebsiteId(2), .. }
  ));
}

// ─── Views ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn resolved_product_renders_views() {
  let sd = seed().await;
  let product = sd.store.create_product(sd.catalog.id).await.unwrap();

  let mut setup = batch(&sd.store).await;
  let mut p = product.clone();
  setup.assign(&mut p, sd.tag.id, Some(sd.eco_alt.id), true).await.unwrap();
  setup.assign(&mut p, sd.tag.id, Some(sd.eco.id), true).await.unwrap();
  setup.finish().await.unwrap();

  let mut b = batch(&sd.store).await;
  let resolved = b.resolve_product(product.id).await.unwrap();

  let config = ViewConfig {
    unique: BTreeMap::from([
      ("mainColor".to_owned(), "color".to_owned()),
      ("tag".to_owned(), "tag".to_owned()),
    ]),
    multi:  BTreeMap::from([("tags".to_owned(), "tag".to_owned())]),
  };
  let json = serde_json::to_value(resolved.view(&config)).unwrap();

  assert_eq!(json["unique"]["mainColor"], serde_json::Value::Bool(false));
  assert_eq!(json["unique"]["tag"]["value"], "eco-accent");
  let tags = json["multi"]["tags"].as_object().unwrap();
  assert_eq!(tags.len(), 1);
  assert_eq!(tags["eco"]["slug"], "eco");
}
