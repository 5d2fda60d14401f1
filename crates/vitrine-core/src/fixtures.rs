//! Shared in-memory fixtures for the engine's unit tests.

use crate::{
  attribute::{Feature, Translations, Value},
  attribute_catalog::{AttributeCatalog, LocaleTitles},
  catalog::CatalogDefaults,
  id::{AssignmentId, CatalogId, FeatureId, ProductId, ValueId, WebsiteId},
  product::{Assignment, Product},
};

pub struct Fixture {
  pub features: Vec<Feature>,
  pub values:   Vec<Value>,
  pub catalog:  AttributeCatalog,
  next_row:     i64,
}

impl Fixture {
  /// Website 1 with `color`, `size`, `tag` and `material` features.
  pub fn new() -> Self {
    let feature = |id: i64, slug: &str, title: &str| Feature {
      id:         FeatureId(id),
      slug:       slug.into(),
      website_id: WebsiteId(1),
      titles:     Translations::new().with("en", title),
    };
    let value = |id: i64, feature: i64, slug: &str, title: &str| Value {
      id:         ValueId(id),
      slug:       slug.into(),
      feature_id: FeatureId(feature),
      titles:     Translations::new().with("en", title),
    };

    let features = vec![
      feature(1, "color", "Colour"),
      feature(2, "size", "Size"),
      feature(3, "tag", "Tag"),
      feature(4, "material", "Material"),
    ];
    let values = vec![
      value(10, 1, "red", "Red"),
      value(11, 1, "blue", "Blue"),
      value(20, 2, "m", "M"),
      value(21, 2, "l", "L"),
      value(30, 3, "eco-accent", "Éco"),
      value(31, 3, "eco", "Eco"),
      value(32, 3, "handmade", "Handmade"),
      value(40, 4, "cotton", "Cotton"),
    ];
    let catalog = AttributeCatalog::build(
      WebsiteId(1),
      &features,
      &values,
      &LocaleTitles::new("en"),
    );

    Self { features, values, catalog, next_row: 100 }
  }

  pub fn feature(&self, slug: &str) -> &Feature {
    self
      .features
      .iter()
      .find(|f| f.slug == slug)
      .unwrap_or_else(|| panic!("no fixture feature {slug:?}"))
  }

  pub fn value(&self, slug: &str) -> &Value {
    self
      .values
      .iter()
      .find(|v| v.slug == slug)
      .unwrap_or_else(|| panic!("no fixture value {slug:?}"))
  }

  pub fn defaults(&self, values: &[&str], features: &[&str]) -> CatalogDefaults {
    CatalogDefaults {
      catalog_id: CatalogId(1),
      values:     values.iter().map(|s| self.value(s).clone()).collect(),
      features:   features.iter().map(|s| self.feature(s).clone()).collect(),
    }
  }

  pub fn product(&self) -> Product { Product::new(ProductId(1), CatalogId(1)) }

  /// Push a flushed assignment row; the projection is left untouched.
  pub fn assign(
    &mut self,
    product: &mut Product,
    feature: &str,
    value: Option<&str>,
    position: i64,
    feature_position: i64,
  ) {
    self.next_row += 1;
    product.assignments.push(Assignment {
      id:               Some(AssignmentId(self.next_row)),
      product_id:       product.id,
      feature_id:       self.feature(feature).id,
      value_id:         value.map(|v| self.value(v).id),
      position,
      feature_position,
      is_default:       false,
      display_in_array: false,
    });
  }
}
