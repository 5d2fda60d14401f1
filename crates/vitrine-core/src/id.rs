//! Strongly typed integer identifiers.
//!
//! All entities are keyed by database-assigned integers. Each kind gets its
//! own newtype so a `FeatureId` can never be passed where a `ValueId` is
//! expected. Ordering is numeric, which the engine relies on for stable
//! ascending-id iteration.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl $name {
      pub fn get(self) -> i64 { self.0 }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }
  };
}

id_type!(
  /// The tenant. Features, values and catalogs never cross websites.
  WebsiteId
);
id_type!(FeatureId);
id_type!(ValueId);
id_type!(CatalogId);
id_type!(ProductId);
id_type!(
  /// Row id of a feature/value/product assignment.
  AssignmentId
);
