//! SQL schema for the Vitrine SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS feature (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id  INTEGER NOT NULL,
    slug        TEXT    NOT NULL,
    titles      TEXT    NOT NULL DEFAULT '{}',   -- JSON locale -> title
    UNIQUE (website_id, slug)
);

CREATE TABLE IF NOT EXISTS feature_value (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    feature_id  INTEGER NOT NULL REFERENCES feature(id) ON DELETE CASCADE,
    slug        TEXT    NOT NULL,
    titles      TEXT    NOT NULL DEFAULT '{}',
    UNIQUE (feature_id, slug)
);

CREATE TABLE IF NOT EXISTS catalog (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id  INTEGER NOT NULL,
    slug        TEXT    NOT NULL,
    UNIQUE (website_id, slug)
);

CREATE TABLE IF NOT EXISTS catalog_default_feature (
    catalog_id  INTEGER NOT NULL REFERENCES catalog(id) ON DELETE CASCADE,
    feature_id  INTEGER NOT NULL REFERENCES feature(id) ON DELETE CASCADE,
    PRIMARY KEY (catalog_id, feature_id)
);

CREATE TABLE IF NOT EXISTS catalog_default_value (
    catalog_id  INTEGER NOT NULL REFERENCES catalog(id) ON DELETE CASCADE,
    value_id    INTEGER NOT NULL REFERENCES feature_value(id) ON DELETE CASCADE,
    PRIMARY KEY (catalog_id, value_id)
);

-- json_values is the denormalised projection; it is rewritten wholesale on
-- every flush and never cascaded.
CREATE TABLE IF NOT EXISTS product (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_id  INTEGER NOT NULL REFERENCES catalog(id),
    json_values TEXT    NOT NULL DEFAULT '{}',
    updated_at  TEXT                             -- RFC 3339 UTC
);

CREATE TABLE IF NOT EXISTS feature_value_product (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id       INTEGER NOT NULL REFERENCES product(id) ON DELETE CASCADE,
    feature_id       INTEGER NOT NULL REFERENCES feature(id) ON DELETE CASCADE,
    value_id         INTEGER REFERENCES feature_value(id) ON DELETE CASCADE,
    position         INTEGER NOT NULL,
    feature_position INTEGER NOT NULL,
    as_default       INTEGER NOT NULL DEFAULT 0,
    display_in_array INTEGER NOT NULL DEFAULT 0
);

-- One row per (product, feature, value); NULL values compare equal here.
CREATE UNIQUE INDEX IF NOT EXISTS fvp_unique_idx
    ON feature_value_product(product_id, feature_id, IFNULL(value_id, 0));
CREATE INDEX IF NOT EXISTS fvp_product_idx ON feature_value_product(product_id);
CREATE INDEX IF NOT EXISTS feature_website_idx ON feature(website_id);
CREATE INDEX IF NOT EXISTS product_catalog_idx ON product(catalog_id);

PRAGMA user_version = 1;
";
