//! Runtime configuration, layered from a TOML file and `VITRINE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use vitrine_core::{attribute_catalog::LocaleTitles, defaults::ViewConfig, id::WebsiteId};

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
  pub store_path:      PathBuf,
  pub website_id:      i64,
  #[serde(default = "default_locale")]
  pub locale:          String,
  pub fallback_locale: Option<String>,
  /// Slot layout of the rendered views.
  #[serde(default)]
  pub view:            ViewConfig,
}

fn default_locale() -> String { "en".to_owned() }

impl Settings {
  /// Read `path` (optional) and overlay the `VITRINE_*` environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_from(path, None) }

  /// As [`Settings::load`], reading variables from `env` instead of the
  /// process environment when given.
  fn load_from(
    path: &Path,
    env: Option<config::Map<String, String>>,
  ) -> anyhow::Result<Self> {
    // `VITRINE_WEBSITE_ID`, `VITRINE_VIEW__UNIQUE__SIZE`, ...
    let environment = config::Environment::with_prefix("VITRINE")
      .prefix_separator("_")
      .separator("__")
      .source(env);

    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(environment)
      .build()
      .context("failed to read config file")?;

    raw
      .try_deserialize()
      .context("failed to deserialise Settings")
  }

  pub fn website(&self) -> WebsiteId { WebsiteId(self.website_id) }

  pub fn titles(&self) -> LocaleTitles {
    let titles = LocaleTitles::new(&self.locale);
    match &self.fallback_locale {
      Some(fallback) => titles.with_fallback(fallback),
      None => titles,
    }
  }
}
