//! `vitrine`: run attribute resolution batches against a Vitrine store.
//!
//! # Usage
//!
//! ```text
//! vitrine --config vitrine.toml render --catalog 3
//! vitrine render --catalog 3 --product 17 --dry-run
//! vitrine sync --catalog 3
//! vitrine drift --catalog 3
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vitrine_core::{
  batch::ResolutionBatch,
  id::{CatalogId, ProductId},
  position::{ProjectionDrift, detect_drift},
  product::Product,
  store::CatalogStore,
};
use vitrine_store_sqlite::SqliteStore;

use settings::Settings;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Vitrine catalog attribute engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vitrine.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Resolve products and print their rendering-ready views as JSON.
  Render {
    #[arg(long)]
    catalog: i64,
    /// Only this product.
    #[arg(long)]
    product: Option<i64>,
    /// Resolve without persisting backfills or drift corrections.
    #[arg(long)]
    dry_run: bool,
  },
  /// Backfill defaults and correct drift for a whole catalog.
  Sync {
    #[arg(long)]
    catalog: i64,
  },
  /// Report projection drift for a catalog without writing.
  Drift {
    #[arg(long)]
    catalog: i64,
  },
}

#[derive(Serialize)]
struct DriftLine {
  product: ProductId,
  #[serde(flatten)]
  drift:   ProjectionDrift,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = expand_tilde(&settings.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Render { catalog, product, dry_run } => {
      render(&store, &settings, CatalogId(catalog), product.map(ProductId), dry_run)
        .await
    }
    Command::Sync { catalog } => sync(&store, &settings, CatalogId(catalog)).await,
    Command::Drift { catalog } => drift(&store, CatalogId(catalog)).await,
  }
}

async fn render(
  store: &SqliteStore,
  settings: &Settings,
  catalog: CatalogId,
  product: Option<ProductId>,
  dry_run: bool,
) -> anyhow::Result<()> {
  let mut batch = ResolutionBatch::open(store, settings.website(), &settings.titles())
    .await
    .context("failed to open resolution batch")?;

  let resolved = match product {
    Some(id) => {
      let product = store
        .get_product(id)
        .await
        .with_context(|| format!("failed to load product {id}"))?
        .with_context(|| format!("product {id} not found"))?;
      ensure_in_catalog(&product, catalog)?;
      vec![batch.resolve(product).await?]
    }
    None => batch.resolve_catalog(catalog).await?,
  };

  let views: Vec<_> = resolved.iter().map(|r| r.view(&settings.view)).collect();
  println!("{}", serde_json::to_string_pretty(&views)?);

  if dry_run {
    tracing::info!(pending = batch.pending().len(), "dry run; discarding writes");
    return Ok(());
  }
  batch.finish().await.context("failed to flush batch")?;
  Ok(())
}

async fn sync(
  store: &SqliteStore,
  settings: &Settings,
  catalog: CatalogId,
) -> anyhow::Result<()> {
  let mut batch = ResolutionBatch::open(store, settings.website(), &settings.titles())
    .await
    .context("failed to open resolution batch")?;
  let resolved = batch.resolve_catalog(catalog).await?;
  let report = batch.finish().await.context("failed to flush batch")?;

  tracing::info!(
    products = resolved.len(),
    backfilled = resolved.iter().filter(|r| r.backfilled).count(),
    synchronized = resolved.iter().filter(|r| r.synchronized).count(),
    "catalog synchronised"
  );
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

async fn drift(store: &SqliteStore, catalog: CatalogId) -> anyhow::Result<()> {
  let products = store
    .list_products(catalog)
    .await
    .with_context(|| format!("failed to list products of catalog {catalog}"))?;

  let lines: Vec<DriftLine> = products
    .iter()
    .map(|p| DriftLine { product: p.id, drift: detect_drift(p) })
    .filter(|line| !line.drift.is_clean())
    .collect();

  tracing::info!(
    products = products.len(),
    drifted = lines.len(),
    "drift check complete"
  );
  println!("{}", serde_json::to_string_pretty(&lines)?);
  Ok(())
}

/// Refuse a `--product` that belongs to a catalog other than `--catalog`.
fn ensure_in_catalog(product: &Product, catalog: CatalogId) -> anyhow::Result<()> {
  if product.catalog_id != catalog {
    anyhow::bail!(
      "product {} belongs to catalog {}, not {catalog}",
      product.id,
      product.catalog_id
    );
  }
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
