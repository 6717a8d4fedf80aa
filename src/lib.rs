//! A library for naming Objective-C `objc_msgSend` stubs
//!
//! Recent Apple linkers emit one small stub per selector in `__objc_stubs`:
//! it loads the selector reference with `adrp`/`ldr` and tail-calls
//! `objc_msgSend` through `adrp`/`ldr`/`br`. Stripped binaries leave these as
//! anonymous `sub_*` functions. This crate recognises the stub shape, follows
//! the selector reference to its C string and renames the stub `<selector>()`.

pub mod analyzer;
pub mod cache;
pub mod constants;
pub mod errors;
pub mod generator;
pub mod image;
pub mod models;
pub mod utils;

use std::path::Path;
use anyhow::{Context, Result};
use log::info;

use crate::analyzer::{Analyzer, RenameOptions};
use crate::cache::Cache;
use crate::generator::ReportFormat;
use crate::models::report::RenameReport;

/// Options for a run over a binary on disk
#[derive(Debug, Clone)]
pub struct FixOptions {
    /// Options for the renaming pass itself
    pub rename: RenameOptions,
    /// Format used when saving the report
    pub format: ReportFormat,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            rename: RenameOptions::default(),
            format: ReportFormat::Json,
        }
    }
}

/// Load a binary, rename its stubs and return the report
///
/// With `use_cache`, a report previously computed for the same bytes and
/// options is returned without re-analyzing. The report is written to
/// `output_path` when one is given.
pub async fn fix_stubs(
    binary_path: &Path,
    output_path: Option<&Path>,
    options: &FixOptions,
    use_cache: bool,
) -> Result<RenameReport> {
    fix_stubs_with_cache(binary_path, output_path, options, use_cache.then(Cache::new).as_ref()).await
}

/// `fix_stubs` with an explicit cache location (or none)
pub async fn fix_stubs_with_cache(
    binary_path: &Path,
    output_path: Option<&Path>,
    options: &FixOptions,
    cache: Option<&Cache>,
) -> Result<RenameReport> {
    let bytes = tokio::fs::read(binary_path)
        .await
        .with_context(|| format!("Failed to read binary: {}", binary_path.display()))?;
    let digest = utils::hash::image_digest(&bytes);
    let key = utils::hash::cache_key(&digest, &options.rename.segment, &options.rename.auto_name_prefix);

    let cached = match cache {
        Some(cache) => cache.get_report(&key)?,
        None => None,
    };

    let report = match cached {
        Some(report) => {
            info!("Using cached report for {}", binary_path.display());
            report
        }
        None => {
            let image_name = binary_path.display().to_string();
            let image = image::load_macho(&bytes, Some(&image_name))?;

            let analyzer = Analyzer::new(options.rename.clone());
            let (_, mut report) = analyzer.rename_concurrently(image).await?;
            report.set_image(image_name, digest);

            if let Some(cache) = cache {
                cache.save_report(&key, &report)?;
            }
            report
        }
    };

    if let Some(path) = output_path {
        generator::save_report(&report, path, options.format)?;
    }

    Ok(report)
}

/// Version of the stub fixer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
