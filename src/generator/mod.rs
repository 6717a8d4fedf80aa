//! Report export

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use anyhow::{Context, Result};
use log::{debug, info};
use crate::models::report::RenameReport;

/// Output format for a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Pretty-printed JSON report
    Json,
    /// One `0x<ADDR> <name>` line per renamed stub
    SymbolMap,
}

impl std::str::FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "map" => Ok(ReportFormat::SymbolMap),
            other => Err(anyhow::anyhow!("Unknown format: {} (expected json or map)", other)),
        }
    }
}

/// Render renamed stubs as a symbol map, in address order
pub fn to_symbol_map(report: &RenameReport) -> String {
    let mut renamed: Vec<_> = report.renamed.iter().collect();
    renamed.sort_by_key(|r| r.address);

    let mut out = String::new();
    for stub in renamed {
        let _ = writeln!(out, "0x{:X} {}", stub.address, stub.new_name);
    }
    out
}

/// Render a report in `format`
pub fn render_report(report: &RenameReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)
            .with_context(|| "Failed to serialize report to JSON"),
        ReportFormat::SymbolMap => Ok(to_symbol_map(report)),
    }
}

/// Save a report to a file, creating parent directories as needed
pub fn save_report(report: &RenameReport, path: &Path, format: ReportFormat) -> Result<()> {
    let absolute_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if let Some(parent) = absolute_path.parent() {
        if !parent.exists() {
            debug!("Creating directory: {}", parent.display());
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let rendered = render_report(report, format)?;

    let mut file = File::create(&absolute_path)
        .with_context(|| format!("Failed to create file: {}", absolute_path.display()))?;
    file.write_all(rendered.as_bytes())
        .with_context(|| format!("Failed to write to file: {}", absolute_path.display()))?;

    info!("Saved report ({} bytes) to: {}", rendered.len(), absolute_path.display());
    Ok(())
}
