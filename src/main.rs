use anyhow::Result;
use objc_stub_fixer::{fix_stubs, cache::Cache, generator, FixOptions};
use std::path::PathBuf;
use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

// Simple CLI without clap
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");

    // Initialize logger
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default(),
                record.level(),
                record.args()
            )
        })
        .filter(None, if verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .parse_default_env()
        .init();

    // Check for --version command
    if args.len() > 1 && (args[1] == "--version" || args[1] == "-v") {
        println!("ObjC Stub Fixer v{}", objc_stub_fixer::VERSION);
        return Ok(());
    }

    // Check for --clear-cache command
    if args.len() > 1 && args[1] == "--clear-cache" {
        let cache = Cache::new();
        if args.len() > 2 {
            cache.clear(&args[2])?;
            println!("Cleared cached report: {}", args[2]);
        } else {
            cache.clear_all()?;
            println!("Cleared all cached reports");
        }
        return Ok(());
    }

    if args.len() < 2 || args[1].starts_with('-') {
        println!("ObjC Stub Fixer v{}", objc_stub_fixer::VERSION);
        println!("\nUsage:");
        println!("  {} <BINARY> [--output PATH] [--format json|map] [--segment NAME] [--prefix PREFIX] [--jobs N] [--no-cache] [--verbose]", args[0]);
        println!("  {} --clear-cache [KEY]", args[0]);
        println!("  {} --version", args[0]);
        println!("\nOptions:");
        println!("  --output, -o PATH    Save the report to the specified file path");
        println!("  --format, -f FMT     Report format: json (default) or map");
        println!("  --segment NAME       Segment to scan (default: __TEXT)");
        println!("  --prefix PREFIX      Name prefix of candidate functions (default: sub_)");
        println!("  --jobs, -j N         Number of analysis workers (default: CPU count)");
        println!("  --no-cache           Don't use cached results");
        println!("  --verbose            Debug logging");
        println!("  --clear-cache        Clear all cached reports, or the one with KEY");
        println!("  --version, -v        Show version information");
        return Ok(());
    }

    let binary_path = PathBuf::from(&args[1]);

    // Parse optional arguments
    let mut options = FixOptions::default();
    let mut output_path = None;
    let mut no_cache = false;

    let mut i = 2;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--output" | "-o", Some(v)) => {
                output_path = Some(PathBuf::from(v));
                i += 2;
            },
            ("--format" | "-f", Some(v)) => {
                options.format = v.parse::<generator::ReportFormat>()?;
                i += 2;
            },
            ("--segment", Some(v)) => {
                options.rename.segment = v.clone();
                i += 2;
            },
            ("--prefix", Some(v)) => {
                options.rename.auto_name_prefix = v.clone();
                i += 2;
            },
            ("--jobs" | "-j", Some(v)) => {
                options.rename.jobs = v.parse()?;
                i += 2;
            },
            ("--output" | "-o" | "--format" | "-f" | "--segment" | "--prefix" | "--jobs" | "-j", None) => {
                println!("Error: Missing value for {}", args[i]);
                return Ok(());
            },
            ("--no-cache", _) => {
                no_cache = true;
                i += 1;
            },
            ("--verbose", _) => {
                i += 1;
            },
            _ => {
                println!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    println!("Fixing stubs in: {}", binary_path.display());

    let report = fix_stubs(&binary_path, output_path.as_deref(), &options, !no_cache).await?;

    // Print the report if no output path specified
    match output_path {
        None => println!("{}", generator::render_report(&report, options.format)?),
        Some(path) => {
            println!("Renamed {} stubs", report.renamed_count());
            println!("Saved to: {}", path.display());
        }
    }

    Ok(())
}
