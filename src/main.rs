//! Combines NVD CVE batches with distro advisory parts into OSV files.

use std::path::PathBuf;

use clap::Parser;
use combine_to_osv::config::{DEFAULT_CVE_PATH, DEFAULT_OSV_OUTPUT_PATH, DEFAULT_PARTS_PATH};
use combine_to_osv::{CombineConfig, CombinePipeline, Reporter};

#[derive(Parser)]
#[command(name = "combine-to-osv", version, about)]
struct Cli {
    /// Directory of NVD CVE API 2.0 batch files.
    #[arg(long, default_value = DEFAULT_CVE_PATH)]
    cve_path: PathBuf,

    /// Directory of per-ecosystem advisory part directories.
    #[arg(long, default_value = DEFAULT_PARTS_PATH)]
    parts_path: PathBuf,

    /// Directory to write OSV records to.
    #[arg(long, default_value = DEFAULT_OSV_OUTPUT_PATH)]
    osv_output_path: PathBuf,

    /// Path to a clone of https://github.com/CVEProject/cvelistV5 (empty disables dispute checks).
    #[arg(long, default_value = "")]
    cve_list_path: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let reporter = Reporter::stderr("combine-to-osv");

    let config = CombineConfig::default()
        .with_cve_path(cli.cve_path)
        .with_parts_path(cli.parts_path)
        .with_output_path(cli.osv_output_path)
        .with_cve_list_path(cli.cve_list_path);

    if let Err(e) = CombinePipeline::new(config).execute(&reporter) {
        reporter.error(format_args!("{e}"));
        return Err(e.into());
    }
    Ok(())
}
