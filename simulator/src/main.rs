use anyhow::Context;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "OFDM radar and direction-finding workflow driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Run the default range-Doppler scenario when no workflow is given
    #[arg(long, default_value_t = false)]
    ofdm: bool,
    /// Run the default direction-of-arrival scenario when no workflow is given
    #[arg(long, default_value_t = false)]
    doa: bool,
    /// Write the JSON report to this path instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else if args.ofdm || args.doa {
        WorkflowConfig::from_args(args.ofdm, args.doa)
    } else {
        WorkflowConfig::from_args(true, true)
    };

    let result = Runner::new(workflow_config).execute()?;

    if let Some(ofdm) = &result.ofdm {
        println!(
            "OFDM run -> periodogram {}x{}, peak {:?}, expected {:?}",
            ofdm.range_bins, ofdm.doppler_bins, ofdm.peak, ofdm.expected
        );
    }
    if let Some(doa) = &result.doa {
        println!(
            "DOA run -> truth {:?} deg, MUSIC {:?} deg, ESPRIT {:?} deg",
            doa.truth_deg, doa.music_deg, doa.esprit_deg
        );
    }

    let report = serde_json::to_string_pretty(&result).context("serializing workflow report")?;
    match args.report {
        Some(report_path) => {
            if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(&report_path, report)
                .with_context(|| format!("writing report {}", report_path.display()))?;
        }
        None => println!("{}", report),
    }

    Ok(())
}
