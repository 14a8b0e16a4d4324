use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use translit_probe::artifacts::ArtifactStore;
use translit_probe::cases::CaseStore;
use translit_probe::config::Config;
use translit_probe::maintenance::{remap_ids, sync_observed, verify_counts};
use translit_probe::page::{ChromePage, PageDriver};
use translit_probe::report;
use translit_probe::runner::{RunOptions, RunResult, Runner};

/// Translit Probe - acceptance testing for a web transliteration tool
#[derive(Parser, Debug)]
#[command(
    name = "translit-probe",
    about = "Drive a web transliteration tool with a test corpus, score and report the outputs",
    after_help = "ENVIRONMENT VARIABLES:\n\
        TESTCASES_FILE              Test case JSON document\n\
        TRANSLIT_OBSERVED_DIR       Observed-output directory\n\
        TRANSLIT_DEBUG_DIR          Debug snapshot directory\n\
        REPORT_OUT                  Report file\n\
        DISCOVERY                   1 disables assertion enforcement\n\
        TRANSLIT_WORKERS            Concurrent workers (CI forces 1)\n\
        TRANSLIT_SITE_URL           Page under test\n\
        TRANSLIT_HEADLESS           0 shows the browser window\n\
        TRANSLIT_CHROME             Chrome/Chromium executable\n\
        RUST_LOG                    Log filter (default: info)"
)]
struct Args {
    /// Test case JSON document
    #[arg(long, short = 't', global = true, env = "TESTCASES_FILE")]
    testcases: Option<PathBuf>,

    /// Directory holding observed outputs
    #[arg(long, global = true, env = "TRANSLIT_OBSERVED_DIR")]
    observed_dir: Option<PathBuf>,

    /// Directory holding debug page snapshots
    #[arg(long, global = true, env = "TRANSLIT_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the test cases against the live page
    Run {
        /// Comma-separated ids to run (default: all)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,

        /// Observe and persist outputs without enforcing assertions
        #[arg(long)]
        discovery: bool,

        /// Number of concurrent workers
        #[arg(long, short = 'w')]
        workers: Option<usize>,

        /// Show the browser window
        #[arg(long)]
        headed: bool,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,

        /// Also write the run result as JSON to this file
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Build the CSV report from the store and observed outputs
    Report {
        /// Report file
        #[arg(long, short = 'o', env = "REPORT_OUT")]
        out: Option<PathBuf>,
    },

    /// Copy observed outputs into each case's `actual` field
    Sync,

    /// Recount pass/fail per scenario group from observed outputs
    Verify {
        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename legacy ids (POS_FUN_/NEG_FUN_/UI_) in the store and artifact files
    Remap,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(path) = args.testcases {
        config.paths.testcases_file = path;
    }
    if let Some(dir) = args.observed_dir {
        config.paths.observed_dir = dir;
    }
    if let Some(dir) = args.debug_dir {
        config.paths.debug_dir = dir;
    }
    let artifacts = ArtifactStore::from_settings(&config.paths);

    match args.command {
        Some(Commands::Run {
            only,
            discovery,
            workers,
            headed,
            json,
            results,
        }) => {
            if headed {
                config.site.headless = false;
            }

            let store = CaseStore::load(&config.paths.testcases_file)?;
            let cases = store.scenario_cases(&config.run.realtime_case);

            let mut options = RunOptions::from_config(&config);
            options.discovery |= discovery;
            options.only = only;
            if let Some(workers) = workers {
                options.workers = config.run.clone().with_workers(workers).workers;
            }

            let site = config.site.clone();
            let runner = Runner::new(options, artifacts);
            let result = runner.run(&cases, || {
                ChromePage::launch(&site).map(|page| Box::new(page) as Box<dyn PageDriver>)
            });

            if let Some(path) = results {
                std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
                info!(path = %path.display(), "run result written");
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_run(&result);
            }

            if !result.success {
                std::process::exit(1);
            }
        }

        Some(Commands::Report { out }) => {
            let store = CaseStore::load(&config.paths.testcases_file)?;
            let out = out.unwrap_or(config.paths.report_out);
            let summary = report::generate(&store, &artifacts, &out)?;

            println!("Report created: {}", summary.path.display());
            println!("  Rows: {}", summary.rows);
            if summary.missing_observed > 0 {
                println!("  Missing observed outputs: {}", summary.missing_observed);
            }
        }

        Some(Commands::Sync) => {
            let mut store = CaseStore::load(&config.paths.testcases_file)?;
            let summary = sync_observed(&mut store, &artifacts)?;

            println!("Updated actual for {} test cases.", summary.updated);
            if summary.missing > 0 {
                println!("Missing observed files for {} test cases.", summary.missing);
            }
            println!("Wrote: {}", store.path.display());
        }

        Some(Commands::Verify { json }) => {
            let store = CaseStore::load(&config.paths.testcases_file)?;
            let summary = verify_counts(&store, &artifacts, &config.run.realtime_case)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary);
            }
        }

        Some(Commands::Remap) => {
            let mut store = CaseStore::load(&config.paths.testcases_file)?;
            let summary = remap_ids(&mut store, &artifacts)?;

            if summary.mapping.is_empty() {
                println!("No matching ids found to rename.");
            } else {
                println!("Updated ids in: {}", store.path.display());
                for (old, new) in &summary.mapping {
                    println!("  {} -> {}", old, new);
                }
                println!("Renamed observed files: {}", summary.renamed_observed);
                println!("Renamed debug files: {}", summary.renamed_debug);
            }
        }

        None => {
            println!("Translit Probe - acceptance testing for a web transliteration tool");
            println!();
            println!("Usage: translit-probe <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run     Run the test cases against the live page");
            println!("  report  Build the CSV report");
            println!("  sync    Copy observed outputs into the store");
            println!("  verify  Recount pass/fail per scenario group");
            println!("  remap   Rename legacy ids in the store and artifacts");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn print_run(result: &RunResult) {
    for case in &result.cases {
        let status = if let Some(err) = &case.error {
            format!("ERROR {}", err)
        } else if let Some(failure) = &case.assertion_failure {
            format!("{} (assertion: {})", case.verdict.as_str(), failure)
        } else if case.verdict.is_scored() {
            case.verdict.as_str().to_string()
        } else {
            "recorded".to_string()
        };
        println!("  {:<14} {:<12} {}", case.id, case.scenario.group(), status);
        if let Some(notes) = &case.notes {
            println!("  {:<14} {:<12} note: {}", "", "", notes);
        }
    }

    let summary = &result.summary;
    println!();
    println!(
        "Run {}: {} cases, {} passed, {} failed, {} recorded, {} errors",
        if result.success { "succeeded" } else { "failed" },
        summary.total,
        summary.passed,
        summary.failed,
        summary.unscored,
        summary.errors
    );
}
