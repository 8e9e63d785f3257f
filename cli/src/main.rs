use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use structopt::StructOpt;

fn main() {
    let cli_args = CliArgs::from_args();

    let level = match cli_args.verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = cli_args.run() {
        log::error!("{e:?}");
        std::process::exit(1)
    }
}

/// Regenerates the expected-value test fixtures of the DNN library.
#[derive(Debug, StructOpt)]
#[structopt(name = "refgen", about = "Generates reference test fixtures")]
pub struct CliArgs {
    #[structopt(short = "v", parse(from_occurrences))]
    pub verbosity: usize,
    /// Root of the library test tree (defaults to REFGEN_TEST_DIR, then to
    /// the nearest enclosing `test` directory holding `gen/`)
    #[structopt(long = "test-dir")]
    pub test_dir: Option<PathBuf>,
    /// Only generate the named suites (repeatable)
    #[structopt(long = "only", number_of_values = 1)]
    pub only: Vec<String>,
    /// Print the suites and the files they would produce, write nothing
    #[structopt(long = "list")]
    pub list: bool,
    /// Compute and render every fixture, write nothing
    #[structopt(long = "dry-run")]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn run(&self) -> Result<()> {
        let suites = refgen_suite::select(&self.only)?;
        if self.list {
            for (name, suite) in &suites {
                println!("{name}: {} files", suite.len());
                for file in suite.filenames() {
                    println!("  {file}");
                }
            }
            return Ok(());
        }
        if self.dry_run {
            for (name, suite) in &suites {
                let rendered =
                    suite.render_all().with_context(|| format!("Rendering suite {name}"))?;
                let bytes: usize = rendered.iter().map(|(_, content)| content.len()).sum();
                log::info!("{name}: {} files, {bytes} bytes", rendered.len());
            }
            return Ok(());
        }
        let test_dir = refgen_infra::discover_test_dir(self.test_dir.as_deref())?;
        log::info!(
            "Generating {} into {}",
            suites.iter().map(|(name, _)| name).join(", "),
            test_dir.display()
        );
        for (name, suite) in &suites {
            suite
                .write_to(&test_dir)
                .with_context(|| format!("Writing suite {name} under {}", test_dir.display()))?;
        }
        Ok(())
    }
}
