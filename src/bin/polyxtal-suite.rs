use eyre::eyre;
use log::{error, info};
use polyxtal::comm::{run_threaded, ExecutionContext};
use polyxtal::process::ProcessKind;
use polyxtal::suite::{run_suite, SUITES};
use std::path::PathBuf;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "polyxtal-suite",
    about = "Runs the built-in polycrystal simulation suites"
)]
struct Options {
    /// Suite to run.
    #[structopt(short, long, default_value = "linear-single-crystal")]
    suite: String,

    /// Root directory below which `Outputs/` is created.
    #[structopt(short, long, parse(from_os_str), default_value = ".")]
    output: PathBuf,

    /// Number of in-process ranks.
    #[structopt(short, long, default_value = "1")]
    ranks: usize,

    /// Only run jobs of this process.
    #[structopt(short, long)]
    process: Option<ProcessKind>,

    /// List the available suites and processes and exit.
    #[structopt(long)]
    list: bool,
}

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let options = Options::from_args();

    if options.list {
        println!("Suites:");
        for suite in SUITES {
            println!("  {suite}");
        }
        println!("Processes:");
        for process in ProcessKind::ALL {
            println!("  {process}");
        }
        return Ok(());
    }

    if options.ranks == 0 {
        return Err(eyre!("the number of ranks must be positive"));
    }

    let results = if options.ranks == 1 {
        vec![run_suite(
            &ExecutionContext::serial(),
            &options.suite,
            &options.output,
            options.process,
        )]
    } else {
        run_threaded(options.ranks, |ctx| {
            run_suite(&ctx, &options.suite, &options.output, options.process)
        })
    };

    // All ranks run the same jobs, so rank 0 speaks for the group.
    let mut results = results.into_iter();
    let reports = results
        .next()
        .ok_or_else(|| eyre!("no rank returned a result"))?
        .map_err(|err| {
            error!("Suite \"{}\" failed", options.suite);
            err
        })?;
    for report in &reports {
        let iterations = report
            .solver
            .map(|solver| format!(", {} solver iterations", solver.iterations))
            .unwrap_or_default();
        info!(
            "{}: {} grains{}",
            report.output_directory.display(),
            report.grain_averages.volume.len(),
            iterations
        );
    }
    Ok(())
}
