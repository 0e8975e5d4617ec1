use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use globsweep::config::{default_config_path, Config, PatternSource, DEFAULT_CONFIG_NAME};
use globsweep::progress::{delete_bar, search_spinner};
use globsweep::report::{print_matches, print_outcomes, print_summary};
use globsweep::{
    compile_patterns, find, remove, CancelFlag, CleanError, MatchOptions, OsFilesystem, Summary,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Recursively find and delete files and directories matching glob patterns",
    long_about = None
)]
struct Args {
    /// Location from which to recursively search for patterns (defaults to current directory)
    #[arg(long, short)]
    location: Option<PathBuf>,

    /// Pattern file, one pattern per line, or a .toml file with `patterns` and `exclude`
    /// (defaults to ~/.config/clean.maintenance)
    #[arg(long, short, env = "GLOBSWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Use the built-in patterns instead of a pattern file (takes precedence over --config)
    #[arg(long, short)]
    builtin: bool,

    /// Extra patterns appended after the configured ones
    #[arg(long, short, num_args = 1..)]
    extra_patterns: Vec<String>,

    /// Directory name to never descend into (can be given multiple times)
    #[arg(long, short = 'x')]
    exclude: Vec<String>,

    /// Log every cleaned and failed item
    #[arg(long)]
    log: bool,

    /// List what would be removed, but don't delete anything
    #[arg(long, short = 'n')]
    dry_run: bool,

    /// Calculate the size of every match and report reclaimed space
    #[arg(long, short)]
    sizes: bool,

    /// List every match before deleting and every outcome after
    #[arg(long, short)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();
}

fn pattern_source(args: &Args) -> Result<PatternSource> {
    if args.builtin {
        return Ok(PatternSource::Builtin);
    }

    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().ok_or_else(|| CleanError::MissingConfig {
            path: PathBuf::from("~/.config").join(DEFAULT_CONFIG_NAME),
        })?,
    };
    Ok(PatternSource::File(path))
}

fn run(args: Args) -> Result<u8> {
    if args.log {
        init_logging(args.verbose);
    }

    let source = pattern_source(&args)?;
    let config = Config::resolve(
        args.location.clone(),
        &source,
        &args.extra_patterns,
        &args.exclude,
    )
    .context("Failed to load cleaning configuration")?;

    let patterns = compile_patterns(&config.patterns)?;
    let options = MatchOptions {
        exclude: config.exclude.clone(),
        calculate_sizes: args.sizes,
    };
    let cancel = CancelFlag::new();
    if let Err(err) = cancel.cancel_on_interrupt() {
        tracing::warn!("Ctrl-C will stop the run abruptly: {}", err);
    }

    // Phase 1: find everything before touching anything
    let spinner = search_spinner(args.log);
    let matches = find(&config.root, &patterns, &options, &spinner, &cancel)?;
    spinner.finish_and_clear();

    let root = config.root.canonicalize().unwrap_or(config.root.clone());
    println!(
        "{}",
        format!("Found {} matches in {}", matches.len(), root.display()).bold()
    );

    if args.verbose || args.dry_run {
        print_matches(&matches, &root, args.sizes);
    }

    if args.dry_run {
        println!("Dry run mode: No files were deleted.");
        return Ok(0);
    }

    // Phase 2: delete the complete set
    let bar = delete_bar(args.log);
    let removal = remove(&matches, &OsFilesystem, &bar, &cancel);
    bar.finish_and_clear();

    print_outcomes(&removal, args.verbose);

    let summary = Summary::from_removal(&removal);
    print_summary(&summary, args.sizes);

    Ok(summary.exit_code())
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            let code = err
                .downcast_ref::<CleanError>()
                .map(CleanError::exit_code)
                .unwrap_or(3);
            ExitCode::from(code)
        }
    }
}
