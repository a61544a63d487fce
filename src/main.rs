//! LazyBars - level-keyed action bar layouts from the command line
//!
//! Thin shell over the library: parses arguments, installs logging, loads the
//! state from the data directory and dispatches to one command.

use clap::{Parser, Subcommand};
use lazybars::cli::{
    CliResult, DiffArgs, ExitCode, ExportArgs, GlobalArgs, ImportArgs, KeyframeArgs, PushArgs,
    Session, ShowArgs, TemplatesArgs,
};
use lazybars::config::Config;
use lazybars::constants::APP_BINARY_NAME;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// LazyBars - level-keyed action bar layouts
#[derive(Parser, Debug)]
#[command(name = APP_BINARY_NAME, author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show a level or list stored levels
    Show(ShowArgs),
    /// Show what changed between two levels
    Diff(DiffArgs),
    /// Manage keyframe levels
    Keyframe(KeyframeArgs),
    /// Push a level's layout to neighbouring levels
    Push(PushArgs),
    /// Export layouts as a shareable string
    Export(ExportArgs),
    /// Import an export string
    Import(ImportArgs),
    /// Manage named templates
    Templates(TemplatesArgs),
}

fn init_tracing(verbose: bool, config: &Config) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli, config: &Config) -> CliResult<()> {
    let mut session = Session::open(&cli.global, config)?;
    match &cli.command {
        Command::Show(args) => args.execute(&mut session),
        Command::Diff(args) => args.execute(&mut session),
        Command::Keyframe(args) => args.execute(&mut session),
        Command::Push(args) => args.execute(&mut session),
        Command::Export(args) => args.execute(&session),
        Command::Import(args) => args.execute(&mut session),
        Command::Templates(args) => args.execute(&mut session),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match cli.global.load_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(err.exit_code());
        }
    };
    init_tracing(cli.global.verbose, &config);

    let code = match run(&cli, &config) {
        Ok(()) => ExitCode::Success.code(),
        Err(err) => {
            eprintln!("Error: {err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}
