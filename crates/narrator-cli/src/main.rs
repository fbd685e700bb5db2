use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

use commands::play::PlayArgs;
use commands::synth::SynthArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize voice-over audio for scenes that have none
    Synth(SynthArgs),
    /// Play a scene file headless against a simulated clock
    Play(PlayArgs),
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_directive(level))
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn level_directive(level: LogLevel) -> tracing_subscriber::filter::Directive {
    let level = match level {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    };
    tracing_subscriber::filter::LevelFilter::from_level(level).into()
}

#[tokio::main]
async fn main() {
    // A local .env may carry the synthesis key.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    let result = match cli.command {
        Command::Synth(args) => commands::synth::run(args).await,
        Command::Play(args) => commands::play::run(args),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
