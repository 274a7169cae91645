use std::process::ExitCode;

use clap::{arg, command, Parser, ValueEnum};
use error_stack::ResultExt;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use tm::commands::{init, nodes, ports, show, SubCommand};
use tm::config::{Filename, PathContext};
use tm::Error;

#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Home directory holding config.toml, defaults to ~/.tm
    #[arg(long, env = "TM_HOME", global = true)]
    pub home: Option<String>,

    /// Config file path, takes precedence over --home
    #[arg(short, long, env = "TM_CONFIG", global = true)]
    pub config: Option<String>,

    /// Set the output style of the logs
    #[arg(short, long, value_enum, default_value_t = Output::Text, global = true)]
    pub output: Output,

    /// Log at debug level
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, Clone, Parser, ValueEnum)]
enum Output {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args: Args = Args::parse();
    set_up_logger(&args.output, level(&args));

    let ctx = PathContext {
        config: args.config.clone(),
        home: args.home.clone(),
    };

    let result = Filename::resolve(&ctx)
        .change_context(Error::ConfigLocation)
        .and_then(|filename| {
            debug!(path = %filename.path.display(), "resolved config file");

            match args.cmd {
                SubCommand::Init => init::run(filename),
                SubCommand::Show => show::run(filename),
                SubCommand::Nodes(args) => nodes::run(filename, args),
                SubCommand::Ports(args) => ports::run(filename, args),
            }
        });

    match result {
        Ok(response) => {
            if let Some(resp) = response.filter(|resp| !resp.is_empty()) {
                println!("{resp}");
            }
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!("{report:#}");

            // print detailed error report as the last output if in text mode
            if matches!(args.output, Output::Text) {
                eprintln!("{report:?}");
            }

            ExitCode::FAILURE
        }
    }
}

fn level(args: &Args) -> LevelFilter {
    match (args.debug, args.quiet) {
        (true, _) => LevelFilter::DEBUG,
        (false, true) => LevelFilter::WARN,
        (false, false) => LevelFilter::INFO,
    }
}

fn set_up_logger(output: &Output, level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    match output {
        Output::Json => {
            tracing_subscriber::fmt()
                .json()
                .flatten_event(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        Output::Text => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    };
}
