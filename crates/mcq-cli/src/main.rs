mod cmd;
mod output;
mod root;

use clap::{ArgAction, Parser, Subcommand};
use cmd::{
    ai::AiSubcommand, config::ConfigSubcommand, context::ContextSubcommand,
    jira::JiraSubcommand, templates::TemplatesSubcommand,
};
use mcq_core::UserError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mcq",
    about = "Turn rough feature requests into user stories and JIRA issues",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: nearest go.mod or .git above the current directory)
    #[arg(long, global = true, env = "MCQ_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON where supported
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate text with an AI model
    Ai {
        #[command(subcommand)]
        subcommand: AiSubcommand,
    },

    /// Create and view JIRA issues
    Jira {
        #[command(subcommand)]
        subcommand: JiraSubcommand,
    },

    /// Manage prompt templates
    Templates {
        #[command(subcommand)]
        subcommand: TemplatesSubcommand,
    },

    /// Inspect the repository context sent to the model
    Context {
        #[command(subcommand)]
        subcommand: ContextSubcommand,
    },

    /// Set up and check configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        tracing::Level::ERROR
    } else {
        match cli.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = cmd::Ctx {
        root: root::resolve_root(cli.root.as_deref()),
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Ai { subcommand } => cmd::ai::run(&ctx, subcommand),
        Commands::Jira { subcommand } => cmd::jira::run(&ctx, subcommand),
        Commands::Templates { subcommand } => cmd::templates::run(&ctx, subcommand),
        Commands::Context { subcommand } => cmd::context::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        match e.downcast_ref::<UserError>() {
            Some(user) => eprint!("{}", user.report(cli.verbose > 0)),
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
}
