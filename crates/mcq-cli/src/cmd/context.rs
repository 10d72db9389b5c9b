use super::args::ContextArgs;
use super::{load_config, Ctx};
use crate::output::print_json;
use clap::Subcommand;
use mcq_core::context::{self, RepoContext};
use mcq_core::format::format_context;
use mcq_core::system::HostSystem;
use mcq_core::{ErrorCode, UserError};

#[derive(Subcommand)]
pub enum ContextSubcommand {
    /// Gather context from the repository and summarize what was found
    Test {
        /// Also print the Markdown section sent to the model
        #[arg(long)]
        show: bool,
        #[command(flatten)]
        context: ContextArgs,
    },
}

pub fn run(ctx: &Ctx, subcmd: ContextSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ContextSubcommand::Test { show, context } => test(ctx, show, &context),
    }
}

fn test(ctx: &Ctx, show: bool, args: &ContextArgs) -> anyhow::Result<()> {
    let config = load_config()?;
    let cfg = args.to_config(&config.context);
    let outcome = context::gather(&ctx.root, &cfg, &HostSystem);

    if ctx.json {
        return print_json(&outcome);
    }

    println!("Root: {}", ctx.root.display());
    match &outcome.context {
        Some(repo) => print_summary(repo),
        None if !cfg.any_enabled() => println!("Context collection is disabled."),
        None => println!("No repository context found."),
    }

    if !outcome.diagnostics.is_empty() {
        println!();
        println!("Skipped:");
        for d in &outcome.diagnostics {
            println!("  {:<10} {}", d.subtask.as_str(), d.message);
        }
    }

    if outcome.gathering_failed() {
        eprintln!();
        crate::output::warn(&UserError::new(ErrorCode::ContextGatheringFailed));
    }

    if show {
        if let Some(repo) = &outcome.context {
            println!();
            print!("{}", format_context(repo));
        }
    }
    Ok(())
}

fn print_summary(repo: &RepoContext) {
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    println!("Project:      {}", or_dash(&repo.project_name));
    println!("Module:       {}", or_dash(&repo.module_path));
    println!("Go version:   {}", or_dash(&repo.language_version));
    println!("Type:         {}", repo.project_type);
    println!("Dependencies: {}", repo.dependencies.len());
    println!("README:       {} chars", repo.readme.chars().count());
    println!("Commits:      {}", repo.recent_commits.len());
    println!("Structure:    {} entries", repo.directory_structure.lines().count());
    let configs: Vec<&str> = repo.config_files.keys().map(String::as_str).collect();
    println!(
        "Config files: {}",
        if configs.is_empty() {
            "-".to_string()
        } else {
            configs.join(", ")
        }
    );
    println!("Total:        {} chars", repo.total_chars());
}
