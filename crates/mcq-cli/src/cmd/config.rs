use super::{load_app, load_config, Ctx};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use mcq_core::config::{Config, JiraSettings, WarnLevel};
use mcq_core::models::Credentials;
use mcq_core::paths;
use mcq_core::{ErrorCode, UserError};
use mcq_llm::{mask_key, Provider};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write ~/.mcq/config.yaml with default settings
    Setup {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check API keys, settings and the JIRA connection
    Test,

    /// Print the effective configuration with secrets masked
    Show,
}

pub fn run(ctx: &Ctx, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Setup { force } => setup(force),
        ConfigSubcommand::Test => test(ctx),
        ConfigSubcommand::Show => show(ctx),
    }
}

// ---------------------------------------------------------------------------
// setup
// ---------------------------------------------------------------------------

const SETUP_HEADER: &str = "\
# mcq configuration.
# Environment variables override these values:
#   JIRA_INSTANCE_URL, JIRA_USERNAME, JIRA_API_TOKEN (or JIRA_PASSWORD),
#   JIRA_PROJECT_PREFIX, MCQ_PROMPTS_DIR, MCQ_MODEL, MCQ_STREAM_TIMEOUT_SECS.
# API keys are read from ANTHROPIC_API_KEY and OPENAI_API_KEY only.
";

fn setup(force: bool) -> anyhow::Result<()> {
    let path = paths::config_path()?;
    if path.exists() && !force {
        println!("Config already exists at {} (use --force to replace it).", path.display());
        return Ok(());
    }

    // Seed non-secret JIRA fields from the environment; tokens stay out of the file.
    let mut seeded = Config::default();
    seeded.apply_env(|key| std::env::var(key).ok());
    let config = Config {
        jira: JiraSettings {
            api_token: None,
            ..seeded.jira
        },
        ..Config::default()
    };

    let body = serde_yaml::to_string(&config)?;
    mcq_core::io::atomic_write(&path, format!("{SETUP_HEADER}{body}").as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// test
// ---------------------------------------------------------------------------

fn credential_lines(creds: &Credentials) -> Vec<(Provider, Option<String>)> {
    Provider::all()
        .iter()
        .map(|&p| (p, creds.get(p).map(mask_key)))
        .collect()
}

fn test(ctx: &Ctx) -> anyhow::Result<()> {
    let app = load_app(ctx)?;

    for (provider, key) in credential_lines(&app.credentials) {
        match key {
            Some(k) => println!("[ok]      {} {k}", provider.credential_env()),
            None => println!("[missing] {}", provider.credential_env()),
        }
    }

    let warnings = app.config.validate();
    for w in &warnings {
        let prefix = match w.level {
            WarnLevel::Warning => "warning",
            WarnLevel::Error => "error",
        };
        println!("[{prefix}] {}", w.message);
    }

    let missing = app.config.jira.missing();
    if missing.is_empty() {
        let name = app.check_jira()?;
        println!("[ok]      JIRA connected as {name}");
    } else {
        println!("[missing] JIRA: {}", missing.join(", "));
    }

    if Provider::all().iter().all(|&p| !app.credentials.has(p)) {
        return Err(UserError::new(ErrorCode::ModelNotAvailable).into());
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Ctx) -> anyhow::Result<()> {
    let config = load_config()?.redacted();
    let creds = Credentials::from_env();
    let path = paths::config_path()?;

    if ctx.json {
        let keys: serde_json::Map<String, serde_json::Value> = credential_lines(&creds)
            .into_iter()
            .map(|(p, k)| (p.credential_env().to_string(), serde_json::json!(k)))
            .collect();
        return print_json(&serde_json::json!({
            "path": path,
            "config": config,
            "credentials": keys,
        }));
    }

    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(&config)?);
    println!();
    println!("credentials:");
    for (provider, key) in credential_lines(&creds) {
        println!(
            "  {}: {}",
            provider.credential_env(),
            key.as_deref().unwrap_or("(not set)")
        );
    }
    Ok(())
}
