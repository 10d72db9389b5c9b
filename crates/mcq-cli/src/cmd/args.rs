use clap::Args;
use mcq_core::config::ContextSettings;
use mcq_core::context::ContextConfig;

/// Flags that shape the repository context sent with a prompt.
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Send no repository context at all
    #[arg(long)]
    pub no_context: bool,

    /// Skip README and docs/
    #[arg(long)]
    pub no_readme: bool,

    /// Skip recent git commits
    #[arg(long)]
    pub no_commits: bool,

    /// Skip the directory listing
    #[arg(long)]
    pub no_structure: bool,

    /// Skip config files (Makefile, Dockerfile, ...)
    #[arg(long)]
    pub no_configs: bool,

    /// How many recent commits to include
    #[arg(long, value_name = "N")]
    pub max_commits: Option<usize>,

    /// Largest config file to include, in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,
}

impl ContextArgs {
    pub fn to_config(&self, settings: &ContextSettings) -> ContextConfig {
        if self.no_context {
            return ContextConfig::disabled();
        }
        let mut cfg = ContextConfig::auto().with_settings(settings);
        if self.no_readme || self.no_commits || self.no_structure || self.no_configs {
            cfg.auto_detect = false;
            cfg.include_readme = !self.no_readme;
            cfg.include_commits = !self.no_commits;
            cfg.include_structure = !self.no_structure;
            cfg.include_configs = !self.no_configs;
        }
        if let Some(n) = self.max_commits {
            cfg.max_commits = n;
        }
        if let Some(n) = self.max_file_size {
            cfg.max_file_size = n;
        }
        cfg
    }
}

/// `--model` shared by the generation verbs.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model key: claude, gpt-5, gpt-5-mini, gpt-5-nano or gpt-4o
    #[arg(long, short = 'm')]
    pub model: Option<String>,
}

/// Words after the verb, joined back into one request.
pub fn join_words(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}
