use super::args::{join_words, ContextArgs, ModelArgs};
use super::{block_on, load_app, Ctx};
use crate::output::warn;
use anyhow::bail;
use clap::Subcommand;
use mcq_core::prompt::PromptConfig;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AiSubcommand {
    /// Write a user story for a feature request and copy it to the clipboard
    Jira {
        /// The feature request, e.g. "add dark mode"
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        context: ContextArgs,
        /// Do not copy the story to the clipboard
        #[arg(long)]
        no_copy: bool,
    },

    /// Rewrite an existing issue description
    Improve {
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Write a full description from an issue title
    Describe {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        context: ContextArgs,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Ctx, subcmd: AiSubcommand) -> anyhow::Result<()> {
    match subcmd {
        AiSubcommand::Jira {
            request,
            model,
            context,
            no_copy,
        } => story(ctx, &join_words(&request), &model, &context, no_copy),
        AiSubcommand::Improve {
            description,
            model,
            context,
        } => rewrite(ctx, &model, &context, |c| {
            PromptConfig::description_improvement(join_words(&description), c)
        }),
        AiSubcommand::Describe {
            title,
            model,
            context,
        } => rewrite(ctx, &model, &context, |c| {
            PromptConfig::description_from_title(join_words(&title), c)
        }),
    }
}

// ---------------------------------------------------------------------------
// ai jira
// ---------------------------------------------------------------------------

fn story(
    ctx: &Ctx,
    request: &str,
    model: &ModelArgs,
    context: &ContextArgs,
    no_copy: bool,
) -> anyhow::Result<()> {
    if request.is_empty() {
        bail!("feature request is empty");
    }
    let app = load_app(ctx)?;
    let context = context.to_config(&app.config.context);

    let mut stdout = std::io::stdout();
    let story = block_on(
        &app,
        app.generate_story(request, model.model.as_deref(), &context, &mut stdout),
    )??;

    if !no_copy {
        match app.copy_to_clipboard(&story.text) {
            None => eprintln!("Copied to clipboard."),
            Some(w) => warn(&w),
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ai improve / ai describe
// ---------------------------------------------------------------------------

fn rewrite<F>(ctx: &Ctx, model: &ModelArgs, context: &ContextArgs, build: F) -> anyhow::Result<()>
where
    F: FnOnce(Option<mcq_core::context::RepoContext>) -> PromptConfig,
{
    let app = load_app(ctx)?;
    let context = context.to_config(&app.config.context);
    let prompt = build(app.context_for_generation(&context));
    if prompt
        .feature_request
        .as_deref()
        .or(prompt.original_description.as_deref())
        .map_or(true, |s| s.trim().is_empty())
    {
        bail!("input text is empty");
    }

    let mut stdout = std::io::stdout();
    block_on(&app, app.run_prompt(model.model.as_deref(), prompt, &mut stdout))??;
    Ok(())
}
