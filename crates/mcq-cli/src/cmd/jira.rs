use super::args::{join_words, ContextArgs, ModelArgs};
use super::{block_on, load_app, Ctx};
use crate::output::print_json;
use anyhow::bail;
use clap::Subcommand;
use mcq_core::title::TitleSource;
use mcq_llm::CancellationToken;

#[derive(Subcommand)]
pub enum JiraSubcommand {
    /// Generate a user story and file it as a JIRA Story
    New {
        /// The feature request, e.g. "export reports as CSV"
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
        /// Print the story without creating an issue
        #[arg(long)]
        dry_run: bool,
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Show an issue and its comments as Markdown
    Show {
        /// Issue key, e.g. PROJ-123
        key: String,
        /// Open the issue in a browser as well
        #[arg(long)]
        web: bool,
    },
}

pub fn run(ctx: &Ctx, subcmd: JiraSubcommand) -> anyhow::Result<()> {
    match subcmd {
        JiraSubcommand::New {
            request,
            dry_run,
            model,
            context,
        } => new(ctx, &join_words(&request), dry_run, &model, &context),
        JiraSubcommand::Show { key, web } => show(ctx, &key, web),
    }
}

// ---------------------------------------------------------------------------
// new
// ---------------------------------------------------------------------------

fn new(
    ctx: &Ctx,
    request: &str,
    dry_run: bool,
    model: &ModelArgs,
    context: &ContextArgs,
) -> anyhow::Result<()> {
    if request.is_empty() {
        bail!("feature request is empty");
    }
    let app = load_app(ctx)?;
    // Fail on missing JIRA settings before spending tokens.
    let jira = if dry_run { None } else { Some(app.jira_client()?) };
    let context = context.to_config(&app.config.context);

    let mut stdout = std::io::stdout();
    let (story, title) = block_on(&app, async {
        let story = app
            .generate_story(request, model.model.as_deref(), &context, &mut stdout)
            .await?;
        if dry_run {
            return Ok((story, None));
        }
        let title = app.extract_title(&story).await;
        Ok::<_, mcq_core::UserError>((story, Some(title)))
    })??;

    ensure_not_interrupted(&app.cancel_token())?;

    let (Some(jira), Some(title)) = (jira, title) else {
        return Ok(());
    };
    if title.source == TitleSource::PatternFallback {
        eprintln!("Using title derived from the story: {}", title.text);
    }

    let created = app.create_issue(&jira, &title.text, &story.text)?;
    let url = jira.browse_url(&created.key);
    if ctx.json {
        print_json(&serde_json::json!({
            "key": created.key,
            "url": url,
            "title": title.text,
            "title_source": title.source,
            "model": story.model.descriptor.key,
        }))?;
    } else {
        println!("Created {}: {}", created.key, title.text);
        println!("{url}");
    }
    Ok(())
}

/// A Ctrl-C at the title prompts does not abort the read; honour it here.
fn ensure_not_interrupted(cancel: &CancellationToken) -> anyhow::Result<()> {
    if cancel.is_cancelled() {
        bail!("interrupted; no issue was created");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Ctx, key: &str, web: bool) -> anyhow::Result<()> {
    let key = key.trim().to_uppercase();
    if key.is_empty() {
        bail!("issue key is empty");
    }
    let app = load_app(ctx)?;
    let view = app.show_issue(&key)?;

    if ctx.json {
        print_json(&view)?;
    } else {
        print!("{}", view.to_markdown());
    }

    if web {
        if let Err(e) = open::that(&view.url) {
            eprintln!("warning: could not open browser: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_run_does_not_file_an_issue() {
        let cancel = CancellationToken::new();
        assert!(ensure_not_interrupted(&cancel).is_ok());
        cancel.cancel();
        let err = ensure_not_interrupted(&cancel).unwrap_err();
        assert!(err.to_string().contains("no issue was created"));
    }
}
