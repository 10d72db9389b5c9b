use super::{load_config, Ctx};
use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use clap::Subcommand;
use mcq_core::io::{atomic_write, write_if_missing};
use mcq_core::paths;
use mcq_core::prompt::{PromptKind, TemplateManager};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum TemplatesSubcommand {
    /// Write the built-in templates out as editable <kind>.tpl files
    Generate {
        /// Target directory (default: MCQ_PROMPTS_DIR, prompts_dir, or ~/.mcq/prompts)
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Overwrite files that already exist
        #[arg(long)]
        force: bool,
    },

    /// List each prompt kind and where its template comes from
    List,

    /// Render every template against sample inputs
    Validate,
}

pub fn run(ctx: &Ctx, subcmd: TemplatesSubcommand) -> anyhow::Result<()> {
    match subcmd {
        TemplatesSubcommand::Generate { dir, force } => generate(ctx, dir, force),
        TemplatesSubcommand::List => list(ctx),
        TemplatesSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct Written {
    kind: PromptKind,
    path: PathBuf,
    action: &'static str,
}

fn generate(ctx: &Ctx, dir: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let dir = match dir {
        Some(d) => d,
        None => match load_config()?.prompts_dir {
            Some(d) => d,
            None => paths::default_prompts_dir()?,
        },
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

    let mut written = Vec::new();
    for &kind in PromptKind::all() {
        let path = dir.join(kind.file_name());
        let source = TemplateManager::builtin_source(kind)?;
        let action = if force {
            let existed = path.exists();
            atomic_write(&path, source.as_bytes())?;
            if existed {
                "overwritten"
            } else {
                "created"
            }
        } else if write_if_missing(&path, source.as_bytes())? {
            "created"
        } else {
            "skipped (exists)"
        };
        written.push(Written { kind, path, action });
    }

    if ctx.json {
        return print_json(&written);
    }
    for w in &written {
        println!("{:<24} {}", w.action, w.path.display());
    }
    println!();
    println!("Set MCQ_PROMPTS_DIR={} to use these templates.", dir.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn manager() -> anyhow::Result<TemplateManager> {
    Ok(TemplateManager::new(load_config()?.prompts_dir))
}

fn list(ctx: &Ctx) -> anyhow::Result<()> {
    let manager = manager()?;

    #[derive(Serialize)]
    struct Row {
        kind: PromptKind,
        source: String,
        description: &'static str,
    }
    let rows: Vec<Row> = PromptKind::all()
        .iter()
        .map(|&kind| Row {
            kind,
            source: manager.source_of(kind).to_string(),
            description: kind.description(),
        })
        .collect();

    if ctx.json {
        return print_json(&rows);
    }
    print_table(
        &["KIND", "SOURCE", "DESCRIPTION"],
        rows.into_iter()
            .map(|r| vec![r.kind.to_string(), r.source, r.description.to_string()])
            .collect(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Ctx) -> anyhow::Result<()> {
    let reports = manager()?.validate();
    let failed = reports.iter().filter(|r| !r.ok()).count();

    if ctx.json {
        print_json(&reports)?;
    } else {
        for r in &reports {
            match &r.error {
                None => println!("ok    {} ({})", r.kind, r.source),
                Some(e) => println!("FAIL  {} ({}): {e}", r.kind, r.source),
            }
        }
    }

    if failed > 0 {
        bail!("{failed} template(s) failed validation");
    }
    Ok(())
}
