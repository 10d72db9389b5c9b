pub mod ai;
pub mod args;
pub mod config;
pub mod context;
pub mod jira;
pub mod templates;

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use mcq_core::config::Config;
use mcq_core::App;
use mcq_llm::CancellationToken;

/// Global flags every command sees.
pub struct Ctx {
    pub root: PathBuf,
    pub json: bool,
}

/// Effective configuration: `~/.mcq/config.yaml` plus the environment.
pub fn load_config() -> anyhow::Result<Config> {
    let config = Config::load_effective()?;
    for w in config.validate() {
        tracing::debug!(level = ?w.level, "{}", w.message);
    }
    Ok(config)
}

pub fn load_app(ctx: &Ctx) -> anyhow::Result<App> {
    Ok(App::from_config(load_config()?, ctx.root.clone())?)
}

// ---------------------------------------------------------------------------
// Interrupts
// ---------------------------------------------------------------------------

/// Exit status after a second Ctrl-C, or one outside a generation.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

static IN_FLIGHT: AtomicBool = AtomicBool::new(false);
static INTERRUPT: OnceLock<CancellationToken> = OnceLock::new();

/// What a Ctrl-C does right now.
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    Cancel,
    Exit,
}

fn on_interrupt(in_flight: bool, cancel: &CancellationToken) -> Interrupt {
    if in_flight && !cancel.is_cancelled() {
        Interrupt::Cancel
    } else {
        Interrupt::Exit
    }
}

/// The handler runs on its own thread, so it fires even while the command
/// thread is blocked on stdin or a JIRA request.
fn install_interrupt(cancel: CancellationToken) {
    INTERRUPT.get_or_init(|| {
        let token = cancel.clone();
        let installed = ctrlc::set_handler(move || {
            match on_interrupt(IN_FLIGHT.load(Ordering::SeqCst), &token) {
                Interrupt::Cancel => {
                    eprintln!("\nInterrupted, cancelling... (Ctrl-C again to quit)");
                    token.cancel();
                }
                Interrupt::Exit => std::process::exit(INTERRUPT_EXIT_CODE),
            }
        });
        if let Err(e) = installed {
            tracing::debug!(error = %e, "could not install Ctrl-C handler");
        }
        cancel
    });
}

/// Drive `fut` on a fresh runtime. While it runs, the first Ctrl-C cancels
/// the app's generations and the future finishes with the cancellation
/// error. Any other Ctrl-C exits the process.
pub fn block_on<F: Future>(app: &App, fut: F) -> anyhow::Result<F::Output> {
    install_interrupt(app.cancel_token());
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    IN_FLIGHT.store(true, Ordering::SeqCst);
    let out = rt.block_on(fut);
    IN_FLIGHT.store(false, Ordering::SeqCst);
    Ok(out)
}
