//! Subprocess capabilities: version-control history and the clipboard.
//!
//! Everything that shells out goes through [`SystemCalls`] so the pipeline
//! can run against deterministic stubs in tests.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{McqError, Result};

pub trait SystemCalls: Send + Sync {
    /// Up to `max` one-line commit summaries, newest first.
    fn git_log(&self, root: &Path, max: usize) -> Result<Vec<String>>;

    fn copy_to_clipboard(&self, text: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Clipboard tools
// ---------------------------------------------------------------------------

/// The clipboard helpers we know how to drive, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    Pbcopy,
    WlCopy,
    Xclip,
    Xsel,
}

impl ClipboardTool {
    pub fn all() -> &'static [ClipboardTool] {
        &[
            ClipboardTool::Pbcopy,
            ClipboardTool::WlCopy,
            ClipboardTool::Xclip,
            ClipboardTool::Xsel,
        ]
    }

    pub fn program(self) -> &'static str {
        match self {
            ClipboardTool::Pbcopy => "pbcopy",
            ClipboardTool::WlCopy => "wl-copy",
            ClipboardTool::Xclip => "xclip",
            ClipboardTool::Xsel => "xsel",
        }
    }

    fn args(self) -> &'static [&'static str] {
        match self {
            ClipboardTool::Pbcopy | ClipboardTool::WlCopy => &[],
            ClipboardTool::Xclip => &["-selection", "clipboard"],
            ClipboardTool::Xsel => &["--clipboard", "--input"],
        }
    }
}

/// First clipboard helper found on `PATH`.
pub fn detect_clipboard() -> Option<ClipboardTool> {
    ClipboardTool::all()
        .iter()
        .copied()
        .find(|tool| which::which(tool.program()).is_ok())
}

// ---------------------------------------------------------------------------
// HostSystem
// ---------------------------------------------------------------------------

/// [`SystemCalls`] backed by real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSystem;

impl SystemCalls for HostSystem {
    fn git_log(&self, root: &Path, max: usize) -> Result<Vec<String>> {
        if which::which("git").is_err() {
            return Err(McqError::Git("git executable not found on PATH".into()));
        }
        let output = Command::new("git")
            .arg("log")
            .arg("--oneline")
            .arg(format!("-n{max}"))
            .current_dir(root)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| McqError::Git(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(McqError::Git(stderr.trim().to_string()));
        }

        Ok(parse_oneline_log(&String::from_utf8_lossy(&output.stdout), max))
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        let tool = detect_clipboard().ok_or(McqError::NoClipboardTool)?;
        let mut child = Command::new(tool.program())
            .args(tool.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| McqError::Clipboard(format!("{}: {e}", tool.program())))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| McqError::Clipboard(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| McqError::Clipboard(e.to_string()))?;
        if !output.status.success() {
            return Err(McqError::Clipboard(format!(
                "{} exited with {}: {}",
                tool.program(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        tracing::debug!(tool = tool.program(), chars = text.len(), "copied to clipboard");
        Ok(())
    }
}

/// Non-empty lines of `git log --oneline`, capped at `max`.
pub fn parse_oneline_log(stdout: &str, max: usize) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------

/// Deterministic [`SystemCalls`] for tests and offline runs.
#[derive(Debug, Default)]
pub struct StubSystem {
    /// `None` makes `git_log` fail as if the directory were not a repository.
    pub commits: Option<Vec<String>>,
    pub clipboard_fails: bool,
    pub copied: std::sync::Mutex<Vec<String>>,
}

impl SystemCalls for StubSystem {
    fn git_log(&self, _root: &Path, max: usize) -> Result<Vec<String>> {
        match &self.commits {
            Some(c) => Ok(c.iter().take(max).cloned().collect()),
            None => Err(McqError::Git(
                "fatal: not a git repository (or any of the parent directories): .git".into(),
            )),
        }
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<()> {
        if self.clipboard_fails {
            return Err(McqError::NoClipboardTool);
        }
        if let Ok(mut copied) = self.copied.lock() {
            copied.push(text.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_oneline_log_caps_and_trims() {
        let out = "a1b2c3d Add login\n\n  e4f5a6b Fix typo  \n0c0ffee Bump deps\n";
        assert_eq!(
            parse_oneline_log(out, 2),
            vec!["a1b2c3d Add login".to_string(), "e4f5a6b Fix typo".to_string()]
        );
    }

    #[test]
    fn stub_records_clipboard_text() {
        let stub = StubSystem::default();
        stub.copy_to_clipboard("story").unwrap();
        assert_eq!(stub.copied.lock().unwrap().as_slice(), ["story".to_string()]);
    }

    #[test]
    fn stub_without_commits_fails_like_missing_repo() {
        let stub = StubSystem::default();
        let err = stub.git_log(Path::new("."), 5).unwrap_err();
        assert!(err.to_string().contains("not a git repository"));
    }

    #[test]
    fn clipboard_tool_programs() {
        assert_eq!(ClipboardTool::Xclip.program(), "xclip");
        assert_eq!(ClipboardTool::all().len(), 4);
    }
}
