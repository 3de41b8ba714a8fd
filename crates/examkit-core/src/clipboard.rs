//! Clipboard integration as a ranked chain of fallback strategies.
//!
//! Clipboard copy is advisory tooling for reviewers; a failure must never
//! block annotation. The chain tries each strategy in order and reports the
//! first success, surfacing an error only when every strategy fails.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{ExamkitError, Result};

/// One way of putting content on the OS clipboard.
pub trait ClipboardStrategy {
    /// Short name for status display ("which method worked").
    fn name(&self) -> &'static str;

    /// Copy an image file to the clipboard. Returns `false` on any failure.
    fn copy_image(&self, path: &Path) -> bool;

    /// Copy plain text to the clipboard. Returns `false` on any failure.
    fn copy_text(&self, text: &str) -> bool;
}

/// Platform clipboard helper invoked as a subprocess (wl-copy / xclip on
/// Linux, pbcopy/osascript on macOS, PowerShell on Windows).
pub struct OsHelperClipboard;

impl OsHelperClipboard {
    fn run_with_stdin(program: &str, args: &[&str], input: &[u8]) -> bool {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let Ok(mut child) = child else {
            return false;
        };
        if let Some(stdin) = child.stdin.as_mut() {
            if stdin.write_all(input).is_err() {
                return false;
            }
        }
        child.wait().map(|status| status.success()).unwrap_or(false)
    }

    // Only the macOS/Windows image paths run a command without stdin.
    #[cfg_attr(target_os = "linux", allow(dead_code))]
    fn run(program: &str, args: &[&str]) -> bool {
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl ClipboardStrategy for OsHelperClipboard {
    fn name(&self) -> &'static str {
        "os-helper"
    }

    #[cfg(target_os = "linux")]
    fn copy_image(&self, path: &Path) -> bool {
        let Ok(bytes) = std::fs::read(path) else {
            return false;
        };
        Self::run_with_stdin("wl-copy", &["--type", "image/png"], &bytes)
            || Self::run_with_stdin(
                "xclip",
                &["-selection", "clipboard", "-t", "image/png"],
                &bytes,
            )
    }

    #[cfg(target_os = "macos")]
    fn copy_image(&self, path: &Path) -> bool {
        let script = format!(
            "set the clipboard to (read (POSIX file \"{}\") as «class PNGf»)",
            path.display()
        );
        Self::run("osascript", &["-e", &script])
    }

    #[cfg(target_os = "windows")]
    fn copy_image(&self, path: &Path) -> bool {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $image = [System.Drawing.Image]::FromFile('{}'); \
             [System.Windows.Forms.Clipboard]::SetImage($image); \
             $image.Dispose()",
            path.display()
        );
        Self::run("powershell", &["-Command", &script])
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    fn copy_image(&self, _path: &Path) -> bool {
        false
    }

    #[cfg(target_os = "linux")]
    fn copy_text(&self, text: &str) -> bool {
        Self::run_with_stdin("wl-copy", &[], text.as_bytes())
            || Self::run_with_stdin("xclip", &["-selection", "clipboard"], text.as_bytes())
    }

    #[cfg(target_os = "macos")]
    fn copy_text(&self, text: &str) -> bool {
        Self::run_with_stdin("pbcopy", &[], text.as_bytes())
    }

    #[cfg(target_os = "windows")]
    fn copy_text(&self, text: &str) -> bool {
        Self::run_with_stdin("clip", &[], text.as_bytes())
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    fn copy_text(&self, _text: &str) -> bool {
        false
    }
}

/// Last-resort strategy: copy the file *path* as text so the reviewer can
/// paste it wherever the image is needed.
pub struct PathCopyClipboard;

impl ClipboardStrategy for PathCopyClipboard {
    fn name(&self) -> &'static str {
        "path-copy"
    }

    fn copy_image(&self, path: &Path) -> bool {
        OsHelperClipboard.copy_text(&path.display().to_string())
    }

    fn copy_text(&self, text: &str) -> bool {
        OsHelperClipboard.copy_text(text)
    }
}

/// Ranked strategy list; earlier entries are preferred.
pub struct ClipboardChain {
    strategies: Vec<Box<dyn ClipboardStrategy>>,
}

impl Default for ClipboardChain {
    fn default() -> Self {
        Self {
            strategies: vec![Box::new(OsHelperClipboard), Box::new(PathCopyClipboard)],
        }
    }
}

impl ClipboardChain {
    pub fn new(strategies: Vec<Box<dyn ClipboardStrategy>>) -> Self {
        Self { strategies }
    }

    /// Copy an image file, returning the name of the strategy that worked.
    pub fn copy_image(&self, path: &Path) -> Result<&'static str> {
        let mut tried = Vec::new();
        for strategy in &self.strategies {
            if strategy.copy_image(path) {
                return Ok(strategy.name());
            }
            tried.push(strategy.name());
        }
        Err(ExamkitError::ClipboardUnavailable(tried.join(", ")))
    }

    /// Copy raw image bytes by staging them in a temp file first.
    pub fn copy_image_bytes(&self, bytes: &[u8]) -> Result<&'static str> {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile()?;
        file.write_all(bytes)?;
        self.copy_image(file.path())
    }

    /// Copy plain text, returning the name of the strategy that worked.
    pub fn copy_text(&self, text: &str) -> Result<&'static str> {
        let mut tried = Vec::new();
        for strategy in &self.strategies {
            if strategy.copy_text(text) {
                return Ok(strategy.name());
            }
            tried.push(strategy.name());
        }
        Err(ExamkitError::ClipboardUnavailable(tried.join(", ")))
    }
}
