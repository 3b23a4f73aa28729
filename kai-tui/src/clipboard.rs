//! Where `/copy` and `Ctrl+Y` send the response text.
use anyhow::Result;
use crossterm::{clipboard::CopyToClipboard, execute};
use std::io;
use std::sync::{Arc, Mutex};

pub trait Clipboard: Send {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// Writes an OSC 52 escape to stdout; the terminal emulator (and any ssh or
/// tmux hop that forwards it) puts the text on the system clipboard.
#[derive(Debug, Default)]
pub struct Osc52Clipboard;

impl Clipboard for Osc52Clipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        execute!(io::stdout(), CopyToClipboard::to_clipboard_from(text))?;
        tracing::debug!(bytes = text.len(), "Copied response via OSC 52");
        Ok(())
    }
}

/// In-process clipboard. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
    fail: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clipboard whose every copy fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("clipboard unavailable");
        }
        let mut guard = self
            .contents
            .lock()
            .map_err(|_| anyhow::anyhow!("clipboard lock poisoned"))?;
        *guard = Some(text.to_string());
        Ok(())
    }
}
