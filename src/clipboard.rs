use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub trait Clipboard {
    fn copy(&mut self, text: &str) -> io::Result<()>;
}

/// The desktop clipboard, owned for the life of the popup so X11 selections
/// stay served.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, arboard::Error> {
        Ok(SystemClipboard {
            inner: arboard::Clipboard::new()?,
        })
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> io::Result<()> {
        self.inner
            .set_text(text)
            .map_err(|e| io::Error::other(e.to_string()))
    }
}

/// Sets the clipboard through the terminal emulator with the OSC 52 escape
/// sequence. Used over SSH, where the desktop clipboard is the wrong machine.
pub struct Osc52Clipboard<W> {
    out: W,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Osc52Clipboard { out }
    }
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn copy(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "\x1b]52;c;{}\x07", STANDARD.encode(text))?;
        self.out.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    System,
    Osc52,
}

fn preferred_backend(force_osc52: bool, over_ssh: bool) -> Backend {
    if force_osc52 || over_ssh {
        Backend::Osc52
    } else {
        Backend::System
    }
}

fn over_ssh() -> bool {
    std::env::var_os("SSH_TTY").is_some() || std::env::var_os("SSH_CONNECTION").is_some()
}

/// Picks the clipboard for the popup: the desktop clipboard when there is
/// one, OSC 52 when asked for, over SSH, or when the desktop clipboard
/// cannot be opened.
pub fn open(force_osc52: bool) -> Box<dyn Clipboard> {
    match preferred_backend(force_osc52, over_ssh()) {
        Backend::System => match SystemClipboard::new() {
            Ok(clipboard) => {
                tracing::debug!("Using the system clipboard");
                Box::new(clipboard)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "System clipboard unavailable, falling back to OSC 52"
                );
                Box::new(Osc52Clipboard::new(io::stdout()))
            }
        },
        Backend::Osc52 => {
            tracing::debug!("Using the OSC 52 clipboard");
            Box::new(Osc52Clipboard::new(io::stdout()))
        }
    }
}
