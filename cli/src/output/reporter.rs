//! `TerminalReporter`: Presentation-layer implementation of `ProgressReporter`.
//!
//! On a TTY each step gets a spinner that `success`/`fail` replace with a
//! final line. Elsewhere (pipes, CI logs) the same events print as plain
//! lines. With `--quiet` or `--json` nothing is printed except failures,
//! which always go to stderr.

use std::sync::Mutex;

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    /// Spinner of the step in progress.
    active: Mutex<Option<ProgressBar>>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self {
            ctx,
            active: Mutex::new(None),
        }
    }

    fn take_active(&self) -> Option<ProgressBar> {
        self.active.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        if let Some(previous) = self.take_active() {
            previous.finish_and_clear();
        }
        if self.ctx.show_progress() {
            if let Ok(mut slot) = self.active.lock() {
                *slot = Some(progress::spinner(message));
            }
        } else {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        let mark = "✓".style(self.ctx.styles.success).to_string();
        match self.take_active() {
            Some(pb) => progress::finish(&pb, &mark, message),
            None if !self.ctx.quiet => println!("  {mark} {message}"),
            None => {}
        }
    }

    fn fail(&self, message: &str) {
        let mark = "✗".style(self.ctx.styles.error).to_string();
        match self.take_active() {
            Some(pb) => progress::finish(&pb, &mark, message),
            None => eprintln!("  {mark} {message}"),
        }
    }

    fn warn(&self, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let line = format!("  {} {message}", "⚠".style(self.ctx.styles.warning));
        match self.active.lock().ok().as_deref().and_then(Option::as_ref) {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }
}

impl Drop for TerminalReporter<'_> {
    fn drop(&mut self) {
        if let Some(pb) = self.take_active() {
            pb.finish_and_clear();
        }
    }
}
