//! Terminal host: the boundary between the shell loop and a real terminal.
//!
//! The shell loop only needs two things from its host: the next input event
//! (polled with a short timeout) and a way to paint a composite. Tests drive
//! the loop with a scripted host; the binary uses [`TerminalHost`].
//!
//! ```text
//! shell loop ──poll_event(10ms)──► Host ──► crossterm::event
//!            ──paint(&tree)──────► Host ──► ratatui Terminal::draw
//! ```

// Rust guideline compliant 2026-02

use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::event::{self, Event};
use ratatui::backend::Backend;
use ratatui::Terminal;

use super::render_tree::{interpret_tree, RenderNode};

/// Where the shell loop gets input and paints output.
pub trait Host {
    /// Wait up to `timeout` for the next input event.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>>;

    /// Paint a composite over the whole surface.
    fn paint(&mut self, tree: &RenderNode) -> Result<()>;
}

/// Host backed by crossterm input and a ratatui terminal.
///
/// The `B` type parameter is the ratatui backend type. The binary uses
/// `CrosstermBackend<Stdout>`.
pub struct TerminalHost<B: Backend> {
    terminal: Terminal<B>,
}

impl<B: Backend> TerminalHost<B> {
    /// Wrap a ratatui terminal.
    pub fn new(terminal: Terminal<B>) -> Self {
        Self { terminal }
    }
}

impl<B: Backend> std::fmt::Debug for TerminalHost<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalHost").finish_non_exhaustive()
    }
}

impl<B: Backend> Host for TerminalHost<B> {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        // Resizes need no handling here: `draw` resizes the buffers itself.
        Ok(Some(event::read()?))
    }

    fn paint(&mut self, tree: &RenderNode) -> Result<()> {
        self.terminal
            .draw(|f| interpret_tree(tree, f, f.area()))
            .map_err(|e| anyhow!("Failed to draw frame: {e}"))?;
        Ok(())
    }
}
