//! Printing: a pageable adapter over a document and the print queue.
//!
//! [`PageableDocument`] renders pages at their native size (72 dpi, no
//! scaling) on demand. A [`PrintQueue`] takes the whole pageable and
//! submits it; the shipped [`SystemPrintQueue`] spools pages as PNGs
//! into a scratch directory and hands them to the platform `lp`
//! command. The trait is the seam tests (and other spoolers) plug into.

use std::process::Command;
use std::sync::Arc;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::fonts::SystemFonts;
use crate::rendering::{PageRenderer, RenderOptions, RenderedPage, SubstitutingGlyphRenderer};

/// Renders a document's pages at native size, one at a time.
pub struct PageableDocument<'a> {
    document: &'a Document,
    renderer: PageRenderer<SubstitutingGlyphRenderer>,
}

impl<'a> PageableDocument<'a> {
    /// Wrap a document for printing.
    pub fn new(document: &'a Document, system: Arc<SystemFonts>) -> Self {
        Self {
            document,
            renderer: PageRenderer::substituting(RenderOptions::native(), system),
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.document.page_count()
    }

    /// Render one page at native size.
    pub fn render_page(&mut self, index: usize) -> Result<RenderedPage> {
        self.renderer.render_page(self.document, index)
    }
}

/// A queue print jobs are submitted to.
pub trait PrintQueue {
    /// Submit every page of the pageable to the queue. Blocking; no
    /// cancellation semantics.
    fn submit(&mut self, pages: &mut PageableDocument<'_>) -> Result<()>;
}

/// The platform print queue, reached through a spooler command.
pub struct SystemPrintQueue {
    /// Spooler command the pages are handed to.
    pub command: String,
}

impl Default for SystemPrintQueue {
    fn default() -> Self {
        Self {
            command: "lp".to_string(),
        }
    }
}

impl SystemPrintQueue {
    /// A queue submitting through a specific spooler command.
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl PrintQueue for SystemPrintQueue {
    fn submit(&mut self, pages: &mut PageableDocument<'_>) -> Result<()> {
        let count = pages.page_count();
        if count == 0 {
            return Err(Error::Print("document has no pages".to_string()));
        }

        let spool = tempfile::tempdir()?;
        let mut files = Vec::with_capacity(count);
        for index in 0..count {
            let page = pages.render_page(index)?;
            let path = spool.path().join(format!("page-{:04}.png", index + 1));
            page.save(&path)?;
            files.push(path);
        }

        let status = Command::new(&self.command)
            .args(&files)
            .status()
            .map_err(|e| Error::Print(format!("failed to run {}: {}", self.command, e)))?;
        if !status.success() {
            return Err(Error::Print(format!(
                "{} exited with {}",
                self.command, status
            )));
        }

        log::info!("submitted {} page(s) to the {} queue", count, self.command);
        Ok(())
    }
}

/// Print a document at its actual size. This is the recommended way to
/// print.
pub fn print(
    document: &Document,
    queue: &mut dyn PrintQueue,
    system: Arc<SystemFonts>,
) -> Result<()> {
    let mut pageable = PageableDocument::new(document, system);
    queue.submit(&mut pageable)
}
