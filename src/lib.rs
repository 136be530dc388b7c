//! # PDF Reglyph
//!
//! Renders the text of PDF pages by substituting locally available fonts
//! for the document's embedded (or referenced-but-absent) font programs,
//! and prints rendered documents through the platform spooler.
//!
//! The heavy lifting of the PDF file format (parsing, the object graph,
//! the page tree, content stream tokenization) is delegated to `lopdf`.
//! This crate supplies what sits on top:
//!
//! - **Glyph rendering with font substitution**: every glyph a page shows
//!   is drawn with a locally resolved substitute font, with the transform
//!   corrected for metric mismatches between the substitute and the
//!   widths the document declares.
//! - **Font resolution**: a per-session, identity-keyed memo table from
//!   document font references to renderable faces, with a fallback chain
//!   (embedded program → installed font by name → built-in default).
//! - **Printing**: a pageable adapter over a document plus a print-queue
//!   seam, submitted to the system spooler at native page size.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use pdf_reglyph::{Document, PageRenderer, RenderOptions, SystemFonts};
//!
//! let document = Document::open("input.pdf")?;
//! let fonts = Arc::new(SystemFonts::new());
//! let mut renderer = PageRenderer::substituting(RenderOptions::default(), fonts);
//! let page = renderer.render_page(&document, 0)?;
//! page.save("page1.png")?;
//! ```
//!
//! Printing from the command line:
//!
//! ```text
//! print_pdf input.pdf
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license,
//! at your option.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Geometry primitives
pub mod geometry;

// Document wrapper over lopdf
pub mod document;

// Font model, resolution and the platform font subsystem
pub mod fonts;

// Page rendering with glyph substitution
pub mod rendering;

// Pageable adapter and print queue
pub mod printing;

pub use document::Document;
pub use error::{Error, Result};
pub use fonts::{FontKind, FontRef, FontResolver, RenderFont, SystemFonts};
pub use geometry::{Matrix, Vector};
pub use rendering::{
    Canvas, GlyphRenderer, ImageFormat, PageRenderer, RenderOptions, RenderedPage,
    SubstitutingGlyphRenderer,
};
pub use printing::{PageableDocument, PrintQueue, SystemPrintQueue};
