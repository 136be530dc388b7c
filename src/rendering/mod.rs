//! Page rendering with glyph substitution.
//!
//! The pipeline:
//!
//! 1. Decode a page's content streams into operators (`lopdf::content`)
//! 2. Walk the text-showing subset, tracking the text and line matrices
//! 3. Hand every glyph to the [`GlyphRenderer`] with its text-rendering
//!    matrix and declared displacement
//! 4. The substituting renderer resolves a local font, corrects the
//!    transform for width mismatches, and draws onto the [`Canvas`]
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pdf_reglyph::{Document, PageRenderer, RenderOptions, SystemFonts};
//!
//! let document = Document::open("document.pdf")?;
//! let fonts = Arc::new(SystemFonts::new());
//! let mut renderer = PageRenderer::substituting(RenderOptions::default(), fonts);
//! let page = renderer.render_page(&document, 0)?;
//! page.save("page1.png")?;
//! ```

pub mod canvas;
pub mod glyph_renderer;
pub mod page_renderer;

pub use canvas::{Canvas, CanvasState, CanvasStateScope, PixmapCanvas};
pub use glyph_renderer::{GlyphRenderer, SubstitutingGlyphRenderer};
pub use page_renderer::{ImageFormat, PageRenderer, RenderOptions, RenderedPage};
