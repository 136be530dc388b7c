//! Font handling: the document font model, substitute-font resolution,
//! and the platform font subsystem.
//!
//! A [`FontRef`] is extracted from a document font dictionary and carries
//! everything glyph rendering consumes: the kind tag, embedding and
//! writing-mode flags, declared widths, glyph-program metrics, and the
//! Unicode mapping. The [`FontResolver`] memoizes one renderable
//! substitute per font reference for the lifetime of a drawing session.

pub mod cmap;
pub mod font_ref;
pub mod resolver;
pub mod standard;
pub mod system;

pub use cmap::CMap;
pub use font_ref::{DescendantFont, FontDescriptor, FontId, FontKind, FontRef};
pub use resolver::FontResolver;
pub use system::{FontData, FontFormat, FontFormatError, GlyphSource, RenderFont, SystemFonts};
