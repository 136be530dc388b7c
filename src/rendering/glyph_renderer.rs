//! Glyph rendering with font substitution.
//!
//! [`SubstitutingGlyphRenderer`] overrides how a glyph makes it onto the
//! surface: instead of executing the document's embedded glyph program,
//! it resolves a locally available substitute font and draws the glyph's
//! Unicode mapping, correcting the transform where the substitute's
//! natural advance disagrees with the width the document declares.

use std::sync::Arc;

use crate::error::Result;
use crate::fonts::{FontRef, FontResolver, SystemFonts};
use crate::geometry::{Matrix, Vector};
use crate::rendering::canvas::{Canvas, CanvasStateScope};

/// Width mismatches below this are left uncorrected.
const WIDTH_TOLERANCE: f32 = 0.0001;

/// Fixed corrective scale aligning glyph space with the surface's
/// coordinate convention: flips y and matches the magnitude of the
/// nominal substitute sizes against the 1/1000 font matrix.
const GLYPH_SPACE_SCALE: f32 = 100.0;

/// Receives one call per glyph the page shows, in content-stream order.
pub trait GlyphRenderer {
    /// Render a single glyph.
    ///
    /// `text_rendering_matrix` maps text space to user space with the
    /// font size, text matrix, and CTM already composed; `code` is the
    /// character code from the content stream and `displacement` the
    /// advance the document prescribes for it, in text space.
    fn show_glyph(
        &mut self,
        canvas: &mut dyn Canvas,
        text_rendering_matrix: &Matrix,
        font: &FontRef,
        code: u32,
        displacement: Vector,
    ) -> Result<()>;
}

/// Draws glyphs with locally resolved substitute fonts.
pub struct SubstitutingGlyphRenderer {
    resolver: FontResolver,
}

impl SubstitutingGlyphRenderer {
    /// Create a renderer resolving substitutes against the given font
    /// subsystem. The substitute cache lives as long as the renderer.
    pub fn new(system: Arc<SystemFonts>) -> Self {
        Self {
            resolver: FontResolver::new(system),
        }
    }

    /// The resolver backing this renderer.
    pub fn resolver(&self) -> &FontResolver {
        &self.resolver
    }
}

impl GlyphRenderer for SubstitutingGlyphRenderer {
    fn show_glyph(
        &mut self,
        canvas: &mut dyn Canvas,
        text_rendering_matrix: &Matrix,
        font: &FontRef,
        code: u32,
        displacement: Vector,
    ) -> Result<()> {
        // Glyph space to device: the font's intrinsic matrix, then the
        // text-rendering matrix.
        let mut at = font.font_matrix.multiply(text_rendering_matrix);

        if let Some(sx) = width_stretch(font, code, displacement) {
            at = Matrix::scaling(sx, 1.0).multiply(&at);
        }

        at = Matrix::scaling(GLYPH_SPACE_SCALE, -GLYPH_SPACE_SCALE).multiply(&at);

        // Fatal for unsupported kinds; happens before any state is
        // touched, so the canvas is left exactly as it was.
        let substitute = self.resolver.resolve(font)?;
        let text = font.to_unicode(code);

        let mut scope = CanvasStateScope::new(canvas);
        let surface = scope.canvas();
        surface.concat_transform(&at);
        // Fixed foreground; arbitrary paint and clip are out of scope.
        surface.state_mut().color = (0.0, 0.0, 0.0);
        surface.state_mut().font = Some(substitute);
        surface.draw_str(&text)?;
        Ok(())
    }
}

/// Horizontal stretch correcting a substitute glyph whose natural width
/// does not match the displacement the document declares.
///
/// Vertical fonts have zero x displacement, so the correction would
/// collapse the glyph to a zero scale; they are exempt. Standard-14 and
/// embedded fonts are trusted as-is.
fn width_stretch(font: &FontRef, code: u32, displacement: Vector) -> Option<f32> {
    if font.is_embedded() || font.is_vertical() || font.is_standard() {
        return None;
    }
    if !font.has_explicit_width(code) {
        return None;
    }
    let font_width = font.width_from_font(code);
    let pdf_width = displacement.x * 1000.0;
    // font_width of zero means a space-like blank; leave those alone.
    if font_width > 0.0 && (font_width - pdf_width).abs() > WIDTH_TOLERANCE {
        return Some(pdf_width / font_width);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontKind;

    fn correctable_font() -> FontRef {
        let mut font = FontRef::new((9, 0), "Stretchy", FontKind::Simple);
        font.first_char = 65;
        font.widths = vec![500.0];
        font.program_widths.insert(65, 750.0);
        font
    }

    #[test]
    fn test_stretch_ratio() {
        let font = correctable_font();
        let sx = width_stretch(&font, 65, Vector::new(0.5, 0.0)).unwrap();
        assert!((sx - 500.0 / 750.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_stretch_when_widths_agree() {
        let font = correctable_font();
        // Displacement matches the program width exactly.
        assert!(width_stretch(&font, 65, Vector::new(0.75, 0.0)).is_none());
    }

    #[test]
    fn test_no_stretch_for_vertical_font() {
        let mut font = correctable_font();
        font.vertical = true;
        assert!(width_stretch(&font, 65, Vector::new(0.5, 0.0)).is_none());
    }

    #[test]
    fn test_no_stretch_for_standard_font() {
        let mut font = correctable_font();
        font.base_name = "Helvetica".to_string();
        assert!(width_stretch(&font, 65, Vector::new(0.5, 0.0)).is_none());
    }

    #[test]
    fn test_no_stretch_without_explicit_width() {
        let font = correctable_font();
        assert!(width_stretch(&font, 90, Vector::new(0.5, 0.0)).is_none());
    }

    #[test]
    fn test_no_stretch_for_zero_program_width() {
        let mut font = correctable_font();
        font.program_widths.insert(65, 0.0);
        assert!(width_stretch(&font, 65, Vector::new(0.5, 0.0)).is_none());
    }
}
