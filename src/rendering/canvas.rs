//! The drawing surface.
//!
//! A [`Canvas`] carries the transient draw state (transform, fill
//! color, blend mode, current font) and draws Unicode strings at the
//! local origin under that state. Glyphs are drawn in y-down
//! convention (ascenders at negative y), matching the corrective flip
//! the glyph renderer applies.
//!
//! [`CanvasStateScope`] brackets per-glyph state mutation: it snapshots
//! the state on entry and restores it when dropped, so restoration
//! happens on every exit path, including failed draw calls.

use std::sync::Arc;

use tiny_skia::{Color, FillRule, Paint, Path, PathBuilder, Pixmap, Transform};

use crate::error::{Error, Result};
use crate::fonts::{FontData, GlyphSource, RenderFont};
use crate::geometry::Matrix;

/// Transient drawing state.
#[derive(Debug, Clone)]
pub struct CanvasState {
    /// Active transform (local space to device pixels).
    pub transform: Matrix,
    /// Fill color, RGB in 0.0–1.0.
    pub color: (f32, f32, f32),
    /// Active blend mode, PDF-named.
    pub blend_mode: String,
    /// Active font; draws fail without one.
    pub font: Option<Arc<RenderFont>>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            transform: Matrix::identity(),
            color: (0.0, 0.0, 0.0),
            blend_mode: "Normal".to_string(),
            font: None,
        }
    }
}

/// A drawing surface with transient state.
pub trait Canvas {
    /// Current state.
    fn state(&self) -> &CanvasState;

    /// Mutable current state.
    fn state_mut(&mut self) -> &mut CanvasState;

    /// Draw a Unicode string at the local origin under the current
    /// transform, color, and font.
    fn draw_str(&mut self, text: &str) -> Result<()>;

    /// Concatenate a transform onto the current one: `m` applies first,
    /// then whatever was already active.
    fn concat_transform(&mut self, m: &Matrix) {
        let state = self.state_mut();
        state.transform = m.multiply(&state.transform);
    }
}

/// Scoped canvas-state mutation with guaranteed restoration.
pub struct CanvasStateScope<'a> {
    canvas: &'a mut dyn Canvas,
    saved: Option<CanvasState>,
}

impl<'a> CanvasStateScope<'a> {
    /// Snapshot the canvas state; the snapshot is restored when the
    /// scope drops.
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        let saved = canvas.state().clone();
        Self {
            canvas,
            saved: Some(saved),
        }
    }

    /// The canvas, for mutation inside the scope.
    pub fn canvas(&mut self) -> &mut dyn Canvas {
        self.canvas
    }
}

impl Drop for CanvasStateScope<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.canvas.state_mut() = saved;
        }
    }
}

/// A canvas rasterizing into a tiny-skia pixmap.
pub struct PixmapCanvas {
    pixmap: Pixmap,
    state: CanvasState,
}

impl PixmapCanvas {
    /// Create a canvas of the given pixel size, optionally filled with a
    /// background color (RGBA in 0.0–1.0).
    pub fn new(width: u32, height: u32, background: Option<[f32; 4]>) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            Error::Render(format!("failed to create pixmap {}x{}", width, height))
        })?;
        if let Some([r, g, b, a]) = background {
            pixmap.fill(Color::from_rgba(r, g, b, a).unwrap_or(Color::WHITE));
        }
        Ok(Self {
            pixmap,
            state: CanvasState::default(),
        })
    }

    /// The rasterized pixels.
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Consume the canvas, yielding the pixmap.
    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }
}

impl Canvas for PixmapCanvas {
    fn state(&self) -> &CanvasState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CanvasState {
        &mut self.state
    }

    fn draw_str(&mut self, text: &str) -> Result<()> {
        let Some(font) = self.state.font.clone() else {
            return Err(Error::Render("no font selected for draw_str".to_string()));
        };
        let transform = to_skia_transform(&self.state.transform);
        let paint = fill_paint(self.state.color, &self.state.blend_mode);

        match font.glyphs() {
            GlyphSource::Outline(data) => {
                draw_outline_text(&mut self.pixmap, data, font.size(), text, transform, &paint);
            },
            GlyphSource::Builtin => {
                draw_builtin_text(&mut self.pixmap, font.size(), text, transform, &paint);
            },
        }
        Ok(())
    }
}

/// Convert a geometry matrix into a tiny-skia transform.
fn to_skia_transform(m: &Matrix) -> Transform {
    Transform::from_row(m.a, m.b, m.c, m.d, m.e, m.f)
}

/// Create a Paint configured for fill operations.
fn fill_paint(color: (f32, f32, f32), blend_mode: &str) -> Paint<'static> {
    let (r, g, b) = color;
    let mut paint = Paint::default();
    paint.set_color(Color::from_rgba(r, g, b, 1.0).unwrap_or(Color::BLACK));
    paint.anti_alias = true;

    if blend_mode != "Normal" {
        paint.blend_mode = pdf_blend_mode_to_skia(blend_mode);
    }

    paint
}

/// Convert PDF blend mode to tiny-skia.
fn pdf_blend_mode_to_skia(mode: &str) -> tiny_skia::BlendMode {
    match mode {
        "Normal" => tiny_skia::BlendMode::SourceOver,
        "Multiply" => tiny_skia::BlendMode::Multiply,
        "Screen" => tiny_skia::BlendMode::Screen,
        "Overlay" => tiny_skia::BlendMode::Overlay,
        "Darken" => tiny_skia::BlendMode::Darken,
        "Lighten" => tiny_skia::BlendMode::Lighten,
        "ColorDodge" => tiny_skia::BlendMode::ColorDodge,
        "ColorBurn" => tiny_skia::BlendMode::ColorBurn,
        "HardLight" => tiny_skia::BlendMode::HardLight,
        "SoftLight" => tiny_skia::BlendMode::SoftLight,
        "Difference" => tiny_skia::BlendMode::Difference,
        "Exclusion" => tiny_skia::BlendMode::Exclusion,
        _ => tiny_skia::BlendMode::SourceOver,
    }
}

/// Builds a glyph outline path, scaled to the font size and flipped to
/// the surface's y-down convention.
struct GlyphPathBuilder {
    path: PathBuilder,
    scale: f32,
    dx: f32,
}

impl GlyphPathBuilder {
    fn new(scale: f32, dx: f32) -> Self {
        Self {
            path: PathBuilder::new(),
            scale,
            dx,
        }
    }

    fn finish(self) -> Option<Path> {
        self.path.finish()
    }
}

impl ttf_parser::OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(self.dx + x * self.scale, -y * self.scale);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(self.dx + x * self.scale, -y * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path.quad_to(
            self.dx + x1 * self.scale,
            -y1 * self.scale,
            self.dx + x * self.scale,
            -y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.cubic_to(
            self.dx + x1 * self.scale,
            -y1 * self.scale,
            self.dx + x2 * self.scale,
            -y2 * self.scale,
            self.dx + x * self.scale,
            -y * self.scale,
        );
    }

    fn close(&mut self) {
        self.path.close();
    }
}

fn draw_outline_text(
    pixmap: &mut Pixmap,
    data: &FontData,
    size: f32,
    text: &str,
    transform: Transform,
    paint: &Paint,
) {
    let Some(face) = data.face() else {
        return;
    };
    let scale = size / f32::from(data.units_per_em().max(1));
    let mut pen = 0.0f32;

    for ch in text.chars() {
        match face.glyph_index(ch) {
            Some(glyph) => {
                let mut builder = GlyphPathBuilder::new(scale, pen);
                if face.outline_glyph(glyph, &mut builder).is_some() {
                    if let Some(path) = builder.finish() {
                        pixmap.fill_path(&path, paint, FillRule::Winding, transform, None);
                    }
                }
                pen += f32::from(face.glyph_hor_advance(glyph).unwrap_or(0)) * scale;
            },
            None => {
                // No glyph; keep the pen moving.
                pen += size * 0.5;
            },
        }
    }
}

/// Box glyphs for the built-in placeholder face: full-height boxes for
/// capitals and digits, x-height boxes for lowercase, nothing for
/// spaces. Coordinates are y-down, baseline at 0.
fn draw_builtin_text(
    pixmap: &mut Pixmap,
    size: f32,
    text: &str,
    transform: Transform,
    paint: &Paint,
) {
    let char_width = size * 0.6;
    let mut pen = 0.0f32;

    for ch in text.chars() {
        if (ch as u32) < 32 {
            continue;
        }

        let height = if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
            size * 0.8
        } else if ch.is_ascii_lowercase() {
            size * 0.48
        } else if ch == ' ' {
            0.0
        } else {
            size * 0.56
        };

        if height > 0.0 {
            let left = pen;
            let right = pen + char_width * 0.8;
            if let Some(rect) = tiny_skia::Rect::from_ltrb(left, -height, right, 0.0) {
                let mut path = PathBuilder::new();
                path.push_rect(rect);
                if let Some(path) = path.finish() {
                    pixmap.fill_path(&path, paint, FillRule::Winding, transform, None);
                }
            }
        }

        pen += char_width;
    }
}
