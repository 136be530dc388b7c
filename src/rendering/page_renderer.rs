//! Page renderer: drives glyph rendering from a page's content streams.
//!
//! Only the text-showing subset of the content stream is interpreted:
//! enough to hand every glyph to the [`GlyphRenderer`] with its
//! text-rendering matrix and declared displacement, in content-stream
//! order. Paths, images, shading, and clipping are skipped.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::fonts::{FontRef, SystemFonts};
use crate::geometry::Matrix;
use crate::rendering::canvas::{Canvas, PixmapCanvas};
use crate::rendering::glyph_renderer::{GlyphRenderer, SubstitutingGlyphRenderer};

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, supports transparency)
    #[default]
    Png,
    /// JPEG format (lossy, smaller file size)
    Jpeg,
}

/// Options for page rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Dots per inch (default: 150)
    pub dpi: u32,
    /// Output image format
    pub format: ImageFormat,
    /// Background color (None for transparent)
    pub background: Option<[f32; 4]>,
    /// JPEG quality (1-100, only for JPEG format)
    pub jpeg_quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 150,
            format: ImageFormat::Png,
            background: Some([1.0, 1.0, 1.0, 1.0]), // White background
            jpeg_quality: 85,
        }
    }
}

impl RenderOptions {
    /// Create options with custom DPI.
    pub fn with_dpi(dpi: u32) -> Self {
        Self {
            dpi,
            ..Default::default()
        }
    }

    /// Native page size: 72 dpi, one pixel per point. What printing
    /// uses; no scaling.
    pub fn native() -> Self {
        Self::with_dpi(72)
    }

    /// Set JPEG format with quality.
    pub fn as_jpeg(mut self, quality: u8) -> Self {
        self.format = ImageFormat::Jpeg;
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Rendered page output.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Image data in the specified format
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Output format
    pub format: ImageFormat,
}

impl RenderedPage {
    /// Save the image to a file.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        Ok(std::fs::write(path.as_ref(), &self.data)?)
    }

    /// Get the image data as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Renders pages by walking their text operators and handing every glyph
/// to a [`GlyphRenderer`].
pub struct PageRenderer<R = SubstitutingGlyphRenderer> {
    options: RenderOptions,
    system: Arc<SystemFonts>,
    glyphs: R,
}

impl PageRenderer<SubstitutingGlyphRenderer> {
    /// A renderer that substitutes locally available fonts for the
    /// document's glyph programs.
    pub fn substituting(options: RenderOptions, system: Arc<SystemFonts>) -> Self {
        let glyphs = SubstitutingGlyphRenderer::new(Arc::clone(&system));
        Self::new(options, glyphs, system)
    }
}

impl<R: GlyphRenderer> PageRenderer<R> {
    /// Create a renderer with a specific glyph renderer.
    pub fn new(options: RenderOptions, glyphs: R, system: Arc<SystemFonts>) -> Self {
        Self {
            options,
            system,
            glyphs,
        }
    }

    /// The rendering options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The glyph renderer.
    pub fn glyphs(&self) -> &R {
        &self.glyphs
    }

    /// Render a page to an image.
    pub fn render_page(&mut self, document: &Document, page_index: usize) -> Result<RenderedPage> {
        let (page_width, page_height) = document.page_size(page_index)?;

        let scale = self.options.dpi as f32 / 72.0; // PDF uses 72 points per inch
        let width = ((page_width * scale).ceil() as u32).max(1);
        let height = ((page_height * scale).ceil() as u32).max(1);

        let mut canvas = PixmapCanvas::new(width, height, self.options.background)?;
        // PDF origin is bottom-left; flip to the pixmap's top-left.
        canvas.state_mut().transform = Matrix {
            a: scale,
            b: 0.0,
            c: 0.0,
            d: -scale,
            e: 0.0,
            f: height as f32,
        };

        let fonts = document.fonts(page_index, Some(self.system.as_ref()))?;
        let content = document.content(page_index)?;
        let operations = Content::decode(&content)?;

        let mut walker = TextWalker::new(&fonts);
        for op in &operations.operations {
            walker.apply(op, &mut canvas, &mut self.glyphs)?;
        }

        let pixmap = canvas.into_pixmap();
        let data = match self.options.format {
            ImageFormat::Png => pixmap
                .encode_png()
                .map_err(|e| Error::Render(format!("PNG encoding failed: {}", e)))?,
            ImageFormat::Jpeg => encode_jpeg(&pixmap, self.options.jpeg_quality)?,
        };

        Ok(RenderedPage {
            data,
            width,
            height,
            format: self.options.format,
        })
    }
}

/// Text state the walker tracks between operators.
#[derive(Debug, Clone)]
struct TextState {
    font: Option<Arc<FontRef>>,
    size: f32,
    char_space: f32,
    word_space: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_space: 0.0,
            word_space: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Walks text operators, maintaining the text and line matrices, and
/// emits one glyph callback per shown character code.
struct TextWalker<'a> {
    fonts: &'a HashMap<String, Arc<FontRef>>,
    ctm: Matrix,
    stack: Vec<(Matrix, TextState)>,
    text: TextState,
    tm: Matrix,
    tlm: Matrix,
    in_text: bool,
}

impl<'a> TextWalker<'a> {
    fn new(fonts: &'a HashMap<String, Arc<FontRef>>) -> Self {
        Self {
            fonts,
            ctm: Matrix::identity(),
            stack: Vec::new(),
            text: TextState::default(),
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
            in_text: false,
        }
    }

    fn apply<R: GlyphRenderer>(
        &mut self,
        op: &Operation,
        canvas: &mut dyn Canvas,
        glyphs: &mut R,
    ) -> Result<()> {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => {
                self.stack.push((self.ctm, self.text.clone()));
            },
            "Q" => {
                if let Some((ctm, text)) = self.stack.pop() {
                    self.ctm = ctm;
                    self.text = text;
                }
            },
            "cm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.ctm = m.multiply(&self.ctm);
                }
            },
            "BT" => {
                self.in_text = true;
                self.tm = Matrix::identity();
                self.tlm = Matrix::identity();
            },
            "ET" => {
                self.in_text = false;
            },
            "Tf" => {
                if let (Some(name), Some(size)) = (
                    operands.first().and_then(name_operand),
                    operands.get(1).and_then(number),
                ) {
                    self.text.font = self.fonts.get(&name).cloned();
                    if self.text.font.is_none() {
                        log::warn!("font resource {} is not declared by this page", name);
                    }
                    self.text.size = size;
                }
            },
            "Td" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
                    self.tm = self.tlm;
                }
            },
            "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.text.leading = -ty;
                    self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
                    self.tm = self.tlm;
                }
            },
            "Tm" => {
                if let Some(m) = matrix_operands(operands) {
                    self.tm = m;
                    self.tlm = m;
                }
            },
            "T*" => {
                self.next_line();
            },
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.text.leading = leading;
                }
            },
            "Tc" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.text.char_space = v;
                }
            },
            "Tw" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.text.word_space = v;
                }
            },
            "Tz" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.text.h_scale = v / 100.0;
                }
            },
            "Ts" => {
                if let Some(v) = operands.first().and_then(number) {
                    self.text.rise = v;
                }
            },
            "Tj" => {
                if let Some(bytes) = operands.first().and_then(string_operand) {
                    self.show_string(bytes, canvas, glyphs)?;
                }
            },
            "'" => {
                self.next_line();
                if let Some(bytes) = operands.first().and_then(string_operand) {
                    self.show_string(bytes, canvas, glyphs)?;
                }
            },
            "\"" => {
                if let (Some(ws), Some(cs)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    self.text.word_space = ws;
                    self.text.char_space = cs;
                }
                self.next_line();
                if let Some(bytes) = operands.get(2).and_then(string_operand) {
                    self.show_string(bytes, canvas, glyphs)?;
                }
            },
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    for element in elements {
                        match element {
                            Object::String(bytes, _) => {
                                self.show_string(bytes, canvas, glyphs)?;
                            },
                            other => {
                                if let Some(adjustment) = number(other) {
                                    self.adjust(adjustment);
                                }
                            },
                        }
                    }
                }
            },
            // Everything else (paths, images, shading, clipping, state
            // dictionaries) is not rendered here.
            _ => {},
        }
        Ok(())
    }

    fn next_line(&mut self) {
        let leading = self.text.leading;
        self.tlm = Matrix::translation(0.0, -leading).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    /// A TJ positioning adjustment, in thousandths of text space.
    fn adjust(&mut self, amount: f32) {
        let delta = -amount / 1000.0 * self.text.size;
        let vertical = self
            .text
            .font
            .as_ref()
            .is_some_and(|font| font.is_vertical());
        if vertical {
            self.tm = Matrix::translation(0.0, delta).multiply(&self.tm);
        } else {
            self.tm = Matrix::translation(delta * self.text.h_scale, 0.0).multiply(&self.tm);
        }
    }

    fn show_string<R: GlyphRenderer>(
        &mut self,
        bytes: &[u8],
        canvas: &mut dyn Canvas,
        glyphs: &mut R,
    ) -> Result<()> {
        let Some(font) = self.text.font.clone() else {
            log::warn!("text shown before a font was selected; skipping");
            return Ok(());
        };
        let code_len = font.code_len();

        let mut i = 0;
        while i + code_len <= bytes.len() {
            let code = if code_len == 2 {
                (u32::from(bytes[i]) << 8) | u32::from(bytes[i + 1])
            } else {
                u32::from(bytes[i])
            };
            i += code_len;

            let displacement = font.displacement(code);
            let params = Matrix {
                a: self.text.size * self.text.h_scale,
                b: 0.0,
                c: 0.0,
                d: self.text.size,
                e: 0.0,
                f: self.text.rise,
            };
            let trm = params.multiply(&self.tm).multiply(&self.ctm);

            glyphs.show_glyph(canvas, &trm, &font, code, displacement)?;

            let word_space = if code_len == 1 && code == 32 {
                self.text.word_space
            } else {
                0.0
            };
            if font.is_vertical() {
                let ty = displacement.y * self.text.size + self.text.char_space + word_space;
                self.tm = Matrix::translation(0.0, ty).multiply(&self.tm);
            } else {
                let tx = (displacement.x * self.text.size + self.text.char_space + word_space)
                    * self.text.h_scale;
                self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
            }
        }
        Ok(())
    }
}

/// Six numeric operands as a matrix.
fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut nums = operands.iter().filter_map(number);
    Some(Matrix {
        a: nums.next()?,
        b: nums.next()?,
        c: nums.next()?,
        d: nums.next()?,
        e: nums.next()?,
        f: nums.next()?,
    })
}

/// Numeric coercion over integer and real objects.
fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn name_operand(obj: &Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|name| String::from_utf8_lossy(name).to_string())
}

fn string_operand(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::String(bytes, _) => Some(bytes),
        _ => None,
    }
}

/// Encode a pixmap to JPEG (alpha dropped).
fn encode_jpeg(pixmap: &tiny_skia::Pixmap, quality: u8) -> Result<Vec<u8>> {
    let width = pixmap.width();
    let height = pixmap.height();
    let data = pixmap.data();

    let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
    for chunk in data.chunks(4) {
        rgb_data.push(chunk[0]); // R
        rgb_data.push(chunk[1]); // G
        rgb_data.push(chunk[2]); // B
    }

    let mut output = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
    encoder
        .encode(&rgb_data, width, height, image::ColorType::Rgb8)
        .map_err(|e| Error::Render(format!("JPEG encoding failed: {}", e)))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_options_default() {
        let opts = RenderOptions::default();
        assert_eq!(opts.dpi, 150);
        assert_eq!(opts.format, ImageFormat::Png);
        assert!(opts.background.is_some());
    }

    #[test]
    fn test_render_options_native() {
        let opts = RenderOptions::native();
        assert_eq!(opts.dpi, 72);
    }

    #[test]
    fn test_render_options_jpeg_quality_clamped() {
        let opts = RenderOptions::default().as_jpeg(150);
        assert_eq!(opts.format, ImageFormat::Jpeg);
        assert_eq!(opts.jpeg_quality, 100);
    }

    #[test]
    fn test_matrix_operands() {
        let operands = vec![
            Object::Integer(2),
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(2),
            Object::Real(10.5),
            Object::Integer(20),
        ];
        let m = matrix_operands(&operands).unwrap();
        assert_eq!(m.a, 2.0);
        assert_eq!(m.e, 10.5);
        assert_eq!(m.f, 20.0);

        assert!(matrix_operands(&operands[..4]).is_none());
    }
}
