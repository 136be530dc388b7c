//! Document font references.
//!
//! A [`FontRef`] is the handle glyph rendering works against: the font's
//! kind tag, embedding and writing-mode flags, the widths the document
//! declares, the metrics of the glyph program actually backing the font,
//! and the Unicode mapping for its character codes. References are
//! identity-keyed by the font dictionary's object id, which is what the
//! substitute-font cache keys on.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::{Dictionary, Object};

use crate::fonts::cmap::CMap;
use crate::fonts::standard;
use crate::fonts::system::{GlyphSource, SystemFonts};
use crate::geometry::{Matrix, Vector};

/// Stable identity of a font within a document: the font dictionary's
/// object id.
pub type FontId = (u32, u16);

/// Auxiliary metadata record for a font.
#[derive(Debug, Clone, Default)]
pub struct FontDescriptor {
    /// PostScript name declared by the descriptor.
    pub font_name: String,
    /// Descriptor flag bits.
    pub flags: u32,
    /// Width used for codes outside the widths array.
    pub missing_width: f32,
    /// Embedded font-program bytes, already decompressed.
    pub font_file: Option<Arc<Vec<u8>>>,
}

/// The CID-keyed font a composite font descends to.
#[derive(Debug, Clone)]
pub struct DescendantFont {
    /// Descendant subtype (`CIDFontType2` for TrueType outlines).
    pub subtype: String,
    /// Descendant base font name.
    pub base_name: String,
    /// Descendant descriptor, when present.
    pub descriptor: Option<FontDescriptor>,
}

impl DescendantFont {
    /// Whether the descendant carries TrueType outlines.
    pub fn has_truetype_outlines(&self) -> bool {
        self.subtype == "CIDFontType2"
    }
}

/// Kind tag a font reference is dispatched on.
///
/// Exactly two kinds are renderable; everything else fails fatally at
/// resolution time.
#[derive(Debug, Clone)]
pub enum FontKind {
    /// Composite (Type 0) font, CID-keyed through a descendant.
    Composite {
        /// The descendant, when the document declares one.
        descendant: Option<DescendantFont>,
    },
    /// Simple Type 1 font with an optional descriptor.
    Simple,
    /// Any other subtype, named for the error message.
    Unsupported(String),
}

/// Handle to a document font description.
#[derive(Debug, Clone)]
pub struct FontRef {
    /// Identity within the document.
    pub id: FontId,
    /// Base font name (subset tag included, as declared).
    pub base_name: String,
    /// Kind tag.
    pub kind: FontKind,
    /// Descriptor; for composite fonts this is the descendant's.
    pub descriptor: Option<FontDescriptor>,
    /// Glyph-space to text-space matrix.
    pub font_matrix: Matrix,
    /// Vertical writing mode.
    pub vertical: bool,
    /// First code covered by `widths`.
    pub first_char: u32,
    /// Declared widths for simple fonts, indexed by `code - first_char`,
    /// in 1000ths of text space.
    pub widths: Vec<f32>,
    /// Declared widths for composite fonts, keyed by CID.
    pub cid_widths: HashMap<u32, f32>,
    /// Width for codes without a declared entry.
    pub default_width: f32,
    /// Advances measured from the glyph program backing this font, in
    /// 1000ths of an em. Drives width correction.
    pub program_widths: HashMap<u32, f32>,
    /// ToUnicode mapping, when the document embeds one.
    pub to_unicode: Option<CMap>,
}

impl FontRef {
    /// Create a bare reference with default metrics. Extraction from a
    /// font dictionary goes through [`FontRef::from_dict`].
    pub fn new(id: FontId, base_name: impl Into<String>, kind: FontKind) -> Self {
        Self {
            id,
            base_name: base_name.into(),
            kind,
            descriptor: None,
            font_matrix: Matrix::scaling(0.001, 0.001),
            vertical: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: HashMap::new(),
            default_width: 0.0,
            program_widths: HashMap::new(),
            to_unicode: None,
        }
    }

    /// Extract a font reference from a font dictionary.
    ///
    /// Extraction is lenient: missing or malformed entries degrade to
    /// defaults, and unknown subtypes produce an `Unsupported` kind that
    /// only fails once something tries to render with it. When `system`
    /// is given and the font is not embedded, the installed face matched
    /// by name supplies the glyph-program metrics.
    pub fn from_dict(
        doc: &lopdf::Document,
        id: FontId,
        dict: &Dictionary,
        system: Option<&SystemFonts>,
    ) -> Self {
        let subtype = name_entry(doc, dict, b"Subtype").unwrap_or_else(|| "Unknown".to_string());
        let base_name = name_entry(doc, dict, b"BaseFont").unwrap_or_else(|| "Unknown".to_string());

        let to_unicode = dict
            .get(b"ToUnicode")
            .ok()
            .and_then(|obj| stream_bytes(doc, obj))
            .map(|data| CMap::parse(&data));

        let mut font = Self::new(id, base_name, FontKind::Simple);
        font.to_unicode = to_unicode;

        match subtype.as_str() {
            "Type0" => {
                font.vertical = name_entry(doc, dict, b"Encoding")
                    .is_some_and(|enc| enc.ends_with("-V"));
                font.default_width = 1000.0;

                let descendant = dict
                    .get(b"DescendantFonts")
                    .ok()
                    .and_then(|obj| deref(doc, obj))
                    .and_then(|obj| obj.as_array().ok())
                    .and_then(|arr| arr.first())
                    .and_then(|obj| deref(doc, obj))
                    .and_then(|obj| obj.as_dict().ok())
                    .map(|d_dict| {
                        if let Some(dw) = d_dict.get(b"DW").ok().and_then(number) {
                            font.default_width = dw;
                        }
                        if let Some(w) = d_dict
                            .get(b"W")
                            .ok()
                            .and_then(|obj| deref(doc, obj))
                            .and_then(|obj| obj.as_array().ok())
                        {
                            font.cid_widths = parse_w_array(doc, w);
                        }
                        DescendantFont {
                            subtype: name_entry(doc, d_dict, b"Subtype")
                                .unwrap_or_else(|| "Unknown".to_string()),
                            base_name: name_entry(doc, d_dict, b"BaseFont")
                                .unwrap_or_else(|| font.base_name.clone()),
                            descriptor: descriptor_entry(doc, d_dict),
                        }
                    });

                font.descriptor = descendant.as_ref().and_then(|d| d.descriptor.clone());
                font.kind = FontKind::Composite { descendant };
            },
            "Type1" | "MMType1" => {
                font.descriptor = descriptor_entry(doc, dict);
                font.first_char = dict
                    .get(b"FirstChar")
                    .ok()
                    .and_then(number)
                    .map_or(0, |n| n as u32);
                if let Some(arr) = dict
                    .get(b"Widths")
                    .ok()
                    .and_then(|obj| deref(doc, obj))
                    .and_then(|obj| obj.as_array().ok())
                {
                    font.widths = arr
                        .iter()
                        .filter_map(|obj| deref(doc, obj))
                        .filter_map(number)
                        .collect();
                }
                font.default_width = font
                    .descriptor
                    .as_ref()
                    .map_or(0.0, |fd| fd.missing_width);
                font.kind = FontKind::Simple;
            },
            other => {
                font.kind = FontKind::Unsupported(other.to_string());
            },
        }

        font.measure_program_widths(system);
        font
    }

    /// Fill `program_widths` from the glyph program backing this font:
    /// the embedded program when present, otherwise the installed face
    /// matching the descriptor or base name.
    fn measure_program_widths(&mut self, system: Option<&SystemFonts>) {
        let program = self
            .descriptor
            .as_ref()
            .and_then(|fd| fd.font_file.as_ref())
            .and_then(|bytes| crate::fonts::system::FontData::from_bytes(bytes.to_vec()).ok())
            .or_else(|| {
                let system = system?;
                let name = self
                    .descriptor
                    .as_ref()
                    .map(|fd| fd.font_name.clone())
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| self.base_name.clone());
                match system.lookup(&name)?.glyphs() {
                    GlyphSource::Outline(data) => Some(data.clone()),
                    GlyphSource::Builtin => None,
                }
            });

        let Some(program) = program else {
            return;
        };

        let codes: Vec<u32> = match &self.kind {
            FontKind::Simple => {
                (self.first_char..self.first_char.saturating_add(self.widths.len() as u32))
                    .collect()
            },
            FontKind::Composite { .. } => self.cid_widths.keys().copied().collect(),
            FontKind::Unsupported(_) => Vec::new(),
        };

        for code in codes {
            let text = self.to_unicode(code);
            if let Some(ch) = text.chars().next() {
                if let Some(advance) = program.advance(ch) {
                    self.program_widths.insert(code, advance);
                }
            }
        }
    }

    /// Whether a font program is embedded in the document.
    pub fn is_embedded(&self) -> bool {
        match &self.kind {
            FontKind::Composite { descendant } => descendant
                .as_ref()
                .and_then(|d| d.descriptor.as_ref())
                .is_some_and(|fd| fd.font_file.is_some()),
            FontKind::Simple => self
                .descriptor
                .as_ref()
                .is_some_and(|fd| fd.font_file.is_some()),
            FontKind::Unsupported(_) => false,
        }
    }

    /// Vertical writing mode.
    pub fn is_vertical(&self) -> bool {
        self.vertical
    }

    /// Whether the base name maps onto one of the standard 14 fonts.
    pub fn is_standard(&self) -> bool {
        standard::is_standard_14(&self.base_name)
    }

    /// Whether the document declares a width for this code.
    pub fn has_explicit_width(&self, code: u32) -> bool {
        match &self.kind {
            FontKind::Simple => {
                code >= self.first_char
                    && ((code - self.first_char) as usize) < self.widths.len()
            },
            FontKind::Composite { .. } => self.cid_widths.contains_key(&code),
            FontKind::Unsupported(_) => false,
        }
    }

    /// The width the document declares for a code, in 1000ths of text
    /// space, falling back to the default width.
    pub fn declared_width(&self, code: u32) -> f32 {
        match &self.kind {
            FontKind::Simple => {
                if self.has_explicit_width(code) {
                    self.widths[(code - self.first_char) as usize]
                } else {
                    self.default_width
                }
            },
            FontKind::Composite { .. } => self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width),
            FontKind::Unsupported(_) => self.default_width,
        }
    }

    /// The advance measured from the glyph program backing this font, in
    /// 1000ths of an em. Zero when the program has no glyph for the code.
    pub fn width_from_font(&self, code: u32) -> f32 {
        self.program_widths.get(&code).copied().unwrap_or(0.0)
    }

    /// The displacement vector a glyph should occupy, in text space.
    /// Horizontal fonts advance in `x`; vertical fonts advance downward
    /// in `y` with `x` structurally zero.
    pub fn displacement(&self, code: u32) -> Vector {
        if self.vertical {
            Vector::new(0.0, -self.declared_width(code) / 1000.0)
        } else {
            Vector::new(self.declared_width(code) / 1000.0, 0.0)
        }
    }

    /// The Unicode string for a code: the ToUnicode mapping when present,
    /// otherwise the code value itself.
    pub fn to_unicode(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|c| c.lookup(code)) {
            return text.to_string();
        }
        char::from_u32(code)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string()
    }

    /// Bytes per character code in shown strings.
    pub fn code_len(&self) -> usize {
        match &self.kind {
            FontKind::Composite { .. } => 2,
            _ => 1,
        }
    }
}

/// Follow a reference to its object, when needed.
fn deref<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> Option<&'a Object> {
    match obj.as_reference() {
        Ok(id) => doc.get_object(id).ok(),
        Err(_) => Some(obj),
    }
}

/// A dictionary entry as a name string.
fn name_entry(doc: &lopdf::Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .ok()
        .and_then(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_name().ok())
        .map(|name| String::from_utf8_lossy(name).to_string())
}

/// Numeric coercion over integer and real objects.
fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Decompressed bytes of a stream entry.
fn stream_bytes(doc: &lopdf::Document, obj: &Object) -> Option<Vec<u8>> {
    match deref(doc, obj)? {
        Object::Stream(stream) => stream.decompressed_content().ok(),
        _ => None,
    }
}

/// Parse a FontDescriptor entry.
fn descriptor_entry(doc: &lopdf::Document, dict: &Dictionary) -> Option<FontDescriptor> {
    let desc = dict
        .get(b"FontDescriptor")
        .ok()
        .and_then(|obj| deref(doc, obj))
        .and_then(|obj| obj.as_dict().ok())?;

    let font_name = name_entry(doc, desc, b"FontName").unwrap_or_default();
    let flags = desc
        .get(b"Flags")
        .ok()
        .and_then(number)
        .map_or(0, |n| n as u32);
    let missing_width = desc
        .get(b"MissingWidth")
        .ok()
        .and_then(number)
        .unwrap_or(0.0);

    // FontFile2 (TrueType), FontFile3 (CFF), FontFile (Type 1), in that
    // order of preference.
    let font_file = [b"FontFile2".as_slice(), b"FontFile3", b"FontFile"]
        .iter()
        .find_map(|key| desc.get(*key).ok().and_then(|obj| stream_bytes(doc, obj)))
        .map(Arc::new);

    if let Some(bytes) = &font_file {
        log::debug!(
            "font {} carries an embedded program ({} bytes)",
            font_name,
            bytes.len()
        );
    }

    Some(FontDescriptor {
        font_name,
        flags,
        missing_width,
        font_file,
    })
}

/// Parse a composite font's W array into per-CID widths.
///
/// Entries come in two forms: `c [w1 w2 ...]` assigns consecutive widths
/// starting at CID `c`; `c_first c_last w` assigns one width to a range.
fn parse_w_array(doc: &lopdf::Document, arr: &[Object]) -> HashMap<u32, f32> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < arr.len() {
        let Some(first) = deref(doc, &arr[i]).and_then(number) else {
            break;
        };
        match arr.get(i + 1).and_then(|obj| deref(doc, obj)) {
            Some(Object::Array(ws)) => {
                for (offset, w) in ws.iter().filter_map(number).enumerate() {
                    widths.insert(first as u32 + offset as u32, w);
                }
                i += 2;
            },
            Some(obj) => {
                let Some(last) = number(obj) else {
                    break;
                };
                let Some(w) = arr.get(i + 2).and_then(|o| deref(doc, o)).and_then(number) else {
                    break;
                };
                let (lo, hi) = (first as u32, last as u32);
                if hi >= lo && hi - lo < 65_536 {
                    for cid in lo..=hi {
                        widths.insert(cid, w);
                    }
                }
                i += 3;
            },
            None => break,
        }
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_font() -> FontRef {
        let mut font = FontRef::new((7, 0), "SomeFont", FontKind::Simple);
        font.first_char = 65;
        font.widths = vec![600.0, 640.0];
        font.default_width = 500.0;
        font
    }

    #[test]
    fn test_explicit_width_bounds() {
        let font = simple_font();
        assert!(!font.has_explicit_width(64));
        assert!(font.has_explicit_width(65));
        assert!(font.has_explicit_width(66));
        assert!(!font.has_explicit_width(67));
    }

    #[test]
    fn test_declared_width_fallback() {
        let font = simple_font();
        assert_eq!(font.declared_width(65), 600.0);
        assert_eq!(font.declared_width(90), 500.0);
    }

    #[test]
    fn test_displacement_horizontal() {
        let font = simple_font();
        let d = font.displacement(66);
        assert!((d.x - 0.64).abs() < 1e-6);
        assert_eq!(d.y, 0.0);
    }

    #[test]
    fn test_displacement_vertical() {
        let mut font = FontRef::new((1, 0), "Vert", FontKind::Composite { descendant: None });
        font.vertical = true;
        font.default_width = 1000.0;
        let d = font.displacement(10);
        assert_eq!(d.x, 0.0);
        assert_eq!(d.y, -1.0);
    }

    #[test]
    fn test_to_unicode_falls_back_to_code() {
        let font = simple_font();
        assert_eq!(font.to_unicode(65), "A");
    }

    #[test]
    fn test_code_len_by_kind() {
        assert_eq!(simple_font().code_len(), 1);
        let composite = FontRef::new((2, 0), "C", FontKind::Composite { descendant: None });
        assert_eq!(composite.code_len(), 2);
    }

    #[test]
    fn test_standard_detection() {
        let font = FontRef::new((3, 0), "Helvetica", FontKind::Simple);
        assert!(font.is_standard());
        assert!(!simple_font().is_standard());
    }

    #[test]
    fn test_not_embedded_without_program() {
        let font = simple_font();
        assert!(!font.is_embedded());
    }
}
