//! The platform font subsystem.
//!
//! Three services back font substitution: instantiating a renderable face
//! from embedded font-program bytes, looking up an installed font by
//! name, and a fixed default font that never fails. Installed fonts come
//! from `fontdb`; faces are parsed with `ttf-parser` on demand (parsing
//! is header validation only, so re-creating a face per query is cheap).

use std::fmt;
use std::sync::Arc;

use fontdb::{Family, Query, Stretch, Style, Weight};

use crate::fonts::standard::strip_subset_tag;

/// Font-program formats a descriptor can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFormat {
    /// TrueType outlines (FontFile2)
    TrueType,
    /// Type 1 program (FontFile)
    Type1,
}

impl fmt::Display for FontFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrueType => write!(f, "TrueType"),
            Self::Type1 => write!(f, "Type 1"),
        }
    }
}

/// A font program could not be instantiated from its bytes.
///
/// This error is always recovered from by falling through to the next
/// substitution strategy; it never crosses the crate boundary.
#[derive(Debug, thiserror::Error)]
#[error("{format} font data not usable: {reason}")]
pub struct FontFormatError {
    /// The format the bytes were declared to be.
    pub format: FontFormat,
    /// Parser diagnostic.
    pub reason: String,
}

/// Parsed font data: owned bytes plus cached global metrics.
///
/// A `ttf_parser::Face` is created on demand for individual queries
/// rather than stored, so the type stays cheaply cloneable and free of
/// self-references.
#[derive(Clone)]
pub struct FontData {
    bytes: Arc<Vec<u8>>,
    index: u32,
    units_per_em: u16,
}

impl FontData {
    /// Parse font data from an owned byte buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FontFormatError> {
        Self::with_index(Arc::new(bytes), 0)
    }

    fn with_index(bytes: Arc<Vec<u8>>, index: u32) -> Result<Self, FontFormatError> {
        let face = ttf_parser::Face::parse(&bytes, index).map_err(|e| FontFormatError {
            format: FontFormat::TrueType,
            reason: e.to_string(),
        })?;
        let units_per_em = face.units_per_em();
        Ok(Self {
            bytes,
            index,
            units_per_em,
        })
    }

    /// Create a temporary face for queries.
    ///
    /// Returns `None` only if the underlying bytes stopped parsing, which
    /// cannot happen for data validated at construction time.
    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.bytes, self.index).ok()
    }

    /// Design units per em.
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    /// Whether the face has a glyph for the character.
    pub fn has_glyph(&self, ch: char) -> bool {
        self.face()
            .and_then(|f| f.glyph_index(ch))
            .is_some()
    }

    /// Horizontal advance of the character's glyph in 1000ths of an em,
    /// the unit PDF declares widths in. `None` if the face has no glyph
    /// for the character.
    pub fn advance(&self, ch: char) -> Option<f32> {
        let face = self.face()?;
        let glyph = face.glyph_index(ch)?;
        let advance = face.glyph_hor_advance(glyph)?;
        Some(f32::from(advance) * 1000.0 / f32::from(self.units_per_em.max(1)))
    }
}

impl fmt::Debug for FontData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontData")
            .field("bytes", &self.bytes.len())
            .field("index", &self.index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

/// Where a resolved font's glyphs come from.
#[derive(Debug, Clone)]
pub enum GlyphSource {
    /// Real outlines from a parsed face.
    Outline(FontData),
    /// The built-in placeholder face: box glyphs, every character
    /// displayable. The final fallback that never fails.
    Builtin,
}

/// A renderable substitute font: a glyph source plus a nominal size.
#[derive(Debug, Clone)]
pub struct RenderFont {
    name: String,
    size: f32,
    glyphs: GlyphSource,
}

impl RenderFont {
    /// A font backed by real outlines.
    pub fn outline(name: impl Into<String>, data: FontData) -> Self {
        Self {
            name: name.into(),
            size: 12.0,
            glyphs: GlyphSource::Outline(data),
        }
    }

    /// The built-in placeholder font.
    pub fn builtin() -> Self {
        Self {
            name: "builtin".to_string(),
            size: 12.0,
            glyphs: GlyphSource::Builtin,
        }
    }

    /// Same font at a different nominal size.
    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    /// Font name (matched family, embedded name, or "builtin").
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nominal size.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// The glyph source.
    pub fn glyphs(&self) -> &GlyphSource {
        &self.glyphs
    }

    /// Whether the font can display the character.
    pub fn can_display(&self, ch: char) -> bool {
        match &self.glyphs {
            GlyphSource::Outline(data) => data.has_glyph(ch),
            GlyphSource::Builtin => true,
        }
    }
}

/// Families probed for the fixed default font, most common first.
const DEFAULT_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Arial",
    "Helvetica",
];

/// Installed fonts and font instantiation.
pub struct SystemFonts {
    db: fontdb::Database,
}

impl SystemFonts {
    /// Load the fonts installed on this system.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("loaded {} system font faces", db.len());
        Self { db }
    }

    /// An empty database: every lookup misses and the default font is the
    /// built-in placeholder. Deterministic environment for tests.
    pub fn empty() -> Self {
        Self {
            db: fontdb::Database::new(),
        }
    }

    /// Number of known faces.
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Whether no faces are known.
    pub fn is_empty(&self) -> bool {
        self.db.len() == 0
    }

    /// Instantiate a renderable face from font-program bytes declared to
    /// be in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`FontFormatError`] when the bytes cannot be parsed. Bare
    /// Type 1 programs are not parseable by the outline engine, so they
    /// always take this path unless wrapped in an OpenType container;
    /// callers recover by falling through to installed-font lookup.
    pub fn instantiate(
        &self,
        format: FontFormat,
        bytes: &[u8],
    ) -> Result<FontData, FontFormatError> {
        FontData::from_bytes(bytes.to_vec()).map_err(|e| FontFormatError {
            format,
            reason: e.reason,
        })
    }

    /// Look up an installed font by a document font name.
    ///
    /// Subset tags are stripped and style suffixes (`-Bold`, `,Italic`)
    /// are folded into the query's weight and style.
    pub fn lookup(&self, name: &str) -> Option<RenderFont> {
        let stripped = strip_subset_tag(name);
        let (family, weight, style) = split_style(stripped);

        let id = self
            .db
            .query(&Query {
                families: &[Family::Name(stripped)],
                weight,
                stretch: Stretch::Normal,
                style,
            })
            .or_else(|| {
                self.db.query(&Query {
                    families: &[Family::Name(family)],
                    weight,
                    stretch: Stretch::Normal,
                    style,
                })
            })?;

        let matched = self
            .db
            .face(id)
            .and_then(|info| info.families.first().map(|(n, _)| n.clone()))
            .unwrap_or_else(|| stripped.to_string());

        self.db
            .with_face_data(id, |data, index| {
                FontData::with_index(Arc::new(data.to_vec()), index).ok()
            })
            .flatten()
            .map(|data| RenderFont::outline(matched, data))
    }

    /// The fixed default font. Never fails: if no usable installed face
    /// exists, the built-in placeholder is returned.
    pub fn default_font(&self) -> RenderFont {
        for family in DEFAULT_FAMILIES {
            if let Some(font) = self.lookup(family) {
                return font;
            }
        }
        if let Some(id) = self.db.query(&Query {
            families: &[Family::SansSerif],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        }) {
            let matched = self
                .db
                .face(id)
                .and_then(|info| info.families.first().map(|(n, _)| n.clone()))
                .unwrap_or_else(|| "sans-serif".to_string());
            if let Some(data) = self
                .db
                .with_face_data(id, |data, index| {
                    FontData::with_index(Arc::new(data.to_vec()), index).ok()
                })
                .flatten()
            {
                return RenderFont::outline(matched, data);
            }
        }
        RenderFont::builtin()
    }
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemFonts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemFonts")
            .field("faces", &self.db.len())
            .finish()
    }
}

/// Split a font name into its family part and the weight/style its
/// suffix implies.
fn split_style(name: &str) -> (&str, Weight, Style) {
    let (family, suffix) = match name.split_once(',') {
        Some((fam, suf)) => (fam, suf),
        None => match name.rsplit_once('-') {
            Some((fam, suf)) => (fam, suf),
            None => (name, ""),
        },
    };
    let suffix = suffix.to_ascii_lowercase();
    let weight = if suffix.contains("bold") {
        Weight::BOLD
    } else {
        Weight::NORMAL
    };
    let style = if suffix.contains("italic") {
        Style::Italic
    } else if suffix.contains("oblique") {
        Style::Oblique
    } else {
        Style::Normal
    };
    (family, weight, style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_database_lookup_misses() {
        let fonts = SystemFonts::empty();
        assert!(fonts.lookup("Helvetica").is_none());
        assert!(fonts.is_empty());
    }

    #[test]
    fn test_empty_database_default_is_builtin() {
        let fonts = SystemFonts::empty();
        let font = fonts.default_font();
        assert_eq!(font.name(), "builtin");
        assert!(font.can_display('A'));
        assert!(font.can_display('\u{1}'));
    }

    #[test]
    fn test_instantiate_rejects_garbage() {
        let fonts = SystemFonts::empty();
        let err = fonts
            .instantiate(FontFormat::TrueType, b"definitely not a font")
            .unwrap_err();
        assert_eq!(err.format, FontFormat::TrueType);
    }

    #[test]
    fn test_instantiate_rejects_bare_type1() {
        let fonts = SystemFonts::empty();
        // PFB header; the outline engine cannot read bare Type 1 programs.
        let data = [0x80u8, 0x01, 0x00, 0x00, 0x00, 0x00];
        assert!(fonts.instantiate(FontFormat::Type1, &data).is_err());
    }

    #[test]
    fn test_split_style() {
        let (family, weight, style) = split_style("Helvetica-BoldOblique");
        assert_eq!(family, "Helvetica");
        assert_eq!(weight, Weight::BOLD);
        assert_eq!(style, Style::Oblique);

        let (family, weight, style) = split_style("Arial,Italic");
        assert_eq!(family, "Arial");
        assert_eq!(weight, Weight::NORMAL);
        assert_eq!(style, Style::Italic);
    }

    #[test]
    fn test_render_font_with_size() {
        let font = RenderFont::builtin().with_size(20.0);
        assert_eq!(font.size(), 20.0);
    }
}
