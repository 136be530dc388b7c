//! Substitute-font resolution.
//!
//! Maps a document font reference to a renderable font, using a
//! per-session memo table keyed by font identity. Two kinds resolve:
//! composite fonts with a CID-TrueType descendant and simple Type 1
//! fonts. Each runs a fallback chain (embedded program, installed font
//! by name, built-in default) so a successful resolution always comes
//! back with *some* renderable face; the only fatal outcome is an
//! unsupported font kind.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::fonts::font_ref::{DescendantFont, FontId, FontKind, FontRef};
use crate::fonts::system::{FontFormat, RenderFont, SystemFonts};

/// Nominal size applied to substitutes for composite fonts.
const COMPOSITE_NOMINAL_SIZE: f32 = 10.0;

/// Nominal size applied to substitutes for simple fonts.
const SIMPLE_NOMINAL_SIZE: f32 = 20.0;

/// Resolves and caches substitute fonts for a drawing session.
///
/// The cache is identity-keyed and never evicted: for a given
/// [`FontRef`] the second and every later resolution returns the
/// identical `Arc`. Failed resolutions are not cached; a later call for
/// the same reference re-runs the full algorithm.
pub struct FontResolver {
    system: Arc<SystemFonts>,
    cache: HashMap<FontId, Arc<RenderFont>>,
}

impl FontResolver {
    /// Create a resolver over the given font subsystem.
    pub fn new(system: Arc<SystemFonts>) -> Self {
        Self {
            system,
            cache: HashMap::new(),
        }
    }

    /// The substitute font for a reference, resolving and caching on
    /// first use.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFontKind`] for any kind other than the two
    /// supported ones. Fatal: only composite CID-TrueType and simple
    /// Type 1 fonts are handled here.
    pub fn resolve(&mut self, font: &FontRef) -> Result<Arc<RenderFont>> {
        if let Some(cached) = self.cache.get(&font.id) {
            return Ok(Arc::clone(cached));
        }

        let resolved = match &font.kind {
            FontKind::Composite { descendant } => {
                self.resolve_composite(font, descendant.as_ref())
            },
            FontKind::Simple => self.resolve_simple(font),
            FontKind::Unsupported(subtype) => {
                return Err(Error::UnsupportedFontKind(subtype.clone()));
            },
        };

        let resolved = Arc::new(resolved);
        self.cache.insert(font.id, Arc::clone(&resolved));
        Ok(resolved)
    }

    /// A cached substitute, if one was already resolved.
    pub fn cached(&self, id: FontId) -> Option<Arc<RenderFont>> {
        self.cache.get(&id).map(Arc::clone)
    }

    /// Number of cached substitutes.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Composite fonts: the descendant's embedded TrueType outlines,
    /// then an installed font by descriptor name, then the default.
    fn resolve_composite(
        &self,
        font: &FontRef,
        descendant: Option<&DescendantFont>,
    ) -> RenderFont {
        let mut resolved = None;

        if let Some(descendant) = descendant {
            if descendant.has_truetype_outlines() {
                resolved = self.instantiate_descendant(descendant);
            }
            if let Some(candidate) = &resolved {
                // Probe glyph lookup once so font faults surface at
                // resolution time, not at draw time.
                let _ = candidate.can_display('\u{1}');
            }
        }

        let resolved = resolved.unwrap_or_else(|| {
            let substitute = self.system.default_font();
            log::info!(
                "using font {} instead of {}",
                substitute.name(),
                descendant.map_or(font.base_name.as_str(), |d| d.base_name.as_str())
            );
            substitute
        });

        resolved.with_size(COMPOSITE_NOMINAL_SIZE)
    }

    fn instantiate_descendant(&self, descendant: &DescendantFont) -> Option<RenderFont> {
        let descriptor = descendant.descriptor.as_ref()?;

        if let Some(bytes) = &descriptor.font_file {
            match self.system.instantiate(FontFormat::TrueType, bytes) {
                Ok(data) => {
                    return Some(RenderFont::outline(descriptor.font_name.clone(), data));
                },
                Err(err) => {
                    log::info!(
                        "can't read the embedded font {}: {}",
                        descriptor.font_name,
                        err
                    );
                },
            }
        }

        if !descriptor.font_name.is_empty() {
            if let Some(substitute) = self.system.lookup(&descriptor.font_name) {
                log::info!("using font {} instead", substitute.name());
                return Some(substitute);
            }
        }
        None
    }

    /// Simple fonts: the embedded Type 1 program, then an installed font
    /// by descriptor name (or base name without a descriptor), then the
    /// default.
    fn resolve_simple(&self, font: &FontRef) -> RenderFont {
        let mut resolved = None;

        if let Some(descriptor) = &font.descriptor {
            if let Some(bytes) = &descriptor.font_file {
                match self.system.instantiate(FontFormat::Type1, bytes) {
                    Ok(data) => {
                        resolved = Some(RenderFont::outline(descriptor.font_name.clone(), data));
                    },
                    Err(err) => {
                        log::info!(
                            "can't read the embedded type1 font {}: {}",
                            descriptor.font_name,
                            err
                        );
                    },
                }
            }
            if resolved.is_none() && !descriptor.font_name.is_empty() {
                resolved = self.system.lookup(&descriptor.font_name);
                if resolved.is_none() {
                    log::info!("can't find the specified font {}", descriptor.font_name);
                }
            }
        } else {
            resolved = self.system.lookup(&font.base_name);
            if resolved.is_none() {
                log::info!("can't find the specified basefont {}", font.base_name);
            }
        }

        let resolved = resolved.unwrap_or_else(|| {
            let substitute = self.system.default_font();
            log::info!("using font {} instead", substitute.name());
            substitute
        });

        resolved.with_size(SIMPLE_NOMINAL_SIZE)
    }
}
