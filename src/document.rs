//! Document wrapper over the `lopdf` document model.
//!
//! The underlying library owns file parsing, the object graph, and the
//! page tree; this wrapper exposes just what rendering and printing
//! consume: ordered pages, page sizes, per-page font references, and
//! decompressed content streams.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::{Dictionary, Object, ObjectId};

use crate::error::{Error, Result};
use crate::fonts::{FontRef, SystemFonts};

/// Bound on Parent-chain walks, in case of a cyclic page tree.
const MAX_PARENT_DEPTH: usize = 64;

/// Letter-size fallback when no MediaBox is declared anywhere.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// An open PDF document.
pub struct Document {
    inner: lopdf::Document,
    pages: Vec<ObjectId>,
}

impl Document {
    /// Open a document from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        log::info!("loading document {}", path.as_ref().display());
        let inner = lopdf::Document::load(path)?;
        Ok(Self::from_lopdf(inner))
    }

    /// Wrap an already-built `lopdf` document.
    pub fn from_lopdf(inner: lopdf::Document) -> Self {
        let pages = inner.get_pages().into_values().collect();
        Self { inner, pages }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Release the document. Resources are tied to the value, so this is
    /// an explicit drop; callers that must release regardless of a
    /// pending error call this before propagating.
    pub fn close(self) {
        log::debug!("closing document");
    }

    fn page_dict(&self, index: usize) -> Result<&Dictionary> {
        let id = self.pages.get(index).ok_or_else(|| {
            Error::InvalidDocument(format!(
                "page index {} out of range ({} pages)",
                index,
                self.pages.len()
            ))
        })?;
        Ok(self.inner.get_object(*id)?.as_dict()?)
    }

    /// Look up an inheritable page attribute, walking the Parent chain.
    fn inherited(&self, index: usize, key: &[u8]) -> Result<Option<&Object>> {
        let mut dict = self.page_dict(index)?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(obj) = dict.get(key) {
                return Ok(Some(obj));
            }
            match dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok()) {
                Some(parent) => {
                    dict = self.inner.get_object(parent)?.as_dict()?;
                },
                None => return Ok(None),
            }
        }
        Err(Error::InvalidDocument("cyclic page tree".to_string()))
    }

    fn deref<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj.as_reference() {
            Ok(id) => self.inner.get_object(id).ok(),
            Err(_) => Some(obj),
        }
    }

    /// Native page size in points (width, height), from the page's
    /// MediaBox or the nearest ancestor's.
    pub fn page_size(&self, index: usize) -> Result<(f32, f32)> {
        let media_box = self
            .inherited(index, b"MediaBox")?
            .and_then(|obj| self.deref(obj))
            .and_then(|obj| obj.as_array().ok());

        let Some(values) = media_box else {
            return Ok(DEFAULT_PAGE_SIZE);
        };

        let nums: Vec<f32> = values
            .iter()
            .filter_map(|obj| self.deref(obj))
            .filter_map(number)
            .collect();
        if nums.len() != 4 {
            return Ok(DEFAULT_PAGE_SIZE);
        }
        Ok(((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()))
    }

    /// Font references declared by a page's resources, keyed by resource
    /// name. Identity comes from each font dictionary's object id; inline
    /// font dictionaries (no id of their own) get synthetic per-page ids.
    pub fn fonts(
        &self,
        index: usize,
        system: Option<&SystemFonts>,
    ) -> Result<HashMap<String, Arc<FontRef>>> {
        let mut fonts = HashMap::new();

        let resources = self
            .inherited(index, b"Resources")?
            .and_then(|obj| self.deref(obj))
            .and_then(|obj| obj.as_dict().ok());
        let Some(resources) = resources else {
            return Ok(fonts);
        };
        let font_dict = resources
            .get(b"Font")
            .ok()
            .and_then(|obj| self.deref(obj))
            .and_then(|obj| obj.as_dict().ok());
        let Some(font_dict) = font_dict else {
            return Ok(fonts);
        };

        let mut synthetic: u16 = 0;
        for (name, obj) in font_dict.iter() {
            let resource = String::from_utf8_lossy(name).to_string();
            let (id, dict) = match obj.as_reference() {
                Ok(id) => match self.inner.get_object(id).and_then(Object::as_dict) {
                    Ok(dict) => (id, dict),
                    Err(err) => {
                        log::warn!("font resource {} is unusable: {}", resource, err);
                        continue;
                    },
                },
                Err(_) => match obj.as_dict() {
                    Ok(dict) => {
                        synthetic += 1;
                        ((0, synthetic), dict)
                    },
                    Err(err) => {
                        log::warn!("font resource {} is unusable: {}", resource, err);
                        continue;
                    },
                },
            };
            let font = FontRef::from_dict(&self.inner, id, dict, system);
            fonts.insert(resource, Arc::new(font));
        }
        Ok(fonts)
    }

    /// The page's content streams, decompressed and concatenated in
    /// declaration order.
    pub fn content(&self, index: usize) -> Result<Vec<u8>> {
        let dict = self.page_dict(index)?;
        let mut data = Vec::new();

        let Some(contents) = dict.get(b"Contents").ok().and_then(|obj| self.deref(obj)) else {
            return Ok(data);
        };

        match contents {
            Object::Stream(stream) => {
                self.append_stream(stream, &mut data);
            },
            Object::Array(parts) => {
                for part in parts {
                    if let Some(Object::Stream(stream)) = self.deref(part) {
                        self.append_stream(stream, &mut data);
                    }
                }
            },
            _ => {},
        }
        Ok(data)
    }

    fn append_stream(&self, stream: &lopdf::Stream, out: &mut Vec<u8>) {
        match stream.decompressed_content() {
            Ok(bytes) => {
                if !out.is_empty() {
                    out.push(b'\n');
                }
                out.extend_from_slice(&bytes);
            },
            Err(err) => log::warn!("skipping undecodable content stream: {}", err),
        }
    }
}

/// Numeric coercion over integer and real objects.
fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
