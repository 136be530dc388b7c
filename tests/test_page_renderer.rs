//! Integration tests for the page renderer: glyph callbacks arrive in
//! content-stream order with correct text-rendering matrices and
//! displacements, and a full substituting render produces an image.

use std::sync::Arc;

use lopdf::{dictionary, Object, Stream};
use pdf_reglyph::fonts::{FontRef, SystemFonts};
use pdf_reglyph::rendering::{
    Canvas, GlyphRenderer, ImageFormat, PageRenderer, RenderOptions,
};
use pdf_reglyph::{Document, Matrix, Vector};

/// Records every glyph callback instead of drawing.
#[derive(Default)]
struct RecordingGlyphRenderer {
    shown: Vec<ShownGlyph>,
}

struct ShownGlyph {
    code: u32,
    trm: Matrix,
    displacement: Vector,
    font_name: String,
}

impl GlyphRenderer for RecordingGlyphRenderer {
    fn show_glyph(
        &mut self,
        _canvas: &mut dyn Canvas,
        text_rendering_matrix: &Matrix,
        font: &FontRef,
        code: u32,
        displacement: Vector,
    ) -> pdf_reglyph::Result<()> {
        self.shown.push(ShownGlyph {
            code,
            trm: *text_rendering_matrix,
            displacement,
            font_name: font.base_name.clone(),
        });
        Ok(())
    }
}

/// One letter-sized page using a non-embedded Type 1 font with declared
/// widths, showing the given content stream.
fn document_with_content(content: &[u8]) -> Document {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "TestSans",
        "FirstChar" => 65,
        "LastChar" => 67,
        "Widths" => vec![600.into(), 640.into(), 580.into()],
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => Object::Reference(font_id) },
    });
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "Contents" => Object::Reference(content_id),
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
        "Resources" => Object::Reference(resources_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", catalog_id);
    Document::from_lopdf(doc)
}

fn render_recording(content: &[u8]) -> Vec<ShownGlyph> {
    let document = document_with_content(content);
    let mut renderer = PageRenderer::new(
        RenderOptions::native(),
        RecordingGlyphRenderer::default(),
        Arc::new(SystemFonts::empty()),
    );
    renderer.render_page(&document, 0).unwrap();
    let glyphs = renderer.glyphs();
    glyphs.shown.iter().map(|g| ShownGlyph {
        code: g.code,
        trm: g.trm,
        displacement: g.displacement,
        font_name: g.font_name.clone(),
    }).collect()
}

#[test]
fn test_glyphs_arrive_in_content_stream_order() {
    let shown = render_recording(b"BT /F1 12 Tf 100 700 Td (ABC) Tj ET");
    let codes: Vec<u32> = shown.iter().map(|g| g.code).collect();
    assert_eq!(codes, vec![65, 66, 67]);
    assert!(shown.iter().all(|g| g.font_name == "TestSans"));
}

#[test]
fn test_text_rendering_matrix_carries_size_and_position() {
    let shown = render_recording(b"BT /F1 12 Tf 100 700 Td (A) Tj ET");
    let trm = &shown[0].trm;
    assert!((trm.a - 12.0).abs() < 1e-4);
    assert!((trm.d - 12.0).abs() < 1e-4);
    assert!((trm.e - 100.0).abs() < 1e-4);
    assert!((trm.f - 700.0).abs() < 1e-4);
}

#[test]
fn test_text_matrix_advances_by_declared_width() {
    let shown = render_recording(b"BT /F1 12 Tf 100 700 Td (AB) Tj ET");
    // Code 65 is 600/1000 wide at size 12: the next origin moves 7.2.
    assert!((shown[0].trm.e - 100.0).abs() < 1e-4);
    assert!((shown[1].trm.e - 107.2).abs() < 1e-4);
    assert!((shown[0].displacement.x - 0.6).abs() < 1e-6);
}

#[test]
fn test_tj_adjustments_move_the_origin() {
    let shown = render_recording(b"BT /F1 10 Tf [ (A) -500 (B) ] TJ ET");
    assert_eq!(shown.len(), 2);
    // A advances 6.0; the -500 adjustment adds 5.0 more.
    assert!((shown[1].trm.e - 11.0).abs() < 1e-4);
}

#[test]
fn test_char_spacing_applies_between_glyphs() {
    let shown = render_recording(b"BT /F1 10 Tf 2 Tc (AB) Tj ET");
    // 600/1000 * 10 + 2 = 8.0
    assert!((shown[1].trm.e - 8.0).abs() < 1e-4);
}

#[test]
fn test_ctm_composes_into_the_matrix() {
    let shown = render_recording(b"2 0 0 2 0 0 cm BT /F1 10 Tf 50 50 Td (A) Tj ET");
    let trm = &shown[0].trm;
    assert!((trm.a - 20.0).abs() < 1e-4);
    assert!((trm.e - 100.0).abs() < 1e-4);
}

#[test]
fn test_state_save_restore_brackets_text_state() {
    let shown = render_recording(
        b"BT /F1 10 Tf (A) Tj ET q BT /F1 30 Tf (B) Tj ET Q BT (C) Tj ET",
    );
    assert_eq!(shown.len(), 3);
    assert!((shown[0].trm.a - 10.0).abs() < 1e-4);
    assert!((shown[1].trm.a - 30.0).abs() < 1e-4);
    // Q restored the 10pt text state captured by q.
    assert!((shown[2].trm.a - 10.0).abs() < 1e-4);
}

#[test]
fn test_substituting_render_produces_png_at_native_size() {
    let document = document_with_content(b"BT /F1 24 Tf 100 600 Td (ABC) Tj ET");
    let mut renderer =
        PageRenderer::substituting(RenderOptions::native(), Arc::new(SystemFonts::empty()));
    let page = renderer.render_page(&document, 0).unwrap();

    assert_eq!(page.format, ImageFormat::Png);
    assert_eq!(page.width, 612);
    assert_eq!(page.height, 792);
    assert!(!page.as_bytes().is_empty());
    // PNG signature.
    assert_eq!(&page.data[..4], &[0x89, b'P', b'N', b'G']);
}

#[test]
fn test_render_at_higher_dpi_scales_pixels() {
    let document = document_with_content(b"BT /F1 24 Tf (A) Tj ET");
    let mut renderer =
        PageRenderer::substituting(RenderOptions::with_dpi(144), Arc::new(SystemFonts::empty()));
    let page = renderer.render_page(&document, 0).unwrap();
    assert_eq!(page.width, 1224);
    assert_eq!(page.height, 1584);
}
