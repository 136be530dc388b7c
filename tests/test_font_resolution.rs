//! Integration tests for substitute-font resolution: the identity-keyed
//! cache and the fallback chains.

use std::sync::Arc;

use pdf_reglyph::fonts::{
    DescendantFont, FontDescriptor, FontKind, FontRef, FontResolver, SystemFonts,
};
use pdf_reglyph::Error;

fn resolver_with_empty_system() -> FontResolver {
    FontResolver::new(Arc::new(SystemFonts::empty()))
}

fn resolver_with_system_fonts() -> FontResolver {
    FontResolver::new(Arc::new(SystemFonts::new()))
}

#[test]
fn test_repeated_resolution_returns_identical_object() {
    let mut resolver = resolver_with_empty_system();
    let font = FontRef::new((12, 0), "Anything", FontKind::Simple);

    let first = resolver.resolve(&font).unwrap();
    let second = resolver.resolve(&font).unwrap();
    let third = resolver.resolve(&font).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
}

#[test]
fn test_distinct_references_get_distinct_entries() {
    let mut resolver = resolver_with_empty_system();
    let one = FontRef::new((1, 0), "One", FontKind::Simple);
    let two = FontRef::new((2, 0), "Two", FontKind::Simple);

    resolver.resolve(&one).unwrap();
    resolver.resolve(&two).unwrap();
    assert_eq!(resolver.cached_len(), 2);
}

#[test]
fn test_composite_with_broken_embedded_outline_never_fails() {
    // The embedded "TrueType" program is garbage and the descriptor
    // names a font that is not installed: resolution must still come
    // back with a usable face via the default fallback.
    let mut resolver = resolver_with_system_fonts();
    let descriptor = FontDescriptor {
        font_name: "Phantom-Regular-NoSuchFace".to_string(),
        font_file: Some(Arc::new(b"this is not a truetype program".to_vec())),
        ..Default::default()
    };
    let descendant = DescendantFont {
        subtype: "CIDFontType2".to_string(),
        base_name: "Phantom-Regular".to_string(),
        descriptor: Some(descriptor.clone()),
    };
    let mut font = FontRef::new(
        (20, 0),
        "Phantom-Regular",
        FontKind::Composite {
            descendant: Some(descendant),
        },
    );
    font.descriptor = Some(descriptor);

    let resolved = resolver.resolve(&font).unwrap();
    assert_eq!(resolved.size(), 10.0);
    assert!(!resolved.name().is_empty());
}

#[test]
fn test_composite_without_descendant_falls_back_to_default() {
    let mut resolver = resolver_with_empty_system();
    let font = FontRef::new((21, 0), "Orphan", FontKind::Composite { descendant: None });

    let resolved = resolver.resolve(&font).unwrap();
    assert_eq!(resolved.size(), 10.0);
    assert_eq!(resolved.name(), "builtin");
}

#[test]
fn test_simple_without_descriptor_or_installed_match_uses_default() {
    let mut resolver = resolver_with_empty_system();
    let font = FontRef::new((22, 0), "NoSuchFamilyAnywhere", FontKind::Simple);

    let resolved = resolver.resolve(&font).unwrap();
    assert_eq!(resolved.size(), 20.0);
    assert_eq!(resolved.name(), "builtin");
    assert!(resolved.can_display('x'));
}

#[test]
fn test_simple_with_unreadable_type1_program_falls_back() {
    let mut resolver = resolver_with_empty_system();
    let mut font = FontRef::new((23, 0), "BrokenType1", FontKind::Simple);
    font.descriptor = Some(FontDescriptor {
        font_name: "BrokenType1".to_string(),
        // A bare Type 1 program header; not readable by the outline engine.
        font_file: Some(Arc::new(b"%!PS-AdobeFont-1.0: Broken 001.001".to_vec())),
        ..Default::default()
    });

    let resolved = resolver.resolve(&font).unwrap();
    assert_eq!(resolved.size(), 20.0);
}

#[test]
fn test_unsupported_kind_fails_fatally() {
    let mut resolver = resolver_with_empty_system();
    let font = FontRef::new((24, 0), "Glyphy", FontKind::Unsupported("Type3".to_string()));

    match resolver.resolve(&font) {
        Err(Error::UnsupportedFontKind(kind)) => assert_eq!(kind, "Type3"),
        other => panic!("expected UnsupportedFontKind, got {:?}", other.map(|f| f.name().to_string())),
    }
    // Failures are not cached.
    assert_eq!(resolver.cached_len(), 0);
    assert!(resolver.cached((24, 0)).is_none());
}
