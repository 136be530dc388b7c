//! The standard 14 base fonts.
//!
//! Fonts whose base name maps onto one of the standard 14 are expected to
//! be available to every viewer, so their metrics are trusted and no
//! width correction is applied when substituting them.

/// Check whether a base font name refers to one of the standard 14 fonts.
///
/// Subset tags (`ABCDEF+Helvetica`) are stripped before matching, and the
/// common aliases used by producers (Arial for Helvetica, CourierNew for
/// Courier, TimesNewRoman for the Times family) are recognized.
pub fn is_standard_14(base_name: &str) -> bool {
    let name = strip_subset_tag(base_name);
    let normalized: String = name
        .chars()
        .filter(|c| *c != ' ' && *c != ',' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase();

    matches!(
        normalized.as_str(),
        "timesroman"
            | "timesbold"
            | "timesitalic"
            | "timesbolditalic"
            | "timesnewroman"
            | "timesnewromanbold"
            | "timesnewromanitalic"
            | "timesnewromanbolditalic"
            | "helvetica"
            | "helveticabold"
            | "helveticaoblique"
            | "helveticaboldoblique"
            | "arial"
            | "arialbold"
            | "arialitalic"
            | "arialbolditalic"
            | "arialmt"
            | "arialboldmt"
            | "courier"
            | "courierbold"
            | "courieroblique"
            | "courierboldoblique"
            | "couriernew"
            | "couriernewbold"
            | "couriernewitalic"
            | "couriernewbolditalic"
            | "symbol"
            | "zapfdingbats"
    )
}

/// Strip a six-letter subset tag (`ABCDEF+`) from a base font name.
pub fn strip_subset_tag(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() > 7
        && bytes[6] == b'+'
        && bytes[..6].iter().all(|b| b.is_ascii_uppercase())
    {
        &name[7..]
    } else {
        name
    }
}
