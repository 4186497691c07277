use ab_glyph::FontArc;
use std::path::Path;

/// Base font sizes in points, scaled by the canvas scale factor.
pub const BASE_MAIN_PT: f32 = 60.0;
pub const BASE_SUB_PT: f32 = 22.0;
pub const BASE_COORDS_PT: f32 = 14.0;
pub const BASE_ATTR_PT: f32 = 8.0;

/// Floor for the shrunken main title, in points before scaling.
const MIN_MAIN_PT: f32 = 10.0;

/// Main titles longer than this shrink proportionally.
const MAIN_SHRINK_THRESHOLD: usize = 10;

/// Roboto weights used on the poster.
#[derive(Clone)]
pub struct PosterFonts {
    pub bold: FontArc,
    pub regular: FontArc,
    pub light: FontArc,
}

/// Load the Roboto font files from the fonts directory.
/// Returns `None` when any weight is missing; the renderer then skips the
/// typography layer.
pub fn load_fonts(dir: &Path) -> Option<PosterFonts> {
    let load = |name: &str| -> Option<FontArc> {
        let bytes = std::fs::read(dir.join(name)).ok()?;
        FontArc::try_from_vec(bytes).ok()
    };

    Some(PosterFonts {
        bold: load("Roboto-Bold.ttf")?,
        regular: load("Roboto-Regular.ttf")?,
        light: load("Roboto-Light.ttf")?,
    })
}

/// Whether the text's alphabetic characters are more than 80% Latin.
/// Decides if the place name gets the letter-spaced upper-case treatment.
pub fn is_latin_script(text: &str) -> bool {
    let mut latin = 0usize;
    let mut alphabetic = 0usize;

    for c in text.chars() {
        if c.is_alphabetic() {
            alphabetic += 1;
            if (c as u32) < 0x250 {
                latin += 1;
            }
        }
    }

    if alphabetic == 0 {
        return true;
    }
    latin as f64 / alphabetic as f64 > 0.8
}

/// Display form of the place name: Latin-script names are upper-cased and
/// letter-spaced with a two-space separator, others are rendered verbatim.
pub fn format_place_name(name: &str) -> String {
    if is_latin_script(name) {
        name.to_uppercase()
            .chars()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join("  ")
    } else {
        name.to_string()
    }
}

/// Canvas scale factor: min dimension in inches over the 12-inch reference.
pub fn scale_factor(width_in: f64, height_in: f64) -> f32 {
    (width_in.min(height_in) / 12.0) as f32
}

/// Main title size in points. Names beyond 10 characters shrink by
/// `10 / len`, floored at a minimum readable size.
pub fn main_title_size(char_count: usize, scale: f32) -> f32 {
    let base = BASE_MAIN_PT * scale;
    if char_count > MAIN_SHRINK_THRESHOLD {
        (base * MAIN_SHRINK_THRESHOLD as f32 / char_count as f32).max(MIN_MAIN_PT * scale)
    } else {
        base
    }
}

/// Coordinate caption with hemisphere letters derived from sign,
/// e.g. "48.8566° N / 2.3522° E".
pub fn format_coordinates(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00b0} {} / {:.4}\u{00b0} {}", lat.abs(), ns, lon.abs(), ew)
}
