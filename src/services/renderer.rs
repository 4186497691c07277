use ab_glyph::PxScale;
use chrono::Utc;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut, text_size,
};
use imageproc::point::Point;
use std::path::PathBuf;

use crate::models::geo::{Coordinates, FeatureCollection, StreetNetwork};
use crate::models::theme::Theme;
use crate::services::typography::{
    self, format_coordinates, format_place_name, main_title_size, PosterFonts, BASE_ATTR_PT,
    BASE_COORDS_PT, BASE_SUB_PT,
};

/// Output DPI (150 instead of 300 for faster generation).
pub const OUTPUT_DPI: u32 = 150;

const ATTRIBUTION: &str = "\u{00a9} OpenStreetMap contributors";

/// Poster canvas in inches, rasterized at `dpi`.
#[derive(Debug, Clone, Copy)]
pub struct CanvasSize {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self { width_in: 12.0, height_in: 16.0, dpi: OUTPUT_DPI }
    }
}

impl CanvasSize {
    pub fn width_px(&self) -> u32 {
        (self.width_in * self.dpi as f64).round() as u32
    }

    pub fn height_px(&self) -> u32 {
        (self.height_in * self.dpi as f64).round() as u32
    }

    pub fn scale_factor(&self) -> f32 {
        typography::scale_factor(self.width_in, self.height_in)
    }
}

/// Effective fetch radius for a non-square canvas: enlarges the requested
/// radius by the aspect ratio so the shorter axis still covers it after
/// cropping.
pub fn compensated_radius(distance: u32, canvas: &CanvasSize) -> u32 {
    let long = canvas.width_in.max(canvas.height_in);
    let short = canvas.width_in.min(canvas.height_in);
    (distance as f64 * (long / short) / 4.0) as u32
}

// ---------------------------------------------------------------------------
// Road classification
// ---------------------------------------------------------------------------

/// The six road tiers a highway tag maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoadClass {
    Motorway,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Other,
}

/// Collapse a multi-valued highway tag to one canonical value: the first
/// element, or "unclassified" when the tag is absent. Total over the tag
/// domain.
pub fn normalize_highway_tag(values: &[String]) -> &str {
    values.first().map(String::as_str).unwrap_or("unclassified")
}

/// Deterministic, order-independent mapping from a canonical highway tag to
/// its road tier.
pub fn classify_road(tag: &str) -> RoadClass {
    match tag {
        "motorway" | "motorway_link" => RoadClass::Motorway,
        "trunk" | "trunk_link" | "primary" | "primary_link" => RoadClass::Primary,
        "secondary" | "secondary_link" => RoadClass::Secondary,
        "tertiary" | "tertiary_link" => RoadClass::Tertiary,
        "residential" | "living_street" | "unclassified" => RoadClass::Residential,
        _ => RoadClass::Other,
    }
}

impl RoadClass {
    /// Stroke width in points.
    pub fn width_pt(self) -> f32 {
        match self {
            RoadClass::Motorway => 1.2,
            RoadClass::Primary => 1.0,
            RoadClass::Secondary => 0.8,
            RoadClass::Tertiary => 0.6,
            RoadClass::Residential | RoadClass::Other => 0.4,
        }
    }

    pub fn color<'a>(self, theme: &'a Theme) -> &'a str {
        match self {
            RoadClass::Motorway => &theme.road_motorway,
            RoadClass::Primary => &theme.road_primary,
            RoadClass::Secondary => &theme.road_secondary,
            RoadClass::Tertiary => &theme.road_tertiary,
            RoadClass::Residential => &theme.road_residential,
            RoadClass::Other => &theme.road_default,
        }
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// Theme palette parsed into pixel values once per render.
struct Palette {
    bg: Rgba<u8>,
    text: Rgba<u8>,
    gradient: Rgba<u8>,
    water: Rgba<u8>,
    parks: Rgba<u8>,
    roads: [Rgba<u8>; 6],
}

impl Palette {
    fn from_theme(theme: &Theme) -> Result<Self, RenderError> {
        Ok(Self {
            bg: parse_hex_color(&theme.bg)?,
            text: parse_hex_color(&theme.text)?,
            gradient: parse_hex_color(&theme.gradient_color)?,
            water: parse_hex_color(&theme.water)?,
            parks: parse_hex_color(&theme.parks)?,
            roads: [
                parse_hex_color(&theme.road_motorway)?,
                parse_hex_color(&theme.road_primary)?,
                parse_hex_color(&theme.road_secondary)?,
                parse_hex_color(&theme.road_tertiary)?,
                parse_hex_color(&theme.road_residential)?,
                parse_hex_color(&theme.road_default)?,
            ],
        })
    }

    fn road(&self, class: RoadClass) -> Rgba<u8> {
        let idx = match class {
            RoadClass::Motorway => 0,
            RoadClass::Primary => 1,
            RoadClass::Secondary => 2,
            RoadClass::Tertiary => 3,
            RoadClass::Residential => 4,
            RoadClass::Other => 5,
        };
        self.roads[idx]
    }
}

fn parse_hex_color(hex: &str) -> Result<Rgba<u8>, RenderError> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return Err(RenderError::InvalidColor(hex.to_string()));
    }
    let parse =
        |s: &str| u8::from_str_radix(s, 16).map_err(|_| RenderError::InvalidColor(hex.to_string()));
    Ok(Rgba([
        parse(&digits[0..2])?,
        parse(&digits[2..4])?,
        parse(&digits[4..6])?,
        255,
    ]))
}

/// Linear mix of `src` over `dst` by `alpha`.
fn mix_color(src: Rgba<u8>, dst: Rgba<u8>, alpha: f32) -> Rgba<u8> {
    let mix = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}

// ---------------------------------------------------------------------------
// Projection and cropping
// ---------------------------------------------------------------------------

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Project WGS84 onto a local planar frame centered on `origin`, in meters
/// (equirectangular about the center, shared by graph and feature layers).
pub fn project(origin: Coordinates, point: Coordinates) -> (f64, f64) {
    let x = (point.lon - origin.lon).to_radians() * EARTH_RADIUS_M * origin.lat.to_radians().cos();
    let y = (point.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
    (x, y)
}

/// Half-extents (x, y) in meters of the symmetric crop box centered on the
/// target point. The shorter canvas axis spans exactly `radius` and the
/// longer axis grows with the aspect ratio, so a circle of `radius` around
/// the center is always fully contained.
pub fn crop_extents(radius: f64, canvas: &CanvasSize) -> (f64, f64) {
    let aspect = canvas.width_in / canvas.height_in;
    if aspect >= 1.0 {
        (radius * aspect, radius)
    } else {
        (radius, radius / aspect)
    }
}

// ---------------------------------------------------------------------------
// Poster rendering
// ---------------------------------------------------------------------------

/// Everything the rasterizer needs, assembled by the pipeline. Rendering is
/// synchronous and CPU-bound; callers run it under `spawn_blocking`.
pub struct RenderJob {
    pub network: StreetNetwork,
    pub water: Option<FeatureCollection>,
    pub parks: Option<FeatureCollection>,
    pub theme: Theme,
    pub theme_id: String,
    pub center: Coordinates,
    /// Compensated radius in meters; also the crop radius.
    pub radius: u32,
    pub city: String,
    pub country: String,
    pub canvas: CanvasSize,
    pub fonts: Option<PosterFonts>,
    pub posters_dir: PathBuf,
}

/// Render a poster and write it as a PNG. Returns the output path.
///
/// Layer order is fixed: background, water, parks, roads, gradient fades,
/// typography, decorative rule, attribution.
pub fn render_poster(job: RenderJob) -> Result<PathBuf, RenderError> {
    if job.network.is_empty() {
        return Err(RenderError::EmptyNetwork);
    }

    let palette = Palette::from_theme(&job.theme)?;
    let width = job.canvas.width_px();
    let height = job.canvas.height_px();
    let mut img = RgbaImage::from_pixel(width, height, palette.bg);

    let (half_x, half_y) = crop_extents(job.radius as f64, &job.canvas);
    let center = job.center;
    let to_px = move |c: Coordinates| -> (f32, f32) {
        let (x, y) = project(center, c);
        let px = ((x + half_x) / (2.0 * half_x) * width as f64) as f32;
        let py = ((half_y - y) / (2.0 * half_y) * height as f64) as f32;
        (px, py)
    };

    if let Some(water) = &job.water {
        draw_feature_layer(&mut img, water, palette.water, &to_px);
    }
    if let Some(parks) = &job.parks {
        draw_feature_layer(&mut img, parks, palette.parks, &to_px);
    }

    for edge in &job.network.edges {
        let class = classify_road(normalize_highway_tag(&edge.highway));
        let color = palette.road(class);
        let thickness = pt_to_px(class.width_pt(), job.canvas.dpi);
        for pair in edge.points.windows(2) {
            draw_thick_segment(&mut img, to_px(pair[0]), to_px(pair[1]), thickness, color);
        }
    }

    apply_gradient_fade(&mut img, palette.gradient, FadeLocation::Bottom);
    apply_gradient_fade(&mut img, palette.gradient, FadeLocation::Top);

    match &job.fonts {
        Some(fonts) => draw_typography(&mut img, &job, fonts, &palette),
        None => tracing::warn!("Fonts unavailable, rendering poster without typography"),
    }

    std::fs::create_dir_all(&job.posters_dir)?;
    let path = job.posters_dir.join(poster_filename(&job.city, &job.theme_id));
    img.save(&path)?;

    Ok(path)
}

/// Output filename encoding place, theme, and generation time to the second.
fn poster_filename(city: &str, theme_id: &str) -> String {
    let slug = city.to_lowercase().replace(' ', "_");
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{slug}_{theme_id}_{timestamp}.png")
}

fn pt_to_px(pt: f32, dpi: u32) -> f32 {
    pt * dpi as f32 / 72.0
}

fn draw_feature_layer(
    img: &mut RgbaImage,
    features: &FeatureCollection,
    color: Rgba<u8>,
    to_px: &impl Fn(Coordinates) -> (f32, f32),
) {
    for polygon in &features.polygons {
        let mut points: Vec<Point<i32>> = polygon
            .exterior
            .iter()
            .map(|&c| {
                let (x, y) = to_px(c);
                Point::new(x.round() as i32, y.round() as i32)
            })
            .collect();
        points.dedup();
        // draw_polygon_mut requires an open ring.
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() >= 3 {
            draw_polygon_mut(img, &points, color);
        }
    }
}

fn draw_thick_segment(
    img: &mut RgbaImage,
    (x0, y0): (f32, f32),
    (x1, y1): (f32, f32),
    thickness: f32,
    color: Rgba<u8>,
) {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 0.5 {
        return;
    }
    if thickness <= 1.5 {
        draw_line_segment_mut(img, (x0, y0), (x1, y1), color);
        return;
    }

    let half = thickness / 2.0;
    let (nx, ny) = (-dy / len * half, dx / len * half);
    let quad = [
        Point::new((x0 + nx).round() as i32, (y0 + ny).round() as i32),
        Point::new((x1 + nx).round() as i32, (y1 + ny).round() as i32),
        Point::new((x1 - nx).round() as i32, (y1 - ny).round() as i32),
        Point::new((x0 - nx).round() as i32, (y0 - ny).round() as i32),
    ];
    if quad[0] == quad[3] || quad[0] == quad[1] {
        draw_line_segment_mut(img, (x0, y0), (x1, y1), color);
        return;
    }
    draw_polygon_mut(img, &quad, color);

    let radius = (half - 0.5).round() as i32;
    if radius >= 1 {
        draw_filled_circle_mut(img, (x0.round() as i32, y0.round() as i32), radius, color);
        draw_filled_circle_mut(img, (x1.round() as i32, y1.round() as i32), radius, color);
    }
}

enum FadeLocation {
    Bottom,
    Top,
}

/// Vertical alpha ramp over a quarter of the canvas, for text legibility:
/// opaque at the canvas edge, transparent toward the middle.
fn apply_gradient_fade(img: &mut RgbaImage, color: Rgba<u8>, location: FadeLocation) {
    let (width, height) = img.dimensions();
    let quarter = height / 4;
    if quarter == 0 {
        return;
    }

    for i in 0..quarter {
        let alpha = 1.0 - i as f32 / quarter as f32;
        let y = match location {
            FadeLocation::Bottom => height - 1 - i,
            FadeLocation::Top => i,
        };
        for x in 0..width {
            let px = *img.get_pixel(x, y);
            img.put_pixel(x, y, mix_color(color, px, alpha));
        }
    }
}

fn draw_typography(img: &mut RgbaImage, job: &RenderJob, fonts: &PosterFonts, palette: &Palette) {
    let width = img.width() as f32;
    let height = img.height() as f32;
    let dpi = job.canvas.dpi;
    let scale = job.canvas.scale_factor();

    let title = format_place_name(&job.city);
    let title_px = PxScale::from(pt_to_px(main_title_size(job.city.chars().count(), scale), dpi));
    draw_centered_text(img, &title, title_px, &fonts.bold, palette.text, height * 0.86);

    let sub_px = PxScale::from(pt_to_px(BASE_SUB_PT * scale, dpi));
    draw_centered_text(
        img,
        &job.country.to_uppercase(),
        sub_px,
        &fonts.light,
        palette.text,
        height * 0.90,
    );

    let caption = format_coordinates(job.center.lat, job.center.lon);
    let coords_px = PxScale::from(pt_to_px(BASE_COORDS_PT * scale, dpi));
    let coords_color = mix_color(palette.text, palette.gradient, 0.7);
    draw_centered_text(img, &caption, coords_px, &fonts.regular, coords_color, height * 0.93);

    // Decorative rule between title and country line.
    let rule_y = height * 0.875;
    let rule_thickness = pt_to_px(scale, dpi).max(1.0).round() as i32;
    for i in 0..rule_thickness {
        let y = rule_y + i as f32 - rule_thickness as f32 / 2.0;
        draw_line_segment_mut(img, (width * 0.4, y), (width * 0.6, y), palette.text);
    }

    let attr_px = PxScale::from(pt_to_px(BASE_ATTR_PT * scale, dpi));
    let attr_color = mix_color(palette.text, palette.bg, 0.5);
    let (tw, th) = text_size(attr_px, &fonts.light, ATTRIBUTION);
    let x = (width * 0.98 - tw as f32).round() as i32;
    let y = (height * 0.98 - th as f32).round() as i32;
    draw_text_mut(img, attr_color, x, y, attr_px, &fonts.light, ATTRIBUTION);
}

/// Draw text horizontally centered with its bottom edge at `bottom_y`.
fn draw_centered_text(
    img: &mut RgbaImage,
    text: &str,
    scale: PxScale,
    font: &ab_glyph::FontArc,
    color: Rgba<u8>,
    bottom_y: f32,
) {
    let (tw, th) = text_size(scale, font, text);
    let x = ((img.width() as f32 - tw as f32) / 2.0).round() as i32;
    let y = (bottom_y - th as f32).round() as i32;
    draw_text_mut(img, color, x, y, scale, font, text);
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Theme color {0:?} is not a valid hex color")]
    InvalidColor(String),

    #[error("Street network contains no drawable edges")]
    EmptyNetwork,

    #[error("Failed to write poster: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode poster image: {0}")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geo::{FeaturePolygon, StreetEdge};

    fn tag(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_classification_covers_all_tiers() {
        assert_eq!(classify_road("motorway"), RoadClass::Motorway);
        assert_eq!(classify_road("motorway_link"), RoadClass::Motorway);
        assert_eq!(classify_road("trunk"), RoadClass::Primary);
        assert_eq!(classify_road("primary_link"), RoadClass::Primary);
        assert_eq!(classify_road("secondary"), RoadClass::Secondary);
        assert_eq!(classify_road("tertiary_link"), RoadClass::Tertiary);
        assert_eq!(classify_road("residential"), RoadClass::Residential);
        assert_eq!(classify_road("living_street"), RoadClass::Residential);
        assert_eq!(classify_road("unclassified"), RoadClass::Residential);
        assert_eq!(classify_road("footway"), RoadClass::Other);
        assert_eq!(classify_road(""), RoadClass::Other);
    }

    #[test]
    fn test_classification_is_pure() {
        for _ in 0..3 {
            assert_eq!(classify_road("secondary"), RoadClass::Secondary);
        }
    }

    #[test]
    fn test_normalize_takes_first_of_multivalued_tag() {
        assert_eq!(normalize_highway_tag(&tag(&["primary", "cycleway"])), "primary");
        assert_eq!(normalize_highway_tag(&tag(&[])), "unclassified");
    }

    #[test]
    fn test_widths_by_tier() {
        assert_eq!(RoadClass::Motorway.width_pt(), 1.2);
        assert_eq!(RoadClass::Primary.width_pt(), 1.0);
        assert_eq!(RoadClass::Secondary.width_pt(), 0.8);
        assert_eq!(RoadClass::Tertiary.width_pt(), 0.6);
        assert_eq!(RoadClass::Residential.width_pt(), 0.4);
        assert_eq!(RoadClass::Other.width_pt(), 0.4);
    }

    #[test]
    fn test_crop_extents_contain_radius_circle() {
        let square = CanvasSize { width_in: 12.0, height_in: 12.0, dpi: OUTPUT_DPI };
        let portrait = CanvasSize { width_in: 12.0, height_in: 16.0, dpi: OUTPUT_DPI };
        let landscape = CanvasSize { width_in: 16.0, height_in: 12.0, dpi: OUTPUT_DPI };

        for canvas in [square, portrait, landscape] {
            let (half_x, half_y) = crop_extents(10_000.0, &canvas);
            assert!(half_x >= 10_000.0, "x extent too small: {half_x}");
            assert!(half_y >= 10_000.0, "y extent too small: {half_y}");
        }
    }

    #[test]
    fn test_crop_extents_shorter_axis_is_exact() {
        let portrait = CanvasSize { width_in: 12.0, height_in: 16.0, dpi: OUTPUT_DPI };
        let (half_x, half_y) = crop_extents(10_000.0, &portrait);
        assert_eq!(half_x, 10_000.0);
        assert!((half_y - 10_000.0 * 16.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_compensated_radius() {
        let canvas = CanvasSize::default();
        // 10000 * (16/12) / 4 = 3333
        assert_eq!(compensated_radius(10_000, &canvas), 3333);

        let square = CanvasSize { width_in: 12.0, height_in: 12.0, dpi: OUTPUT_DPI };
        assert_eq!(compensated_radius(10_000, &square), 2500);
    }

    #[test]
    fn test_projection_signs() {
        let origin = Coordinates { lat: 48.0, lon: 2.0 };
        let north = Coordinates { lat: 48.1, lon: 2.0 };
        let east = Coordinates { lat: 48.0, lon: 2.1 };

        let (_, y) = project(origin, north);
        assert!(y > 0.0);
        let (x, _) = project(origin, east);
        assert!(x > 0.0);
        assert_eq!(project(origin, origin), (0.0, 0.0));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF8000").unwrap(), Rgba([255, 128, 0, 255]));
        assert_eq!(parse_hex_color("000000").unwrap(), Rgba([0, 0, 0, 255]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_empty_network_is_fatal() {
        let job = small_job(StreetNetwork::default());
        match render_poster(job) {
            Err(RenderError::EmptyNetwork) => {}
            other => panic!("expected EmptyNetwork, got {other:?}"),
        }
    }

    #[test]
    fn test_render_writes_png() {
        let center = Coordinates { lat: 48.8566, lon: 2.3522 };
        let mut edges = Vec::new();
        for i in -3i32..=3 {
            let offset = i as f64 * 0.002;
            edges.push(StreetEdge {
                points: vec![
                    Coordinates { lat: center.lat + offset, lon: center.lon - 0.01 },
                    Coordinates { lat: center.lat + offset, lon: center.lon + 0.01 },
                ],
                highway: tag(&["residential"]),
            });
        }
        edges.push(StreetEdge {
            points: vec![
                Coordinates { lat: center.lat - 0.01, lon: center.lon },
                Coordinates { lat: center.lat + 0.01, lon: center.lon },
            ],
            highway: tag(&["motorway"]),
        });

        let mut job = small_job(StreetNetwork { edges });
        job.water = Some(FeatureCollection {
            polygons: vec![FeaturePolygon {
                exterior: vec![
                    Coordinates { lat: center.lat + 0.003, lon: center.lon + 0.003 },
                    Coordinates { lat: center.lat + 0.006, lon: center.lon + 0.003 },
                    Coordinates { lat: center.lat + 0.006, lon: center.lon + 0.006 },
                    Coordinates { lat: center.lat + 0.003, lon: center.lon + 0.003 },
                ],
            }],
        });

        let path = render_poster(job).unwrap();
        assert!(path.extension().is_some_and(|e| e == "png"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("paris_noir_"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    fn small_job(network: StreetNetwork) -> RenderJob {
        RenderJob {
            network,
            water: None,
            parks: None,
            theme: Theme::fallback(),
            theme_id: "noir".to_string(),
            center: Coordinates { lat: 48.8566, lon: 2.3522 },
            radius: 1000,
            city: "Paris".to_string(),
            country: "France".to_string(),
            canvas: CanvasSize { width_in: 3.0, height_in: 4.0, dpi: 50 },
            fonts: None,
            posters_dir: std::env::temp_dir().join(format!("posters-test-{}", uuid::Uuid::new_v4())),
        }
    }
}
