//! Visual tree rasterizer (tiny-skia).
//!
//! Text is drawn from real glyph outlines when the asset gate loaded the font,
//! horizontally fitted to the width the layout measured so raster output never
//! drifts from the computed layout. Without a font, each word is drawn as a
//! solid bar of the measured width so the page geometry stays truthful.

use tiny_skia::{
    FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Transform,
};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::export::assets::ReadyAssets;
use crate::export::ExportError;
use crate::layout::fit::Slice;
use crate::layout::font_metrics::get_metrics;
use crate::layout::geometry::PageGeometry;
use crate::layout::visual_tree::{Color, Node, TextRun, VisualTree};

/// Horizontal shear applied to italic runs (x += SKEW · height above baseline).
const ITALIC_SKEW: f32 = 0.2;

/// Raster parameters shared by every page of one export.
#[derive(Debug, Clone, Copy)]
pub struct RasterParams {
    pub raster_scale: f32,
    pub max_canvas_pixels: u64,
}

fn page_pixmap(geometry: PageGeometry, params: &RasterParams) -> Result<Pixmap, ExportError> {
    let width = (geometry.width_px() * params.raster_scale).round() as u32;
    let height = (geometry.height_px() * params.raster_scale).round() as u32;
    blank_pixmap(width, height, params.max_canvas_pixels)
}

fn blank_pixmap(width: u32, height: u32, limit: u64) -> Result<Pixmap, ExportError> {
    if width as u64 * height as u64 > limit {
        return Err(ExportError::CanvasTooLarge { width, height, limit });
    }
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| ExportError::Raster(format!("cannot allocate {width}x{height} canvas")))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    Ok(pixmap)
}

/// One page with the whole tree scaled by `scale_factor`, top-aligned and
/// horizontally centred.
pub fn render_scaled_page(
    tree: &VisualTree,
    assets: &ReadyAssets,
    geometry: PageGeometry,
    scale_factor: f32,
    params: &RasterParams,
) -> Result<Pixmap, ExportError> {
    let mut page = page_pixmap(geometry, params)?;
    let scale = params.raster_scale * scale_factor;
    let offset_x = (geometry.width_px() - tree.width * scale_factor).max(0.0) / 2.0 * params.raster_scale;
    let transform = Transform::from_row(scale, 0.0, 0.0, scale, offset_x, 0.0);
    draw_tree(&mut page, tree, assets, transform);
    Ok(page)
}

/// One page holding exactly the source rectangle `slice` of the tree's content
/// box, placed inside the page margins.
pub fn render_slice_page(
    tree: &VisualTree,
    assets: &ReadyAssets,
    geometry: PageGeometry,
    slice: Slice,
    params: &RasterParams,
) -> Result<Pixmap, ExportError> {
    let mut page = page_pixmap(geometry, params)?;
    let rs = params.raster_scale;
    let content_width = (tree.content_width() * rs).round() as u32;
    let mut band = blank_pixmap(content_width.max(1), slice.source_height.max(1), params.max_canvas_pixels)?;

    let margin = tree.margin * rs;
    let transform = Transform::from_row(rs, 0.0, 0.0, rs, -margin, -(margin + slice.source_y_start as f32));
    draw_tree(&mut band, tree, assets, transform);

    let origin = margin.round() as i32;
    page.draw_pixmap(
        origin,
        origin,
        band.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        None,
    );
    Ok(page)
}

// ────────────────────────────────────────────────────────────────────────────
// Tree drawing
// ────────────────────────────────────────────────────────────────────────────

pub fn draw_tree(pixmap: &mut Pixmap, tree: &VisualTree, assets: &ReadyAssets, transform: Transform) {
    let faces: Vec<_> = assets
        .fonts
        .iter()
        .filter_map(|(key, bytes)| Face::parse(bytes.as_slice(), 0).ok().map(|face| (*key, face)))
        .collect();

    for node in tree.nodes() {
        match node {
            Node::Text(run) => {
                let face = faces.iter().find(|(key, _)| *key == run.font_key()).map(|(_, f)| f);
                let drawn = face.map_or(false, |face| draw_glyphs(pixmap, run, face, transform));
                if !drawn {
                    draw_greeked(pixmap, run, transform);
                }
            }
            Node::Rule {
                x,
                y,
                width,
                thickness,
                color,
            } => fill_rect(pixmap, *x, *y, *width, *thickness, *color, transform),
            Node::Rect {
                x,
                y,
                width,
                height,
                radius,
                color,
            } => {
                if let Some(path) = rounded_rect(*x, *y, *width, *height, *radius) {
                    pixmap.fill_path(&path, &paint(*color), FillRule::Winding, transform, None);
                }
            }
            Node::Image {
                x,
                y,
                width,
                height,
                source,
            } => match assets.images.get(source) {
                Some(img) => {
                    let img: &Pixmap = img;
                    let placed = transform.pre_translate(*x, *y).pre_scale(
                        width / img.width() as f32,
                        height / img.height() as f32,
                    );
                    let image_paint = PixmapPaint {
                        quality: FilterQuality::Bicubic,
                        ..PixmapPaint::default()
                    };
                    pixmap.draw_pixmap(0, 0, img.as_ref(), &image_paint, placed, None);
                }
                _ => fill_rect(pixmap, *x, *y, *width, *height, Color::PLACEHOLDER, transform),
            },
        }
    }
}

fn paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;
    paint
}

fn fill_rect(pixmap: &mut Pixmap, x: f32, y: f32, w: f32, h: f32, color: Color, transform: Transform) {
    if let Some(rect) = Rect::from_xywh(x, y, w, h) {
        pixmap.fill_rect(rect, &paint(color), transform, None);
    }
}

fn rounded_rect(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    if r == 0.0 {
        return Rect::from_xywh(x, y, w, h).map(PathBuilder::from_rect);
    }
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Draws `run` from glyph outlines. Returns false if nothing could be drawn.
fn draw_glyphs(pixmap: &mut Pixmap, run: &TextRun, face: &Face<'_>, transform: Transform) -> bool {
    let units = face.units_per_em() as f32;
    if units <= 0.0 || run.font_px <= 0.0 {
        return false;
    }
    let scale = run.font_px / units;
    let glyphs: Vec<_> = run
        .text
        .chars()
        .map(|c| {
            let id = face.glyph_index(c).unwrap_or(GlyphId(0));
            let advance = face.glyph_hor_advance(id).unwrap_or(0) as f32 * scale;
            (id, advance)
        })
        .collect();
    let natural: f32 = glyphs.iter().map(|(_, advance)| advance).sum();
    if natural <= 0.0 {
        return false;
    }
    // Fit the shaped width to the measured width.
    let stretch = run.width / natural;
    let skew = if run.italic { ITALIC_SKEW } else { 0.0 };
    let baseline = run.baseline();
    let fill = paint(run.color);

    let mut pen_x = run.x;
    let mut drawn = 0usize;
    for (id, advance) in glyphs {
        let mut builder = GlyphPathBuilder {
            builder: PathBuilder::new(),
            origin_x: pen_x,
            origin_y: baseline,
            scale_x: scale * stretch,
            scale_y: scale,
            skew,
        };
        if face.outline_glyph(id, &mut builder).is_some() {
            if let Some(path) = builder.builder.finish() {
                pixmap.fill_path(&path, &fill, FillRule::Winding, transform, None);
                drawn += 1;
            }
        }
        pen_x += advance * stretch;
    }
    drawn > 0 || run.text.trim().is_empty()
}

/// Word bars at x-height, positioned from the static metrics.
fn draw_greeked(pixmap: &mut Pixmap, run: &TextRun, transform: Transform) {
    let metrics = get_metrics(run.typeface);
    let space = metrics.space_width * run.font_px;
    let bar_height = run.font_px * 0.45;
    let top = run.baseline() - bar_height;
    let mut x = run.x;
    for word in run.text.split(' ') {
        let width = metrics.width_px(word, run.font_px, run.weight);
        if !word.is_empty() {
            fill_rect(pixmap, x, top, width, bar_height, run.color, transform);
        }
        x += width + space;
    }
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale_x: f32,
    scale_y: f32,
    skew: f32,
}

impl GlyphPathBuilder {
    /// Font units (y up) to tree pixels (y down).
    fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let up = y * self.scale_y;
        (self.origin_x + x * self.scale_x + up * self.skew, self.origin_y - up)
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.map(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x, y) = self.map(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.map(x1, y1);
        let (x2, y2) = self.map(x2, y2);
        let (x, y) = self.map(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────────────────

/// JPEG-encodes an opaque pixmap.
pub fn encode_jpeg(pixmap: &Pixmap, quality: u8) -> Result<Vec<u8>, ExportError> {
    // Pages are filled white first, so every pixel is opaque and premultiplied
    // RGB equals straight RGB.
    let rgb: Vec<u8> = pixmap
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality).encode(
        &rgb,
        pixmap.width(),
        pixmap.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::assets::tests::{png_bytes, tree_with_images};
    use crate::export::assets::decode_image;
    use std::sync::Arc;

    fn params() -> RasterParams {
        RasterParams {
            raster_scale: 1.0,
            max_canvas_pixels: 20_000_000,
        }
    }

    fn dark_pixels(pixmap: &Pixmap) -> usize {
        pixmap
            .data()
            .chunks_exact(4)
            .filter(|px| px[0] < 200 || px[1] < 200 || px[2] < 200)
            .count()
    }

    #[test]
    fn test_scaled_page_has_page_size_and_ink() {
        let tree = tree_with_images(&[]);
        let page = render_scaled_page(&tree, &ReadyAssets::default(), PageGeometry::A4, 1.0, &params()).unwrap();
        assert_eq!((page.width(), page.height()), (794, 1123));
        assert!(dark_pixels(&page) > 0);
    }

    #[test]
    fn test_missing_image_draws_placeholder_loaded_image_draws_pixels() {
        let tree = tree_with_images(&["https://example.com/a.png"]);
        let placeholder = render_scaled_page(&tree, &ReadyAssets::default(), PageGeometry::A4, 1.0, &params()).unwrap();

        let mut assets = ReadyAssets::default();
        assets.images.insert(
            "https://example.com/a.png".to_string(),
            Arc::new(decode_image(&png_bytes()).unwrap()),
        );
        let loaded = render_scaled_page(&tree, &assets, PageGeometry::A4, 1.0, &params()).unwrap();
        // The loaded image is saturated red; the placeholder is light grey.
        let red = |p: &Pixmap| {
            p.data()
                .chunks_exact(4)
                .filter(|px| px[0] > 150 && px[1] < 60 && px[2] < 60)
                .count()
        };
        assert_eq!(red(&placeholder), 0);
        assert!(red(&loaded) > 1_000);
    }

    #[test]
    fn test_slice_page_only_contains_its_band() {
        // Text sits at y 120..140 of the tree; content box starts at 72.
        let tree = tree_with_images(&[]);
        let above = Slice {
            source_y_start: 0,
            source_height: 40,
        };
        let holding = Slice {
            source_y_start: 40,
            source_height: 40,
        };
        let assets = ReadyAssets::default();
        let empty = render_slice_page(&tree, &assets, PageGeometry::A4, above, &params()).unwrap();
        let inked = render_slice_page(&tree, &assets, PageGeometry::A4, holding, &params()).unwrap();
        assert_eq!(dark_pixels(&empty), 0);
        assert!(dark_pixels(&inked) > 0);
    }

    #[test]
    fn test_canvas_limit_is_enforced() {
        let tree = tree_with_images(&[]);
        let tiny = RasterParams {
            raster_scale: 1.0,
            max_canvas_pixels: 1_000,
        };
        let err = render_scaled_page(&tree, &ReadyAssets::default(), PageGeometry::A4, 1.0, &tiny).unwrap_err();
        assert!(matches!(err, ExportError::CanvasTooLarge { .. }));
    }

    #[test]
    fn test_encode_jpeg_produces_jfif() {
        let page = blank_pixmap(16, 16, 1_000).unwrap();
        let jpeg = encode_jpeg(&page, 90).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_rounded_rect_degenerates_to_rect() {
        assert!(rounded_rect(0.0, 0.0, 10.0, 10.0, 0.0).is_some());
        assert!(rounded_rect(0.0, 0.0, 10.0, 4.0, 20.0).is_some());
    }
}
