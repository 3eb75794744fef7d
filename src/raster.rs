//! Software rasterizer for RGBA8 frames.

use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::config::Color;

pub struct Canvas<'a> {
    pub frame: &'a mut [u8],
    pub width: usize,
    pub height: usize,
}

impl<'a> Canvas<'a> {
    pub fn new(frame: &'a mut [u8], width: usize, height: usize) -> Self {
        debug_assert!(frame.len() >= width * height * 4);
        Self {
            frame,
            width,
            height,
        }
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * self.width + x) * 4;
        [
            self.frame[idx],
            self.frame[idx + 1],
            self.frame[idx + 2],
            self.frame[idx + 3],
        ]
    }

    /// Blends `color` over the pixel at `coverage` (0..=1) times its own alpha.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let a = (color.alpha() * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let src = [color.r as f32, color.g as f32, color.b as f32];
        for (channel, value) in src.iter().enumerate() {
            let dst = self.frame[idx + channel] as f32;
            self.frame[idx + channel] = (value * a + dst * (1.0 - a)).round() as u8;
        }
        self.frame[idx + 3] = 0xff;
    }
}

/// Anti-aliased line with round caps.
pub fn draw_thick_line_aa(
    canvas: &mut Canvas,
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    thickness: f32,
    color: Color,
) {
    let half = (thickness / 2.0).max(0.5);
    let pad = half.ceil() as i32 + 1;
    let min_x = x0.min(x1).floor() as i32 - pad;
    let max_x = x0.max(x1).ceil() as i32 + pad;
    let min_y = y0.min(y1).floor() as i32 - pad;
    let max_y = y0.max(y1).ceil() as i32 + pad;
    let dx = (x1 - x0) as f32;
    let dy = (y1 - y0) as f32;
    let len_sq = dx * dx + dy * dy;
    // Sub-pixel lines fade instead of vanishing.
    let intensity = (thickness / (2.0 * half)).clamp(0.0, 1.0);
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5 - x0 as f32;
            let py = y as f32 + 0.5 - y0 as f32;
            let t = if len_sq > 0.0 {
                ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dist = ((px - t * dx).powi(2) + (py - t * dy).powi(2)).sqrt();
            let aa = (half + 0.5 - dist).clamp(0.0, 1.0) * intensity;
            if aa > 0.01 {
                canvas.set_pixel(x, y, color, aa);
            }
        }
    }
}

/// Axis-aligned box with rounded corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub radius: f64,
}

impl RoundedBox {
    /// Signed distance from the pixel center to the box edge, negative inside.
    pub fn distance(&self, px: f64, py: f64) -> f64 {
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let r = self.radius.clamp(0.0, hw.min(hh));
        let qx = (px - (self.x + hw)).abs() - (hw - r);
        let qy = (py - (self.y + hh)).abs() - (hh - r);
        qx.max(0.0).hypot(qy.max(0.0)) + qx.max(qy).min(0.0) - r
    }

    fn pixel_bounds(&self) -> (i32, i32, i32, i32) {
        (
            self.x.floor() as i32 - 1,
            self.y.floor() as i32 - 1,
            (self.x + self.width).ceil() as i32 + 1,
            (self.y + self.height).ceil() as i32 + 1,
        )
    }
}

/// Fills the box then strokes `border_width` inside its edge.
pub fn draw_rounded_box(
    canvas: &mut Canvas,
    shape: RoundedBox,
    fill: Color,
    border_color: Color,
    border_width: f64,
) {
    let (min_x, min_y, max_x, max_y) = shape.pixel_bounds();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let d = shape.distance(x as f64 + 0.5, y as f64 + 0.5);
            let inside = (0.5 - d).clamp(0.0, 1.0);
            if inside <= 0.0 {
                continue;
            }
            if !fill.is_transparent() {
                canvas.set_pixel(x, y, fill, inside as f32);
            }
            if border_width > 0.0 && !border_color.is_transparent() {
                let ring = inside * (0.5 + d + border_width).clamp(0.0, 1.0);
                if ring > 0.0 {
                    canvas.set_pixel(x, y, border_color, ring as f32);
                }
            }
        }
    }
}

/// Copies `image` to `(x, y)`, clipped to `clip`.
pub fn blit_clipped(canvas: &mut Canvas, image: &image::RgbaImage, x: i32, y: i32, clip: RoundedBox) {
    for (ix, iy, px) in image.enumerate_pixels() {
        let (cx, cy) = (x + ix as i32, y + iy as i32);
        let inside = (0.5 - clip.distance(cx as f64 + 0.5, cy as f64 + 0.5)).clamp(0.0, 1.0);
        if inside > 0.0 {
            let [r, g, b, a] = px.0;
            canvas.set_pixel(cx, cy, Color::rgba(r, g, b, a), inside as f32);
        }
    }
}

fn layout(text: &str, font: &Font<'static>, scale: Scale) -> Vec<PositionedGlyph<'static>> {
    let v_metrics = font.v_metrics(scale);
    font.layout(text, scale, point(0.0, v_metrics.ascent)).collect()
}

fn pixel_extent(glyphs: &[PositionedGlyph]) -> Option<(i32, i32, i32, i32)> {
    glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box())
        .fold(None, |acc, bb| {
            Some(match acc {
                None => (bb.min.x, bb.max.x, bb.min.y, bb.max.y),
                Some((min_x, max_x, min_y, max_y)) => (
                    min_x.min(bb.min.x),
                    max_x.max(bb.max.x),
                    min_y.min(bb.min.y),
                    max_y.max(bb.max.y),
                ),
            })
        })
}

/// Inked width and height of `text`.
pub fn measure_text(text: &str, font: &Font<'static>, scale: Scale) -> (i32, i32) {
    match pixel_extent(&layout(text, font, scale)) {
        Some((min_x, max_x, min_y, max_y)) => (max_x - min_x, max_y - min_y),
        None => (0, 0),
    }
}

/// Draws `text` centered on `(x, y)`.
pub fn draw_text(
    canvas: &mut Canvas,
    (x, y): (f64, f64),
    text: &str,
    font: &Font<'static>,
    scale: Scale,
    color: Color,
) {
    let glyphs = layout(text, font, scale);
    let Some((min_x, max_x, min_y, max_y)) = pixel_extent(&glyphs) else {
        return;
    };
    let offset_x = x.round() as i32 - (max_x - min_x) / 2;
    let offset_y = y.round() as i32 - (max_y - min_y) / 2;
    for glyph in &glyphs {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, v| {
                let px = offset_x + gx as i32 + bb.min.x - min_x;
                let py = offset_y + gy as i32 + bb.min.y - min_y;
                canvas.set_pixel(px, py, color, v);
            });
        }
    }
}
