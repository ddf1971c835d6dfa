//! Drawing surface abstraction
//!
//! The frame pipeline only talks to a `DrawSurface`. The browser backend wraps
//! a `CanvasRenderingContext2d`; `RecordingSurface` keeps a list of calls for
//! tests and the headless binary.

use glam::Vec2;

/// Minimal Canvas2D-shaped drawing API. Coordinates are canvas backing px.
///
/// Text is drawn centered horizontally and vertically on `(x, y)`.
pub trait DrawSurface {
    /// Pre-rasterized image handle (a canvas in the browser)
    type Image;

    /// Backing-store size
    fn size(&self) -> Vec2;
    fn clear(&mut self, color: &str);
    /// Global alpha for subsequent draws
    fn set_alpha(&mut self, alpha: f32);
    /// Fill the whole surface with `tile` repeated, shifted by `offset` and scaled
    fn fill_pattern(&mut self, tile: &Self::Image, offset: Vec2, scale: f32);
    /// Radial gradient over the whole surface, `inner` color at `center`
    fn fill_radial(
        &mut self,
        center: Vec2,
        inner_radius: f32,
        outer_radius: f32,
        inner: &str,
        outer: &str,
    );
    fn draw_image(&mut self, image: &Self::Image, x: f32, y: f32, w: f32, h: f32);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: &str);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: &str);
    fn fill_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, color: &str);
    fn set_font(&mut self, font: &str);
    /// Width of `text` in the current font
    fn measure_text(&mut self, text: &str) -> f32;
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: &str);
}

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(String),
    Alpha(f32),
    Pattern { tile: String, offset: Vec2 },
    Radial { center: Vec2 },
    Image { image: String, x: f32, y: f32, w: f32, h: f32 },
    Circle { center: Vec2, radius: f32 },
    Ring { center: Vec2, radius: f32, color: String },
    RoundRect { x: f32, y: f32, w: f32, h: f32 },
    Font(String),
    Text { text: String, x: f32, y: f32 },
}

/// Image stand-in: a name and a square pixel size
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImage {
    pub name: String,
    pub size: u32,
}

/// Records draw calls instead of rasterizing
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    pub size: Vec2,
    pub calls: Vec<DrawCall>,
    /// Advance width per character used by `measure_text`
    pub char_width: f32,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            calls: Vec::new(),
            char_width: 7.0,
        }
    }

    /// Names of every drawn image, in draw order
    pub fn images(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Image { image, .. } => Some(image.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every drawn text run, in draw order
    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.calls.clear();
    }
}

impl DrawSurface for RecordingSurface {
    type Image = RecordedImage;

    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self, color: &str) {
        self.calls.push(DrawCall::Clear(color.to_string()));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.calls.push(DrawCall::Alpha(alpha));
    }

    fn fill_pattern(&mut self, tile: &RecordedImage, offset: Vec2, _scale: f32) {
        self.calls.push(DrawCall::Pattern {
            tile: tile.name.clone(),
            offset,
        });
    }

    fn fill_radial(
        &mut self,
        center: Vec2,
        _inner_radius: f32,
        _outer_radius: f32,
        _inner: &str,
        _outer: &str,
    ) {
        self.calls.push(DrawCall::Radial { center });
    }

    fn draw_image(&mut self, image: &RecordedImage, x: f32, y: f32, w: f32, h: f32) {
        self.calls.push(DrawCall::Image {
            image: image.name.clone(),
            x,
            y,
            w,
            h,
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, _color: &str) {
        self.calls.push(DrawCall::Circle { center, radius });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, _width: f32, color: &str) {
        self.calls.push(DrawCall::Ring {
            center,
            radius,
            color: color.to_string(),
        });
    }

    fn fill_round_rect(&mut self, x: f32, y: f32, w: f32, h: f32, _radius: f32, _color: &str) {
        self.calls.push(DrawCall::RoundRect { x, y, w, h });
    }

    fn set_font(&mut self, font: &str) {
        self.calls.push(DrawCall::Font(font.to_string()));
    }

    fn measure_text(&mut self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, _color: &str) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            x,
            y,
        });
    }
}
