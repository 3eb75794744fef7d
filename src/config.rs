/// Color representation for clock face elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const GREY: Color = Color::new(0x80, 0x80, 0x80);
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Builds a color from a `0xRRGGBB` literal.
    pub const fn hex(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn alpha(self) -> f32 {
        self.a as f32 / 255.0
    }

    pub fn is_transparent(self) -> bool {
        self.a == 0
    }
}

/// Fully resolved visual properties of one face element.
///
/// Every element of the dial (container, face, tick lines, numerals, hands,
/// pivot, date badge) is described by this one record. Fields that make no
/// sense for an element are simply ignored by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub width: f64,
    pub height: f64,
    pub background: Color,
    pub border_color: Color,
    pub border_width: f64,
    pub border_radius: f64,
    /// Distance from the inner edge of the dial towards the center.
    pub inset: f64,
    pub padding: f64,
    pub font_size: f64,
    pub text_color: Color,
    pub z_index: i32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            background: Color::TRANSPARENT,
            border_color: Color::TRANSPARENT,
            border_width: 0.0,
            border_radius: 0.0,
            inset: 0.0,
            padding: 0.0,
            font_size: 14.0,
            text_color: Color::BLACK,
            z_index: 0,
        }
    }
}

impl Style {
    /// Shallow merge: every field set in `overrides` wins, the rest is kept.
    pub fn with_overrides(mut self, overrides: &StyleOverrides) -> Self {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }
        apply!(
            width,
            height,
            background,
            border_color,
            border_width,
            border_radius,
            inset,
            padding,
            font_size,
            text_color,
            z_index
        );
        self
    }
}

/// Caller supplied partial style, merged over the documented defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverrides {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub background: Option<Color>,
    pub border_color: Option<Color>,
    pub border_width: Option<f64>,
    pub border_radius: Option<f64>,
    pub inset: Option<f64>,
    pub padding: Option<f64>,
    pub font_size: Option<f64>,
    pub text_color: Option<Color>,
    pub z_index: Option<i32>,
}

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn border_color(mut self, color: Color) -> Self {
        self.border_color = Some(color);
        self
    }

    pub fn border_width(mut self, width: f64) -> Self {
        self.border_width = Some(width);
        self
    }

    pub fn border_radius(mut self, radius: f64) -> Self {
        self.border_radius = Some(radius);
        self
    }

    pub fn inset(mut self, inset: f64) -> Self {
        self.inset = Some(inset);
        self
    }

    pub fn padding(mut self, padding: f64) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn font_size(mut self, size: f64) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }
}

/// Face size used when the face style does not set a width.
pub const DEFAULT_FACE_SIZE: f64 = 200.0;

/// Documented default look of every face element.
pub mod defaults {
    use super::{Color, Style, DEFAULT_FACE_SIZE};

    pub fn container(face_width: f64) -> Style {
        Style {
            width: face_width,
            padding: 2.0,
            border_radius: 45.0,
            ..Style::default()
        }
    }

    pub fn face() -> Style {
        Style {
            width: DEFAULT_FACE_SIZE,
            height: DEFAULT_FACE_SIZE,
            border_radius: 150.0,
            border_width: 8.0,
            border_color: Color::GREY,
            ..Style::default()
        }
    }

    pub fn tick_line() -> Style {
        Style {
            width: 0.5,
            height: 5.0,
            background: Color::GREY,
            inset: 3.0,
            ..Style::default()
        }
    }

    pub fn hour_numeral() -> Style {
        Style {
            font_size: 18.0,
            text_color: Color::RED,
            ..Style::default()
        }
    }

    /// Ring the hour markers sit on; only `inset` is consulted.
    pub fn hour_markers_container() -> Style {
        Style::default()
    }

    /// Style for `HourMarker::Dot` markers.
    pub fn hour_dot() -> Style {
        Style {
            width: 6.0,
            height: 6.0,
            background: Color::hex(0x333333),
            border_radius: 3.0,
            inset: 10.0,
            ..Style::default()
        }
    }

    fn hand(face_height: f64, length_ratio: f64, color: Color) -> Style {
        Style {
            width: 4.0,
            height: face_height * length_ratio,
            background: color,
            border_radius: 3.0,
            z_index: 1,
            ..Style::default()
        }
    }

    pub fn hour_hand(face_height: f64) -> Style {
        hand(face_height, 0.30, Color::BLACK)
    }

    pub fn minute_hand(face_height: f64) -> Style {
        hand(face_height, 0.35, Color::hex(0x666666))
    }

    pub fn second_hand(face_height: f64) -> Style {
        hand(face_height, 0.40, Color::hex(0xe74c3c))
    }

    pub fn center_pivot() -> Style {
        Style {
            width: 12.0,
            height: 12.0,
            background: Color::hex(0x333333),
            border_radius: 6.0,
            z_index: 10,
            ..Style::default()
        }
    }

    /// Date badge defaults; position and font scale with the face width.
    pub fn date_badge(face_width: f64) -> Style {
        Style {
            padding: 2.0,
            border_radius: 3.0,
            border_width: 1.0,
            border_color: Color::BLACK,
            font_size: face_width * 0.07,
            ..Style::default()
        }
    }
}
