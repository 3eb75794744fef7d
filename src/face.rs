//! Dial layout.
//!
//! [`FaceRenderer`] turns an [`AngleSet`] and a [`ClockConfig`] into a
//! [`ClockFace`]: a flat tree of positioned elements in face-local logical
//! pixels (origin top-left of the face, y pointing down). Angles are degrees
//! clockwise from 12 o'clock. Layout only reads configured sizes, never
//! measured ones, so the same inputs always produce the same face.

use std::path::PathBuf;
use std::sync::Arc;

use crate::angles::AngleSet;
use crate::config::{defaults, Style, StyleOverrides};
use crate::ClockConfig;

/// Minute positions around the dial.
pub const TICK_SLOTS: usize = 60;
/// Hour positions around the dial.
pub const NUMERAL_SLOTS: usize = 12;

/// What to show at one hour position.
#[derive(Debug, Clone, PartialEq)]
pub enum HourMarker {
    /// Plain numeral text in the configured numeral style.
    Numeral(String),
    /// Custom text with its own overrides on top of the numeral style.
    Text { text: String, style: StyleOverrides },
    /// A dot, styled over `defaults::hour_dot`.
    Dot(StyleOverrides),
    Hidden,
}

impl HourMarker {
    /// The numeral for hour slot `hour`, with slot 0 shown as "12".
    pub fn default_for(hour: usize) -> Self {
        let label = if hour == 0 { 12 } else { hour };
        HourMarker::Numeral(label.to_string())
    }
}

/// Caller supplied per-hour marker override.
#[derive(Clone)]
pub struct HourMarkerRenderer(Arc<dyn Fn(usize) -> HourMarker + Send + Sync>);

impl HourMarkerRenderer {
    pub fn new(render: impl Fn(usize) -> HourMarker + Send + Sync + 'static) -> Self {
        Self(Arc::new(render))
    }

    pub fn render(&self, hour: usize) -> HourMarker {
        (self.0)(hour)
    }
}

impl std::fmt::Debug for HourMarkerRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HourMarkerRenderer(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self`, `degrees` clockwise from 12 o'clock.
    pub fn polar(self, radius: f64, degrees: f64) -> Self {
        let rad = degrees.to_radians();
        Self {
            x: self.x + radius * rad.sin(),
            y: self.y - radius * rad.cos(),
        }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub source: PathBuf,
    pub blur_radius: f64,
}

/// The face plate: rounded box with border, optional background image.
#[derive(Debug, Clone, PartialEq)]
pub struct DialElement {
    pub center: Point,
    pub width: f64,
    pub height: f64,
    /// Border radius clamped to half the shorter side.
    pub corner_radius: f64,
    /// Radius of the circle inside the border that ticks and hands live on.
    pub inner_radius: f64,
    pub style: Style,
    pub background: Option<BackgroundImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickLine {
    pub inner: Point,
    pub outer: Point,
    pub style: Style,
}

/// One of the 60 minute positions; hour positions carry no line.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSlot {
    pub index: usize,
    pub angle: f64,
    pub line: Option<TickLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerContent {
    Text { text: String, style: Style },
    Dot { style: Style },
    Hidden,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumeralSlot {
    pub hour: usize,
    pub angle: f64,
    /// Center of the content, which is drawn upright.
    pub anchor: Point,
    pub content: MarkerContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandKind {
    Hour,
    Minute,
    Second,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandElement {
    pub kind: HandKind,
    pub angle: f64,
    pub pivot: Point,
    pub tip: Point,
    pub style: Style,
}

impl HandElement {
    pub fn length(&self) -> f64 {
        self.style.height
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotElement {
    pub center: Point,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateBadge {
    /// Top-left corner of the badge box.
    pub origin: Point,
    pub label: String,
    pub style: Style,
}

/// Borrowed view of one element, as yielded in paint order.
#[derive(Debug, Clone, Copy)]
pub enum FaceElement<'a> {
    Dial(&'a DialElement),
    Tick(&'a TickLine),
    Marker(&'a NumeralSlot),
    Hand(&'a HandElement),
    Pivot(&'a PivotElement),
    DateBadge(&'a DateBadge),
}

impl FaceElement<'_> {
    pub fn z_index(&self) -> i32 {
        match self {
            FaceElement::Dial(dial) => dial.style.z_index,
            FaceElement::Tick(tick) => tick.style.z_index,
            FaceElement::Marker(slot) => match &slot.content {
                MarkerContent::Text { style, .. } | MarkerContent::Dot { style } => style.z_index,
                MarkerContent::Hidden => 0,
            },
            FaceElement::Hand(hand) => hand.style.z_index,
            FaceElement::Pivot(pivot) => pivot.style.z_index,
            FaceElement::DateBadge(badge) => badge.style.z_index,
        }
    }
}

/// A fully laid out clock face.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockFace {
    pub container: Style,
    pub dial: DialElement,
    pub ticks: Vec<TickSlot>,
    pub numerals: Vec<NumeralSlot>,
    /// Hour, minute, second.
    pub hands: [HandElement; 3],
    pub pivot: PivotElement,
    pub date_badge: Option<DateBadge>,
}

impl ClockFace {
    pub fn rendered_ticks(&self) -> impl Iterator<Item = &TickLine> {
        self.ticks.iter().filter_map(|slot| slot.line.as_ref())
    }

    pub fn hand(&self, kind: HandKind) -> &HandElement {
        match kind {
            HandKind::Hour => &self.hands[0],
            HandKind::Minute => &self.hands[1],
            HandKind::Second => &self.hands[2],
        }
    }

    /// Every visible element, stable-sorted by z index.
    pub fn elements(&self) -> Vec<FaceElement<'_>> {
        let mut elements = Vec::with_capacity(1 + TICK_SLOTS + NUMERAL_SLOTS + 5);
        elements.push(FaceElement::Dial(&self.dial));
        elements.extend(self.rendered_ticks().map(FaceElement::Tick));
        elements.extend(
            self.numerals
                .iter()
                .filter(|slot| slot.content != MarkerContent::Hidden)
                .map(FaceElement::Marker),
        );
        elements.extend(self.hands.iter().map(FaceElement::Hand));
        elements.push(FaceElement::Pivot(&self.pivot));
        if let Some(badge) = &self.date_badge {
            elements.push(FaceElement::DateBadge(badge));
        }
        elements.sort_by_key(|element| element.z_index());
        elements
    }
}

/// Stateless layout of the dial for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct FaceRenderer<'a> {
    config: &'a ClockConfig,
}

impl<'a> FaceRenderer<'a> {
    pub fn new(config: &'a ClockConfig) -> Self {
        Self { config }
    }

    pub fn render(&self, angles: &AngleSet) -> ClockFace {
        let config = self.config;
        let dial = self.dial();

        let hands = [
            self.hand(&dial, HandKind::Hour, angles.hour),
            self.hand(&dial, HandKind::Minute, angles.minute),
            self.hand(&dial, HandKind::Second, angles.second),
        ];

        let mut pivot_style = defaults::center_pivot().with_overrides(&config.center_pivot_style);
        let top_hand = hands.iter().map(|h| h.style.z_index).max().unwrap_or(0);
        if pivot_style.z_index <= top_hand {
            // A hand at i32::MAX ties; the pivot is pushed after the hands.
            pivot_style.z_index = top_hand.saturating_add(1);
        }

        ClockFace {
            container: defaults::container(dial.width).with_overrides(&config.container_style),
            ticks: self.ticks(&dial),
            numerals: self.numerals(&dial),
            hands,
            pivot: PivotElement {
                center: dial.center,
                style: pivot_style,
            },
            date_badge: self.date_badge(&dial),
            dial,
        }
    }

    /// The face plate alone, without laying out the rest of the face.
    pub fn dial(&self) -> DialElement {
        let style = defaults::face().with_overrides(&self.config.face_style);
        let (width, height) = (style.width, style.height);
        let half_short = width.min(height) / 2.0;
        DialElement {
            center: Point::new(width / 2.0, height / 2.0),
            width,
            height,
            corner_radius: style.border_radius.clamp(0.0, half_short),
            inner_radius: (half_short - style.border_width).max(0.0),
            style,
            background: self
                .config
                .background_image
                .as_ref()
                .map(|source| BackgroundImage {
                    source: source.clone(),
                    blur_radius: self.config.blur_radius.max(0.0),
                }),
        }
    }

    fn ticks(&self, dial: &DialElement) -> Vec<TickSlot> {
        let style = defaults::tick_line().with_overrides(&self.config.tick_line_style);
        let outer_radius = dial.inner_radius - style.inset;
        let inner_radius = (outer_radius - style.height).max(0.0);

        (0..TICK_SLOTS)
            .map(|index| {
                let angle = index as f64 * 6.0;
                // Every fifth slot belongs to an hour marker.
                let line = (index % 5 != 0).then(|| TickLine {
                    inner: dial.center.polar(inner_radius, angle),
                    outer: dial.center.polar(outer_radius, angle),
                    style,
                });
                TickSlot { index, angle, line }
            })
            .collect()
    }

    fn numerals(&self, dial: &DialElement) -> Vec<NumeralSlot> {
        let config = self.config;
        let ring = defaults::hour_markers_container()
            .with_overrides(&config.hour_markers_container_style);
        let numeral_style = defaults::hour_numeral().with_overrides(&config.hour_numeral_style);
        let ring_radius = dial.inner_radius - ring.inset;

        (0..NUMERAL_SLOTS)
            .map(|hour| {
                let angle = hour as f64 * 30.0;
                let marker = match &config.hour_marker_renderer {
                    Some(renderer) => renderer.render(hour),
                    None => HourMarker::default_for(hour),
                };
                let (content, radius) = match marker {
                    HourMarker::Numeral(text) => (
                        MarkerContent::Text {
                            text,
                            style: numeral_style,
                        },
                        ring_radius - numeral_style.font_size * 0.75,
                    ),
                    HourMarker::Text { text, style } => {
                        let style = numeral_style.with_overrides(&style);
                        (
                            MarkerContent::Text { text, style },
                            ring_radius - style.font_size * 0.75,
                        )
                    }
                    HourMarker::Dot(overrides) => {
                        let style = defaults::hour_dot().with_overrides(&overrides);
                        (
                            MarkerContent::Dot { style },
                            ring_radius - style.inset - style.height / 2.0,
                        )
                    }
                    HourMarker::Hidden => (MarkerContent::Hidden, ring_radius),
                };
                NumeralSlot {
                    hour,
                    angle,
                    anchor: dial.center.polar(radius.max(0.0), angle),
                    content,
                }
            })
            .collect()
    }

    fn hand(&self, dial: &DialElement, kind: HandKind, angle: f64) -> HandElement {
        let config = self.config;
        let style = match kind {
            HandKind::Hour => defaults::hour_hand(dial.height).with_overrides(&config.hour_hand_style),
            HandKind::Minute => {
                defaults::minute_hand(dial.height).with_overrides(&config.minute_hand_style)
            }
            HandKind::Second => {
                defaults::second_hand(dial.height).with_overrides(&config.second_hand_style)
            }
        };
        HandElement {
            kind,
            angle,
            pivot: dial.center,
            tip: dial.center.polar(style.height, angle),
            style,
        }
    }

    fn date_badge(&self, dial: &DialElement) -> Option<DateBadge> {
        let config = self.config;
        if !config.show_date_badge {
            return None;
        }
        Some(DateBadge {
            origin: Point::new(dial.width * 0.22, dial.width * 0.07),
            label: config.date_label.clone(),
            style: defaults::date_badge(dial.width).with_overrides(&config.date_badge_style),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::Instant;
    use crate::config::{Color, DEFAULT_FACE_SIZE};
    use chrono::NaiveDate;

    const EPS: f64 = 1e-9;

    fn at(h: u32, m: u32, s: u32) -> Instant {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn face(config: &ClockConfig, instant: Instant) -> ClockFace {
        FaceRenderer::new(config).render(&AngleSet::from_instant(&instant))
    }

    fn default_face() -> ClockFace {
        face(&ClockConfig::builder().build(), at(10, 10, 30))
    }

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-6
    }

    // ── slots ─────────────────────────────────────────────────────────────

    #[test]
    fn sixty_slots_forty_eight_lines() {
        let face = default_face();
        assert_eq!(face.ticks.len(), TICK_SLOTS);
        assert_eq!(face.rendered_ticks().count(), 48);
        for slot in &face.ticks {
            assert_eq!(slot.line.is_some(), slot.index % 5 != 0, "slot {}", slot.index);
            assert!((slot.angle - slot.index as f64 * 6.0).abs() < EPS);
        }
    }

    #[test]
    fn twelve_numerals_on_one_ring() {
        let face = default_face();
        assert_eq!(face.numerals.len(), NUMERAL_SLOTS);
        let center = face.dial.center;
        // 92 inner radius, 18 px numerals pulled in by 0.75 of their size.
        let ring = 92.0 - 18.0 * 0.75;
        for slot in &face.numerals {
            assert!((slot.angle - slot.hour as f64 * 30.0).abs() < EPS);
            assert!(close(slot.anchor, center.polar(ring, slot.angle)), "hour {}", slot.hour);
        }
    }

    #[test]
    fn numeral_text_defaults_with_twelve_on_top() {
        let face = default_face();
        let texts: Vec<_> = face
            .numerals
            .iter()
            .map(|slot| match &slot.content {
                MarkerContent::Text { text, .. } => text.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(texts[0], "12");
        assert_eq!(texts[1], "1");
        assert_eq!(texts[11], "11");
    }

    #[test]
    fn twelve_sits_above_center_three_to_the_right() {
        let face = default_face();
        let center = face.dial.center;
        let twelve = face.numerals[0].anchor;
        let three = face.numerals[3].anchor;
        assert!((twelve.x - center.x).abs() < 1e-6 && twelve.y < center.y);
        assert!((three.y - center.y).abs() < 1e-6 && three.x > center.x);
    }

    #[test]
    fn renderer_override_replaces_numerals() {
        let config = ClockConfig::builder()
            .hour_marker_renderer(HourMarkerRenderer::new(|hour| match hour % 3 {
                0 => HourMarker::default_for(hour),
                1 => HourMarker::Dot(StyleOverrides::new().background(Color::RED)),
                _ => HourMarker::Hidden,
            }))
            .build();
        let face = face(&config, at(0, 0, 0));
        assert!(matches!(face.numerals[0].content, MarkerContent::Text { ref text, .. } if text == "12"));
        match &face.numerals[1].content {
            MarkerContent::Dot { style } => {
                assert_eq!(style.background, Color::RED);
                assert_eq!(style.width, 6.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(face.numerals[2].content, MarkerContent::Hidden);
        // Hidden markers are not painted.
        let markers = face
            .elements()
            .iter()
            .filter(|e| matches!(e, FaceElement::Marker(_)))
            .count();
        assert_eq!(markers, 8);
    }

    #[test]
    fn numeral_style_override_merges() {
        let config = ClockConfig::builder()
            .hour_numeral_style(StyleOverrides::new().font_size(24.0))
            .build();
        let face = face(&config, at(0, 0, 0));
        match &face.numerals[5].content {
            MarkerContent::Text { style, .. } => {
                assert_eq!(style.font_size, 24.0);
                assert_eq!(style.text_color, Color::RED);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // ── hands ─────────────────────────────────────────────────────────────

    #[test]
    fn hands_follow_angles() {
        let face = face(&ClockConfig::builder().build(), at(3, 0, 0));
        let center = face.dial.center;
        let hour = face.hand(HandKind::Hour);
        assert!((hour.angle - 90.0).abs() < EPS);
        assert!(close(hour.tip, Point::new(center.x + hour.length(), center.y)));
        let minute = face.hand(HandKind::Minute);
        assert!(close(minute.tip, Point::new(center.x, center.y - minute.length())));
    }

    #[test]
    fn hands_share_the_dial_center() {
        let face = default_face();
        for hand in &face.hands {
            assert_eq!(hand.pivot, face.dial.center);
            assert!((hand.pivot.distance(hand.tip) - hand.length()).abs() < 1e-6);
        }
    }

    #[test]
    fn hour_hand_shortest_second_longest() {
        let face = default_face();
        let (h, m, s) = (
            face.hand(HandKind::Hour).length(),
            face.hand(HandKind::Minute).length(),
            face.hand(HandKind::Second).length(),
        );
        assert!(h < m && m < s);
    }

    #[test]
    fn hand_override_wins() {
        let config = ClockConfig::builder()
            .second_hand_style(StyleOverrides::new().height(20.0).background(Color::BLACK))
            .build();
        let face = face(&config, at(0, 0, 15));
        let second = face.hand(HandKind::Second);
        assert_eq!(second.length(), 20.0);
        assert_eq!(second.style.background, Color::BLACK);
        assert_eq!(second.style.width, 4.0);
    }

    // ── pivot & stacking ──────────────────────────────────────────────────

    #[test]
    fn pivot_is_painted_after_hands() {
        let face = default_face();
        let order = face.elements();
        let pivot = order
            .iter()
            .position(|e| matches!(e, FaceElement::Pivot(_)))
            .unwrap();
        let last_hand = order
            .iter()
            .rposition(|e| matches!(e, FaceElement::Hand(_)))
            .unwrap();
        assert!(pivot > last_hand);
    }

    #[test]
    fn pivot_stays_above_raised_hands() {
        let config = ClockConfig::builder()
            .minute_hand_style(StyleOverrides::new().z_index(40))
            .center_pivot_style(StyleOverrides::new().z_index(0))
            .build();
        let face = face(&config, at(0, 0, 0));
        assert_eq!(face.pivot.style.z_index, 41);
        assert!(matches!(face.elements().last(), Some(FaceElement::Pivot(_))));
    }

    #[test]
    fn pivot_ties_hand_at_max_z() {
        let config = ClockConfig::builder()
            .hour_hand_style(StyleOverrides::new().z_index(i32::MAX))
            .build();
        let face = face(&config, at(0, 0, 0));
        assert_eq!(face.pivot.style.z_index, i32::MAX);
        assert!(matches!(face.elements().last(), Some(FaceElement::Pivot(_))));
    }

    #[test]
    fn default_face_element_count() {
        // dial + 48 ticks + 12 numerals + 3 hands + pivot
        assert_eq!(default_face().elements().len(), 65);
    }

    // ── sizing & badge ────────────────────────────────────────────────────

    #[test]
    fn falls_back_to_default_size() {
        let face = default_face();
        assert_eq!(face.dial.width, DEFAULT_FACE_SIZE);
        assert_eq!(face.dial.corner_radius, DEFAULT_FACE_SIZE / 2.0);
        assert_eq!(face.dial.inner_radius, 92.0);
        assert_eq!(face.container.width, DEFAULT_FACE_SIZE);
        assert!(face.date_badge.is_none());
    }

    #[test]
    fn badge_scales_with_face_width() {
        let config = ClockConfig::builder()
            .show_date_badge(true)
            .date_label("Sat, 9")
            .face_style(StyleOverrides::new().width(400.0).height(400.0))
            .build();
        let face = face(&config, at(0, 0, 0));
        let badge = face.date_badge.expect("badge enabled");
        assert_eq!(badge.label, "Sat, 9");
        assert!((badge.origin.x - 88.0).abs() < EPS);
        assert!((badge.origin.y - 28.0).abs() < EPS);
        assert!((badge.style.font_size - 28.0).abs() < EPS);
    }

    #[test]
    fn badge_label_ignores_instant() {
        let config = ClockConfig::builder()
            .show_date_badge(true)
            .date_label("Mon, 4")
            .build();
        let a = face(&config, at(1, 0, 0)).date_badge.unwrap();
        let b = face(&config, at(23, 0, 0)).date_badge.unwrap();
        assert_eq!(a.label, b.label);
    }

    #[test]
    fn ticks_sit_inside_the_border() {
        let face = default_face();
        let center = face.dial.center;
        for tick in face.rendered_ticks() {
            assert!((center.distance(tick.outer) - 89.0).abs() < 1e-6);
            assert!((center.distance(tick.inner) - 84.0).abs() < 1e-6);
        }
    }

    #[test]
    fn background_carries_blur() {
        let config = ClockConfig::builder()
            .background_image(PathBuf::from("dial.png"))
            .blur_radius(4.0)
            .build();
        let face = face(&config, at(0, 0, 0));
        let bg = face.dial.background.expect("background set");
        assert_eq!(bg.source, PathBuf::from("dial.png"));
        assert_eq!(bg.blur_radius, 4.0);
    }

    #[test]
    fn same_inputs_same_face() {
        let config = ClockConfig::builder().build();
        assert_eq!(face(&config, at(7, 8, 9)), face(&config, at(7, 8, 9)));
    }
}
