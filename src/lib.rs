// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

pub mod angles;
pub mod config;
pub mod face;
pub mod logging;
pub mod raster;
pub mod time_source;

// External crate imports
use bon::Builder;
use pixels::{Pixels, SurfaceTexture};
use rusttype::{Font, Scale};
use thiserror::Error;

// Standard library imports
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

// Window management imports
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub use angles::{AngleSet, Instant};
pub use config::{defaults, Color, Style, StyleOverrides, DEFAULT_FACE_SIZE};
pub use face::{
    BackgroundImage, ClockFace, FaceElement, FaceRenderer, HandKind, HourMarker,
    HourMarkerRenderer, MarkerContent, Point, NUMERAL_SLOTS, TICK_SLOTS,
};
pub use logging::{init_logging, LoggingConfig};
pub use raster::{Canvas, RoundedBox};
pub use time_source::{
    Cadence, ManualScheduler, Scheduler, ThreadScheduler, TickCallback, TimeSource, TimerGuard,
};

// ============================================================================
// PUBLIC API - MAIN INTERFACE
// ============================================================================

/// Command enum for runtime clock updates
#[derive(Debug, Clone, PartialEq)]
pub enum ClockCommand {
    SetPaused(bool),
    TogglePause,
    SetTickInterval(u64),
    SetStep(i64),
    SetInstant(Instant),
    SetDateLabel(String),
    ShowDateBadge(bool),
}

impl ClockCommand {
    /// Applies the command to a mounted clock, re-evaluating the timer
    /// lifecycle when the cadence changes.
    pub fn apply<S: Scheduler>(self, config: &mut ClockConfig, source: &mut TimeSource<S>) {
        log::debug!("applying {self:?}");
        let retimes = match self {
            ClockCommand::SetPaused(paused) => {
                config.paused = paused;
                true
            }
            ClockCommand::TogglePause => {
                config.paused = !source.cadence().paused;
                true
            }
            ClockCommand::SetTickInterval(interval_ms) => {
                config.tick_interval_ms = interval_ms;
                true
            }
            ClockCommand::SetStep(step_ms) => {
                config.step_ms = step_ms;
                true
            }
            ClockCommand::SetInstant(instant) => {
                source.set_instant(instant);
                false
            }
            ClockCommand::SetDateLabel(label) => {
                config.date_label = label;
                false
            }
            ClockCommand::ShowDateBadge(show) => {
                config.show_date_badge = show;
                false
            }
        };
        if !retimes {
            return;
        }
        source.reconfigure(config);
    }
}

/// Everything a caller can configure on the clock.
#[derive(Debug, Clone, Builder)]
pub struct ClockConfig {
    // Time source
    /// Fixed starting instant; local time at mount when absent.
    pub initial_instant: Option<Instant>,
    #[builder(default)]
    pub paused: bool,
    /// `false` shows a static face that never advances.
    #[builder(default = true)]
    pub running: bool,
    /// Must be positive.
    #[builder(default = 1000)]
    pub tick_interval_ms: u64,
    #[builder(default = 1000)]
    pub step_ms: i64,

    // Date badge
    #[builder(default)]
    pub show_date_badge: bool,
    #[builder(default, into)]
    pub date_label: String,

    // Hour markers
    pub hour_marker_renderer: Option<HourMarkerRenderer>,

    // Style overrides
    #[builder(default)]
    pub container_style: StyleOverrides,
    #[builder(default)]
    pub face_style: StyleOverrides,
    #[builder(default)]
    pub tick_line_style: StyleOverrides,
    #[builder(default)]
    pub hour_numeral_style: StyleOverrides,
    #[builder(default)]
    pub hour_markers_container_style: StyleOverrides,
    #[builder(default)]
    pub hour_hand_style: StyleOverrides,
    #[builder(default)]
    pub minute_hand_style: StyleOverrides,
    #[builder(default)]
    pub second_hand_style: StyleOverrides,
    #[builder(default)]
    pub center_pivot_style: StyleOverrides,
    #[builder(default)]
    pub date_badge_style: StyleOverrides,

    // Face background
    pub background_image: Option<PathBuf>,
    #[builder(default)]
    pub blur_radius: f64,

    // Window configuration
    #[builder(default = "Analog Clock".to_string(), into)]
    pub title: String,
    #[builder(default = 20)]
    pub window_margin: u32,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
    #[builder(default = Color::WHITE)]
    pub background_color: Color,

    /// TrueType/OpenType bytes for numerals and the date badge.
    pub font_data: Option<Arc<Vec<u8>>>,
}

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("pixel surface failed: {0}")]
    Pixels(#[from] pixels::Error),
    #[error("font data could not be parsed")]
    Font,
    #[error("background image `{}` could not be loaded: {err}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        err: image::ImageError,
    },
}

/// Decoded assets shared by every frame.
#[derive(Default)]
pub struct PaintResources {
    pub font: Option<Font<'static>>,
    pub background: Option<image::RgbaImage>,
}

/// Main clock struct - the primary public interface
#[derive(Debug, Clone)]
pub struct AnalogClock {
    config: ClockConfig,
}

impl AnalogClock {
    pub fn new(config: ClockConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Lays out the face for `instant` without touching any timer.
    pub fn face_at(&self, instant: &Instant) -> ClockFace {
        FaceRenderer::new(&self.config).render(&AngleSet::from_instant(instant))
    }

    /// Logical window size: the face plus a margin on every side.
    pub fn window_size(&self) -> (u32, u32) {
        let face = defaults::face().with_overrides(&self.config.face_style);
        let margin = 2 * self.config.window_margin;
        (
            face.width.ceil().max(1.0) as u32 + margin,
            face.height.ceil().max(1.0) as u32 + margin,
        )
    }

    /// Parses the font and decodes the background image.
    ///
    /// A bad font is an error; a background that fails to load is logged and
    /// the face is drawn without it.
    pub fn load_resources(&self) -> Result<PaintResources, ClockError> {
        let font = match &self.config.font_data {
            Some(data) => Some(Font::try_from_vec(data.to_vec()).ok_or(ClockError::Font)?),
            None => {
                log::warn!("no font configured; numerals and date badge text are skipped");
                None
            }
        };

        let dial = FaceRenderer::new(&self.config).dial();
        let background = match &dial.background {
            Some(descriptor) => match load_background(descriptor, dial.width, dial.height) {
                Ok(image) => Some(image),
                Err(err) => {
                    log::warn!("{err}");
                    None
                }
            },
            None => None,
        };

        Ok(PaintResources { font, background })
    }

    /// Paints `face` centered on `canvas`.
    pub fn paint(&self, face: &ClockFace, canvas: &mut Canvas, resources: &PaintResources) {
        let origin = (
            (canvas.width as f64 - face.dial.width) / 2.0,
            (canvas.height as f64 - face.dial.height) / 2.0,
        );
        Scene::from_face(face, origin, self.config.background_color, resources)
            .render(canvas, resources);
    }

    pub fn show(&self) -> Result<(), ClockError> {
        self.run_window(None)
    }

    pub fn show_with_commands(&self, receiver: Receiver<ClockCommand>) -> Result<(), ClockError> {
        self.run_window(Some(receiver))
    }

    fn run_window(&self, receiver: Option<Receiver<ClockCommand>>) -> Result<(), ClockError> {
        let resources = self.load_resources()?;
        let (logical_width, logical_height) = self.window_size();
        let mut config = self.config.clone();

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(
                logical_width as f64,
                logical_height as f64,
            ))
            .with_resizable(false)
            .build(&event_loop)?;

        let window = Arc::new(window);
        let window_clone = window.clone();
        let size = window.inner_size();
        // The buffer stays in logical pixels; pixels scales it to the surface.
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(logical_width, logical_height, surface_texture)?;

        let mut source = TimeSource::mount(&config, ThreadScheduler);
        let frame_duration = Duration::from_secs_f64(1.0 / config.max_framerate.max(1.0));
        let mut last_frame = std::time::Instant::now();

        event_loop.run(move |event, window_target| {
            window_target.set_control_flow(ControlFlow::WaitUntil(last_frame + frame_duration));
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => {
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                            log::warn!("surface resize failed: {err}");
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        if let Some(ref receiver) = receiver {
                            while let Ok(command) = receiver.try_recv() {
                                command.apply(&mut config, &mut source);
                            }
                        }
                        source.pump();

                        let face = FaceRenderer::new(&config).render(&source.angles());
                        let origin = (
                            config.window_margin as f64,
                            config.window_margin as f64,
                        );
                        let mut canvas = Canvas::new(
                            pixels.frame_mut(),
                            logical_width as usize,
                            logical_height as usize,
                        );
                        Scene::from_face(&face, origin, config.background_color, &resources)
                            .render(&mut canvas, &resources);
                        if let Err(err) = pixels.render() {
                            log::error!("render failed: {err}");
                            window_target.exit();
                        }
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    if last_frame.elapsed() >= frame_duration {
                        window_clone.request_redraw();
                        last_frame = std::time::Instant::now();
                    }
                }
                Event::LoopExiting => {
                    log::debug!("clock window closing at {}", source.instant());
                }
                _ => {}
            }
        })?;

        Ok(())
    }
}

/// Decodes the dial background and fits it to `width` x `height`.
fn load_background(
    descriptor: &BackgroundImage,
    width: f64,
    height: f64,
) -> Result<image::RgbaImage, ClockError> {
    let decoded = image::open(&descriptor.source).map_err(|err| ClockError::Image {
        path: descriptor.source.clone(),
        err,
    })?;
    let fitted = decoded
        .resize_to_fill(
            width.ceil().max(1.0) as u32,
            height.ceil().max(1.0) as u32,
            image::imageops::FilterType::Triangle,
        )
        .to_rgba8();
    if descriptor.blur_radius > 0.0 {
        Ok(image::imageops::blur(&fitted, descriptor.blur_radius as f32))
    } else {
        Ok(fitted)
    }
}

// ============================================================================
// RETAINED MODE ABSTRACTIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum DrawCommand {
    Clear(Color),
    Box {
        shape: RoundedBox,
        fill: Color,
        border_color: Color,
        border_width: f64,
    },
    Background {
        x: i32,
        y: i32,
        clip: RoundedBox,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        thickness: f32,
        color: Color,
    },
    Text {
        at: (f64, f64),
        text: String,
        font_size: f32,
        color: Color,
    },
}

struct Scene {
    commands: Vec<DrawCommand>,
}

impl Scene {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    fn add_command(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    /// Builds draw commands for `face` placed with its top-left at `origin`.
    fn from_face(
        face: &ClockFace,
        origin: (f64, f64),
        clear: Color,
        resources: &PaintResources,
    ) -> Self {
        let (ox, oy) = origin;
        let at = |p: Point| (ox + p.x, oy + p.y);
        let mut scene = Scene::new();
        scene.add_command(DrawCommand::Clear(clear));

        let container = &face.container;
        scene.add_command(DrawCommand::Box {
            shape: RoundedBox {
                x: ox + (face.dial.width - container.width) / 2.0,
                y: oy - container.padding,
                width: container.width,
                height: face.dial.height + 2.0 * container.padding,
                radius: container.border_radius,
            },
            fill: container.background,
            border_color: container.border_color,
            border_width: container.border_width,
        });

        for element in face.elements() {
            match element {
                FaceElement::Dial(dial) => {
                    let plate = RoundedBox {
                        x: ox,
                        y: oy,
                        width: dial.width,
                        height: dial.height,
                        radius: dial.corner_radius,
                    };
                    scene.add_command(DrawCommand::Box {
                        shape: plate,
                        fill: dial.style.background,
                        border_color: Color::TRANSPARENT,
                        border_width: 0.0,
                    });
                    if dial.background.is_some() {
                        scene.add_command(DrawCommand::Background {
                            x: ox.round() as i32,
                            y: oy.round() as i32,
                            clip: plate,
                        });
                    }
                    scene.add_command(DrawCommand::Box {
                        shape: plate,
                        fill: Color::TRANSPARENT,
                        border_color: dial.style.border_color,
                        border_width: dial.style.border_width,
                    });
                }
                FaceElement::Tick(tick) => scene.add_command(DrawCommand::Line {
                    from: at(tick.inner),
                    to: at(tick.outer),
                    thickness: tick.style.width as f32,
                    color: tick.style.background,
                }),
                FaceElement::Marker(slot) => match &slot.content {
                    MarkerContent::Text { text, style } => scene.add_command(DrawCommand::Text {
                        at: at(slot.anchor),
                        text: text.clone(),
                        font_size: style.font_size as f32,
                        color: style.text_color,
                    }),
                    MarkerContent::Dot { style } => {
                        scene.add_command(centered_box(at(slot.anchor), style))
                    }
                    MarkerContent::Hidden => {}
                },
                FaceElement::Hand(hand) => scene.add_command(DrawCommand::Line {
                    from: at(hand.pivot),
                    to: at(hand.tip),
                    thickness: hand.style.width as f32,
                    color: hand.style.background,
                }),
                FaceElement::Pivot(pivot) => {
                    scene.add_command(centered_box(at(pivot.center), &pivot.style))
                }
                FaceElement::DateBadge(badge) => {
                    let style = &badge.style;
                    let (text_w, text_h) = match &resources.font {
                        Some(font) => {
                            let (w, h) = raster::measure_text(
                                &badge.label,
                                font,
                                Scale::uniform(style.font_size as f32),
                            );
                            (w as f64, h as f64)
                        }
                        None => (
                            style.font_size * 0.6 * badge.label.chars().count() as f64,
                            style.font_size,
                        ),
                    };
                    let inner = 2.0 * (style.padding + style.border_width);
                    let (x, y) = at(badge.origin);
                    let shape = RoundedBox {
                        x,
                        y,
                        width: text_w + inner,
                        height: text_h + inner,
                        radius: style.border_radius,
                    };
                    scene.add_command(DrawCommand::Box {
                        shape,
                        fill: style.background,
                        border_color: style.border_color,
                        border_width: style.border_width,
                    });
                    scene.add_command(DrawCommand::Text {
                        at: (x + shape.width / 2.0, y + shape.height / 2.0),
                        text: badge.label.clone(),
                        font_size: style.font_size as f32,
                        color: style.text_color,
                    });
                }
            }
        }
        scene
    }

    fn render(&self, canvas: &mut Canvas, resources: &PaintResources) {
        for command in &self.commands {
            match command {
                DrawCommand::Clear(color) => canvas.clear(*color),
                DrawCommand::Box {
                    shape,
                    fill,
                    border_color,
                    border_width,
                } => raster::draw_rounded_box(canvas, *shape, *fill, *border_color, *border_width),
                DrawCommand::Background { x, y, clip } => {
                    if let Some(image) = &resources.background {
                        raster::blit_clipped(canvas, image, *x, *y, *clip);
                    }
                }
                DrawCommand::Line {
                    from,
                    to,
                    thickness,
                    color,
                } => raster::draw_thick_line_aa(canvas, *from, *to, *thickness, *color),
                DrawCommand::Text {
                    at,
                    text,
                    font_size,
                    color,
                } => {
                    if let Some(font) = &resources.font {
                        raster::draw_text(canvas, *at, text, font, Scale::uniform(*font_size), *color);
                    }
                }
            }
        }
    }
}

fn centered_box((cx, cy): (f64, f64), style: &Style) -> DrawCommand {
    DrawCommand::Box {
        shape: RoundedBox {
            x: cx - style.width / 2.0,
            y: cy - style.height / 2.0,
            width: style.width,
            height: style.height,
            radius: style.border_radius,
        },
        fill: style.background,
        border_color: style.border_color,
        border_width: style.border_width,
    }
}
