use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use analog_clock::{
    init_logging, AnalogClock, ClockCommand, ClockConfig, HourMarker, HourMarkerRenderer, Instant,
    LoggingConfig, StyleOverrides, DEFAULT_FACE_SIZE,
};
use anyhow::{bail, Context};
use chrono::{Local, NaiveDateTime, NaiveTime};
use clap::Parser;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Live analog clock window.
///
/// Commands read from stdin, one per line: `pause`, `resume`, `toggle`,
/// `interval <ms>`, `step <ms>`, `at <time>`, `label <text>`, `date on|off`.
#[derive(Debug, Parser)]
#[command(name = "analog-clock", version)]
struct Args {
    /// Milliseconds between ticks.
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,
    /// Milliseconds the clock advances per tick; negative runs backwards.
    #[arg(long, default_value_t = 1000, allow_hyphen_values = true)]
    step_ms: i64,
    /// Start paused.
    #[arg(long)]
    paused: bool,
    /// Show a static face that never advances.
    #[arg(long)]
    frozen: bool,
    /// Starting time, `HH:MM:SS` (today) or `YYYY-MM-DDTHH:MM:SS`.
    #[arg(long, value_parser = parse_instant)]
    at: Option<Instant>,
    /// Show the date badge.
    #[arg(long)]
    show_date: bool,
    /// Date badge text; defaults to the starting day, e.g. `Sat, 9`.
    #[arg(long)]
    date_label: Option<String>,
    /// TrueType font for numerals; common system fonts are tried otherwise.
    #[arg(long)]
    font: Option<PathBuf>,
    /// Image drawn behind the dial.
    #[arg(long)]
    background: Option<PathBuf>,
    /// Gaussian blur applied to the background image.
    #[arg(long, default_value_t = 0.0)]
    blur: f64,
    /// Face width and height in logical pixels.
    #[arg(long, default_value_t = DEFAULT_FACE_SIZE)]
    size: f64,
    #[arg(long, default_value = "Analog Clock")]
    title: String,
    /// Numerals at 12, 3, 6 and 9 with dots elsewhere.
    #[arg(long)]
    dots: bool,
    /// Log filter, e.g. `analog_clock=debug`; overrides RUST_LOG.
    #[arg(long)]
    log: Option<String>,
    /// Do not read commands from stdin.
    #[arg(long)]
    no_stdin: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..LoggingConfig::default()
    });

    let clock = AnalogClock::new(build_config(&args)?);
    let (tx, rx) = mpsc::channel();
    if !args.no_stdin {
        spawn_stdin_reader(tx).context("failed to start stdin reader")?;
    }
    clock
        .show_with_commands(rx)
        .context("clock window failed")?;
    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<ClockConfig> {
    if !(args.size.is_finite() && args.size > 0.0) {
        bail!("--size must be a positive number, got {}", args.size);
    }

    let font_data = load_font(args.font.as_deref())?;
    let label = args.date_label.clone().unwrap_or_else(|| {
        let start = args.at.unwrap_or_else(|| Local::now().naive_local());
        start.format("%a, %-d").to_string()
    });
    let markers = args.dots.then(|| {
        HourMarkerRenderer::new(|hour| {
            if hour % 3 == 0 {
                HourMarker::default_for(hour)
            } else {
                HourMarker::Dot(StyleOverrides::new())
            }
        })
    });

    Ok(ClockConfig::builder()
        .maybe_initial_instant(args.at)
        .paused(args.paused)
        .running(!args.frozen)
        .tick_interval_ms(args.interval_ms)
        .step_ms(args.step_ms)
        .show_date_badge(args.show_date)
        .date_label(label)
        .maybe_hour_marker_renderer(markers)
        .face_style(StyleOverrides::new().width(args.size).height(args.size))
        .maybe_background_image(args.background.clone())
        .blur_radius(args.blur)
        .title(args.title.clone())
        .maybe_font_data(font_data.map(Arc::new))
        .build())
}

fn load_font(explicit: Option<&Path>) -> anyhow::Result<Option<Vec<u8>>> {
    if let Some(path) = explicit {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        return Ok(Some(data));
    }
    for candidate in FONT_CANDIDATES {
        if let Ok(data) = std::fs::read(candidate) {
            log::debug!("using font {candidate}");
            return Ok(Some(data));
        }
    }
    Ok(None)
}

fn spawn_stdin_reader(tx: Sender<ClockCommand>) -> io::Result<()> {
    thread::Builder::new()
        .name("analog-clock-stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        log::warn!("stdin read failed: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(err) => log::warn!("ignoring `{}`: {err}", line.trim()),
                }
            }
        })?;
    Ok(())
}

fn parse_instant(s: &str) -> Result<Instant, String> {
    let s = s.trim();
    if let Ok(instant) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(instant);
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .map(|time| Local::now().date_naive().and_time(time))
        .map_err(|_| format!("expected HH:MM:SS or YYYY-MM-DDTHH:MM:SS, got `{s}`"))
}

fn parse_command(line: &str) -> Result<ClockCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "pause" => Ok(ClockCommand::SetPaused(true)),
        "resume" => Ok(ClockCommand::SetPaused(false)),
        "toggle" => Ok(ClockCommand::TogglePause),
        "interval" => match rest.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(ClockCommand::SetTickInterval(ms)),
            _ => Err(format!("interval needs a positive millisecond count, got `{rest}`")),
        },
        "step" => rest
            .parse::<i64>()
            .map(ClockCommand::SetStep)
            .map_err(|_| format!("step needs a millisecond count, got `{rest}`")),
        "at" => parse_instant(rest).map(ClockCommand::SetInstant),
        "label" => Ok(ClockCommand::SetDateLabel(rest.to_string())),
        "date" => match rest {
            "on" => Ok(ClockCommand::ShowDateBadge(true)),
            "off" => Ok(ClockCommand::ShowDateBadge(false)),
            _ => Err(format!("date expects on or off, got `{rest}`")),
        },
        _ => Err(format!("unknown command `{word}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    #[test]
    fn parses_full_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(10, 10, 30)
            .unwrap();
        assert_eq!(parse_instant("2024-03-09T10:10:30"), Ok(expected));
    }

    #[test]
    fn parses_time_of_day() {
        let instant = parse_instant("07:05:09").unwrap();
        assert_eq!((instant.hour(), instant.minute(), instant.second()), (7, 5, 9));
    }

    #[test]
    fn rejects_garbage_time() {
        assert!(parse_instant("noon").is_err());
        assert!(parse_instant("25:00:00").is_err());
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("pause"), Ok(ClockCommand::SetPaused(true)));
        assert_eq!(parse_command(" resume "), Ok(ClockCommand::SetPaused(false)));
        assert_eq!(parse_command("toggle"), Ok(ClockCommand::TogglePause));
        assert_eq!(parse_command("interval 250"), Ok(ClockCommand::SetTickInterval(250)));
        assert_eq!(parse_command("step -60000"), Ok(ClockCommand::SetStep(-60_000)));
        assert_eq!(
            parse_command("label Sat, 9"),
            Ok(ClockCommand::SetDateLabel("Sat, 9".into()))
        );
        assert_eq!(parse_command("date on"), Ok(ClockCommand::ShowDateBadge(true)));
        assert_eq!(parse_command("date off"), Ok(ClockCommand::ShowDateBadge(false)));
        assert!(matches!(parse_command("at 12:00:00"), Ok(ClockCommand::SetInstant(_))));
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(parse_command("interval 0").is_err());
        assert!(parse_command("interval soon").is_err());
        assert!(parse_command("step").is_err());
        assert!(parse_command("date maybe").is_err());
        assert!(parse_command("rewind").is_err());
    }

    #[test]
    fn args_map_onto_config() {
        let args = Args::try_parse_from([
            "analog-clock",
            "--at",
            "2024-03-09T10:10:30",
            "--interval-ms",
            "250",
            "--step-ms",
            "-1000",
            "--paused",
            "--show-date",
            "--size",
            "300",
            "--dots",
            "--font",
            "/nonexistent/font.ttf",
        ])
        .unwrap();
        // An explicit font that cannot be read is an error.
        assert!(build_config(&args).is_err());

        let args = Args::try_parse_from([
            "analog-clock",
            "--at",
            "2024-03-09T10:10:30",
            "--interval-ms",
            "250",
            "--step-ms",
            "-1000",
            "--paused",
            "--show-date",
            "--size",
            "300",
            "--dots",
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.step_ms, -1000);
        assert!(config.paused);
        assert!(config.running);
        assert!(config.show_date_badge);
        assert_eq!(config.date_label, "Sat, 9");
        assert_eq!(config.face_style.width, Some(300.0));
        let markers = config.hour_marker_renderer.unwrap();
        assert_eq!(markers.render(3), HourMarker::Numeral("3".into()));
        assert!(matches!(markers.render(4), HourMarker::Dot(_)));
    }

    #[test]
    fn zero_interval_is_rejected_by_the_parser() {
        assert!(Args::try_parse_from(["analog-clock", "--interval-ms", "0"]).is_err());
    }

    #[test]
    fn non_positive_size_is_rejected() {
        let args = Args::try_parse_from(["analog-clock", "--size", "0"]).unwrap();
        assert!(build_config(&args).is_err());
    }
}
