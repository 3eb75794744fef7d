//! Time to hand-rotation conversion.

use chrono::Timelike;

/// Wall-clock point in time displayed by the clock.
pub type Instant = chrono::NaiveDateTime;

/// Rotation of each hand in degrees, clockwise from 12 o'clock, in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSet {
    pub hour: f64,
    pub minute: f64,
    pub second: f64,
}

impl AngleSet {
    /// Derives hand angles from `instant`.
    ///
    /// Seconds carry into the minute hand and minutes carry into the hour
    /// hand, so every hand moves continuously.
    pub fn from_instant(instant: &Instant) -> Self {
        // Leap seconds report nanos >= 1e9; keep the fraction below one second.
        let millis = (instant.nanosecond().min(999_999_999) / 1_000_000) as f64;
        let seconds = instant.second() as f64 + millis / 1000.0;
        let minutes = instant.minute() as f64;
        let hours = (instant.hour() % 12) as f64;

        let second = (seconds / 60.0) * 360.0;
        let minute = (minutes / 60.0) * 360.0 + second / 60.0;
        let hour = (hours / 12.0) * 360.0 + minute / 12.0;

        Self {
            hour,
            minute,
            second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use rand::Rng;

    const EPS: f64 = 1e-9;

    fn at(h: u32, m: u32, s: u32, ms: u32) -> Instant {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_milli_opt(h, m, s, ms)
            .unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    // ── anchors ───────────────────────────────────────────────────────────

    #[test]
    fn midnight_is_all_zero() {
        let a = AngleSet::from_instant(&at(0, 0, 0, 0));
        assert_eq!(a, AngleSet { hour: 0.0, minute: 0.0, second: 0.0 });
    }

    #[test]
    fn three_oclock() {
        let a = AngleSet::from_instant(&at(3, 0, 0, 0));
        assert_close(a.hour, 90.0);
        assert_close(a.minute, 0.0);
        assert_close(a.second, 0.0);
    }

    #[test]
    fn half_past_midnight() {
        let a = AngleSet::from_instant(&at(0, 30, 0, 0));
        assert_close(a.minute, 180.0);
        assert_close(a.hour, 15.0);
    }

    #[test]
    fn afternoon_wraps_to_twelve_hour_dial() {
        assert_eq!(
            AngleSet::from_instant(&at(15, 20, 40, 0)),
            AngleSet::from_instant(&at(3, 20, 40, 0))
        );
    }

    // ── carry ─────────────────────────────────────────────────────────────

    #[test]
    fn seconds_carry_into_minute_hand() {
        let a = AngleSet::from_instant(&at(0, 0, 30, 0));
        assert_close(a.second, 180.0);
        assert_close(a.minute, 3.0);
        assert_close(a.hour, 0.25);
    }

    #[test]
    fn minute_hand_is_continuous_across_rollover() {
        let before = AngleSet::from_instant(&at(10, 14, 59, 999));
        let after = AngleSet::from_instant(&at(10, 15, 0, 0));
        assert!((after.minute - before.minute).abs() < 1e-3);
        assert!((after.hour - before.hour).abs() < 1e-3);
    }

    #[test]
    fn hour_hand_is_continuous_across_hour_rollover() {
        let before = AngleSet::from_instant(&at(11, 59, 59, 999));
        let after = AngleSet::from_instant(&at(12, 0, 0, 0));
        // 360 wraps to 0 at the top of the dial.
        assert!(before.hour > 359.99 && before.hour < 360.0);
        assert_close(after.hour, 0.0);
    }

    #[test]
    fn leap_second_stays_in_range() {
        let leap = at(23, 59, 59, 0).with_nanosecond(1_500_000_000).unwrap();
        let a = AngleSet::from_instant(&leap);
        assert!(a.second < 360.0 && a.minute < 360.0 && a.hour < 360.0);
    }

    // ── randomized invariants ─────────────────────────────────────────────

    #[test]
    fn formulas_hold_for_random_instants() {
        let mut rng = rand::rng();
        for _ in 0..2_000 {
            let (h, m, s, ms) = (
                rng.random_range(0..24),
                rng.random_range(0..60),
                rng.random_range(0..60),
                rng.random_range(0..1000),
            );
            let a = AngleSet::from_instant(&at(h, m, s, ms));
            let secs = s as f64 + ms as f64 / 1000.0;
            let second = secs / 60.0 * 360.0;
            let minute = m as f64 / 60.0 * 360.0 + second / 60.0;
            let hour = (h % 12) as f64 / 12.0 * 360.0 + minute / 12.0;
            assert_close(a.second, second);
            assert_close(a.minute, minute);
            assert_close(a.hour, hour);
            for deg in [a.hour, a.minute, a.second] {
                assert!((0.0..360.0).contains(&deg));
            }
        }
    }
}
