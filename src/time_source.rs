//! Displayed time and its self-advancing schedule.
//!
//! A [`TimeSource`] owns the one authoritative [`Instant`] of a mounted clock.
//! While advancing, a repeating timer acquired from a [`Scheduler`] pushes
//! ticks into a channel; [`TimeSource::pump`] drains that channel and moves the
//! instant forward by one step per tick. The instant is always derived from
//! the previous instant, never from a fresh wall-clock sample.
//!
//! Timers are held as [`TimerGuard`]s. Dropping a guard releases the timer
//! before `drop` returns, and every re-arm tags its ticks with a new
//! generation so a tick queued by a released timer is never applied.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::TimeDelta;

use crate::angles::{AngleSet, Instant};
use crate::ClockConfig;

/// Callback invoked on every firing of a repeating timer.
pub type TickCallback = Box<dyn FnMut() + Send + 'static>;

/// Source of repeating timers.
pub trait Scheduler {
    /// Arms a timer firing `callback` every `interval` until the returned
    /// guard is dropped.
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TimerGuard;
}

/// Scoped ownership of one armed timer.
///
/// Dropping the guard cancels the timer synchronously: no firing starts after
/// `drop` returns.
pub struct TimerGuard {
    cancelled: Arc<AtomicBool>,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
    on_release: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerGuard {
    fn new(cancelled: Arc<AtomicBool>) -> Self {
        Self {
            cancelled,
            stop: None,
            worker: None,
            on_release: None,
        }
    }

    /// Releases the timer now. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        // Disconnecting the stop channel wakes the worker immediately.
        drop(self.stop.take());
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                log::warn!("timer worker panicked before release");
            }
        }
        if let Some(on_release) = self.on_release.take() {
            on_release();
        }
    }
}

impl std::fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGuard")
            .field("cancelled", &self.cancelled.load(Ordering::Acquire))
            .field("threaded", &self.worker.is_some())
            .finish()
    }
}

// ============================================================================
// THREADED SCHEDULER
// ============================================================================

/// Real-time scheduler running one worker thread per armed timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule_repeating(&self, interval: Duration, mut callback: TickCallback) -> TimerGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let flag = cancelled.clone();

        let spawned = thread::Builder::new()
            .name("analog-clock-timer".to_string())
            .spawn(move || {
                // Deadlines accumulate from the arm time so the cadence does not drift.
                let mut deadline = std::time::Instant::now() + interval;
                loop {
                    let wait = deadline.saturating_duration_since(std::time::Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            if flag.load(Ordering::Acquire) {
                                break;
                            }
                            callback();
                            deadline += interval;
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let mut guard = TimerGuard::new(cancelled);
        match spawned {
            Ok(worker) => {
                guard.stop = Some(stop_tx);
                guard.worker = Some(worker);
            }
            Err(err) => log::error!("failed to spawn timer thread: {err}"),
        }
        guard
    }
}

// ============================================================================
// MANUAL SCHEDULER
// ============================================================================

struct ManualTimer {
    interval: Duration,
    next_due: Duration,
    cancelled: Arc<AtomicBool>,
    callback: TickCallback,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    timers: Vec<ManualTimer>,
    armed_total: usize,
}

/// Simulated scheduler whose time only moves through [`ManualScheduler::advance`].
///
/// Clones share the same timeline. Callbacks run on the thread calling
/// `advance` and must not call back into the scheduler.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<ManualState>>,
    released: Arc<AtomicUsize>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves simulated time forward, firing every timer that comes due, in
    /// deadline order.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        let target = state.now + by;
        state.timers.retain(|t| !t.cancelled.load(Ordering::Acquire));

        loop {
            let next = state
                .timers
                .iter_mut()
                .filter(|t| !t.cancelled.load(Ordering::Acquire) && t.next_due <= target)
                .min_by_key(|t| t.next_due);
            let Some(timer) = next else { break };
            let due = timer.next_due;
            timer.next_due += timer.interval;
            (timer.callback)();
            state.now = due;
        }
        state.now = target;
    }

    /// Simulated time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// Timers armed and not yet released.
    pub fn active_timers(&self) -> usize {
        self.lock()
            .timers
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::Acquire))
            .count()
    }

    pub fn armed_total(&self) -> usize {
        self.lock().armed_total
    }

    pub fn released_total(&self) -> usize {
        self.released.load(Ordering::Acquire)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TimerGuard {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        let next_due = state.now + interval;
        state.timers.push(ManualTimer {
            interval,
            next_due,
            cancelled: cancelled.clone(),
            callback,
        });
        state.armed_total += 1;

        let released = self.released.clone();
        let mut guard = TimerGuard::new(cancelled);
        guard.on_release = Some(Box::new(move || {
            released.fetch_add(1, Ordering::AcqRel);
        }));
        guard
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("elapsed", &self.elapsed())
            .field("active_timers", &self.active_timers())
            .finish()
    }
}

// ============================================================================
// TIME SOURCE
// ============================================================================

/// Configuration slice that controls advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub interval: Duration,
    pub step_ms: i64,
    pub paused: bool,
    pub running: bool,
}

impl Cadence {
    /// A non-positive interval is a caller error; release builds clamp it to 1 ms.
    pub fn new(interval_ms: u64, step_ms: i64, paused: bool, running: bool) -> Self {
        debug_assert!(interval_ms > 0, "tick interval must be positive");
        Self {
            interval: Duration::from_millis(interval_ms.max(1)),
            step_ms,
            paused,
            running,
        }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(
            config.tick_interval_ms,
            config.step_ms,
            config.paused,
            config.running,
        )
    }

    pub fn advances(&self) -> bool {
        self.running && !self.paused
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self::new(1000, 1000, false, true)
    }
}

/// Holds the displayed instant and owns its repeating advancement.
pub struct TimeSource<S: Scheduler = ThreadScheduler> {
    instant: Instant,
    seed: Option<Instant>,
    cadence: Cadence,
    scheduler: S,
    timer: Option<TimerGuard>,
    generation: u64,
    tick_tx: Sender<u64>,
    tick_rx: Receiver<u64>,
    saturated: bool,
}

impl<S: Scheduler> TimeSource<S> {
    /// Creates the instant (configured seed, else local now) and arms the
    /// timer if the configuration asks for advancement.
    pub fn mount(config: &ClockConfig, scheduler: S) -> Self {
        let instant = config
            .initial_instant
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let (tick_tx, tick_rx) = mpsc::channel();
        let mut source = Self {
            instant,
            seed: config.initial_instant,
            cadence: Cadence::from_config(config),
            scheduler,
            timer: None,
            generation: 0,
            tick_tx,
            tick_rx,
            saturated: false,
        };
        log::debug!("mounted time source at {instant}");
        source.arm();
        source
    }

    /// The held instant. Ticks delivered by the timer only move it once
    /// [`TimeSource::pump`] runs, so hosts pump before every read.
    pub fn instant(&self) -> Instant {
        self.instant
    }

    /// Angles of the held instant; see [`TimeSource::instant`].
    pub fn angles(&self) -> AngleSet {
        AngleSet::from_instant(&self.instant)
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// True while a timer is armed.
    pub fn is_advancing(&self) -> bool {
        self.timer.is_some()
    }

    /// Applies every tick delivered since the last call and returns how many
    /// moved the instant.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        let mut stale = 0;
        while let Ok(generation) = self.tick_rx.try_recv() {
            if generation != self.generation || self.timer.is_none() {
                stale += 1;
                continue;
            }
            self.step();
            applied += 1;
        }
        if stale > 0 {
            log::debug!("dropped {stale} tick(s) from a released timer");
        }
        if applied > 0 {
            log::trace!("applied {applied} tick(s), now {}", self.instant);
        }
        applied
    }

    /// Re-evaluates the lifecycle against a new configuration.
    ///
    /// A changed cadence, or a changed initial instant, releases the current
    /// timer and arms a fresh one under the new values.
    pub fn reconfigure(&mut self, config: &ClockConfig) {
        let reseed = match config.initial_instant {
            Some(seed) if Some(seed) != self.seed => Some(seed),
            _ => None,
        };
        self.seed = config.initial_instant;

        let cadence = Cadence::from_config(config);
        if let Some(seed) = reseed {
            self.pump();
            self.instant = seed;
            log::debug!("re-seeded time source at {seed}");
            self.cadence = cadence;
            self.rearm();
        } else {
            self.apply_cadence(cadence);
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.apply_cadence(Cadence {
            paused,
            ..self.cadence
        });
    }

    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.cadence.paused);
    }

    pub fn set_interval(&mut self, interval_ms: u64) {
        let interval = Cadence::new(interval_ms, self.cadence.step_ms, false, true).interval;
        self.apply_cadence(Cadence {
            interval,
            ..self.cadence
        });
    }

    pub fn set_step(&mut self, step_ms: i64) {
        self.apply_cadence(Cadence {
            step_ms,
            ..self.cadence
        });
    }

    /// Replaces the held instant; the next tick comes one full interval later.
    pub fn set_instant(&mut self, instant: Instant) {
        self.pump();
        self.instant = instant;
        self.rearm();
    }

    /// Tears the source down, releasing its timer.
    pub fn unmount(mut self) {
        self.release();
        log::debug!("unmounted time source at {}", self.instant);
    }

    fn apply_cadence(&mut self, cadence: Cadence) {
        if cadence == self.cadence {
            return;
        }
        // Ticks that fired under the old cadence still count.
        self.pump();
        self.cadence = cadence;
        self.rearm();
    }

    fn rearm(&mut self) {
        self.release();
        self.arm();
    }

    fn arm(&mut self) {
        if !self.cadence.advances() || self.timer.is_some() {
            return;
        }
        let tx = self.tick_tx.clone();
        let generation = self.generation;
        let callback: TickCallback = Box::new(move || {
            // The receiver is gone once the source is torn down.
            let _ = tx.send(generation);
        });
        self.timer = Some(
            self.scheduler
                .schedule_repeating(self.cadence.interval, callback),
        );
        log::debug!(
            "armed timer gen={generation} interval={:?} step={}ms",
            self.cadence.interval,
            self.cadence.step_ms
        );
    }

    fn release(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.release();
            log::debug!("released timer gen={}", self.generation);
        }
        self.generation = self.generation.wrapping_add(1);
    }

    fn step(&mut self) {
        match self
            .instant
            .checked_add_signed(TimeDelta::milliseconds(self.cadence.step_ms))
        {
            Some(next) => self.instant = next,
            None if !self.saturated => {
                self.saturated = true;
                log::warn!("clock reached the end of the representable range at {}", self.instant);
            }
            None => {}
        }
    }
}

impl<S: Scheduler> Drop for TimeSource<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: Scheduler> std::fmt::Debug for TimeSource<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSource")
            .field("instant", &self.instant)
            .field("cadence", &self.cadence)
            .field("generation", &self.generation)
            .field("advancing", &self.timer.is_some())
            .finish()
    }
}
