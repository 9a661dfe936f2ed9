//! Hierarchical, thread-safe progress tracking.
//!
//! A [`ProgressTracker`] reports progress for one operation and may own
//! nested sub-trackers whose updates bubble up to the parent. Trackers
//! are shared as `Arc` so worker threads and the render path never
//! contend on more than a short-lived mutex.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::io::Write as _;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::Weak;
use std::time::Duration;
use std::time::Instant;

use crate::fmt::format_bytes;
use crate::fmt::format_secs;
use crate::fmt::group_thousands;

/// Number of throughput samples kept in the ring buffer.
const MAX_SAMPLES: usize = 10;
/// Rate-estimation window within the ring buffer.
const RATE_WINDOW: usize = 3;
/// Default minimum time between rendered updates.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// How progress updates are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressMode {
    /// Render an in-place progress bar to stdout.
    #[default]
    Console,
    /// Invoke a user-supplied callback with each report.
    Callback,
    /// Track state without producing output.
    Silent,
}

/// Unit of the tracked quantity, used for throughput labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressUnit {
    /// Discrete items.
    #[default]
    Items,
    /// Bytes.
    Bytes,
    /// Abstract percentage points.
    Percent,
}

impl ProgressUnit {
    const fn throughput_label(self) -> &'static str {
        match self {
            Self::Items => "items/sec",
            Self::Bytes => "bytes/sec",
            Self::Percent => "units/sec",
        }
    }
}

/// Point-in-time snapshot of a tracker, including its sub-operations.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    /// Identifier of the operation, dotted for sub-operations.
    pub operation_id: String,
    /// Completed quantity.
    pub current: u64,
    /// Total quantity.
    pub total: u64,
    /// Completion percentage, 0.0 when `total` is zero.
    pub percentage: f64,
    /// Seconds since the tracker started.
    pub elapsed: f64,
    /// Estimated seconds to completion, when a rate is available.
    pub eta: Option<f64>,
    /// Recent processing rate in units per second.
    pub throughput: Option<f64>,
    /// Label for the throughput value.
    pub throughput_unit: &'static str,
    /// Most recent status message.
    pub message: String,
    /// Reports of registered sub-operations, keyed by sub-id.
    pub sub_operations: BTreeMap<String, ProgressReport>,
}

impl ProgressReport {
    /// Returns `true` once `current` has reached `total`.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.current >= self.total
    }

    /// Quantity still outstanding.
    #[must_use]
    pub const fn remaining_items(&self) -> u64 {
        self.total.saturating_sub(self.current)
    }
}

type ProgressCallback = Box<dyn Fn(&ProgressReport) + Send + Sync>;

struct TrackerState {
    current: u64,
    started: Option<Instant>,
    last_render: Option<Instant>,
    finished: bool,
    message: String,
    samples: VecDeque<(Instant, u64)>,
    last_line_len: usize,
}

/// Thread-safe progress tracker with nested sub-operations.
///
/// `start` and `finish` are idempotent. Intermediate updates are
/// rate-limited by the update interval; start and finish always render.
pub struct ProgressTracker {
    operation_id: String,
    total: u64,
    mode: ProgressMode,
    unit: ProgressUnit,
    update_interval: Duration,
    callback: Option<ProgressCallback>,
    state: Mutex<TrackerState>,
    children: Mutex<Vec<(String, Arc<ProgressTracker>)>>,
    parent: Mutex<Weak<ProgressTracker>>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("operation_id", &self.operation_id)
            .field("total", &self.total)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Configures and builds a [`ProgressTracker`].
pub struct ProgressTrackerBuilder {
    operation_id: String,
    total: u64,
    mode: ProgressMode,
    unit: ProgressUnit,
    update_interval: Duration,
    callback: Option<ProgressCallback>,
}

impl ProgressTrackerBuilder {
    /// Sets the display mode.
    #[must_use]
    pub const fn mode(mut self, mode: ProgressMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the unit used for throughput labels.
    #[must_use]
    pub const fn unit(mut self, unit: ProgressUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the minimum interval between rendered updates.
    #[must_use]
    pub const fn update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Sets the callback invoked for every rendered update and switches
    /// the tracker into callback mode.
    #[must_use]
    pub fn callback(mut self, callback: impl Fn(&ProgressReport) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self.mode = ProgressMode::Callback;
        self
    }

    /// Builds the tracker.
    #[must_use]
    pub fn build(self) -> Arc<ProgressTracker> {
        Arc::new(ProgressTracker {
            operation_id: self.operation_id,
            total: self.total,
            mode: self.mode,
            unit: self.unit,
            update_interval: self.update_interval,
            callback: self.callback,
            state: Mutex::new(TrackerState {
                current: 0,
                started: None,
                last_render: None,
                finished: false,
                message: String::new(),
                samples: VecDeque::with_capacity(MAX_SAMPLES),
                last_line_len: 0,
            }),
            children: Mutex::new(Vec::new()),
            parent: Mutex::new(Weak::new()),
        })
    }
}

impl ProgressTracker {
    /// Starts configuring a tracker for `operation_id` over `total` units.
    #[must_use]
    pub fn builder(operation_id: impl Into<String>, total: u64) -> ProgressTrackerBuilder {
        ProgressTrackerBuilder {
            operation_id: operation_id.into(),
            total,
            mode: ProgressMode::default(),
            unit: ProgressUnit::default(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            callback: None,
        }
    }

    /// Creates a tracker with default interval and unit.
    #[must_use]
    pub fn new(operation_id: impl Into<String>, total: u64, mode: ProgressMode) -> Arc<Self> {
        Self::builder(operation_id, total).mode(mode).build()
    }

    /// Returns the tracker's operation id.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Starts tracking. Calling again has no effect.
    pub fn start(&self) {
        {
            let mut state = self.lock_state();
            if state.started.is_some() {
                return;
            }
            let now = Instant::now();
            state.started = Some(now);
            state.last_render = Some(now);
            state.samples.push_back((now, 0));
        }

        if self.mode == ProgressMode::Console {
            println!("\nStarting: {}", self.operation_id);
            println!("Total items: {}", group_thousands(self.total));
        }
        self.notify();
    }

    /// Advances progress by `delta` units. An empty `message` keeps the
    /// previous one.
    pub fn update(&self, delta: u64, message: &str) {
        self.advance(message, |current, total| (current + delta).min(total));
    }

    /// Moves progress to an absolute position, clamped to `0..=total`.
    pub fn set_current(&self, current: u64, message: &str) {
        self.advance(message, move |_, total| current.min(total));
    }

    fn advance(&self, message: &str, next: impl FnOnce(u64, u64) -> u64) {
        let started = self.lock_state().started.is_some();
        if !started {
            self.start();
        }

        let should_render = {
            let mut state = self.lock_state();
            state.current = next(state.current, self.total);
            if !message.is_empty() {
                state.message = message.to_string();
            }

            let now = Instant::now();
            let current = state.current;
            state.samples.push_back((now, current));
            if state.samples.len() > MAX_SAMPLES {
                state.samples.pop_front();
            }

            let due = state
                .last_render
                .is_none_or(|last| now.duration_since(last) >= self.update_interval);
            if due {
                state.last_render = Some(now);
            }
            due
        };

        if should_render {
            self.notify();
        }
    }

    /// Marks the operation finished and forces a final render. Calling
    /// again has no effect.
    pub fn finish(&self, message: &str) {
        {
            let mut state = self.lock_state();
            if state.finished {
                return;
            }
            state.finished = true;
            state.current = self.total;
            state.message = message.to_string();
        }

        if self.mode == ProgressMode::Console {
            let report = self.report();
            println!();
            println!(
                "\u{2713} {} completed in {}",
                self.operation_id,
                format_secs(report.elapsed)
            );
            if let Some(throughput) = report.throughput {
                if self.unit == ProgressUnit::Bytes {
                    println!("  Average throughput: {}/s", format_bytes(throughput));
                } else {
                    println!(
                        "  Average throughput: {throughput:.1} {}",
                        report.throughput_unit
                    );
                }
            }
        }
        self.notify();
    }

    /// Registers a nested sub-operation named `{parent}.{sub_id}`.
    ///
    /// Sub-trackers are silent by default so the parent owns the console;
    /// their updates still bubble up and appear in the parent's reports.
    #[must_use]
    pub fn add_sub_operation(
        self: &Arc<Self>,
        sub_id: &str,
        total: u64,
        mode: ProgressMode,
    ) -> Arc<Self> {
        let child = Self::builder(format!("{}.{sub_id}", self.operation_id), total)
            .mode(mode)
            .unit(self.unit)
            .update_interval(self.update_interval)
            .build();
        *child.parent.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(self);
        self.children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((sub_id.to_string(), Arc::clone(&child)));
        child
    }

    /// Builds a snapshot of this tracker and its sub-operations.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn report(&self) -> ProgressReport {
        let (current, elapsed, eta, throughput, message) = {
            let state = self.lock_state();
            let elapsed = state
                .started
                .map_or(0.0, |started| started.elapsed().as_secs_f64());
            let window = rate_window(&state.samples);
            let throughput = window.and_then(|(dt, dc)| (dt > 0.0).then(|| dc / dt));
            let eta = if state.current == 0 {
                None
            } else {
                window.and_then(|(dt, dc)| {
                    if dt <= 0.0 || dc <= 0.0 {
                        return None;
                    }
                    let rate = dc / dt;
                    Some(self.total.saturating_sub(state.current) as f64 / rate)
                })
            };
            (state.current, elapsed, eta, throughput, state.message.clone())
        };

        let sub_operations = self
            .children
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(sub_id, child)| (sub_id.clone(), child.report()))
            .collect();

        let percentage = if self.total > 0 {
            current as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };

        ProgressReport {
            operation_id: self.operation_id.clone(),
            current,
            total: self.total,
            percentage,
            elapsed,
            eta,
            throughput,
            throughput_unit: self.unit.throughput_label(),
            message,
            sub_operations,
        }
    }

    fn notify(&self) {
        if let Some(parent) = self
            .parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
        {
            parent.notify();
        }

        match self.mode {
            ProgressMode::Console => self.render_console(&self.report()),
            ProgressMode::Callback => {
                if let Some(callback) = &self.callback {
                    callback(&self.report());
                }
            }
            ProgressMode::Silent => {}
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn render_console(&self, report: &ProgressReport) {
        const BAR_LENGTH: usize = 40;
        let filled = ((BAR_LENGTH as f64 * report.percentage / 100.0) as usize).min(BAR_LENGTH);
        let bar: String = std::iter::repeat_n('\u{2588}', filled)
            .chain(std::iter::repeat_n('\u{2591}', BAR_LENGTH - filled))
            .collect();

        let throughput = report.throughput.map_or_else(String::new, |rate| {
            if self.unit == ProgressUnit::Bytes {
                format!(" | {}/s", format_bytes(rate))
            } else {
                format!(" | {rate:.1} {}", report.throughput_unit)
            }
        });
        let eta = report
            .eta
            .map_or_else(String::new, |eta| format!(" | ETA: {}", format_secs(eta)));
        let message = if report.message.is_empty() {
            String::new()
        } else {
            format!(" | {}", report.message)
        };

        let mut line = format!(
            "\r{}: [{bar}] {:5.1}% ({}/{}){throughput}{eta}{message}",
            self.operation_id,
            report.percentage,
            group_thousands(report.current),
            group_thousands(report.total),
        );

        let mut state = self.lock_state();
        if line.len() < state.last_line_len {
            line.push_str(&" ".repeat(state.last_line_len - line.len()));
        }
        state.last_line_len = line.len();
        drop(state);

        print!("{line}");
        let _ = std::io::stdout().flush();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Time and quantity deltas over the most recent samples.
#[allow(clippy::cast_precision_loss)]
fn rate_window(samples: &VecDeque<(Instant, u64)>) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let start = samples.len().saturating_sub(RATE_WINDOW);
    let (t0, c0) = samples[start];
    let (t1, c1) = samples[samples.len() - 1];
    let dt = t1.duration_since(t0).as_secs_f64();
    let dc = c1 as f64 - c0 as f64;
    Some((dt, dc))
}
