use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};

use super::{Backend, RendererSpec, WindowSpec};
use crate::coords::Point;
use crate::input::BackendEvent;
use crate::paint::Color;

/// One recorded backend call.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BackendCall {
    CreateWindow(WindowSpec),
    DestroyWindow,
    CreateRenderer(RendererSpec),
    DestroyRenderer,
    PollEvents,
    SetFullscreen(bool),
    SetDrawColor(Color),
    Clear,
    DrawPoints(Vec<Point>),
    Present,
    Delay(u64),
}

/// Shared, cloneable record of the calls a [`HeadlessBackend`] received.
///
/// The backend lives on the executor thread; keep a clone of its journal to
/// inspect what happened from elsewhere.
///
/// Unbounded by default. With a capacity only the most recent calls are
/// kept; older ones are counted in [`evicted`](Self::evicted).
#[derive(Debug, Clone, Default)]
pub struct Journal {
    log: Arc<Mutex<CallLog>>,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: VecDeque<BackendCall>,
    capacity: Option<usize>,
    evicted: u64,
}

impl Journal {
    fn lock(&self) -> MutexGuard<'_, CallLog> {
        // A panicking test thread must not hide the journal from the others.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, call: BackendCall) {
        let mut log = self.lock();
        if let Some(capacity) = log.capacity {
            if capacity == 0 {
                log.evicted += 1;
                return;
            }
            while log.calls.len() >= capacity {
                log.calls.pop_front();
                log.evicted += 1;
            }
        }
        log.calls.push_back(call);
    }

    fn set_capacity(&self, capacity: Option<usize>) {
        let mut log = self.lock();
        log.capacity = capacity;
        if let Some(capacity) = capacity {
            while log.calls.len() > capacity {
                log.calls.pop_front();
                log.evicted += 1;
            }
        }
    }

    /// Snapshot of every retained call, oldest first.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.iter().cloned().collect()
    }

    /// Number of retained calls.
    pub fn len(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().calls.is_empty()
    }

    /// Calls dropped to stay within the capacity.
    pub fn evicted(&self) -> u64 {
        self.lock().evicted
    }

    /// Number of retained calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| pred(c)).count()
    }

    /// Retained delays, in order.
    pub fn delays(&self) -> Vec<u64> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, call: &BackendCall) -> bool {
        self.lock().calls.contains(call)
    }
}

/// Window-less backend with a virtual clock.
///
/// Every call is written to a [`Journal`], events can be scripted per frame,
/// and each presented frame advances the clock by a configurable amount of
/// simulated work. `delay` advances the clock instead of sleeping.
///
/// The journal keeps every call unless bounded with
/// [`with_journal_capacity`](Self::with_journal_capacity); bound it for long
/// runs.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    journal: Journal,

    window_failure: Option<String>,
    renderer_failure: Option<String>,
    scripted: BTreeMap<u64, Vec<BackendEvent>>,
    frame_costs: Vec<u64>,
    default_frame_cost: u64,

    clock_ms: u64,
    polls: u64,
    presents: u64,
    window: Option<WindowSpec>,
    renderer: bool,
    fullscreen: bool,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the call journal.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Keeps only the last `capacity` calls in the journal.
    pub fn with_journal_capacity(self, capacity: usize) -> Self {
        self.journal.set_capacity(Some(capacity));
        self
    }

    /// Makes `create_window` fail with `reason`.
    pub fn fail_window_creation(mut self, reason: impl Into<String>) -> Self {
        self.window_failure = Some(reason.into());
        self
    }

    /// Makes `create_renderer` fail with `reason`.
    pub fn fail_renderer_creation(mut self, reason: impl Into<String>) -> Self {
        self.renderer_failure = Some(reason.into());
        self
    }

    /// Delivers `events` on the poll of frame `frame` (zero-based).
    pub fn with_events_at_frame(
        mut self,
        frame: u64,
        events: impl IntoIterator<Item = BackendEvent>,
    ) -> Self {
        self.scripted.entry(frame).or_default().extend(events);
        self
    }

    /// Delivers a quit event during the last of `frames` frames.
    pub fn quit_after(self, frames: u64) -> Self {
        let last = frames.saturating_sub(1);
        self.with_events_at_frame(last, [BackendEvent::Quit])
    }

    /// Simulated work per frame, in milliseconds.
    pub fn with_frame_cost(mut self, ms: u64) -> Self {
        self.default_frame_cost = ms;
        self
    }

    /// Per-frame simulated work; frames past the end use the default cost.
    pub fn with_frame_costs(mut self, costs: impl IntoIterator<Item = u64>) -> Self {
        self.frame_costs = costs.into_iter().collect();
        self
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    fn require_renderer(&self, op: &str) -> Result<()> {
        if !self.renderer {
            bail!("{op} called without a renderer");
        }
        Ok(())
    }
}

impl Backend for HeadlessBackend {
    fn create_window(&mut self, spec: &WindowSpec) -> Result<()> {
        self.journal.push(BackendCall::CreateWindow(spec.clone()));
        if let Some(reason) = &self.window_failure {
            bail!("{reason}");
        }
        if self.window.is_some() {
            bail!("window already exists");
        }
        self.window = Some(spec.clone());
        Ok(())
    }

    fn destroy_window(&mut self) {
        if self.renderer {
            self.destroy_renderer();
        }
        self.journal.push(BackendCall::DestroyWindow);
        self.window = None;
        self.fullscreen = false;
    }

    fn create_renderer(&mut self, spec: &RendererSpec) -> Result<()> {
        self.journal.push(BackendCall::CreateRenderer(*spec));
        if let Some(reason) = &self.renderer_failure {
            bail!("{reason}");
        }
        if self.window.is_none() {
            bail!("renderer requires a window");
        }
        self.renderer = true;
        Ok(())
    }

    fn destroy_renderer(&mut self) {
        self.journal.push(BackendCall::DestroyRenderer);
        self.renderer = false;
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        self.journal.push(BackendCall::PollEvents);
        let events = self.scripted.remove(&self.polls).unwrap_or_default();
        self.polls += 1;
        events
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        self.journal.push(BackendCall::SetFullscreen(fullscreen));
        if self.window.is_none() {
            bail!("fullscreen requested without a window");
        }
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn set_draw_color(&mut self, color: Color) {
        self.journal.push(BackendCall::SetDrawColor(color));
    }

    fn clear(&mut self) -> Result<()> {
        self.journal.push(BackendCall::Clear);
        self.require_renderer("clear")
    }

    fn draw_points(&mut self, points: &[Point]) -> Result<()> {
        self.journal.push(BackendCall::DrawPoints(points.to_vec()));
        self.require_renderer("draw_points")
    }

    fn present(&mut self) -> Result<()> {
        self.journal.push(BackendCall::Present);
        self.require_renderer("present")?;

        let cost = self
            .frame_costs
            .get(self.presents as usize)
            .copied()
            .unwrap_or(self.default_frame_cost);
        self.clock_ms += cost;
        self.presents += 1;
        Ok(())
    }

    fn ticks(&self) -> u64 {
        self.clock_ms
    }

    fn delay(&mut self, ms: u64) {
        self.journal.push(BackendCall::Delay(ms));
        self.clock_ms += ms;
    }
}
