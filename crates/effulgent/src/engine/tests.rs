use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use super::*;
use crate::backend::{
    Backend, BackendCall, HeadlessBackend, Journal, RendererSpec, WindowSpec,
};
use crate::coords::Point;
use crate::core::{Canvas, DrawResult, Drawable};
use crate::exec::{BackendExecutor, ExecutorError};
use crate::input::{BackendEvent, Key};
use crate::paint::Color;

type Log = Rc<RefCell<Vec<String>>>;

/// Records every lifecycle call into a shared log.
struct Recorder {
    name: &'static str,
    log: Log,
    points: Vec<Point>,
    color: Color,
    fail_at: Option<(Phase, u64)>,
    frames: u64,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            points: Vec::new(),
            color: Color::WHITE,
            fail_at: None,
            frames: 0,
        }
    }

    fn drawing(mut self, points: Vec<Point>, color: Color) -> Self {
        self.points = points;
        self.color = color;
        self
    }

    fn failing(mut self, phase: Phase, frame: u64) -> Self {
        self.fail_at = Some((phase, frame));
        self
    }

    fn record(&self, phase: Phase) -> DrawResult {
        self.log.borrow_mut().push(format!("{}:{phase}", self.name));
        if self.fail_at == Some((phase, self.frames)) {
            anyhow::bail!("{} gave up", self.name);
        }
        Ok(())
    }
}

impl Drawable for Recorder {
    fn init(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        assert_eq!((canvas.width(), canvas.height()), (320, 200));
        self.record(Phase::Init)
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        self.record(Phase::Draw)?;
        canvas.draw_points(&self.points, self.color);
        Ok(())
    }

    fn update(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        self.record(Phase::Update)?;
        self.frames += 1;
        Ok(())
    }
}

fn executor(backend: HeadlessBackend) -> (Arc<BackendExecutor<HeadlessBackend>>, Journal) {
    let journal = backend.journal();
    let exec = BackendExecutor::spawn("headless", move || Ok(backend)).unwrap();
    (Arc::new(exec), journal)
}

fn config() -> EngineConfig {
    EngineConfig::default().with_title("test").with_size(320, 200)
}

fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

#[test]
fn init_runs_once_per_drawable_before_first_frame() {
    let (exec, _journal) = executor(HeadlessBackend::new().quit_after(2));
    let log = Log::default();
    let mut a = Recorder::new("a", &log);
    let mut b = Recorder::new("b", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    engine.add_drawable(&mut b);
    assert_eq!(engine.run(), 0);

    assert_eq!(
        entries(&log),
        [
            "a:init", "b:init",
            "a:draw", "a:update", "b:draw", "b:update",
            "a:draw", "a:update", "b:draw", "b:update",
        ]
    );
}

#[test]
fn draw_and_update_interleave_per_drawable() {
    let (exec, _journal) = executor(HeadlessBackend::new().quit_after(1));
    let log = Log::default();
    let mut x = Recorder::new("x", &log);
    let mut y = Recorder::new("y", &log);
    let mut z = Recorder::new("z", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut x);
    engine.add_drawable(&mut y);
    engine.add_drawable(&mut z);
    engine.try_run().unwrap();
    drop(engine);

    let frame: Vec<String> = entries(&log).into_iter().skip(3).collect();
    assert_eq!(
        frame,
        ["x:draw", "x:update", "y:draw", "y:update", "z:draw", "z:update"]
    );
    assert_eq!((x.frames, y.frames, z.frames), (1, 1, 1));
}

#[test]
fn window_failure_returns_one_and_touches_nothing_else() {
    let (exec, journal) =
        executor(HeadlessBackend::new().fail_window_creation("no display"));
    let log = Log::default();
    let mut a = Recorder::new("a", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    assert_eq!(engine.run(), 1);
    assert_eq!(engine.state(), EngineState::Destroyed);

    assert!(entries(&log).is_empty());
    assert_eq!(journal.count(|c| matches!(c, BackendCall::CreateRenderer(_))), 0);
    assert!(!journal.contains(&BackendCall::DestroyWindow));
}

#[test]
fn renderer_failure_returns_two_and_destroys_window() {
    let (exec, journal) =
        executor(HeadlessBackend::new().fail_renderer_creation("no adapter"));
    let log = Log::default();
    let mut a = Recorder::new("a", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);

    let err = engine.try_run().unwrap_err();
    assert!(matches!(err, RunError::RendererCreation(_)));
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("no adapter"));

    assert!(entries(&log).is_empty());
    assert_eq!(journal.calls().last(), Some(&BackendCall::DestroyWindow));
    assert_eq!(journal.count(|c| *c == BackendCall::Clear), 0);
}

#[test]
fn window_and_renderer_use_configured_values() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(1));
    let mut engine: FrameLoop<'_, HeadlessBackend> =
        FrameLoop::new(config().with_vsync(false), exec);
    engine.set_width(640);
    engine.set_height(480);
    assert_eq!((engine.width(), engine.height()), (640, 480));
    assert_eq!(engine.run(), 0);

    let calls = journal.calls();
    assert_eq!(
        calls[0],
        BackendCall::CreateWindow(WindowSpec {
            title: "test".to_string(),
            width: 640,
            height: 480,
        })
    );
    assert_eq!(calls[1], BackendCall::CreateRenderer(RendererSpec { vsync: false }));
}

#[test]
fn quit_event_finishes_the_current_frame() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(3));
    let log = Log::default();
    let mut a = Recorder::new("a", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    assert_eq!(engine.run(), 0);
    assert_eq!(engine.frames(), 3);
    drop(engine);

    assert_eq!(a.frames, 3);
    assert_eq!(journal.count(|c| *c == BackendCall::Present), 3);
    assert_eq!(journal.count(|c| *c == BackendCall::PollEvents), 3);

    let calls = journal.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[BackendCall::DestroyRenderer, BackendCall::DestroyWindow]
    );
}

#[test]
fn quit_key_release_stops_after_frame() {
    let backend = HeadlessBackend::new()
        .with_events_at_frame(0, [BackendEvent::KeyUp(Key::A)])
        .with_events_at_frame(1, [BackendEvent::KeyUp(Key::Q)]);
    let (exec, journal) = executor(backend);
    let log = Log::default();
    let mut a = Recorder::new("a", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    assert_eq!(engine.run(), 0);
    drop(engine);

    assert_eq!(a.frames, 2);
    assert_eq!(journal.count(|c| *c == BackendCall::Present), 2);
}

#[test]
fn configured_quit_key_replaces_default() {
    let backend = HeadlessBackend::new()
        .with_events_at_frame(0, [BackendEvent::KeyUp(Key::Q)])
        .with_events_at_frame(2, [BackendEvent::KeyUp(Key::Escape)]);
    let (exec, journal) = executor(backend);

    let mut engine: FrameLoop<'_, HeadlessBackend> =
        FrameLoop::new(config().with_quit_key(Key::Escape), exec);
    assert_eq!(engine.run(), 0);
    assert_eq!(engine.frames(), 3);
    assert_eq!(journal.count(|c| *c == BackendCall::Present), 3);
}

#[test]
fn fullscreen_key_flips_once_per_event_and_keeps_running() {
    let backend = HeadlessBackend::new()
        .with_events_at_frame(0, [BackendEvent::KeyUp(Key::F)])
        .with_events_at_frame(1, [BackendEvent::KeyUp(Key::F), BackendEvent::KeyUp(Key::F)])
        .with_events_at_frame(2, [BackendEvent::KeyUp(Key::F)])
        .quit_after(4);
    let (exec, journal) = executor(backend);

    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(engine.run(), 0);
    assert_eq!(engine.frames(), 4);

    let toggles: Vec<bool> = journal
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::SetFullscreen(on) => Some(on),
            _ => None,
        })
        .collect();
    assert_eq!(toggles, [true, false, true, false]);
}

#[test]
fn fast_frames_sleep_exactly_the_remainder() {
    let (exec, journal) = executor(HeadlessBackend::new().with_frame_cost(4).quit_after(3));
    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(engine.run(), 0);

    assert_eq!(journal.delays(), [7, 7, 7]);
}

#[test]
fn slow_frames_never_sleep() {
    let (exec, journal) = executor(HeadlessBackend::new().with_frame_cost(20).quit_after(3));
    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(engine.run(), 0);

    assert!(journal.delays().is_empty());
}

#[test]
fn pacing_measures_each_frame_from_the_end_of_the_last_sleep() {
    let backend = HeadlessBackend::new()
        .with_frame_costs([4, 20, 11, 0])
        .quit_after(4);
    let (exec, journal) = executor(backend);
    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(engine.run(), 0);

    assert_eq!(journal.delays(), [7, 11]);
}

#[test]
fn uncapped_frame_rate_never_sleeps() {
    let (exec, journal) = executor(HeadlessBackend::new().with_frame_cost(1).quit_after(5));
    let mut engine: FrameLoop<'_, HeadlessBackend> =
        FrameLoop::new(config().with_frame_rate(0), exec);
    assert_eq!(engine.run(), 0);

    assert!(journal.delays().is_empty());
}

#[test]
fn empty_point_set_issues_no_backend_call() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(2));
    let log = Log::default();
    let mut a = Recorder::new("a", &log).drawing(Vec::new(), Color::rgb(255, 0, 0));

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    assert_eq!(engine.run(), 0);

    assert_eq!(journal.count(|c| matches!(c, BackendCall::DrawPoints(_))), 0);
    assert_eq!(
        journal.count(|c| matches!(c, BackendCall::SetDrawColor(col) if *col != Color::BLACK)),
        0
    );
}

#[test]
fn points_are_drawn_between_clear_and_present() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(1));
    let log = Log::default();
    let points = vec![Point::new(1, 2), Point::new(3, 4)];
    let red = Color::rgb(255, 0, 0);
    let mut a = Recorder::new("a", &log).drawing(points.clone(), red);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    assert_eq!(engine.run(), 0);

    let calls = journal.calls();
    let frame_start = calls
        .iter()
        .position(|c| *c == BackendCall::PollEvents)
        .unwrap();
    assert_eq!(
        &calls[frame_start..frame_start + 6],
        &[
            BackendCall::PollEvents,
            BackendCall::SetDrawColor(Color::BLACK),
            BackendCall::Clear,
            BackendCall::SetDrawColor(red),
            BackendCall::DrawPoints(points),
            BackendCall::Present,
        ]
    );
}

#[test]
fn drawable_error_terminates_and_releases_resources() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(10));
    let log = Log::default();
    let mut a = Recorder::new("a", &log);
    let mut b = Recorder::new("b", &log).failing(Phase::Draw, 1);
    let mut c = Recorder::new("c", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    engine.add_drawable(&mut b);
    engine.add_drawable(&mut c);

    let err = engine.try_run().unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(matches!(
        err,
        RunError::Drawable { index: 1, phase: Phase::Draw, .. }
    ));
    assert_eq!(engine.state(), EngineState::Destroyed);
    assert_eq!(engine.frames(), 1);
    drop(engine);

    let tail: Vec<String> = entries(&log).into_iter().skip(9).collect();
    assert_eq!(tail, ["a:draw", "a:update", "b:draw"]);

    assert_eq!(journal.count(|c| *c == BackendCall::Present), 1);
    let calls = journal.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[BackendCall::DestroyRenderer, BackendCall::DestroyWindow]
    );
}

#[test]
fn init_error_stops_before_first_frame() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(10));
    let log = Log::default();
    let mut a = Recorder::new("a", &log).failing(Phase::Init, 0);
    let mut b = Recorder::new("b", &log);

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);
    engine.add_drawable(&mut b);
    assert_eq!(engine.run(), 3);

    assert_eq!(entries(&log), ["a:init"]);
    assert_eq!(journal.count(|c| *c == BackendCall::PollEvents), 0);
    assert!(journal.contains(&BackendCall::DestroyWindow));
}

/// Cancels the run from inside the loop after a number of updates.
struct Canceller {
    token: CancelToken,
    after: u64,
    updates: u64,
}

impl Drawable for Canceller {
    fn draw(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        Ok(())
    }

    fn update(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        self.updates += 1;
        if self.updates == self.after {
            self.token.cancel();
        }
        Ok(())
    }
}

#[test]
fn cancel_token_ends_run_after_current_frame() {
    let (exec, journal) = executor(HeadlessBackend::new());
    let token = CancelToken::new();
    let mut canceller = Canceller {
        token: token.clone(),
        after: 2,
        updates: 0,
    };

    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut canceller);
    engine.run_until(&token).unwrap();
    assert_eq!(engine.frames(), 2);
    drop(engine);

    assert_eq!(canceller.updates, 2);
    assert_eq!(journal.count(|c| *c == BackendCall::Present), 2);
    assert!(journal.contains(&BackendCall::DestroyWindow));
}

#[test]
fn token_cancelled_up_front_renders_no_frame() {
    let (exec, journal) = executor(HeadlessBackend::new());
    let token = CancelToken::new();
    token.cancel();

    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    engine.run_until(&token).unwrap();

    assert_eq!(engine.frames(), 0);
    assert_eq!(journal.count(|c| *c == BackendCall::PollEvents), 0);
    assert!(journal.contains(&BackendCall::DestroyRenderer));
}

#[test]
fn second_run_is_rejected_without_backend_calls() {
    let (exec, journal) = executor(HeadlessBackend::new().quit_after(1));
    let mut engine: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(engine.run(), 0);

    let before = journal.calls().len();
    assert!(matches!(engine.try_run(), Err(RunError::AlreadyRun)));
    assert_eq!(engine.run(), 4);
    assert_eq!(journal.calls().len(), before);
}

#[test]
fn executor_is_shareable_between_sequential_engines() {
    let backend = HeadlessBackend::new().quit_after(1).with_events_at_frame(1, [BackendEvent::Quit]);
    let (exec, journal) = executor(backend);

    let mut first: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), Arc::clone(&exec));
    assert_eq!(first.run(), 0);
    let mut second: FrameLoop<'_, HeadlessBackend> = FrameLoop::new(config(), exec);
    assert_eq!(second.run(), 0);

    assert_eq!(journal.count(|c| matches!(c, BackendCall::CreateWindow(_))), 2);
    assert_eq!(journal.count(|c| *c == BackendCall::DestroyWindow), 2);
}

/// Headless backend whose `present` panics once `presents_left` runs out,
/// taking the executor thread down with it.
struct PanickingPresent {
    inner: HeadlessBackend,
    presents_left: u64,
}

impl Backend for PanickingPresent {
    fn create_window(&mut self, spec: &WindowSpec) -> anyhow::Result<()> {
        self.inner.create_window(spec)
    }

    fn destroy_window(&mut self) {
        self.inner.destroy_window();
    }

    fn create_renderer(&mut self, spec: &RendererSpec) -> anyhow::Result<()> {
        self.inner.create_renderer(spec)
    }

    fn destroy_renderer(&mut self) {
        self.inner.destroy_renderer();
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        self.inner.poll_events()
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> anyhow::Result<()> {
        self.inner.set_fullscreen(fullscreen)
    }

    fn set_draw_color(&mut self, color: Color) {
        self.inner.set_draw_color(color);
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.inner.clear()
    }

    fn draw_points(&mut self, points: &[Point]) -> anyhow::Result<()> {
        self.inner.draw_points(points)
    }

    fn present(&mut self) -> anyhow::Result<()> {
        if self.presents_left == 0 {
            panic!("device lost");
        }
        self.presents_left -= 1;
        self.inner.present()
    }

    fn ticks(&self) -> u64 {
        self.inner.ticks()
    }

    fn delay(&mut self, ms: u64) {
        self.inner.delay(ms);
    }
}

#[test]
fn executor_dying_mid_run_returns_four_without_hanging() {
    let inner = HeadlessBackend::new().quit_after(10);
    let journal = inner.journal();
    let backend = PanickingPresent {
        inner,
        presents_left: 1,
    };
    let exec = Arc::new(BackendExecutor::spawn("panicking", move || Ok(backend)).unwrap());

    let log = Log::default();
    let mut a = Recorder::new("a", &log);
    let mut engine = FrameLoop::new(config(), exec);
    engine.add_drawable(&mut a);

    let err = engine.try_run().unwrap_err();
    assert!(matches!(err, RunError::Executor(ExecutorError::Closed)));
    assert_eq!(err.exit_code(), 4);
    assert_eq!(engine.state(), EngineState::Destroyed);
    assert_eq!(engine.frames(), 1);
    assert_eq!(engine.run(), 4);
    drop(engine);

    assert_eq!(journal.count(|c| *c == BackendCall::Present), 1);
    assert!(!journal.contains(&BackendCall::DestroyWindow));
    assert_eq!(a.frames, 2);
}
