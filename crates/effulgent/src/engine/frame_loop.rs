use std::sync::Arc;

use crate::backend::{Backend, RendererSpec, WindowSpec};
use crate::coords::Point;
use crate::core::{Canvas, Drawable};
use crate::exec::BackendExecutor;
use crate::input::BackendEvent;
use crate::paint::Color;

use super::cancel::CancelToken;
use super::config::EngineConfig;
use super::error::{Phase, RunError};

/// Lifecycle of one [`FrameLoop`].
///
/// `Destroyed` is terminal: an engine runs at most once.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EngineState {
    Uninitialized,
    /// Window exists.
    Created,
    Running,
    Terminating,
    /// Window and renderer released.
    Destroyed,
}

/// Fixed-rate render loop driving a list of drawables.
///
/// The loop runs on the caller's thread. Every backend call goes through the
/// executor, so it happens on the executor's thread in submission order.
///
/// Drawables are borrowed, not owned: they are handed back untouched (apart
/// from their own state changes) once the engine is dropped.
pub struct FrameLoop<'d, B: Backend + 'static> {
    config: EngineConfig,
    executor: Arc<BackendExecutor<B>>,
    drawables: Vec<&'d mut dyn Drawable>,
    state: EngineState,
    frames: u64,
}

impl<'d, B: Backend + 'static> FrameLoop<'d, B> {
    pub fn new(config: EngineConfig, executor: Arc<BackendExecutor<B>>) -> Self {
        Self {
            config,
            executor,
            drawables: Vec::new(),
            state: EngineState::Uninitialized,
            frames: 0,
        }
    }

    /// Window width; only effective before `run`.
    pub fn set_width(&mut self, width: u32) {
        self.config.width = width;
    }

    /// Window height; only effective before `run`.
    pub fn set_height(&mut self, height: u32) {
        self.config.height = height;
    }

    pub fn width(&self) -> u32 {
        self.config.width
    }

    pub fn height(&self) -> u32 {
        self.config.height
    }

    /// Appends `drawable`. Registration order is call order.
    pub fn add_drawable(&mut self, drawable: &'d mut dyn Drawable) {
        self.drawables.push(drawable);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Frames fully drawn and presented so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs until quit and returns a status code.
    ///
    /// `0` on a normal quit, otherwise [`RunError::exit_code`].
    pub fn run(&mut self) -> i32 {
        match self.try_run() {
            Ok(()) => 0,
            Err(e) => e.exit_code(),
        }
    }

    /// Runs until the window-system quit event or the quit key.
    pub fn try_run(&mut self) -> Result<(), RunError> {
        self.run_with(None)
    }

    /// Like [`try_run`](Self::try_run), but also stops before the next frame
    /// once `cancel` is triggered.
    pub fn run_until(&mut self, cancel: &CancelToken) -> Result<(), RunError> {
        self.run_with(Some(cancel))
    }

    fn run_with(&mut self, cancel: Option<&CancelToken>) -> Result<(), RunError> {
        if self.state != EngineState::Uninitialized {
            log::warn!("run called on a frame loop in state {:?}", self.state);
            return Err(RunError::AlreadyRun);
        }

        log::info!(
            "starting `{}` at {}x{}, {} fps, {} drawable(s)",
            self.config.title,
            self.config.width,
            self.config.height,
            self.config.frame_rate,
            self.drawables.len()
        );

        let executor = Arc::clone(&self.executor);
        let result = self.drive(&executor, cancel);

        // Release guards inside `drive` have completed by now.
        self.state = EngineState::Destroyed;

        match &result {
            Ok(()) => log::info!("frame loop finished after {} frame(s)", self.frames),
            Err(e) => log::debug!("frame loop stopped: {e}"),
        }
        result
    }

    fn drive(
        &mut self,
        exec: &BackendExecutor<B>,
        cancel: Option<&CancelToken>,
    ) -> Result<(), RunError> {
        let window = WindowSpec {
            title: self.config.title.clone(),
            width: self.config.width,
            height: self.config.height,
        };
        if let Err(e) = exec.call(move |b| b.create_window(&window))? {
            log::error!("failed to create window: {e:#}");
            return Err(RunError::WindowCreation(e));
        }
        let _window = Release::new(exec, Resource::Window);
        self.state = EngineState::Created;

        let renderer = RendererSpec {
            vsync: self.config.vsync,
        };
        if let Err(e) = exec.call(move |b| b.create_renderer(&renderer))? {
            log::error!("failed to create renderer: {e:#}");
            return Err(RunError::RendererCreation(e));
        }
        let _renderer = Release::new(exec, Resource::Renderer);
        log::debug!("window and renderer created");

        let mut canvas = FrameCanvas {
            exec,
            width: self.config.width,
            height: self.config.height,
        };

        exec.submit(|b| warn_on_err("clear", b.clear()))?;

        for (index, drawable) in self.drawables.iter_mut().enumerate() {
            if let Err(error) = drawable.init(&mut canvas) {
                self.state = EngineState::Terminating;
                return Err(drawable_failed(index, Phase::Init, error));
            }
        }

        let pacer = self.config.pacer();
        let quit_key = self.config.quit_key;
        let fullscreen_key = self.config.fullscreen_key;

        let mut running = true;
        let mut fullscreen = false;
        let mut last = exec.call(|b| b.ticks())?;
        self.state = EngineState::Running;

        while running {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                log::info!("run cancelled");
                break;
            }

            for event in exec.call(|b| b.poll_events())? {
                match event {
                    BackendEvent::Quit => {
                        log::debug!("quit requested by the window system");
                        running = false;
                    }
                    BackendEvent::KeyUp(key) if key == quit_key => {
                        log::debug!("quit key {key} released");
                        running = false;
                    }
                    BackendEvent::KeyUp(key) if key == fullscreen_key => {
                        fullscreen = !fullscreen;
                        log::debug!("fullscreen {}", if fullscreen { "on" } else { "off" });
                        exec.submit(move |b| {
                            warn_on_err("set_fullscreen", b.set_fullscreen(fullscreen))
                        })?;
                    }
                    BackendEvent::KeyUp(_) => {}
                }
            }

            exec.submit(|b| {
                b.set_draw_color(Color::BLACK);
                warn_on_err("clear", b.clear());
            })?;

            for (index, drawable) in self.drawables.iter_mut().enumerate() {
                if let Err(error) = drawable.draw(&mut canvas) {
                    self.state = EngineState::Terminating;
                    return Err(drawable_failed(index, Phase::Draw, error));
                }
                if let Err(error) = drawable.update(&mut canvas) {
                    self.state = EngineState::Terminating;
                    return Err(drawable_failed(index, Phase::Update, error));
                }
            }

            last = exec.call(move |b| {
                warn_on_err("present", b.present());
                let now = b.ticks();
                match pacer.remaining(last, now) {
                    Some(ms) => {
                        b.delay(ms);
                        b.ticks()
                    }
                    None => now,
                }
            })?;
            self.frames += 1;
        }

        self.state = EngineState::Terminating;
        Ok(())
    }
}

/// Canvas view handed to drawables for the duration of a run.
struct FrameCanvas<'a, B: Backend + 'static> {
    exec: &'a BackendExecutor<B>,
    width: u32,
    height: u32,
}

impl<B: Backend + 'static> Canvas for FrameCanvas<'_, B> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_points(&mut self, points: &[Point], color: Color) {
        if points.is_empty() {
            return;
        }

        let count = points.len();
        let points = points.to_vec();
        let submitted = self.exec.submit(move |b| {
            b.set_draw_color(color);
            warn_on_err("draw_points", b.draw_points(&points));
        });

        if let Err(e) = submitted {
            log::warn!("dropped {count} point(s): {e}");
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum Resource {
    Window,
    Renderer,
}

/// Releases a backend resource when dropped, waiting for the release to run.
struct Release<'a, B: Backend + 'static> {
    exec: &'a BackendExecutor<B>,
    resource: Resource,
}

impl<'a, B: Backend + 'static> Release<'a, B> {
    fn new(exec: &'a BackendExecutor<B>, resource: Resource) -> Self {
        Self { exec, resource }
    }
}

impl<B: Backend + 'static> Drop for Release<'_, B> {
    fn drop(&mut self) {
        let resource = self.resource;
        let released = self.exec.call(move |b| match resource {
            Resource::Window => b.destroy_window(),
            Resource::Renderer => b.destroy_renderer(),
        });

        match released {
            Ok(()) => log::debug!("{resource:?} released"),
            Err(e) => log::error!("failed to release {resource:?}: {e}"),
        }
    }
}

fn drawable_failed(index: usize, phase: Phase, error: anyhow::Error) -> RunError {
    log::error!("drawable #{index} failed during {phase}: {error:#}");
    RunError::Drawable {
        index,
        phase,
        error,
    }
}

fn warn_on_err(op: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        log::warn!("backend {op} failed: {e:#}");
    }
}
