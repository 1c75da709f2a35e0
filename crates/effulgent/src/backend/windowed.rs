use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::error::OsError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use super::{Backend, RendererSpec, WindowSpec};
use crate::coords::Point;
use crate::device::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
use crate::input::platform::winit::translate_window_event;
use crate::input::BackendEvent;
use crate::paint::Color;
use crate::render::{PointRenderer, RenderCtx, RenderTarget};

/// Native window backend: winit for the window and events, wgpu for drawing.
///
/// Must be constructed on the thread that will make every other call,
/// normally inside a [`BackendExecutor`](crate::exec::BackendExecutor)
/// factory. The event loop is pumped without blocking on each
/// `poll_events`, so the frame loop keeps control of timing.
pub struct WinitBackend {
    // Field order is drop order: GPU state goes before the window, the
    // window before the event loop.
    frame: Option<GpuFrame>,
    points: PointRenderer,
    gpu: Option<Gpu>,
    window: Option<Arc<Window>>,

    pump: Pump,
    event_loop: EventLoop<()>,

    draw_color: Color,
    epoch: Instant,
}

impl WinitBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            frame: None,
            points: PointRenderer::new(),
            gpu: None,
            window: None,
            pump: Pump::default(),
            event_loop: build_event_loop()?,
            draw_color: Color::BLACK,
            epoch: Instant::now(),
        })
    }

    fn pump(&mut self) -> PumpStatus {
        self.event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.pump)
    }

    fn logical_viewport(&self) -> [f32; 2] {
        let Some(window) = self.window.as_ref() else {
            return [1.0, 1.0];
        };
        let logical: LogicalSize<f32> = window.inner_size().to_logical(window.scale_factor());
        [logical.width, logical.height]
    }
}

impl Backend for WinitBackend {
    fn create_window(&mut self, spec: &WindowSpec) -> Result<()> {
        if self.window.is_some() {
            bail!("window already exists");
        }

        self.pump.pending = Some(
            Window::default_attributes()
                .with_title(spec.title.clone())
                .with_inner_size(LogicalSize::new(spec.width as f64, spec.height as f64))
                .with_resizable(false),
        );

        if let PumpStatus::Exit(code) = self.pump() {
            bail!("event loop exited with code {code} before the window was created");
        }

        let window = match self.pump.created.take() {
            Some(res) => res.context("failed to create window")?,
            None => bail!("event loop did not resume; window was not created"),
        };

        self.pump.window_id = Some(window.id());
        self.window = Some(Arc::new(window));
        Ok(())
    }

    fn destroy_window(&mut self) {
        if self.gpu.is_some() {
            self.destroy_renderer();
        }
        self.pump.pending = None;
        self.pump.window_id = None;
        self.pump.events.clear();
        self.window = None;
    }

    fn create_renderer(&mut self, spec: &RendererSpec) -> Result<()> {
        let window = self
            .window
            .as_ref()
            .context("renderer requires a window")?;

        let gpu = pollster::block_on(Gpu::new(Arc::clone(window), GpuInit::for_vsync(spec.vsync)))
            .context("failed to create renderer")?;

        log::debug!(
            "renderer ready: {:?}, {}x{}",
            gpu.surface_format(),
            gpu.size().width,
            gpu.size().height
        );
        self.gpu = Some(gpu);
        Ok(())
    }

    fn destroy_renderer(&mut self) {
        self.frame = None;
        self.points.discard();
        self.points.release_gpu();
        self.gpu = None;
    }

    fn poll_events(&mut self) -> Vec<BackendEvent> {
        let status = self.pump();

        if let Some(size) = self.pump.resized.take() {
            if let Some(gpu) = self.gpu.as_mut() {
                gpu.resize(size);
            }
        }

        let mut events = std::mem::take(&mut self.pump.events);
        if let PumpStatus::Exit(code) = status {
            log::debug!("event loop exited with code {code}");
            events.push(BackendEvent::Quit);
        }
        events
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        let window = self.window.as_ref().context("no window")?;
        window.set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        Ok(())
    }

    fn set_draw_color(&mut self, color: Color) {
        self.draw_color = color;
    }

    fn clear(&mut self) -> Result<()> {
        let gpu = self.gpu.as_mut().context("clear called without a renderer")?;

        // A frame that was never presented is dropped with its points.
        self.frame = None;
        self.points.discard();

        let mut frame = match gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => match gpu.handle_surface_error(err) {
                SurfaceErrorAction::Fatal => bail!("surface is out of memory"),
                action => {
                    log::debug!("skipping frame: {action:?}");
                    return Ok(());
                }
            },
        };

        let [r, g, b, a] = self.draw_color.to_unit_f32();
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("effulgent clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        self.frame = Some(frame);
        Ok(())
    }

    fn draw_points(&mut self, points: &[Point]) -> Result<()> {
        if self.gpu.is_none() {
            bail!("draw_points called without a renderer");
        }
        // Skipped frame: nothing to draw into.
        if self.frame.is_some() {
            self.points.queue(points, self.draw_color);
        }
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let viewport = self.logical_viewport();
        let gpu = self.gpu.as_ref().context("present called without a renderer")?;
        let Some(mut frame) = self.frame.take() else {
            return Ok(());
        };

        {
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), viewport);
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            self.points.flush(&ctx, &mut target);
        }

        if let Some(window) = self.window.as_ref() {
            window.pre_present_notify();
        }
        gpu.submit(frame);
        Ok(())
    }

    fn ticks(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn delay(&mut self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Event sink handed to `pump_app_events`.
///
/// Windows can only be created from an `ActiveEventLoop`, so creation is
/// requested through `pending` and performed on the next callback.
#[derive(Default)]
struct Pump {
    pending: Option<WindowAttributes>,
    created: Option<Result<Window, OsError>>,
    window_id: Option<WindowId>,
    events: Vec<BackendEvent>,
    resized: Option<PhysicalSize<u32>>,
}

impl Pump {
    fn create_pending(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attrs) = self.pending.take() {
            self.created = Some(event_loop.create_window(attrs));
        }
    }
}

impl ApplicationHandler for Pump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.create_pending(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        // Platforms that resumed during an earlier pump only get here.
        self.create_pending(event_loop);
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window_id != Some(window_id) {
            return;
        }

        if let WindowEvent::Resized(size) = event {
            self.resized = Some(size);
        }

        if let Some(ev) = translate_window_event(&event) {
            self.events.push(ev);
        }
    }
}

/// Builds the event loop, allowing it off the main thread where the
/// platform permits it.
fn build_event_loop() -> Result<EventLoop<()>> {
    let mut builder = EventLoop::builder();

    #[cfg(target_os = "linux")]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }

    builder.build().context("failed to create winit EventLoop")
}
