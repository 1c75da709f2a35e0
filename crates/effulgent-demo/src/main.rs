use std::f64::consts::TAU;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use effulgent::engine::{CancelToken, EngineConfig, FrameLoop};
use effulgent::exec::BackendExecutor;
use effulgent::input::Key;
use effulgent::logging::{init_logging, LoggingConfig};
use effulgent::{Canvas, Color, DrawResult, Drawable, Point, WinitBackend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser)]
#[command(name = "effulgent-demo", about = "Starfield and orbit demo for the effulgent frame loop")]
struct Cli {
    /// Window width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Target frames per second (0 = uncapped)
    #[arg(long, default_value_t = 90)]
    fps: u32,

    #[arg(long, default_value = "Effulgent")]
    title: String,

    /// Disable vsync
    #[arg(long)]
    no_vsync: bool,

    /// Stop after this many frames (at least 1)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    frames: Option<u64>,

    /// Number of stars
    #[arg(long, default_value_t = 400)]
    stars: usize,

    /// Seed for the starfield
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Log filter, e.g. "debug" or "effulgent=trace"
    #[arg(long)]
    log: Option<String>,
}

/// Stars drifting left at three parallax speeds.
struct Starfield {
    rng: StdRng,
    count: usize,
    stars: Vec<(Point, u8)>,
    layers: [Vec<Point>; 3],
}

impl Starfield {
    fn new(count: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            count,
            stars: Vec::new(),
            layers: Default::default(),
        }
    }

    fn spawn(&mut self, width: u32, height: u32, x: Option<i32>) -> (Point, u8) {
        let x = x.unwrap_or_else(|| self.rng.random_range(0..width.max(1) as i32));
        let y = self.rng.random_range(0..height.max(1) as i32);
        (Point::new(x, y), self.rng.random_range(1..=3))
    }
}

impl Drawable for Starfield {
    fn init(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        let (w, h) = (canvas.width(), canvas.height());
        self.stars = (0..self.count).map(|_| self.spawn(w, h, None)).collect();
        log::info!("starfield: {} stars", self.stars.len());
        Ok(())
    }

    fn draw(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        for layer in &mut self.layers {
            layer.clear();
        }
        for &(p, speed) in &self.stars {
            self.layers[usize::from(speed - 1)].push(p);
        }

        canvas.draw_points(&self.layers[0], Color::rgb(90, 90, 120));
        canvas.draw_points(&self.layers[1], Color::rgb(170, 170, 200));
        canvas.draw_points(&self.layers[2], Color::WHITE);
        Ok(())
    }

    fn update(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        let (w, h) = (canvas.width(), canvas.height());
        for i in 0..self.stars.len() {
            let (p, speed) = self.stars[i];
            let moved = p.offset(-i32::from(speed), 0);
            self.stars[i] = if moved.x < 0 {
                self.spawn(w, h, Some(w as i32 - 1))
            } else {
                (moved, speed)
            };
        }
        Ok(())
    }
}

/// A Lissajous curve traced around the window center.
struct Orbit {
    phase: f64,
    samples: usize,
    points: Vec<Point>,
}

impl Orbit {
    fn new(samples: usize) -> Self {
        Self {
            phase: 0.0,
            samples,
            points: Vec::with_capacity(samples),
        }
    }
}

impl Drawable for Orbit {
    fn draw(&mut self, canvas: &mut dyn Canvas) -> DrawResult {
        let cx = f64::from(canvas.width()) / 2.0;
        let cy = f64::from(canvas.height()) / 2.0;
        let r = cx.min(cy) * 0.6;

        self.points.clear();
        for i in 0..self.samples {
            let t = TAU * i as f64 / self.samples as f64;
            let x = cx + r * (3.0 * t + self.phase).sin();
            let y = cy + r * (2.0 * t).sin();
            self.points.push(Point::new(x as i32, y as i32));
        }

        canvas.draw_points(&self.points, Color::rgb(255, 160, 40));
        Ok(())
    }

    fn update(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        self.phase = (self.phase + 0.02) % TAU;
        Ok(())
    }
}

/// Requests cancellation once a frame budget is used up.
struct FrameLimit {
    token: CancelToken,
    remaining: u64,
}

impl Drawable for FrameLimit {
    fn draw(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        Ok(())
    }

    fn update(&mut self, _canvas: &mut dyn Canvas) -> DrawResult {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.token.cancel();
        }
        Ok(())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(match cli.log.clone() {
        Some(filter) => LoggingConfig::with_filter(filter),
        None => LoggingConfig::default(),
    });

    let executor = match BackendExecutor::spawn("effulgent-backend", WinitBackend::new) {
        Ok(exec) => Arc::new(exec),
        Err(e) => {
            log::error!("{e}");
            return ExitCode::from(4);
        }
    };

    let config = EngineConfig::default()
        .with_title(cli.title)
        .with_size(cli.width, cli.height)
        .with_frame_rate(cli.fps)
        .with_vsync(!cli.no_vsync)
        .with_quit_key(Key::Q)
        .with_fullscreen_key(Key::F);

    let token = CancelToken::new();
    let mut stars = Starfield::new(cli.stars, cli.seed);
    let mut orbit = Orbit::new(720);
    let mut limit = cli.frames.map(|remaining| FrameLimit {
        token: token.clone(),
        remaining,
    });

    let mut engine = FrameLoop::new(config, executor);
    engine.add_drawable(&mut stars);
    engine.add_drawable(&mut orbit);
    if let Some(limit) = limit.as_mut() {
        engine.add_drawable(limit);
    }

    match engine.run_until(&token) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
