mod asset;
mod culler;
mod render;
mod script;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foundation::time::Time;
use foundation::window::WindowSize;
use runtime::{Compute, FrameLoop, RuntimeConfig, Surface, ThreadWorker};

use crate::asset::{PendingBlob, fetch_blob, poll_blob};
use crate::culler::{BoxCuller, Report, grid_boxes};
use crate::render::SummaryRenderer;
use crate::script::{Action, HeadlessSurface, action_for};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless bubbles viewer driving a compute worker")]
struct Args {
    /// URL of the prebuilt spatial tree blob. Without it the worker runs on
    /// the generated dataset only.
    #[arg(long, env = "VIEWER_MONOLITH_URL")]
    monolith_url: Option<String>,

    /// JSON runtime configuration.
    #[arg(long, env = "VIEWER_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 720.0)]
    height: f32,

    #[arg(long, default_value_t = 1.0)]
    pixel_scale: f32,

    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Frames to run; 0 runs until interrupted.
    #[arg(long, default_value_t = 1200)]
    frames: u64,

    /// Number of generated entity boxes.
    #[arg(long, default_value_t = 10_000)]
    entities: u32,

    /// Result event the culler answers each viewport with.
    #[arg(long, value_enum, default_value_t = Report::Bubbles)]
    report: Report,

    #[arg(long)]
    dump_timings: bool,
}

fn load_config(args: &Args) -> Result<RuntimeConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    config.dump_timings |= args.dump_timings;
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(?config, "runtime configuration");

    let base = WindowSize::new(args.width, args.height, args.pixel_scale);
    let surface = HeadlessSurface::new(base);
    let report = args.report;
    let port = ThreadWorker::spawn("box-culler", move || {
        Box::new(BoxCuller::new(report)) as Box<dyn Compute>
    })?;
    let mut frame_loop = FrameLoop::new(port, base, &config);
    frame_loop.set_data(&grid_boxes(args.entities, 1.0));

    let mut monolith: Option<PendingBlob> = None;
    if let Some(url) = args.monolith_url.clone() {
        let (tx, rx) = oneshot::channel();
        let http = reqwest::Client::new();
        tokio::spawn(async move {
            let _ = tx.send(fetch_blob(&http, &url).await);
        });
        monolith = Some(rx);
    }

    let mut renderer = SummaryRenderer::default();
    let period = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
    let mut interval = tokio::time::interval(period);
    let start = Instant::now();
    let mut frame = 0u64;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
        }
        let now = Time(start.elapsed().as_secs_f64());

        if let Some(blob) = poll_blob(&mut monolith) {
            frame_loop.set_monolith(blob);
        }

        frame_loop.poll_worker(now);

        match action_for(frame, &base) {
            Some(Action::Pan { dx, dy }) => {
                frame_loop.pan(dx, dy);
            }
            Some(Action::Zoom { factor, anchor }) => {
                frame_loop.zoom(factor, anchor);
            }
            Some(Action::Home) => {
                frame_loop.reset_view();
            }
            Some(Action::Resize { width, height }) => {
                let scale = surface.window_size().pixel_scale;
                surface.set(WindowSize::new(width, height, scale));
                frame_loop.on_resize(now);
            }
            Some(Action::PixelScale(scale)) => {
                let current = surface.window_size();
                surface.set(WindowSize::new(current.width, current.height, scale));
            }
            None => {}
        }

        frame_loop.tick(now, &surface, &mut renderer);
        frame += 1;
        if args.frames != 0 && frame >= args.frames {
            break;
        }
    }

    let stats = frame_loop.scheduler().stats();
    info!(
        frames = frame,
        scale = frame_loop.view_state().scale(),
        drawn = renderer.frames_drawn,
        visible = renderer.last_visible,
        requests = stats.requests_sent,
        responses = stats.responses_applied,
        deferred_ticks = stats.deferred_ticks,
        superseded = stats.superseded_viewports,
        restarts = stats.worker_restarts,
        decode_failures = stats.decode_failures,
        mean_latency_ms = stats.latency_ms.mean().unwrap_or(0.0),
        max_latency_ms = stats.latency_ms.max,
        "viewer finished"
    );

    frame_loop.into_scheduler().into_port().shutdown();
    Ok(())
}
