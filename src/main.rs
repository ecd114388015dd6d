use std::env;
use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use log::info;

use prim_sandbox::{
    init_logging, CameraMode, FrameClock, HeadlessBufferManager, InputFrame, LoggingConfig,
    Sandbox, SceneDescription,
};

/// Frames between stats lines in the log.
const STATS_INTERVAL: usize = 60;

fn main() {
    init_logging(LoggingConfig::default());
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path))?;
    let mut scene = SceneDescription::from_xml(&xml).context("failed to parse scene XML")?;
    if let Some(mode) = options.mode {
        scene.settings.mode = mode;
    }
    if let Some(batching) = options.batching {
        scene.settings.batching = batching;
    }

    println!(
        "Loaded scene with {} objects ({} instances)",
        scene.objects.len(),
        scene.instance_count()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.shape.label());
    }

    let mut sandbox = Sandbox::new(&scene);
    let mut sink = HeadlessBufferManager::new();
    let mut clock = FrameClock::new();
    let frames = options.frames.max(scene.input.len());
    let idle = InputFrame::idle();

    let mut draw_calls = 0;
    for index in 0..frames {
        let input = scene.input.get(index).unwrap_or(&idle);
        let time = clock.tick();
        sink.begin_frame();
        draw_calls = sandbox.frame(input, time.dt, &mut sink);
        if (index + 1) % STATS_INTERVAL == 0 {
            sandbox.metrics().log_stats();
        }
    }
    info!("replayed {frames} frame(s)");

    let totals = sandbox.totals();
    println!("Draw calls per frame: {draw_calls}");
    println!("Vertices: {}, Indices: {}", totals.vertices, totals.indices);
    println!("Camera: {}", sandbox.camera().describe());
    for line in sandbox.metrics().report_lines() {
        println!("{line}");
    }

    sandbox.cleanup(&mut sink);
    if sink.live_count() != 0 {
        bail!("{} buffer(s) still alive after cleanup", sink.live_count());
    }
    Ok(())
}

struct CliOptions {
    path: String,
    mode: Option<CameraMode>,
    batching: Option<bool>,
    frames: usize,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(
                "Usage: prim-sandbox <scene.xml> [--mode 2d|3d] [--batch|--no-batch] [--frames N]"
            ));
        };
        let mut options = Self {
            path,
            mode: None,
            batching: None,
            frames: 1,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--batch" => options.batching = Some(true),
                "--no-batch" => options.batching = Some(false),
                "--mode" => {
                    let value = args.next().context("--mode expects 2d or 3d")?;
                    let mode = CameraMode::from_name(&value)
                        .ok_or_else(|| anyhow!("Unknown camera mode: {value}. Expected 2d or 3d"))?;
                    options.mode = Some(mode);
                }
                "--frames" => {
                    let value = args.next().context("--frames expects a count")?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value}"))?;
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --mode, --batch, --no-batch or --frames"
                    ));
                }
            }
        }
        Ok(options)
    }
}
