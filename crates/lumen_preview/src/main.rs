//! Lumen Preview
//!
//! Renders a scene through the headless host and reports what each camera
//! did: light counts, shadow tiles, bloom levels and target memory.
//!
//! Run with: cargo run -p lumen_preview -- [--settings FILE] [--scene FILE] [--frames N] [--editor] [--json]
//!
//! Without `--scene` the built-in demo scene is used. The process exits
//! with a non-zero status if any temporary target was misused.

use std::process::ExitCode;

use lumen_headless::{HeadlessContext, SceneDescription};
use lumen_render::{DebugOverlay, EditorOverlay, FrameReport, PipelineSettings, RenderPipeline};

/// Command line options
#[derive(Debug)]
struct Options {
    settings: Option<String>,
    scene: Option<String>,
    frames: u64,
    editor: bool,
    json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            settings: None,
            scene: None,
            frames: 1,
            editor: false,
            json: false,
        }
    }
}

impl Options {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut options = Self::default();
        let mut args = args.skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => options.settings = Some(args.next().ok_or("--settings needs a file")?),
                "--scene" => options.scene = Some(args.next().ok_or("--scene needs a file")?),
                "--frames" => {
                    let value = args.next().ok_or("--frames needs a count")?;
                    options.frames = value
                        .parse()
                        .map_err(|_| format!("invalid frame count '{}'", value))?;
                }
                "--editor" => options.editor = true,
                "--json" => options.json = true,
                other => return Err(format!("unknown argument '{}'", other)),
            }
        }
        Ok(options)
    }
}

fn load_settings(path: Option<&str>) -> Result<PipelineSettings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let settings = PipelineSettings::from_json(&std::fs::read_to_string(path)?)?;
            log::info!("Loaded pipeline settings from {}", path);
            Ok(settings)
        }
        None => Ok(PipelineSettings::default()),
    }
}

fn load_scene(path: Option<&str>) -> Result<SceneDescription, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let scene = SceneDescription::from_json(&std::fs::read_to_string(path)?)?;
            log::info!(
                "Loaded scene from {}: {} lights, {} casters, {} cameras",
                path,
                scene.lights.len(),
                scene.casters.len(),
                scene.cameras.len()
            );
            Ok(scene)
        }
        None => {
            log::info!("No scene given, using the demo scene");
            Ok(SceneDescription::demo())
        }
    }
}

fn log_report(report: &FrameReport) {
    for stats in report.cameras.iter().flatten() {
        log::info!(
            "[frame {}] {}: {} lights ({} dropped), {} shadow tiles, {} caster draws, bloom {}, {:.1} MB frame buffer",
            report.frame,
            stats.camera,
            stats.lights.directional + stats.lights.other,
            stats.lights.overflow,
            stats.shadow_tiles(),
            stats.shadows.caster_draws,
            stats
                .bloom
                .as_ref()
                .map_or("off".to_string(), |b| if b.passthrough {
                    "passthrough".to_string()
                } else {
                    format!("{} levels", b.levels)
                }),
            stats.frame_buffer_mb()
        );
        for issue in stats.validate() {
            log::warn!("{}: {:?}", stats.camera, issue);
        }
    }
    if report.skipped_count() > 0 {
        log::warn!("[frame {}] {} cameras skipped", report.frame, report.skipped_count());
    }
}

/// Render all frames, returning the last report and the violation count
fn run<O: DebugOverlay>(
    mut pipeline: RenderPipeline<O>,
    context: &mut HeadlessContext,
    frames: u64,
) -> (Option<FrameReport>, usize) {
    let cameras = context.scene().cameras.clone();
    let mut last = None;
    let mut violations = 0;
    for _ in 0..frames {
        let report = pipeline.render(context, &cameras);
        log_report(&report);
        violations += context.take_violations().len();
        context.clear_events();
        last = Some(report);
    }
    (last, violations)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match Options::parse(std::env::args()) {
        Ok(options) => options,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("usage: lumen-preview [--settings FILE] [--scene FILE] [--frames N] [--editor] [--json]");
            return ExitCode::from(2);
        }
    };

    let settings = match load_settings(options.settings.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("Failed to load settings: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let scene = match load_scene(options.scene.as_deref()) {
        Ok(scene) => scene,
        Err(err) => {
            log::error!("Failed to load scene: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut context = HeadlessContext::new(scene);
    let (report, violations) = if options.editor {
        run(
            RenderPipeline::with_overlay(settings, EditorOverlay::default()),
            &mut context,
            options.frames,
        )
    } else {
        run(RenderPipeline::new(settings), &mut context, options.frames)
    };

    let tracker = context.tracker().stats();
    log::info!(
        "{} target allocations, peak {:.1} MB, {:.1} KB uploaded",
        tracker.total_allocations,
        tracker.peak_bytes as f64 / (1024.0 * 1024.0),
        context.uploaded_bytes() as f64 / 1024.0
    );

    if options.json {
        if let Some(report) = &report {
            match serde_json::to_string_pretty(report) {
                Ok(json) => println!("{}", json),
                Err(err) => log::error!("Failed to serialize report: {}", err),
            }
        }
    }

    if violations > 0 {
        log::error!("{} temporary target violations", violations);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
