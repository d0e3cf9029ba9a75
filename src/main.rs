/*
    spark_fountain - A multithreaded particle fountain streamed to a point renderer.
    Copyright (C) 2022,2023  Ryan Andersen

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::io::BufWriter;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;
use tracing_subscriber::EnvFilter;

use spark_fountain::app_config::{self, AppConfig, RendererKind};
use spark_fountain::render::{AsciiRenderer, FrameSummary, HeadlessRenderer, Renderer};
use spark_fountain::{FrameStats, ParticleSystem};

// App constants
const DEFAULT_CONFIG_PATH: &str = "spark_fountain.toml";

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with an ascii frame on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let app_config = load_config()?;

    let setup_start = Instant::now();
    let mut system: ParticleSystem = ParticleSystem::new(&app_config.simulation)?;
    info!(
        setup_ms = setup_start.elapsed().as_millis() as u64,
        seed = app_config.simulation.seed,
        "setup finished"
    );

    let mut renderer: Box<dyn Renderer> = match app_config.renderer {
        RendererKind::Ascii => {
            let stdout = BufWriter::new(std::io::stdout());
            // Clear the terminal once; every frame afterwards redraws from the top-left corner
            print!("\x1b[2J");
            Box::new(AsciiRenderer::new(
                stdout,
                app_config.ascii_width,
                app_config.ascii_height,
            ))
        }
        RendererKind::Headless => Box::new(HeadlessRenderer::new()),
    };

    run_frames(&app_config, &mut system, renderer.as_mut())?;

    system.shutdown()?;
    Ok(())
}

fn load_config() -> anyhow::Result<AppConfig> {
    match std::env::args().nth(1) {
        // An explicitly named file must exist
        Some(path) => {
            info!(path = %path, "loading config");
            app_config::parse_file(&path)
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!(path = DEFAULT_CONFIG_PATH, "loading config");
            app_config::parse_file(DEFAULT_CONFIG_PATH)
        }
        None => {
            info!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn run_frames(
    app_config: &AppConfig,
    system: &mut ParticleSystem,
    renderer: &mut dyn Renderer,
) -> anyhow::Result<()> {
    let mut last_frame_time = Instant::now();
    let mut report = FrameReport::new(last_frame_time);

    while app_config
        .frame_limit
        .map_or(true, |limit| system.frame() < limit)
    {
        // Handle per-frame timing
        let frame_start = Instant::now();
        let delta_time = frame_start.duration_since(last_frame_time).as_secs_f32();
        last_frame_time = frame_start;

        let stats = system.step(delta_time)?;
        renderer.upload_and_render(&system.render_view())?;
        report.record(&stats, renderer.last_summary());

        if frame_start.duration_since(report.since) >= app_config.report_interval {
            report.log(frame_start);
            report = FrameReport::new(frame_start);
        }

        if let Some(budget) = app_config.frame_budget {
            let spent = frame_start.elapsed();
            if spent < budget {
                std::thread::sleep(budget - spent);
            }
        }
    }

    info!(frames = system.frame(), "frame loop finished");
    Ok(())
}

// Aggregates frame stats between two periodic log lines
struct FrameReport {
    since: Instant,
    frames: u32,
    step_time: Duration,
    respawned: usize,
    summary: Option<FrameSummary>,
}

impl FrameReport {
    fn new(since: Instant) -> Self {
        Self {
            since,
            frames: 0,
            step_time: Duration::ZERO,
            respawned: 0,
            summary: None,
        }
    }

    fn record(&mut self, stats: &FrameStats, summary: Option<FrameSummary>) {
        self.frames += 1;
        self.step_time += stats.step_time;
        self.respawned += stats.respawned;
        self.summary = summary;
    }

    fn log(&self, now: Instant) {
        let window = now.duration_since(self.since).as_secs_f32();
        if self.frames == 0 || window <= 0. {
            return;
        }
        let summary = self.summary.unwrap_or_default();
        info!(
            fps = format_args!("{:.1}", self.frames as f32 / window),
            step_ms = format_args!("{:.3}", self.step_time.as_secs_f32() * 1_000. / self.frames as f32),
            respawns_per_sec = format_args!("{:.0}", self.respawned as f32 / window),
            visible = summary.visible,
            brightness = format_args!("{:.2}", summary.mean_brightness),
            "frame report"
        );
    }
}
