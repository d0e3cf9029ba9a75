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

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::my_math::Vector3;
use crate::particles::PhysicsParams;
use crate::scheduler::SimulationSettings;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Ascii,
    Headless,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlData {
    pub particle_count: Option<NonZeroUsize>,
    pub worker_count: Option<NonZeroUsize>,
    pub seed: Option<u64>,

    pub gravity: Option<f32>,
    pub air_resistance: Option<f32>,
    pub ground_level: Option<f32>,
    pub step_scale: Option<f32>,
    pub respawn_point: Option<Vector3>,
    pub respawn_sway: Option<f32>,
    pub spawn_velocity_base: Option<Vector3>,
    pub spawn_velocity_jitter: Option<f32>,

    pub initial_position: Option<Vector3>,
    pub initial_height_spread: Option<f32>,

    pub renderer: Option<RendererKind>,
    pub frame_limit: Option<u64>,
    pub target_fps: Option<f32>,
    pub ascii_width: Option<NonZeroUsize>,
    pub ascii_height: Option<NonZeroUsize>,
    pub report_interval_secs: Option<f32>,
}

// Hardcoded default values
const DEFAULT_TARGET_FPS: u64 = 30;
const DEFAULT_ASCII_WIDTH: usize = 100;
const DEFAULT_ASCII_HEIGHT: usize = 40;
const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub simulation: SimulationSettings,

    pub renderer: RendererKind,
    pub frame_limit: Option<u64>,
    // Minimum wall time per frame, derived from `target_fps`
    pub frame_budget: Option<Duration>,
    pub ascii_width: usize,
    pub ascii_height: usize,
    pub report_interval: Duration,
}
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings {
                seed: entropy_seed(),
                ..SimulationSettings::default()
            },

            renderer: RendererKind::default(),
            frame_limit: None,
            frame_budget: Some(Duration::from_nanos(1_000_000_000 / DEFAULT_TARGET_FPS)),
            ascii_width: DEFAULT_ASCII_WIDTH,
            ascii_height: DEFAULT_ASCII_HEIGHT,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

pub fn parse_file(filepath: &str) -> anyhow::Result<AppConfig> {
    parse_str(&std::fs::read_to_string(filepath)?)
}

pub fn parse_str(contents: &str) -> anyhow::Result<AppConfig> {
    let config: TomlData = toml::from_str(contents)?;
    let defaults = AppConfig::default();
    let default_physics = PhysicsParams::default();

    let air_resistance = match config.air_resistance {
        Some(air_resistance) => {
            if air_resistance >= 0. {
                air_resistance
            } else {
                anyhow::bail!(
                    "`air_resistance` must not be negative, was given: {}",
                    air_resistance
                );
            }
        }
        None => default_physics.air_resistance,
    };

    let step_scale = match config.step_scale {
        Some(step_scale) => {
            if step_scale > 0. {
                step_scale
            } else {
                anyhow::bail!(
                    "`step_scale` must be a positive number, was given: {}",
                    step_scale
                );
            }
        }
        None => default_physics.step_scale,
    };

    let spawn_velocity_jitter = match config.spawn_velocity_jitter {
        Some(jitter) => {
            if jitter >= 0. {
                jitter
            } else {
                anyhow::bail!(
                    "`spawn_velocity_jitter` must not be negative, was given: {}",
                    jitter
                );
            }
        }
        None => default_physics.spawn_velocity_jitter,
    };

    let initial_height_spread = match config.initial_height_spread {
        Some(spread) => {
            if spread >= 0. {
                spread
            } else {
                anyhow::bail!(
                    "`initial_height_spread` must not be negative, was given: {}",
                    spread
                );
            }
        }
        None => defaults.simulation.initial_height_spread,
    };

    let frame_budget = match config.target_fps {
        Some(fps) => {
            if fps > 0. {
                match Duration::try_from_secs_f32(1. / fps) {
                    Ok(budget) => Some(budget),
                    Err(_) => anyhow::bail!(
                        "`target_fps` is too small to pace frames by, was given: {}",
                        fps
                    ),
                }
            } else {
                anyhow::bail!("`target_fps` must be a positive number, was given: {}", fps);
            }
        }
        None => match config.renderer.unwrap_or_default() {
            // Headless runs measure throughput, so leave them unpaced unless asked
            RendererKind::Headless => None,
            RendererKind::Ascii => defaults.frame_budget,
        },
    };

    let report_interval = match config.report_interval_secs {
        Some(secs) => {
            if secs > 0. {
                match Duration::try_from_secs_f32(secs) {
                    Ok(interval) => interval,
                    Err(_) => anyhow::bail!(
                        "`report_interval_secs` is too large, was given: {}",
                        secs
                    ),
                }
            } else {
                anyhow::bail!(
                    "`report_interval_secs` must be a positive number, was given: {}",
                    secs
                );
            }
        }
        None => defaults.report_interval,
    };

    let physics = PhysicsParams {
        gravity: finite("gravity", config.gravity.unwrap_or(default_physics.gravity))?,
        air_resistance: finite("air_resistance", air_resistance)?,
        ground_level: finite(
            "ground_level",
            config.ground_level.unwrap_or(default_physics.ground_level),
        )?,
        step_scale: finite("step_scale", step_scale)?,
        respawn_point: finite_vector(
            "respawn_point",
            config
                .respawn_point
                .unwrap_or(default_physics.respawn_point),
        )?,
        respawn_sway: finite(
            "respawn_sway",
            config.respawn_sway.unwrap_or(default_physics.respawn_sway),
        )?,
        spawn_velocity_base: finite_vector(
            "spawn_velocity_base",
            config
                .spawn_velocity_base
                .unwrap_or(default_physics.spawn_velocity_base),
        )?,
        spawn_velocity_jitter: finite("spawn_velocity_jitter", spawn_velocity_jitter)?,
    };
    let initial_position = finite_vector(
        "initial_position",
        config
            .initial_position
            .unwrap_or(defaults.simulation.initial_position),
    )?;
    let initial_height_spread = finite("initial_height_spread", initial_height_spread)?;

    Ok(AppConfig {
        simulation: SimulationSettings {
            particle_count: config
                .particle_count
                .map_or(defaults.simulation.particle_count, NonZeroUsize::get),
            worker_count: config
                .worker_count
                .map_or(defaults.simulation.worker_count, NonZeroUsize::get),
            seed: config.seed.unwrap_or(defaults.simulation.seed),
            physics,
            initial_position,
            initial_height_spread,
        },

        renderer: config.renderer.unwrap_or_default(),
        frame_limit: config.frame_limit,
        frame_budget,
        ascii_width: config
            .ascii_width
            .map_or(defaults.ascii_width, NonZeroUsize::get),
        ascii_height: config
            .ascii_height
            .map_or(defaults.ascii_height, NonZeroUsize::get),
        report_interval,
    })
}

// NaN or infinite physics values would quietly stop particles from ever respawning
fn finite(key: &str, value: f32) -> anyhow::Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        anyhow::bail!("`{}` must be a finite number, was given: {}", key, value);
    }
}
fn finite_vector(key: &str, value: Vector3) -> anyhow::Result<Vector3> {
    if value.is_finite() {
        Ok(value)
    } else {
        anyhow::bail!("`{}` must only hold finite numbers, was given: {:?}", key, value);
    }
}

// Seed for runs that did not ask for a reproducible one
fn entropy_seed() -> u64 {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_str("").unwrap();
        let physics = PhysicsParams::default();
        assert_eq!(config.simulation.physics, physics);
        assert_eq!(config.simulation.particle_count, 500_000);
        assert_eq!(config.simulation.initial_position, Vector3::new(1.1, 0.85, 0.));
        assert_eq!(config.renderer, RendererKind::Ascii);
        assert_eq!(config.frame_budget, Some(Duration::from_nanos(33_333_333)));
        assert_eq!(config.frame_limit, None);
    }

    #[test]
    fn overrides_are_applied() {
        let config = parse_str(
            r#"
            particle_count = 4096
            worker_count = 3
            seed = 99
            gravity = 2.5
            respawn_point = [0.0, -0.5, 0.5]
            renderer = "headless"
            frame_limit = 120
            ascii_width = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.simulation.particle_count, 4096);
        assert_eq!(config.simulation.worker_count, 3);
        assert_eq!(config.simulation.seed, 99);
        assert_eq!(config.simulation.physics.gravity, 2.5);
        assert_eq!(
            config.simulation.physics.respawn_point,
            Vector3::new(0., -0.5, 0.5)
        );
        assert_eq!(config.renderer, RendererKind::Headless);
        assert_eq!(config.frame_budget, None);
        assert_eq!(config.frame_limit, Some(120));
        assert_eq!(config.ascii_width, 64);
        assert_eq!(config.ascii_height, DEFAULT_ASCII_HEIGHT);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse_str("air_resistance = -0.1").is_err());
        assert!(parse_str("step_scale = 0.0").is_err());
        assert!(parse_str("target_fps = -30.0").is_err());
        assert!(parse_str("particle_count = 0").is_err());
        assert!(parse_str("initial_height_spread = -1.0").is_err());
        assert!(parse_str("report_interval_secs = 1e30").is_err());
        assert!(parse_str("report_interval_secs = inf").is_err());
    }

    #[test]
    fn frame_budget_follows_target_fps() {
        let config = parse_str("target_fps = 60.0").unwrap();
        assert_eq!(config.frame_budget, Some(Duration::from_secs_f32(1. / 60.)));

        // 1 / 1e-39 is infinite and cannot be paced
        assert!(parse_str("target_fps = 1e-39").is_err());
    }

    #[test]
    fn rejects_non_finite_physics() {
        assert!(parse_str("gravity = nan").is_err());
        assert!(parse_str("ground_level = inf").is_err());
        assert!(parse_str("respawn_sway = -inf").is_err());
        assert!(parse_str("spawn_velocity_base = [0.4, nan, -0.1]").is_err());
        assert!(parse_str("initial_position = [inf, 0.85, 0.0]").is_err());
        assert!(parse_str("air_resistance = inf").is_err());
    }

    #[test]
    fn default_seeds_come_from_entropy() {
        let seeds: Vec<u64> = (0..4).map(|_| AppConfig::default().simulation.seed).collect();
        assert!(seeds.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_str("max_speed = 7.0").is_err());
    }
}
