use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SIMULATION_CONFIG_REL_PATH: &str = "default.toml";

pub const MIN_SEPARATION_COUNT: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub volume_size: [f32; 3],
    #[serde(default)]
    pub volume_center: [f32; 3],
    #[serde(default = "default_spawn_border_offset")]
    pub spawn_border_offset: f32,
    #[serde(default)]
    pub initial_entities: u32,
    pub speed: f32,
    pub sphere_radius: f32,
    #[serde(default = "default_avoidance_enabled")]
    pub avoidance_enabled: bool,
    #[serde(default = "default_separation_count")]
    pub separation_count: u32,
    /// Fixed integration step in seconds.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,
    /// Runner pacing; zero runs ticks back to back.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    #[serde(default = "default_parallel_min_batch")]
    pub parallel_min_batch: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        default_simulation_config()
    }
}

impl SimulationConfig {
    pub fn cell_size(&self) -> [f32; 3] {
        let s = self.separation_count.max(1) as f32;
        [
            self.volume_size[0] / s,
            self.volume_size[1] / s,
            self.volume_size[2] / s,
        ]
    }

    pub fn step_distance(&self) -> f32 {
        self.speed * self.tick_seconds
    }
}

pub fn simulation_config_from_toml_str(raw: &str) -> Result<SimulationConfig, toml::de::Error> {
    toml::from_str(raw)
}

pub fn default_simulation_config() -> SimulationConfig {
    simulation_config_from_toml_str(include_str!("../default.toml"))
        .expect("default simulation config TOML must deserialize")
}

pub fn default_simulation_config_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_SIMULATION_CONFIG_REL_PATH)
}

pub fn load_default_simulation_config() -> Result<SimulationConfig> {
    load_simulation_config_from_path(&default_simulation_config_path())
}

pub fn load_simulation_config_from_path(path: &Path) -> Result<SimulationConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read simulation config from {}", path.display()))?;
    simulation_config_from_toml_str(&raw)
        .context("simulation config TOML failed schema deserialization")
        .with_context(|| format!("failed to parse simulation config from {}", path.display()))
}

pub fn validate_simulation_config(config: &SimulationConfig) -> Result<(), String> {
    if config.separation_count < MIN_SEPARATION_COUNT {
        return Err(format!(
            "separation_count must be >= {MIN_SEPARATION_COUNT} (got {})",
            config.separation_count
        ));
    }
    if config
        .volume_size
        .iter()
        .any(|extent| !extent.is_finite() || *extent <= 0.0)
    {
        return Err("volume_size extents must be finite and greater than zero".to_owned());
    }
    if config.volume_center.iter().any(|c| !c.is_finite()) {
        return Err("volume_center must be finite".to_owned());
    }
    if !config.sphere_radius.is_finite() || config.sphere_radius <= 0.0 {
        return Err("sphere_radius must be finite and greater than zero".to_owned());
    }
    if !config.speed.is_finite() || config.speed < 0.0 {
        return Err("speed must be finite and >= 0".to_owned());
    }
    if !config.tick_seconds.is_finite() || config.tick_seconds <= 0.0 {
        return Err("tick_seconds must be finite and greater than zero".to_owned());
    }
    let min_extent = config
        .volume_size
        .iter()
        .copied()
        .fold(f32::INFINITY, f32::min);
    if !config.spawn_border_offset.is_finite()
        || config.spawn_border_offset < 0.0
        || config.spawn_border_offset >= min_extent
    {
        return Err("spawn_border_offset must be within [0, smallest volume extent)".to_owned());
    }
    // An entity may overshoot the volume by one step before it is reflected; the
    // grid classifier only tolerates that overshoot while it stays inside one cell.
    let min_cell = config.cell_size().into_iter().fold(f32::INFINITY, f32::min);
    if config.step_distance() >= min_cell {
        return Err(format!(
            "speed * tick_seconds ({}) must be smaller than the smallest cell extent ({min_cell})",
            config.step_distance()
        ));
    }
    if config.parallel_min_batch == 0 {
        return Err("parallel_min_batch must be greater than zero".to_owned());
    }
    Ok(())
}

fn default_spawn_border_offset() -> f32 {
    0.0
}

fn default_avoidance_enabled() -> bool {
    true
}

fn default_separation_count() -> u32 {
    MIN_SEPARATION_COUNT
}

fn default_tick_seconds() -> f32 {
    1.0 / 60.0
}

fn default_ticks_per_second() -> u32 {
    60
}

fn default_parallel_min_batch() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> SimulationConfig {
        SimulationConfig {
            volume_size: [10.0, 10.0, 10.0],
            volume_center: [0.0, 0.0, 0.0],
            spawn_border_offset: 1.0,
            initial_entities: 0,
            speed: 1.0,
            sphere_radius: 0.5,
            avoidance_enabled: true,
            separation_count: 3,
            tick_seconds: 0.1,
            ticks_per_second: 0,
            parallel_min_batch: 64,
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = default_simulation_config();
        validate_simulation_config(&config).expect("bundled default must validate");
        assert!(config.separation_count >= MIN_SEPARATION_COUNT);
    }

    #[test]
    fn optional_fields_fall_back_to_defaults() {
        let config = simulation_config_from_toml_str(
            r#"
            volume_size = [8.0, 8.0, 8.0]
            speed = 1.0
            sphere_radius = 0.5
            "#,
        )
        .expect("minimal config should parse");

        assert_eq!(config.volume_center, [0.0, 0.0, 0.0]);
        assert_eq!(config.separation_count, 3);
        assert!(config.avoidance_enabled);
        assert_eq!(config.parallel_min_batch, 64);
        assert_eq!(config.initial_entities, 0);
    }

    #[test]
    fn missing_required_field_fails_to_parse() {
        let err = simulation_config_from_toml_str("speed = 1.0\nsphere_radius = 0.5\n")
            .expect_err("volume_size is required");
        assert!(err.to_string().contains("volume_size"));
    }

    #[test]
    fn rejects_separation_count_below_three() {
        let mut config = valid_config();
        config.separation_count = 2;
        let err = validate_simulation_config(&config).expect_err("S=2 must be rejected");
        assert!(err.contains("separation_count"));
    }

    #[test]
    fn rejects_non_positive_volume_and_radius() {
        let mut config = valid_config();
        config.volume_size[1] = 0.0;
        assert!(validate_simulation_config(&config)
            .expect_err("zero extent")
            .contains("volume_size"));

        let mut config = valid_config();
        config.sphere_radius = -1.0;
        assert!(validate_simulation_config(&config)
            .expect_err("negative radius")
            .contains("sphere_radius"));
    }

    #[test]
    fn rejects_step_longer_than_a_cell() {
        let mut config = valid_config();
        // cell extent is 10/3; one step of 4.0 could skip past a whole cell
        config.speed = 40.0;
        let err = validate_simulation_config(&config).expect_err("overshoot must be rejected");
        assert!(err.contains("speed * tick_seconds"));
    }

    #[test]
    fn rejects_border_offset_larger_than_volume() {
        let mut config = valid_config();
        config.spawn_border_offset = 10.0;
        assert!(validate_simulation_config(&config).is_err());
    }

    #[test]
    fn load_reports_path_in_error_context() {
        let path = Path::new("/definitely/not/here/sphere.toml");
        let err = load_simulation_config_from_path(path).expect_err("missing file");
        assert!(format!("{err:#}").contains("/definitely/not/here/sphere.toml"));
    }
}
