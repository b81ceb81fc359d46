use crate::types::Kind;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seed of the random number generator (OS entropy when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Human population parameters.
    pub human: PopulationConfig,
    /// Mosquito population parameters.
    pub mosquito: PopulationConfig,
    /// Mosquito bite parameters.
    pub bite: BiteConfig,

    /// World and clock parameters.
    pub world: WorldConfig,
    /// Headless driver and output parameters.
    pub output: OutputConfig,
}

/// Parameters shared by every population.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of agents spawned.
    pub count: usize,
    /// Fraction of agents infected at start.
    pub infected_fraction: f64,
    /// Daily recovery probability of an infected agent.
    pub recovery_rate: f64,
    /// Probability of becoming infected on an infectious contact.
    pub transmission_rate: f64,
    /// Movement speed multiplier.
    pub move_speed: f64,
    /// Spawn-area density factor.
    pub density: f64,
    /// Body size.
    pub scale: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BiteConfig {
    /// Daily probability of a mosquito starting to seek a human.
    pub rate: f64,
    /// Seconds attached before the bite completes.
    pub length: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Positions are kept within `[-half_extent, half_extent]` on both axes.
    pub half_extent: f64,
    /// Simulated seconds per day.
    pub day_length: f64,
    /// Upper bound of the speed multiplier.
    pub max_speed: f64,
    /// Initial speed multiplier.
    pub speed: f64,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Frame delta supplied by the headless driver, in seconds.
    pub frame_dt: f64,
    /// Day records written per trajectory file.
    pub days_per_file: usize,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn population(&self, kind: Kind) -> &PopulationConfig {
        match kind {
            Kind::Human => &self.human,
            Kind::Mosquito => &self.mosquito,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.human.validate().context("invalid human parameters")?;
        self.mosquito.validate().context("invalid mosquito parameters")?;
        check_num(self.bite.rate, 0.0..=1.0).context("invalid bite rate")?;
        check_num(self.bite.length, 0.0..1e3).context("invalid bite length")?;

        check_num(self.world.half_extent, 1.0..1e7).context("invalid world half extent")?;
        check_num(self.world.day_length, 1e-3..1e6).context("invalid day length")?;
        // With a zero initial speed no day ever ends.
        check_num(self.world.max_speed, 1e-3..1e3).context("invalid maximum speed")?;
        let speed_range = (Bound::Excluded(0.0), Bound::Included(self.world.max_speed));
        check_num(self.world.speed, speed_range).context("invalid speed")?;

        check_num(self.output.frame_dt, 1e-4..1e3).context("invalid frame delta")?;
        check_num(self.output.days_per_file, 1..100_000)
            .context("invalid number of days per file")?;

        Ok(())
    }
}

impl PopulationConfig {
    fn validate(&self) -> Result<()> {
        check_num(self.count, 1..1_000_000).context("invalid population count")?;
        check_num(self.infected_fraction, 0.0..=1.0).context("invalid infected fraction")?;
        check_num(self.recovery_rate, 0.0..=1.0).context("invalid recovery rate")?;
        check_num(self.transmission_rate, 0.0..=1.0).context("invalid transmission rate")?;
        check_num(self.move_speed, 0.0..1e3).context("invalid movement speed")?;
        check_num(self.density, 1e-3..1e3).context("invalid density")?;
        check_num(self.scale, 1e-3..1e4).context("invalid scale")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) const EXAMPLE: &str = r#"
seed = 7

[human]
count = 100
infected_fraction = 0.3
recovery_rate = 0.05
transmission_rate = 0.6
move_speed = 1.0
density = 1.0
scale = 10.0

[mosquito]
count = 50
infected_fraction = 0.1
recovery_rate = 0.02
transmission_rate = 0.5
move_speed = 2.0
density = 1.0
scale = 3.0

[bite]
rate = 0.5
length = 1.0

[world]
half_extent = 2000.0
day_length = 10.0
max_speed = 10.0
speed = 1.0

[output]
frame_dt = 0.05
days_per_file = 4
"#;
