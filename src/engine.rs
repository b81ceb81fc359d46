use crate::agent::Agent;
use crate::clock::SimulationClock;
use crate::config::Config;
use crate::population::{IdAllocator, PopulationManager};
use crate::random::RandomSource;
use crate::sir::{SirComparison, SirParams};
use crate::spatial::SpatialIndex;
use crate::types::{AgentHandle, Kind, Record};
use anyhow::{Context, Result, bail};
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Upper bound on frames simulated per day before giving up.
const MAX_FRAMES_PER_DAY: usize = 10_000_000;

/// Simulation engine.
///
/// Holds the configuration, agent population, clock and random number
/// generator, and exposes the control surface used by the driver.
#[derive(Serialize, Deserialize)]
pub struct Engine<R = ChaCha12Rng> {
    cfg: Config,
    population: PopulationManager,
    clock: SimulationClock,
    comparison: SirComparison,
    rng: R,

    #[serde(skip)]
    index: SpatialIndex,
    #[serde(skip)]
    bites: Vec<(AgentHandle, AgentHandle)>,
}

impl<R: RandomSource> Engine<R> {
    /// Create an engine and start a simulation with `cfg`.
    pub fn start(cfg: Config, rng: R) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut engine = Self {
            clock: clock_for(&cfg),
            comparison: SirComparison::new(SirParams::from_config(&cfg)),
            population: PopulationManager::new(IdAllocator::new()),
            cfg,
            rng,
            index: SpatialIndex::new(),
            bites: Vec::new(),
        };
        engine.populate();

        Ok(engine)
    }

    /// Destroy the current population and start again with `cfg`.
    pub fn restart(&mut self, cfg: Config) -> Result<()> {
        cfg.validate().context("failed to validate config")?;

        self.reset();
        let active = self.clock.active();
        self.clock = clock_for(&cfg);
        self.clock.set_active(active);
        self.comparison = SirComparison::new(SirParams::from_config(&cfg));
        self.cfg = cfg;
        self.populate();

        Ok(())
    }

    /// Destroy every agent and rewind the clock and the model comparison.
    pub fn reset(&mut self) {
        self.population.clear();
        self.clock.reset();
        self.comparison.reset();
        self.index.clear();
        self.bites.clear();
        log::info!("simulation reset");
    }

    fn populate(&mut self) {
        self.population.spawn(&self.cfg, &mut self.rng);
        self.population
            .start_day(self.clock.day_length(), &mut self.rng);
        self.comparison.sample(self.population.census());
        log::info!(
            "simulation started with {} humans and {} mosquitos",
            self.cfg.human.count,
            self.cfg.mosquito.count
        );
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn agents(&self) -> &[Agent] {
        self.population.agents()
    }

    pub fn day(&self) -> usize {
        self.clock.day()
    }

    pub fn set_active(&mut self, active: bool) {
        self.clock.set_active(active);
    }

    pub fn set_speed_multiplier(&mut self, speed: f64) {
        self.clock.set_speed_multiplier(speed);
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.clock.speed_multiplier()
    }

    /// Infected fraction measured at the last day boundary.
    pub fn simulated_fraction(&self, kind: Kind) -> f64 {
        self.comparison.simulated().get(kind)
    }

    /// Infected fraction predicted by the SIR equations at the last day boundary.
    pub fn predicted_fraction(&self, kind: Kind) -> f64 {
        self.comparison.predicted().get(kind)
    }

    pub fn record(&self) -> Record {
        Record {
            day: self.clock.day(),
            census: self.population.census(),
            simulated: self.comparison.simulated(),
            predicted: self.comparison.predicted(),
        }
    }

    /// Advance the simulation by one frame of `frame_dt` wall seconds.
    ///
    /// Returns the day record when the frame crosses a day boundary.
    pub fn step(&mut self, frame_dt: f64) -> Option<Record> {
        let dt = self.clock.scale(frame_dt);

        self.index.clear();
        for (i_agt, agt) in self.population.agents().iter().enumerate() {
            self.index
                .insert(AgentHandle(i_agt), agt.kind(), agt.position(), agt.radius());
        }

        let half_extent = self.cfg.world.half_extent;
        self.bites.clear();
        for (i_agt, agt) in self.population.agents_mut().iter_mut().enumerate() {
            if let Some(bite) = agt.tick(dt, &self.index, &mut self.rng) {
                self.bites.push((AgentHandle(i_agt), bite.target));
            }
            agt.movement_mut().clamp_to(half_extent);
        }

        for &(biter, target) in &self.bites {
            if let Some((mosquito, host)) = self.population.pair_mut(biter, target) {
                mosquito
                    .infection_mut()
                    .transmit(host.infection_mut(), &mut self.rng);
            }
        }

        if !self.clock.advance(dt) {
            return None;
        }

        self.population
            .start_day(self.clock.day_length(), &mut self.rng);
        self.comparison.update(self.population.census());

        let record = self.record();
        log::debug!(
            "day {}: simulated {:.4}/{:.4}, predicted {:.4}/{:.4}",
            record.day,
            record.simulated.human,
            record.simulated.mosquito,
            record.predicted.human,
            record.predicted.mosquito
        );
        Some(record)
    }

    /// Step with the configured frame delta until the next day boundary.
    pub fn run_day(&mut self) -> Result<Record> {
        if self.clock.speed_multiplier() <= 0.0 {
            bail!("speed multiplier is zero, the day would never end");
        }
        let frame_dt = self.cfg.output.frame_dt;
        for _ in 0..MAX_FRAMES_PER_DAY {
            if let Some(record) = self.step(frame_dt) {
                return Ok(record);
            }
        }
        bail!("day did not end within {MAX_FRAMES_PER_DAY} frames");
    }

    /// Perform the simulation and save one record per day to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let days_per_file = self.cfg.output.days_per_file;
        for i_day in 0..days_per_file {
            let record = self.run_day().context("failed to run day")?;

            encode::write(&mut writer, &record).context("failed to serialize record")?;

            let progress = 100.0 * (i_day + 1) as f64 / days_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }
}

impl<R: Serialize + DeserializeOwned> Engine<R> {
    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write_named(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

fn clock_for(cfg: &Config) -> SimulationClock {
    SimulationClock::new(cfg.world.day_length, cfg.world.max_speed, cfg.world.speed)
}
