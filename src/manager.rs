use crate::analysis::Analyzer;
use crate::config::Config;
use crate::engine::Engine;
use crate::random::generator;
use crate::types::Kind;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Owner of a simulation directory: its runs, results and named presets.
pub struct Manager {
    sim_dir: PathBuf,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();
        if !sim_dir.is_dir() {
            bail!("{sim_dir:?} is not a directory");
        }
        Ok(Self { sim_dir })
    }

    /// Start a new run from the directory config or from a named preset.
    pub fn create_run(&self, preset: Option<&str>) -> Result<()> {
        let cfg = match preset {
            None => Config::from_file(self.config_file()).context("failed to load config")?,
            Some(name) => self.load_preset(name)?,
        };
        log::info!("{cfg:#?}");

        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;
        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let run_config_file = self.run_config_file(run_idx);
        fs::write(&run_config_file, cfg.to_toml()?)
            .with_context(|| format!("failed to write {run_config_file:?}"))?;

        let rng = generator(cfg.seed).context("failed to seed generator")?;
        let mut engine = Engine::start(cfg, rng).context("failed to start engine")?;

        self.simulate(run_idx, 0, &mut engine)
    }

    /// Continue a run from its last checkpoint.
    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let cfg = Config::from_file(self.run_config_file(run_idx))
            .context("failed to load run config")?;

        let file_idx = self
            .count_trajectory_files(run_idx)
            .context("failed to count trajectory files")?;

        let checkpoint_file = self.checkpoint_file(run_idx);
        let mut engine: Engine = Engine::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if engine.cfg() != &cfg {
            bail!("checkpoint config differs from the run config");
        }
        log::info!("loaded {checkpoint_file:?}");

        self.simulate(run_idx, file_idx, &mut engine)
    }

    fn simulate(&self, run_idx: usize, file_idx: usize, engine: &mut Engine) -> Result<()> {
        engine
            .perform_simulation(self.trajectory_file(run_idx, file_idx))
            .context("failed to perform simulation")?;

        for kind in Kind::ALL {
            log::info!(
                "{kind:?} infected fraction after day {}: simulated {:.4}, predicted {:.4}",
                engine.day(),
                engine.simulated_fraction(kind),
                engine.predicted_fraction(kind)
            );
        }

        engine
            .save_checkpoint(self.checkpoint_file(run_idx))
            .context("failed to save checkpoint")?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let cfg = Config::from_file(self.run_config_file(run_idx))
                .context("failed to load run config")?;
            let mut analyzer = Analyzer::new(cfg);

            let n_files = self
                .count_trajectory_files(run_idx)
                .context("failed to count trajectory files")?;
            for file_idx in 0..n_files {
                analyzer
                    .add_file(self.trajectory_file(run_idx, file_idx))
                    .context("failed to add file")?;
            }

            let results_file = self.results_file(run_idx);
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("wrote {results_file:?}");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs()? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    /// Store the directory config under `name`, replacing any preset of that name.
    pub fn save_preset(&self, name: &str) -> Result<()> {
        check_preset_name(name)?;
        let cfg = Config::from_file(self.config_file()).context("failed to load config")?;

        let presets_dir = self.presets_dir();
        fs::create_dir_all(&presets_dir)
            .with_context(|| format!("failed to create {presets_dir:?}"))?;

        let preset_file = self.preset_file(name);
        fs::write(&preset_file, cfg.to_toml()?)
            .with_context(|| format!("failed to write {preset_file:?}"))?;
        log::info!("saved preset {name:?}");

        Ok(())
    }

    pub fn load_preset(&self, name: &str) -> Result<Config> {
        check_preset_name(name)?;
        let preset_file = self.preset_file(name);
        if !preset_file.is_file() {
            bail!("preset {name:?} does not exist");
        }
        Config::from_file(&preset_file).with_context(|| format!("failed to load preset {name:?}"))
    }

    /// Names of all stored presets, sorted.
    pub fn list_presets(&self) -> Result<Vec<String>> {
        let pattern = self.presets_dir().join("*.toml");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut names: Vec<String> = glob(pattern)
            .context("failed to glob presets")?
            .filter_map(Result::ok)
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn count_trajectory_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("trajectory-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob trajectory files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn config_file(&self) -> PathBuf {
        self.sim_dir.join("config.toml")
    }

    fn presets_dir(&self) -> PathBuf {
        self.sim_dir.join("presets")
    }

    fn preset_file(&self, name: &str) -> PathBuf {
        self.presets_dir().join(format!("{name}.toml"))
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn run_config_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("config.toml")
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn trajectory_file(&self, run_idx: usize, file_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("trajectory-{file_idx:04}.msgpack"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.toml")
    }
}

fn check_preset_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("preset name must not be empty");
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        bail!("preset name {name:?} contains invalid character {c:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXAMPLE;

    fn sim_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vectorsim-{name}-{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), EXAMPLE).unwrap();
        dir
    }

    #[test]
    fn presets_round_trip() {
        let dir = sim_dir("presets");
        let mgr = Manager::new(&dir).unwrap();

        assert!(mgr.list_presets().unwrap().is_empty());
        mgr.save_preset("wet-season").unwrap();
        mgr.save_preset("baseline").unwrap();
        assert_eq!(mgr.list_presets().unwrap(), vec!["baseline", "wet-season"]);

        let cfg = mgr.load_preset("baseline").unwrap();
        assert_eq!(cfg, Config::from_toml(EXAMPLE).unwrap());
        assert!(mgr.load_preset("missing").is_err());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn preset_names_are_checked() {
        assert!(check_preset_name("dry_2024").is_ok());
        assert!(check_preset_name("").is_err());
        assert!(check_preset_name("../escape").is_err());
    }

    #[test]
    fn invalid_config_leaves_no_run() {
        let dir = sim_dir("stalled");
        let text = EXAMPLE.replace("\nspeed = 1.0\n", "\nspeed = 0.0\n");
        fs::write(dir.join("config.toml"), text).unwrap();
        let mgr = Manager::new(&dir).unwrap();

        assert!(mgr.create_run(None).is_err());
        assert_eq!(mgr.count_run_dirs().unwrap(), 0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn create_resume_analyze_clean() {
        let dir = sim_dir("workflow");
        let mgr = Manager::new(&dir).unwrap();

        mgr.create_run(None).unwrap();
        mgr.resume_run(0).unwrap();
        assert_eq!(mgr.count_trajectory_files(0).unwrap(), 2);

        mgr.analyze_sim().unwrap();
        let results = fs::read_to_string(mgr.results_file(0)).unwrap();
        let results: toml::Table = toml::from_str(&results).unwrap();
        assert_eq!(results["run"]["n_days"].as_integer(), Some(8));

        mgr.clean_sim().unwrap();
        assert_eq!(mgr.count_run_dirs().unwrap(), 0);

        fs::remove_dir_all(&dir).ok();
    }
}
