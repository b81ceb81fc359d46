use crate::config::Config;
use crate::stats::{Accumulator, TimeSeries};
use crate::types::{Kind, Record};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

/// Observable computed over the day records of a run.
pub trait Obs {
    fn update(&mut self, record: &Record);
    fn report(&self) -> Result<toml::Value>;
}

/// Distribution of the simulated and predicted infected fractions.
pub struct Fractions {
    kind: Kind,
    simulated: Accumulator,
    predicted: Accumulator,
}

impl Fractions {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            simulated: Accumulator::new(),
            predicted: Accumulator::new(),
        }
    }
}

impl Obs for Fractions {
    fn update(&mut self, record: &Record) {
        self.simulated.add(record.simulated.get(self.kind));
        self.predicted.add(record.predicted.get(self.kind));
    }

    fn report(&self) -> Result<toml::Value> {
        let mut table = toml::Table::new();
        table.insert(
            "simulated".into(),
            toml::Value::try_from(self.simulated.report())?,
        );
        table.insert(
            "predicted".into(),
            toml::Value::try_from(self.predicted.report())?,
        );
        Ok(toml::Value::Table(table))
    }
}

/// Day-by-day gap between the agent simulation and the SIR prediction.
pub struct Difference {
    kind: Kind,
    time_series: TimeSeries,
}

impl Difference {
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for Difference {
    fn update(&mut self, record: &Record) {
        self.time_series
            .push(record.percentage_difference(self.kind));
    }

    fn report(&self) -> Result<toml::Value> {
        Ok(toml::Value::try_from(self.time_series.report())?)
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_vec: Vec<(String, Box<dyn Obs>)>,
    n_records: usize,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let mut obs_vec: Vec<(String, Box<dyn Obs>)> = Vec::new();
        for kind in Kind::ALL {
            let name = format!("{kind:?}").to_lowercase();
            obs_vec.push((format!("{name}_fractions"), Box::new(Fractions::new(kind))));
            obs_vec.push((format!("{name}_difference"), Box::new(Difference::new(kind))));
        }
        Self {
            cfg,
            obs_vec,
            n_records: 0,
        }
    }

    pub fn add_record(&mut self, record: &Record) {
        for (_, obs) in &mut self.obs_vec {
            obs.update(record);
        }
        self.n_records += 1;
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.days_per_file {
            let record: Record = decode::from_read(&mut reader).context("failed to read record")?;
            self.add_record(&record);
        }
        Ok(())
    }

    pub fn results(&self) -> Result<toml::Table> {
        let mut run = toml::Table::new();
        run.insert("n_days".into(), toml::Value::Integer(self.n_records as i64));

        let mut table = toml::Table::new();
        table.insert("run".into(), toml::Value::Table(run));
        for (name, obs) in &self.obs_vec {
            let report = obs
                .report()
                .with_context(|| format!("failed to report {name}"))?;
            table.insert(name.clone(), report);
        }
        Ok(table)
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let contents =
            toml::to_string_pretty(&self.results()?).context("failed to serialize results")?;
        fs::write(file, contents).with_context(|| format!("failed to write {file:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXAMPLE;
    use crate::types::{Census, PerKind};

    fn record(day: usize, simulated: f64, predicted: f64) -> Record {
        Record {
            day,
            census: PerKind::new(Census::default(), Census::default()),
            simulated: PerKind::new(simulated, 0.0),
            predicted: PerKind::new(predicted, 0.0),
        }
    }

    #[test]
    fn results_summarize_difference() {
        let mut analyzer = Analyzer::new(Config::from_toml(EXAMPLE).unwrap());
        analyzer.add_record(&record(1, 0.30, 0.30));
        analyzer.add_record(&record(2, 0.40, 0.35));
        analyzer.add_record(&record(3, 0.50, 0.40));

        let results = analyzer.results().unwrap();
        assert_eq!(results["run"]["n_days"].as_integer(), Some(3));

        let diff = &results["human_difference"];
        assert!((diff["mean"].as_float().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(diff["i_peak"].as_integer(), Some(2));

        let fractions = &results["human_fractions"];
        assert!((fractions["simulated"]["max"].as_float().unwrap() - 0.5).abs() < 1e-12);
        assert!(results.contains_key("mosquito_difference"));
    }
}
