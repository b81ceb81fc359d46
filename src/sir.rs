//! Discrete SIR prediction run alongside the agent simulation.

use crate::config::Config;
use crate::types::{Census, PerKind, ratio};
use serde::{Deserialize, Serialize};

/// Rates feeding the SIR difference equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SirParams {
    pub bite_rate: f64,
    pub transfer: PerKind<f64>,
    pub recovery: PerKind<f64>,
}

impl SirParams {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            bite_rate: cfg.bite.rate,
            transfer: PerKind::new(cfg.human.transmission_rate, cfg.mosquito.transmission_rate),
            recovery: PerKind::new(cfg.human.recovery_rate, cfg.mosquito.recovery_rate),
        }
    }

    /// One day of the difference equations.
    ///
    /// The human cross term scales with the mosquito-to-human ratio, taken as
    /// zero when there are no humans.
    pub fn step(&self, frac: PerKind<f64>, size: PerKind<usize>) -> PerKind<f64> {
        let (h, m) = (frac.human, frac.mosquito);
        let m_per_h = ratio(size.mosquito as f64, size.human as f64);

        let human = h + m_per_h * self.bite_rate * self.transfer.human * m * (1.0 - h)
            - self.recovery.human * h;
        let mosquito =
            m + self.bite_rate * self.transfer.mosquito * h * (1.0 - m) - self.recovery.mosquito * m;

        PerKind::new(human, mosquito)
    }
}

/// Simulated and predicted infected fractions, updated once per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SirComparison {
    params: SirParams,
    simulated: PerKind<f64>,
    predicted: Option<PerKind<f64>>,
}

impl SirComparison {
    pub fn new(params: SirParams) -> Self {
        Self {
            params,
            simulated: PerKind::default(),
            predicted: None,
        }
    }

    pub fn simulated(&self) -> PerKind<f64> {
        self.simulated
    }

    /// Predicted fractions; equal to the simulated ones until the first advance.
    pub fn predicted(&self) -> PerKind<f64> {
        self.predicted.unwrap_or(self.simulated)
    }

    /// Record the measured fractions without touching the prediction.
    pub fn sample(&mut self, census: PerKind<Census>) {
        self.simulated = PerKind::new(census.human.fraction(), census.mosquito.fraction());
    }

    /// Sample `census` and advance the prediction by one day.
    ///
    /// The first update has nothing to extrapolate from and only seeds the
    /// prediction with the measured fractions.
    pub fn update(&mut self, census: PerKind<Census>) {
        self.sample(census);
        let size = PerKind::new(census.human.total, census.mosquito.total);
        self.predicted = Some(match self.predicted {
            None => self.simulated,
            Some(prev) => self.params.step(prev, size),
        });
    }

    /// Forget all samples, keeping the rates.
    pub fn reset(&mut self) {
        self.simulated = PerKind::default();
        self.predicted = None;
    }
}
