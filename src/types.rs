//! Simulation data types.

use serde::{Deserialize, Serialize};

/// Agent population type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Human,
    Mosquito,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Human, Kind::Mosquito];
}

/// Process-unique agent identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

/// Index of an agent in the engine's registry. Only valid until the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentHandle(pub usize);

/// Value pair indexed by population type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerKind<T> {
    pub human: T,
    pub mosquito: T,
}

impl<T: Copy> PerKind<T> {
    pub fn new(human: T, mosquito: T) -> Self {
        Self { human, mosquito }
    }

    pub fn get(&self, kind: Kind) -> T {
        match kind {
            Kind::Human => self.human,
            Kind::Mosquito => self.mosquito,
        }
    }

    pub fn get_mut(&mut self, kind: Kind) -> &mut T {
        match kind {
            Kind::Human => &mut self.human,
            Kind::Mosquito => &mut self.mosquito,
        }
    }
}

/// Infected and total agents of one population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Census {
    pub infected: usize,
    pub total: usize,
}

impl Census {
    /// Infected fraction; zero for an empty population.
    pub fn fraction(&self) -> f64 {
        ratio(self.infected as f64, self.total as f64)
    }
}

/// Quotient with a zero denominator defined as zero.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Record of the simulation at a single day boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Number of completed days.
    pub day: usize,

    /// Infected and total counts per population.
    pub census: PerKind<Census>,

    /// Infected fractions measured in the agent simulation.
    pub simulated: PerKind<f64>,

    /// Infected fractions predicted by the SIR equations.
    pub predicted: PerKind<f64>,
}

impl Record {
    /// Difference between the two models, in percentage points.
    pub fn percentage_difference(&self, kind: Kind) -> f64 {
        100.0 * (self.simulated.get(kind) - self.predicted.get(kind))
    }
}
