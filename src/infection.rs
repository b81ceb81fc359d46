use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// Infection state carried by every agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infection {
    infected: bool,
    /// Chance this agent becomes infected during a transfer.
    transmission_chance: f64,
    /// Chance per daily attempt that an infected agent recovers.
    recovery_chance: f64,
}

impl Infection {
    pub fn new(transmission_chance: f64, recovery_chance: f64, infected: bool) -> Self {
        Self {
            infected,
            transmission_chance,
            recovery_chance,
        }
    }

    pub fn infected(&self) -> bool {
        self.infected
    }

    /// Become infected with probability `transmission_chance`.
    ///
    /// No-op for an agent that is already infected.
    pub fn infect<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        if self.infected {
            return;
        }
        if rng.unit() <= self.transmission_chance {
            self.infected = true;
        }
    }

    /// Attempt to recover; returns `true` when the agent recovered.
    pub fn try_recovery<R: RandomSource + ?Sized>(&mut self, rng: &mut R) -> bool {
        if !self.infected {
            return false;
        }
        if rng.unit() <= self.recovery_chance {
            self.infected = false;
            return true;
        }
        false
    }

    /// Transfer the infection across a contact between `self` and `other`.
    ///
    /// Only the uninfected party can change state, and only when exactly one
    /// of the two is infected. The receiving party rolls against its own
    /// transmission chance.
    pub fn transmit<R: RandomSource + ?Sized>(&mut self, other: &mut Infection, rng: &mut R) {
        match (self.infected, other.infected) {
            (false, true) => self.infect(rng),
            (true, false) => other.infect(rng),
            _ => {}
        }
    }
}
