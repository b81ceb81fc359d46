use crate::agent::{Agent, AgentKind, BiteCycle};
use crate::config::{Config, PopulationConfig};
use crate::geometry::Vec2;
use crate::infection::Infection;
use crate::movement::Movement;
use crate::random::RandomSource;
use crate::types::{AgentHandle, AgentId, Census, Kind, PerKind};
use serde::{Deserialize, Serialize};

/// Hands out monotonically increasing agent identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> AgentId {
        let id = AgentId(self.next);
        self.next += 1;
        id
    }
}

/// Registry of live agents.
///
/// Agents are created in one batch per run and destroyed together on reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationManager {
    ids: IdAllocator,
    agents: Vec<Agent>,
}

impl PopulationManager {
    pub fn new(ids: IdAllocator) -> Self {
        Self {
            ids,
            agents: Vec::new(),
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Destroy every agent. Identifiers are not handed out again.
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    /// Spawn both populations described by `cfg`, replacing any previous ones.
    pub fn spawn<R: RandomSource + ?Sized>(&mut self, cfg: &Config, rng: &mut R) {
        self.clear();
        let n_agt = cfg.human.count + cfg.mosquito.count;
        self.agents.reserve(n_agt);

        for kind in Kind::ALL {
            let pop = cfg.population(kind);
            let infected = choose_infected(pop, rng);
            let half = (pop.density * pop.scale * (pop.count as f64).sqrt())
                .min(cfg.world.half_extent);

            for is_infected in infected {
                let position = Vec2::new(rng.range(-half, half), rng.range(-half, half));
                let agent_kind = match kind {
                    Kind::Human => AgentKind::Human,
                    Kind::Mosquito => {
                        AgentKind::Mosquito(BiteCycle::new(cfg.bite.rate, cfg.bite.length))
                    }
                };
                self.agents.push(Agent::new(
                    self.ids.allocate(),
                    agent_kind,
                    Movement::new(position, pop.scale, pop.move_speed),
                    Infection::new(pop.transmission_rate, pop.recovery_rate, is_infected),
                ));
            }
        }

        log::info!("spawned {} agents", self.agents.len());
    }

    /// Arm every agent's daily action at a random offset in `[-day_length / 2, 0)`.
    pub fn start_day<R: RandomSource + ?Sized>(&mut self, day_length: f64, rng: &mut R) {
        for agent in &mut self.agents {
            agent.start_day(rng.range(-0.5 * day_length, 0.0));
        }
    }

    pub fn census(&self) -> PerKind<Census> {
        let mut census = PerKind::<Census>::default();
        for agent in &self.agents {
            let entry = census.get_mut(agent.kind());
            entry.total += 1;
            if agent.infected() {
                entry.infected += 1;
            }
        }
        census
    }

    /// Mutable access to two distinct agents.
    pub fn pair_mut(
        &mut self,
        a: AgentHandle,
        b: AgentHandle,
    ) -> Option<(&mut Agent, &mut Agent)> {
        let (i, j) = (a.0, b.0);
        if i == j || i.max(j) >= self.agents.len() {
            return None;
        }
        if i < j {
            let (head, tail) = self.agents.split_at_mut(j);
            Some((&mut head[i], &mut tail[0]))
        } else {
            let (head, tail) = self.agents.split_at_mut(i);
            Some((&mut tail[0], &mut head[j]))
        }
    }
}

/// Infection flags for one population, with exactly `round(fraction * count)` set.
fn choose_infected<R: RandomSource + ?Sized>(pop: &PopulationConfig, rng: &mut R) -> Vec<bool> {
    let n_agt = pop.count;
    let n_inf = ((pop.infected_fraction * n_agt as f64).round() as usize).min(n_agt);

    let mut infected = vec![false; n_agt];
    for slot in rng.sample_indices(n_agt, n_inf) {
        infected[slot] = true;
    }
    infected
}
