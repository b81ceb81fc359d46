use crate::geometry::Vec2;
use crate::infection::Infection;
use crate::movement::Movement;
use crate::random::RandomSource;
use crate::spatial::Locate;
use crate::types::{AgentHandle, AgentId, Kind};
use serde::{Deserialize, Serialize};

/// Once-per-day trigger, fired at a per-agent offset after each day boundary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyTimer {
    start_of_day: bool,
    delay_timer: f64,
}

impl DailyTimer {
    /// Arm the timer; it fires once `-offset` seconds have elapsed.
    pub fn restart(&mut self, offset: f64) {
        self.start_of_day = true;
        self.delay_timer = offset;
    }

    /// Advance by `dt`; returns `true` exactly once per restart.
    pub fn advance(&mut self, dt: f64) -> bool {
        if !self.start_of_day {
            return false;
        }
        self.delay_timer += dt;
        if self.delay_timer >= 0.0 {
            self.start_of_day = false;
            return true;
        }
        false
    }

    #[cfg(test)]
    pub fn pending(&self) -> bool {
        self.start_of_day
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitePhase {
    Idle,
    Seeking,
    Attached,
}

/// Mosquito bite state machine: Idle -> Seeking -> Attached -> Idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiteCycle {
    phase: BitePhase,
    phase_timer: f64,
    /// Probability per day of starting to seek.
    bite_rate: f64,
    /// Seconds spent attached before the bite completes.
    bite_length: f64,
}

/// Completed bite, to be resolved against the bitten agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bite {
    pub target: AgentHandle,
}

impl BiteCycle {
    pub fn new(bite_rate: f64, bite_length: f64) -> Self {
        Self {
            phase: BitePhase::Idle,
            phase_timer: 0.0,
            bite_rate,
            bite_length,
        }
    }

    pub fn phase(&self) -> BitePhase {
        self.phase
    }

    #[cfg(test)]
    pub fn phase_timer(&self) -> f64 {
        self.phase_timer
    }

    fn tick<L, R>(
        &mut self,
        daily: bool,
        dt: f64,
        movement: &mut Movement,
        locator: &L,
        rng: &mut R,
    ) -> Option<Bite>
    where
        L: Locate + ?Sized,
        R: RandomSource + ?Sized,
    {
        match self.phase {
            BitePhase::Idle => {
                if daily && rng.unit() <= self.bite_rate {
                    movement.detach();
                    self.phase = BitePhase::Seeking;
                } else {
                    movement.wander(dt, rng);
                }
                None
            }
            BitePhase::Seeking => {
                if movement.seek_nearest(Kind::Human, dt, locator).is_none() {
                    movement.wander(dt, rng);
                }
                if movement.attached().is_some() {
                    self.phase = BitePhase::Attached;
                    self.phase_timer = 0.0;
                }
                None
            }
            BitePhase::Attached => {
                let target = movement.attached();
                if !movement.follow_attached(locator) {
                    self.phase = BitePhase::Idle;
                    self.phase_timer = 0.0;
                    return None;
                }
                self.phase_timer += dt;
                if self.phase_timer <= self.bite_length {
                    return None;
                }
                movement.detach();
                self.phase = BitePhase::Idle;
                self.phase_timer = 0.0;
                target.map(|target| Bite { target })
            }
        }
    }
}

/// Behaviour specific to each population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AgentKind {
    Human,
    Mosquito(BiteCycle),
}

/// Simulated individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    kind: AgentKind,
    movement: Movement,
    infection: Infection,
    daily: DailyTimer,
}

impl Agent {
    pub fn new(id: AgentId, kind: AgentKind, movement: Movement, infection: Infection) -> Self {
        Self {
            id,
            kind,
            movement,
            infection,
            daily: DailyTimer::default(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn kind(&self) -> Kind {
        match self.kind {
            AgentKind::Human => Kind::Human,
            AgentKind::Mosquito(_) => Kind::Mosquito,
        }
    }

    pub fn infected(&self) -> bool {
        self.infection.infected()
    }

    pub fn position(&self) -> Vec2 {
        self.movement.position()
    }

    pub fn radius(&self) -> f64 {
        self.movement.radius()
    }

    pub fn bite_phase(&self) -> Option<BitePhase> {
        match &self.kind {
            AgentKind::Human => None,
            AgentKind::Mosquito(cycle) => Some(cycle.phase()),
        }
    }

    #[cfg(test)]
    pub fn bite_cycle(&self) -> Option<&BiteCycle> {
        match &self.kind {
            AgentKind::Human => None,
            AgentKind::Mosquito(cycle) => Some(cycle),
        }
    }

    pub fn infection_mut(&mut self) -> &mut Infection {
        &mut self.infection
    }

    pub fn movement_mut(&mut self) -> &mut Movement {
        &mut self.movement
    }

    /// Arm the daily action for the day that just began.
    pub fn start_day(&mut self, offset: f64) {
        self.daily.restart(offset);
    }

    /// Advance this agent by `dt` simulated seconds.
    ///
    /// Every agent attempts recovery when its daily timer fires. Humans then
    /// wander; mosquitoes run their bite cycle and report a completed bite.
    pub fn tick<L, R>(&mut self, dt: f64, locator: &L, rng: &mut R) -> Option<Bite>
    where
        L: Locate + ?Sized,
        R: RandomSource + ?Sized,
    {
        let daily = self.daily.advance(dt);
        if daily && self.infection.try_recovery(rng) {
            log::trace!("{:?} recovered", self.id);
        }

        match &mut self.kind {
            AgentKind::Human => {
                self.movement.wander(dt, rng);
                None
            }
            AgentKind::Mosquito(cycle) => cycle.tick(daily, dt, &mut self.movement, locator, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceSource;
    use crate::spatial::Target;

    struct FixedLocator(Option<Target>);

    impl Locate for FixedLocator {
        fn find_nearest(&self, _kind: Kind, _from: Vec2, _scale: f64) -> Option<Target> {
            self.0
        }

        fn locate(&self, handle: AgentHandle) -> Option<Target> {
            self.0.filter(|t| t.handle == handle)
        }
    }

    fn mosquito(bite_rate: f64, bite_length: f64, infected: bool) -> Agent {
        Agent::new(
            AgentId(1),
            AgentKind::Mosquito(BiteCycle::new(bite_rate, bite_length)),
            Movement::new(Vec2::ZERO, 2.0, 1.0),
            Infection::new(1.0, 0.0, infected),
        )
    }

    fn human_target() -> Target {
        Target {
            handle: AgentHandle(0),
            position: Vec2::new(0.5, 0.0),
            radius: 5.0,
        }
    }

    #[test]
    fn daily_timer_fires_once_after_offset() {
        let mut timer = DailyTimer::default();
        assert!(!timer.advance(1.0));

        timer.restart(-0.3);
        assert!(!timer.advance(0.0));
        assert!(!timer.advance(0.2));
        assert!(timer.advance(0.2));
        assert!(!timer.advance(0.2));
        assert!(!timer.pending());
    }

    #[test]
    fn bite_cycle_end_to_end() {
        let mut rng = SequenceSource::constant(0.0);
        let locator = FixedLocator(Some(human_target()));
        let mut agt = mosquito(1.0, 1.0, false);
        let mut host = Infection::new(1.0, 0.0, true);

        agt.start_day(-0.1);
        assert_eq!(agt.tick(0.1, &locator, &mut rng), None);
        assert_eq!(agt.bite_phase(), Some(BitePhase::Seeking));

        assert_eq!(agt.tick(0.1, &locator, &mut rng), None);
        assert_eq!(agt.bite_phase(), Some(BitePhase::Attached));
        assert_eq!(agt.position(), Vec2::new(0.5, 0.0));

        for _ in 0..4 {
            assert_eq!(agt.tick(0.25, &locator, &mut rng), None);
            assert_eq!(agt.bite_phase(), Some(BitePhase::Attached));
        }
        let bite = agt.tick(0.25, &locator, &mut rng).unwrap();
        assert_eq!(bite.target, AgentHandle(0));
        assert_eq!(agt.bite_phase(), Some(BitePhase::Idle));
        assert_eq!(agt.bite_cycle().unwrap().phase_timer(), 0.0);
        assert_eq!(agt.movement_mut().attached(), None);

        agt.infection_mut().transmit(&mut host, &mut rng);
        assert!(agt.infected());
    }

    #[test]
    fn idle_mosquito_stays_idle_when_roll_fails() {
        let mut rng = SequenceSource::constant(0.5);
        let locator = FixedLocator(Some(human_target()));
        let mut agt = mosquito(0.2, 1.0, false);

        agt.start_day(-0.1);
        agt.tick(0.1, &locator, &mut rng);
        assert_eq!(agt.bite_phase(), Some(BitePhase::Idle));
    }

    #[test]
    fn seeking_waits_for_daily_trigger() {
        let mut rng = SequenceSource::constant(0.0);
        let locator = FixedLocator(Some(human_target()));
        let mut agt = mosquito(1.0, 1.0, false);

        for _ in 0..10 {
            agt.tick(0.1, &locator, &mut rng);
        }
        assert_eq!(agt.bite_phase(), Some(BitePhase::Idle));
    }

    #[test]
    fn attached_mosquito_returns_idle_when_host_vanishes() {
        let mut rng = SequenceSource::constant(0.0);
        let mut agt = mosquito(1.0, 1.0, false);

        agt.start_day(-0.1);
        agt.tick(0.1, &FixedLocator(Some(human_target())), &mut rng);
        agt.tick(0.1, &FixedLocator(Some(human_target())), &mut rng);
        assert_eq!(agt.bite_phase(), Some(BitePhase::Attached));

        assert_eq!(agt.tick(0.1, &FixedLocator(None), &mut rng), None);
        assert_eq!(agt.bite_phase(), Some(BitePhase::Idle));
    }

    #[test]
    fn human_recovers_on_daily_action() {
        let mut rng = SequenceSource::constant(0.0);
        let locator = FixedLocator(None);
        let mut agt = Agent::new(
            AgentId(0),
            AgentKind::Human,
            Movement::new(Vec2::ZERO, 1.0, 1.0),
            Infection::new(0.5, 1.0, true),
        );
        assert_eq!(agt.bite_phase(), None);

        agt.tick(0.1, &locator, &mut rng);
        assert!(agt.infected());

        agt.start_day(-0.05);
        agt.tick(0.1, &locator, &mut rng);
        assert!(!agt.infected());
    }
}
