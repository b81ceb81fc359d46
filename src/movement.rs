use crate::geometry::Vec2;
use crate::random::RandomSource;
use crate::spatial::{Locate, Target};
use crate::types::{AgentHandle, Kind};
use serde::{Deserialize, Serialize};

/// Distance covered per second, in units of `scale * move_speed`.
const STEP_RATE: f64 = 1.2;
/// Half-width of the wander target box, in units of `scale * move_speed`.
const WANDER_BOX: f64 = 5.0;
/// Seconds between nearest-target re-resolutions while seeking.
pub const SEEK_POLL_INTERVAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum WanderAction {
    Hold,
    Move,
}

/// Position and motion state of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    position: Vec2,
    scale: f64,
    move_speed: f64,

    delay_timer: f64,
    random_delay: f64,
    action: WanderAction,
    wander_target: Vec2,

    poll_timer: f64,
    seek_target: Option<AgentHandle>,
    attached: Option<AgentHandle>,
}

impl Movement {
    pub fn new(position: Vec2, scale: f64, move_speed: f64) -> Self {
        Self {
            position,
            scale,
            move_speed,
            delay_timer: 0.0,
            random_delay: 0.0,
            action: WanderAction::Hold,
            wander_target: position,
            poll_timer: SEEK_POLL_INTERVAL,
            seek_target: None,
            attached: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Body radius used for arrival and contact tests.
    pub fn radius(&self) -> f64 {
        0.5 * self.scale
    }

    pub fn attached(&self) -> Option<AgentHandle> {
        self.attached
    }

    pub fn clamp_to(&mut self, half_extent: f64) {
        self.position = self.position.clamp_square(half_extent);
    }

    /// Random walk: hold or head for a random nearby point, re-rolled after a random delay.
    pub fn wander<R: RandomSource + ?Sized>(&mut self, dt: f64, rng: &mut R) {
        self.delay_timer += dt;
        if self.delay_timer > self.random_delay {
            self.delay_timer = 0.0;
            self.action = if rng.index(2) == 0 {
                WanderAction::Hold
            } else {
                WanderAction::Move
            };
            self.random_delay = match self.action {
                WanderAction::Hold => rng.range(0.5, 3.0),
                WanderAction::Move => rng.range(0.5, 5.0),
            };
            let half = WANDER_BOX * self.scale * self.move_speed;
            let offset = Vec2::new(rng.range(-half, half), rng.range(-half, half));
            self.wander_target = self.position + offset;
        } else if self.action == WanderAction::Move {
            self.move_to_position(self.wander_target, dt);
        }
    }

    /// Chase the nearest live agent of `kind`, latching on at contact.
    ///
    /// The target is re-resolved every [`SEEK_POLL_INTERVAL`] seconds. Returns
    /// the current target, or `None` when nothing could be found.
    pub fn seek_nearest<L: Locate + ?Sized>(
        &mut self,
        kind: Kind,
        dt: f64,
        locator: &L,
    ) -> Option<Target> {
        self.poll_timer += dt;
        if self.poll_timer >= SEEK_POLL_INTERVAL {
            self.poll_timer = 0.0;
            self.seek_target = locator
                .find_nearest(kind, self.position, self.scale)
                .map(|target| target.handle);
        }

        let Some(target) = self.seek_target.and_then(|handle| locator.locate(handle)) else {
            self.seek_target = None;
            return None;
        };
        self.move_toward(&target, dt, locator);
        Some(target)
    }

    /// Step toward `target`, or ride along with the attached agent if latched.
    pub fn move_toward<L: Locate + ?Sized>(&mut self, target: &Target, dt: f64, locator: &L) {
        if self.attached.is_some() {
            self.follow_attached(locator);
            return;
        }

        self.move_to_position(target.position, dt);
        if self.position.distance(target.position) <= self.radius() + target.radius {
            self.attach(target.handle, target.position);
        }
    }

    /// Lock position onto the attached agent. Detaches if it is gone.
    pub fn follow_attached<L: Locate + ?Sized>(&mut self, locator: &L) -> bool {
        let Some(handle) = self.attached else {
            return false;
        };
        match locator.locate(handle) {
            Some(target) => {
                self.position = target.position;
                true
            }
            None => {
                self.detach();
                false
            }
        }
    }

    fn attach(&mut self, handle: AgentHandle, position: Vec2) {
        self.attached = Some(handle);
        self.position = position;
    }

    /// Release any attachment and forget the seek target.
    pub fn detach(&mut self) {
        self.attached = None;
        self.seek_target = None;
        self.poll_timer = SEEK_POLL_INTERVAL;
    }

    /// Step toward `target`, stopping once within one body radius of it.
    pub fn move_to_position(&mut self, target: Vec2, dt: f64) {
        let delta = target - self.position;
        let dist = delta.length();
        if dist <= self.radius() {
            return;
        }
        let step = (STEP_RATE * self.scale * self.move_speed * dt).min(dist);
        self.position = self.position + delta.normalized() * step;
    }
}
