//! Nearest-neighbour search over agent positions.
//!
//! The index is a flat snapshot rebuilt once per engine step, so agents moving
//! during the step never see a half-updated index.

use crate::geometry::Vec2;
use crate::types::{AgentHandle, Kind};

/// Initial search radius and growth step, in units of the searcher's scale.
const SEARCH_STEP: f64 = 5.0;
/// Hard cap on the search radius, in units of the searcher's scale.
const SEARCH_CAP: f64 = 100.0;

/// Resolved position of another agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub handle: AgentHandle,
    pub position: Vec2,
    pub radius: f64,
}

/// Spatial queries the movement controller needs.
pub trait Locate {
    /// Nearest agent of `kind` as seen from `from` (see [`SpatialIndex::find_nearest`]).
    fn find_nearest(&self, kind: Kind, from: Vec2, scale: f64) -> Option<Target>;

    /// Current position of a specific agent, if it is still live.
    fn locate(&self, handle: AgentHandle) -> Option<Target>;
}

#[derive(Debug, Clone)]
struct Entry {
    kind: Kind,
    target: Target,
}

#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    entries: Vec<Entry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Add an agent. Handles are expected to be dense registry indices.
    pub fn insert(&mut self, handle: AgentHandle, kind: Kind, position: Vec2, radius: f64) {
        self.entries.push(Entry {
            kind,
            target: Target {
                handle,
                position,
                radius,
            },
        });
    }

    pub fn count(&self, kind: Kind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Expanding-radius nearest-neighbour search.
    ///
    /// The radius starts at `SEARCH_STEP * scale` and grows by the same amount
    /// until some agent of `kind` overlaps the search circle (its body circle
    /// intersects it), up to `SEARCH_CAP * scale`. Among the agents found at
    /// the first non-empty radius the one with the smallest centre distance
    /// wins, earliest inserted on exact ties.
    ///
    /// This is approximate: a large-bodied agent overlapping the circle edge
    /// can be returned even though a smaller agent with a nearer centre sits
    /// just outside. Downstream tuning relies on this behaviour.
    pub fn find_nearest(&self, kind: Kind, from: Vec2, scale: f64) -> Option<Target> {
        if self.count(kind) == 0 {
            return None;
        }

        let step = SEARCH_STEP * scale;
        if !(step > 0.0) {
            log::error!("invalid search scale {scale}");
            return None;
        }

        let n_steps = (SEARCH_CAP / SEARCH_STEP) as usize;
        for i_step in 1..=n_steps {
            let radius = step * i_step as f64;

            let mut best: Option<(f64, &Target)> = None;
            for entry in self.entries.iter().filter(|e| e.kind == kind) {
                let dist = from.distance(entry.target.position);
                if dist - entry.target.radius > radius {
                    continue;
                }
                if best.is_none_or(|(best_dist, _)| dist < best_dist) {
                    best = Some((dist, &entry.target));
                }
            }

            if let Some((_, target)) = best {
                return Some(*target);
            }
        }

        log::error!(
            "no {kind:?} found within {:.1} of ({:.1}, {:.1})",
            SEARCH_CAP * scale,
            from.x,
            from.y
        );
        None
    }
}

impl Locate for SpatialIndex {
    fn find_nearest(&self, kind: Kind, from: Vec2, scale: f64) -> Option<Target> {
        SpatialIndex::find_nearest(self, kind, from, scale)
    }

    fn locate(&self, handle: AgentHandle) -> Option<Target> {
        // Entries are inserted in handle order by the engine.
        match self.entries.get(handle.0) {
            Some(entry) if entry.target.handle == handle => Some(entry.target),
            _ => self
                .entries
                .iter()
                .find(|e| e.target.handle == handle)
                .map(|e| e.target),
        }
    }
}
