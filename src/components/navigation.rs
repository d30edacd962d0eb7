use bevy::prelude::*;

/// Ordered waypoint chain a craft is flying, plus the index of the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waypoints {
    /// Waypoints in world coordinates, first to last.
    pub points: Vec<Vec3>,
    /// Index of the waypoint currently being flown toward.
    pub next: usize,
}

impl Waypoints {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, next: 0 }
    }

    /// Returns the waypoint to navigate toward. Once the chain is exhausted
    /// the last waypoint is held.
    pub fn current(&self) -> Option<Vec3> {
        self.points
            .get(self.next)
            .or_else(|| self.points.last())
            .copied()
    }

    /// Moves on to the next waypoint (called when reached).
    pub fn advance(&mut self) {
        if self.next < self.points.len() {
            self.next += 1;
        }
    }

    /// True once the craft has moved beyond the first waypoint.
    pub fn past_first(&self) -> bool {
        self.next > 0
    }

    /// True when every waypoint has been reached.
    pub fn is_finished(&self) -> bool {
        self.next >= self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.next = 0;
    }
}
