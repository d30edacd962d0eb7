//! Station-side docking arbitration.
//!
//! Each station owns one [`DockingCoordinator`]: a single-lane dock for small
//! craft serialized by a FIFO queue, and a fixed pool of mooring points for
//! large craft. All queue and pool state is private; the methods below are
//! the only way to change it, so the exclusivity rules always hold:
//! - at most one craft occupies the dock's approach slot, and a queued craft
//!   is never also the slot occupant;
//! - a craft holds at most one mooring point station-wide.

use bevy::prelude::*;
use std::collections::VecDeque;

use crate::components::{FactionId, ShipSize};
use crate::resources::{AutopilotConfig, FactionRegistry};

/// Why a docking request or approach failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DockingError {
    /// The craft's faction is hostile to the station's.
    #[error("docking forbidden by faction relations")]
    DockingForbidden,
    /// The small-craft dock has no room left in its queue. Retry later.
    #[error("dock queue is full")]
    QueueFull,
    /// Every mooring point is claimed.
    #[error("no mooring point available")]
    MooringUnavailable,
    /// The craft held the approach slot for longer than the timeout.
    #[error("docking approach timed out")]
    DockingExpired,
}

impl DockingError {
    /// Only a full queue is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, DockingError::QueueFull)
    }
}

/// State of the dock's single approach slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockSlot {
    Empty,
    /// A craft has been cleared to fly the dock lane.
    Approaching { craft: Entity, remaining_ticks: u32 },
}

/// FIFO of small craft waiting for the dock lane.
#[derive(Debug, Clone)]
pub struct DockingQueue {
    waiting: VecDeque<Entity>,
    slot: DockSlot,
    /// Ticks until a departing craft has left the lane. While non-zero
    /// nobody is admitted and the approach countdown is paused.
    clearing_ticks: u32,
    timeout_ticks: u32,
    /// Queued craft plus the slot occupant.
    capacity: usize,
}

impl DockingQueue {
    pub fn new(timeout_ticks: u32, capacity: usize) -> Self {
        Self {
            waiting: VecDeque::new(),
            slot: DockSlot::Empty,
            clearing_ticks: 0,
            timeout_ticks,
            capacity,
        }
    }

    /// The craft currently cleared to approach.
    pub fn occupant(&self) -> Option<Entity> {
        match self.slot {
            DockSlot::Approaching { craft, .. } => Some(craft),
            _ => None,
        }
    }

    pub fn slot(&self) -> DockSlot {
        self.slot
    }

    /// Whether an undocking craft is still flying out of the lane.
    pub fn is_clearing(&self) -> bool {
        self.clearing_ticks > 0
    }

    /// Craft waiting behind the slot, head first.
    pub fn waiting(&self) -> impl Iterator<Item = Entity> + '_ {
        self.waiting.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }

    pub fn contains(&self, craft: Entity) -> bool {
        self.occupant() == Some(craft) || self.waiting.contains(&craft)
    }

    fn enqueue(&mut self, craft: Entity) -> Result<(), DockingError> {
        if self.contains(craft) {
            return Ok(());
        }
        let in_use = self.waiting.len() + usize::from(self.occupant().is_some());
        if in_use >= self.capacity {
            return Err(DockingError::QueueFull);
        }
        self.waiting.push_back(craft);
        Ok(())
    }

    /// Drops `craft` from the FIFO or the slot. Returns true if it was present.
    fn remove(&mut self, craft: Entity) -> bool {
        if self.occupant() == Some(craft) {
            self.slot = DockSlot::Empty;
            return true;
        }
        match self.waiting.iter().position(|c| *c == craft) {
            Some(idx) => {
                self.waiting.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Blocks the lane for `ticks`, whether or not a craft is already
    /// cleared in.
    fn begin_clearing(&mut self, ticks: u32) {
        self.clearing_ticks = self.clearing_ticks.max(ticks);
    }

    /// One tick: counts the slot down, then admits the queue head if the
    /// slot is free and the lane is clear. Returns the craft whose approach
    /// expired, if any.
    fn advance(&mut self) -> Option<Entity> {
        if self.clearing_ticks > 0 {
            self.clearing_ticks -= 1;
            if self.clearing_ticks > 0 {
                return None;
            }
        }

        let mut expired = None;
        self.slot = match self.slot {
            DockSlot::Approaching {
                craft,
                remaining_ticks,
            } if remaining_ticks <= 1 => {
                expired = Some(craft);
                DockSlot::Empty
            }
            DockSlot::Approaching {
                craft,
                remaining_ticks,
            } => DockSlot::Approaching {
                craft,
                remaining_ticks: remaining_ticks - 1,
            },
            DockSlot::Empty => DockSlot::Empty,
        };

        if self.slot == DockSlot::Empty {
            if let Some(head) = self.waiting.pop_front() {
                self.slot = DockSlot::Approaching {
                    craft: head,
                    remaining_ticks: self.timeout_ticks,
                };
            }
        }

        expired
    }
}

/// Exclusive docking slot for one large craft.
#[derive(Debug, Clone)]
pub struct MooringPoint {
    occupant: Option<Entity>,
    waypoints: Vec<Vec3>,
}

impl MooringPoint {
    pub fn new(waypoints: Vec<Vec3>) -> Self {
        Self {
            occupant: None,
            waypoints,
        }
    }

    pub fn occupant(&self) -> Option<Entity> {
        self.occupant
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }
}

/// A craft that has completed docking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockedCraft {
    pub craft: Entity,
    /// Mooring index for large craft; `None` for the internal dock.
    pub mooring: Option<usize>,
    /// Ticks until the station sends the craft back out, if scheduled.
    pub auto_undock_in: Option<u32>,
}

/// What a station tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinatorTick {
    /// Craft whose dock approach timed out; its order must be finished.
    pub expired: Option<Entity>,
    /// Docked craft whose auto-undock countdown ran out.
    pub undock_due: Vec<Entity>,
}

/// Where an undocking craft leaves from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Undock {
    pub exit_point: Vec3,
    pub exit_direction: Vec3,
}

/// Waypoint geometry of a station's dock lane and mooring points.
#[derive(Debug, Clone, Default)]
pub struct DockLayout {
    /// Lane for small craft, outermost first; the last point is the dock mouth.
    pub dock_lane: Vec<Vec3>,
    /// One approach chain per mooring point, outermost first.
    pub moorings: Vec<Vec<Vec3>>,
}

impl DockLayout {
    /// Station with a lane along +Z and `mooring_count` moorings evenly
    /// spaced on a ring in the XZ plane.
    pub fn standard(center: Vec3, station_radius: f32, mooring_count: usize) -> Self {
        let dock_lane = vec![
            center + Vec3::Z * (station_radius + 600.0),
            center + Vec3::Z * (station_radius + 200.0),
            center + Vec3::Z * station_radius,
        ];

        let moorings = (0..mooring_count)
            .map(|i| {
                // Offset by half a step so no mooring sits on the dock lane.
                let angle = std::f32::consts::TAU * (i as f32 + 0.5) / mooring_count as f32;
                let dir = Vec3::new(angle.sin(), 0.0, angle.cos());
                vec![
                    center + dir * (station_radius + 900.0),
                    center + dir * (station_radius + 400.0),
                    center + dir * (station_radius + 150.0),
                ]
            })
            .collect();

        Self {
            dock_lane,
            moorings,
        }
    }
}

/// Docking aggregate owned by one station entity.
#[derive(Component, Debug, Clone)]
pub struct DockingCoordinator {
    faction: FactionId,
    queue: DockingQueue,
    dock_lane: Vec<Vec3>,
    moorings: Vec<MooringPoint>,
    docked: Vec<DockedCraft>,
}

impl DockingCoordinator {
    pub fn new(faction: FactionId, layout: DockLayout, config: &AutopilotConfig) -> Self {
        Self {
            faction,
            queue: DockingQueue::new(
                config.ticks(config.dock_approach_timeout_secs),
                config.dock_queue_capacity,
            ),
            dock_lane: layout.dock_lane,
            moorings: layout.moorings.into_iter().map(MooringPoint::new).collect(),
            docked: Vec::new(),
        }
    }

    pub fn faction(&self) -> FactionId {
        self.faction
    }

    pub fn queue(&self) -> &DockingQueue {
        &self.queue
    }

    pub fn moorings(&self) -> &[MooringPoint] {
        &self.moorings
    }

    pub fn docked(&self) -> &[DockedCraft] {
        &self.docked
    }

    pub fn dock_lane(&self) -> &[Vec3] {
        &self.dock_lane
    }

    pub fn is_docked(&self, craft: Entity) -> bool {
        self.docked.iter().any(|d| d.craft == craft)
    }

    /// Number of mooring points with an occupant.
    pub fn occupied_moorings(&self) -> usize {
        self.moorings.iter().filter(|m| m.occupant.is_some()).count()
    }

    fn mooring_of(&self, craft: Entity) -> Option<usize> {
        self.moorings.iter().position(|m| m.occupant == Some(craft))
    }

    /// Asks for permission to dock and returns the waypoint chain to fly.
    ///
    /// Small craft are queued (permission to leave the queue comes later, see
    /// [`Self::may_proceed`]). Large craft claim the first free mooring point
    /// or are rejected outright. Repeated requests by the same craft return
    /// the chain it already holds.
    pub fn request_docking(
        &mut self,
        craft: Entity,
        size: ShipSize,
        faction: FactionId,
        factions: &FactionRegistry,
    ) -> Result<Vec<Vec3>, DockingError> {
        if factions.relation(faction, self.faction) < 0.0 {
            return Err(DockingError::DockingForbidden);
        }

        match size {
            ShipSize::Small => {
                self.queue.enqueue(craft)?;
                Ok(self.dock_lane.clone())
            }
            ShipSize::Large => {
                if let Some(idx) = self.mooring_of(craft) {
                    return Ok(self.moorings[idx].waypoints.clone());
                }
                let Some(free) = self.moorings.iter_mut().find(|m| m.occupant.is_none()) else {
                    return Err(DockingError::MooringUnavailable);
                };
                free.occupant = Some(craft);
                Ok(free.waypoints.clone())
            }
        }
    }

    /// Whether `craft` may leave its holding position and fly the final
    /// approach. Large craft hold an exclusive mooring and always may. The
    /// slot occupant holds while a departing craft clears the lane.
    pub fn may_proceed(&self, craft: Entity, size: ShipSize) -> bool {
        match size {
            ShipSize::Large => true,
            ShipSize::Small => self.queue.occupant() == Some(craft) && !self.queue.is_clearing(),
        }
    }

    /// Withdraws any pending claim `craft` holds: its queue entry, the
    /// approach slot, or an undocked mooring claim. Docked craft keep their
    /// berth until [`Self::undock_ship`].
    pub fn release(&mut self, craft: Entity) -> bool {
        if self.is_docked(craft) {
            return false;
        }
        let mut released = self.queue.remove(craft);
        if let Some(idx) = self.mooring_of(craft) {
            self.moorings[idx].occupant = None;
            released = true;
        }
        released
    }

    /// Point whose proximity counts as physical arrival for `craft`.
    pub fn contact_point(&self, craft: Entity) -> Option<Vec3> {
        if self.is_docked(craft) {
            return None;
        }
        if self.queue.occupant() == Some(craft) {
            return self.dock_lane.last().copied();
        }
        self.mooring_of(craft)
            .and_then(|idx| self.moorings[idx].waypoints.last().copied())
    }

    /// Arrival at the dock mouth. Accepted only from the slot occupant.
    pub fn on_dock_contact(&mut self, craft: Entity) -> bool {
        if self.queue.occupant() != Some(craft) {
            return false;
        }
        self.queue.slot = DockSlot::Empty;
        self.docked.push(DockedCraft {
            craft,
            mooring: None,
            auto_undock_in: None,
        });
        true
    }

    /// Arrival at a claimed mooring point.
    pub fn on_mooring_contact(&mut self, craft: Entity) -> bool {
        if self.is_docked(craft) {
            return false;
        }
        let Some(idx) = self.mooring_of(craft) else {
            return false;
        };
        self.docked.push(DockedCraft {
            craft,
            mooring: Some(idx),
            auto_undock_in: None,
        });
        true
    }

    /// Craft cleared to fly in but not yet docked.
    pub fn inbound(&self) -> Vec<Entity> {
        self.queue
            .occupant()
            .into_iter()
            .chain(self.moorings.iter().filter_map(|m| m.occupant))
            .filter(|craft| !self.is_docked(*craft))
            .collect()
    }

    /// Docks `craft` if it is within `radius` of its contact point.
    pub fn try_contact(&mut self, craft: Entity, position: Vec3, radius: f32) -> bool {
        let Some(point) = self.contact_point(craft) else {
            return false;
        };
        if position.distance(point) > radius {
            return false;
        }
        if self.queue.occupant() == Some(craft) {
            self.on_dock_contact(craft)
        } else {
            self.on_mooring_contact(craft)
        }
    }

    /// Arms the automatic undock countdown for a docked craft.
    pub fn schedule_undock(&mut self, craft: Entity, ticks: u32) {
        if let Some(entry) = self.docked.iter_mut().find(|d| d.craft == craft) {
            entry.auto_undock_in = Some(ticks.max(1));
        }
    }

    /// Releases a docked craft. Frees its mooring, or blocks the dock lane
    /// for `clearing_ticks` so no inbound craft flies it meanwhile.
    pub fn undock_ship(&mut self, craft: Entity, clearing_ticks: u32) -> Option<Undock> {
        let idx = self.docked.iter().position(|d| d.craft == craft)?;
        let entry = self.docked.remove(idx);

        let chain: &[Vec3] = match entry.mooring {
            Some(m) => {
                self.moorings[m].occupant = None;
                &self.moorings[m].waypoints
            }
            None => {
                self.queue.begin_clearing(clearing_ticks);
                &self.dock_lane
            }
        };

        let exit_point = chain.last().copied().unwrap_or_default();
        let outward = chain.first().copied().unwrap_or(exit_point) - exit_point;
        Some(Undock {
            exit_point,
            exit_direction: outward.try_normalize().unwrap_or(Vec3::Z),
        })
    }

    /// Advances timers by one tick.
    pub fn advance(&mut self) -> CoordinatorTick {
        let expired = self.queue.advance();

        let mut undock_due = Vec::new();
        for entry in &mut self.docked {
            if let Some(remaining) = entry.auto_undock_in.as_mut() {
                if *remaining <= 1 {
                    entry.auto_undock_in = None;
                    undock_due.push(entry.craft);
                } else {
                    *remaining -= 1;
                }
            }
        }

        CoordinatorTick {
            expired,
            undock_due,
        }
    }
}
