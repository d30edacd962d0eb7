//! Order types for autopilot-controlled craft.
//!
//! An [`OrderController`](super::OrderController) owns at most one order at a
//! time. The per-tick behavior of each variant lives in
//! `systems::order_execution`; this module only holds their state.

use bevy::prelude::*;
use std::fmt;

use super::cargo::Ware;
use super::docking::DockingError;

/// What an order reports after each update.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderStatus {
    Running,
    Complete,
    Abort(AbortReason),
}

/// Why an order was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AbortReason {
    #[error(transparent)]
    Docking(#[from] DockingError),
    #[error("target no longer exists")]
    TargetLost,
    #[error("no station is selling at a good price")]
    NoBuyStation,
    #[error("no station is buying the cargo")]
    NoSellStation,
}

/// Where a move order is headed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
    Position(Vec3),
    /// Tracks an entity's position every tick.
    Entity(Entity),
}

/// Stage of a docking approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockState {
    /// Holding short of the lane until the station clears us in.
    QueueWait,
    #[default]
    DockingApproach,
    /// Past the first waypoint. Obstacle probes are off from here on.
    FinalApproach,
}

/// Progress of the docking request itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DockRequest {
    /// Not asked yet; asked on the next update.
    #[default]
    Pending,
    /// The queue was full; ask again when this reaches zero.
    RetryIn(u32),
    /// The station handed out a waypoint chain.
    Granted,
}

/// Approach to one station, shared by docking and trading.
#[derive(Debug, Clone, PartialEq)]
pub struct DockApproach {
    pub station: Entity,
    pub state: DockState,
    pub request: DockRequest,
}

impl DockApproach {
    pub fn new(station: Entity) -> Self {
        Self {
            station,
            state: DockState::default(),
            request: DockRequest::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockOrder {
    pub approach: DockApproach,
}

/// Leg of the trade loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TradePhase {
    #[default]
    AcquireCargo,
    SellCargo,
}

/// Station chosen for the current leg.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDestination {
    pub station: Entity,
    pub ware: Ware,
    pub approach: DockApproach,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeOrder {
    pub phase: TradePhase,
    pub destination: Option<TradeDestination>,
}

/// Outcome of one docked trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeReceipt {
    pub station: Entity,
    pub ware: Ware,
    pub quantity: u32,
    /// Negative when buying.
    pub credits_delta: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatrolOrder {
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdleOrder {
    /// Where the craft was when the order was issued.
    pub anchor: Vec3,
    pub point: Option<Vec3>,
}

/// An order that can be assigned to an autopilot.
#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    Dock(DockOrder),
    Trade(TradeOrder),
    Attack { target: Entity },
    /// Engage whichever hostile is nearest, re-evaluated every tick.
    AttackAll { target: Option<Entity> },
    Patrol(PatrolOrder),
    Follow { target: Entity },
    Idle(IdleOrder),
    MoveToPoint { target: MoveTarget },
    MoveWaypoints { points: Vec<Vec3> },
}

impl Order {
    pub fn dock(station: Entity) -> Self {
        Order::Dock(DockOrder {
            approach: DockApproach::new(station),
        })
    }

    pub fn trade() -> Self {
        Order::Trade(TradeOrder::default())
    }

    pub fn idle(anchor: Vec3) -> Self {
        Order::Idle(IdleOrder { anchor, point: None })
    }

    pub fn patrol(points: Vec<Vec3>) -> Self {
        Order::Patrol(PatrolOrder { points })
    }

    /// Human-readable name for logs and notices.
    pub fn name(&self) -> &'static str {
        match self {
            Order::Dock(_) => "Dock",
            Order::Trade(_) => "Trade",
            Order::Attack { .. } => "Attack",
            Order::AttackAll { .. } => "Attack all",
            Order::Patrol(_) => "Patrol",
            Order::Follow { .. } => "Follow",
            Order::Idle(_) => "Idle",
            Order::MoveToPoint { .. } => "Move to point",
            Order::MoveWaypoints { .. } => "Move waypoints",
        }
    }

    /// True for orders that negotiate with a station.
    pub fn is_docking(&self) -> bool {
        matches!(self, Order::Dock(_) | Order::Trade(_))
    }

    /// The docking approach in progress, if any.
    pub fn approach(&self) -> Option<&DockApproach> {
        match self {
            Order::Dock(dock) => Some(&dock.approach),
            Order::Trade(trade) => trade.destination.as_ref().map(|d| &d.approach),
            _ => None,
        }
    }

    /// Station this order is trying to dock at.
    pub fn docking_target(&self) -> Option<Entity> {
        self.approach().map(|a| a.station)
    }

    /// True while flying the final waypoints of a dock lane or mooring.
    pub fn in_final_approach(&self) -> bool {
        self.approach()
            .is_some_and(|a| a.state == DockState::FinalApproach)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docking_queries() {
        let station = Entity::from_raw(4);
        let mut order = Order::dock(station);
        assert!(order.is_docking());
        assert_eq!(order.docking_target(), Some(station));
        assert!(!order.in_final_approach());

        if let Order::Dock(dock) = &mut order {
            dock.approach.state = DockState::FinalApproach;
        }
        assert!(order.in_final_approach());

        let trade = Order::trade();
        assert!(trade.is_docking());
        assert_eq!(trade.docking_target(), None);
        assert!(!Order::idle(Vec3::ZERO).is_docking());
    }

    #[test]
    fn test_abort_reason_wraps_docking_error() {
        let reason = AbortReason::from(DockingError::MooringUnavailable);
        assert_eq!(reason.to_string(), "no mooring point available");
    }
}
