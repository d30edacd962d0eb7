use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::components::{AbortReason, AutopilotNotice, MoveTarget, TradeReceipt};

/// Event emitted whenever a craft's order ends, for any reason.
#[derive(Event, Debug, Clone)]
pub struct OrderFinishedEvent {
    pub craft: Entity,
    pub order: &'static str,
}

/// Event emitted when an order gives up. Followed by an [`OrderFinishedEvent`].
#[derive(Event, Debug, Clone)]
pub struct OrderAbortedEvent {
    pub craft: Entity,
    pub order: &'static str,
    pub reason: AbortReason,
}

/// Event emitted when a craft physically docks.
#[derive(Event, Debug, Clone)]
pub struct ShipDockedEvent {
    pub craft: Entity,
    pub station: Entity,
}

/// Event emitted when a station releases a docked craft.
#[derive(Event, Debug, Clone)]
pub struct ShipUndockedEvent {
    pub craft: Entity,
    pub station: Entity,
}

/// Event emitted after a trading craft buys or sells at a station.
#[derive(Event, Debug, Clone)]
pub struct TradeCompletedEvent {
    pub craft: Entity,
    pub receipt: TradeReceipt,
}

/// Commands other systems (input, scripting, fleet UI) send to an autopilot.
#[derive(Debug, Clone, PartialEq)]
pub enum PilotCommand {
    MoveTo(MoveTarget),
    PatrolPath(Vec<Vec3>),
    Idle,
    /// Follow the primary player craft.
    FollowMe,
    Follow(Entity),
    DockAt(Entity),
    MoveWaypoints(Vec<Vec3>),
    Attack(Entity),
    AttackAll,
    AutoTrade,
    /// Ask the station to release a docked craft.
    Undock,
    /// Drop the current order.
    Cancel,
}

/// Event carrying a [`PilotCommand`] for one craft.
#[derive(Event, Debug, Clone)]
pub struct AutopilotCommand {
    pub craft: Entity,
    pub command: PilotCommand,
}

/// Writers for everything a controller's notice outbox can turn into.
#[derive(SystemParam)]
pub struct NoticeWriters<'w> {
    finished: EventWriter<'w, OrderFinishedEvent>,
    aborted: EventWriter<'w, OrderAbortedEvent>,
    traded: EventWriter<'w, TradeCompletedEvent>,
}

impl NoticeWriters<'_> {
    pub fn dispatch(&mut self, craft: Entity, notices: Vec<AutopilotNotice>) {
        for notice in notices {
            match notice {
                AutopilotNotice::OrderFinished { order } => {
                    self.finished.send(OrderFinishedEvent { craft, order });
                }
                AutopilotNotice::OrderAborted { order, reason } => {
                    self.aborted.send(OrderAbortedEvent { craft, order, reason });
                }
                AutopilotNotice::TradeCompleted(receipt) => {
                    self.traded.send(TradeCompletedEvent { craft, receipt });
                }
            }
        }
    }
}
