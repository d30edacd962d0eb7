//! Per-craft autopilot state and the tick that drives it.

use bevy::prelude::*;

use super::cargo::{Cargo, Credits, Ware};
use super::docking::Undock;
use super::navigation::Waypoints;
use super::order::{AbortReason, MoveTarget, Order, OrderStatus, TradeReceipt};
use crate::resources::AutopilotConfig;
use crate::systems::avoidance::probe_for_obstacles;
use crate::systems::sector::{CraftState, DockDirectory, Sector, StationInfo};
use crate::utils::steering::{steer_towards, SteeringPids};

/// Who is flying the craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PilotMode {
    #[default]
    Manual,
    Autopilot,
}

/// Timed push out of a station. Order execution is suspended until it ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UndockManeuver {
    pub remaining_ticks: u32,
    pub exit_direction: Vec3,
}

/// Something a controller wants the rest of the game to hear about.
/// Drained into Bevy events by the controller system.
#[derive(Debug, Clone, PartialEq)]
pub enum AutopilotNotice {
    OrderFinished { order: &'static str },
    OrderAborted { order: &'static str, reason: AbortReason },
    TradeCompleted(TradeReceipt),
}

/// Autopilot for one craft: the active order plus everything it steers with.
#[derive(Component, Debug, Clone)]
pub struct OrderController {
    order: Option<Order>,
    pub waypoints: Waypoints,
    /// Forward throttle. Values above 1.0 are supercruise.
    pub throttle: f32,
    /// Body-space torque request.
    pub torque: Vec3,
    /// Where the craft is currently steering.
    pub temp_destination: Option<Vec3>,
    saved_destination: Option<Vec3>,
    avoiding: bool,
    maneuver: Option<UndockManeuver>,
    pub mode: PilotMode,
    primary_player: bool,
    docked_at: Option<Entity>,
    pids: SteeringPids,
    notices: Vec<AutopilotNotice>,
}

impl OrderController {
    pub fn new(config: &AutopilotConfig) -> Self {
        Self {
            order: None,
            waypoints: Waypoints::default(),
            throttle: 0.0,
            torque: Vec3::ZERO,
            temp_destination: None,
            saved_destination: None,
            avoiding: false,
            maneuver: None,
            mode: PilotMode::Manual,
            primary_player: false,
            docked_at: None,
            pids: SteeringPids::from_config(config),
            notices: Vec::new(),
        }
    }

    /// Controller for the player's own craft. It returns to manual control
    /// whenever an order finishes.
    pub fn for_player(config: &AutopilotConfig) -> Self {
        Self {
            primary_player: true,
            ..Self::new(config)
        }
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn order_mut(&mut self) -> Option<&mut Order> {
        self.order.as_mut()
    }

    pub fn is_avoiding(&self) -> bool {
        self.avoiding
    }

    pub fn saved_destination(&self) -> Option<Vec3> {
        self.saved_destination
    }

    pub fn maneuver(&self) -> Option<&UndockManeuver> {
        self.maneuver.as_ref()
    }

    pub fn docked_at(&self) -> Option<Entity> {
        self.docked_at
    }

    pub fn is_primary_player(&self) -> bool {
        self.primary_player
    }

    pub fn notices(&self) -> &[AutopilotNotice] {
        &self.notices
    }

    pub fn drain_notices(&mut self) -> Vec<AutopilotNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Replaces the active order. The previous order is destroyed first.
    pub fn issue_order(&mut self, craft: Entity, order: Order, docks: &mut dyn DockDirectory) {
        if let Some(previous) = self.order.take() {
            previous.destroy(craft, docks);
        }
        if let Some(station) = order.docking_target() {
            if let Some(dock) = docks.coordinator_mut(station) {
                dock.release(craft);
            }
        }

        info!("{:?} ordered: {}", craft, order.name());
        self.mode = PilotMode::Autopilot;
        self.order = Some(order);
        self.clear_navigation();
    }

    /// Ends the active order. Does nothing if there is none.
    pub fn finish_order(&mut self, craft: Entity, docks: &mut dyn DockDirectory) {
        let Some(order) = self.order.take() else {
            return;
        };
        debug!("{:?} finished order: {}", craft, order.name());
        self.notices.push(AutopilotNotice::OrderFinished { order: order.name() });
        order.destroy(craft, docks);

        self.clear_navigation();
        self.throttle = 0.0;
        self.torque = Vec3::ZERO;
        if self.primary_player {
            self.mode = PilotMode::Manual;
        }
    }

    /// Finishes the active order after logging why it failed.
    pub fn abort_order(&mut self, craft: Entity, reason: AbortReason, docks: &mut dyn DockDirectory) {
        let Some(order) = self.order.as_ref() else {
            return;
        };
        warn!("{:?} aborted {}: {}", craft, order.name(), reason);
        self.notices.push(AutopilotNotice::OrderAborted {
            order: order.name(),
            reason,
        });
        self.finish_order(craft, docks);
    }

    fn clear_navigation(&mut self) {
        self.waypoints.clear();
        self.temp_destination = None;
        self.saved_destination = None;
        self.avoiding = false;
        self.pids.reset();
    }

    /// One autopilot step.
    pub fn tick(&mut self, craft: &CraftState, sector: &mut Sector) {
        if self.mode == PilotMode::Manual || self.docked_at.is_some() {
            return;
        }
        if let Some(maneuver) = self.maneuver.as_mut() {
            maneuver.remaining_ticks = maneuver.remaining_ticks.saturating_sub(1);
            if maneuver.remaining_ticks == 0 {
                debug!("{:?} undock maneuver complete", craft.entity);
                self.maneuver = None;
                self.throttle = 0.0;
            }
            return;
        }
        let Some(order) = self.order.as_ref() else {
            return;
        };

        if !order.in_final_approach() {
            probe_for_obstacles(self, craft, sector);
        }

        if self.avoiding {
            self.fly_avoidance(craft, sector);
            return;
        }

        let Some(mut order) = self.order.take() else {
            return;
        };
        let status = order.update_state(self, craft, sector);
        self.order = Some(order);

        match status {
            OrderStatus::Running => {}
            OrderStatus::Complete => self.finish_order(craft.entity, &mut *sector.docks),
            OrderStatus::Abort(reason) => self.abort_order(craft.entity, reason, &mut *sector.docks),
        }
    }

    /// Diverts toward `point`, remembering the original destination the
    /// first time.
    pub fn begin_avoidance(&mut self, point: Vec3) {
        if !self.avoiding {
            self.saved_destination = self.temp_destination;
            self.avoiding = true;
        }
        self.temp_destination = Some(point);
    }

    fn end_avoidance(&mut self) {
        self.avoiding = false;
        self.temp_destination = self.saved_destination.take();
    }

    fn fly_avoidance(&mut self, craft: &CraftState, sector: &Sector) {
        let Some(point) = self.temp_destination else {
            self.end_avoidance();
            return;
        };
        let config = sector.config;
        let angle = self.steer_towards(craft, point, sector.dt);
        self.throttle = if angle <= config.avoidance_heading_tolerance_deg {
            config.avoidance_throttle
        } else {
            0.0
        };
        if craft.position.distance(point) < config.avoidance_arrival_distance {
            debug!("{:?} cleared obstacle", craft.entity);
            self.end_avoidance();
        }
    }

    /// Turns toward `target`. Returns the remaining heading error in degrees.
    pub fn steer_towards(&mut self, craft: &CraftState, target: Vec3, dt: f32) -> f32 {
        let command = steer_towards(
            &mut self.pids,
            craft.position,
            craft.rotation,
            craft.kinematics.angular,
            target,
            dt,
        );
        self.torque = command.torque;
        command.angle
    }

    /// The craft has physically docked at `station`.
    pub fn on_docked(&mut self, station: Entity) {
        self.docked_at = Some(station);
        self.throttle = 0.0;
        self.torque = Vec3::ZERO;
        self.maneuver = None;
        self.waypoints.clear();
        self.temp_destination = None;
        self.saved_destination = None;
        self.avoiding = false;
    }

    /// The station released the craft: fly the exit maneuver, then resume.
    pub fn begin_undock(&mut self, undock: Undock, ticks: u32, throttle: f32) {
        self.docked_at = None;
        self.mode = PilotMode::Autopilot;
        self.throttle = throttle;
        self.torque = Vec3::ZERO;
        self.maneuver = Some(UndockManeuver {
            remaining_ticks: ticks.max(1),
            exit_direction: undock.exit_direction,
        });
        self.pids.reset();
    }

    /// Runs the active order's trade at a station and records the receipt.
    pub fn perform_transaction(
        &mut self,
        station: Entity,
        cargo: &mut Cargo,
        credits: &mut Credits,
        known: &[StationInfo],
    ) -> Option<TradeReceipt> {
        let Some(Order::Trade(trade)) = self.order.as_mut() else {
            return None;
        };
        let receipt = trade.perform_transaction(station, cargo, credits, known)?;
        self.notices.push(AutopilotNotice::TradeCompleted(receipt));
        Some(receipt)
    }

    pub fn move_to(&mut self, craft: Entity, target: MoveTarget, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::MoveToPoint { target }, docks);
    }

    pub fn patrol_path(&mut self, craft: Entity, points: Vec<Vec3>, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::patrol(points), docks);
    }

    /// Wander around `anchor`.
    pub fn idle(&mut self, craft: Entity, anchor: Vec3, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::idle(anchor), docks);
    }

    pub fn follow(&mut self, craft: Entity, target: Entity, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::Follow { target }, docks);
    }

    pub fn dock_at(&mut self, craft: Entity, station: Entity, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::dock(station), docks);
    }

    pub fn move_waypoints(&mut self, craft: Entity, points: Vec<Vec3>, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::MoveWaypoints { points }, docks);
    }

    pub fn attack(&mut self, craft: Entity, target: Entity, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::Attack { target }, docks);
    }

    pub fn attack_all(&mut self, craft: Entity, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::AttackAll { target: None }, docks);
    }

    pub fn auto_trade(&mut self, craft: Entity, docks: &mut dyn DockDirectory) {
        self.issue_order(craft, Order::trade(), docks);
    }

    /// Ware currently being traded, if any.
    pub fn traded_ware(&self) -> Option<Ware> {
        match self.order.as_ref() {
            Some(Order::Trade(trade)) => trade.destination.as_ref().map(|d| d.ware),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        DockState, FactionId, ObstacleCategory, PriceList, ShipClass, ShipSize,
    };
    use crate::resources::FactionRegistry;
    use crate::systems::sector::fixtures::{craft_at, facing, SectorFixture};
    use crate::systems::sector::ObstacleShape;

    fn controller(fixture: &SectorFixture) -> OrderController {
        OrderController::new(&fixture.config)
    }

    #[test]
    fn test_manual_controller_does_nothing() {
        let mut fixture = SectorFixture::new();
        let mut ctl = controller(&fixture);
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        ctl.tick(&craft, &mut fixture.sector());
        assert_eq!(ctl.throttle, 0.0);
        assert!(ctl.notices().is_empty());
    }

    #[test]
    fn test_finish_order_is_idempotent() {
        let mut fixture = SectorFixture::new();
        let mut ctl = OrderController::for_player(&fixture.config);
        let craft = Entity::from_raw(1);
        ctl.move_to(craft, MoveTarget::Position(Vec3::X * 500.0), &mut fixture.docks);
        assert_eq!(ctl.mode, PilotMode::Autopilot);
        ctl.throttle = 0.8;

        ctl.finish_order(craft, &mut fixture.docks);
        ctl.finish_order(craft, &mut fixture.docks);

        assert!(ctl.order().is_none());
        assert_eq!(ctl.throttle, 0.0);
        assert_eq!(ctl.mode, PilotMode::Manual);
        let finished = ctl
            .drain_notices()
            .into_iter()
            .filter(|n| matches!(n, AutopilotNotice::OrderFinished { .. }))
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn test_new_order_destroys_previous_claim() {
        let mut fixture = SectorFixture::new();
        let station = fixture.add_station(50, Vec3::ZERO, FactionId::Union, PriceList::new(), 1);
        let mut ctl = controller(&fixture);
        let craft = craft_at(1, Vec3::Z * 3000.0, ShipClass::large());

        ctl.dock_at(craft.entity, station, &mut fixture.docks);
        ctl.tick(&craft, &mut fixture.sector());
        assert_eq!(fixture.dock(station).occupied_moorings(), 1);

        ctl.move_to(craft.entity, MoveTarget::Position(Vec3::X), &mut fixture.docks);
        assert_eq!(fixture.dock(station).occupied_moorings(), 0);
        assert_eq!(ctl.order().map(Order::name), Some("Move to point"));
    }

    #[test]
    fn test_redocking_releases_stale_claim_first() {
        let mut fixture = SectorFixture::new();
        let station = fixture.add_station(50, Vec3::ZERO, FactionId::Union, PriceList::new(), 0);
        let craft = craft_at(1, Vec3::Z * 3000.0, ShipClass::small());
        fixture
            .dock_mut(station)
            .request_docking(craft.entity, ShipSize::Small, FactionId::Union, &FactionRegistry::new())
            .unwrap();

        let mut ctl = controller(&fixture);
        ctl.dock_at(craft.entity, station, &mut fixture.docks);
        assert!(!fixture.dock(station).queue().contains(craft.entity));
    }

    #[test]
    fn test_move_to_point_completes_on_arrival() {
        let mut fixture = SectorFixture::new();
        let mut ctl = controller(&fixture);
        let target = Vec3::NEG_Z * 15.0;
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        ctl.move_to(craft.entity, MoveTarget::Position(target), &mut fixture.docks);
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.order().is_none());
        assert_eq!(
            ctl.drain_notices(),
            vec![AutopilotNotice::OrderFinished { order: "Move to point" }]
        );
    }

    #[test]
    fn test_avoidance_saves_and_restores_destination() {
        let mut fixture = SectorFixture::new();
        let goal = Vec3::NEG_Z * 2000.0;
        fixture.obstacles.push(ObstacleShape {
            entity: Entity::from_raw(90),
            center: Vec3::NEG_Z * 300.0,
            half_extents: Vec3::splat(40.0),
            category: ObstacleCategory::MineableField,
        });

        let mut ctl = controller(&fixture);
        let mut craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        ctl.move_to(craft.entity, MoveTarget::Position(goal), &mut fixture.docks);

        // First tick flies toward the goal and picks up throttle.
        ctl.tick(&craft, &mut fixture.sector());
        assert_eq!(ctl.temp_destination, Some(goal));
        assert!(ctl.throttle > fixture.config.throttle_deadband);

        // Second tick the probes see the field.
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.is_avoiding());
        assert_eq!(ctl.saved_destination(), Some(goal));
        let point = ctl.temp_destination.unwrap();
        assert_ne!(point, goal);

        // Another hit does not overwrite the saved destination.
        ctl.tick(&craft, &mut fixture.sector());
        assert_eq!(ctl.saved_destination(), Some(goal));

        // Reaching the avoidance point restores the original target.
        craft.position = point + Vec3::X;
        craft = facing(craft, goal);
        fixture.obstacles.clear();
        ctl.tick(&craft, &mut fixture.sector());
        assert!(!ctl.is_avoiding());
        assert_eq!(ctl.saved_destination(), None);
        assert_eq!(ctl.temp_destination, Some(goal));
    }

    #[test]
    fn test_final_approach_skips_probes() {
        let mut fixture = SectorFixture::new();
        let station = fixture.add_station(50, Vec3::ZERO, FactionId::Union, PriceList::new(), 1);
        fixture.obstacles.push(ObstacleShape {
            entity: station,
            center: Vec3::ZERO,
            half_extents: Vec3::splat(200.0),
            category: ObstacleCategory::Station,
        });
        let mut ctl = controller(&fixture);
        let craft = craft_at(1, Vec3::new(0.0, 0.0, 500.0), ShipClass::large());
        ctl.dock_at(craft.entity, station, &mut fixture.docks);
        if let Some(Order::Dock(dock)) = ctl.order_mut() {
            dock.approach.state = DockState::FinalApproach;
        }
        ctl.throttle = 1.0;
        ctl.tick(&craft, &mut fixture.sector());
        assert!(!ctl.is_avoiding());
    }

    #[test]
    fn test_undock_maneuver_suppresses_orders() {
        let mut fixture = SectorFixture::new();
        let mut ctl = controller(&fixture);
        let craft = craft_at(1, Vec3::ZERO, ShipClass::small());
        ctl.move_to(craft.entity, MoveTarget::Position(Vec3::NEG_Z * 10.0), &mut fixture.docks);
        ctl.on_docked(Entity::from_raw(9));
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.order().is_some());

        let undock = Undock {
            exit_point: Vec3::ZERO,
            exit_direction: Vec3::Z,
        };
        ctl.begin_undock(undock, 2, 0.6);
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.order().is_some());
        assert_eq!(ctl.throttle, 0.6);
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.maneuver().is_none());

        // With the maneuver over the order runs again and completes.
        ctl.tick(&craft, &mut fixture.sector());
        assert!(ctl.order().is_none());
    }
}
