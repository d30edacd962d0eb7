//! Order execution for autopilot-controlled craft.
//!
//! The controller system snapshots the sector once per tick and then ticks
//! every [`OrderController`] in ascending entity order. Each order variant's
//! behavior is one `execute_*` function below.

use bevy::prelude::*;
use rand::Rng;

use crate::components::{
    AbortReason, DockApproach, DockRequest, DockState, DockingCoordinator, DockingError, Faction,
    IdleOrder, Kinematics, MoveTarget, Obstacle, Order, OrderController, OrderStatus, PatrolOrder,
    Ship, ShipClass, Station, TradeDestination, TradeOrder, TradePhase, TradeReceipt, Waypoints,
    Cargo, Credits,
};
use crate::events::NoticeWriters;
use crate::resources::{AutopilotConfig, FactionRegistry, SectorRng, SimClock};
use crate::systems::economy::{dockable_stations, find_buy_station, find_sell_station};
use crate::systems::sector::{
    collect_obstacles, collect_stations, Contact, CraftState, DockDirectory, Sector, StationInfo,
    StationQuery,
};
use crate::utils::steering::{approach_throttle, arrive_throttle};

/// Heading error below which cruising orders apply thrust.
const CRUISE_HEADING_TOLERANCE_DEG: f32 = 30.0;
/// Cruising orders ease off inside this distance of their target.
const SLOWING_RADIUS: f32 = 200.0;

/// System that runs one autopilot step for every craft.
pub fn order_controller_system(
    config: Res<AutopilotConfig>,
    clock: Res<SimClock>,
    factions: Res<FactionRegistry>,
    mut rng: ResMut<SectorRng>,
    stations: StationQuery,
    obstacles: Query<(Entity, &Transform, &Obstacle)>,
    mut docks: Query<&mut DockingCoordinator, With<Station>>,
    mut ships: Query<
        (Entity, &Transform, &Kinematics, &Faction, &ShipClass, &mut OrderController),
        With<Ship>,
    >,
    mut notices: NoticeWriters,
) {
    let stations = collect_stations(&stations);
    let obstacles = collect_obstacles(obstacles.iter());
    let mut contacts: Vec<Contact> = ships
        .iter()
        .map(|(entity, transform, _, faction, _, controller)| Contact {
            entity,
            position: transform.translation,
            rotation: transform.rotation,
            faction: faction.0,
            docked: controller.docked_at().is_some(),
        })
        .collect();
    contacts.sort_by_key(|c| c.entity);

    for entity in contacts.iter().map(|c| c.entity).collect::<Vec<_>>() {
        let Ok((entity, transform, kinematics, faction, class, mut controller)) = ships.get_mut(entity)
        else {
            continue;
        };
        let craft = CraftState {
            entity,
            position: transform.translation,
            rotation: transform.rotation,
            kinematics: *kinematics,
            faction: faction.0,
            class: class.clone(),
        };
        let mut sector = Sector {
            tick: clock.tick,
            dt: config.dt(),
            config: &config,
            factions: &factions,
            contacts: &contacts,
            stations: &stations,
            obstacles: &obstacles,
            docks: &mut docks,
            rng: &mut rng.0,
        };
        controller.tick(&craft, &mut sector);

        let pending = controller.drain_notices();
        if !pending.is_empty() {
            notices.dispatch(entity, pending);
        }
    }
}

impl Order {
    /// Advances the order by one tick.
    pub fn update_state(
        &mut self,
        ctl: &mut OrderController,
        craft: &CraftState,
        sector: &mut Sector,
    ) -> OrderStatus {
        match self {
            Order::Dock(dock) => execute_dock(&mut dock.approach, ctl, craft, sector),
            Order::Trade(trade) => execute_trade(trade, ctl, craft, sector),
            Order::Attack { target } => execute_attack(Some(*target), ctl, craft, sector),
            Order::AttackAll { target } => {
                *target = sector
                    .nearest_hostiles(craft.position, sector.config.scanner_range, craft.faction)
                    .first()
                    .map(|c| c.entity);
                execute_attack(*target, ctl, craft, sector)
            }
            Order::Patrol(patrol) => execute_patrol(patrol, ctl, craft, sector),
            Order::Follow { target } => execute_follow(*target, ctl, craft, sector),
            Order::Idle(idle) => execute_idle(idle, ctl, craft, sector),
            Order::MoveToPoint { target } => execute_move_to_point(*target, ctl, craft, sector),
            Order::MoveWaypoints { points } => execute_move_waypoints(points, ctl, craft, sector),
        }
    }

    /// Releases whatever the order holds outside the controller.
    pub fn destroy(&self, craft: Entity, docks: &mut dyn DockDirectory) {
        let Some(station) = self.docking_target() else {
            return;
        };
        if let Some(dock) = docks.coordinator_mut(station) {
            if dock.release(craft) {
                debug!("{:?} released docking claim at {:?}", craft, station);
            }
        }
    }
}

impl TradeOrder {
    /// Buys or sells at `station`, whichever the current phase calls for.
    ///
    /// Returns `None` if `station` is not this order's destination or does
    /// not quote the ware.
    pub fn perform_transaction(
        &mut self,
        station: Entity,
        cargo: &mut Cargo,
        credits: &mut Credits,
        known: &[StationInfo],
    ) -> Option<TradeReceipt> {
        let destination = self.destination.as_ref()?;
        if destination.station != station {
            return None;
        }
        let ware = destination.ware;
        let here = known.iter().find(|s| s.entity == station)?;
        let price = here.prices.price_of(ware)?;

        match self.phase {
            TradePhase::AcquireCargo => {
                let affordable = if price > 0 {
                    u32::try_from(credits.0.max(0) / i64::from(price)).unwrap_or(u32::MAX)
                } else {
                    cargo.available_capacity()
                };
                let bought = cargo.add(ware, affordable.min(cargo.available_capacity()));
                let cost = i64::from(bought) * i64::from(price);
                credits.spend(cost);

                self.phase = TradePhase::SellCargo;
                self.destination = find_sell_station(station, ware, known).map(|sell| TradeDestination {
                    station: sell.station,
                    ware,
                    approach: DockApproach::new(sell.station),
                });
                let buyer = self
                    .destination
                    .as_ref()
                    .and_then(|d| known.iter().find(|s| s.entity == d.station))
                    .map_or("nowhere", |s| s.name.as_str());
                info!(
                    "Bought {} {:?} at {} for {} (sell at {})",
                    bought, ware, here.name, price, buyer
                );
                Some(TradeReceipt {
                    station,
                    ware,
                    quantity: bought,
                    credits_delta: -cost,
                })
            }
            TradePhase::SellCargo => {
                let sold = cargo.remove(ware, cargo.get(ware));
                let revenue = i64::from(sold) * i64::from(price);
                credits.add(revenue);

                self.phase = TradePhase::AcquireCargo;
                self.destination = None;
                info!("Sold {} {:?} at {} for {}", sold, ware, here.name, price);
                Some(TradeReceipt {
                    station,
                    ware,
                    quantity: sold,
                    credits_delta: revenue,
                })
            }
        }
    }
}

/// Result of one docking approach step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApproachStatus {
    Flying,
    Failed(DockingError),
    StationLost,
}

impl ApproachStatus {
    fn into_order_status(self) -> OrderStatus {
        match self {
            ApproachStatus::Flying => OrderStatus::Running,
            ApproachStatus::Failed(err) => OrderStatus::Abort(err.into()),
            ApproachStatus::StationLost => OrderStatus::Abort(AbortReason::TargetLost),
        }
    }
}

/// Executes Dock order logic. Completion comes from the station on contact.
fn execute_dock(
    approach: &mut DockApproach,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &mut Sector,
) -> OrderStatus {
    execute_dock_approach(approach, ctl, craft, sector).into_order_status()
}

/// Negotiates with the station, then flies its waypoint chain.
fn execute_dock_approach(
    approach: &mut DockApproach,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &mut Sector,
) -> ApproachStatus {
    let config = sector.config;

    match approach.request {
        DockRequest::Granted => {}
        DockRequest::RetryIn(ticks) if ticks > 1 => {
            approach.request = DockRequest::RetryIn(ticks - 1);
            ctl.throttle = 0.0;
            return ApproachStatus::Flying;
        }
        DockRequest::Pending | DockRequest::RetryIn(_) => {
            let Some(dock) = sector.docks.coordinator_mut(approach.station) else {
                approach.state = DockState::DockingApproach;
                return ApproachStatus::StationLost;
            };
            match dock.request_docking(craft.entity, craft.class.size, craft.faction, sector.factions) {
                Ok(chain) => {
                    info!("{:?} cleared to dock at {:?}", craft.entity, approach.station);
                    ctl.waypoints = Waypoints::new(chain);
                    approach.request = DockRequest::Granted;
                }
                Err(err) if err.is_transient() => {
                    let retry = config.ticks(config.docking_retry_secs);
                    debug!(
                        "tick {}: {:?} docking at {:?}: {}, retrying in {} ticks",
                        sector.tick, craft.entity, approach.station, err, retry
                    );
                    approach.request = DockRequest::RetryIn(retry);
                    ctl.throttle = 0.0;
                    return ApproachStatus::Flying;
                }
                Err(err) => return ApproachStatus::Failed(err),
            }
        }
    }

    let Some(dock) = sector.docks.coordinator(approach.station) else {
        approach.state = DockState::DockingApproach;
        return ApproachStatus::StationLost;
    };
    let Some(target) = ctl.waypoints.current() else {
        ctl.throttle = 0.0;
        return ApproachStatus::Flying;
    };

    let distance = craft.position.distance(target);
    approach.state = if ctl.waypoints.past_first() {
        DockState::FinalApproach
    } else if distance > config.supercruise_range
        || dock.may_proceed(craft.entity, craft.class.size)
    {
        DockState::DockingApproach
    } else {
        DockState::QueueWait
    };

    ctl.temp_destination = Some(target);
    let angle = ctl.steer_towards(craft, target, sector.dt);

    if approach.state == DockState::QueueWait {
        ctl.throttle = 0.0;
        return ApproachStatus::Flying;
    }

    ctl.throttle = if angle <= config.facing_tolerance_deg {
        approach_throttle(distance, craft.class.docking_style, config)
    } else {
        0.0
    };
    if distance < config.waypoint_reached_distance {
        ctl.waypoints.advance();
    }
    ApproachStatus::Flying
}

/// Executes Trade order logic.
///
/// Picks a destination when it has none, then flies the docking approach.
/// Buying and selling happen in [`TradeOrder::perform_transaction`] once the
/// station reports contact.
fn execute_trade(
    trade: &mut TradeOrder,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &mut Sector,
) -> OrderStatus {
    if trade.destination.is_none() {
        match trade.phase {
            TradePhase::AcquireCargo => {
                let reachable = dockable_stations(sector.stations, craft.faction, sector.factions);
                let Some(offer) = find_buy_station(&reachable) else {
                    return OrderStatus::Abort(AbortReason::NoBuyStation);
                };
                let seller = sector.station(offer.station).map_or("?", |s| s.name.as_str());
                info!(
                    "{:?} trading: buy {:?} at {} for {}",
                    craft.entity, offer.ware, seller, offer.price
                );
                trade.destination = Some(TradeDestination {
                    station: offer.station,
                    ware: offer.ware,
                    approach: DockApproach::new(offer.station),
                });
            }
            TradePhase::SellCargo => return OrderStatus::Abort(AbortReason::NoSellStation),
        }
    }

    let Some(destination) = trade.destination.as_mut() else {
        return OrderStatus::Running;
    };
    execute_dock_approach(&mut destination.approach, ctl, craft, sector).into_order_status()
}

/// Steers toward `target` and sets a cruise throttle. Returns the distance.
fn fly_to(
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
    target: Vec3,
    max_throttle: f32,
) -> f32 {
    ctl.temp_destination = Some(target);
    let angle = ctl.steer_towards(craft, target, sector.dt);
    let distance = craft.position.distance(target);
    ctl.throttle = if angle <= CRUISE_HEADING_TOLERANCE_DEG {
        arrive_throttle(distance, SLOWING_RADIUS, max_throttle, sector.config.throttle_floor)
    } else {
        0.0
    };
    distance
}

/// Executes Attack logic: close to engage range, then hold and face.
fn execute_attack(
    target: Option<Entity>,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
) -> OrderStatus {
    let Some(position) = target.and_then(|t| sector.contact(t)).map(|c| c.position) else {
        ctl.throttle = 0.0;
        return OrderStatus::Running;
    };
    let distance = fly_to(ctl, craft, sector, position, 1.0);
    if distance <= sector.config.engage_range {
        ctl.throttle = 0.0;
    }
    OrderStatus::Running
}

/// Executes Patrol logic: loop over the points forever.
fn execute_patrol(
    patrol: &PatrolOrder,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
) -> OrderStatus {
    if patrol.points.is_empty() {
        return OrderStatus::Complete;
    }
    if ctl.waypoints.is_empty() {
        ctl.waypoints = Waypoints::new(patrol.points.clone());
    }
    let Some(target) = ctl.waypoints.current() else {
        return OrderStatus::Running;
    };
    if craft.position.distance(target) < sector.config.arrival_distance {
        ctl.waypoints.advance();
        if ctl.waypoints.is_finished() {
            ctl.waypoints.next = 0;
        }
    }
    if let Some(target) = ctl.waypoints.current() {
        fly_to(ctl, craft, sector, target, 1.0);
    }
    OrderStatus::Running
}

/// Executes Follow logic: hold station behind the target.
fn execute_follow(
    target: Entity,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
) -> OrderStatus {
    let Some(leader) = sector.contact(target) else {
        ctl.throttle = 0.0;
        return OrderStatus::Running;
    };
    let slot = leader.position + leader.rotation * Vec3::Z * sector.config.follow_distance;
    let distance = fly_to(ctl, craft, sector, slot, 1.0);
    if distance < sector.config.arrival_distance {
        ctl.throttle = 0.0;
    }
    OrderStatus::Running
}

/// Executes Idle logic: drift between random points near the anchor.
fn execute_idle(
    idle: &mut IdleOrder,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &mut Sector,
) -> OrderStatus {
    let config = sector.config;
    let point = match idle.point {
        Some(point) if craft.position.distance(point) >= config.arrival_distance => point,
        _ => {
            let direction = Vec3::new(
                sector.rng.gen_range(-1.0..1.0),
                sector.rng.gen_range(-1.0..1.0),
                sector.rng.gen_range(-1.0..1.0),
            )
            .try_normalize()
            .unwrap_or(Vec3::X);
            let point = idle.anchor + direction * sector.rng.gen_range(0.0..config.idle_radius);
            debug!("{:?} idling toward {:?}", craft.entity, point);
            point
        }
    };
    idle.point = Some(point);
    fly_to(ctl, craft, sector, point, config.idle_throttle);
    OrderStatus::Running
}

/// Executes MoveToPoint logic.
fn execute_move_to_point(
    target: MoveTarget,
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
) -> OrderStatus {
    let position = match target {
        MoveTarget::Position(position) => Some(position),
        MoveTarget::Entity(entity) => sector.position_of(entity),
    };
    let Some(position) = position else {
        ctl.throttle = 0.0;
        return OrderStatus::Running;
    };
    if craft.position.distance(position) < sector.config.arrival_distance {
        return OrderStatus::Complete;
    }
    fly_to(ctl, craft, sector, position, 1.0);
    OrderStatus::Running
}

/// Executes MoveWaypoints logic: fly the list once.
fn execute_move_waypoints(
    points: &[Vec3],
    ctl: &mut OrderController,
    craft: &CraftState,
    sector: &Sector,
) -> OrderStatus {
    if points.is_empty() {
        return OrderStatus::Complete;
    }
    if ctl.waypoints.is_empty() {
        ctl.waypoints = Waypoints::new(points.to_vec());
    }
    let Some(target) = ctl.waypoints.current() else {
        return OrderStatus::Complete;
    };
    if craft.position.distance(target) < sector.config.arrival_distance {
        ctl.waypoints.advance();
        if ctl.waypoints.is_finished() {
            return OrderStatus::Complete;
        }
    }
    if let Some(target) = ctl.waypoints.current() {
        fly_to(ctl, craft, sector, target, 1.0);
    }
    OrderStatus::Running
}
