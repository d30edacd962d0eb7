use bevy::prelude::*;
use rand::Rng;

use crate::components::{
    Cargo, Credits, DockLayout, DockingCoordinator, Faction, FactionId, Kinematics, Obstacle,
    ObstacleCategory, OrderController, Player, PriceList, Ship, ShipClass, Station, StationName,
    Ware,
};
use crate::events::{AutopilotCommand, PilotCommand};
use crate::resources::{AutopilotConfig, SectorRng};

/// Plugin that populates a demo sector: a handful of stations, an asteroid
/// field and some traders, patrols and pirates.
pub struct DemoSectorPlugin;

impl Plugin for DemoSectorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_demo_sector);
    }
}

/// Station dimensions used by the spawn helpers.
pub const STATION_RADIUS: f32 = 200.0;

/// Everything a station entity carries.
pub fn station_bundle(
    config: &AutopilotConfig,
    name: &str,
    position: Vec3,
    faction: FactionId,
    prices: PriceList,
    moorings: usize,
) -> impl Bundle {
    (
        Station,
        StationName(name.to_string()),
        Faction(faction),
        prices,
        DockingCoordinator::new(faction, DockLayout::standard(position, STATION_RADIUS, moorings), config),
        Obstacle::new(ObstacleCategory::Station, Vec3::splat(STATION_RADIUS)),
        Transform::from_translation(position),
    )
}

/// Everything an autopilot craft carries.
pub fn ship_bundle(
    config: &AutopilotConfig,
    position: Vec3,
    faction: FactionId,
    class: ShipClass,
    cargo_capacity: u32,
    credits: i64,
) -> impl Bundle {
    (
        Ship,
        Faction(faction),
        class,
        Kinematics::default(),
        OrderController::new(config),
        Cargo::new(cargo_capacity),
        Credits(credits),
        Transform::from_translation(position),
    )
}

/// Spawns a station entity at the specified world position.
///
/// Returns the spawned station entity.
pub fn spawn_station(
    commands: &mut Commands,
    config: &AutopilotConfig,
    name: &str,
    position: Vec3,
    faction: FactionId,
    prices: PriceList,
    moorings: usize,
) -> Entity {
    let entity = commands
        .spawn(station_bundle(config, name, position, faction, prices, moorings))
        .id();
    info!("Spawned station '{}' at {:?} ({:?})", name, position, faction);
    entity
}

/// Generates a random price list. Each station trades 3 to 5 wares, priced
/// anywhere inside the ware's usual range.
pub fn generate_random_prices(rng: &mut impl Rng) -> PriceList {
    let mut prices = PriceList::new();
    let mut available: Vec<Ware> = Ware::ALL.to_vec();
    let count = rng.gen_range(3..=5);
    for _ in 0..count {
        if available.is_empty() {
            break;
        }
        let ware = available.remove(rng.gen_range(0..available.len()));
        let (min, max) = ware.price_range();
        prices.set_price(ware, rng.gen_range(min..=max));
    }
    prices
}

/// Startup system that lays out the demo sector and hands out orders.
pub fn spawn_demo_sector(
    mut commands: Commands,
    config: Res<AutopilotConfig>,
    mut rng: ResMut<SectorRng>,
    mut orders: EventWriter<AutopilotCommand>,
) {
    let layout = [
        ("Union Yards", Vec3::new(0.0, 0.0, 0.0), FactionId::Union, 4),
        ("Helix Exchange", Vec3::new(8000.0, 500.0, -3000.0), FactionId::Independent, 2),
        ("Syndicate Deep", Vec3::new(-6000.0, -800.0, 7000.0), FactionId::Syndicate, 3),
        ("Blackwake Haven", Vec3::new(2000.0, 1500.0, 12000.0), FactionId::Pirates, 1),
    ];
    let mut stations = Vec::new();
    for (name, position, faction, moorings) in layout {
        let prices = generate_random_prices(&mut rng.0);
        stations.push(spawn_station(&mut commands, &config, name, position, faction, prices, moorings));
    }

    commands.spawn((
        Obstacle::new(ObstacleCategory::MineableField, Vec3::new(600.0, 300.0, 600.0)),
        Transform::from_xyz(4000.0, 200.0, -1500.0),
    ));

    let player = commands
        .spawn(ship_bundle(&config, Vec3::new(0.0, 0.0, 3000.0), FactionId::Union, ShipClass::small(), 40, 5_000))
        .insert((Player, OrderController::for_player(&config)))
        .id();

    for i in 0..4 {
        let class = if i % 2 == 0 { ShipClass::small() } else { ShipClass::large() };
        let position = Vec3::new(-2000.0 + 1000.0 * i as f32, 0.0, 4000.0);
        let trader = commands
            .spawn(ship_bundle(&config, position, FactionId::Independent, class, 120, 20_000))
            .id();
        orders.send(AutopilotCommand {
            craft: trader,
            command: PilotCommand::AutoTrade,
        });
    }

    let patrol = commands
        .spawn(ship_bundle(&config, Vec3::new(1000.0, 0.0, 1000.0), FactionId::Union, ShipClass::small(), 10, 0))
        .id();
    orders.send(AutopilotCommand {
        craft: patrol,
        command: PilotCommand::PatrolPath(vec![
            Vec3::new(1000.0, 0.0, 1000.0),
            Vec3::new(6000.0, 0.0, -2000.0),
            Vec3::new(-4000.0, 0.0, 5000.0),
        ]),
    });

    let escort = commands
        .spawn(ship_bundle(&config, Vec3::new(300.0, 0.0, 3200.0), FactionId::Union, ShipClass::small(), 10, 0))
        .id();
    orders.send(AutopilotCommand {
        craft: escort,
        command: PilotCommand::FollowMe,
    });

    let raider = commands
        .spawn(ship_bundle(&config, Vec3::new(2500.0, 1200.0, 10000.0), FactionId::Pirates, ShipClass::small(), 20, 0))
        .id();
    orders.send(AutopilotCommand {
        craft: raider,
        command: PilotCommand::AttackAll,
    });

    // The player heads home under autopilot.
    orders.send(AutopilotCommand {
        craft: player,
        command: PilotCommand::DockAt(stations[0]),
    });

    info!("Demo sector ready: {} stations", stations.len());
}
