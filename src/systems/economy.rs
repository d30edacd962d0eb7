//! Trade evaluation: where to buy, where to sell.

use bevy::prelude::*;

use crate::components::{FactionId, Ware};
use crate::resources::FactionRegistry;
use crate::systems::sector::StationInfo;

/// Constants for trade evaluation.
pub mod trade_config {
    /// A buy offer must score above this to be worth the trip.
    pub const BUY_SCORE_THRESHOLD: f32 = 0.5;
}

/// A station and ware worth buying from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyCandidate {
    pub station: Entity,
    pub ware: Ware,
    pub price: i32,
    pub score: f32,
}

/// A station offering the best price for a ware.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SellCandidate {
    pub station: Entity,
    pub price: i32,
}

/// How cheap `price` is within the ware's typical range: 1.0 at or below
/// the minimum, 0.0 at or above the maximum.
pub fn buy_score(ware: Ware, price: i32) -> f32 {
    let (min, max) = ware.price_range();
    if max <= min {
        return 0.0;
    }
    let headroom = i64::from(max) - i64::from(price);
    let span = i64::from(max) - i64::from(min);
    (headroom as f32 / span as f32).clamp(0.0, 1.0)
}

/// Stations a craft of `faction` would be allowed to dock at.
pub fn dockable_stations(
    known: &[StationInfo],
    faction: FactionId,
    factions: &FactionRegistry,
) -> Vec<StationInfo> {
    known
        .iter()
        .filter(|s| factions.relation(faction, s.faction) >= 0.0)
        .cloned()
        .collect()
}

/// Finds the cheapest-relative-to-range offer across `known` stations.
///
/// Only offers scoring above [`trade_config::BUY_SCORE_THRESHOLD`] qualify.
/// When two offers score the same, the one seen first wins.
pub fn find_buy_station(known: &[StationInfo]) -> Option<BuyCandidate> {
    let mut best: Option<BuyCandidate> = None;
    for station in known {
        for (ware, price) in station.prices.iter() {
            let score = buy_score(ware, price);
            if score <= trade_config::BUY_SCORE_THRESHOLD {
                continue;
            }
            if best.map_or(true, |b| score > b.score) {
                best = Some(BuyCandidate {
                    station: station.entity,
                    ware,
                    price,
                    score,
                });
            }
        }
    }
    best
}

/// Finds the station paying the most for `ware`, other than `current`.
pub fn find_sell_station(current: Entity, ware: Ware, known: &[StationInfo]) -> Option<SellCandidate> {
    let mut best: Option<SellCandidate> = None;
    for station in known.iter().filter(|s| s.entity != current) {
        let Some(price) = station.prices.price_of(ware) else {
            continue;
        };
        if best.map_or(true, |b| price > b.price) {
            best = Some(SellCandidate {
                station: station.entity,
                price,
            });
        }
    }
    best
}
