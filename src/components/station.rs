use bevy::prelude::*;
use std::collections::BTreeMap;

use super::cargo::Ware;

/// Marker component that identifies an entity as a station.
/// Stations are docking locations where craft trade and resupply.
#[derive(Component, Debug, Default)]
pub struct Station;

/// The display name of a station.
#[derive(Component, Debug, Clone)]
pub struct StationName(pub String);

impl Default for StationName {
    fn default() -> Self {
        Self("Unknown Station".to_string())
    }
}

/// Per-unit prices quoted by a station.
///
/// The economy that sets these prices lives outside the autopilot; trade
/// logic only reads them.
#[derive(Component, Debug, Clone, Default)]
pub struct PriceList {
    pub prices: BTreeMap<Ware, i32>,
}

impl PriceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, ware: Ware, price: i32) -> Self {
        self.prices.insert(ware, price);
        self
    }

    pub fn set_price(&mut self, ware: Ware, price: i32) {
        self.prices.insert(ware, price);
    }

    /// Price per unit of `ware`, if the station trades it.
    pub fn price_of(&self, ware: Ware) -> Option<i32> {
        self.prices.get(&ware).copied()
    }

    /// All quotes in ware order.
    pub fn iter(&self) -> impl Iterator<Item = (Ware, i32)> + '_ {
        self.prices.iter().map(|(w, p)| (*w, *p))
    }
}
