use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Types of wares traded between stations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default, Reflect, Serialize, Deserialize)]
pub enum Ware {
    #[default]
    Ore,
    Silicon,
    Water,
    Food,
    Electronics,
    Fuel,
    Weapons,
}

impl Ware {
    pub const ALL: [Ware; 7] = [
        Ware::Ore,
        Ware::Silicon,
        Ware::Water,
        Ware::Food,
        Ware::Electronics,
        Ware::Fuel,
        Ware::Weapons,
    ];

    /// Catalog price band `(min, max)` per unit. Station prices are expected
    /// to fall inside it; trade scoring is normalized against it.
    pub fn price_range(&self) -> (i32, i32) {
        match self {
            Ware::Ore => (40, 120),
            Ware::Silicon => (80, 220),
            Ware::Water => (10, 40),
            Ware::Food => (30, 90),
            Ware::Electronics => (300, 900),
            Ware::Fuel => (60, 160),
            Ware::Weapons => (800, 2400),
        }
    }
}

/// Represents the cargo hold of a craft.
/// Contains wares and tracks capacity limits.
#[derive(Component, Debug, Clone)]
pub struct Cargo {
    /// Map of wares to quantities currently held.
    pub wares: BTreeMap<Ware, u32>,
    /// Maximum cargo capacity (total units of all wares combined).
    pub capacity: u32,
}

impl Cargo {
    /// Creates a new empty cargo hold with the specified capacity.
    pub fn new(capacity: u32) -> Self {
        Self {
            wares: BTreeMap::new(),
            capacity,
        }
    }

    /// Returns the total number of units currently in the hold.
    pub fn total_units(&self) -> u32 {
        self.wares.values().sum()
    }

    /// Returns the remaining available capacity.
    pub fn available_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.total_units())
    }

    /// Attempts to add wares to the hold. Returns how many were actually added.
    pub fn add(&mut self, ware: Ware, amount: u32) -> u32 {
        let to_add = amount.min(self.available_capacity());
        if to_add > 0 {
            *self.wares.entry(ware).or_insert(0) += to_add;
        }
        to_add
    }

    /// Attempts to remove wares from the hold. Returns how many were actually removed.
    pub fn remove(&mut self, ware: Ware, amount: u32) -> u32 {
        let Some(current) = self.wares.get_mut(&ware) else {
            return 0;
        };
        let to_remove = amount.min(*current);
        *current -= to_remove;
        if *current == 0 {
            self.wares.remove(&ware);
        }
        to_remove
    }

    /// Returns the quantity of a specific ware.
    pub fn get(&self, ware: Ware) -> u32 {
        self.wares.get(&ware).copied().unwrap_or(0)
    }
}

impl Default for Cargo {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Credits (currency) held by a craft's owner.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credits(pub i64);

impl Credits {
    /// Attempts to spend the specified amount. Returns true if successful.
    pub fn spend(&mut self, amount: i64) -> bool {
        if amount >= 0 && self.0 >= amount {
            self.0 -= amount;
            true
        } else {
            false
        }
    }

    /// Adds the specified amount to the balance.
    pub fn add(&mut self, amount: i64) {
        self.0 = self.0.saturating_add(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_respects_capacity() {
        let mut cargo = Cargo::new(10);
        assert_eq!(cargo.add(Ware::Ore, 7), 7);
        assert_eq!(cargo.add(Ware::Food, 7), 3);
        assert_eq!(cargo.available_capacity(), 0);
    }

    #[test]
    fn test_remove_clears_empty_entries() {
        let mut cargo = Cargo::new(10);
        cargo.add(Ware::Water, 4);
        assert_eq!(cargo.remove(Ware::Water, 9), 4);
        assert!(cargo.wares.is_empty());
        assert_eq!(cargo.remove(Ware::Water, 1), 0);
    }

    #[test]
    fn test_credits_spend() {
        let mut credits = Credits(100);
        assert!(!credits.spend(101));
        assert!(credits.spend(60));
        assert_eq!(credits, Credits(40));
    }
}
