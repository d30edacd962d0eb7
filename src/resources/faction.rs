//! Faction relations consumed by docking permission and target selection.
//!
//! How relations evolve (reputation gains, wars) is decided elsewhere; this
//! registry only stores the current standing between each pair.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::components::FactionId;

/// Symmetric relation table, keyed by faction pair.
///
/// Relations range from -1.0 (at war) to 1.0 (allied). Unknown pairs are
/// neutral and a faction is always allied with itself.
#[derive(Resource, Debug, Default, Clone)]
pub struct FactionRegistry {
    relations: HashMap<(FactionId, FactionId), f32>,
}

fn key(a: FactionId, b: FactionId) -> (FactionId, FactionId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl FactionRegistry {
    /// Creates a registry where pirates are hostile to everyone else.
    pub fn new() -> Self {
        let mut registry = Self::default();
        for other in [FactionId::Independent, FactionId::Union, FactionId::Syndicate] {
            registry.set_relation(FactionId::Pirates, other, -1.0);
        }
        registry.set_relation(FactionId::Union, FactionId::Syndicate, -0.2);
        registry
    }

    /// Current standing between two factions.
    pub fn relation(&self, a: FactionId, b: FactionId) -> f32 {
        if a == b {
            return 1.0;
        }
        self.relations.get(&key(a, b)).copied().unwrap_or(0.0)
    }

    pub fn set_relation(&mut self, a: FactionId, b: FactionId, value: f32) {
        if a == b {
            return;
        }
        self.relations.insert(key(a, b), value.clamp(-1.0, 1.0));
    }

    /// Returns true if the two factions are hostile (negative relation).
    pub fn is_hostile(&self, a: FactionId, b: FactionId) -> bool {
        self.relation(a, b) < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_are_symmetric() {
        let mut registry = FactionRegistry::default();
        registry.set_relation(FactionId::Syndicate, FactionId::Union, 0.4);
        assert!((registry.relation(FactionId::Union, FactionId::Syndicate) - 0.4).abs() < f32::EPSILON);
        assert!((registry.relation(FactionId::Syndicate, FactionId::Union) - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_defaults() {
        let registry = FactionRegistry::new();
        assert!(registry.is_hostile(FactionId::Pirates, FactionId::Union));
        assert!(!registry.is_hostile(FactionId::Pirates, FactionId::Pirates));
        assert_eq!(registry.relation(FactionId::Independent, FactionId::Union), 0.0);
    }

    #[test]
    fn test_values_are_clamped() {
        let mut registry = FactionRegistry::default();
        registry.set_relation(FactionId::Union, FactionId::Independent, 4.0);
        assert_eq!(registry.relation(FactionId::Union, FactionId::Independent), 1.0);
    }
}
