//! Profiles of one data set, keyed by particle id

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::profile::{ParticleProfile, ProfileRef};

/// Immutable map from particle id to profile
#[derive(Debug, Default, Clone)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ProfileRef>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, profile: ParticleProfile) {
        self.profiles.insert(profile.id.clone(), Arc::new(profile));
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<ProfileRef> {
        self.profiles.remove(id)
    }

    /// Resolve a particle id
    pub fn resolve(&self, id: &str) -> Option<&ProfileRef> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profiles sorted by id
    pub fn iter(&self) -> impl Iterator<Item = &ProfileRef> {
        self.profiles.values()
    }

    /// Child cycles, each as the ids along the loop with the first id
    /// repeated at the end (`["lava", "smoke", "lava"]`)
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut reported: BTreeSet<BTreeSet<&str>> = BTreeSet::new();
        let mut done: BTreeSet<&str> = BTreeSet::new();

        for start in self.profiles.keys() {
            let mut path: Vec<&str> = Vec::new();
            self.walk(start, &mut path, &mut done, &mut reported, &mut cycles);
        }
        cycles
    }

    fn walk<'a>(
        &'a self,
        id: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut BTreeSet<&'a str>,
        reported: &mut BTreeSet<BTreeSet<&'a str>>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if let Some(at) = path.iter().position(|p| *p == id) {
            let members: BTreeSet<&str> = path[at..].iter().copied().collect();
            if reported.insert(members) {
                let mut cycle: Vec<String> = path[at..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(id.to_string());
                cycles.push(cycle);
            }
            return;
        }
        if done.contains(id) {
            return;
        }
        let Some(profile) = self.profiles.get(id) else {
            return;
        };

        path.push(id);
        for child in profile.child_ids() {
            self.walk(child, path, done, reported, cycles);
        }
        path.pop();
        done.insert(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChildDefinition, ProfileDefinition};

    fn profile(id: &str, children: &[&str]) -> ParticleProfile {
        let def = ProfileDefinition {
            spawns_particles: children
                .iter()
                .map(|c| ChildDefinition {
                    particle: (*c).to_string(),
                    probability: None,
                    lifetime: None,
                })
                .collect(),
            ..ProfileDefinition::default()
        };
        ParticleProfile::from_definition(id, &def).unwrap()
    }

    #[test]
    fn test_resolve_shares_profile() {
        let mut registry = ProfileRegistry::new();
        registry.insert(profile("flame", &[]));
        let a = registry.resolve("flame").unwrap();
        let b = registry.resolve("flame").unwrap();
        assert!(Arc::ptr_eq(a, b));
        assert!(registry.resolve("smoke").is_none());
    }

    #[test]
    fn test_find_cycles() {
        let mut registry = ProfileRegistry::new();
        registry.insert(profile("lava", &["smoke"]));
        registry.insert(profile("smoke", &["lava"]));
        registry.insert(profile("spark", &["spark"]));
        registry.insert(profile("flame", &["smoke"]));

        let cycles = registry.find_cycles();
        assert_eq!(
            cycles,
            vec![
                // Reached through `flame` first
                vec!["smoke".to_string(), "lava".to_string(), "smoke".to_string()],
                vec!["spark".to_string(), "spark".to_string()],
            ]
        );
    }

    #[test]
    fn test_acyclic_graph() {
        let mut registry = ProfileRegistry::new();
        registry.insert(profile("lava", &["smoke"]));
        registry.insert(profile("smoke", &[]));
        assert!(registry.find_cycles().is_empty());
    }
}
