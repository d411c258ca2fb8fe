//! Bounded instance store with deferred despawns

use glam::DVec3;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::particle::{ParticleId, ParticleInstance};

/// Axis-aligned box used for region despawns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// A despawn waiting for the next tick boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DespawnRequest {
    One(ParticleId),
    All,
    Within(Aabb),
}

/// Live particles in spawn order
///
/// The backing `Vec` keeps its allocation across ticks; removal goes through
/// [`retain_mut`](Self::retain_mut) so order is preserved.
#[derive(Debug)]
pub struct InstanceStore {
    particles: Vec<ParticleInstance>,
    capacity: usize,
    next_id: u64,
    despawns: Vec<DespawnRequest>,
}

impl InstanceStore {
    /// Create a store holding at most `capacity` particles
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
            despawns: Vec::new(),
        }
    }

    /// Allocate the next id
    pub fn next_id(&mut self) -> ParticleId {
        let id = ParticleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Whether another particle fits
    pub fn has_room(&self) -> bool {
        self.particles.len() < self.capacity
    }

    /// Add a particle; hands it back when the store is full
    pub fn push(&mut self, particle: ParticleInstance) -> Result<ParticleId, ParticleInstance> {
        if !self.has_room() {
            return Err(particle);
        }
        let id = particle.id;
        self.particles.push(particle);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleInstance> {
        self.particles.iter()
    }

    /// Look up a live particle
    pub fn get(&self, id: ParticleId) -> Option<&ParticleInstance> {
        // Ids are pushed in increasing order and removal keeps order
        self.particles
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.particles[i])
    }

    /// Queue a despawn for the next tick boundary
    pub fn request_despawn(&mut self, request: DespawnRequest) {
        self.despawns.push(request);
    }

    /// Number of queued despawn requests
    pub fn pending_despawns(&self) -> usize {
        self.despawns.len()
    }

    /// Apply queued despawns, returning how many particles were removed
    pub fn apply_despawns(&mut self) -> usize {
        if self.despawns.is_empty() {
            return 0;
        }
        let before = self.particles.len();
        let requests = std::mem::take(&mut self.despawns);
        if requests.contains(&DespawnRequest::All) {
            self.particles.clear();
        } else {
            self.particles.retain(|p| {
                !requests.iter().any(|r| match r {
                    DespawnRequest::One(id) => p.id == *id,
                    DespawnRequest::Within(aabb) => aabb.contains(p.position),
                    DespawnRequest::All => true,
                })
            });
        }
        // Reuse the request buffer
        self.despawns = requests;
        self.despawns.clear();

        let removed = before - self.particles.len();
        trace!("Despawned {removed} particles");
        removed
    }

    pub(crate) fn retain_mut<F>(&mut self, f: F)
    where
        F: FnMut(&mut ParticleInstance) -> bool,
    {
        self.particles.retain_mut(f);
    }

    #[cfg(test)]
    pub(crate) fn particles_mut(&mut self) -> &mut [ParticleInstance] {
        &mut self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_particle_data::{ParticleProfile, schema::ProfileDefinition};
    use std::sync::Arc;

    fn store_with(positions: &[f64]) -> InstanceStore {
        let profile = Arc::new(
            ParticleProfile::from_definition("dust", &ProfileDefinition::default()).unwrap(),
        );
        let mut store = InstanceStore::new(8);
        for x in positions {
            let id = store.next_id();
            let particle =
                ParticleInstance::new(id, profile.clone(), DVec3::new(*x, 0.0, 0.0), DVec3::ZERO, 10);
            store.push(particle).unwrap();
        }
        store
    }

    #[test]
    fn test_capacity() {
        let mut store = store_with(&[0.0; 8]);
        assert!(!store.has_room());
        let id = store.next_id();
        let extra = ParticleInstance::new(
            id,
            store.iter().next().unwrap().profile.clone(),
            DVec3::ZERO,
            DVec3::ZERO,
            10,
        );
        assert!(store.push(extra).is_err());
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn test_despawns_wait_for_boundary() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 3.0]);
        store.request_despawn(DespawnRequest::One(ParticleId(2)));
        assert_eq!(store.len(), 4);
        assert!(store.get(ParticleId(2)).is_some());

        assert_eq!(store.apply_despawns(), 1);
        assert!(store.get(ParticleId(2)).is_none());
        let ids: Vec<u64> = store.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 3, 4]);
        assert_eq!(store.pending_despawns(), 0);
    }

    #[test]
    fn test_despawn_within() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 3.0]);
        store.request_despawn(DespawnRequest::Within(Aabb::new(
            DVec3::new(2.5, -1.0, -1.0),
            DVec3::new(0.5, 1.0, 1.0),
        )));
        assert_eq!(store.apply_despawns(), 2);
        let ids: Vec<u64> = store.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![1, 4]);
    }

    #[test]
    fn test_despawn_all() {
        let mut store = store_with(&[0.0, 1.0]);
        store.request_despawn(DespawnRequest::One(ParticleId(1)));
        store.request_despawn(DespawnRequest::All);
        assert_eq!(store.apply_despawns(), 2);
        assert!(store.is_empty());
        // Ids are never reused
        assert_eq!(store.next_id(), ParticleId(3));
    }
}
