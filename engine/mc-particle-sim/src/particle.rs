//! Live particle instances

use std::fmt;

use glam::{DVec3, DVec4};
use mc_particle_data::ProfileRef;
use serde::{Deserialize, Serialize};

/// Store-unique particle handle; ids increase in spawn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single simulated particle
#[derive(Debug, Clone)]
pub struct ParticleInstance {
    pub id: ParticleId,
    /// Shared, immutable physics profile
    pub profile: ProfileRef,
    pub position: DVec3,
    pub velocity: DVec3,
    /// Ticks lived
    pub age: u32,
    /// Ticks until death
    pub lifetime: u32,
    /// Spawn generation: 0 for rule spawns, parent + 1 for children
    pub depth: u32,
    /// Color before lifetime animation (profile base or rule override)
    pub base_color: DVec4,
    /// Color at the end of the animation
    pub target_color: DVec4,
    /// Rule-supplied size multiplier
    pub scale: f64,
    pub render_color: DVec4,
    pub render_size: f64,
    /// Index into the profile's texture list, `None` without textures
    pub texture_frame: Option<u32>,
}

impl ParticleInstance {
    /// Create a particle at age 0; render values start at the
    /// profile's base values
    pub fn new(
        id: ParticleId,
        profile: ProfileRef,
        position: DVec3,
        velocity: DVec3,
        lifetime: u32,
    ) -> Self {
        let base_color = profile.color_base;
        let target_color = profile.color_target;
        let render_size = profile.base_size;
        let texture_frame = (!profile.textures.is_empty()).then_some(0);
        Self {
            id,
            profile,
            position,
            velocity,
            age: 0,
            lifetime,
            depth: 0,
            base_color,
            target_color,
            scale: 1.0,
            render_color: base_color,
            render_size,
            texture_frame,
        }
    }

    /// Check if the particle is still alive
    pub fn is_alive(&self) -> bool {
        self.age < self.lifetime
    }

    /// Normalized age in `[0, 1]`
    pub fn age_fraction(&self) -> f64 {
        if self.lifetime == 0 {
            return 1.0;
        }
        (f64::from(self.age) / f64::from(self.lifetime)).min(1.0)
    }

    /// Replace the base color; the animation then fades the new color
    /// toward the profile's target alpha
    pub fn with_color(mut self, color: DVec4) -> Self {
        self.base_color = color;
        self.target_color = color.truncate().extend(self.profile.color_target.w);
        self.render_color = color;
        self
    }

    /// Apply a size multiplier
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self.render_size = self.profile.base_size * scale;
        self
    }

    /// Whether position and velocity are finite
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }

    /// Recompute render color, size and frame for the current age
    pub(crate) fn animate(&mut self) {
        let profile = &self.profile;
        let t = self.age_fraction();

        if profile.lifetime_animation {
            let k = (profile.color_scale * t).clamp(0.0, 1.0);
            self.render_color = self.base_color.lerp(self.target_color, k);
            self.render_size = profile.size_at(t) * self.scale;
        }

        if profile.sprite_from_age && !profile.textures.is_empty() {
            let last = profile.textures.len() as u64 - 1;
            let frame = u64::from(self.age) * last / u64::from(self.lifetime.max(1));
            self.texture_frame = Some(frame.min(last) as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mc_particle_data::{ParticleProfile, SizeCurve, schema::ProfileDefinition};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn profile(textures: usize, sprite_from_age: bool) -> ProfileRef {
        let def = ProfileDefinition {
            lifetime_animation: true,
            textures: (0..textures).map(|i| format!("t_{i}")).collect(),
            sprite_from_age,
            ..ProfileDefinition::default()
        };
        let mut profile = ParticleProfile::from_definition("test", &def).unwrap();
        profile.size_curve = SizeCurve::EaseInQuad;
        Arc::new(profile)
    }

    #[test]
    fn test_particle_lifecycle() {
        let mut particle = ParticleInstance::new(
            ParticleId(1),
            profile(0, false),
            DVec3::ZERO,
            DVec3::ZERO,
            4,
        );
        assert!(particle.is_alive());
        assert_eq!(particle.age_fraction(), 0.0);
        assert_eq!(particle.texture_frame, None);

        particle.age = 3;
        assert!(particle.is_alive());
        particle.age = 4;
        assert!(!particle.is_alive());
        assert_eq!(particle.age_fraction(), 1.0);
    }

    #[test]
    fn test_animate_size_and_color() {
        let mut particle = ParticleInstance::new(
            ParticleId(1),
            profile(0, false),
            DVec3::ZERO,
            DVec3::ZERO,
            10,
        );
        particle.age = 5;
        particle.animate();
        assert!((particle.render_size - 0.25 * particle.profile.base_size).abs() < 1e-12);
        // Default target keeps the base color and fades alpha
        assert!((particle.render_color.w - 0.5).abs() < 1e-12);
        assert_eq!(particle.render_color.x, particle.profile.color_base.x);
    }

    #[test]
    fn test_color_override_fades_in_place() {
        let mut particle = ParticleInstance::new(
            ParticleId(1),
            profile(0, false),
            DVec3::ZERO,
            DVec3::ZERO,
            10,
        )
        .with_color(DVec4::new(1.0, 0.0, 0.0, 1.0))
        .with_scale(2.0);
        assert_eq!(particle.render_size, 2.0);

        particle.age = 10;
        particle.animate();
        assert_eq!(particle.render_color, DVec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(particle.render_size, 2.0);
    }

    #[test]
    fn test_sprite_follows_age() {
        let mut particle = ParticleInstance::new(
            ParticleId(1),
            profile(4, true),
            DVec3::ZERO,
            DVec3::ZERO,
            12,
        );
        let mut frames = Vec::new();
        for age in 0..12 {
            particle.age = age;
            particle.animate();
            frames.push(particle.texture_frame.unwrap());
        }
        assert_eq!(frames, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_non_finite_detection() {
        let mut particle = ParticleInstance::new(
            ParticleId(1),
            profile(0, false),
            DVec3::ZERO,
            DVec3::ZERO,
            4,
        );
        assert!(particle.is_finite());
        particle.velocity.y = f64::INFINITY;
        assert!(!particle.is_finite());
    }

    proptest! {
        #[test]
        fn linear_grow_is_monotonic_and_saturates(
            multiplier in 0.5f64..64.0,
            lifetime in 1u32..200,
        ) {
            let mut profile = (*profile(0, false)).clone();
            profile.size_curve = SizeCurve::LinearGrowClamped { multiplier };
            let mut particle =
                ParticleInstance::new(ParticleId(1), Arc::new(profile), DVec3::ZERO, DVec3::ZERO, lifetime);

            let mut previous = 0.0;
            for age in 0..=lifetime {
                particle.age = age;
                particle.animate();
                let size = particle.render_size;
                prop_assert!(size >= previous);
                prop_assert!(size <= particle.profile.base_size);
                if f64::from(age) / f64::from(lifetime) * multiplier >= 1.0 {
                    prop_assert_eq!(size, particle.profile.base_size);
                }
                previous = size;
            }
        }
    }
}
