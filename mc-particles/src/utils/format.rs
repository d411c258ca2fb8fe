//! Formatting utilities

use glam::{DVec3, DVec4};
use mc_particle_data::{Behavior, LifetimeRange};

/// Format a vector with two decimals
pub fn format_vec3(v: DVec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}

/// Format an RGBA color
pub fn format_color(c: DVec4) -> String {
    format!("rgba({:.2}, {:.2}, {:.2}, {:.2})", c.x, c.y, c.z, c.w)
}

/// Format a lifetime range, `-` when supplied at spawn
pub fn format_lifetime(range: Option<LifetimeRange>) -> String {
    match range {
        Some(LifetimeRange { min, max }) if min == max => min.to_string(),
        Some(LifetimeRange { min, max }) => format!("{min}-{max}"),
        None => "-".to_string(),
    }
}

pub fn format_behavior(behavior: Option<Behavior>) -> String {
    match behavior {
        Some(Behavior::RisingFlame { drift }) => format!("rising_flame({drift})"),
        Some(Behavior::AshSmoke { bias, spread }) => format!("ash_smoke({bias}, {spread})"),
        None => "-".to_string(),
    }
}

/// Format an optional value, `-` when absent
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lifetime() {
        assert_eq!(format_lifetime(Some(LifetimeRange { min: 8, max: 12 })), "8-12");
        assert_eq!(format_lifetime(Some(LifetimeRange { min: 10, max: 10 })), "10");
        assert_eq!(format_lifetime(None), "-");
    }

    #[test]
    fn test_format_vectors() {
        assert_eq!(format_vec3(DVec3::new(0.5, 64.0, -1.25)), "(0.50, 64.00, -1.25)");
        assert_eq!(format_color(DVec4::ONE), "rgba(1.00, 1.00, 1.00, 1.00)");
        assert_eq!(format_optional(Some(0.75)), "0.75");
        assert_eq!(format_optional::<f64>(None), "-");
    }
}
