//! Tunable simulation constants.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Engine-wide constants. Every field has a serde default so partial
/// JSON overrides work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of linear velocity lost per second.
    pub linear_drag: f32,
    /// Fraction of angular velocity lost per second.
    pub angular_drag: f32,
    /// Impulse to damage conversion for collisions.
    pub collision_damage_multiplier: f32,
    /// Field size for new blueprints.
    pub builder_field_size: IVec2,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            linear_drag: 0.8,
            angular_drag: 0.75,
            collision_damage_multiplier: 0.4,
            builder_field_size: IVec2::new(32, 32),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON override. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Impact damage for `impulse`, before a part's impact health absorbs it.
    ///
    /// Clamped to `0..=i32::MAX`; a NaN impulse deals nothing.
    pub fn impact_damage(&self, impulse: f32) -> i32 {
        let damage = (impulse * self.collision_damage_multiplier).round();
        if damage.is_nan() || damage <= 0.0 {
            0
        } else if damage >= i32::MAX as f32 {
            i32::MAX
        } else {
            damage as i32
        }
    }
}
