use bevy_math::Vec2;

use crate::car::screen_direction;
use crate::track::TrackSurface;

pub const PROBE_DISTANCE: f32 = 40.0;
pub const PROBE_ANGLE_DEG: f32 = 18.0;

/// Forward whiskers at `heading ± angle_deg`, `distance` units from the centre.
///
/// Deliberately independent of the radar fan: shorter and at its own angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionProbe {
    pub distance: f32,
    pub angle_deg: f32,
}

impl Default for CollisionProbe {
    fn default() -> Self {
        Self {
            distance: PROBE_DISTANCE,
            angle_deg: PROBE_ANGLE_DEG,
        }
    }
}

impl CollisionProbe {
    /// Probe points as `[left, right]` of the heading.
    pub fn points(&self, center: Vec2, heading_deg: f32) -> [Vec2; 2] {
        [
            center + screen_direction(heading_deg + self.angle_deg) * self.distance,
            center + screen_direction(heading_deg - self.angle_deg) * self.distance,
        ]
    }

    pub fn hits_boundary(&self, center: Vec2, heading_deg: f32, track: &TrackSurface) -> bool {
        self.points(center, heading_deg)
            .iter()
            .any(|&point| track.boundary_at_point(point))
    }
}
