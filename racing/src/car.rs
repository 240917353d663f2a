use bevy_math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::devices::{
    CollisionProbe, RadarReading, TRACK_RADAR_MAX_DISTANCE, TRACK_RADAR_RAY_COUNT, TrackRadar,
    collision_probe::{PROBE_ANGLE_DEG, PROBE_DISTANCE},
};
use crate::track::TrackSurface;

/// Unit vector for an angle in degrees, in image space (y grows downwards).
pub fn screen_direction(angle_deg: f32) -> Vec2 {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    Vec2::new(cos, -sin)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnCommand {
    Left,
    Right,
    #[default]
    Straight,
}

impl TurnCommand {
    /// Heading change in degrees for one tick. Left turns increase the heading.
    pub fn heading_delta(self, turn_rate_deg: f32) -> f32 {
        match self {
            TurnCommand::Left => turn_rate_deg,
            TurnCommand::Right => -turn_rate_deg,
            TurnCommand::Straight => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarParams {
    pub speed: f32,
    /// Distance units travelled per unit of speed each tick.
    pub step_scale: f32,
    pub turn_rate_deg: f32,
    pub radar_range: u32,
    pub probe_distance: f32,
    pub probe_angle_deg: f32,
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            speed: 0.8,
            step_scale: 6.0,
            turn_rate_deg: 5.0,
            radar_range: TRACK_RADAR_MAX_DISTANCE,
            probe_distance: PROBE_DISTANCE,
            probe_angle_deg: PROBE_ANGLE_DEG,
        }
    }
}

impl CarParams {
    /// Distance covered in one tick.
    pub fn step_length(&self) -> f32 {
        self.speed * self.step_scale
    }
}

#[derive(Debug, Clone)]
pub struct Car {
    position: Vec2,
    /// Degrees, counter-clockwise on screen, never wrapped.
    heading_deg: f32,
    velocity: Vec2,
    params: CarParams,
    command: TurnCommand,
    alive: bool,
    radar: TrackRadar,
    probe: CollisionProbe,
}

impl Car {
    pub fn new(position: Vec2, heading_deg: f32, params: CarParams) -> Self {
        Self {
            position,
            heading_deg,
            velocity: screen_direction(heading_deg) * params.speed,
            params,
            command: TurnCommand::Straight,
            alive: true,
            radar: TrackRadar::new(params.radar_range),
            probe: CollisionProbe {
                distance: params.probe_distance,
                angle_deg: params.probe_angle_deg,
            },
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn heading_deg(&self) -> f32 {
        self.heading_deg
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn params(&self) -> &CarParams {
        &self.params
    }

    pub fn command(&self) -> TurnCommand {
        self.command
    }

    /// Takes effect on the next [`Car::advance`] and persists until replaced.
    pub fn set_command(&mut self, command: TurnCommand) {
        self.command = command;
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Marks the car crashed. There is no way back.
    pub fn crash(&mut self) {
        if self.alive {
            debug!(x = self.position.x, y = self.position.y, heading = self.heading_deg, "car crashed");
            self.alive = false;
        }
    }

    pub fn readings(&self) -> &[RadarReading; TRACK_RADAR_RAY_COUNT] {
        self.radar.readings()
    }

    /// Latest radar distances, the controller input.
    pub fn inputs(&self) -> [f64; TRACK_RADAR_RAY_COUNT] {
        self.radar.inputs()
    }

    pub fn probe_points(&self) -> [Vec2; 2] {
        self.probe.points(self.position, self.heading_deg)
    }

    /// Turn by the current command, then move one step along the new heading.
    ///
    /// The velocity vector is rotated by the same amount as the heading so the
    /// two never drift apart.
    /// Because the turn comes first, a new command already bends this tick's
    /// step instead of only the next one.
    pub fn advance(&mut self) {
        let delta = self.command.heading_delta(self.params.turn_rate_deg);
        if delta != 0.0 {
            self.heading_deg += delta;
            // Image y points down, so a counter-clockwise heading change is a
            // negative rotation of the vector.
            self.velocity = Vec2::from_angle(-delta.to_radians()).rotate(self.velocity);
        }
        self.position += self.velocity * self.params.step_scale;
    }

    /// One simulation step: move, re-cast the radar, check the whiskers.
    pub fn update(&mut self, track: &TrackSurface) {
        if !self.alive {
            return;
        }
        self.radar.reset();
        self.advance();
        if self.sense(track) {
            self.crash();
        }
    }

    /// Re-cast the radar at the current pose without moving. Returns whether
    /// either whisker touches the boundary.
    pub fn sense(&mut self, track: &TrackSurface) -> bool {
        self.radar.update(self.position, self.heading_deg, track);
        self.probe.hits_boundary(self.position, self.heading_deg, track)
    }
}
