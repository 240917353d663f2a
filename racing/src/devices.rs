pub mod car_controls;
pub mod collision_probe;
pub mod track_radar;

pub use car_controls::{DECISION_THRESHOLD, turn_command};
pub use collision_probe::CollisionProbe;
pub use track_radar::{
    RadarReading, TRACK_RADAR_ANGLES_DEG, TRACK_RADAR_MAX_DISTANCE, TRACK_RADAR_RAY_COUNT,
    TrackRadar,
};
