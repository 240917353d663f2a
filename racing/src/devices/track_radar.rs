use bevy_math::Vec2;

use crate::car::screen_direction;
use crate::track::TrackSurface;

/// Ray angles relative to the car heading, in degrees, in reading order.
pub const TRACK_RADAR_ANGLES_DEG: [i32; TRACK_RADAR_RAY_COUNT] = [-60, -30, 0, 30, 60];
pub const TRACK_RADAR_RAY_COUNT: usize = 5;
pub const TRACK_RADAR_MAX_DISTANCE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadarReading {
    pub angle_deg: i32,
    pub distance: u32,
}

/// Distances to the track boundary along the fixed forward fan of rays.
///
/// Always holds one reading per angle of [`TRACK_RADAR_ANGLES_DEG`], in that
/// order. Distances are whole units in `0..=max_distance`.
#[derive(Debug, Clone)]
pub struct TrackRadar {
    readings: [RadarReading; TRACK_RADAR_RAY_COUNT],
    max_distance: u32,
}

impl Default for TrackRadar {
    fn default() -> Self {
        Self::new(TRACK_RADAR_MAX_DISTANCE)
    }
}

impl TrackRadar {
    pub fn new(max_distance: u32) -> Self {
        Self {
            readings: TRACK_RADAR_ANGLES_DEG.map(|angle_deg| RadarReading {
                angle_deg,
                distance: 0,
            }),
            max_distance,
        }
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    pub fn readings(&self) -> &[RadarReading; TRACK_RADAR_RAY_COUNT] {
        &self.readings
    }

    /// Distances in reading order, as fed to a controller.
    pub fn inputs(&self) -> [f64; TRACK_RADAR_RAY_COUNT] {
        self.readings.map(|reading| reading.distance as f64)
    }

    pub fn reset(&mut self) {
        for reading in &mut self.readings {
            reading.distance = 0;
        }
    }

    /// Re-cast every ray from `origin` for a car facing `heading_deg`.
    pub fn update(&mut self, origin: Vec2, heading_deg: f32, track: &TrackSurface) {
        for reading in &mut self.readings {
            let direction = screen_direction(heading_deg + reading.angle_deg as f32);
            let (distance, _) = march_ray(origin, direction, self.max_distance, track);
            reading.distance = distance;
        }
    }
}

/// Step one unit at a time from `origin` along `direction` until a boundary
/// pixel is hit or `max_distance` steps were taken.
///
/// The origin itself is tested first, so a ray starting on the boundary reads
/// 0. Returns the rounded distance to the last sampled point and that point.
pub fn march_ray(
    origin: Vec2,
    direction: Vec2,
    max_distance: u32,
    track: &TrackSurface,
) -> (u32, Vec2) {
    let mut length = 0u32;
    let mut point = origin;
    while !track.boundary_at_point(point) && length < max_distance {
        length += 1;
        point = origin + direction * length as f32;
    }

    let distance = origin
        .distance(point)
        .round()
        .clamp(0.0, max_distance as f32) as u32;
    (distance, point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::DEFAULT_BOUNDARY_COLOR;
    use image::RgbImage;

    const OPEN: image::Rgb<u8> = image::Rgb([200, 200, 200]);

    fn open_track(width: u32, height: u32) -> TrackSurface {
        TrackSurface::new(
            RgbImage::from_pixel(width, height, OPEN),
            DEFAULT_BOUNDARY_COLOR,
        )
    }

    /// Open field with a vertical boundary wall at column `wall_x`.
    fn wall_track(wall_x: u32) -> TrackSurface {
        let pixels = RgbImage::from_fn(1000, 1000, |x, _| {
            if x == wall_x {
                image::Rgb(DEFAULT_BOUNDARY_COLOR.0)
            } else {
                OPEN
            }
        });
        TrackSurface::new(pixels, DEFAULT_BOUNDARY_COLOR)
    }

    #[test]
    fn fresh_radar_reports_zero_in_angle_order() {
        let radar = TrackRadar::default();
        let angles: Vec<i32> = radar.readings().iter().map(|r| r.angle_deg).collect();
        assert_eq!(angles, vec![-60, -30, 0, 30, 60]);
        assert_eq!(radar.inputs(), [0.0; 5]);
    }

    #[test]
    fn open_space_reads_max_distance_for_every_ray() {
        let track = open_track(1000, 1000);
        let mut radar = TrackRadar::default();
        for heading in [0.0, 17.0, 90.0, -135.0, 725.0] {
            radar.update(Vec2::new(500.5, 500.5), heading, &track);
            assert!(
                radar
                    .readings()
                    .iter()
                    .all(|r| r.distance == TRACK_RADAR_MAX_DISTANCE),
                "heading {heading}: {:?}",
                radar.readings()
            );
        }
    }

    #[test]
    fn straight_ray_stops_at_wall() {
        let track = wall_track(550);
        let (distance, end) = march_ray(Vec2::new(500.5, 500.5), Vec2::X, 200, &track);
        assert_eq!(distance, 50);
        assert_eq!(end.x.floor(), 550.0);
    }

    #[test]
    fn side_rays_measure_slant_distance() {
        let track = wall_track(610);
        let mut radar = TrackRadar::default();
        radar.update(Vec2::new(500.5, 500.5), 0.0, &track);
        let d = radar.inputs();
        assert_eq!(d[2], 110.0);
        // 109.5 units to the wall, crossed after ceil(109.5 / cos 30°) steps.
        assert_eq!(d[1], 127.0);
        assert_eq!(d[3], 127.0);
        // At ±60° the wall is beyond range.
        assert_eq!(d[0], 200.0);
        assert_eq!(d[4], 200.0);
    }

    #[test]
    fn y_axis_points_down_the_image() {
        // Boundary row above the car: facing up the image every ray finds it,
        // facing down none does.
        let pixels = RgbImage::from_fn(400, 400, |_, y| {
            if y == 170 {
                image::Rgb(DEFAULT_BOUNDARY_COLOR.0)
            } else {
                OPEN
            }
        });
        let track = TrackSurface::new(pixels, DEFAULT_BOUNDARY_COLOR);
        let mut radar = TrackRadar::default();
        radar.update(Vec2::new(200.5, 200.5), 90.0, &track);
        let d = radar.inputs();
        assert_eq!(d[2], 30.0);
        assert!(d.iter().all(|&v| v < 200.0), "{d:?}");

        radar.update(Vec2::new(200.5, 200.5), -90.0, &track);
        assert_eq!(radar.inputs(), [200.0; 5]);
    }

    #[test]
    fn ray_starting_on_boundary_reads_zero() {
        let track = wall_track(500);
        let (distance, end) = march_ray(Vec2::new(500.5, 500.5), Vec2::Y, 200, &track);
        assert_eq!(distance, 0);
        assert_eq!(end, Vec2::new(500.5, 500.5));
    }

    #[test]
    fn leaving_the_image_ends_the_ray() {
        let track = open_track(100, 100);
        let (distance, _) = march_ray(Vec2::new(90.5, 50.5), Vec2::X, 200, &track);
        assert_eq!(distance, 10);
    }

    #[test]
    fn reset_clears_distances_but_keeps_angles() {
        let track = open_track(1000, 1000);
        let mut radar = TrackRadar::new(80);
        radar.update(Vec2::new(500.0, 500.0), 0.0, &track);
        assert_eq!(radar.inputs(), [80.0; 5]);
        radar.reset();
        assert_eq!(radar.inputs(), [0.0; 5]);
        assert_eq!(radar.readings()[4].angle_deg, 60);
    }
}
