use std::path::{Path, PathBuf};

use bevy_math::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::car::{Car, CarParams};
use crate::track::{BoundaryColor, TrackError, TrackSurface};

#[derive(Debug, Error)]
pub enum TrackFileError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("failed to serialize track: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Surface(#[from] TrackError),
}

/// Track description stored as TOML next to its raster image.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackFile {
    #[serde(default)]
    pub metadata: TrackMetadata,
    pub surface: SurfaceSpec,
    #[serde(default)]
    pub spawn: SpawnPoint,
    #[serde(default)]
    pub car: CarParams,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TrackMetadata {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub author: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            name: default_name(),
            author: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SurfaceSpec {
    /// Image path, relative to the TOML file unless absolute.
    pub image: PathBuf,
    #[serde(default)]
    pub boundary_color: BoundaryColor,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint {
    #[serde(default = "default_spawn_position")]
    pub position: [f32; 2],
    #[serde(default)]
    pub heading_deg: f32,
}

impl Default for SpawnPoint {
    fn default() -> Self {
        Self {
            position: default_spawn_position(),
            heading_deg: 0.0,
        }
    }
}

fn default_name() -> String {
    "Untitled".to_string()
}

fn default_spawn_position() -> [f32; 2] {
    [490.0, 820.0]
}

impl TrackFile {
    /// A track with default metadata, spawn and car tuning.
    pub fn new(image: impl Into<PathBuf>) -> Self {
        Self {
            metadata: TrackMetadata::default(),
            surface: SurfaceSpec {
                image: image.into(),
                boundary_color: BoundaryColor::default(),
            },
            spawn: SpawnPoint::default(),
            car: CarParams::default(),
        }
    }

    /// Load a track from a TOML file.
    pub fn load(path: &Path) -> Result<Self, TrackFileError> {
        let text = std::fs::read_to_string(path).map_err(|source| TrackFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| TrackFileError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Save this track to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), TrackFileError> {
        let text = toml::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| TrackFileError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn image_path(&self, base_dir: &Path) -> PathBuf {
        if self.surface.image.is_absolute() {
            self.surface.image.clone()
        } else {
            base_dir.join(&self.surface.image)
        }
    }

    /// Decode the raster this file points at.
    pub fn load_surface(&self, base_dir: &Path) -> Result<TrackSurface, TrackFileError> {
        Ok(TrackSurface::load(
            &self.image_path(base_dir),
            self.surface.boundary_color,
        )?)
    }

    pub fn spawn_position(&self) -> Vec2 {
        Vec2::from_array(self.spawn.position)
    }

    /// A fresh car at the spawn point with this track's tuning.
    pub fn spawn_car(&self) -> Car {
        Car::new(self.spawn_position(), self.spawn.heading_deg, self.car)
    }
}
