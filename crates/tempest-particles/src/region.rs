//! Spawn region: a horizontal rectangle at a fixed height.

use glam::{Vec2, Vec3};
use rand::Rng;
use tempest_config::SpawnRegionConfig;

/// Errors raised when building a [`SpawnRegion`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    /// A max corner lies below its min corner (or a bound is NaN).
    #[error("spawn region max {max:?} is not >= min {min:?}")]
    Inverted {
        /// Min corner `(x, z)`.
        min: Vec2,
        /// Max corner `(x, z)`.
        max: Vec2,
    },
}

/// Axis-aligned rectangle in the XZ plane at height `y`.
///
/// Corners are stored as `Vec2(x, z)`. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRegion {
    min: Vec2,
    max: Vec2,
    y: f32,
}

impl SpawnRegion {
    /// Builds a region from its `(x, z)` corners and height.
    pub fn new(min: Vec2, max: Vec2, y: f32) -> Result<Self, RegionError> {
        // Negated comparisons also reject NaN bounds.
        if !(min.x <= max.x) || !(min.y <= max.y) {
            return Err(RegionError::Inverted { min, max });
        }
        Ok(Self { min, max, y })
    }

    /// Builds a region from its configuration section.
    pub fn from_config(config: &SpawnRegionConfig) -> Result<Self, RegionError> {
        Self::new(
            Vec2::from_array(config.min),
            Vec2::from_array(config.max),
            config.height,
        )
    }

    /// Min corner as `(x, z)`.
    pub fn min(&self) -> Vec2 {
        self.min
    }

    /// Max corner as `(x, z)`.
    pub fn max(&self) -> Vec2 {
        self.max
    }

    /// Spawn height.
    pub fn height(&self) -> f32 {
        self.y
    }

    /// Extent along X.
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Extent along Z.
    pub fn length(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Whether a 3D point lies on the region: exact height match and the
    /// horizontal projection inside the rectangle, edges included.
    pub fn contains(&self, point: Vec3) -> bool {
        point.y == self.y && self.contains_xz(Vec2::new(point.x, point.z))
    }

    /// Whether an `(x, z)` point lies inside the rectangle, edges included.
    pub fn contains_xz(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Draws a point with independently uniform `x` and `z` at the region height.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let x = rng.random_range(self.min.x..=self.max.x);
        let z = rng.random_range(self.min.y..=self.max.y);
        Vec3::new(x, self.y, z)
    }
}
