use glam::DVec3;

use crate::error::{ViewsheetError, ViewsheetResult};

/// World-space axis-aligned bounding box of a loaded model.
///
/// Construction validates that the box can actually frame a camera: all
/// coordinates finite, `min <= max` per axis, and at least one axis with
/// positive extent. A flat box (e.g. a single plane) is fine; a point or an
/// inverted box is not.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneBounds {
    pub min: DVec3,
    pub max: DVec3,
}

impl SceneBounds {
    pub fn new(min: DVec3, max: DVec3) -> ViewsheetResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(ViewsheetError::geometry(
                "bounding box has non-finite coordinates",
            ));
        }
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(ViewsheetError::geometry(format!(
                "bounding box is inverted: min {min:?} exceeds max {max:?}"
            )));
        }
        let bounds = Self { min, max };
        if bounds.max_dim() <= 0.0 {
            return Err(ViewsheetError::geometry(
                "bounding box is degenerate (zero extent on every axis)",
            ));
        }
        Ok(bounds)
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Longest axis extent. Camera distance and orthographic scale are
    /// derived from this so framing is invariant under model scale.
    pub fn max_dim(&self) -> f64 {
        self.size().max_element()
    }
}
