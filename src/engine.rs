use std::path::Path;

use glam::DVec3;

use crate::{
    error::{ViewsheetError, ViewsheetResult},
    views::ViewSpec,
};

/// Per-view render size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const MAX_SIDE: u32 = 8192;

    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }

    pub fn validate(&self) -> ViewsheetResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ViewsheetError::validation(
                "render resolution must be non-zero",
            ));
        }
        if self.width > Self::MAX_SIDE || self.height > Self::MAX_SIDE {
            return Err(ViewsheetError::validation(format!(
                "render resolution {}x{} exceeds the {} px per-side limit",
                self.width,
                self.height,
                Self::MAX_SIDE
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the engine learned about a model after loading it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
    pub bounds_min: DVec3,
    pub bounds_max: DVec3,
    pub mesh_count: u32,
    pub has_uv: bool,
}

/// One stateful rendering session.
///
/// The session holds a single active scene and camera, so calls must not
/// overlap; the driver serializes them. The orchestrator owns the session
/// for the duration of one model and calls [`RenderEngine::reset`] before
/// handing it to the next, on success and failure alike.
pub trait RenderEngine {
    /// Replace the current scene with the model at `path`.
    fn load_model(&mut self, path: &Path) -> ViewsheetResult<ModelInfo>;

    /// Set the output size for subsequent renders.
    fn set_resolution(&mut self, resolution: Resolution) -> ViewsheetResult<()>;

    /// Render one view of the loaded scene to an image file at `out_path`.
    fn render_view(&mut self, spec: &ViewSpec, out_path: &Path) -> ViewsheetResult<()>;

    /// Clear the scene so the session can be reused for another model.
    fn reset(&mut self) -> ViewsheetResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_validation_catches_bad_values() {
        assert!(Resolution::square(0).validate().is_err());
        assert!(
            Resolution {
                width: 100,
                height: 0
            }
            .validate()
            .is_err()
        );
        assert!(Resolution::square(Resolution::MAX_SIDE + 1).validate().is_err());
        assert!(Resolution::square(1000).validate().is_ok());
        assert!(Resolution::square(Resolution::MAX_SIDE).validate().is_ok());
    }

    #[test]
    fn resolution_displays_as_wxh() {
        assert_eq!(
            Resolution {
                width: 1920,
                height: 1080
            }
            .to_string(),
            "1920x1080"
        );
    }
}
