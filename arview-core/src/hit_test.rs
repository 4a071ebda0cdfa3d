//! Per-frame hit testing and the reticle that marks the current surface hit

use crate::geometry::Mesh;
use crate::transform::Pose;

pub const RETICLE_INNER_RADIUS: f32 = 0.15;
pub const RETICLE_OUTER_RADIUS: f32 = 0.2;
pub const RETICLE_SEGMENTS: usize = 32;

/// Ring geometry drawn at the hit location
pub fn reticle_mesh() -> Mesh {
    Mesh::ring(RETICLE_INNER_RADIUS, RETICLE_OUTER_RADIUS, RETICLE_SEGMENTS)
}

/// Visibility and transform of the reticle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reticle {
    visible: bool,
    pose: Pose,
}

impl Reticle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    /// Apply one frame's hit list: the nearest hit shows the reticle there,
    /// an empty list hides it. Returns true if visibility changed.
    pub fn track(&mut self, hits: &[Pose]) -> bool {
        let was_visible = self.visible;
        match hits.first() {
            Some(nearest) => {
                self.visible = true;
                self.pose = *nearest;
            }
            None => self.visible = false,
        }
        was_visible != self.visible
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Pose to place at, if a surface is currently under the reticle
    pub fn placement_pose(&self) -> Option<&Pose> {
        self.visible.then_some(&self.pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_nearest_hit_wins() {
        let near = Pose::from_translation(Point3::new(0.0, 0.0, -1.0));
        let far = Pose::from_translation(Point3::new(0.0, 0.0, -3.0));
        let mut reticle = Reticle::new();

        assert!(reticle.track(&[near, far]));
        assert!(reticle.is_visible());
        assert_eq!(reticle.pose(), &near);
    }

    #[test]
    fn test_empty_frame_hides() {
        let mut reticle = Reticle::new();
        reticle.track(&[Pose::identity()]);
        assert!(reticle.track(&[]));
        assert!(!reticle.is_visible());
        assert!(reticle.placement_pose().is_none());
        assert!(!reticle.track(&[]));
    }

    #[test]
    fn test_reticle_mesh_dimensions() {
        let bounds = reticle_mesh().bounds().unwrap();
        assert!((bounds.max.x - RETICLE_OUTER_RADIUS).abs() < 1e-6);
    }
}
