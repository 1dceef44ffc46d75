use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::model::Landmark;

/// Pixel geometry of the play area
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Playfield {
    pub width: f32,
    pub height: f32,
    /// Number of equal-width vertical lanes (piano keys)
    pub lanes: u32,
    /// Glyph height; drops spawn this far above the top edge
    pub object_height: f32,
}

impl Playfield {
    pub fn lane_width(&self) -> f32 {
        self.width / self.lanes as f32
    }

    /// Left edge of a lane
    pub fn lane_x(&self, lane: u32) -> f32 {
        lane as f32 * self.lane_width()
    }

    /// Normalized landmark position scaled to playfield pixels
    pub fn to_pixels(&self, landmark: &Landmark) -> Vec2 {
        Vec2::new(landmark.x * self.width, landmark.y * self.height)
    }
}

impl Default for Playfield {
    fn default() -> Self {
        Self {
            width: 880.0,
            height: 240.0,
            lanes: 88,
            object_height: 20.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_geometry() {
        let field = Playfield::default();
        assert_eq!(field.lane_width(), 10.0);
        assert_eq!(field.lane_x(0), 0.0);
        assert_eq!(field.lane_x(87), 870.0);
    }

    #[test]
    fn test_landmark_to_pixels() {
        let field = Playfield::default();
        let p = field.to_pixels(&Landmark { x: 0.5, y: 0.25, visibility: 1.0 });
        assert_eq!(p, Vec2::new(440.0, 60.0));
    }
}
