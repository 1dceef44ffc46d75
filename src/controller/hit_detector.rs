use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::model::{CategoryId, DropSimulation, FallingObject, Playfield, PoseFrame, TrackedPoint};

/// How a tracked point is tested against a drop
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HitGeometry {
    /// Lane-wide box spanning one object height above the baseline
    BoundingBox,
    /// Distance to the glyph's center below `lane_multiple` lane widths
    Distance { lane_multiple: f32 },
}

impl HitGeometry {
    pub fn contains(&self, field: &Playfield, obj: &FallingObject, point: Vec2) -> bool {
        let lane_width = field.lane_width();
        match *self {
            HitGeometry::BoundingBox => {
                point.x >= obj.position.x
                    && point.x <= obj.position.x + lane_width
                    && point.y >= obj.position.y - field.object_height
                    && point.y <= obj.position.y
            }
            HitGeometry::Distance { lane_multiple } => {
                let center = Vec2::new(obj.position.x + lane_width / 2.0, obj.position.y);
                point.distance(center) < lane_width * lane_multiple
            }
        }
    }
}

/// A registered swat
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub object_id: u64,
    pub category: CategoryId,
    /// Name of the tracked point that struck
    pub part: String,
    /// Left edge of the struck object's lane; drives the pitch
    pub x: f32,
}

pub struct HitDetector {
    pub geometry: HitGeometry,
    pub confidence_threshold: f32,
    pub tracked_points: Vec<TrackedPoint>,
}

impl HitDetector {
    pub fn new(geometry: HitGeometry, confidence_threshold: f32, tracked_points: Vec<TrackedPoint>) -> Self {
        Self { geometry, confidence_threshold, tracked_points }
    }

    /// Sweep one pose result over the active drops.
    ///
    /// Each tracked point strikes at most the first unhit drop containing
    /// it; that drop is marked `hit` before the next point is tested.
    /// Hits are returned in the order they happened.
    pub fn detect(&self, frame: &PoseFrame, sim: &mut DropSimulation) -> Vec<Hit> {
        let field = *sim.playfield();
        let mut hits = Vec::new();

        for tracked in &self.tracked_points {
            let Some(landmark) = frame.get(tracked.index) else {
                continue;
            };
            if landmark.visibility <= self.confidence_threshold {
                continue;
            }
            let point = field.to_pixels(landmark);

            let struck = sim
                .objects_mut()
                .iter_mut()
                .find(|obj| !obj.hit && self.geometry.contains(&field, obj, point));
            if let Some(obj) = struck {
                obj.hit = true;
                hits.push(Hit {
                    object_id: obj.id,
                    category: obj.category,
                    part: tracked.name.clone(),
                    x: obj.position.x,
                });
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::landmarks::{LEFT_INDEX, RIGHT_INDEX};
    use crate::model::Landmark;

    fn field() -> Playfield {
        Playfield::default()
    }

    fn at_pixels(x: f32, y: f32, visibility: f32) -> Landmark {
        let f = field();
        Landmark { x: x / f.width, y: y / f.height, visibility }
    }

    fn detector(geometry: HitGeometry) -> HitDetector {
        HitDetector::new(geometry, 0.2, TrackedPoint::hands())
    }

    #[test]
    fn test_bounding_box_edges() {
        let f = field();
        let obj = FallingObject {
            id: 0,
            position: Vec2::new(100.0, 50.0),
            velocity: 1.0,
            category: CategoryId(0),
            lane: 10,
            hit: false,
        };
        let g = HitGeometry::BoundingBox;
        assert!(g.contains(&f, &obj, Vec2::new(100.0, 50.0)));
        assert!(g.contains(&f, &obj, Vec2::new(110.0, 30.0)));
        assert!(!g.contains(&f, &obj, Vec2::new(110.1, 40.0)));
        assert!(!g.contains(&f, &obj, Vec2::new(105.0, 50.1)));
        assert!(!g.contains(&f, &obj, Vec2::new(105.0, 29.9)));
    }

    #[test]
    fn test_distance_geometry_is_more_forgiving() {
        let f = field();
        let obj = FallingObject {
            id: 0,
            position: Vec2::new(100.0, 50.0),
            velocity: 1.0,
            category: CategoryId(0),
            lane: 10,
            hit: false,
        };
        let g = HitGeometry::Distance { lane_multiple: 1.5 };
        // below the baseline: outside the box but within 15px of the center
        let p = Vec2::new(105.0, 60.0);
        assert!(g.contains(&f, &obj, p));
        assert!(!HitGeometry::BoundingBox.contains(&f, &obj, p));
        assert!(!g.contains(&f, &obj, Vec2::new(105.0, 65.0)));
    }

    #[test]
    fn test_point_at_object_position_hits_once() {
        let mut sim = DropSimulation::new(field(), [1.0, 3.0], 1);
        let id = sim.spawn_at(CategoryId(4), 20, 2.0);
        sim.advance(1.0);
        let pos = sim.get(id).unwrap().position;

        let d = detector(HitGeometry::BoundingBox);
        let frame = PoseFrame::with_point(RIGHT_INDEX, at_pixels(pos.x, pos.y, 0.9));
        let hits = d.detect(&frame, &mut sim);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object_id, id);
        assert_eq!(hits[0].part, "right_hand");
        assert!(sim.get(id).unwrap().hit);

        // the same result again finds nothing left to hit
        assert!(d.detect(&frame, &mut sim).is_empty());
    }

    #[test]
    fn test_two_points_on_one_object_count_once() {
        let mut sim = DropSimulation::new(field(), [1.0, 3.0], 1);
        let id = sim.spawn_at(CategoryId(0), 5, 1.0);
        let pos = sim.get(id).unwrap().position;

        let mut frame = PoseFrame::with_point(LEFT_INDEX, at_pixels(pos.x + 2.0, pos.y, 1.0));
        frame.landmarks[RIGHT_INDEX] = at_pixels(pos.x + 4.0, pos.y, 1.0);

        let hits = detector(HitGeometry::BoundingBox).detect(&frame, &mut sim);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].part, "left_hand");
    }

    #[test]
    fn test_two_points_hit_two_objects() {
        let mut sim = DropSimulation::new(field(), [1.0, 3.0], 1);
        let a = sim.spawn_at(CategoryId(0), 5, 1.0);
        let b = sim.spawn_at(CategoryId(1), 50, 1.0);
        let pa = sim.get(a).unwrap().position;
        let pb = sim.get(b).unwrap().position;

        let mut frame = PoseFrame::with_point(LEFT_INDEX, at_pixels(pa.x, pa.y, 1.0));
        frame.landmarks[RIGHT_INDEX] = at_pixels(pb.x, pb.y, 1.0);

        let hits = detector(HitGeometry::BoundingBox).detect(&frame, &mut sim);
        let ids: Vec<u64> = hits.iter().map(|h| h.object_id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_low_visibility_and_missing_points_are_skipped() {
        let mut sim = DropSimulation::new(field(), [1.0, 3.0], 1);
        let id = sim.spawn_at(CategoryId(0), 5, 1.0);
        let pos = sim.get(id).unwrap().position;
        let d = detector(HitGeometry::BoundingBox);

        // exactly at the threshold does not count
        let frame = PoseFrame::with_point(LEFT_INDEX, at_pixels(pos.x, pos.y, 0.2));
        assert!(d.detect(&frame, &mut sim).is_empty());

        // a truncated result lacks the hand landmarks entirely
        let frame = PoseFrame::new(vec![at_pixels(pos.x, pos.y, 1.0); 5]);
        assert!(d.detect(&frame, &mut sim).is_empty());
        assert!(!sim.get(id).unwrap().hit);
    }
}
