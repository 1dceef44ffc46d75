use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{CategoryId, Playfield};

/// An interactive drop falling down one lane
#[derive(Clone, Debug, PartialEq)]
pub struct FallingObject {
    pub id: u64,
    /// `x` is the lane's left edge, `y` the glyph baseline (grows downward)
    pub position: Vec2,
    /// Units per tick before the speed multiplier
    pub velocity: f32,
    pub category: CategoryId,
    pub lane: u32,
    pub hit: bool,
}

/// A drop that left the bottom of the playfield unswatted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Miss {
    pub id: u64,
    pub category: CategoryId,
}

/// Owns the active falling objects
pub struct DropSimulation {
    playfield: Playfield,
    velocity_range: [f32; 2],
    objects: Vec<FallingObject>,
    next_id: u64,
    rng: StdRng,
}

impl DropSimulation {
    pub fn new(playfield: Playfield, velocity_range: [f32; 2], seed: u64) -> Self {
        Self {
            playfield,
            velocity_range,
            objects: Vec::new(),
            next_id: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn playfield(&self) -> &Playfield {
        &self.playfield
    }

    /// Spawn one drop in a random lane with a random category from `selection`.
    /// Returns the new id, or `None` when nothing is selected.
    pub fn spawn(&mut self, selection: &[CategoryId]) -> Option<u64> {
        if selection.is_empty() {
            return None;
        }
        let lane = self.rng.random_range(0..self.playfield.lanes);
        let category = selection[self.rng.random_range(0..selection.len())];
        let [lo, hi] = self.velocity_range;
        let velocity = if hi > lo { self.rng.random_range(lo..hi) } else { lo };
        Some(self.spawn_at(category, lane, velocity))
    }

    /// Place a drop above the top edge of `lane`
    pub fn spawn_at(&mut self, category: CategoryId, lane: u32, velocity: f32) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let lane = lane.min(self.playfield.lanes.saturating_sub(1));
        self.objects.push(FallingObject {
            id,
            position: Vec2::new(self.playfield.lane_x(lane), -self.playfield.object_height),
            velocity,
            category,
            lane,
            hit: false,
        });
        id
    }

    /// One tick: drop hit objects, move the rest by `velocity * multiplier`,
    /// and remove those that fell past the bottom edge.
    pub fn advance(&mut self, multiplier: f32) -> Vec<Miss> {
        let multiplier = multiplier.max(0.0);
        let mut misses = Vec::new();
        // highest index first so removal keeps the remaining indices valid
        for i in (0..self.objects.len()).rev() {
            if self.objects[i].hit {
                self.objects.remove(i);
                continue;
            }
            let obj = &mut self.objects[i];
            obj.position.y += obj.velocity * multiplier;
            if obj.position.y > self.playfield.height {
                misses.push(Miss { id: obj.id, category: obj.category });
                self.objects.remove(i);
            }
        }
        misses
    }

    /// Remove every hit object; returns how many were removed
    pub fn remove_hit(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| !o.hit);
        before - self.objects.len()
    }

    pub fn objects(&self) -> &[FallingObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut [FallingObject] {
        &mut self.objects
    }

    /// Objects eligible for drawing
    pub fn visible(&self) -> impl Iterator<Item = &FallingObject> {
        self.objects.iter().filter(|o| !o.hit)
    }

    pub fn get(&self, id: u64) -> Option<&FallingObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
