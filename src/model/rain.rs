use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::Playfield;

/// Decorative drop; never hit-tested
#[derive(Clone, Debug, PartialEq)]
pub struct RainDrop {
    pub position: Vec2,
    pub speed: f32,
    pub glyph: &'static str,
}

/// Background "matrix rain" layer drawn behind the user
pub struct BackgroundRain {
    playfield: Playfield,
    velocity_range: [f32; 2],
    glyphs: Vec<&'static str>,
    drops: Vec<RainDrop>,
    rng: StdRng,
}

impl BackgroundRain {
    pub fn new(
        playfield: Playfield,
        velocity_range: [f32; 2],
        glyphs: Vec<&'static str>,
        count: usize,
        seed: u64,
    ) -> Self {
        let mut rain = Self {
            playfield,
            velocity_range,
            glyphs,
            drops: Vec::with_capacity(count),
            rng: StdRng::seed_from_u64(seed),
        };
        for _ in 0..count {
            let mut drop = rain.fresh_drop();
            // stagger the first wave just above the top edge
            drop.position.y = -rain.rng.random_range(0.0f32..=1.0) * rain.playfield.object_height;
            rain.drops.push(drop);
        }
        rain
    }

    fn fresh_drop(&mut self) -> RainDrop {
        let lane = self.rng.random_range(0..self.playfield.lanes);
        let [lo, hi] = self.velocity_range;
        let speed = if hi > lo { self.rng.random_range(lo..hi) } else { lo };
        let glyph = if self.glyphs.is_empty() {
            " "
        } else {
            self.glyphs[self.rng.random_range(0..self.glyphs.len())]
        };
        RainDrop {
            position: Vec2::new(self.playfield.lane_x(lane), -self.playfield.object_height),
            speed,
            glyph,
        }
    }

    /// Move every drop; drops leaving the bottom restart at the top
    pub fn advance(&mut self, multiplier: f32) {
        let multiplier = multiplier.max(0.0);
        for i in 0..self.drops.len() {
            self.drops[i].position.y += self.drops[i].speed * multiplier;
            if self.drops[i].position.y > self.playfield.height {
                self.drops[i] = self.fresh_drop();
            }
        }
    }

    pub fn drops(&self) -> &[RainDrop] {
        &self.drops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rain_recycles_drops() {
        let field = Playfield { width: 320.0, height: 240.0, lanes: 32, object_height: 15.0 };
        let mut rain = BackgroundRain::new(field, [1.0, 3.0], vec!["A", "B"], 16, 3);
        assert_eq!(rain.drops().len(), 16);
        assert!(rain.drops().iter().all(|d| d.position.y <= 0.0 && d.position.y >= -15.0));

        for _ in 0..1000 {
            rain.advance(1.0);
            assert_eq!(rain.drops().len(), 16);
            assert!(rain.drops().iter().all(|d| d.position.y <= field.height));
        }
        assert!(rain.drops().iter().all(|d| d.glyph == "A" || d.glyph == "B"));
    }
}
