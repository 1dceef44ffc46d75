use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::hit_detector::HitGeometry;
use crate::controller::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::model::{Playfield, TrackedPoint, Variant};

/// Layer drawn under the masked video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundStyle {
    PianoKeys,
    Rain,
    Plain,
}

/// Everything that differs between game variants, plus the playback knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub variant: Variant,
    pub playfield: Playfield,
    /// Descent speed range in units per tick, `[min, max)`
    pub velocity_range: [f32; 2],
    pub confidence_threshold: f32,
    pub hit_geometry: HitGeometry,
    pub tracked_points: Vec<TrackedPoint>,
    pub spawn_period_ms: f64,
    pub drops_per_period: u32,
    pub speed_multiplier: f32,
    pub debounce_ms: f64,
    pub background: BackgroundStyle,
    pub init_retry: RetryPolicy,
    /// Fixed RNG seed; random when absent
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::instruments()
    }
}

impl GameConfig {
    pub fn instruments() -> Self {
        Self {
            variant: Variant::Instruments,
            playfield: Playfield::default(),
            velocity_range: [1.0, 3.0],
            confidence_threshold: 0.2,
            hit_geometry: HitGeometry::BoundingBox,
            tracked_points: TrackedPoint::hands(),
            spawn_period_ms: 100.0,
            drops_per_period: 1,
            speed_multiplier: 1.0,
            debounce_ms: 150.0,
            background: BackgroundStyle::PianoKeys,
            init_retry: RetryPolicy::default(),
            seed: None,
        }
    }

    pub fn characters() -> Self {
        Self {
            variant: Variant::Characters,
            playfield: Playfield { width: 320.0, height: 240.0, lanes: 32, object_height: 15.0 },
            confidence_threshold: 0.5,
            hit_geometry: HitGeometry::Distance { lane_multiple: 1.5 },
            tracked_points: TrackedPoint::wrists(),
            background: BackgroundStyle::Rain,
            ..Self::instruments()
        }
    }

    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Instruments => Self::instruments(),
            Variant::Characters => Self::characters(),
        }
    }

    /// Parse a JSON config. Missing fields come from the preset named by
    /// `variant` (instruments when absent), nested objects merge key by key.
    pub fn from_json(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text)?;
        if !overrides.is_object() {
            return Err(Error::config("config root must be a JSON object"));
        }
        let variant = match overrides.get("variant") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => Variant::default(),
        };
        let mut merged = serde_json::to_value(Self::for_variant(variant))?;
        merge_json(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::info!("Loaded {:?} config from {}", config.variant, path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let f = &self.playfield;
        if !(positive(f.width) && positive(f.height)) {
            return Err(Error::config(format!("playfield must be positive, got {}x{}", f.width, f.height)));
        }
        if f.lanes == 0 {
            return Err(Error::config("lanes must be at least 1"));
        }
        if !positive(f.object_height) {
            return Err(Error::config(format!("object_height must be positive, got {}", f.object_height)));
        }
        let [lo, hi] = self.velocity_range;
        if !(positive(lo) && hi.is_finite() && hi >= lo) {
            return Err(Error::config(format!("velocity_range [{lo}, {hi}) is empty or non-positive")));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::config(format!(
                "confidence_threshold {} outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if let HitGeometry::Distance { lane_multiple } = self.hit_geometry {
            if !positive(lane_multiple) {
                return Err(Error::config("distance lane_multiple must be positive"));
            }
        }
        if !(self.spawn_period_ms.is_finite() && self.spawn_period_ms > 0.0) {
            return Err(Error::config("spawn_period_ms must be positive"));
        }
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier >= 0.0) {
            return Err(Error::config(format!("speed_multiplier {} is not usable", self.speed_multiplier)));
        }
        if !(self.debounce_ms.is_finite() && self.debounce_ms >= 0.0) {
            return Err(Error::config("debounce_ms must be zero or more"));
        }
        if self.tracked_points.is_empty() {
            return Err(Error::config("at least one tracked point is required"));
        }
        Ok(())
    }
}

/// Finite and above zero; f32 fields overflow to infinity from JSON like `1e39`
fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        GameConfig::instruments().validate().unwrap();
        GameConfig::characters().validate().unwrap();
        assert_eq!(GameConfig::default(), GameConfig::instruments());
        assert_eq!(GameConfig::characters().playfield.lane_width(), 10.0);
    }

    #[test]
    fn test_partial_json_uses_variant_preset() {
        let cfg = GameConfig::from_json(r#"{"variant": "characters", "playfield": {"height": 300}}"#).unwrap();
        assert_eq!(cfg.variant, Variant::Characters);
        assert_eq!(cfg.playfield.width, 320.0);
        assert_eq!(cfg.playfield.height, 300.0);
        assert_eq!(cfg.confidence_threshold, 0.5);
        assert_eq!(cfg.tracked_points, TrackedPoint::wrists());
    }

    #[test]
    fn test_geometry_override() {
        let cfg = GameConfig::from_json(
            r#"{"hit_geometry": {"kind": "distance", "lane_multiple": 2.0}, "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(cfg.hit_geometry, HitGeometry::Distance { lane_multiple: 2.0 });
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.background, BackgroundStyle::PianoKeys);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            GameConfig::from_json(r#"{"playfield": {"lanes": 0}}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{"confidence_threshold": 1.5}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GameConfig::from_json(r#"{"velocity_range": [3.0, 1.0]}"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(GameConfig::from_json("[1, 2]"), Err(Error::InvalidConfig(_))));
        assert!(matches!(GameConfig::from_json("{"), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_rejects_overflowing_floats() {
        let overflowing = [
            r#"{"velocity_range": [1.0, 1e39], "seed": 1}"#,
            r#"{"playfield": {"width": 1e39}}"#,
            r#"{"playfield": {"object_height": 1e39}}"#,
            r#"{"hit_geometry": {"kind": "distance", "lane_multiple": 1e39}}"#,
            r#"{"speed_multiplier": 1e39}"#,
        ];
        for json in overflowing {
            assert!(
                matches!(GameConfig::from_json(json), Err(Error::InvalidConfig(_))),
                "accepted {json}"
            );
        }
    }
}
