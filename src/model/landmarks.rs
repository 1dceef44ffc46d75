use serde::{Deserialize, Serialize};

/// Landmarks per MediaPipe Pose result
pub const POSE_LANDMARK_COUNT: usize = 33;

pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_INDEX: usize = 19;
pub const RIGHT_INDEX: usize = 20;

/// One body point, normalized to [0, 1] in both axes
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub visibility: f32,
}

/// A single pose detection result
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PoseFrame {
    pub landmarks: Vec<Landmark>,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// Full-size frame where only `index` is visible
    pub fn with_point(index: usize, landmark: Landmark) -> Self {
        let mut landmarks = vec![Landmark::default(); POSE_LANDMARK_COUNT.max(index + 1)];
        landmarks[index] = landmark;
        Self { landmarks }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// A named landmark that can swat drops
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPoint {
    pub name: String,
    pub index: usize,
}

impl TrackedPoint {
    pub fn new(name: &str, index: usize) -> Self {
        Self { name: name.to_string(), index }
    }

    pub fn hands() -> Vec<Self> {
        vec![Self::new("left_hand", LEFT_INDEX), Self::new("right_hand", RIGHT_INDEX)]
    }

    pub fn wrists() -> Vec<Self> {
        vec![Self::new("left_wrist", LEFT_WRIST), Self::new("right_wrist", RIGHT_WRIST)]
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use wasm_bindgen::JsValue;

    fn number(obj: &JsValue, key: &str) -> Option<f32> {
        js_sys::Reflect::get(obj, &JsValue::from_str(key))
            .ok()
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
    }

    /// Convert a MediaPipe `poseLandmarks` array; `null`/`undefined` means no detection
    pub fn pose_from_js(value: &JsValue) -> Option<PoseFrame> {
        if value.is_null() || value.is_undefined() || !js_sys::Array::is_array(value) {
            return None;
        }
        let landmarks = js_sys::Array::from(value)
            .iter()
            .map(|entry| Landmark {
                x: number(&entry, "x").unwrap_or(0.0),
                y: number(&entry, "y").unwrap_or(0.0),
                // absent visibility never clears a threshold
                visibility: number(&entry, "visibility").unwrap_or(0.0),
            })
            .collect();
        Some(PoseFrame::new(landmarks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_point_pads_frame() {
        let frame = PoseFrame::with_point(RIGHT_INDEX, Landmark { x: 0.3, y: 0.4, visibility: 1.0 });
        assert_eq!(frame.landmarks.len(), POSE_LANDMARK_COUNT);
        assert_eq!(frame.get(RIGHT_INDEX).unwrap().x, 0.3);
        assert_eq!(frame.get(LEFT_INDEX).unwrap().visibility, 0.0);
        assert!(frame.get(POSE_LANDMARK_COUNT).is_none());
    }

    #[test]
    fn test_tracked_point_presets() {
        let hands = TrackedPoint::hands();
        assert_eq!(hands[0].index, 19);
        assert_eq!(hands[1].name, "right_hand");
        assert_eq!(TrackedPoint::wrists()[0].index, 15);
    }
}
