use crate::model::Playfield;
use crate::utils::Rect;

/// Semitones within an octave (from A) that carry a black key
const BLACK_KEY_STEPS: [u32; 5] = [1, 3, 6, 8, 10];

/// Text glyph with its baseline-left anchor at `(x, y)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    pub glyph: &'static str,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundLayer {
    PianoKeys { white: Vec<Rect>, black: Vec<Rect> },
    Rain { sprites: Vec<Sprite> },
    Blank,
}

/// How the camera feed is composited between background and sprites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoLayer {
    /// Only the user's silhouette, cut out with the latest segmentation mask
    Masked,
    /// Whole frame, covering the background
    Raw,
    Hidden,
}

impl VideoLayer {
    pub fn choose(has_video: bool, has_mask: bool) -> Self {
        match (has_video, has_mask) {
            (false, _) => VideoLayer::Hidden,
            (true, true) => VideoLayer::Masked,
            (true, false) => VideoLayer::Raw,
        }
    }
}

/// Renderer-agnostic description of one frame, back to front
#[derive(Debug, Clone, PartialEq)]
pub struct DrawList {
    pub width: f32,
    pub height: f32,
    pub font_px: f32,
    pub background: BackgroundLayer,
    pub video: VideoLayer,
    pub sprites: Vec<Sprite>,
    pub hud: String,
}

/// White and black key rectangles for one key per lane
pub fn piano_keys(field: &Playfield) -> (Vec<Rect>, Vec<Rect>) {
    let w = field.lane_width();
    let white = (0..field.lanes)
        .map(|i| Rect::new(field.lane_x(i), 0.0, w, field.height))
        .collect();
    let black = (0..field.lanes)
        .filter(|i| BLACK_KEY_STEPS.contains(&(i % 12)))
        .map(|i| Rect::new(field.lane_x(i) + 0.65 * w, 0.0, 0.7 * w, 0.6 * field.height))
        .collect();
    (white, black)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piano_layout() {
        let field = Playfield::default();
        let (white, black) = piano_keys(&field);
        assert_eq!(white.len(), 88);
        // 7 full octaves of 5 black keys, then steps 1 and 3 of the last partial one
        assert_eq!(black.len(), 37);
        let k = black[0];
        assert!((k.x - 16.5).abs() < 1e-4 && (k.w - 7.0).abs() < 1e-4 && (k.h - 144.0).abs() < 1e-3);
        assert_eq!(white[87].x, 870.0);
    }

    #[test]
    fn test_video_policy() {
        assert_eq!(VideoLayer::choose(true, true), VideoLayer::Masked);
        assert_eq!(VideoLayer::choose(true, false), VideoLayer::Raw);
        assert_eq!(VideoLayer::choose(false, true), VideoLayer::Hidden);
    }

    #[test]
    fn test_empty_mask_result_falls_back_to_raw() {
        let (tx, masks) = crate::controller::latest_slot::<&str>();
        tx.publish("silhouette");
        assert_eq!(VideoLayer::choose(true, masks.latest().is_some()), VideoLayer::Masked);
        // a later result without a mask
        tx.clear();
        assert_eq!(VideoLayer::choose(true, masks.latest().is_some()), VideoLayer::Raw);
    }
}
