use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind};

use crate::view::draw_list::{BackgroundLayer, DrawList};

const RAIN_COLOR: Color32 = Color32::from_rgb(0, 200, 70);

/// Paint a [`DrawList`] into `area`, scaling playfield pixels to fit
pub fn paint(painter: &Painter, area: Rect, list: &DrawList) {
    let scale = (area.width() / list.width).min(area.height() / list.height);
    let origin = area.min;
    let to_screen = |x: f32, y: f32| Pos2::new(origin.x + x * scale, origin.y + y * scale);
    let field = Rect::from_min_max(origin, to_screen(list.width, list.height));
    let font = FontId::proportional(list.font_px * scale);

    match &list.background {
        BackgroundLayer::PianoKeys { white, black } => {
            painter.rect_filled(field, 0.0, Color32::WHITE);
            for key in white {
                let r = Rect::from_min_max(to_screen(key.x, key.y), to_screen(key.x + key.w, key.y + key.h));
                painter.rect_stroke(r, 0.0, Stroke::new(1.0, Color32::BLACK), StrokeKind::Inside);
            }
            for key in black {
                let r = Rect::from_min_max(to_screen(key.x, key.y), to_screen(key.x + key.w, key.y + key.h));
                painter.rect_filled(r, 0.0, Color32::BLACK);
            }
        }
        BackgroundLayer::Rain { sprites } => {
            painter.rect_filled(field, 0.0, Color32::BLACK);
            for s in sprites {
                painter.text(to_screen(s.x, s.y), Align2::LEFT_BOTTOM, s.glyph, font.clone(), RAIN_COLOR);
            }
        }
        BackgroundLayer::Blank => {
            painter.rect_filled(field, 0.0, Color32::from_gray(30));
        }
    }

    // sprites may start above the field; keep them inside it
    let clipped = painter.with_clip_rect(field);
    let glyph_color = match list.background {
        BackgroundLayer::Rain { .. } => Color32::WHITE,
        _ => Color32::BLACK,
    };
    for s in &list.sprites {
        clipped.text(to_screen(s.x, s.y), Align2::LEFT_BOTTOM, s.glyph, font.clone(), glyph_color);
    }
}
