use egui::{Context, Pos2, Rect};

use crate::controller::frame_loop::{MAX_DROPS_PER_PERIOD, MAX_SPEED};
use crate::controller::{GameSession, Recording};
use crate::view::{overlay, VideoLayer};

/// What the host needs back from one UI pass
#[derive(Default)]
pub struct UiOutcome {
    /// Pointer over the playfield, normalized to [0, 1]
    pub pointer: Option<Pos2>,
    pub finished_recording: Option<Recording>,
}

/// Build the native debug UI: controls on the left, playfield in the center
pub fn build_ui(ctx: &Context, session: &mut GameSession, now_ms: f64) -> UiOutcome {
    let mut outcome = UiOutcome::default();

    egui::SidePanel::left("controls")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            draw_controls(ui, session, now_ms, &mut outcome);
        });

    egui::CentralPanel::default()
        .frame(egui::Frame::NONE.fill(egui::Color32::from_gray(20)))
        .show(ctx, |ui| {
            let (area, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
            let list = session.draw_list(VideoLayer::Hidden);
            overlay::paint(&ui.painter_at(area), area, &list);

            let scale = (area.width() / list.width).min(area.height() / list.height);
            let field = Rect::from_min_size(area.min, egui::vec2(list.width * scale, list.height * scale));
            outcome.pointer = response
                .hover_pos()
                .filter(|p| field.contains(*p))
                .map(|p| Pos2::new((p.x - field.min.x) / field.width(), (p.y - field.min.y) / field.height()));
        });

    outcome
}

fn draw_controls(ui: &mut egui::Ui, session: &mut GameSession, now_ms: f64, outcome: &mut UiOutcome) {
    ui.heading("Swat Piano");
    ui.label(egui::RichText::new("Move the mouse over the playfield to swat").small());
    ui.separator();

    let mut speed = session.speed();
    if ui
        .add(egui::Slider::new(&mut speed, 0.0..=MAX_SPEED).step_by(0.1).text("Speed"))
        .changed()
    {
        session.set_speed(speed);
    }
    let mut drops = session.drops_per_period();
    if ui
        .add(egui::Slider::new(&mut drops, 0..=MAX_DROPS_PER_PERIOD).text("Drops"))
        .changed()
    {
        session.set_drops_per_period(drops);
    }

    ui.separator();
    let categories: Vec<(usize, String)> = session
        .catalog()
        .iter()
        .map(|(id, c)| (id.0, format!("{} {}", c.glyph, c.name)))
        .collect();
    egui::ScrollArea::vertical()
        .id_salt("categories")
        .max_height(180.0)
        .show(ui, |ui| {
            for (index, label) in categories {
                let mut on = session.is_category_enabled(index);
                if ui.checkbox(&mut on, label).changed() {
                    session.set_category_enabled(index, on);
                }
            }
        });

    ui.separator();
    let label = if session.is_recording() {
        format!("⏹ Stop recording ({} notes)", session.recorded_notes())
    } else {
        "⏺ Start recording".to_string()
    };
    if ui.button(label).clicked() {
        outcome.finished_recording = session.toggle_recording(now_ms);
    }

    ui.separator();
    ui.label(egui::RichText::new(session.tally().to_string()).small());

    ui.separator();
    egui::ScrollArea::vertical()
        .id_salt("events")
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for line in session.events().recent() {
                ui.label(egui::RichText::new(line.stamped()).small().monospace());
            }
        });
}
