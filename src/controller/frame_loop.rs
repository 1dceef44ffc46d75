use crate::config::{BackgroundStyle, GameConfig};
use crate::controller::event_log::EventLog;
use crate::controller::hit_detector::{Hit, HitDetector};
use crate::controller::input::Command;
use crate::controller::recorder::{Recorder, Recording};
use crate::controller::retry::{SourceKind, SourceStatus};
use crate::controller::slot::{latest_slot, SlotReceiver, SlotSender};
use crate::controller::sound::{Note, SoundSink};
use crate::controller::spawn_timer::SpawnTimer;
use crate::error::Result;
use crate::model::{
    BackgroundRain, Catalog, CategoryId, CategorySelection, DropSimulation, HitTally, Miss, PoseFrame,
};
use crate::utils::entropy_seed;
use crate::view::draw_list::{piano_keys, BackgroundLayer, DrawList, Sprite, VideoLayer};

pub const MAX_SPEED: f32 = 5.0;
pub const MAX_DROPS_PER_PERIOD: u32 = 20;
const SPEED_STEP: f32 = 0.1;

/// What happened during one tick
#[derive(Debug, Default)]
pub struct TickReport {
    pub spawned: usize,
    pub hits: Vec<Hit>,
    pub misses: Vec<Miss>,
}

/// Game state owned by the frame loop
pub struct GameSession {
    config: GameConfig,
    catalog: Catalog,
    selection: CategorySelection,
    simulation: DropSimulation,
    rain: Option<BackgroundRain>,
    detector: HitDetector,
    tally: HitTally,
    events: EventLog,
    spawn_timer: SpawnTimer,
    pose: SlotReceiver<PoseFrame>,
    sound: Box<dyn SoundSink>,
    recorder: Recorder,
    speed_multiplier: f32,
    drops_per_period: u32,
    pose_status: SourceStatus,
    segmentation_status: SourceStatus,
}

impl GameSession {
    /// Build a session; the returned sender feeds pose results into it
    pub fn new(config: GameConfig, sound: Box<dyn SoundSink>) -> Result<(Self, SlotSender<PoseFrame>)> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(entropy_seed);
        let catalog = Catalog::for_variant(config.variant);
        let field = config.playfield;

        let rain = match config.background {
            BackgroundStyle::Rain => Some(BackgroundRain::new(
                field,
                config.velocity_range,
                catalog.iter().map(|(_, c)| c.glyph).collect(),
                (field.lanes / 2) as usize,
                seed.wrapping_add(1),
            )),
            _ => None,
        };
        let (pose_tx, pose_rx) = latest_slot();

        tracing::info!(
            "Session: {:?}, {}x{} with {} lanes, {} categories, seed {}",
            config.variant,
            field.width,
            field.height,
            field.lanes,
            catalog.len(),
            seed
        );

        let session = Self {
            selection: CategorySelection::all(&catalog),
            simulation: DropSimulation::new(field, config.velocity_range, seed),
            rain,
            detector: HitDetector::new(
                config.hit_geometry,
                config.confidence_threshold,
                config.tracked_points.clone(),
            ),
            tally: HitTally::from_catalog(&catalog),
            events: EventLog::new(config.debounce_ms),
            spawn_timer: SpawnTimer::new(config.spawn_period_ms),
            pose: pose_rx,
            sound,
            recorder: Recorder::default(),
            speed_multiplier: config.speed_multiplier.clamp(0.0, MAX_SPEED),
            drops_per_period: config.drops_per_period.min(MAX_DROPS_PER_PERIOD),
            pose_status: SourceStatus::Pending,
            segmentation_status: SourceStatus::Pending,
            catalog,
            config,
        };
        Ok((session, pose_tx))
    }

    /// Advance the game by one frame: spawn, hit-test the latest pose,
    /// then move and cull drops.
    pub fn tick(&mut self, now_ms: f64) -> TickReport {
        let mut report = TickReport::default();

        let periods = self.spawn_timer.due(now_ms);
        if periods > 0 && self.drops_per_period > 0 {
            let active = self.selection.active();
            for _ in 0..periods * self.drops_per_period {
                if self.simulation.spawn(&active).is_some() {
                    report.spawned += 1;
                }
            }
        }

        if self.pose_status != SourceStatus::Disabled {
            if let Some(frame) = self.pose.take() {
                report.hits = self.detector.detect(&frame, &mut self.simulation);
                for hit in &report.hits {
                    self.register_hit(now_ms, hit);
                }
            }
        }

        if let Some(rain) = self.rain.as_mut() {
            rain.advance(self.speed_multiplier);
        }
        report.misses = self.simulation.advance(self.speed_multiplier);
        for miss in &report.misses {
            let name = self.category_name(miss.category);
            self.events.emit(now_ms, &format!("Missed {name}"));
        }
        report
    }

    fn register_hit(&mut self, now_ms: f64, hit: &Hit) {
        let Some(category) = self.catalog.get(hit.category) else {
            tracing::warn!("Hit on unknown category {:?}", hit.category);
            return;
        };
        self.events.emit(now_ms, &format!("Hit {} with {}", category.name, hit.part));
        self.tally.increment(hit.category);

        let width = self.config.playfield.width;
        if let Some(note) = Note::for_hit(hit.category, category, hit.x, width) {
            if let Err(e) = self.sound.play(&note) {
                tracing::warn!("Failed to play {}: {}", note.name, e);
            }
            self.recorder.capture(now_ms, &note);
        }
    }

    fn category_name(&self, id: CategoryId) -> &'static str {
        self.catalog.get(id).map(|c| c.name).unwrap_or("?")
    }

    /// Snapshot for the renderer. Hit drops are already gone.
    pub fn draw_list(&self, video: VideoLayer) -> DrawList {
        let field = self.config.playfield;
        let background = match (self.config.background, &self.rain) {
            (BackgroundStyle::PianoKeys, _) => {
                let (white, black) = piano_keys(&field);
                BackgroundLayer::PianoKeys { white, black }
            }
            (BackgroundStyle::Rain, Some(rain)) => BackgroundLayer::Rain {
                sprites: rain
                    .drops()
                    .iter()
                    .map(|d| Sprite { glyph: d.glyph, x: d.position.x, y: d.position.y })
                    .collect(),
            },
            _ => BackgroundLayer::Blank,
        };
        let sprites = self
            .simulation
            .visible()
            .filter_map(|o| {
                let glyph = self.catalog.get(o.category)?.glyph;
                Some(Sprite { glyph, x: o.position.x, y: o.position.y })
            })
            .collect();

        DrawList {
            width: field.width,
            height: field.height,
            font_px: field.object_height,
            background,
            video,
            sprites,
            hud: self.tally.to_string(),
        }
    }

    /// Apply a keyboard command; a finished recording is handed back
    pub fn apply(&mut self, command: Command, now_ms: f64) -> Option<Recording> {
        match command {
            Command::ToggleRecording => return self.toggle_recording(now_ms),
            Command::SpeedUp => self.set_speed(self.speed_multiplier + SPEED_STEP),
            Command::SpeedDown => self.set_speed(self.speed_multiplier - SPEED_STEP),
            Command::MoreDrops => self.set_drops_per_period(self.drops_per_period.saturating_add(1)),
            Command::FewerDrops => self.set_drops_per_period(self.drops_per_period.saturating_sub(1)),
            Command::ToggleCategory(index) => {
                if let Some(on) = self.selection.toggle(CategoryId(index)) {
                    tracing::info!("{} {}", self.category_name(CategoryId(index)), if on { "enabled" } else { "disabled" });
                }
            }
            Command::ClearPlayfield => {
                tracing::info!("Clearing {} drops", self.simulation.len());
                self.simulation.clear();
            }
        }
        None
    }

    pub fn toggle_recording(&mut self, now_ms: f64) -> Option<Recording> {
        if self.recorder.is_recording() {
            self.recorder.stop()
        } else {
            self.recorder.start(now_ms);
            None
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Notes in the take so far; 0 when not recording
    pub fn recorded_notes(&self) -> usize {
        self.recorder.notes_captured()
    }

    pub fn set_speed(&mut self, multiplier: f32) {
        // one decimal so repeated key steps land on round values
        let m = (multiplier.clamp(0.0, MAX_SPEED) * 10.0).round() / 10.0;
        if m != self.speed_multiplier {
            tracing::debug!("Speed multiplier {}", m);
        }
        self.speed_multiplier = m;
    }

    pub fn speed(&self) -> f32 {
        self.speed_multiplier
    }

    pub fn set_drops_per_period(&mut self, drops: u32) {
        self.drops_per_period = drops.min(MAX_DROPS_PER_PERIOD);
    }

    pub fn drops_per_period(&self) -> u32 {
        self.drops_per_period
    }

    pub fn set_category_enabled(&mut self, index: usize, enabled: bool) -> bool {
        self.selection.set(CategoryId(index), enabled)
    }

    pub fn is_category_enabled(&self, index: usize) -> bool {
        self.selection.is_enabled(CategoryId(index))
    }

    pub fn set_source_status(&mut self, kind: SourceKind, status: SourceStatus) {
        match kind {
            SourceKind::Pose => {
                self.pose_status = status;
                if status == SourceStatus::Disabled {
                    self.pose.clear();
                }
            }
            SourceKind::Segmentation => self.segmentation_status = status,
        }
    }

    pub fn source_status(&self, kind: SourceKind) -> SourceStatus {
        match kind {
            SourceKind::Pose => self.pose_status,
            SourceKind::Segmentation => self.segmentation_status,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tally(&self) -> &HitTally {
        &self.tally
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn simulation(&self) -> &DropSimulation {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut DropSimulation {
        &mut self.simulation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::landmarks::{LEFT_INDEX, RIGHT_INDEX};
    use crate::model::Landmark;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct CollectSink(Rc<RefCell<Vec<Note>>>);

    impl SoundSink for CollectSink {
        fn play(&mut self, note: &Note) -> Result<()> {
            self.0.borrow_mut().push(note.clone());
            Ok(())
        }
    }

    fn quiet_config(mut config: GameConfig) -> GameConfig {
        config.seed = Some(42);
        config.drops_per_period = 0;
        config
    }

    fn session(config: GameConfig) -> (GameSession, SlotSender<PoseFrame>, CollectSink) {
        let sink = CollectSink::default();
        let (s, tx) = GameSession::new(config, Box::new(sink.clone())).unwrap();
        (s, tx, sink)
    }

    fn point(x: f32, y: f32) -> Landmark {
        Landmark { x, y, visibility: 1.0 }
    }

    /// Tick until the drop with `id` reaches `y`
    fn run_until(s: &mut GameSession, id: u64, y: f32, now: &mut f64) {
        while s.simulation().get(id).map(|o| o.position.y < y).unwrap_or(false) {
            *now += 16.0;
            s.tick(*now);
        }
    }

    #[test]
    fn test_hit_scenario_tallies_one_category() {
        let (mut s, tx, sink) = session(quiet_config(GameConfig::instruments()));
        let piano = CategoryId(1);
        // lane 44 starts at x = 440, the middle of the playfield
        let id = s.simulation_mut().spawn_at(piano, 44, 2.0);
        let mut now = 0.0;
        s.tick(now);
        run_until(&mut s, id, 120.0, &mut now);
        assert_eq!(s.simulation().get(id).unwrap().position.y, 120.0);

        assert!(tx.publish(PoseFrame::with_point(RIGHT_INDEX, point(0.5, 0.5))));
        let report = s.tick(now + 16.0);

        assert_eq!(report.hits.len(), 1);
        assert_eq!(s.tally().count(piano), 1);
        assert_eq!(s.tally().total(), 1);
        assert!(s.simulation().get(id).is_none());
        assert!(s.draw_list(VideoLayer::Hidden).sprites.is_empty());

        let notes = sink.0.borrow();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].name, "piano");
        assert!((notes[0].note_index - (21.0 + 440.0 / 879.0 * 87.0)).abs() < 1e-3);
        assert_eq!(s.events().last().unwrap().text, "Hit piano with right_hand");
    }

    #[test]
    fn test_queued_notes_reach_handler_after_session_is_released() {
        use crate::controller::sound::NoteQueue;

        let queue = Rc::new(RefCell::new(NoteQueue::default()));
        let (s, tx) = GameSession::new(quiet_config(GameConfig::instruments()), Box::new(queue.clone())).unwrap();
        let state = Rc::new(RefCell::new(s));
        let id = state.borrow_mut().simulation_mut().spawn_at(CategoryId(1), 44, 2.0);
        let mut now = 0.0;
        state.borrow_mut().tick(now);
        run_until(&mut state.borrow_mut(), id, 120.0, &mut now);

        tx.publish(PoseFrame::with_point(RIGHT_INDEX, point(0.5, 0.5)));
        state.borrow_mut().tick(now + 16.0);

        // a handler reading the tally, as a page would on every note
        let pending = queue.borrow_mut().drain();
        let mut seen = Vec::new();
        for note in pending {
            let session = state.try_borrow_mut().expect("session free after tick");
            seen.push((note.name, session.tally().count(note.category)));
        }
        assert_eq!(seen, vec![("piano", 1)]);
        assert!(queue.borrow_mut().drain().is_empty());
    }

    #[test]
    fn test_pose_result_is_tested_once() {
        let (mut s, tx, _) = session(quiet_config(GameConfig::instruments()));
        let a = s.simulation_mut().spawn_at(CategoryId(0), 0, 2.0);
        let b = s.simulation_mut().spawn_at(CategoryId(0), 0, 2.0);
        let mut now = 0.0;
        s.tick(now);
        run_until(&mut s, a, 0.0, &mut now);

        tx.publish(PoseFrame::with_point(LEFT_INDEX, point(0.0, 0.0)));
        assert_eq!(s.tick(now + 16.0).hits.len(), 1);
        assert!(s.simulation().get(a).is_none());

        // b sits where a was, but no new result arrived
        assert!(s.tick(now + 32.0).hits.is_empty());
        assert!(s.simulation().get(b).is_some());
    }

    #[test]
    fn test_events_throttled_but_tally_counts_every_hit() {
        let (mut s, tx, _) = session(quiet_config(GameConfig::instruments()));
        let a = s.simulation_mut().spawn_at(CategoryId(0), 0, 2.0);
        s.simulation_mut().spawn_at(CategoryId(2), 44, 2.0);
        let mut now = 0.0;
        s.tick(now);
        run_until(&mut s, a, 0.0, &mut now);

        let mut frame = PoseFrame::with_point(LEFT_INDEX, point(0.0, 0.0));
        frame.landmarks[RIGHT_INDEX] = point(0.5, 0.0);
        tx.publish(frame);
        let report = s.tick(now + 16.0);

        assert_eq!(report.hits.len(), 2);
        assert_eq!(s.tally().total(), 2);
        assert_eq!(s.events().recent().count(), 1);
    }

    #[test]
    fn test_lane_zero_miss() {
        let (mut s, _, _) = session(quiet_config(GameConfig::instruments()));
        let id = s.simulation_mut().spawn_at(CategoryId(0), 0, 2.0);
        s.tick(0.0);
        let mut misses = Vec::new();
        let mut now = 0.0;
        for _ in 0..200 {
            now += 200.0;
            misses.extend(s.tick(now).misses);
        }
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].id, id);
        assert!(s.events().recent().any(|l| l.text == "Missed guitar"));
    }

    #[test]
    fn test_timer_spawns_from_enabled_categories() {
        let mut config = quiet_config(GameConfig::instruments());
        config.drops_per_period = 3;
        let (mut s, _, _) = session(config);
        for i in 0..10 {
            if i != 4 {
                s.set_category_enabled(i, false);
            }
        }
        assert_eq!(s.tick(0.0).spawned, 0);
        assert_eq!(s.tick(100.0).spawned, 3);
        assert_eq!(s.tick(350.0).spawned, 6);
        assert!(s.simulation().objects().iter().all(|o| o.category == CategoryId(4)));

        s.set_category_enabled(4, false);
        assert_eq!(s.tick(500.0).spawned, 0);
    }

    #[test]
    fn test_disabled_pose_source_skips_detection() {
        let (mut s, tx, _) = session(quiet_config(GameConfig::instruments()));
        let id = s.simulation_mut().spawn_at(CategoryId(0), 0, 2.0);
        let mut now = 0.0;
        s.tick(now);
        run_until(&mut s, id, 0.0, &mut now);

        s.set_source_status(SourceKind::Pose, SourceStatus::Disabled);
        tx.publish(PoseFrame::with_point(LEFT_INDEX, point(0.0, 0.0)));
        assert!(s.tick(now + 16.0).hits.is_empty());
        assert_eq!(s.tally().total(), 0);
    }

    #[test]
    fn test_speed_zero_freezes_drops() {
        let (mut s, _, _) = session(quiet_config(GameConfig::instruments()));
        let id = s.simulation_mut().spawn_at(CategoryId(0), 3, 2.5);
        s.set_speed(0.0);
        s.tick(0.0);
        s.tick(16.0);
        assert_eq!(s.simulation().get(id).unwrap().position.y, -20.0);
    }

    #[test]
    fn test_commands() {
        let (mut s, _, _) = session(quiet_config(GameConfig::instruments()));
        for _ in 0..60 {
            s.apply(Command::SpeedUp, 0.0);
        }
        assert_eq!(s.speed(), MAX_SPEED);
        s.apply(Command::SpeedDown, 0.0);
        assert!((s.speed() - 4.9).abs() < 1e-6);

        s.apply(Command::FewerDrops, 0.0);
        assert_eq!(s.drops_per_period(), 0);
        for _ in 0..25 {
            s.apply(Command::MoreDrops, 0.0);
        }
        assert_eq!(s.drops_per_period(), MAX_DROPS_PER_PERIOD);

        s.apply(Command::ToggleCategory(0), 0.0);
        assert!(!s.is_category_enabled(0));

        s.simulation_mut().spawn_at(CategoryId(1), 2, 1.0);
        s.apply(Command::ClearPlayfield, 0.0);
        assert!(s.simulation().is_empty());
    }

    #[test]
    fn test_recording_captures_hits() {
        let (mut s, tx, _) = session(quiet_config(GameConfig::instruments()));
        assert!(s.apply(Command::ToggleRecording, 1000.0).is_none());
        assert!(s.is_recording());

        let id = s.simulation_mut().spawn_at(CategoryId(2), 0, 2.0);
        let mut now = 1000.0;
        s.tick(now);
        run_until(&mut s, id, 0.0, &mut now);
        tx.publish(PoseFrame::with_point(LEFT_INDEX, point(0.0, 0.0)));
        s.tick(now + 16.0);
        assert_eq!(s.recorded_notes(), 1);

        let take = s.apply(Command::ToggleRecording, now + 100.0).unwrap();
        assert_eq!(take.notes.len(), 1);
        assert_eq!(take.notes[0].key, 21);
        assert!(!s.is_recording());
        assert_eq!(s.recorded_notes(), 0);
    }

    #[test]
    fn test_characters_variant_is_silent_over_rain() {
        let (mut s, tx, sink) = session(quiet_config(GameConfig::characters()));
        let id = s.simulation_mut().spawn_at(CategoryId(0), 16, 2.0);
        let mut now = 0.0;
        s.tick(now);
        run_until(&mut s, id, 0.0, &mut now);

        // wrist 5px right of the glyph center, inside 1.5 lane widths
        tx.publish(PoseFrame::with_point(crate::model::landmarks::LEFT_WRIST, point(0.5 + 10.0 / 320.0, 0.0)));
        assert_eq!(s.tick(now + 16.0).hits.len(), 1);
        assert_eq!(s.tally().count_glyph("A"), Some(1));
        assert!(sink.0.borrow().is_empty());

        match s.draw_list(VideoLayer::Raw).background {
            BackgroundLayer::Rain { sprites } => assert_eq!(sprites.len(), 16),
            other => panic!("expected rain, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = GameConfig::instruments();
        config.playfield.lanes = 0;
        assert!(GameSession::new(config, Box::new(CollectSink::default())).is_err());
    }
}
