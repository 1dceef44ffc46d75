// CONTROLLER: Input, game logic, and update loop
pub mod event_log;
pub mod frame_loop;
pub mod hit_detector;
pub mod input;
pub mod recorder;
pub mod retry;
pub mod slot;
pub mod sound;
pub mod spawn_timer;

pub use event_log::EventLog;
pub use frame_loop::{GameSession, TickReport};
pub use hit_detector::{Hit, HitDetector, HitGeometry};
pub use input::{Command, InputProcessor, KeyBindings};
pub use recorder::{Recorder, Recording};
pub use retry::{initialize_with_retry, RetryPolicy, SourceKind, SourceStatus};
pub use slot::{latest_slot, SlotReceiver, SlotSender};
pub use sound::{LogSink, Note, NoteQueue, SoundSink};
pub use spawn_timer::SpawnTimer;
