//! Pitch mapping and the boundary to the external synthesizer.
//!
//! The horizontal position of a swatted drop picks a key on an 88-key
//! piano (A0..C8); the key is converted to an equal-tempered frequency
//! and handed to a [`SoundSink`] together with the category's timbre.

use crate::error::Result;
use crate::model::{Category, CategoryId, Timbre};

pub const LOWEST_NOTE: f32 = 21.0;
pub const HIGHEST_NOTE: f32 = 108.0;
pub const REFERENCE_NOTE: f32 = 69.0;
pub const REFERENCE_HZ: f32 = 440.0;

/// Continuous note index for a pixel column, 21 at `x = 0` and 108 at `x = width - 1`
pub fn note_index_for_x(x: f32, width: f32) -> f32 {
    let span = (width - 1.0).max(1.0);
    let t = (x / span).clamp(0.0, 1.0);
    LOWEST_NOTE + t * (HIGHEST_NOTE - LOWEST_NOTE)
}

/// Equal-tempered frequency for a (possibly fractional) note index
pub fn frequency_for_note(note_index: f32) -> f32 {
    REFERENCE_HZ * 2f32.powf((note_index - REFERENCE_NOTE) / 12.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteLength {
    Eighth,
    Quarter,
}

impl NoteLength {
    /// Tone.js notation
    pub fn as_tone_str(self) -> &'static str {
        match self {
            NoteLength::Eighth => "8n",
            NoteLength::Quarter => "4n",
        }
    }

    pub fn beats(self) -> f32 {
        match self {
            NoteLength::Eighth => 0.5,
            NoteLength::Quarter => 1.0,
        }
    }
}

/// A note ready for the synthesizer
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub category: CategoryId,
    pub name: &'static str,
    pub timbre: Timbre,
    pub program: u8,
    pub note_index: f32,
    pub frequency_hz: f32,
    pub length: NoteLength,
}

impl Note {
    /// Note for a drop of `category` swatted at column `x`; `None` for silent categories
    pub fn for_hit(id: CategoryId, category: &Category, x: f32, width: f32) -> Option<Self> {
        let timbre = category.timbre?;
        let note_index = note_index_for_x(x, width);
        Some(Self {
            category: id,
            name: category.name,
            timbre,
            program: category.program,
            note_index,
            frequency_hz: frequency_for_note(note_index),
            length: if timbre.is_percussive() { NoteLength::Eighth } else { NoteLength::Quarter },
        })
    }

    /// Nearest MIDI key
    pub fn midi_key(&self) -> u8 {
        self.note_index.round().clamp(0.0, 127.0) as u8
    }
}

/// External synthesizer boundary
pub trait SoundSink {
    fn play(&mut self, note: &Note) -> Result<()>;
}

/// Shared sink, so a host can swap its handler while the session owns it
impl<S: SoundSink> SoundSink for std::rc::Rc<std::cell::RefCell<S>> {
    fn play(&mut self, note: &Note) -> Result<()> {
        self.borrow_mut().play(note)
    }
}

/// Sink that only reports notes in the log
#[derive(Default)]
pub struct LogSink;

impl SoundSink for LogSink {
    fn play(&mut self, note: &Note) -> Result<()> {
        tracing::debug!(
            "note {} {:.1} ({:.1} Hz, {})",
            note.timbre.as_str(),
            note.note_index,
            note.frequency_hz,
            note.length.as_tone_str()
        );
        Ok(())
    }
}

/// Holds notes until the host can hand them on outside the tick
#[derive(Default)]
pub struct NoteQueue {
    pending: Vec<Note>,
}

impl NoteQueue {
    /// Notes played since the last drain, oldest first
    pub fn drain(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.pending)
    }
}

impl SoundSink for NoteQueue {
    fn play(&mut self, note: &Note) -> Result<()> {
        self.pending.push(note.clone());
        Ok(())
    }
}

/// Call a page note handler `(timbre, frequency, length, name)`
#[cfg(target_arch = "wasm32")]
pub fn play_on_page(handler: &js_sys::Function, note: &Note) -> Result<()> {
    use wasm_bindgen::JsValue;

    let args = js_sys::Array::of4(
        &JsValue::from_str(note.timbre.as_str()),
        &JsValue::from_f64(note.frequency_hz as f64),
        &JsValue::from_str(note.length.as_tone_str()),
        &JsValue::from_str(note.name),
    );
    handler
        .apply(&JsValue::NULL, &args)
        .map(|_| ())
        .map_err(|e| crate::error::Error::sound(crate::error::describe_js(&e)))
}

#[cfg(all(feature = "midi", not(target_arch = "wasm32")))]
pub use midi::MidirSink;

#[cfg(all(feature = "midi", not(target_arch = "wasm32")))]
mod midi {
    use super::{Note, SoundSink};
    use crate::error::{Error, Result};

    /// Plays notes on the first MIDI output port, preferring a softsynth
    pub struct MidirSink {
        conn: midir::MidiOutputConnection,
        // (channel, key) still sounding
        sounding: Vec<(u8, u8)>,
        programs: [Option<u8>; 16],
    }

    impl MidirSink {
        pub fn open() -> Result<Self> {
            let midi_out = midir::MidiOutput::new("swat-piano")
                .map_err(|e| Error::sound(format!("MIDI init error: {e}")))?;
            let ports = midi_out.ports();
            if ports.is_empty() {
                return Err(Error::sound("no MIDI output ports found"));
            }
            let port_idx = ports
                .iter()
                .position(|p| {
                    midi_out
                        .port_name(p)
                        .map(|n| {
                            let n = n.to_lowercase();
                            n.contains("fluid") || n.contains("timidity") || n.contains("synth")
                        })
                        .unwrap_or(false)
                })
                .unwrap_or(0);
            let port = &ports[port_idx];
            let name = midi_out.port_name(port).unwrap_or_else(|_| "Unknown".to_string());
            tracing::info!("Opening MIDI port: {}", name);
            let conn = midi_out
                .connect(port, "swat-piano-out")
                .map_err(|e| Error::sound(format!("MIDI connect failed: {e}")))?;
            Ok(Self { conn, sounding: Vec::new(), programs: [None; 16] })
        }

        fn send(&mut self, bytes: &[u8]) -> Result<()> {
            self.conn.send(bytes).map_err(|e| Error::sound(e.to_string()))
        }
    }

    impl SoundSink for MidirSink {
        fn play(&mut self, note: &Note) -> Result<()> {
            let channel = crate::controller::recorder::channel_for(note.category);
            if self.programs[channel as usize] != Some(note.program) {
                self.send(&[0xC0 | channel, note.program])?;
                self.programs[channel as usize] = Some(note.program);
            }
            // no timer thread: release the previous note on this channel
            if let Some(pos) = self.sounding.iter().position(|(ch, _)| *ch == channel) {
                let (ch, key) = self.sounding.remove(pos);
                self.send(&[0x80 | ch, key, 0])?;
            }
            let key = note.midi_key();
            self.send(&[0x90 | channel, key, 100])?;
            self.sounding.push((channel, key));
            Ok(())
        }
    }

    impl Drop for MidirSink {
        fn drop(&mut self) {
            for (ch, key) in std::mem::take(&mut self.sounding) {
                let _ = self.conn.send(&[0x80 | ch, key, 0]);
            }
        }
    }
}
