//! Captures played notes and exports them as a Standard MIDI File.

use std::collections::BTreeMap;

use crate::controller::sound::Note;
use crate::model::CategoryId;

pub const TICKS_PER_QUARTER: u16 = 480;
pub const TEMPO_BPM: u32 = 120;
const VELOCITY: u8 = 100;
/// General MIDI reserves channel 10 (index 9) for percussion
const PERCUSSION_CHANNEL: u8 = 9;

/// MIDI channel for a category: one per category, skipping the percussion channel
pub fn channel_for(category: CategoryId) -> u8 {
    let ch = (category.0 % 15) as u8;
    if ch >= PERCUSSION_CHANNEL {
        ch + 1
    } else {
        ch
    }
}

fn ms_to_ticks(ms: f64) -> u32 {
    let ticks_per_ms = TICKS_PER_QUARTER as f64 * TEMPO_BPM as f64 / 60_000.0;
    (ms.max(0.0) * ticks_per_ms).round() as u32
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedNote {
    /// Offset from the start of the recording
    pub at_ms: f64,
    pub channel: u8,
    pub program: u8,
    pub key: u8,
    pub duration_ticks: u32,
}

/// A finished take
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recording {
    pub started_ms: f64,
    pub notes: Vec<RecordedNote>,
}

impl Recording {
    pub fn file_name(&self) -> String {
        format!("instrument_recording_{}.mid", self.started_ms.max(0.0) as u64)
    }

    /// Serialize as a format-0 Standard MIDI File
    pub fn to_midi_bytes(&self) -> Vec<u8> {
        let track = self.build_track();

        let mut out = Vec::with_capacity(22 + track.len());
        out.extend_from_slice(b"MThd");
        out.extend_from_slice(&6u32.to_be_bytes());
        out.extend_from_slice(&0u16.to_be_bytes()); // format 0
        out.extend_from_slice(&1u16.to_be_bytes()); // 1 track
        out.extend_from_slice(&TICKS_PER_QUARTER.to_be_bytes());

        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track.len() as u32).to_be_bytes());
        out.extend_from_slice(&track);
        out
    }

    fn build_track(&self) -> Vec<u8> {
        let mut t = Vec::new();

        // tempo at delta 0
        let micros = 60_000_000u32 / TEMPO_BPM;
        t.extend_from_slice(&[0x00, 0xFF, 0x51, 0x03]);
        t.extend_from_slice(&micros.to_be_bytes()[1..]);

        let mut programs = BTreeMap::new();
        for n in &self.notes {
            programs.entry(n.channel).or_insert(n.program);
        }
        for (ch, program) in programs {
            t.extend_from_slice(&[0x00, 0xC0 | (ch & 0x0F), program & 0x7F]);
        }

        // (tick, is_on, status, key, velocity); note-offs sort first on equal ticks
        let mut events: Vec<(u32, bool, u8, u8, u8)> = Vec::with_capacity(self.notes.len() * 2);
        for n in &self.notes {
            let on = ms_to_ticks(n.at_ms);
            let ch = n.channel & 0x0F;
            events.push((on, true, 0x90 | ch, n.key & 0x7F, VELOCITY));
            events.push((on + n.duration_ticks, false, 0x80 | ch, n.key & 0x7F, 0));
        }
        events.sort_by_key(|e| (e.0, e.1));

        let mut cursor = 0;
        for (tick, _, status, key, velocity) in events {
            write_vlq(&mut t, tick - cursor);
            cursor = tick;
            t.extend_from_slice(&[status, key, velocity]);
        }

        t.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
        t
    }

    /// Write the take into `dir` under [`Recording::file_name`]
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_dir(&self, dir: &std::path::Path) -> crate::error::Result<std::path::PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_midi_bytes())?;
        tracing::info!("Saved recording with {} notes to {}", self.notes.len(), path.display());
        Ok(path)
    }
}

/// Write a MIDI variable-length quantity
fn write_vlq(buf: &mut Vec<u8>, mut value: u32) {
    let mut bytes = [0u8; 5];
    let mut i = bytes.len() - 1;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}

#[derive(Default)]
pub struct Recorder {
    current: Option<Recording>,
}

impl Recorder {
    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    /// Begin a new take; an active take is discarded
    pub fn start(&mut self, now_ms: f64) {
        if self.current.is_some() {
            tracing::warn!("Restarting recording; previous take discarded");
        }
        self.current = Some(Recording { started_ms: now_ms, notes: Vec::new() });
        tracing::info!("Recording started");
    }

    pub fn stop(&mut self) -> Option<Recording> {
        let take = self.current.take()?;
        tracing::info!("Recording stopped with {} notes", take.notes.len());
        Some(take)
    }

    /// Record `note` if a take is running
    pub fn capture(&mut self, now_ms: f64, note: &Note) {
        let Some(take) = self.current.as_mut() else {
            return;
        };
        let beats = note.length.beats();
        take.notes.push(RecordedNote {
            at_ms: now_ms - take.started_ms,
            channel: channel_for(note.category),
            program: note.program,
            key: note.midi_key(),
            duration_ticks: (beats * TICKS_PER_QUARTER as f32).round() as u32,
        });
    }

    pub fn notes_captured(&self) -> usize {
        self.current.as_ref().map(|r| r.notes.len()).unwrap_or(0)
    }
}
