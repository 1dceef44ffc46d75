use serde::{Deserialize, Serialize};

/// Which front-end flavour the game runs as
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Emoji instruments over piano keys, with sound
    #[default]
    Instruments,
    /// Silent A-Z/0-9 characters over matrix rain
    Characters,
}

/// Synth selector handed to the external audio engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Timbre {
    AmSynth,
    PolySynth,
    MembraneSynth,
    FmSynth,
    PluckSynth,
    MonoSynth,
    Synth,
}

impl Timbre {
    /// Name understood by Tone.js on the page
    pub fn as_str(self) -> &'static str {
        match self {
            Timbre::AmSynth => "AMSynth",
            Timbre::PolySynth => "PolySynth",
            Timbre::MembraneSynth => "MembraneSynth",
            Timbre::FmSynth => "FMSynth",
            Timbre::PluckSynth => "PluckSynth",
            Timbre::MonoSynth => "MonoSynth",
            Timbre::Synth => "Synth",
        }
    }

    pub fn is_percussive(self) -> bool {
        matches!(self, Timbre::MembraneSynth)
    }
}

/// Index into a [`Catalog`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub usize);

/// One selectable kind of falling object
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub glyph: &'static str,
    pub name: &'static str,
    /// `None` for silent categories
    pub timbre: Option<Timbre>,
    /// General MIDI program (0-based) used for MIDI output and recordings
    pub program: u8,
}

const CHARACTER_GLYPHS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fixed, read-only list of categories
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    entries: Vec<Category>,
}

impl Catalog {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Instruments => Self::instruments(),
            Variant::Characters => Self::characters(),
        }
    }

    pub fn instruments() -> Self {
        let entry = |glyph, name, timbre, program| Category {
            glyph,
            name,
            timbre: Some(timbre),
            program,
        };
        Self {
            entries: vec![
                entry("🎸", "guitar", Timbre::AmSynth, 24),
                entry("🎹", "piano", Timbre::PolySynth, 0),
                entry("🥁", "drums", Timbre::MembraneSynth, 117),
                entry("🎺", "trumpet", Timbre::FmSynth, 56),
                entry("🎻", "violin", Timbre::AmSynth, 40),
                entry("🎷", "saxophone", Timbre::MonoSynth, 65),
                entry("🪕", "banjo", Timbre::PluckSynth, 105),
                entry("🪗", "accordion", Timbre::PolySynth, 21),
                entry("🎤", "microphone", Timbre::Synth, 52),
                entry("🎧", "headphones", Timbre::Synth, 80),
            ],
        }
    }

    pub fn characters() -> Self {
        let entries = (0..CHARACTER_GLYPHS.len())
            .map(|i| {
                let glyph = &CHARACTER_GLYPHS[i..i + 1];
                Category { glyph, name: glyph, timbre: None, program: 0 }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.entries.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &Category)> {
        self.entries.iter().enumerate().map(|(i, c)| (CategoryId(i), c))
    }

    pub fn position_of_glyph(&self, glyph: &str) -> Option<CategoryId> {
        self.entries.iter().position(|c| c.glyph == glyph).map(CategoryId)
    }
}

/// Which catalog entries take part in spawning
#[derive(Clone, Debug, PartialEq)]
pub struct CategorySelection {
    enabled: Vec<bool>,
}

impl CategorySelection {
    /// Every category enabled, matching the checked-by-default toggles
    pub fn all(catalog: &Catalog) -> Self {
        Self { enabled: vec![true; catalog.len()] }
    }

    pub fn set(&mut self, id: CategoryId, enabled: bool) -> bool {
        match self.enabled.get_mut(id.0) {
            Some(slot) => {
                *slot = enabled;
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, id: CategoryId) -> Option<bool> {
        let slot = self.enabled.get_mut(id.0)?;
        *slot = !*slot;
        Some(*slot)
    }

    pub fn is_enabled(&self, id: CategoryId) -> bool {
        self.enabled.get(id.0).copied().unwrap_or(false)
    }

    pub fn active(&self) -> Vec<CategoryId> {
        self.enabled
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| CategoryId(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_catalog() {
        let catalog = Catalog::instruments();
        assert_eq!(catalog.len(), 10);
        let drums = catalog.position_of_glyph("🥁").unwrap();
        let entry = catalog.get(drums).unwrap();
        assert_eq!(entry.name, "drums");
        assert_eq!(entry.timbre, Some(Timbre::MembraneSynth));
        assert!(entry.timbre.unwrap().is_percussive());
    }

    #[test]
    fn test_character_catalog_is_silent() {
        let catalog = Catalog::characters();
        assert_eq!(catalog.len(), 36);
        assert_eq!(catalog.get(CategoryId(0)).unwrap().glyph, "A");
        assert_eq!(catalog.get(CategoryId(35)).unwrap().glyph, "9");
        assert!(catalog.iter().all(|(_, c)| c.timbre.is_none()));
    }

    #[test]
    fn test_selection_toggles() {
        let catalog = Catalog::instruments();
        let mut selection = CategorySelection::all(&catalog);
        assert_eq!(selection.active().len(), 10);

        assert_eq!(selection.toggle(CategoryId(3)), Some(false));
        assert!(!selection.is_enabled(CategoryId(3)));
        assert_eq!(selection.active().len(), 9);

        assert!(!selection.set(CategoryId(42), true));
        assert_eq!(selection.toggle(CategoryId(42)), None);
    }
}
