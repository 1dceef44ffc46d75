use std::fmt;

use crate::model::{Catalog, CategoryId};

/// Running hit count per catalog glyph, in catalog order
#[derive(Clone, Debug, PartialEq)]
pub struct HitTally {
    entries: Vec<(&'static str, u32)>,
}

impl HitTally {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            entries: catalog.iter().map(|(_, c)| (c.glyph, 0)).collect(),
        }
    }

    /// Count one hit; returns the new count
    pub fn increment(&mut self, id: CategoryId) -> Option<u32> {
        let entry = self.entries.get_mut(id.0)?;
        entry.1 += 1;
        Some(entry.1)
    }

    pub fn count(&self, id: CategoryId) -> u32 {
        self.entries.get(id.0).map(|e| e.1).unwrap_or(0)
    }

    pub fn count_glyph(&self, glyph: &str) -> Option<u32> {
        self.entries.iter().find(|(g, _)| *g == glyph).map(|(_, n)| *n)
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.entries.iter().copied()
    }
}

impl fmt::Display for HitTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (glyph, count)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{glyph}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_only_touches_one_glyph() {
        let catalog = Catalog::instruments();
        let mut tally = HitTally::from_catalog(&catalog);
        assert_eq!(tally.total(), 0);

        assert_eq!(tally.increment(CategoryId(1)), Some(1));
        assert_eq!(tally.count_glyph("🎹"), Some(1));
        assert_eq!(tally.count_glyph("🎸"), Some(0));
        assert_eq!(tally.total(), 1);
        assert_eq!(tally.increment(CategoryId(99)), None);
    }

    #[test]
    fn test_display_in_catalog_order() {
        let catalog = Catalog::characters();
        let mut tally = HitTally::from_catalog(&catalog);
        tally.increment(CategoryId(1));
        let text = tally.to_string();
        assert!(text.starts_with("A: 0, B: 1, C: 0"));
        assert!(text.ends_with("9: 0"));
    }
}
