//! Stages reached during the current day

use indexmap::IndexSet;

/// Insertion-ordered set of stage names reached today.
///
/// Cleared at the start of each day. Several transitions may happen in one
/// day, so more than one stage can be present; a stage is recorded once no
/// matter how many times it is reached.
#[derive(Debug, Clone, Default)]
pub struct StagesToday {
    stages: IndexSet<String>,
}

impl StagesToday {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `stage`; returns `false` if it was already recorded.
    pub fn insert(&mut self, stage: &str) -> bool {
        // Looked up first so repeats skip the allocation.
        if self.stages.contains(stage) {
            return false;
        }
        self.stages.insert(stage.to_string())
    }

    #[must_use]
    pub fn contains(&self, stage: &str) -> bool {
        self.stages.contains(stage)
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in the order they were reached.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedups_and_keeps_order() {
        let mut today = StagesToday::new();
        assert!(today.insert("Germination"));
        assert!(today.insert("Emergence"));
        assert!(!today.insert("Germination"));
        assert_eq!(today.len(), 2);
        assert_eq!(
            today.iter().collect::<Vec<_>>(),
            vec!["Germination", "Emergence"]
        );
    }

    #[test]
    fn test_clear() {
        let mut today = StagesToday::new();
        today.insert("Sowing");
        today.clear();
        assert!(today.is_empty());
        assert!(!today.contains("Sowing"));
    }
}
