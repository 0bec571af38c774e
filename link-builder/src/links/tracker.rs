use std::collections::{HashMap, HashSet};

use crate::links::types::LinkType;

/// Identity of one generated link within a request.
///
/// Special links do not depend on the OS (the first row with a template wins), so
/// their key leaves it out. Normal links are produced once per matching OS row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GenerationKey {
    Special { link_type: LinkType, pid: String },
    Normal { link_type: LinkType, os: String, pid: String },
}

impl GenerationKey {
    pub fn special(link_type: LinkType, pid: &str) -> Self {
        GenerationKey::Special {
            link_type,
            pid: pid.to_string(),
        }
    }

    pub fn normal(link_type: LinkType, os: &str, pid: &str) -> Self {
        GenerationKey::Normal {
            link_type,
            os: os.to_string(),
            pid: pid.to_string(),
        }
    }
}

/// Keys that already produced an output line in the current request.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    emitted: HashSet<GenerationKey>,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_emit(&self, key: &GenerationKey) -> bool {
        !self.emitted.contains(key)
    }

    pub fn mark_emitted(&mut self, key: GenerationKey) {
        self.emitted.insert(key);
    }

    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}

/// The `af_sub5`/`af_ad` pair picked for one Kraken link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KrakenDraw {
    pub sub5: &'static str,
    pub ad: &'static str,
}

/// Kraken draws made so far in the current request, one per key.
#[derive(Debug, Default)]
pub struct KrakenUsage {
    draws: HashMap<GenerationKey, KrakenDraw>,
}

impl KrakenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &GenerationKey) -> Option<KrakenDraw> {
        self.draws.get(key).copied()
    }

    /// Returns the draw stored for `key`, calling `draw` only the first time.
    pub fn get_or_draw<F>(&mut self, key: &GenerationKey, draw: F) -> KrakenDraw
    where
        F: FnOnce() -> KrakenDraw,
    {
        *self.draws.entry(key.clone()).or_insert_with(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_emitted_once() {
        let mut tracker = GenerationTracker::new();
        let key = GenerationKey::special(LinkType::OnelinkCta, "123");

        assert!(tracker.should_emit(&key));
        tracker.mark_emitted(key.clone());
        assert!(!tracker.should_emit(&key));
        assert!(!tracker.should_emit(&GenerationKey::special(LinkType::OnelinkCta, "123")));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_special_and_normal_keys_are_distinct() {
        let mut tracker = GenerationTracker::new();
        tracker.mark_emitted(GenerationKey::special(LinkType::Ctv, "1"));

        assert!(tracker.should_emit(&GenerationKey::normal(LinkType::Ctv, "android", "1")));
        tracker.mark_emitted(GenerationKey::normal(LinkType::Ctv, "android", "1"));
        assert!(tracker.should_emit(&GenerationKey::normal(LinkType::Ctv, "ios", "1")));
    }

    #[test]
    fn test_kraken_usage_draws_once_per_key() {
        let mut usage = KrakenUsage::new();
        let key = GenerationKey::normal(LinkType::Cta, "ios", "9");
        let first = KrakenDraw { sub5: "1", ad: "a" };
        assert_eq!(usage.get(&key), None);

        assert_eq!(usage.get_or_draw(&key, || first), first);
        let again = usage.get_or_draw(&key, || panic!("drew twice for the same key"));
        assert_eq!(again, first);
        assert_eq!(usage.get(&key), Some(first));

        let other = GenerationKey::normal(LinkType::Cta, "android", "9");
        assert_eq!(
            usage.get_or_draw(&other, || KrakenDraw { sub5: "2", ad: "b" }).sub5,
            "2"
        );
    }
}
