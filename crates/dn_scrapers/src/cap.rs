use std::collections::HashMap;

use chrono::NaiveDate;
use dn_core::ArticleCandidate;

/// Keeps at most `per_day` candidates for each calendar day.
///
/// Candidates are expected in listing order (an edition's lead stories first),
/// which is the order that decides who survives. Relative order is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCap {
    per_day: usize,
}

impl DailyCap {
    pub fn new(per_day: usize) -> Self {
        Self { per_day }
    }

    pub fn per_day(&self) -> usize {
        self.per_day
    }

    pub fn apply(&self, candidates: Vec<ArticleCandidate>) -> Vec<ArticleCandidate> {
        let mut taken: HashMap<NaiveDate, usize> = HashMap::new();
        let before = candidates.len();
        let kept: Vec<_> = candidates
            .into_iter()
            .filter(|c| {
                let count = taken.entry(c.published_at).or_insert(0);
                *count += 1;
                *count <= self.per_day
            })
            .collect();
        if kept.len() < before {
            tracing::debug!(cap = self.per_day, dropped = before - kept.len(), "applied daily cap");
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn candidates(day: u32, n: usize) -> Vec<ArticleCandidate> {
        (0..n)
            .map(|i| {
                ArticleCandidate::new(
                    format!("Story {}", i),
                    format!("https://news.test/{}/{}", day, i),
                    NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                    "TLDR Newsletter",
                )
            })
            .collect()
    }

    #[test]
    fn test_cap_keeps_first_per_day() {
        let kept = DailyCap::new(3).apply(candidates(6, 10));
        assert_eq!(kept.len(), 3);
        let titles: Vec<_> = kept.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 0", "Story 1", "Story 2"]);
    }

    #[test]
    fn test_cap_is_per_day() {
        let mut all = candidates(6, 5);
        all.extend(candidates(7, 2));
        let kept = DailyCap::new(3).apply(all);
        assert_eq!(kept.len(), 5);
        assert_eq!(kept.iter().filter(|c| c.published_at.day0() == 5).count(), 3);
    }

    #[test]
    fn test_zero_cap_drops_everything() {
        assert!(DailyCap::new(0).apply(candidates(6, 4)).is_empty());
    }
}
