use std::collections::BTreeSet;

use crate::guidance::types::PageElement;

/// Score contributed by each focus keyword found in a label.
pub const MATCH_WEIGHT: u32 = 10;

/// Count focus keywords contained in `text`, case-insensitively. No fuzzy matching.
pub fn score(text: &str, focus_areas: &BTreeSet<String>) -> u32 {
    let label = text.to_lowercase();
    focus_areas
        .iter()
        .filter(|keyword| !keyword.is_empty() && label.contains(keyword.to_lowercase().as_str()))
        .count() as u32
        * MATCH_WEIGHT
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredElement<'a> {
    pub element: &'a PageElement,
    pub score: u32,
}

/// Rank elements by descending score. Equal scores keep their input order.
pub fn rank<'a>(elements: &'a [PageElement], focus_areas: &BTreeSet<String>) -> Vec<ScoredElement<'a>> {
    let mut scored: Vec<ScoredElement<'a>> = elements
        .iter()
        .map(|element| ScoredElement {
            element,
            score: score(&element.text, focus_areas),
        })
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
