use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::models::{FeeTerm, TermId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermAvailability {
    pub is_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub position: usize,
}

/// Per-term availability derived from the sorted term list and the current selection.
/// Always rebuilt from scratch, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailabilityView {
    entries: HashMap<TermId, TermAvailability>,
}

impl AvailabilityView {
    pub fn get(&self, id: &TermId) -> Option<&TermAvailability> {
        self.entries.get(id)
    }

    pub fn is_available(&self, id: &TermId) -> bool {
        self.entries.get(id).map(|a| a.is_available).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Single forward pass over `sorted`. A term can be picked once the term right
/// before it is either paid or in `selected`; paid terms are never available.
pub fn compute_availability(sorted: &[FeeTerm], selected: &HashSet<TermId>) -> AvailabilityView {
    let mut entries = HashMap::with_capacity(sorted.len());
    let mut prev: Option<&FeeTerm> = None;

    for (position, term) in sorted.iter().enumerate() {
        let entry = match prev {
            Some(p) if !(p.is_paid || selected.contains(&p.id)) => TermAvailability {
                is_available: false,
                reason: Some(format!("Please select {} first", p.name)),
                position,
            },
            _ => TermAvailability {
                is_available: !term.is_paid,
                reason: None,
                position,
            },
        };
        entries.insert(term.id.clone(), entry);
        prev = Some(term);
    }

    AvailabilityView { entries }
}

/// Ids of the unpaid terms that can be taken right now, in order. Paid terms are
/// skipped; the scan stops at the first unpaid term that is not available.
pub fn available_consecutive_prefix(sorted: &[FeeTerm], view: &AvailabilityView) -> Vec<TermId> {
    let mut out = Vec::new();
    for term in sorted {
        if term.is_paid {
            continue;
        }
        if !view.is_available(&term.id) {
            break;
        }
        out.push(term.id.clone());
    }
    out
}

/// Display state of a term on the payment page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TermState {
    Paid,
    Locked,
    Available,
    Selected,
}

pub fn term_states(sorted: &[FeeTerm], selected: &HashSet<TermId>) -> Vec<(TermId, TermState)> {
    let view = compute_availability(sorted, selected);
    sorted
        .iter()
        .map(|term| {
            let state = if term.is_paid {
                TermState::Paid
            } else if selected.contains(&term.id) {
                TermState::Selected
            } else if view.is_available(&term.id) {
                TermState::Available
            } else {
                TermState::Locked
            };
            (term.id.clone(), state)
        })
        .collect()
}
