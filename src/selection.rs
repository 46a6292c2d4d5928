use std::collections::HashSet;

use crate::availability::{available_consecutive_prefix, compute_availability, AvailabilityView};
use crate::models::{FeeTerm, TermId};

/// The basket of terms a payer has ticked on the payment page.
///
/// Owned by the caller and passed the sorted term list on every change; the
/// availability view is recomputed from it rather than cached here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    selected: HashSet<TermId>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TermId) -> bool {
        self.selected.contains(id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn as_set(&self) -> &HashSet<TermId> {
        &self.selected
    }

    /// Selected ids in payment order.
    pub fn ids(&self, sorted: &[FeeTerm]) -> Vec<TermId> {
        sorted
            .iter()
            .filter(|t| self.selected.contains(&t.id))
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn availability(&self, sorted: &[FeeTerm]) -> AvailabilityView {
        compute_availability(sorted, &self.selected)
    }

    /// Flips one term. Returns whether the selection changed.
    ///
    /// Picking a term that is locked, already paid or not in the list does
    /// nothing.
    ///
    /// Dropping a term also drops every selected term after it. This is a
    /// policy choice: a per-term state machine would only move the dropped
    /// term from Selected back to Available and leave later ones Selected.
    /// Cascading instead keeps the basket a consecutive chain, so no selected
    /// term is ever left without its predecessor paid or selected.
    pub fn toggle(&mut self, sorted: &[FeeTerm], id: &TermId) -> bool {
        if self.selected.contains(id) {
            let cut = sorted.iter().position(|t| &t.id == id);
            match cut {
                Some(pos) => {
                    for later in &sorted[pos..] {
                        self.selected.remove(&later.id);
                    }
                }
                None => {
                    self.selected.remove(id);
                }
            }
            return true;
        }

        if !self.availability(sorted).is_available(id) {
            tracing::debug!("Ignoring toggle on unavailable term {}", id);
            return false;
        }
        self.selected.insert(id.clone())
    }

    /// Selects every unpaid term that can be reached in order from the current
    /// selection. Each pass adds the available prefix, which in turn unlocks the
    /// next term, until nothing new comes in.
    pub fn select_all_available(&mut self, sorted: &[FeeTerm]) -> usize {
        let before = self.selected.len();
        loop {
            let view = self.availability(sorted);
            let grown = available_consecutive_prefix(sorted, &view)
                .into_iter()
                .fold(false, |grown, id| self.selected.insert(id) || grown);
            if !grown {
                break;
            }
        }
        self.selected.len() - before
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
