use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::availability::{term_states, AvailabilityView, TermState};
use crate::error::{AppError, Result, TraceErr};
use crate::models::{FeeTerm, TermId};
use crate::payment_gateway::{PaymentGateway, PaymentLink};
use crate::selection::SelectionState;
use crate::summary::{summarize, PaymentRequest, SelectionSummary};
use crate::term_order::resolve_order;
use crate::term_store::FeeTermSource;

pub const SESSION_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct PaymentSessionState {
    pub student_id: String,
    pub selection: SelectionState,
    pub created_ts: DateTime<Utc>,
}

impl PaymentSessionState {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_ts > Duration::hours(SESSION_HOURS)
    }
}

/// Everything the payment page renders for one student at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub student_id: String,
    pub terms: Vec<FeeTerm>,
    pub availability: AvailabilityView,
    pub states: Vec<(TermId, TermState)>,
    pub selected: Vec<TermId>,
    pub summary: SelectionSummary,
}

pub struct PaymentStateManager {
    pub terms: Arc<dyn FeeTermSource>,
    pub gateway: Arc<dyn PaymentGateway>,
    sessions: DashMap<Uuid, PaymentSessionState>,
}

impl PaymentStateManager {
    pub fn new(terms: Arc<dyn FeeTermSource>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            terms,
            gateway,
            sessions: DashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Starts an empty basket for a student.
    pub async fn open_session(&self, student_id: &str) -> Result<Uuid> {
        // make sure the student exists before handing out a session
        self.sorted_terms(student_id).await?;
        self.purge_expired();

        let session_id = Uuid::new_v4();
        self.sessions.insert(session_id, PaymentSessionState {
            student_id: student_id.to_string(),
            selection: SelectionState::new(),
            created_ts: Utc::now(),
        });
        tracing::info!("Opened payment session {} for {}", session_id, student_id);
        Ok(session_id)
    }

    pub async fn view(&self, session_id: Uuid, student_id: &str) -> Result<PaymentView> {
        let terms = self.sorted_terms(student_id).await?;
        let selection = self.selection(session_id, student_id)?;
        Ok(build_view(student_id, terms, &selection))
    }

    /// Returns whether the basket changed along with the fresh view.
    pub async fn toggle(&self, session_id: Uuid, student_id: &str, term_id: &TermId) -> Result<(bool, PaymentView)> {
        let terms = self.sorted_terms(student_id).await?;
        let (changed, selection) = self.with_selection(session_id, student_id, |sel| {
            let changed = sel.toggle(&terms, term_id);
            (changed, sel.clone())
        })?;
        Ok((changed, build_view(student_id, terms, &selection)))
    }

    pub async fn select_all(&self, session_id: Uuid, student_id: &str) -> Result<PaymentView> {
        let terms = self.sorted_terms(student_id).await?;
        let selection = self.with_selection(session_id, student_id, |sel| {
            sel.select_all_available(&terms);
            sel.clone()
        })?;
        Ok(build_view(student_id, terms, &selection))
    }

    pub async fn clear(&self, session_id: Uuid, student_id: &str) -> Result<PaymentView> {
        let terms = self.sorted_terms(student_id).await?;
        let selection = self.with_selection(session_id, student_id, |sel| {
            sel.clear();
            sel.clone()
        })?;
        Ok(build_view(student_id, terms, &selection))
    }

    pub async fn summary(&self, session_id: Uuid, student_id: &str) -> Result<SelectionSummary> {
        let terms = self.sorted_terms(student_id).await?;
        let selection = self.selection(session_id, student_id)?;
        Ok(summarize(&terms, selection.as_set()))
    }

    /// Hands the current basket to the gateway.
    ///
    /// The basket is taken out of the session in one step before anything is
    /// awaited, so a second checkout on the same session finds it empty and
    /// terms ticked meanwhile go into a fresh basket. On failure the taken
    /// basket goes back, unless the payer has started a new one.
    pub async fn checkout(&self, session_id: Uuid, student_id: &str) -> Result<(PaymentRequest, PaymentLink)> {
        let terms = self.sorted_terms(student_id).await?;
        let taken = self.with_selection(session_id, student_id, std::mem::take)?;

        match self.submit(student_id, &terms, &taken).await {
            Ok((request, link)) => {
                tracing::info!(
                    "Checkout {} started for {} terms [{}]",
                    link.id,
                    student_id,
                    request.fee_term_id
                );
                Ok((request, link))
            }
            Err(e) => {
                self.restore_selection(session_id, student_id, taken);
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        student_id: &str,
        terms: &[FeeTerm],
        selection: &SelectionState,
    ) -> Result<(PaymentRequest, PaymentLink)> {
        // terms may have been paid elsewhere since they were ticked
        let mut current = SelectionState::new();
        for id in selection.ids(terms) {
            current.toggle(terms, &id);
        }
        if current.len() != selection.len() {
            return Err(AppError::BadRequest(
                "Selected fee terms are no longer payable, please review your selection".to_string(),
            ));
        }

        let request = PaymentRequest::from_summary(&summarize(terms, current.as_set()))?;
        let link = self
            .gateway
            .create_payment_link(student_id, &request)
            .await
            .trace_err("create_payment_link")?;
        Ok((request, link))
    }

    fn restore_selection(&self, session_id: Uuid, student_id: &str, taken: SelectionState) {
        if taken.is_empty() {
            return;
        }
        let restored = self.with_selection(session_id, student_id, |sel| {
            if sel.is_empty() {
                *sel = taken;
                true
            } else {
                false
            }
        });
        if !matches!(restored, Ok(true)) {
            tracing::warn!("Dropped basket of session {} after failed checkout", session_id);
        }
    }

    async fn sorted_terms(&self, student_id: &str) -> Result<Vec<FeeTerm>> {
        match self.terms.terms_for_student(student_id).await? {
            Some(terms) => Ok(resolve_order(&terms)),
            None => Err(AppError::NotFound(format!("No fee terms for student {}", student_id))),
        }
    }

    fn selection(&self, session_id: Uuid, student_id: &str) -> Result<SelectionState> {
        self.with_selection(session_id, student_id, |sel| sel.clone())
    }

    fn with_selection<T>(
        &self,
        session_id: Uuid,
        student_id: &str,
        f: impl FnOnce(&mut SelectionState) -> T,
    ) -> Result<T> {
        let mut entry = self
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::SessionExpired(session_id.to_string()))?;

        if entry.is_expired(Utc::now()) {
            drop(entry);
            self.sessions.remove(&session_id);
            return Err(AppError::SessionExpired(session_id.to_string()));
        }
        if entry.student_id != student_id {
            tracing::warn!(
                "Session {} belongs to {}, not {}",
                session_id,
                entry.student_id,
                student_id
            );
            return Err(AppError::BadRequest("Payment session is for a different student".to_string()));
        }
        Ok(f(&mut entry.selection))
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.sessions.retain(|_, s| !s.is_expired(now));
    }
}

fn build_view(student_id: &str, terms: Vec<FeeTerm>, selection: &SelectionState) -> PaymentView {
    PaymentView {
        student_id: student_id.to_string(),
        availability: selection.availability(&terms),
        states: term_states(&terms, selection.as_set()),
        selected: selection.ids(&terms),
        summary: summarize(&terms, selection.as_set()),
        terms,
    }
}
