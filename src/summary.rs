use bigdecimal::BigDecimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{zero, FeeHead, FeeTerm, TermId};
use crate::term_order::resolve_order;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermBreakdown {
    pub term_id: TermId,
    pub term_name: String,
    pub total_amount: BigDecimal,
    pub concession_amount: BigDecimal,
    pub fee_heads: Vec<FeeHead>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSummary {
    pub count: usize,
    pub total_amount: BigDecimal,
    pub total_concession: BigDecimal,
    pub breakdown: Vec<TermBreakdown>,
}

/// Totals over the selected terms, in payment order.
///
/// `total_amount` is already net of concessions and is not reduced again.
pub fn summarize(terms: &[FeeTerm], selected: &HashSet<TermId>) -> SelectionSummary {
    let mut total_amount = zero();
    let mut total_concession = zero();
    let mut breakdown = Vec::new();

    for term in resolve_order(terms).into_iter().filter(|t| selected.contains(&t.id)) {
        let concession = term.concession_or_zero();
        total_amount += &term.total_amount;
        total_concession += &concession;
        breakdown.push(TermBreakdown {
            term_id: term.id,
            term_name: term.name,
            total_amount: term.total_amount,
            concession_amount: concession,
            fee_heads: term.fee_heads,
        });
    }

    SelectionSummary {
        count: breakdown.len(),
        total_amount,
        total_concession,
        breakdown,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFee {
    pub fee_head_id: String,
    pub fee_head_name: String,
    pub amount: BigDecimal,
    pub fee_term_id: TermId,
    pub fee_term_name: String,
}

/// Payload handed to the payment-request collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    // comma-joined, in payment order
    pub fee_term_id: String,
    pub fees: Vec<PaymentFee>,
}

impl PaymentRequest {
    pub fn from_summary(summary: &SelectionSummary) -> Result<Self> {
        if summary.breakdown.is_empty() {
            return Err(AppError::BadRequest("No fee terms selected".to_string()));
        }

        let fee_term_id = summary
            .breakdown
            .iter()
            .map(|b| b.term_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let fees = summary
            .breakdown
            .iter()
            .flat_map(|b| {
                b.fee_heads.iter().map(move |head| PaymentFee {
                    fee_head_id: head.id.clone(),
                    fee_head_name: head.name.clone(),
                    amount: head.outstanding_amount.clone(),
                    fee_term_id: b.term_id.clone(),
                    fee_term_name: b.term_name.clone(),
                })
            })
            .collect();

        Ok(Self { fee_term_id, fees })
    }

    pub fn total(&self) -> BigDecimal {
        self.fees.iter().fold(zero(), |acc, f| acc + &f.amount)
    }
}
