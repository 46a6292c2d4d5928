use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TermId;
use crate::payment_gateway::PaymentLink;
use crate::state::PaymentView;
use crate::summary::{PaymentRequest, SelectionSummary};

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenSessionResponse {
    pub success: bool,
    pub error_message: Option<String>,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleTermRequest {
    pub term_id: TermId,
}

#[derive(Debug, Serialize)]
pub struct PaymentViewResponse {
    pub success: bool,
    pub error_message: Option<String>,
    // false when a toggle was ignored because the term is locked or paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
    pub view: Option<PaymentView>,
}

impl PaymentViewResponse {
    pub fn ok(view: PaymentView) -> Self {
        Self {
            success: true,
            error_message: None,
            changed: None,
            view: Some(view),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub error_message: Option<String>,
    pub summary: Option<SelectionSummary>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub error_message: Option<String>,
    pub payment_request: Option<PaymentRequest>,
    pub payment_link: Option<PaymentLink>,
}
