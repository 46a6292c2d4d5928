pub mod models;
pub mod error;
pub mod config;
pub mod term_order;
pub mod availability;
pub mod selection;
pub mod summary;
pub mod term_store;
pub mod payment_gateway;
pub mod state;
pub mod api;
pub mod auth;
pub mod server;
// re-export items if you prefer a flat structure:
pub use availability::{available_consecutive_prefix, compute_availability, AvailabilityView, TermAvailability, TermState};
pub use error::Result as AppResult;
pub use models::{FeeHead, FeeTerm, TermId};
pub use selection::SelectionState;
pub use summary::{summarize, PaymentRequest, SelectionSummary};
pub use term_order::resolve_order;
