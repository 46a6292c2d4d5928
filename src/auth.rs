use actix_web::{
    dev::Payload, error::ErrorUnauthorized, FromRequest, HttpRequest,
};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "pay_session";

// Extractor for the payer's basket session
pub struct PaymentSession {
    pub session_id: Uuid,
}

impl FromRequest for PaymentSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.cookie(SESSION_COOKIE) {
            Some(cookie) => match cookie.value().parse::<Uuid>() {
                Ok(session_id) => ready(Ok(PaymentSession { session_id })),
                Err(e) => {
                    tracing::warn!("Invalid payment session cookie received: {:?}", e);
                    ready(Err(ErrorUnauthorized("Invalid payment session format")))
                }
            },
            // Whether the session is still live is checked by the state manager
            None => {
                tracing::debug!("Payment session cookie missing.");
                ready(Err(ErrorUnauthorized("Payment session missing")))
            }
        }
    }
}
