pub mod handlers {
    use actix_web::{post, get, web, HttpResponse, ResponseError, cookie::{Cookie, SameSite}};
    use std::sync::Arc;
    use crate::state::{PaymentStateManager, SESSION_HOURS};
    use crate::api::{
        OpenSessionResponse, ToggleTermRequest, PaymentViewResponse, SummaryResponse, CheckoutResponse,
    };
    use crate::auth::{PaymentSession, SESSION_COOKIE};
    use crate::error::AppError;

    fn failed(e: &AppError) -> HttpResponse {
        match e {
            AppError::Io(_) | AppError::Config(_) | AppError::Serialization(_) => {
                tracing::error!("Payment request failed: {:?}", e);
            }
            _ => tracing::warn!("Payment request rejected: {}", e),
        }
        e.error_response()
    }

    #[get("/health")]
    pub async fn health() -> HttpResponse {
        HttpResponse::Ok().json(serde_json::json!({ "success": true }))
    }

    // Open a basket for a student ---
    #[post("/api/pay/{student_id}/session")]
    pub async fn open_session(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.open_session(&student_id).await {
            Ok(session_id) => {
                let cookie = Cookie::build(SESSION_COOKIE, session_id.to_string())
                    .path("/")
                    .secure(true)
                    .http_only(true)
                    .same_site(SameSite::Strict)
                    .max_age(time::Duration::hours(SESSION_HOURS))
                    .finish();

                HttpResponse::Ok()
                    .cookie(cookie)
                    .json(OpenSessionResponse {
                        success: true,
                        error_message: None,
                        session_id: Some(session_id),
                    })
            },
            Err(e) => failed(&e),
        }
    }

    #[get("/api/pay/{student_id}/terms")]
    pub async fn get_terms(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.view(session.session_id, &student_id).await {
            Ok(view) => HttpResponse::Ok().json(PaymentViewResponse::ok(view)),
            Err(e) => failed(&e),
        }
    }

    // Tick or untick one term. Locked terms are ignored, not rejected.
    #[post("/api/pay/{student_id}/toggle")]
    pub async fn toggle_term(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
        request: web::Json<ToggleTermRequest>,
    ) -> HttpResponse {
        let student_id = path.into_inner();
        let req = request.into_inner();

        match state_manager.toggle(session.session_id, &student_id, &req.term_id).await {
            Ok((changed, view)) => {
                if !changed {
                    tracing::debug!("Toggle on {} for {} left the basket unchanged", req.term_id, student_id);
                }
                HttpResponse::Ok().json(PaymentViewResponse {
                    changed: Some(changed),
                    ..PaymentViewResponse::ok(view)
                })
            },
            Err(e) => failed(&e),
        }
    }

    #[post("/api/pay/{student_id}/select_all")]
    pub async fn select_all(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.select_all(session.session_id, &student_id).await {
            Ok(view) => HttpResponse::Ok().json(PaymentViewResponse::ok(view)),
            Err(e) => failed(&e),
        }
    }

    #[post("/api/pay/{student_id}/clear")]
    pub async fn clear_selection(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.clear(session.session_id, &student_id).await {
            Ok(view) => HttpResponse::Ok().json(PaymentViewResponse::ok(view)),
            Err(e) => failed(&e),
        }
    }

    #[get("/api/pay/{student_id}/summary")]
    pub async fn get_summary(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.summary(session.session_id, &student_id).await {
            Ok(summary) => HttpResponse::Ok().json(SummaryResponse {
                success: true,
                error_message: None,
                summary: Some(summary),
            }),
            Err(e) => failed(&e),
        }
    }

    // Hand the basket to the payment gateway ---
    #[post("/api/pay/{student_id}/checkout")]
    pub async fn checkout(
        state_manager: web::Data<Arc<PaymentStateManager>>,
        session: PaymentSession,
        path: web::Path<String>,
    ) -> HttpResponse {
        let student_id = path.into_inner();

        match state_manager.checkout(session.session_id, &student_id).await {
            Ok((payment_request, payment_link)) => HttpResponse::Ok().json(CheckoutResponse {
                success: true,
                error_message: None,
                payment_request: Some(payment_request),
                payment_link: Some(payment_link),
            }),
            Err(e) => failed(&e),
        }
    }

    /// Registers every payment route on an app.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.service(health)
            .service(open_session)
            .service(get_terms)
            .service(toggle_term)
            .service(select_all)
            .service(clear_selection)
            .service(get_summary)
            .service(checkout);
    }
}
