use actix_web::{cookie::Cookie, http::StatusCode, test, web, App};
use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use schoolfees::error::Result as AppResult;
use schoolfees::models::FeeTerm;
use schoolfees::payment_gateway::{PaymentGateway, PaymentLink};
use schoolfees::server::handlers;
use schoolfees::state::{PaymentStateManager, SESSION_HOURS};
use schoolfees::summary::PaymentRequest;
use schoolfees::term_store::JsonTermStore;

#[derive(Default)]
struct FakeGateway {
    seen: Mutex<Vec<(String, PaymentRequest)>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_link(&self, student_id: &str, request: &PaymentRequest) -> AppResult<PaymentLink> {
        self.seen
            .lock()
            .expect("gateway lock")
            .push((student_id.to_string(), request.clone()));
        Ok(PaymentLink {
            id: "cs_test_42".to_string(),
            url: format!("https://checkout.test/{}", student_id),
        })
    }
}

fn student_terms() -> Vec<FeeTerm> {
    // deliberately out of order, ranked by name only
    serde_json::from_value(json!([
        {
            "id": "t10", "name": "Term 10", "totalAmount": 2000, "isPaid": false,
            "feeHeads": [
                {"id": "tu", "name": "Tuition", "originalAmount": 2000, "concessionAmount": 0,
                 "finalAmount": 2000, "outstandingAmount": 2000}
            ]
        },
        {
            "id": "t1", "name": "Term 1", "totalAmount": 4000, "isPaid": true, "feeHeads": []
        },
        {
            "id": "t2", "name": "Term 2", "totalAmount": 4500, "isPaid": false,
            "concessionAmount": 500,
            "feeHeads": [
                {"id": "tu", "name": "Tuition", "originalAmount": 4000, "concessionAmount": 500,
                 "finalAmount": 3500, "outstandingAmount": 3500},
                {"id": "bus", "name": "Transport", "originalAmount": 1000, "concessionAmount": 0,
                 "finalAmount": 1000, "outstandingAmount": 1000}
            ]
        }
    ]))
    .expect("fixture terms")
}

fn state(gateway: Arc<FakeGateway>) -> web::Data<Arc<PaymentStateManager>> {
    let store = JsonTermStore::from_terms(vec![("STU1".to_string(), student_terms())]);
    web::Data::new(Arc::new(PaymentStateManager::new(Arc::new(store), gateway)))
}

async fn read_json(resp: actix_web::dev::ServiceResponse) -> serde_json::Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).expect("response json")
}

#[actix_rt::test]
async fn full_checkout_flow() {
    let gateway = Arc::new(FakeGateway::default());
    let app = test::init_service(
        App::new()
            .app_data(state(gateway.clone()))
            .configure(handlers::configure),
    )
    .await;

    // open a session and keep its cookie
    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/pay/STU1/session").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie: Cookie<'static> = resp
        .response()
        .cookies()
        .find(|c| c.name() == "pay_session")
        .map(|c| c.into_owned())
        .expect("session cookie");
    // cookie lives exactly as long as the server-side session
    assert_eq!(cookie.max_age(), Some(time::Duration::hours(SESSION_HOURS)));
    assert_eq!(SESSION_HOURS, 24);

    // terms come back in payment order with Term 10 locked behind Term 2
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/pay/STU1/terms")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    let ids: Vec<&str> = body["view"]["terms"]
        .as_array()
        .expect("terms")
        .iter()
        .filter_map(|t| t["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["t1", "t2", "t10"]);
    assert_eq!(body["view"]["availability"]["t10"]["isAvailable"], false);
    assert_eq!(
        body["view"]["availability"]["t10"]["reason"],
        "Please select Term 2 first"
    );

    // ticking the locked term is silently ignored
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/pay/STU1/toggle")
            .cookie(cookie.clone())
            .set_json(json!({ "termId": "t10" }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["changed"], false);
    assert_eq!(body["view"]["summary"]["count"], 0);

    // select all walks through Term 2 into Term 10
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/pay/STU1/select_all")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    let body = read_json(resp).await;
    assert_eq!(body["view"]["selected"], json!(["t2", "t10"]));
    assert_eq!(body["view"]["summary"]["totalAmount"], "6500");
    assert_eq!(body["view"]["summary"]["totalConcession"], "500");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/pay/STU1/checkout")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = read_json(resp).await;
    assert_eq!(body["payment_link"]["url"], "https://checkout.test/STU1");
    assert_eq!(body["payment_request"]["feeTermId"], "t2,t10");
    assert_eq!(body["payment_request"]["fees"].as_array().map(|f| f.len()), Some(3));

    {
        let seen = gateway.seen.lock().expect("gateway lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "STU1");
        assert_eq!(seen[0].1.fees[1].fee_head_name, "Transport");
    }

    // basket is empty after handing off
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/pay/STU1/summary")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    let body = read_json(resp).await;
    assert_eq!(body["summary"]["count"], 0);
}

#[actix_rt::test]
async fn missing_session_is_unauthorized() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(FakeGateway::default())))
            .configure(handlers::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api/pay/STU1/terms").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/pay/STU1/terms")
            .cookie(Cookie::new("pay_session", "not-a-uuid"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn unknown_student_and_empty_checkout_are_rejected() {
    let gateway = Arc::new(FakeGateway::default());
    let app = test::init_service(
        App::new()
            .app_data(state(gateway.clone()))
            .configure(handlers::configure),
    )
    .await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/pay/NOBODY/session").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = read_json(resp).await;
    assert_eq!(body["success"], false);

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri("/api/pay/STU1/session").to_request(),
    )
    .await;
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "pay_session")
        .map(|c| c.into_owned())
        .expect("session cookie");

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/api/pay/STU1/checkout")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(gateway.seen.lock().expect("gateway lock").is_empty());
}
