//! End-to-end tests of the authenticated `/api` endpoints

mod common;

use actix_web::{http::StatusCode, test, web};
use serde_json::{json, Value};

use og_api::create_app;

use common::{auth, basic_auth, fixture, NAMESPACE};

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_rt::test]
    async fn test_missing_credentials_are_rejected() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .set_form([("provider", "email")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing Basic Authorization header.");

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(basic_auth(NAMESPACE, "wrong"))
            .set_form([("provider", "email")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid API credentials.");
    }

    #[actix_rt::test]
    async fn test_issue_pushes_and_returns_url() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([
                ("provider", "email"),
                ("to", "user@example.com"),
                ("otp", "123456"),
                ("extra", r#"{"order":42}"#),
            ])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["namespace"], "myapp");
        assert_eq!(body["data"]["id"], "uid123");
        assert_eq!(body["data"]["attempts"], 1);
        assert_eq!(body["data"]["closed"], false);
        assert_eq!(body["data"]["extra"], json!({"order": 42}));
        assert_eq!(body["data"]["url"], "http://localhost:8080/otp/myapp/uid123");

        assert_eq!(
            fx.provider.sent(),
            vec![("user@example.com".to_string(), "123456".to_string())]
        );
    }

    #[actix_rt::test]
    async fn test_issue_without_id_generates_one() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp")
            .insert_header(auth())
            .set_form([("provider", "email")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["id"].as_str().map(str::len), Some(32));
        assert!(fx.provider.sent().is_empty());
    }

    #[actix_rt::test]
    async fn test_issue_rejects_bad_input() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "sms")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Unknown provider.");

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("ttl", "soon")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid `ttl` value: should be a positive number");

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("ttl", "18446744073709551615")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["message"].as_str().unwrap().starts_with("Invalid `ttl` value"));

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("to", "not-an-address")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_wrong_guesses_lock_the_record() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([
                ("provider", "email"),
                ("to", "user@example.com"),
                ("otp", "123456"),
                ("max_attempts", "3"),
            ])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("otp", "000000")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Incorrect OTP.");
        assert_eq!(body["data"]["attempts"], 2);
        assert_eq!(body["data"]["max_attempts"], 3);
        assert!(body["data"].get("otp").is_none());

        // The third attempt reaches the limit, so even the right code is refused.
        let req = test::TestRequest::post()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("otp", "123456")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["attempts"], 3);

        // Re-issuing a locked record is refused too.
        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("to", "user@example.com")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(fx.provider.sent().len(), 1);
    }

    #[actix_rt::test]
    async fn test_verify_then_status_then_delete() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("to", "user@example.com"), ("otp", "123456")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123/status")
            .insert_header(auth())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "OTP not verified.");

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("otp", "123456"), ("skip_delete", "true")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["closed"], true);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123/status")
            .insert_header(auth())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri("/api/otp/uid123/status")
            .insert_header(auth())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123/status")
            .insert_header(auth())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "OTP does not exist or has expired.");
    }

    #[actix_rt::test]
    async fn test_verify_deletes_by_default() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("otp", "123456")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("otp", "123456")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123/status")
            .insert_header(auth())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_namespaces_are_isolated() {
        let mut fx = fixture();
        let mut credentials = (*fx.credentials).clone();
        credentials.insert("other".to_string(), "pass".to_string());
        fx.credentials = std::sync::Arc::new(credentials);
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::put()
            .uri("/api/otp/uid123")
            .insert_header(auth())
            .set_form([("provider", "email"), ("otp", "123456")])
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/otp/uid123")
            .insert_header(basic_auth("other", "pass"))
            .set_form([("otp", "123456")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "OTP does not exist or has expired.");
    }

    #[actix_rt::test]
    async fn test_system_endpoints() {
        let fx = fixture();
        let app = test::init_service(create_app(fx.state.clone(), fx.credentials.clone())).await;

        let req = test::TestRequest::get().uri("/api/providers").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!(["email"]));

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"status": "success", "data": "OK"}));

        let req = test::TestRequest::get().uri("/").to_request();
        assert_eq!(
            test::call_and_read_body(&app, req).await,
            web::Bytes::from_static(b"otp-gateway")
        );

        let req = test::TestRequest::get().uri("/nowhere").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
