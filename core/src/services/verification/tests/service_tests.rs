//! Tests for the verification state machine

use std::sync::Arc;
use std::time::Duration;

use crate::domain::entities::OtpState;
use crate::errors::DomainError;
use crate::repositories::InMemoryOtpStore;
use crate::services::verification::{
    AddressOutcome, IssueRequest, MessageTemplate, Provider, ProviderRegistry,
    VerificationService, VerificationServiceConfig,
};

use super::mocks::MockProvider;

const NS: &str = "myapp";
const ID: &str = "uid123";

struct Harness {
    service: Arc<VerificationService<InMemoryOtpStore>>,
    provider: Arc<MockProvider>,
}

fn config() -> VerificationServiceConfig {
    VerificationServiceConfig {
        default_ttl: Duration::from_secs(60),
        max_ttl: Duration::from_secs(3600),
        default_max_attempts: 5,
        root_url: "http://localhost:8080".to_string(),
        push_timeout: Duration::from_secs(1),
        min_id_len: 6,
    }
}

fn setup_with(provider: MockProvider) -> Harness {
    let provider = Arc::new(provider);
    let mut registry = ProviderRegistry::new();
    registry.register(
        provider.clone() as Arc<dyn Provider>,
        MessageTemplate::new("{{channel}} code", "Code {{otp}}: {{otp_url}}"),
    );

    let service = VerificationService::new(
        Arc::new(InMemoryOtpStore::new()),
        Arc::new(registry),
        config(),
    );

    Harness {
        service: Arc::new(service),
        provider,
    }
}

fn setup() -> Harness {
    setup_with(MockProvider::new())
}

fn request(to: Option<&str>, otp: Option<&str>, max_attempts: Option<u32>) -> IssueRequest {
    IssueRequest {
        provider: "mock".to_string(),
        id: Some(ID.to_string()),
        to: to.map(String::from),
        otp: otp.map(String::from),
        max_attempts,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_issue_generates_id_and_otp() {
    let h = setup();

    let issued = h
        .service
        .issue(
            NS,
            IssueRequest {
                provider: "mock".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(issued.otp.id.len(), 32);
    assert!(issued.otp.id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(issued.otp.otp.len(), 6);
    assert!(issued.otp.otp.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(issued.otp.attempts, 1);
    assert_eq!(issued.otp.max_attempts, 5);
    assert_eq!(issued.otp.extra, "{}");
    assert_eq!(issued.otp.state(), OtpState::PendingNoAddress);
    assert_eq!(
        issued.url,
        format!("http://localhost:8080/otp/{}/{}", NS, issued.otp.id)
    );
    // No address, nothing pushed.
    assert_eq!(h.provider.sent_count(), 0);
}

#[tokio::test]
async fn test_issue_with_address_pushes_rendered_message() {
    let h = setup();

    let issued = h
        .service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), None))
        .await
        .unwrap();

    assert_eq!(issued.otp.state(), OtpState::PendingAwaiting);
    let sent = h.provider.last_sent().unwrap();
    assert_eq!(sent.to, "alice@example.com");
    assert_eq!(sent.subject, "E-mail code");
    assert_eq!(
        sent.body,
        "Code 123456: http://localhost:8080/otp/myapp/uid123?otp=123456&action=check"
    );
}

#[tokio::test]
async fn test_issue_rejects_invalid_input() {
    let h = setup();

    let err = h
        .service
        .issue(
            NS,
            IssueRequest {
                provider: "carrier-pigeon".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::UnknownProvider("carrier-pigeon".into()));

    let err = h
        .service
        .issue(NS, request(Some("not-an-email"), None, None))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidAddress(_)));

    let mut req = request(None, None, None);
    req.extra = Some("{not json".to_string());
    let err = h.service.issue(NS, req).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidInput { ref field, .. } if field == "extra"));

    let mut req = request(None, None, None);
    req.ttl = Some(0);
    assert!(matches!(
        h.service.issue(NS, req).await,
        Err(DomainError::InvalidInput { .. })
    ));

    assert!(matches!(
        h.service.issue(NS, request(None, None, Some(0))).await,
        Err(DomainError::InvalidInput { .. })
    ));

    let mut req = request(None, None, None);
    req.ttl = Some(u64::MAX);
    assert!(matches!(
        h.service.issue(NS, req).await,
        Err(DomainError::InvalidInput { ref field, .. }) if field == "ttl"
    ));

    let mut req = request(None, None, None);
    req.ttl = Some(3601);
    assert!(matches!(
        h.service.issue(NS, req).await,
        Err(DomainError::InvalidInput { ref field, .. }) if field == "ttl"
    ));

    let mut req = request(None, None, None);
    req.id = Some("abc".to_string());
    assert!(matches!(
        h.service.issue(NS, req).await,
        Err(DomainError::InvalidInput { ref field, .. }) if field == "id"
    ));

    assert_eq!(h.provider.sent_count(), 0);
}

#[tokio::test]
async fn test_issue_keeps_extra_verbatim() {
    let h = setup();
    let mut req = request(None, None, None);
    req.extra = Some(r#"{"user_id": 42, "tags": ["a"]}"#.to_string());

    let issued = h.service.issue(NS, req).await.unwrap();

    assert_eq!(issued.otp.extra, r#"{"user_id": 42, "tags": ["a"]}"#);
}

#[tokio::test]
async fn test_delivery_failure_fails_issue_but_keeps_record() {
    let h = setup_with(MockProvider::failing());

    let err = h
        .service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), None))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::DeliveryFailure(_)));
    let stored = h.service.peek(NS, ID).await.unwrap();
    assert_eq!(stored.otp, "123456");
}

#[tokio::test(start_paused = true)]
async fn test_push_timeout_is_delivery_failure() {
    let h = setup_with(MockProvider::slow(Duration::from_secs(10)));

    let err = h
        .service
        .issue(NS, request(Some("alice@example.com"), None, None))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::DeliveryFailure(_)));
    assert_eq!(h.provider.sent_count(), 0);
}

#[tokio::test]
async fn test_wrong_guesses_lock_the_record() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), Some(3)))
        .await
        .unwrap();

    match h.service.verify(NS, ID, "000000", true).await {
        Err(DomainError::IncorrectOtp(info)) => {
            assert_eq!(info.attempts, 2);
            assert_eq!(info.max_attempts, 3);
        }
        other => panic!("expected IncorrectOtp, got {:?}", other),
    }

    // Reaching max_attempts locks on the same call.
    match h.service.verify(NS, ID, "000000", true).await {
        Err(DomainError::TooManyAttempts(info)) => assert_eq!(info.attempts, 3),
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }

    // Even the right answer is refused now.
    assert!(matches!(
        h.service.verify(NS, ID, "123456", true).await,
        Err(DomainError::TooManyAttempts(_))
    ));
}

#[tokio::test]
async fn test_issue_does_not_reset_locked_record() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), Some(2)))
        .await
        .unwrap();
    let _ = h.service.verify(NS, ID, "000000", true).await;

    let err = h
        .service
        .issue(NS, request(Some("alice@example.com"), Some("999999"), Some(2)))
        .await
        .unwrap_err();

    match err {
        DomainError::TooManyAttempts(info) => {
            assert_eq!(info.attempts, 2);
            assert_eq!(info.max_attempts, 2);
            assert!(info.ttl_seconds > 0.0);
        }
        other => panic!("expected TooManyAttempts, got {:?}", other),
    }

    let stored = h.service.peek(NS, ID).await.unwrap();
    assert_eq!(stored.otp, "123456");
    assert_eq!(stored.attempts, 2);
    assert_eq!(h.provider.sent_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reissue_racing_the_locking_guess_never_unlocks() {
    for round in 0..50 {
        let h = setup();
        let id = format!("race{:04}", round);
        let mut req = request(Some("alice@example.com"), Some("123456"), Some(5));
        req.id = Some(id.clone());
        h.service.issue(NS, req.clone()).await.unwrap();
        for _ in 0..3 {
            let _ = h.service.verify(NS, &id, "000000", false).await;
        }

        // attempts is 4 of 5: the next guess locks the record.
        let verify = {
            let service = h.service.clone();
            let id = id.clone();
            tokio::spawn(async move { service.verify(NS, &id, "000000", false).await })
        };
        let issue = {
            let service = h.service.clone();
            tokio::spawn(async move { service.issue(NS, req).await })
        };
        let verify = verify.await.unwrap();
        let issue = issue.await.unwrap();

        if matches!(verify, Err(DomainError::TooManyAttempts(_))) {
            assert!(matches!(issue, Err(DomainError::TooManyAttempts(_))));
            assert!(h.service.peek(NS, &id).await.unwrap().is_locked());
        }
    }
}

#[tokio::test]
async fn test_reissue_of_unlocked_record_starts_fresh() {
    let h = setup();
    h.service
        .issue(NS, request(None, Some("123456"), Some(5)))
        .await
        .unwrap();
    let _ = h.service.verify(NS, ID, "000000", true).await;

    let issued = h
        .service
        .issue(NS, request(None, Some("654321"), Some(5)))
        .await
        .unwrap();

    assert_eq!(issued.otp.attempts, 1);
    assert_eq!(issued.otp.otp, "654321");
}

#[tokio::test]
async fn test_verify_success_deletes_record() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), None))
        .await
        .unwrap();

    let out = h.service.verify(NS, ID, "123456", true).await.unwrap();
    assert!(out.closed);

    assert_eq!(
        h.service.check_status(NS, ID, false).await.unwrap_err(),
        DomainError::NotExist
    );
}

#[tokio::test]
async fn test_verify_skip_delete_keeps_closed_record() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), None))
        .await
        .unwrap();

    assert_eq!(
        h.service.check_status(NS, ID, false).await.unwrap_err(),
        DomainError::NotVerified
    );

    h.service.verify(NS, ID, "123456", false).await.unwrap();

    assert!(h.service.closed_status(NS, ID).await.unwrap());
    assert!(h.service.check_status(NS, ID, false).await.unwrap().closed);
    // Delete-on-read succeeds once.
    assert!(h.service.check_status(NS, ID, true).await.is_ok());
    assert_eq!(
        h.service.check_status(NS, ID, true).await.unwrap_err(),
        DomainError::NotExist
    );
}

#[tokio::test]
async fn test_verify_after_close_consumes_attempt_and_stays_closed() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), Some(5)))
        .await
        .unwrap();
    h.service.verify(NS, ID, "123456", false).await.unwrap();

    let again = h.service.verify(NS, ID, "123456", false).await.unwrap();
    assert!(again.closed);
    assert_eq!(again.attempts, 3);

    assert!(matches!(
        h.service.verify(NS, ID, "000000", false).await,
        Err(DomainError::IncorrectOtp(_))
    ));
    let stored = h.service.peek(NS, ID).await.unwrap();
    assert!(stored.closed);
    assert_eq!(stored.attempts, 4);
}

#[tokio::test]
async fn test_verify_input_checks() {
    let h = setup();

    assert!(matches!(
        h.service.verify(NS, "abc", "123456", true).await,
        Err(DomainError::InvalidInput { .. })
    ));
    assert!(matches!(
        h.service.verify(NS, ID, "", true).await,
        Err(DomainError::InvalidInput { .. })
    ));
    assert_eq!(
        h.service.verify(NS, ID, "123456", true).await.unwrap_err(),
        DomainError::NotExist
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_guesses_are_all_counted() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), Some(1000)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let service = h.service.clone();
            tokio::spawn(async move { service.verify(NS, ID, "000000", true).await })
        })
        .collect();

    for handle in handles {
        assert!(matches!(
            handle.await.unwrap(),
            Err(DomainError::IncorrectOtp(_))
        ));
    }

    assert_eq!(h.service.peek(NS, ID).await.unwrap().attempts, 21);
}

#[tokio::test(start_paused = true)]
async fn test_record_expires_after_ttl() {
    let h = setup();
    let mut req = request(None, Some("123456"), Some(1));
    req.ttl = Some(2);
    h.service.issue(NS, req).await.unwrap();

    // Locked from the start (attempts == max_attempts == 1).
    assert!(matches!(
        h.service.verify(NS, ID, "123456", true).await,
        Err(DomainError::TooManyAttempts(_))
    ));

    tokio::time::advance(Duration::from_secs(2)).await;

    assert_eq!(
        h.service.verify(NS, ID, "123456", true).await.unwrap_err(),
        DomainError::NotExist
    );
    // Once expired the key can be issued again.
    assert!(h.service.issue(NS, request(None, None, None)).await.is_ok());
}

#[tokio::test]
async fn test_set_address_pushes_exactly_once() {
    let h = setup();
    h.service
        .issue(NS, request(None, Some("123456"), None))
        .await
        .unwrap();

    let first = h
        .service
        .set_address(NS, ID, "alice@example.com")
        .await
        .unwrap();
    assert!(matches!(first, AddressOutcome::Delivered(_)));
    assert_eq!(first.otp().to, "alice@example.com");
    assert_eq!(h.provider.sent_count(), 1);

    let second = h
        .service
        .set_address(NS, ID, "mallory@example.com")
        .await
        .unwrap();
    assert!(matches!(second, AddressOutcome::Unchanged(_)));
    assert_eq!(second.otp().to, "alice@example.com");
    assert_eq!(h.provider.sent_count(), 1);

    // Attempts are untouched by address collection.
    assert_eq!(h.service.peek(NS, ID).await.unwrap().attempts, 1);
}

#[tokio::test]
async fn test_set_address_validates_with_provider() {
    let h = setup();
    h.service.issue(NS, request(None, None, None)).await.unwrap();

    assert!(matches!(
        h.service.set_address(NS, ID, "not-an-email").await,
        Err(DomainError::InvalidAddress(_))
    ));
    let too_long = format!("{}@example.com", "a".repeat(100));
    assert!(matches!(
        h.service.set_address(NS, ID, &too_long).await,
        Err(DomainError::InvalidAddress(_))
    ));
    assert_eq!(h.provider.sent_count(), 0);
}

#[tokio::test]
async fn test_resend_consumes_attempt_and_pushes() {
    let h = setup();
    h.service
        .issue(NS, request(Some("alice@example.com"), Some("123456"), Some(3)))
        .await
        .unwrap();

    let out = h.service.resend(NS, ID).await.unwrap();
    assert_eq!(out.attempts, 2);
    assert_eq!(h.provider.sent_count(), 2);

    assert!(matches!(
        h.service.resend(NS, ID).await,
        Err(DomainError::TooManyAttempts(_))
    ));
    assert_eq!(h.provider.sent_count(), 2);
}

#[tokio::test]
async fn test_provider_ids_and_health() {
    let h = setup();

    assert_eq!(h.service.provider_ids(), vec!["mock".to_string()]);
    assert!(h.service.health().await.is_ok());
}
