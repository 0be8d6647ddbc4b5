//! Integration tests for the push delivery pipeline against relay stubs.
//!
//! A wiremock server plays the browser push relay; subscriptions are
//! generated the way a real browser would hold them (fresh P-256 keypair
//! plus 16-byte auth secret), so the full encrypt → sign → dispatch path
//! runs end to end.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::SecretKey;
use rand::RngCore;
use std::time::Duration;

use shuttlebus::{DeliveryOutcome, PushSubscription, VapidKeys, VapidSigner, WebPushClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// An endpoint nothing listens on; connections are refused immediately.
const DEAD_ENDPOINT: &str = "http://127.0.0.1:1/push";

fn test_client() -> WebPushClient {
    let keys = VapidKeys::generate().expect("generate keys");
    let signer = VapidSigner::load(
        keys.private_key_pem(),
        keys.public_key_base64url(),
        "mailto:admin@schoolbus.com",
    )
    .expect("load signer");
    WebPushClient::new(signer, 86_400)
}

/// A subscription as a browser would produce it for `endpoint`.
fn test_subscription(endpoint: String) -> PushSubscription {
    let secret = SecretKey::random(&mut OsRng);
    let public = secret.public_key().to_encoded_point(false);
    let mut auth = [0u8; 16];
    rand::rng().fill_bytes(&mut auth);
    PushSubscription::new(
        endpoint,
        BASE64URL.encode(public.as_bytes()),
        BASE64URL.encode(auth),
    )
}

async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_dispatch_classifies_relay_responses() {
    let server = MockServer::start().await;
    mount_status(&server, "/push/ok", 200).await;
    mount_status(&server, "/push/created", 201).await;
    mount_status(&server, "/push/gone", 410).await;
    mount_status(&server, "/push/missing", 404).await;
    mount_status(&server, "/push/error", 500).await;

    let client = test_client();
    for (route, expected) in [
        ("/push/ok", DeliveryOutcome::Delivered),
        ("/push/created", DeliveryOutcome::Delivered),
        ("/push/gone", DeliveryOutcome::Gone),
        ("/push/missing", DeliveryOutcome::Gone),
        ("/push/error", DeliveryOutcome::TransientFailure),
    ] {
        let outcome = client
            .dispatch(&format!("{}{route}", server.uri()), b"blob".to_vec(), "token")
            .await;
        assert_eq!(outcome, expected, "status mapping for {route}");
    }
}

#[tokio::test]
async fn test_dispatch_connection_error_is_transient() {
    let client = test_client();
    let outcome = client.dispatch(DEAD_ENDPOINT, b"blob".to_vec(), "token").await;
    assert_eq!(outcome, DeliveryOutcome::TransientFailure);
}

#[tokio::test]
async fn test_dispatch_timeout_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = test_client().with_request_timeout(Duration::from_millis(50));
    let outcome = client
        .dispatch(&format!("{}/push/slow", server.uri()), b"blob".to_vec(), "token")
        .await;
    assert_eq!(outcome, DeliveryOutcome::TransientFailure);
}

#[tokio::test]
async fn test_broadcast_mixed_outcomes() {
    let server = MockServer::start().await;
    mount_status(&server, "/push/ok", 200).await;
    mount_status(&server, "/push/gone", 410).await;

    let subscriptions = vec![
        test_subscription(format!("{}/push/ok", server.uri())),
        test_subscription(format!("{}/push/gone", server.uri())),
        test_subscription(DEAD_ENDPOINT.to_string()),
    ];

    let client = test_client();
    let summary = client
        .broadcast(&subscriptions, "Route Open", "Seats available", None)
        .await
        .expect("broadcast");

    assert_eq!(summary.delivered_count, 1);
    assert_eq!(summary.failed_count, 2);
    assert_eq!(summary.stale_indices, vec![1]);
}

#[tokio::test]
async fn test_broadcast_empty_list_is_zero_summary() {
    let client = test_client();
    let summary = client.broadcast(&[], "t", "b", None).await.expect("broadcast");
    assert_eq!(summary.delivered_count, 0);
    assert_eq!(summary.failed_count, 0);
    assert!(summary.stale_indices.is_empty());
}

#[tokio::test]
async fn test_broadcast_without_signer_fails_before_network() {
    let server = MockServer::start().await;
    mount_status(&server, "/push/ok", 200).await;
    let subscriptions = vec![test_subscription(format!("{}/push/ok", server.uri()))];

    let client = WebPushClient::new(VapidSigner::disabled("", "mailto:a@b.c"), 86_400);
    let err = client
        .broadcast(&subscriptions, "t", "b", None)
        .await
        .unwrap_err();
    assert!(matches!(err, shuttlebus::PushError::Signing(_)));

    let requests = server.received_requests().await.expect("requests recorded");
    assert!(requests.is_empty(), "no network call was made");
}

#[tokio::test]
async fn test_broadcast_skips_malformed_subscription_without_network_call() {
    let server = MockServer::start().await;
    mount_status(&server, "/push/ok", 200).await;

    let malformed = PushSubscription::new(
        format!("{}/push/ok", server.uri()),
        "not!base64url!".to_string(),
        "AAAAAAAAAAAAAAAAAAAAAA".to_string(),
    );

    let client = test_client();
    let summary = client
        .broadcast(&[malformed], "t", "b", None)
        .await
        .expect("broadcast");

    assert_eq!(summary.delivered_count, 0);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.stale_indices, vec![0]);

    let requests = server.received_requests().await.expect("requests recorded");
    assert!(requests.is_empty(), "malformed subscription never hit the relay");
}

#[tokio::test]
async fn test_end_to_end_request_shape() {
    let server = MockServer::start().await;
    mount_status(&server, "/push/sub-1", 201).await;

    let subscriptions = vec![test_subscription(format!("{}/push/sub-1", server.uri()))];
    let client = test_client();
    let summary = client
        .broadcast(&subscriptions, "Route Open", "Seats available", None)
        .await
        .expect("broadcast");
    assert_eq!(summary.delivered_count, 1);

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1, "exactly one outbound POST");
    let request = &requests[0];

    let authorization = request
        .headers
        .get("Authorization")
        .expect("authorization header")
        .to_str()
        .expect("ascii header");
    assert!(authorization.starts_with("vapid t="));
    assert!(authorization.contains(", k="));

    assert_eq!(
        request
            .headers
            .get("Content-Encoding")
            .expect("content-encoding header"),
        "aes128gcm"
    );
    assert_eq!(
        request.headers.get("Content-Type").expect("content-type header"),
        "application/octet-stream"
    );
    assert_eq!(request.headers.get("TTL").expect("ttl header"), "86400");

    // AEAD tag, padding, and the 86-byte header make the body strictly
    // larger than the plaintext payload
    let plaintext_len =
        serde_json::to_vec(&shuttlebus::NotificationPayload::new("Route Open", "Seats available", None))
            .expect("serialize payload")
            .len();
    assert!(request.body.len() > plaintext_len);
}
