//! HTTP API integration tests
//!
//! Tests drive `build_router` with `oneshot`, mostly over an in-memory
//! database. Mutations use `?wait=true` unless the test is about the
//! optimistic `202` path.

mod common;

use axum::http::StatusCode;
use common::{
    app_with_classifier, call, file_test_app, sign_up, test_app, StubClassifier, PHOTO,
};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_health_and_buildinfo() {
    let app = test_app().await;

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "ww-market");
    assert_eq!(body["classifier"], false);

    let (status, body) = call(&app, "GET", "/api/buildinfo", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
}

#[tokio::test]
async fn test_device_collection_end_to_end() {
    let app = test_app().await;
    let (seller, seller_id) = sign_up(&app, "seller@example.com").await;
    let (partner, partner_id) = sign_up(&app, "partner@example.com").await;

    // Seller submits
    let (status, device) = call(
        &app,
        "POST",
        "/api/devices?wait=true",
        Some(&seller),
        Some(json!({ "photoDataUri": PHOTO, "deviceDetails": "iPhone 12, cracked screen" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", device);
    assert_eq!(device["status"], "pending");
    assert_eq!(device["userId"], seller_id.as_str());
    let device_id = device["id"].as_str().unwrap().to_string();

    // Listed for partners as pending
    let (status, available) =
        call(&app, "GET", "/api/collections/available", Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK);
    let available = available.as_array().unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0]["id"], device_id.as_str());
    assert_eq!(available[0]["deviceDetails"], "iPhone 12, cracked screen");

    // Partner accepts
    let (status, accepted) = call(
        &app,
        "POST",
        "/api/collections?wait=true",
        Some(&partner),
        Some(json!({ "userId": seller_id, "deviceId": device_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", accepted);
    assert_eq!(accepted["request"]["status"], "accepted");
    assert_eq!(accepted["request"]["deviceId"], device_id.as_str());
    assert_eq!(accepted["request"]["deliveryPartnerId"], partner_id.as_str());
    assert_eq!(accepted["request"]["paymentAmount"], 500.0);
    assert_eq!(accepted["device"]["status"], "collection-in-progress");
    assert_eq!(accepted["transaction"]["transactionType"], "service-fee");
    let request_id = accepted["request"]["id"].as_str().unwrap().to_string();

    // No longer available; appears in the partner's collections
    let (_, available) =
        call(&app, "GET", "/api/collections/available", Some(&partner), None).await;
    assert!(available.as_array().unwrap().is_empty());

    let (status, mine) = call(&app, "GET", "/api/collections/mine", Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK);
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], request_id.as_str());
    assert_eq!(mine[0]["status"], "accepted");
    assert_eq!(mine[0]["device"]["status"], "collection-in-progress");

    // Collected
    let uri = format!("/api/collections/{}/collected?wait=true", request_id);
    let (status, collected) = call(&app, "POST", &uri, Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK, "{}", collected);
    assert_eq!(collected["status"], "collected");

    let (_, mine) = call(&app, "GET", "/api/collections/mine", Some(&partner), None).await;
    assert_eq!(mine[0]["status"], "collected");
    assert_eq!(mine[0]["device"]["status"], "collected");

    // The open-work view only lists requests still to be collected
    let (_, open) = call(
        &app,
        "GET",
        "/api/collections/mine?status=accepted",
        Some(&partner),
        None,
    )
    .await;
    assert!(open.as_array().unwrap().is_empty());
    let (_, done) = call(
        &app,
        "GET",
        "/api/collections/mine?status=collected",
        Some(&partner),
        None,
    )
    .await;
    assert_eq!(done.as_array().unwrap().len(), 1);

    let (_, devices) = call(&app, "GET", "/api/devices", Some(&seller), None).await;
    assert_eq!(devices[0]["status"], "collected");

    // Collecting twice is rejected
    let (status, _) = call(&app, "POST", &uri, Some(&partner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // One ledger entry for the service fee
    let (_, ledger) = call(&app, "GET", "/api/transactions", Some(&partner), None).await;
    let ledger = ledger.as_array().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["amount"], 20.0);
    assert_eq!(ledger[0]["collectionRequestId"], request_id.as_str());
}

#[tokio::test]
async fn test_part_sale_and_delivery_end_to_end() {
    let app = test_app().await;
    let (agency, _) = sign_up(&app, "agency@example.com").await;
    let (buyer, buyer_id) = sign_up(&app, "buyer@example.com").await;
    let (partner, partner_id) = sign_up(&app, "partner@example.com").await;
    let (other_partner, _) = sign_up(&app, "other@example.com").await;

    let (status, part) = call(
        &app,
        "POST",
        "/api/parts?wait=true",
        Some(&agency),
        Some(json!({ "photoDataUri": PHOTO, "name": "iPhone 11 Screen", "price": 45.99 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", part);
    assert_eq!(part["details"], "iPhone 11 Screen");
    assert!(part["qrCode"].as_str().unwrap().starts_with("QR_CODE_FOR_"));
    let part_id = part["id"].as_str().unwrap().to_string();

    // Browsing needs no session
    let (status, found) = call(&app, "GET", "/api/parts?q=SCREEN", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, found) = call(&app, "GET", "/api/parts?q=battery", None, None).await;
    assert!(found.as_array().unwrap().is_empty());

    let uri = format!("/api/parts/{}/payment-request", part_id);
    let (status, payment) = call(&app, "GET", &uri, Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    let upi = payment["uri"].as_str().unwrap();
    assert!(upi.starts_with("upi://pay?pa=wastewise%40upi"));
    assert!(upi.contains("am=45.99"));
    assert!(upi.contains("cu=INR"));

    // Purchase
    let uri = format!("/api/parts/{}/purchase?wait=true", part_id);
    let (status, sale) = call(&app, "POST", &uri, Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK, "{}", sale);
    assert_eq!(sale["status"], "purchased");
    assert_eq!(sale["buyerId"], buyer_id.as_str());
    assert!(sale["deliveryPartnerId"].is_null());
    let commission = sale["commissionAmount"].as_f64().unwrap();
    assert!((commission - 4.599).abs() < 1e-9);
    let sale_id = sale["id"].as_str().unwrap().to_string();

    let (_, available) =
        call(&app, "GET", "/api/deliveries/available", Some(&partner), None).await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    // Accept delivery
    let accept = format!("/api/deliveries/{}/accept?wait=true", sale_id);
    let (status, sale) = call(&app, "POST", &accept, Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK, "{}", sale);
    assert_eq!(sale["status"], "out-for-delivery");
    assert_eq!(sale["deliveryPartnerId"], partner_id.as_str());

    // A second accept is rejected and the sale is no longer listed
    let (status, body) = call(&app, "POST", &accept, Some(&other_partner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
    let (_, available) =
        call(&app, "GET", "/api/deliveries/available", Some(&partner), None).await;
    assert!(available.as_array().unwrap().is_empty());

    // Only the assigned partner can deliver
    let delivered = format!("/api/deliveries/{}/delivered?wait=true", sale_id);
    let (status, _) = call(&app, "POST", &delivered, Some(&other_partner), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, sale) = call(&app, "POST", &delivered, Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["status"], "delivered");

    let (_, mine) = call(&app, "GET", "/api/deliveries/mine", Some(&partner), None).await;
    assert_eq!(mine[0]["status"], "delivered");
    let (_, purchases) = call(&app, "GET", "/api/purchases", Some(&buyer), None).await;
    assert_eq!(purchases[0]["status"], "delivered");
}

#[tokio::test]
async fn test_optimistic_response_is_accepted_then_lands() {
    let app = test_app().await;
    let (seller, _) = sign_up(&app, "seller@example.com").await;

    let (status, device) = call(
        &app,
        "POST",
        "/api/devices",
        Some(&seller),
        Some(json!({ "photoDataUri": PHOTO, "deviceDetails": "Pixel 4a" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(device["status"], "pending");

    let mut landed = false;
    for _ in 0..50 {
        let (_, devices) = call(&app, "GET", "/api/devices", Some(&seller), None).await;
        if devices.as_array().map_or(false, |d| d.len() == 1) {
            assert_eq!(devices[0]["id"], device["id"]);
            landed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(landed, "optimistic write never reached the store");
}

#[tokio::test]
async fn test_authentication_required() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/devices",
        None,
        Some(json!({ "photoDataUri": PHOTO, "deviceDetails": "iPhone 12" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, "GET", "/api/devices", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/api/devices", Some("not-a-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Nothing was written
    let (token, _) = sign_up(&app, "seller@example.com").await;
    let (_, available) =
        call(&app, "GET", "/api/collections/available", Some(&token), None).await;
    assert!(available.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_in_and_sign_out() {
    let app = test_app().await;
    sign_up(&app, "buyer@example.com").await;

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/signin",
        None,
        Some(json!({ "email": "buyer@example.com", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, session) = call(
        &app,
        "POST",
        "/api/auth/signin",
        None,
        Some(json!({ "email": "buyer@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = session["token"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "POST", "/api/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", "/api/purchases", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "email": "buyer@example.com", "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_validation_errors() {
    let app = test_app().await;
    let (token, seller_id) = sign_up(&app, "seller@example.com").await;

    // Missing photo
    let (status, _) = call(
        &app,
        "POST",
        "/api/devices",
        Some(&token),
        Some(json!({ "deviceDetails": "iPhone 12" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Not an image
    let (status, _) = call(
        &app,
        "POST",
        "/api/devices",
        Some(&token),
        Some(json!({ "photoDataUri": "data:text/plain;base64,aGVsbG8=", "deviceDetails": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Non-positive price
    let (status, _) = call(
        &app,
        "POST",
        "/api/parts",
        Some(&token),
        Some(json!({ "photoDataUri": PHOTO, "name": "Battery", "price": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown references
    let (status, _) = call(
        &app,
        "POST",
        "/api/collections",
        Some(&token),
        Some(json!({ "userId": seller_id, "deviceId": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/api/parts/missing/purchase", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", "/api/deliveries/missing/accept", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_classification_disabled_without_key() {
    let app = test_app().await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/classify/waste",
        None,
        Some(json!({ "photoDataUri": PHOTO })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "UNAVAILABLE");
}

#[tokio::test]
async fn test_waste_classification_includes_info() {
    let app = app_with_classifier(StubClassifier::identifying("PET plastic bottle", 0.92)).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/classify/waste",
        None,
        Some(json!({ "photoDataUri": PHOTO })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["wasteType"], "PET plastic bottle");
    assert_eq!(body["confidence"], 0.92);
    assert_eq!(body["info"]["category"], "plastic");
    assert_eq!(body["info"]["type"], "Plastic");

    let (status, _) = call(
        &app,
        "POST",
        "/api/classify/waste",
        None,
        Some(json!({ "photoDataUri": "not a data uri" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_classifier_failure_is_bad_gateway() {
    let app = app_with_classifier(StubClassifier::failing("connection reset")).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/classify/waste",
        None,
        Some(json!({ "photoDataUri": PHOTO })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]["message"].as_str().unwrap().contains("try again"));
}

#[tokio::test]
async fn test_circuit_analysis() {
    let app = app_with_classifier(StubClassifier::identifying("glass", 0.5)).await;
    let (status, body) = call(
        &app,
        "POST",
        "/api/classify/circuit",
        None,
        Some(json!({ "photoDataUri": PHOTO })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let components = body["components"].as_array().unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0]["componentName"], "Capacitor");
    assert_eq!(components[0]["boundingBox"]["width"], 5.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_collection_flow_on_file_database() {
    let (app, _temp) = file_test_app().await;
    let (seller, seller_id) = sign_up(&app, "seller@example.com").await;
    let (partner, _) = sign_up(&app, "partner@example.com").await;

    for round in 0..10 {
        let (status, device) = call(
            &app,
            "POST",
            "/api/devices?wait=true",
            Some(&seller),
            Some(json!({ "photoDataUri": PHOTO, "deviceDetails": format!("Phone {}", round) })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", device);
        let device_id = device["id"].as_str().unwrap().to_string();

        // Request, ledger entry and device status land together
        let (status, accepted) = call(
            &app,
            "POST",
            "/api/collections?wait=true",
            Some(&partner),
            Some(json!({ "userId": seller_id, "deviceId": device_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "round {}: {}", round, accepted);
        let request_id = accepted["request"]["id"].as_str().unwrap().to_string();

        let uri = format!("/api/collections/{}/collected?wait=true", request_id);
        let (status, collected) = call(&app, "POST", &uri, Some(&partner), None).await;
        assert_eq!(status, StatusCode::OK, "round {}: {}", round, collected);
    }

    let (_, mine) = call(&app, "GET", "/api/collections/mine", Some(&partner), None).await;
    let mine = mine.as_array().unwrap();
    assert_eq!(mine.len(), 10);
    assert!(mine
        .iter()
        .all(|c| c["status"] == "collected" && c["device"]["status"] == "collected"));

    let (_, ledger) = call(&app, "GET", "/api/transactions", Some(&partner), None).await;
    assert_eq!(ledger.as_array().unwrap().len(), 10);
}
