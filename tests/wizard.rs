//! End-to-end check-in flows through `CheckInWizard` against a wiremock backend.

use std::io::Write;
use std::time::Duration;

use kiosk_checkin::models::{EmergencyContact, Role, ScreenState, ValidationStatus, VisitorRecord};
use kiosk_checkin::processing::FileOcrEngine;
use kiosk_checkin::session::{IdField, TimerKind};
use kiosk_checkin::{CheckInError, CheckInWizard, KioskConfig};
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(base_url: String) -> KioskConfig {
    KioskConfig {
        api_base_url: base_url,
        client_id: "17".to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

fn wizard_for(server: &MockServer) -> CheckInWizard {
    CheckInWizard::new(&config_for(format!("{}/api", server.uri())))
        .expect("wizard construction should not fail")
}

async fn mount_json(server: &MockServer, verb: &str, route: &str, body: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Walks a new visitor from the welcome screen through the details form.
async fn reach_details(wizard: &mut CheckInWizard, server: &MockServer, fields: serde_json::Value) {
    mount_json(server, "POST", "/api/visitor/checkPreRegistered", serde_json::json!({"success": false})).await;
    mount_json(server, "GET", "/api/visitor/visibleFields", serde_json::json!({"fields": fields})).await;

    assert_eq!(wizard.enter().unwrap(), ScreenState::CheckIn);
    assert_eq!(
        wizard.check_in("ana@example.com").await.expect("check-in should succeed"),
        ScreenState::VisitorDetails
    );
}

fn id_text_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".txt")
        .tempfile()
        .expect("temp file");
    writeln!(file, "REPUBLIC IDENTITY CARD").unwrap();
    writeln!(file, "Name: Ana Lima").unwrap();
    writeln!(file, "DOB: 1990-04-12").unwrap();
    writeln!(file, "Gender: F").unwrap();
    writeln!(file, "ID No: X1234567").unwrap();
    file
}

#[tokio::test]
async fn full_check_in_follows_capabilities_to_success() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);

    reach_details(
        &mut wizard,
        &server,
        serde_json::json!(["full_name", "visitor", "client", "emergency_name", "emergency_phone"]),
    )
    .await;

    mount_json(
        &server,
        "POST",
        "/api/visitor/store-checkin",
        serde_json::json!({
            "success": true,
            "visitor": {"id": 41},
            "visibleFields": ["select_role", "capture_id", "emergency_contact"]
        }),
    )
    .await;
    let details = VisitorRecord {
        full_name: Some("Ana Lima".to_string()),
        company: Some("Acme".to_string()),
        ..Default::default()
    };
    assert_eq!(wizard.submit_details(&details).await.unwrap(), ScreenState::SelectRole);
    assert_eq!(wizard.session().visitor_id().unwrap(), 41);
    assert_eq!(wizard.offered_roles(), vec![Role::Visitor, Role::Client]);

    mount_json(&server, "POST", "/api/visitor/set-role", serde_json::json!({"success": true})).await;
    assert_eq!(wizard.select_role(Role::Visitor).await.unwrap(), ScreenState::CaptureId);

    let file = id_text_file();
    let report = wizard.capture_id(&FileOcrEngine, file.path()).expect("capture should parse");
    assert_eq!(report.status, ValidationStatus::Good);
    assert_eq!(wizard.session().extracted().identification_number, "X1234567");

    wizard.edit_id_field(IdField::FullName, "Ana Maria Lima").unwrap();

    Mock::given(method("POST"))
        .and(path("/api/visitor/storeAppIdCapturedImage"))
        .and(body_string_contains("Ana Maria Lima"))
        .and(body_string_contains("X1234567"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "photo_url": "https://cdn.example.com/ids/41.jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;
    assert_eq!(wizard.confirm_id(vec![0xFF, 0xD8]).await.unwrap(), ScreenState::EmergencyContact);
    assert_eq!(wizard.session().visitor().full_name.as_deref(), Some("Ana Maria Lima"));
    assert_eq!(
        wizard.session().visitor().id_photo_url.as_deref(),
        Some("https://cdn.example.com/ids/41.jpg")
    );
    assert!(!wizard.session().is_uploading());

    // Relation is not a visible field for this tenant and is not sent
    Mock::given(method("POST"))
        .and(path("/api/visitor/appEmergencyContact"))
        .and(body_json(serde_json::json!({
            "visitor_id": 41,
            "emergency_name": "Rui Lima",
            "emergency_phone": "+351 900 000 000"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;
    let contact = EmergencyContact {
        name: "Rui Lima".to_string(),
        phone: "+351 900 000 000".to_string(),
        relation: "Brother".to_string(),
    };
    assert_eq!(wizard.submit_emergency_contact(&contact).await.unwrap(), ScreenState::Agreement);

    mount_json(&server, "POST", "/api/visitor/appPrivacyAgreement", serde_json::json!({"success": true})).await;
    assert_eq!(wizard.agree(true).await.unwrap(), ScreenState::Success);
    assert_eq!(wizard.session().visitor().privacy_policy_agreement, Some(true));

    // The success screen returns home on its own
    tokio::time::pause();
    let event = wizard.next_timer_event().await.expect("timer event");
    assert_eq!(event.kind, TimerKind::SuccessDisplay);
    assert_eq!(wizard.handle_timer(event), ScreenState::Welcome);
    assert_eq!(wizard.session().visitor().id, None);
}

#[tokio::test]
async fn empty_capabilities_go_straight_to_agreement() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);
    reach_details(&mut wizard, &server, serde_json::json!(["full_name"])).await;

    mount_json(
        &server,
        "POST",
        "/api/visitor/store-checkin",
        serde_json::json!({"visitor": {"id": 7}, "visibleFields": []}),
    )
    .await;
    let details = VisitorRecord {
        full_name: Some("Bo Chen".to_string()),
        ..Default::default()
    };
    assert_eq!(wizard.submit_details(&details).await.unwrap(), ScreenState::Agreement);
}

#[tokio::test]
async fn backend_failure_leaves_the_screen_unchanged() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);

    Mock::given(method("POST"))
        .and(path("/api/visitor/checkPreRegistered"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "Server down"})))
        .mount(&server)
        .await;

    wizard.enter().unwrap();
    let err = wizard.check_in("ana@example.com").await.expect_err("should fail");

    assert!(matches!(err, CheckInError::NetworkFailure(_)));
    assert_eq!(wizard.state(), ScreenState::CheckIn);
    assert!(wizard.session().visible_fields().is_empty());
    assert_eq!(wizard.session().visitor().email, None);
}

#[tokio::test]
async fn missing_required_field_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    wizard.enter().unwrap();
    let err = wizard.check_in("   ").await.expect_err("email is required");
    assert!(matches!(err, CheckInError::MissingField(_)));
    assert_eq!(wizard.state(), ScreenState::CheckIn);
}

#[tokio::test]
async fn refused_agreement_keeps_visitor_on_agreement() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);
    reach_details(&mut wizard, &server, serde_json::json!(["full_name"])).await;

    mount_json(
        &server,
        "POST",
        "/api/visitor/store-checkin",
        serde_json::json!({"visitor": {"id": 9}, "visibleFields": []}),
    )
    .await;
    let details = VisitorRecord {
        full_name: Some("Bo Chen".to_string()),
        ..Default::default()
    };
    wizard.submit_details(&details).await.unwrap();

    let err = wizard.agree(false).await.expect_err("must accept the policy");
    assert!(matches!(err, CheckInError::MissingField(_)));

    mount_json(
        &server,
        "POST",
        "/api/visitor/appPrivacyAgreement",
        serde_json::json!({"success": false, "message": "Host unavailable"}),
    )
    .await;
    match wizard.agree(true).await {
        Err(CheckInError::NetworkFailure(message)) => assert!(message.contains("Host unavailable")),
        other => panic!("expected NetworkFailure, got {:?}", other.map(|s| s.to_string())),
    }
    assert_eq!(wizard.state(), ScreenState::Agreement);
}

#[tokio::test]
async fn handlers_reject_the_wrong_screen() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);

    let err = wizard.select_role(Role::Client).await.expect_err("not on select role");
    assert!(matches!(
        err,
        CheckInError::UnexpectedScreen {
            expected: ScreenState::SelectRole,
            actual: ScreenState::Welcome
        }
    ));
}

#[tokio::test]
async fn abandoned_id_upload_releases_the_capture_lock() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);
    reach_details(&mut wizard, &server, serde_json::json!(["full_name"])).await;

    mount_json(
        &server,
        "POST",
        "/api/visitor/store-checkin",
        serde_json::json!({"visitor": {"id": 41}, "visibleFields": ["capture_id"]}),
    )
    .await;
    let details = VisitorRecord {
        full_name: Some("Ana Lima".to_string()),
        ..Default::default()
    };
    assert_eq!(wizard.submit_details(&details).await.unwrap(), ScreenState::CaptureId);

    let file = id_text_file();
    wizard.capture_id(&FileOcrEngine, file.path()).expect("first capture");

    Mock::given(method("POST"))
        .and(path("/api/visitor/storeAppIdCapturedImage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"success": true}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let outcome = tokio::time::timeout(Duration::from_millis(200), wizard.confirm_id(vec![0xFF, 0xD8])).await;
    assert!(outcome.is_err(), "upload should still be in flight");

    assert!(!wizard.session().is_uploading());
    assert_eq!(wizard.state(), ScreenState::CaptureId);
    let report = wizard.capture_id(&FileOcrEngine, file.path()).expect("capture after abandoned upload");
    assert_eq!(report.status, ValidationStatus::Good);
}

#[tokio::test]
async fn bad_id_capture_does_not_block_confirmation() {
    let server = MockServer::start().await;
    let mut wizard = wizard_for(&server);
    reach_details(&mut wizard, &server, serde_json::json!(["full_name"])).await;

    mount_json(
        &server,
        "POST",
        "/api/visitor/store-checkin",
        serde_json::json!({"visitor": {"id": 52}, "visibleFields": ["capture_id"]}),
    )
    .await;
    let details = VisitorRecord {
        full_name: Some("Bo Chen".to_string()),
        ..Default::default()
    };
    wizard.submit_details(&details).await.unwrap();

    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().expect("temp file");
    writeln!(file, "DRIVER LICENCE").unwrap();
    writeln!(file, "DOB: 1985-11-02").unwrap();
    let report = wizard.capture_id(&FileOcrEngine, file.path()).expect("capture should parse");
    assert_eq!(report.status, ValidationStatus::Bad);

    mount_json(&server, "POST", "/api/visitor/storeAppIdCapturedImage", serde_json::json!({"success": true})).await;
    assert_eq!(wizard.confirm_id(vec![0xFF, 0xD8]).await.unwrap(), ScreenState::Agreement);
    assert_eq!(wizard.session().visitor().full_name.as_deref(), Some("Bo Chen"));
}

#[tokio::test]
async fn employee_picker_follows_visible_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/visitor/selctAppEmployee/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "employees": [{"id": 3, "name": "Dana Cole", "position": "HR"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut hidden = wizard_for(&server);
    reach_details(&mut hidden, &server, serde_json::json!(["full_name"])).await;
    assert!(hidden.employees_to_visit().await.unwrap().is_empty());

    let mut shown = wizard_for(&server);
    shown.enter().unwrap();
    Mock::given(method("GET"))
        .and(path("/api/visitor/visibleFields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "fields": ["full_name", "employee_to_visit"]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    shown.check_in("bo@example.com").await.unwrap();

    let employees = shown.employees_to_visit().await.unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].id, 3);
}

#[tokio::test(start_paused = true)]
async fn idle_visitor_is_sent_home() {
    let mut wizard = CheckInWizard::new(&config_for("http://127.0.0.1:9/api".to_string())).unwrap();
    wizard.enter().unwrap();

    tokio::time::sleep(Duration::from_secs(100)).await;
    wizard.touch();

    let started = tokio::time::Instant::now();
    let event = wizard.next_timer_event().await.expect("timer event");
    assert_eq!(event.kind, TimerKind::Idle);
    assert!(started.elapsed() >= Duration::from_secs(122));
    assert_eq!(wizard.handle_timer(event), ScreenState::Welcome);
}

#[tokio::test(start_paused = true)]
async fn stale_timer_event_is_ignored() {
    let mut wizard = CheckInWizard::new(&config_for("http://127.0.0.1:9/api".to_string())).unwrap();
    wizard.enter().unwrap();

    let event = wizard.next_timer_event().await.expect("timer event");
    // The visitor tapped again before the expiry was handled
    wizard.touch();

    assert_eq!(wizard.handle_timer(event), ScreenState::CheckIn);
}
