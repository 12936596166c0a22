use super::*;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::time::Duration;
use synthetics::ClientConfig;

const SCRIPT: &str = "$http.get('https://example.com/health');";

fn resource(server: &ServerGuard) -> MonitorResource {
    let client = Client::new(ClientConfig {
        api_key: "test-api-key".to_owned(),
        base_url: format!("{}/v3", server.url()),
        alerts_base_url: format!("{}/v2", server.url()),
        max_attempts: 1,
        backoff_unit: Duration::from_millis(1),
    })
    .unwrap();
    MonitorResource::new(client)
}

fn scripted_record() -> MonitorRecord {
    MonitorRecord {
        script: Some(SCRIPT.to_owned()),
        ..MonitorRecord::new("health api", MonitorType::ScriptApi, 15, ["AWS_US_EAST_1"])
    }
}

fn simple_record() -> MonitorRecord {
    MonitorRecord {
        uri: Some("https://example.com".to_owned()),
        verify_ssl: Some(true),
        ..MonitorRecord::new("homepage", MonitorType::Simple, 5, ["AWS_US_WEST_1"])
    }
}

fn scripted_monitor_json(id: &str) -> String {
    json!({
        "id": id,
        "name": "health api",
        "type": "SCRIPT_API",
        "frequency": 15,
        "locations": ["AWS_US_EAST_1"],
        "status": "ENABLED",
        "slaThreshold": 7.0
    })
    .to_string()
}

fn simple_monitor_json(sla_threshold: f64) -> String {
    json!({
        "id": "mon-1",
        "name": "homepage",
        "type": "SIMPLE",
        "frequency": 5,
        "uri": "https://example.com",
        "locations": ["AWS_US_WEST_1"],
        "status": "ENABLED",
        "slaThreshold": sla_threshold,
        "options": {"verifySSL": true}
    })
    .to_string()
}

async fn mock_create(server: &mut ServerGuard, id: &str) {
    let location = format!("{}/v3/monitors/{id}", server.url());
    server
        .mock("POST", "/v3/monitors")
        .with_status(201)
        .with_header("location", location.as_str())
        .create_async()
        .await;
    server
        .mock("GET", format!("/v3/monitors/{id}").as_str())
        .with_status(200)
        .with_body(scripted_monitor_json(id))
        .create_async()
        .await;
}

#[test]
fn fingerprint_is_hex_sha256() {
    assert_eq!(fingerprint("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
}

#[test]
fn validate_rejects_unsupported_frequency_and_empty_locations() {
    let record = MonitorRecord::new("x", MonitorType::Simple, 7, ["AWS_US_WEST_1"]);
    assert!(matches!(record.validate(), Err(ReconcileError::InvalidRecord(_))));

    let record = MonitorRecord::new("x", MonitorType::Simple, 5, Vec::<String>::new());
    assert!(matches!(record.validate(), Err(ReconcileError::InvalidRecord(_))));

    assert!(simple_record().validate().is_ok());
}

#[tokio::test]
async fn exists_is_false_for_missing_monitor() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/v3/monitors/gone").with_status(404).create_async().await;

    let data = MonitorData::with_id("gone", simple_record());
    assert!(!resource(&server).exists(&data).await.unwrap());
}

#[tokio::test]
async fn exists_propagates_other_failures() {
    let mut server = Server::new_async().await;
    server.mock("GET", "/v3/monitors/mon-1").with_status(500).create_async().await;

    let data = MonitorData::with_id("mon-1", simple_record());
    let err = resource(&server).exists(&data).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyntheticsError>(),
        Some(SyntheticsError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn create_attaches_script() {
    let mut server = Server::new_async().await;
    mock_create(&mut server, "mon-1").await;
    let script = server
        .mock("PUT", "/v3/monitors/mon-1/script")
        .match_body(Matcher::PartialJson(json!({ "scriptText": "JGh0dHAuZ2V0KCdodHRwczovL2V4YW1wbGUuY29tL2hlYWx0aCcpOw==" })))
        .with_status(204)
        .create_async()
        .await;

    let mut data = MonitorData::new(scripted_record());
    resource(&server).create(&mut data).await.unwrap();

    assert_eq!(data.id(), "mon-1");
    assert_eq!(data.record().sla_threshold, Some(7.0));
    assert_eq!(data.record().script, Some(fingerprint(SCRIPT)));
    script.assert_async().await;
}

#[tokio::test]
async fn script_failure_after_create_keeps_id() {
    let mut server = Server::new_async().await;
    mock_create(&mut server, "mon-1").await;
    server
        .mock("PUT", "/v3/monitors/mon-1/script")
        .with_status(500)
        .create_async()
        .await;

    let mut data = MonitorData::new(scripted_record());
    let err = resource(&server).create(&mut data).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ReconcileError>(),
        Some(ReconcileError::ScriptNotAttached { monitor_id, .. }) if monitor_id == "mon-1"
    ));
    assert_eq!(data.id(), "mon-1");
}

#[tokio::test]
async fn create_skips_script_for_unscripted_type() {
    let mut server = Server::new_async().await;
    mock_create(&mut server, "mon-1").await;
    let script = server
        .mock("PUT", "/v3/monitors/mon-1/script")
        .with_status(204)
        .expect(0)
        .create_async()
        .await;

    let mut data =
        MonitorData::new(MonitorRecord { script: Some(SCRIPT.to_owned()), ..simple_record() });
    resource(&server).create(&mut data).await.unwrap();

    assert_eq!(data.id(), "mon-1");
    script.assert_async().await;
}

#[tokio::test]
async fn create_rejects_invalid_record_without_calls() {
    let mut server = Server::new_async().await;
    let create = server.mock("POST", "/v3/monitors").expect(0).create_async().await;

    let mut data =
        MonitorData::new(MonitorRecord::new("x", MonitorType::Simple, 2, ["AWS_US_WEST_1"]));
    let err = resource(&server).create(&mut data).await.unwrap_err();

    assert!(err.downcast_ref::<ReconcileError>().is_some());
    assert_eq!(data.id(), "");
    create.assert_async().await;
}

#[tokio::test]
async fn read_stores_script_fingerprint() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(scripted_monitor_json("mon-1"))
        .create_async()
        .await;
    server
        .mock("GET", "/v3/monitors/mon-1/script")
        .with_status(200)
        .with_body(json!({"scriptText": "SGVsbG8="}).to_string())
        .create_async()
        .await;

    let record = MonitorRecord {
        verify_ssl: Some(false),
        ..MonitorRecord::new("old name", MonitorType::ScriptApi, 5, ["AWS_EU_WEST_1"])
    };
    let mut data = MonitorData::with_id("mon-1", record);
    resource(&server).read(&mut data).await.unwrap();

    let record = data.record();
    assert_eq!(record.script.as_deref(), Some(fingerprint("Hello").as_str()));
    assert_eq!(record.name, "health api");
    assert_eq!(record.frequency, 15);
    assert_eq!(record.locations, BTreeSet::from(["AWS_US_EAST_1".to_owned()]));
    assert_eq!(record.sla_threshold, Some(7.0));
    assert_eq!(record.verify_ssl, None);
    assert_eq!(record.uri, None);
}

#[tokio::test]
async fn read_clears_missing_script() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(scripted_monitor_json("mon-1"))
        .create_async()
        .await;
    server.mock("GET", "/v3/monitors/mon-1/script").with_status(404).create_async().await;

    let record = MonitorRecord {
        script_locations: vec![ScriptLocation {
            name: "private-1".to_owned(),
            hmac: "c2VjcmV0".to_owned(),
        }],
        ..scripted_record()
    };
    let mut data = MonitorData::with_id("mon-1", record);
    resource(&server).read(&mut data).await.unwrap();

    assert_eq!(data.record().script, None);
    assert!(data.record().script_locations.is_empty());
}

#[tokio::test]
async fn read_keeps_option_absence() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(simple_monitor_json(7.0))
        .create_async()
        .await;

    let mut data = MonitorData::with_id(
        "mon-1",
        MonitorRecord { bypass_head_request: Some(false), ..simple_record() },
    );
    resource(&server).read(&mut data).await.unwrap();

    assert_eq!(data.record().verify_ssl, Some(true));
    assert_eq!(data.record().bypass_head_request, None);
    assert_eq!(data.record().validation_string, None);
}

#[tokio::test]
async fn update_sends_required_and_changed_fields() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/v3/monitors/mon-1")
        .match_body(Matcher::Json(json!({
            "name": "homepage",
            "frequency": 5,
            "status": "ENABLED",
            "uri": "https://example.com",
            "options": {"verifySSL": true}
        })))
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(simple_monitor_json(3.5))
        .create_async()
        .await;

    let mut data = MonitorData::with_id("mon-1", simple_record())
        .with_changes([MonitorField::VerifySsl, MonitorField::ValidationString]);
    resource(&server).update(&mut data).await.unwrap();

    assert_eq!(data.record().sla_threshold, Some(3.5));
    patch.assert_async().await;
}

#[tokio::test]
async fn update_drops_options_illegal_for_type() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/v3/monitors/mon-1")
        .match_body(Matcher::Json(json!({
            "name": "homepage",
            "frequency": 5,
            "status": "ENABLED",
            "uri": "https://example.com",
            "locations": ["AWS_EU_WEST_1", "AWS_US_WEST_1"]
        })))
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(simple_monitor_json(7.0))
        .create_async()
        .await;

    let mut record = MonitorRecord {
        monitor_type: MonitorType::Browser,
        bypass_head_request: Some(true),
        ..simple_record()
    };
    record.locations.insert("AWS_EU_WEST_1".to_owned());
    let mut data = MonitorData::with_id("mon-1", record)
        .with_changes([MonitorField::BypassHeadRequest, MonitorField::Locations]);
    resource(&server).update(&mut data).await.unwrap();

    patch.assert_async().await;
}

#[tokio::test]
async fn update_sends_changed_script() {
    let mut server = Server::new_async().await;
    server.mock("PATCH", "/v3/monitors/mon-1").with_status(204).create_async().await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(scripted_monitor_json("mon-1"))
        .create_async()
        .await;
    let script = server
        .mock("PUT", "/v3/monitors/mon-1/script")
        .match_body(Matcher::Json(json!({
            "scriptText": "SGVsbG8=",
            "scriptLocations": [{"name": "private-1", "hmac": "c2VjcmV0"}]
        })))
        .with_status(204)
        .create_async()
        .await;

    let record = MonitorRecord {
        script: Some("Hello".to_owned()),
        script_locations: vec![ScriptLocation {
            name: "private-1".to_owned(),
            hmac: "c2VjcmV0".to_owned(),
        }],
        ..scripted_record()
    };
    let mut data =
        MonitorData::with_id("mon-1", record).with_changes([MonitorField::ScriptLocations]);
    resource(&server).update(&mut data).await.unwrap();

    assert_eq!(data.record().script, Some(fingerprint("Hello")));
    script.assert_async().await;
}

#[tokio::test]
async fn update_sends_cleared_flag_as_false() {
    let mut server = Server::new_async().await;
    let patch = server
        .mock("PATCH", "/v3/monitors/mon-1")
        .match_body(Matcher::Json(json!({
            "name": "homepage",
            "frequency": 5,
            "status": "ENABLED",
            "uri": "https://example.com",
            "options": {"verifySSL": false}
        })))
        .with_status(204)
        .create_async()
        .await;
    server
        .mock("GET", "/v3/monitors/mon-1")
        .with_status(200)
        .with_body(simple_monitor_json(7.0))
        .create_async()
        .await;

    let record = MonitorRecord { verify_ssl: None, ..simple_record() };
    let mut data = MonitorData::with_id("mon-1", record).with_changes([MonitorField::VerifySsl]);
    resource(&server).update(&mut data).await.unwrap();

    patch.assert_async().await;
}

#[test]
fn unchanged_unset_flag_is_omitted() {
    let record = MonitorRecord { verify_ssl: None, ..simple_record() };
    let data = MonitorData::with_id("mon-1", record).with_changes([MonitorField::Name]);

    let args = MonitorResource::<reqwest::Client>::update_args(&data);
    assert_eq!(args.options.verify_ssl, None);
    assert_eq!(args.options.bypass_head_request, None);
}

#[tokio::test]
async fn delete_does_not_forgive_missing_monitor() {
    let mut server = Server::new_async().await;
    server.mock("DELETE", "/v3/monitors/gone").with_status(404).create_async().await;

    let data = MonitorData::with_id("gone", simple_record());
    let err = resource(&server).delete(&data).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SyntheticsError>(),
        Some(SyntheticsError::UnexpectedStatus { status: 404, .. })
    ));
}
