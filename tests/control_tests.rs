use std::sync::Arc;

use serde_json::Value;
use tado_cloud::{
    Error, Generation, HomeId, RoomId, StaticTokenSource, TadoClient, Termination, control_for,
};
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> TadoClient {
    TadoClient::builder()
        .api_url(server.uri())
        .hops_url(server.uri())
        .token_source(Arc::new(StaticTokenSource::new("test-token")))
        .build()
}

async fn recorded_bodies(server: &MockServer, http_method: &str, path_suffix: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .expect("request recording enabled")
        .into_iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path().ends_with(path_suffix))
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

#[tokio::test]
async fn legacy_boost_is_one_batched_call_for_n_rooms() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/overlay"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    control
        .boost_heating(&[RoomId(1), RoomId(2), RoomId(3)], 1800)
        .await
        .expect("boost should succeed");

    let bodies = recorded_bodies(&server, "POST", "/overlay").await;
    let overlays = bodies[0]["overlays"].as_array().unwrap();
    assert_eq!(overlays.len(), 3);
    for overlay in overlays {
        assert_eq!(overlay["overlay"]["setting"]["power"], "ON");
        assert_eq!(overlay["overlay"]["setting"]["isBoost"], true);
        assert_eq!(overlay["overlay"]["setting"]["temperature"]["celsius"], 25.0);
        assert_eq!(overlay["overlay"]["setting"]["temperature"]["fahrenheit"], 77.0);
        assert_eq!(overlay["overlay"]["termination"]["durationInSeconds"], 1800);
    }
}

#[tokio::test]
async fn current_boost_is_one_call_per_room() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/homes/1/rooms/\d+/manualControl$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Current, &client, HomeId(1)).unwrap();
    control
        .boost_heating(&[RoomId(1), RoomId(2), RoomId(3)], 900)
        .await
        .expect("boost should succeed");

    let bodies = recorded_bodies(&server, "POST", "/manualControl").await;
    assert_eq!(bodies.len(), 3);
    for body in bodies {
        assert_eq!(body["setting"]["power"], "ON");
        assert_eq!(body["setting"]["temperature"]["value"], 25.0);
        assert_eq!(body["termination"]["durationInSeconds"], 900);
    }
}

#[tokio::test]
async fn legacy_temperature_clamps_to_25() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/overlay"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    control
        .set_room_temperature(RoomId(4), 28.0, Termination::NextTimeBlock)
        .await
        .unwrap();

    let bodies = recorded_bodies(&server, "POST", "/overlay").await;
    let setting = &bodies[0]["overlays"][0]["overlay"]["setting"];
    assert_eq!(setting["power"], "ON");
    assert_eq!(setting["temperature"]["celsius"], 25.0);
}

#[tokio::test]
async fn current_temperature_clamps_to_30() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/rooms/4/manualControl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Current, &client, HomeId(1)).unwrap();
    control
        .set_room_temperature(RoomId(4), 34.5, Termination::Auto)
        .await
        .unwrap();

    let bodies = recorded_bodies(&server, "POST", "/manualControl").await;
    assert_eq!(bodies[0]["setting"]["temperature"]["value"], 30.0);
    // AUTO maps to the next scheduled time block on this generation.
    assert_eq!(bodies[0]["termination"]["type"], "NEXT_TIME_BLOCK");
}

#[tokio::test]
async fn below_five_degrees_commands_off_without_temperature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/overlay"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/homes/1/rooms/4/manualControl"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    for generation in [Generation::Legacy, Generation::Current] {
        let control = control_for(generation, &client, HomeId(1)).unwrap();
        control
            .set_room_temperature(RoomId(4), 0.0, Termination::Manual)
            .await
            .unwrap();
    }

    let overlay = &recorded_bodies(&server, "POST", "/overlay").await[0];
    let setting = &overlay["overlays"][0]["overlay"]["setting"];
    assert_eq!(setting["power"], "OFF");
    assert!(setting.get("temperature").is_none(), "off command must omit temperature");

    let manual = &recorded_bodies(&server, "POST", "/manualControl").await[0];
    assert_eq!(manual["setting"]["power"], "OFF");
    assert!(manual["setting"].get("temperature").is_none());
}

#[tokio::test]
async fn timer_termination_carries_duration_on_both_generations() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/overlay"))
        .and(body_string_contains("durationInSeconds"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/homes/1/rooms/4/manualControl"))
        .and(body_string_contains("durationInSeconds"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for generation in [Generation::Legacy, Generation::Current] {
        let control = control_for(generation, &client, HomeId(1)).unwrap();
        control
            .set_room_temperature(RoomId(4), 21.0, Termination::Seconds(2700))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn legacy_resume_clears_overlay_for_one_room() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/homes/1/overlay"))
        .and(query_param("rooms", "7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    control.resume_schedule(Some(RoomId(7))).await.unwrap();
}

#[tokio::test]
async fn legacy_resume_without_room_lists_zones_then_clears_all() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/homes/1/zones"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": 1, "name": "Living Room", "type": "HEATING" },
            { "id": 2, "name": "Bedroom", "type": "HEATING" }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/homes/1/overlay"))
        .and(query_param("rooms", "1,2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    control.resume_schedule(None).await.unwrap();
}

#[tokio::test]
async fn current_resume_uses_quick_actions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/homes/1/rooms/7/resumeSchedule"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/homes/1/quickActions/resumeSchedule"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Current, &client, HomeId(1)).unwrap();
    control.resume_schedule(Some(RoomId(7))).await.unwrap();
    control.resume_schedule(None).await.unwrap();
}

#[tokio::test]
async fn legacy_early_start_round_trips() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/homes/1/zones/3/earlyStart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "enabled": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/homes/1/zones/3/earlyStart"))
        .and(body_string_contains("\"enabled\":false"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    assert_eq!(control.early_start(RoomId(3)).await.unwrap(), Some(true));
    control.set_early_start(RoomId(3), false).await.unwrap();
}

#[tokio::test]
async fn current_early_start_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"earlyStart"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r"earlyStart"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let control = control_for(Generation::Current, &client, HomeId(1)).unwrap();
    assert_eq!(control.early_start(RoomId(3)).await.unwrap(), None);
    control.set_early_start(RoomId(3), true).await.unwrap();
}

#[tokio::test]
async fn auth_failure_with_vendor_pattern_is_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"error":"invalid_grant","error_description":"refresh token revoked"}"#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_me().await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired), "got {err:?}");
}

#[tokio::test]
async fn plain_server_error_is_not_session_expired() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.get_me().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 500, .. }), "got {err:?}");
}

#[tokio::test]
async fn snapshot_projection_differs_by_generation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/homes/1/zones/3/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tadoMode": "AWAY",
            "overlayType": "MANUAL",
            "setting": {
                "type": "HEATING",
                "power": "ON",
                "temperature": { "celsius": 21.5, "fahrenheit": 70.7 }
            },
            "openWindow": null,
            "sensorDataPoints": {
                "insideTemperature": { "celsius": 19.8, "fahrenheit": 67.6 },
                "humidity": { "type": "PERCENTAGE", "percentage": 55.0 }
            },
            "activityDataPoints": {
                "heatingPower": { "type": "PERCENTAGE", "percentage": 37.0 }
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/homes/1/rooms/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "sensorDataPoints": {
                "insideTemperature": { "value": 19.8 },
                "humidity": { "percentage": 55.0 }
            },
            "setting": { "power": "OFF" },
            "manualControlTermination": null,
            "heatingPower": { "percentage": 0.0 },
            "openWindow": { "activated": true }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/homes/1/state"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "presence": "HOME",
            "presenceLocked": true
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let legacy = control_for(Generation::Legacy, &client, HomeId(1)).unwrap();
    let snap = legacy.room_snapshot(RoomId(3)).await.unwrap();
    assert!(snap.power_on);
    assert_eq!(snap.target_temperature, Some(21.5));
    assert!((snap.measured_temperature - 19.8).abs() < 0.01);
    assert!(!snap.smart_schedule, "an active overlay means no smart schedule");
    assert!(!snap.open_window);
    assert_eq!(snap.heating_power, Some(37.0));
    assert_eq!(snap.presence.unwrap().as_str(), "away");

    let current = control_for(Generation::Current, &client, HomeId(1)).unwrap();
    let snap = current.room_snapshot(RoomId(3)).await.unwrap();
    assert!(!snap.power_on);
    assert_eq!(snap.target_temperature, None);
    assert!(snap.smart_schedule, "no manual-control termination means smart schedule");
    assert!(snap.open_window);
    assert_eq!(snap.presence.unwrap().as_str(), "home");
}
