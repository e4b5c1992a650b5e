use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use server::config::{AutodialConfig, DialerSection, SimulatorSection};
use server::{create_router, state::AppState};

fn test_config() -> AutodialConfig {
    AutodialConfig {
        dialer: DialerSection {
            call_delay_secs: 0,
            auto_hangup: true,
            call_timeout_secs: 5,
        },
        simulator: SimulatorSection {
            connect_delay_ms: 0,
            setup_delay_ms: 0,
            min_ring_ms: 5,
            max_ring_ms: 20,
        },
        ..Default::default()
    }
}

fn setup_test_server_with(config: AutodialConfig) -> (TestServer, AppState) {
    let state = AppState::simulated(&config);
    let app = create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, state)
}

fn setup_test_server() -> (TestServer, AppState) {
    setup_test_server_with(test_config())
}

async fn wait_until_idle(state: &AppState) {
    tokio::time::timeout(Duration::from_secs(10), state.sequencer.wait_idle())
        .await
        .expect("auto-dial did not finish in time");
}

fn customers_payload() -> Value {
    json!({
        "customers": [
            {"caseId": "C1", "customerName": "Alice", "phoneNumber": "555-0001", "handel": "desk-1"},
            {"caseId": "C2", "customerName": "Bob", "phoneNumber": "555-0002", "handler": "desk-2"},
            {"caseId": "C3", "customerName": "No Phone", "phoneNumber": ""}
        ]
    })
}

mod health {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let (server, _state) = setup_test_server();

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn test_openapi_document_served() {
        let (server, _state) = setup_test_server();

        let response = server.get("/api/openapi.json").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert!(body["paths"]["/api/start-autodial"].is_object());
    }
}

mod telephony {
    use super::*;

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let (server, _state) = setup_test_server();

        let response = server.post("/api/connect").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["connected"], true);

        let status: Value = server.get("/api/status").await.json();
        assert_eq!(status["connected"], true);

        let response = server.post("/api/disconnect").await;
        response.assert_status_ok();

        let status: Value = server.get("/api/status").await.json();
        assert_eq!(status["connected"], false);
    }

    #[tokio::test]
    async fn test_connect_failure_is_bad_gateway() {
        let mut config = test_config();
        config.sip.server = String::new();
        let (server, _state) = setup_test_server_with(config);

        let response = server.post("/api/connect").await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        let body: Value = response.json();
        assert_eq!(body["error"], "telephony_error");
    }
}

mod settings {
    use super::*;

    #[tokio::test]
    async fn test_get_settings_masks_password() {
        let mut config = test_config();
        config.sip.password = "super-secret".to_string();
        let (server, _state) = setup_test_server_with(config);

        let response = server.get("/api/settings").await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["hasPassword"], true);
        assert_eq!(body["sipConfig"]["password"], "****et");
        assert_eq!(body["callDelay"], 0);
        assert_eq!(body["autoHangup"], true);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let (server, state) = setup_test_server();

        let response = server
            .post("/api/settings")
            .json(&json!({"callDelay": 7, "autoHangup": false}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["callDelay"], 7);
        assert_eq!(body["autoHangup"], false);
        assert_eq!(state.settings.call_delay(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_masked_password_round_trip_keeps_secret() {
        let mut config = test_config();
        config.sip.password = "super-secret".to_string();
        let (server, state) = setup_test_server_with(config);

        let current: Value = server.get("/api/settings").await.json();
        let mut sip = current["sipConfig"].clone();
        sip["login"] = json!("1002");

        server
            .post("/api/settings")
            .json(&json!({"sipConfig": sip}))
            .await
            .assert_status_ok();

        let sip = state.settings.sip_config();
        assert_eq!(sip.login, "1002");
        assert_eq!(sip.password, "super-secret");
    }

    #[tokio::test]
    async fn test_rejects_excessive_delay() {
        let (server, _state) = setup_test_server();

        let response = server
            .post("/api/settings")
            .json(&json!({"callDelay": 100000}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "invalid_settings");
    }
}

mod customers {
    use super::*;

    #[tokio::test]
    async fn test_upload_and_list() {
        let (server, _state) = setup_test_server();

        let response = server.post("/api/customers").json(&customers_payload()).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["loaded"], 2);
        assert_eq!(body["rejected"], 1);

        let body: Value = server.get("/api/customers").await.json();
        assert_eq!(body["count"], 2);
        assert_eq!(body["customers"][0]["id"], "customer-C1");
        assert_eq!(body["customers"][0]["handler"], "desk-1");
    }
}

mod autodial {
    use super::*;

    #[tokio::test]
    async fn test_start_requires_connection() {
        let (server, state) = setup_test_server();
        server.post("/api/customers").json(&customers_payload()).await;

        let response = server
            .post("/api/start-autodial")
            .json(&json!({"caseIds": ["C1"]}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "not_connected");
        assert!(state.records.is_empty());
    }

    #[tokio::test]
    async fn test_start_with_empty_selection() {
        let (server, state) = setup_test_server();
        server.post("/api/connect").await;

        let response = server.post("/api/start-autodial").json(&json!({})).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "empty_selection");

        let status: Value = server.get("/api/status").await.json();
        assert_eq!(status["isDialing"], false);
        assert!(state.records.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_customers_skip_undialable_rows() {
        let (server, state) = setup_test_server();
        server.post("/api/connect").await.assert_status_ok();

        let response = server
            .post("/api/start-autodial")
            .json(&customers_payload())
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 2);

        wait_until_idle(&state).await;
        let history: Value = server.get("/api/call-history").await.json();
        let cases: Vec<&str> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["caseId"].as_str().unwrap())
            .collect();
        assert_eq!(cases, vec!["C1", "C2"]);

        let response = server
            .post("/api/start-autodial")
            .json(&json!({"customers": [{"caseId": "C9", "customerName": "Blank", "phoneNumber": "  "}]}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], "empty_selection");
    }

    #[tokio::test]
    async fn test_full_run_by_case_ids() {
        let (server, state) = setup_test_server();
        server.post("/api/customers").json(&customers_payload()).await;
        server.post("/api/connect").await.assert_status_ok();

        let response = server
            .post("/api/start-autodial")
            .json(&json!({"caseIds": ["C2", "C1"]}))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["total"], 2);
        assert!(body["runId"].is_string());

        wait_until_idle(&state).await;

        let history: Value = server.get("/api/call-history").await.json();
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["caseId"], "C2");
        assert_eq!(history[1]["caseId"], "C1");
        for record in history {
            assert_ne!(record["status"], "in-progress");
            assert!(record["startTime"].is_string());
            assert!(record["endTime"].is_string());
        }

        let stats: Value = server.get("/api/call-history/stats").await.json();
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["completed"], 2);
        assert_eq!(stats["inProgress"], 0);

        let id = history[0]["id"].as_str().unwrap();
        let record: Value = server.get(&format!("/api/call-history/{}", id)).await.json();
        assert_eq!(record["caseId"], "C2");

        let recent: Value = server.get("/api/call-history/recent?limit=1").await.json();
        assert_eq!(recent.as_array().unwrap().len(), 1);
        assert_eq!(recent[0]["caseId"], "C1");

        let status: Value = server.get("/api/status").await.json();
        assert_eq!(status["isDialing"], false);
        assert!(status["currentCall"].is_null());
    }

    #[tokio::test]
    async fn test_second_start_conflicts() {
        let mut config = test_config();
        config.simulator.min_ring_ms = 300;
        config.simulator.max_ring_ms = 300;
        let (server, state) = setup_test_server_with(config);
        server.post("/api/connect").await;

        server
            .post("/api/start-autodial")
            .json(&customers_payload())
            .await
            .assert_status_ok();

        let response = server
            .post("/api/start-autodial")
            .json(&customers_payload())
            .await;
        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "already_running");

        let status: Value = server.get("/api/status").await.json();
        assert_eq!(status["isDialing"], true);

        server.post("/api/stop-autodial").await.assert_status_ok();
        wait_until_idle(&state).await;

        assert!(state.records.len() <= 3);
    }

    #[tokio::test]
    async fn test_stop_when_idle_conflicts() {
        let (server, _state) = setup_test_server();

        let response = server.post("/api/stop-autodial").await;

        response.assert_status(StatusCode::CONFLICT);
        let body: Value = response.json();
        assert_eq!(body["error"], "not_running");
    }
}

mod call_history {
    use super::*;

    #[tokio::test]
    async fn test_unknown_record() {
        let (server, _state) = setup_test_server();

        let response = server.get("/api/call-history/call-0-missing").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_status_filter() {
        let (server, _state) = setup_test_server();

        let response = server.get("/api/call-history?status=ringing").await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_history() {
        let (server, _state) = setup_test_server();

        let body: Value = server.get("/api/call-history?status=answered").await.json();
        assert!(body.as_array().unwrap().is_empty());

        let stats: Value = server.get("/api/call-history/stats").await.json();
        assert_eq!(stats["total"], 0);
    }
}
