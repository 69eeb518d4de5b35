use device_sentry::{
    config::Config,
    device::Device,
    server::serve,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
};
use tempfile::tempdir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

// Helper function to bind an ephemeral local port
async fn bind_local() -> Option<TcpListener> {
    match TcpListener::bind(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0)).await {
        Ok(listener) => Some(listener),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            eprintln!("Skipping server integration test because binding failed: {err}");
            None
        }
        Err(err) => panic!("Failed to bind test listener: {err}"),
    }
}

#[tokio::test]
async fn test_server_serves_api_and_shuts_down() {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let config = Config {
        debug: true,
        device_log_file: temp_dir.path().join("device_log.json"),
        settings_file: temp_dir.path().join("notification_settings.json"),
        static_dir: temp_dir.path().join("public"),
        devices: vec![Device {
            name: Some("TV".to_string()),
            ..Device::new("192.0.2.10")
        }],
        ..Config::default()
    };

    let Some(listener) = bind_local().await else {
        return;
    };
    let server_address = format!(
        "http://{}",
        listener.local_addr().expect("Failed to read local address")
    );
    let cancel_token = CancellationToken::new();

    // Spawn the server in a background task
    let server_handle = tokio::spawn({
        let cancel_token = cancel_token.clone();
        async move {
            serve(listener, &config, cancel_token)
                .await
                .expect("Server failed to run");
        }
    });

    let client = reqwest::Client::new();

    let devices: Value = client
        .get(format!("{server_address}/devices"))
        .send()
        .await
        .expect("Failed to request /devices")
        .json()
        .await
        .expect("Invalid /devices body");
    assert_eq!(devices["192.0.2.10"]["name"], "TV");

    let status: Value = client
        .get(format!("{server_address}/status"))
        .send()
        .await
        .expect("Failed to request /status")
        .json()
        .await
        .expect("Invalid /status body");
    assert_eq!(
        status,
        json!({ "192.0.2.10": { "name": "TV", "isOnline": false } })
    );

    let weekly: Value = client
        .get(format!("{server_address}/weekly/192.0.2.10"))
        .send()
        .await
        .expect("Failed to request /weekly")
        .json()
        .await
        .expect("Invalid /weekly body");
    assert_eq!(weekly.as_array().map(Vec::len), Some(7));

    let rejected = client
        .post(format!("{server_address}/notifications"))
        .json(&json!({ "enabled": "yes" }))
        .send()
        .await
        .expect("Failed to post /notifications");
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    // Bodies axum cannot extract get the same JSON error
    for request in [
        client
            .post(format!("{server_address}/notifications"))
            .body("enabled=true"),
        client
            .post(format!("{server_address}/notifications"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{ not json"),
    ] {
        let response = request.send().await.expect("Failed to post /notifications");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("Invalid error body");
        assert_eq!(body, json!({ "error": "enabled must be a boolean value." }));
    }

    let accepted: Value = client
        .post(format!("{server_address}/notifications"))
        .json(&json!({ "enabled": true }))
        .send()
        .await
        .expect("Failed to post /notifications")
        .json()
        .await
        .expect("Invalid /notifications body");
    assert_eq!(accepted, json!({ "enabled": true }));

    let current: Value = client
        .get(format!("{server_address}/notifications"))
        .send()
        .await
        .expect("Failed to request /notifications")
        .json()
        .await
        .expect("Invalid /notifications body");
    assert_eq!(current, json!({ "enabled": true }));
    assert!(temp_dir.path().join("notification_settings.json").exists());

    // Debug mode never scans, so no log file appears
    assert!(!temp_dir.path().join("device_log.json").exists());

    // Trigger graceful shutdown
    drop(client);
    cancel_token.cancel();

    // Wait for the server to shut down
    server_handle.await.expect("Server task failed");
}
