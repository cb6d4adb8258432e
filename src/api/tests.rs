use super::auth::{ADMIN_USERNAME, ensure_admin, hash_password, session_expiry, verify_password};
use super::deployments::{parse_range, sanitize_filename};
use super::*;
use crate::bridge::recording::RecordingSink;
use crate::persistence::{AIR_QUALITY, ENERGY, MAIN_ID, THERMOSTAT, USERS, seed};
use axum::body::{Body, Bytes, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use rumqttc::QoS;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_PASSWORD: &str = "hunter22";

struct Harness {
    app: Router,
    state: AppState,
    sink: Arc<RecordingSink>,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::temporary().unwrap();
    seed(&store).unwrap();
    ensure_admin(&store, Some(ADMIN_PASSWORD)).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let bridge = Arc::new(Bridge::new(sink.clone()));
    bridge.set_connected(true);

    let mut settings = Settings::default();
    settings.server.jwt_secret = "test-secret".into();
    settings.storage.deployment_dir = dir
        .path()
        .join("deployments")
        .to_string_lossy()
        .into_owned();

    let state = AppState::new(store, Arc::new(Hub::new()), bridge, settings);
    Harness {
        app: router(state.clone()),
        state,
        sink,
        _dir: dir,
    }
}

impl Harness {
    async fn send(&self, req: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(req).await
    }

    async fn login_with(&self, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": ADMIN_USERNAME, "password": password})),
        )
        .await
    }

    async fn token(&self) -> String {
        let reply = self.login_with(ADMIN_PASSWORD).await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.json()["token"].as_str().unwrap().to_string()
    }

    async fn upload(&self, token: &str, version: Option<&str>, file: Option<(&str, &[u8])>) -> Reply {
        let boundary = "rvdash-test-boundary";
        let mut body = Vec::new();
        if let Some(version) = version {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"version\"\r\n\r\n{version}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((name, content)) = file {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\nContent-Type: application/zip\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(content);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/deployments/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }
}

// --- passwords ---

#[test]
fn password_hash_round_trip() {
    let stored = hash_password("correct horse").unwrap();
    assert!(stored.starts_with("$2b$"));
    assert!(verify_password("correct horse", &stored));
    assert!(!verify_password("wrong horse", &stored));
}

#[test]
fn password_hash_is_salted() {
    assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
}

#[test]
fn existing_bcrypt_hashes_verify() {
    // cost 10, as written by earlier dashboard installs
    let stored = bcrypt::hash("legacy-pass", 10).unwrap();
    assert!(stored.starts_with("$2b$10$"));
    assert!(verify_password("legacy-pass", &stored));
}

#[test]
fn malformed_hashes_never_verify() {
    for stored in ["", "$2b$", "$2b$10$short", "sha256$00$00", "plaintext"] {
        assert!(!verify_password("x", stored), "{stored}");
    }
}

#[test]
fn session_expiry_rejects_out_of_range_lifetimes() {
    let now = chrono::Utc::now();
    let expires = session_expiry(now, 24).unwrap();
    assert_eq!(expires - now, chrono::TimeDelta::hours(24));

    for hours in [0, -1, i64::MAX, i64::MAX / 3_600_000] {
        let err = session_expiry(now, hours).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR, "{hours}");
    }
}

#[tokio::test]
async fn oversized_session_lifetime_fails_login_without_panicking() {
    let mut h = harness();
    let mut settings = (*h.state.settings).clone();
    settings.server.session_hours = i64::MAX;
    h.state.settings = Arc::new(settings);
    h.app = router(h.state.clone());

    let reply = h.login_with(ADMIN_PASSWORD).await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply.json()["error"].is_string());
}

#[test]
fn admin_not_created_without_password() {
    let store = Store::temporary().unwrap();
    ensure_admin(&store, None).unwrap();
    ensure_admin(&store, Some("")).unwrap();
    assert!(store.collection(USERS).unwrap().is_empty());
}

#[test]
fn admin_creation_keeps_existing_password() {
    let store = Store::temporary().unwrap();
    ensure_admin(&store, Some("first-pass")).unwrap();
    ensure_admin(&store, Some("second-pass")).unwrap();

    let user = store.collection(USERS).unwrap().find_one(ADMIN_USERNAME).unwrap().unwrap();
    let hash = user["password_hash"].as_str().unwrap();
    assert!(verify_password("first-pass", hash));
}

// --- health and the auth gate ---

#[tokio::test]
async fn health_is_public_and_reports_broker_state() {
    let h = harness();
    let reply = h.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"status": "ok", "mqtt_connected": true}));

    h.state.bridge.set_connected(false);
    let reply = h.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(reply.json()["mqtt_connected"], false);
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let h = harness();
    let reply = h.call(Method::GET, "/api/lights", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"error": "Authentication required"}));

    let reply = h.call(Method::GET, "/api/lights", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"error": "Invalid or expired session"}));
}

#[tokio::test]
async fn browser_navigation_is_redirected_to_login() {
    let h = harness();
    let req = Request::builder()
        .uri("/api/settings")
        .header(header::ACCEPT, "text/html,application/xhtml+xml")
        .body(Body::empty())
        .unwrap();
    let reply = h.send(req).await;
    assert_eq!(reply.status, StatusCode::FOUND);
    assert_eq!(reply.headers[header::LOCATION], "/#login");

    let req = Request::builder()
        .uri("/api/settings")
        .header(header::ACCEPT, "text/html")
        .header("X-Requested-With", "XMLHttpRequest")
        .body(Body::empty())
        .unwrap();
    assert_eq!(h.send(req).await.status, StatusCode::UNAUTHORIZED);
}

// --- auth ---

#[tokio::test]
async fn login_validates_input_and_credentials() {
    let h = harness();

    let reply = h
        .call(Method::POST, "/api/auth/login", None, Some(json!({"username": "admin"})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h.login_with("wrong-password").await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"error": "Invalid credentials"}));

    let reply = h
        .call(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"username": "nobody", "password": "whatever"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_check_logout_cycle() {
    let h = harness();

    let reply = h.login_with(ADMIN_PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["display_name"], "Administrator");
    assert!(body["expires_at"].is_string());
    let token = body["token"].as_str().unwrap().to_string();

    let reply = h.call(Method::GET, "/api/auth/check", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["authenticated"], true);
    assert_eq!(reply.json()["user"]["username"], "admin");

    let reply = h.call(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"message": "Logged out successfully"}));

    let reply = h.call(Method::GET, "/api/auth/check", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"authenticated": false}));

    let reply = h.call(Method::GET, "/api/lights", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_without_token_still_succeeds() {
    let h = harness();
    let reply = h.call(Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn change_password_flow() {
    let h = harness();
    let token = h.token().await;
    let url = "/api/auth/change-password";

    let reply = h
        .call(Method::POST, url, None, Some(json!({"current_password": ADMIN_PASSWORD, "new_password": "newpass1"})))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = h
        .call(Method::POST, url, Some(&token), Some(json!({"current_password": ADMIN_PASSWORD})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h
        .call(Method::POST, url, Some(&token), Some(json!({"current_password": ADMIN_PASSWORD, "new_password": "short"})))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = h
        .call(Method::POST, url, Some(&token), Some(json!({"current_password": "nope", "new_password": "newpass1"})))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.json(), json!({"error": "Current password is incorrect"}));

    let reply = h
        .call(Method::POST, url, Some(&token), Some(json!({"current_password": ADMIN_PASSWORD, "new_password": "newpass1"})))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json(), json!({"message": "Password changed successfully"}));

    assert_eq!(h.login_with(ADMIN_PASSWORD).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(h.login_with("newpass1").await.status, StatusCode::OK);
}

// --- settings and simulated documents ---

#[tokio::test]
async fn settings_include_available_timezones() {
    let h = harness();
    let token = h.token().await;

    let reply = h.call(Method::GET, "/api/settings", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["theme"], "dark");
    assert_eq!(body["clock_format"], "12h");
    assert!(
        body["available_timezones"]
            .as_array()
            .unwrap()
            .contains(&json!("America/New_York"))
    );
}

#[tokio::test]
async fn settings_update_validates_values() {
    let h = harness();
    let token = h.token().await;

    for body in [
        json!({"theme": "purple"}),
        json!({"timezone": "Mars/Olympus"}),
        json!({"clock_format": "36h"}),
        json!({"unrelated": true}),
        json!({}),
    ] {
        let reply = h.call(Method::PUT, "/api/settings", Some(&token), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
    }

    let reply = h
        .call(
            Method::PUT,
            "/api/settings",
            Some(&token),
            Some(json!({"theme": "light", "clock_format": "24h"})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let body = reply.json();
    assert_eq!(body["theme"], "light");
    assert_eq!(body["clock_format"], "24h");
    assert_eq!(body["timezone"], "America/New_York");

    let reply = h.call(Method::GET, "/api/settings", Some(&token), None).await;
    assert_eq!(reply.json()["theme"], "light");
}

#[tokio::test]
async fn level_and_water_return_seeded_documents() {
    let h = harness();
    let token = h.token().await;

    let level = h.call(Method::GET, "/api/level", Some(&token), None).await;
    assert_eq!(level.status, StatusCode::OK);
    assert_eq!(level.json()["front_back"], 0.0);

    let water = h.call(Method::GET, "/api/water", Some(&token), None).await;
    assert_eq!(water.status, StatusCode::OK);
    assert_eq!(water.json()["fresh"], 75.0);
}

#[tokio::test]
async fn snapshot_routes_return_null_until_written() {
    let h = harness();
    let token = h.token().await;

    for uri in ["/api/thermostat", "/api/energy", "/api/airquality"] {
        let reply = h.call(Method::GET, uri, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert_eq!(reply.json(), Value::Null, "{uri}");
    }
}

#[tokio::test]
async fn snapshot_routes_return_stored_main_document() {
    let h = harness();
    let token = h.token().await;

    for (collection, uri, doc) in [
        (THERMOSTAT, "/api/thermostat", json!({"_id": "main", "current_temp": 70.5, "mode": "heat"})),
        (ENERGY, "/api/energy", json!({"_id": "main", "battery_percent": 88})),
        (AIR_QUALITY, "/api/airquality", json!({"_id": "main", "pm25": 4})),
    ] {
        let Value::Object(fields) = doc.clone() else { unreachable!() };
        h.state.store.collection(collection).unwrap().insert_one(MAIN_ID, &fields).unwrap();

        let reply = h.call(Method::GET, uri, Some(&token), None).await;
        assert_eq!(reply.status, StatusCode::OK, "{uri}");
        assert_eq!(reply.json(), doc, "{uri}");
    }
}

#[tokio::test]
async fn snapshot_routes_require_a_token() {
    let h = harness();
    for uri in ["/api/thermostat", "/api/energy", "/api/airquality"] {
        let reply = h.call(Method::GET, uri, None, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED, "{uri}");
    }
}

// --- lights and thermostat ---

#[tokio::test]
async fn lights_are_listed_in_id_order() {
    let h = harness();
    let token = h.token().await;

    let reply = h.call(Method::GET, "/api/lights", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let ids: Vec<u64> = reply
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn light_update_validates_and_publishes() {
    let h = harness();
    let token = h.token().await;

    let reply = h
        .call(Method::PUT, "/api/lights/42", Some(&token), Some(json!({"state": "on"})))
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    for body in [json!({"state": "dim"}), json!({}), json!({"state": "on", "brightness": 101})] {
        let reply = h.call(Method::PUT, "/api/lights/3", Some(&token), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
    }
    assert!(h.sink.published.lock().is_empty());

    let reply = h
        .call(
            Method::PUT,
            "/api/lights/3",
            Some(&token),
            Some(json!({"state": "on", "brightness": 80})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"success": true, "id": 3, "state": "on", "brightness": 80})
    );

    let published = h.sink.published.lock();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "rv/lights/3/command");
    assert_eq!(published[0].payload, json!({"state": "on", "brightness": 80}));
}

#[tokio::test]
async fn thermostat_rejects_invalid_commands() {
    let h = harness();
    let token = h.token().await;

    for body in [
        json!({"target_temp": 49}),
        json!({"target_temp": 91}),
        json!({"target_temp": "72"}),
        json!({"mode": "fan"}),
        json!({}),
    ] {
        let reply = h.call(Method::PUT, "/api/thermostat", Some(&token), Some(body.clone())).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{body}");
    }
    assert!(h.sink.published.lock().is_empty());
}

#[tokio::test]
async fn thermostat_command_is_published_and_acknowledged() {
    let h = harness();
    let token = h.token().await;

    let reply = h
        .call(Method::PUT, "/api/thermostat", Some(&token), Some(json!({"target_temp": 72})))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(
        reply.json(),
        json!({"success": true, "target_temp": 72, "mode": null})
    );

    let published = h.sink.published.lock();
    assert_eq!(published[0].topic, "rv/thermostat/command");
    assert_eq!(published[0].payload, json!({"target_temp": 72}));
}

#[tokio::test]
async fn thermostat_reports_failure_while_broker_is_down() {
    let h = harness();
    let token = h.token().await;
    h.state.bridge.set_connected(false);

    let reply = h
        .call(Method::PUT, "/api/thermostat", Some(&token), Some(json!({"mode": "cool"})))
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["success"], false);
    assert!(h.sink.published.lock().is_empty());
}

// --- deployments ---

#[test]
fn sanitize_keeps_only_the_base_name() {
    assert_eq!(sanitize_filename("fw.zip"), "fw.zip");
    assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
    assert_eq!(sanitize_filename("C:\\builds\\fw.zip"), "fw.zip");
    assert_eq!(sanitize_filename(".."), "upload.bin");
    assert_eq!(sanitize_filename(""), "upload.bin");
}

#[test]
fn range_parsing() {
    assert_eq!(parse_range("bytes=0-9", 100), Some(Ok((0, 9))));
    assert_eq!(parse_range("bytes=90-", 100), Some(Ok((90, 99))));
    assert_eq!(parse_range("bytes=90-500", 100), Some(Ok((90, 99))));
    assert_eq!(parse_range("bytes=100-", 100), Some(Err(())));
    assert_eq!(parse_range("bytes=-20", 100), None);
    assert_eq!(parse_range("items=0-9", 100), None);
    assert_eq!(parse_range("bytes=9-2", 100), None);
}

#[tokio::test]
async fn upload_list_download_delete() {
    let h = harness();
    let token = h.token().await;
    let content = b"PK\x03\x04 firmware image bytes".to_vec();
    let expected_sha = hex::encode(Sha256::digest(&content));

    // upload
    let reply = h.upload(&token, Some("1.4.2"), Some(("fw.zip", content.as_slice()))).await;
    assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.body);
    let info = reply.json();
    assert_eq!(info["version"], "1.4.2");
    assert_eq!(info["filename"], "fw.zip");
    assert_eq!(info["size"], content.len());
    assert_eq!(info["sha256"], expected_sha.as_str());
    let id = info["id"].as_str().unwrap().to_string();
    assert_eq!(info["downloadUrl"], format!("/api/deployment-download/{id}"));

    // stored on disk with the timestamped name
    let files: Vec<String> = std::fs::read_dir(h.state.deployment_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("deployment-") && files[0].ends_with("-fw.zip"));

    // announced, retained
    {
        let published = h.sink.published.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "rv/deployment/available");
        assert!(published[0].retain);
        assert_eq!(published[0].qos, QoS::AtLeastOnce);
        assert_eq!(published[0].payload["sha256"], expected_sha.as_str());
    }

    // list and latest
    let reply = h.call(Method::GET, "/api/deployments", Some(&token), None).await;
    let list = reply.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["uploadedBy"], "admin");

    let reply = h
        .call(Method::GET, "/api/deployment-download/latest/info", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["id"], id.as_str());

    // full download
    let url = format!("/api/deployment-download/{id}");
    let reply = h.call(Method::GET, &url, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.as_ref(), content.as_slice());
    assert_eq!(reply.headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(reply.headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(reply.headers[header::ETAG], format!("\"{expected_sha}\""));
    assert_eq!(reply.headers["x-checksum-sha256"], expected_sha.as_str());
    assert_eq!(
        reply.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"fw.zip\""
    );

    // ranged download
    let ranged = |range: &str| {
        Request::builder()
            .uri(url.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::RANGE, range)
            .body(Body::empty())
            .unwrap()
    };
    let reply = h.send(ranged("bytes=2-5")).await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.body.as_ref(), &content[2..=5]);
    assert_eq!(
        reply.headers[header::CONTENT_RANGE],
        format!("bytes 2-5/{}", content.len())
    );

    let reply = h.send(ranged("bytes=10-")).await;
    assert_eq!(reply.status, StatusCode::PARTIAL_CONTENT);
    assert_eq!(reply.body.as_ref(), &content[10..]);

    let reply = h.send(ranged(&format!("bytes={}-", content.len()))).await;
    assert_eq!(reply.status, StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        reply.headers[header::CONTENT_RANGE],
        format!("bytes */{}", content.len())
    );

    let reply = h.send(ranged("bytes=abc")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body.len(), content.len());

    // delete
    let reply = h
        .call(Method::DELETE, &format!("/api/deployments/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(std::fs::read_dir(h.state.deployment_dir()).unwrap().next().is_none());

    let reply = h.call(Method::GET, &url, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let reply = h
        .call(Method::DELETE, &format!("/api/deployments/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    let reply = h
        .call(Method::GET, "/api/deployment-download/latest/info", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let h = harness();
    let token = h.token().await;
    let reply = h.upload(&token, Some("2.0.0"), None).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(h.sink.published.lock().is_empty());
}

#[tokio::test]
async fn upload_without_version_is_unknown() {
    let h = harness();
    let token = h.token().await;
    let reply = h.upload(&token, None, Some(("nested/dir/app.zip", b"data".as_slice()))).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["version"], "unknown");
    assert_eq!(reply.json()["filename"], "app.zip");
}

#[tokio::test]
async fn download_of_missing_file_is_not_found() {
    let h = harness();
    let token = h.token().await;
    let reply = h.upload(&token, Some("1.0"), Some(("fw.zip", b"abc".as_slice()))).await;
    let id = reply.json()["id"].as_str().unwrap().to_string();

    for entry in std::fs::read_dir(h.state.deployment_dir()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let reply = h
        .call(Method::GET, &format!("/api/deployment-download/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.json(), json!({"error": "File not found on disk"}));
}

#[tokio::test]
async fn newest_deployment_is_listed_first() {
    let h = harness();
    let token = h.token().await;

    h.upload(&token, Some("1.0"), Some(("a.zip", b"a".as_slice()))).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    h.upload(&token, Some("2.0"), Some(("b.zip", b"b".as_slice()))).await;

    let reply = h.call(Method::GET, "/api/deployments", Some(&token), None).await;
    let list = reply.json();
    assert_eq!(list[0]["version"], "2.0");
    assert_eq!(list[1]["version"], "1.0");

    let reply = h
        .call(Method::GET, "/api/deployment-download/latest/info", Some(&token), None)
        .await;
    assert_eq!(reply.json()["version"], "2.0");
}
