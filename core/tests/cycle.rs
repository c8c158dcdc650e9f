use anyhow::Result;
use imgsafe_core::scheduler::Engine;
use imgsafe_core::scheduler::EngineSettings;
use imgsafe_core::services::SystemClock;
use imgsafe_core::state::StateStore;
use imgsafe_core::webhook::WebhookNotifier;
use imgsafe_http_client::ReqwestTransport;
use imgsafe_misskey::Instance;
use imgsafe_misskey::MisskeyClient;
use imgsafe_vision::VisionClient;
use imgsafe_vision::encode_image;
use pretty_assertions::assert_eq;
use serde_json::Value;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::body_string_contains;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn drive_file(server: &MockServer, id: &str, created_at: &str) -> Value {
    json!({
        "id": id,
        "createdAt": created_at,
        "name": format!("{id}.png"),
        "type": "image/png",
        "size": 2048,
        "isSensitive": false,
        "url": format!("{}/files/{id}.png", server.uri()),
        "webpublicUrl": null,
        "userId": "uploader"
    })
}

fn annotation(adult: &str) -> Value {
    json!({
        "responses": [{"safeSearchAnnotation": {
            "adult": adult,
            "spoof": "VERY_UNLIKELY",
            "medical": "VERY_UNLIKELY",
            "violence": "VERY_UNLIKELY",
            "racy": "UNLIKELY"
        }}]
    })
}

#[tokio::test]
async fn cycle_flags_explicit_upload_end_to_end() -> Result<()> {
    let server = MockServer::start().await;
    let older = drive_file(&server, "9q01", "2024-03-01T00:00:01.000Z");
    let newer = drive_file(&server, "9q02", "2024-03-01T00:00:02.000Z");

    Mock::given(method("POST"))
        .and(path("/api/admin/drive/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([older, newer])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/drive/files"))
        .and(body_partial_json(json!({"sinceId": "9q02"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    for (id, file) in [("9q01", &older), ("9q02", &newer)] {
        Mock::given(method("POST"))
            .and(path("/api/admin/drive/show-file"))
            .and(body_partial_json(json!({"fileId": id})))
            .respond_with(ResponseTemplate::new(200).set_body_json(file.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/files/{id}.png")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(id.as_bytes().to_vec()))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .and(body_string_contains(encode_image(b"9q02")))
        .respond_with(ResponseTemplate::new(200).set_body_json(annotation("VERY_LIKELY")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .and(body_string_contains(encode_image(b"9q01")))
        .respond_with(ResponseTemplate::new(200).set_body_json(annotation("UNLIKELY")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/drive/files/update"))
        .and(body_partial_json(json!({"fileId": "9q02", "isSensitive": true})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_string_contains("9q02 by uploader"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(reqwest::Client::new());
    let engine = Engine::new(
        MisskeyClient::new(transport.clone(), Instance::new(&server.uri(), "admin")),
        VisionClient::with_base_url(transport.clone(), server.uri(), "vision-key"),
        Some(WebhookNotifier::new(
            transport,
            format!("{}/hook", server.uri()),
            r#"{"text": "{fileId} by {authorUser}: {checkResult}"}"#,
        )),
        SystemClock,
        EngineSettings {
            threshold: 15,
            monthly_limit: 100,
            page_size: 10,
            min_image_size: 0,
            request_interval: Duration::from_millis(1),
            poll_period: Duration::from_secs(600),
        },
    );
    let dir = TempDir::new()?;
    let store = StateStore::new(dir.path().join("state.json"));

    let outcome = engine.run_cycle(&store).await?;

    assert_eq!(outcome.processed, 2);
    assert_eq!(outcome.flagged, 1);
    let state = store.load();
    assert_eq!(state.cursor.as_deref(), Some("9q02"));
    assert_eq!(state.quota.spent, 2);
    Ok(())
}

#[tokio::test]
async fn gone_image_is_passed_over_and_walk_continues() -> Result<()> {
    let server = MockServer::start().await;
    let gone = drive_file(&server, "9r01", "2024-04-01T00:00:01.000Z");
    let kept = drive_file(&server, "9r02", "2024-04-01T00:00:02.000Z");

    Mock::given(method("POST"))
        .and(path("/api/admin/drive/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([gone, kept])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/admin/drive/files"))
        .and(body_partial_json(json!({"sinceId": "9r02"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    for (id, file) in [("9r01", &gone), ("9r02", &kept)] {
        Mock::given(method("POST"))
            .and(path("/api/admin/drive/show-file"))
            .and(body_partial_json(json!({"fileId": id})))
            .respond_with(ResponseTemplate::new(200).set_body_json(file.clone()))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/files/9r01.png"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/9r02.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"9r02".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/images:annotate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(annotation("UNLIKELY")))
        .expect(1)
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(reqwest::Client::new());
    let engine = Engine::new(
        MisskeyClient::new(transport.clone(), Instance::new(&server.uri(), "admin")),
        VisionClient::with_base_url(transport, server.uri(), "vision-key"),
        None::<WebhookNotifier<ReqwestTransport>>,
        SystemClock,
        EngineSettings {
            threshold: 15,
            monthly_limit: 100,
            page_size: 10,
            min_image_size: 0,
            request_interval: Duration::from_millis(1),
            poll_period: Duration::from_secs(600),
        },
    );
    let dir = TempDir::new()?;
    let store = StateStore::new(dir.path().join("state.json"));

    let outcome = engine.run_cycle(&store).await?;

    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.processed, 1);
    let state = store.load();
    assert_eq!(state.cursor.as_deref(), Some("9r02"));
    assert_eq!(state.quota.spent, 1);
    Ok(())
}

#[tokio::test]
async fn webhook_posts_rendered_template_verbatim() -> Result<()> {
    use imgsafe_core::services::Notification;
    use imgsafe_core::services::Notifier;
    use imgsafe_vision::SafeSearchAnnotation;
    use wiremock::matchers::body_string;
    use wiremock::matchers::header;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(body_string(
            r#"{"id": "f1", "size": 0, "result": "adult=UNKNOWN, spoof=UNKNOWN, medical=UNKNOWN, violence=UNKNOWN, racy=UNKNOWN"}"#,
        ))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        ReqwestTransport::new(reqwest::Client::new()),
        format!("{}/hook", server.uri()),
        r#"{"id": "{fileId}", "size": {fileSize}, "result": "{checkResult}"}"#,
    );
    notifier
        .notify(&Notification {
            file_id: "f1".to_string(),
            file_url: None,
            file_size: None,
            author_id: None,
            scores: SafeSearchAnnotation::default(),
        })
        .await?;
    Ok(())
}
