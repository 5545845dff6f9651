//! Admin API integration tests: stats, schema init, bulk upload.

mod common;

use common::{start_mock_cdn, TestOptions, TestServer};
use reqwest::multipart;
use serde_json::Value;

fn file_part(name: &str) -> multipart::Part {
    multipart::Part::bytes(b"fake image bytes".to_vec())
        .file_name(name.to_string())
        .mime_str("image/jpeg")
        .unwrap()
}

async fn start_with_cdn() -> Option<(TestServer, String)> {
    let cdn_base = start_mock_cdn().await;
    let server = TestServer::try_start_with(TestOptions {
        cdn_base: Some(cdn_base),
    })
    .await?;
    let token = server.login().await;
    Some((server, token))
}

#[tokio::test]
async fn test_stats_aggregates() {
    let Some(server) = TestServer::try_start().await else {
        return;
    };
    let client = server.client();
    let token = server.login().await;

    server.seed_media("One", "nature", "image", true, 5).await;
    server.seed_media("Two", "nature", "image", false, 2).await;
    server.seed_media("Three", "animals", "gif", true, 3).await;

    let response = client
        .get(server.url("/api/admin/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["images"], 2);
    assert_eq!(body["gifs"], 1);
    assert_eq!(body["visible"], 2);
    assert_eq!(body["hidden"], 1);
    assert_eq!(body["total_views"], 10);
    assert_eq!(body["allowed_categories"].as_array().unwrap().len(), 12);

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories[0]["category"], "nature");
    assert_eq!(categories[0]["count"], 2);
}

#[tokio::test]
async fn test_tables_counts() {
    let Some(server) = TestServer::try_start().await else {
        return;
    };
    let token = server.login().await;

    server.seed_media("A", "art", "image", true, 0).await;
    server.seed_media("B", "art", "gif", true, 0).await;
    server.seed_media("C", "art", "gif", true, 0).await;

    let response = server
        .client()
        .get(server.url("/api/admin/tables"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["media"]["total"], 3);
    assert_eq!(body["media"]["images"], 1);
    assert_eq!(body["media"]["gifs"], 2);
}

#[tokio::test]
async fn test_init_db_is_idempotent() {
    let Some(server) = TestServer::try_start().await else {
        return;
    };
    let token = server.login().await;

    for _ in 0..2 {
        let response = server
            .client()
            .get(server.url("/api/admin/init-db"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
    }
}

#[tokio::test]
async fn test_bulk_upload_replicates_single_title_and_category() {
    let Some((server, token)) = start_with_cdn().await else {
        return;
    };

    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .part("files", file_part("b.jpg"))
        .part("files", file_part("c.jpg"))
        .text("titles", "Sunset")
        .text("categories", "nature")
        .text("media_type", "image");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], 3);
    assert_eq!(body["failed"], 0);

    let uploaded = body["uploaded_media"].as_array().unwrap();
    let titles: Vec<&str> = uploaded
        .iter()
        .map(|u| u["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Sunset 1", "Sunset 2", "Sunset 3"]);
    for item in uploaded {
        assert_eq!(item["category"], "nature");
        assert_eq!(item["media"]["media_type"], "image");
        assert!(item["media"]["url"]
            .as_str()
            .unwrap()
            .starts_with("https://cdn.example.test/"));
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn test_bulk_upload_title_count_mismatch() {
    let Some((server, token)) = start_with_cdn().await else {
        return;
    };

    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .part("files", file_part("b.jpg"))
        .part("files", file_part("c.jpg"))
        .text("titles", "First")
        .text("titles", "Second")
        .text("categories", "nature")
        .text("media_type", "image");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("titles"), "diagnostic names the field: {message}");

    // Nothing was inserted.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media")
        .fetch_one(&server.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_bulk_upload_isolates_per_file_failures() {
    let Some((server, token)) = start_with_cdn().await else {
        return;
    };

    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .part("files", file_part("b.jpg"))
        .part("files", file_part("c.jpg"))
        .text("titles", r#"["First", "Second", "Third"]"#)
        .text("categories", r#"["nature", "unicorns", "nature"]"#)
        .text("media_type", "image");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();

    // Partial success is still a 200.
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["uploaded_media"].as_array().unwrap().len(), 2);

    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["filename"], "b.jpg");
    assert_eq!(errors[0]["index"], 1);
    assert!(errors[0]["error"].as_str().unwrap().contains("category"));
}

#[tokio::test]
async fn test_bulk_upload_gif_batch() {
    let Some((server, token)) = start_with_cdn().await else {
        return;
    };

    let gif = multipart::Part::bytes(b"GIF89a fake".to_vec())
        .file_name("loop.gif".to_string())
        .mime_str("image/gif")
        .unwrap();

    let form = multipart::Form::new()
        .part("files", gif)
        .text("titles", "Looping")
        .text("categories", "animals")
        .text("media_type", "gif");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], 1);
    assert_eq!(body["uploaded_media"][0]["media"]["media_type"], "gif");
}

#[tokio::test]
async fn test_bulk_upload_validation_failures() {
    let Some((server, token)) = start_with_cdn().await else {
        return;
    };
    let client = server.client();

    // No files at all.
    let form = multipart::Form::new()
        .text("titles", "Sunset")
        .text("categories", "nature")
        .text("media_type", "image");
    let response = client
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Bad media_type.
    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .text("titles", "Sunset")
        .text("categories", "nature")
        .text("media_type", "video");
    let response = client
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // Disallowed MIME type.
    let exe = multipart::Part::bytes(b"MZ".to_vec())
        .file_name("malware.exe".to_string())
        .mime_str("application/octet-stream")
        .unwrap();
    let form = multipart::Form::new()
        .part("files", exe)
        .text("titles", "Nope")
        .text("categories", "nature")
        .text("media_type", "image");
    let response = client
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_bulk_upload_without_cdn_config_is_500() {
    // CDN credentials deliberately absent.
    let Some(server) = TestServer::try_start().await else {
        return;
    };
    let token = server.login().await;

    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .text("titles", "Sunset")
        .text("categories", "nature")
        .text("media_type", "image");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn test_bulk_upload_requires_token() {
    let Some((server, _token)) = start_with_cdn().await else {
        return;
    };

    let form = multipart::Form::new()
        .part("files", file_part("a.jpg"))
        .text("titles", "Sunset")
        .text("categories", "nature")
        .text("media_type", "image");

    let response = server
        .client()
        .post(server.url("/api/admin/bulk-upload"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}
