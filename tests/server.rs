//! HTTP tests for the catalog server.
//!
//! Each test spawns `run_server` on a free port against a fresh temporary
//! store and drives it with `reqwest`.

mod common;

use ayal_catalog::config::Config;
use ayal_catalog::server::run_server;
use common::{foo_bar, workbook, Cell};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tempfile::TempDir;

// ─── Helpers ────────────────────────────────────────────────────────

fn test_config_with_port(tmp: &TempDir, port: u16) -> Config {
    let db_path = tmp.path().join("data").join("catalog.db");
    let config_content = format!(
        r#"
[db]
path = "{}"

[server]
bind = "127.0.0.1:{}"
"#,
        db_path.display(),
        port
    );
    toml::from_str(&config_content).unwrap()
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

/// Start a server on a fresh store; returns its base URL.
async fn start(tmp: &TempDir) -> String {
    let port = find_free_port();
    let cfg = test_config_with_port(tmp, port);
    tokio::spawn(async move {
        run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn upload(client: &reqwest::Client, base: &str, bytes: Vec<u8>) -> (u16, Value) {
    let part = Part::bytes(bytes).file_name("catalog.xlsx");
    let form = Form::new().part("file", part);
    let resp = client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: String) -> (u16, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_index_reports_running() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "Ayal Kore Catalog API");
}

/// Upload, search, and re-upload against an empty store.
#[tokio::test]
async fn test_upload_search_reupload() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = upload(&client, &base, foo_bar()).await;
    assert_eq!(status, 200, "upload failed: {}", body);
    assert_eq!(
        body,
        json!({ "success": true, "added": 2, "skipped": 0, "total": 2 })
    );

    let (status, body) = get_json(&client, format!("{}/search?column=title&text=oo", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    let hit = &body["results"][0];
    assert_eq!(hit["title"], "Foo");
    assert_eq!(hit["businessKey"], "A1");
    assert_eq!(hit["price"].as_f64(), Some(10.0));
    assert!(hit["id"].is_i64());

    let (status, body) = upload(&client, &base, foo_bar()).await;
    assert_eq!(status, 200);
    assert_eq!(
        body,
        json!({ "success": true, "added": 0, "skipped": 2, "total": 2 })
    );
}

#[tokio::test]
async fn test_stats_on_fresh_environment() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/stats", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "databaseExists": false, "totalRecords": 0 }));

    upload(&client, &base, foo_bar()).await;
    let (_, body) = get_json(&client, format!("{}/stats", base)).await;
    assert_eq!(body, json!({ "databaseExists": true, "totalRecords": 2 }));
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let form = Form::new().text("note", "no file here");
    let resp = client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "לא נבחר קובץ");

    let resp = client
        .post(format!("{}/upload", base))
        .body("plain body")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_upload_unnamed_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let form = Form::new().part("file", Part::bytes(foo_bar()));
    let resp = client
        .post(format!("{}/upload", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn test_upload_unparsable_file_is_server_error() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = upload(&client, &base, b"not a workbook".to_vec()).await;
    assert_eq!(status, 500);
    assert!(body["error"].is_string());

    let (_, body) = get_json(&client, format!("{}/stats", base)).await;
    assert_eq!(body["totalRecords"], 0);
}

#[tokio::test]
async fn test_upload_unknown_header_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let bytes = workbook(
        &["code", "colour"],
        &[vec![Cell::Text("A1"), Cell::Text("red")]],
    );
    let (status, _) = upload(&client, &base, bytes).await;
    assert_eq!(status, 500);

    let (_, body) = get_json(&client, format!("{}/stats", base)).await;
    assert_eq!(body["totalRecords"], 0);
}

#[tokio::test]
async fn test_search_validation_errors() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/search?column=title", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "חסרים פרמטרים לחיפוש");

    let (status, body) = get_json(&client, format!("{}/search?column=title&text=oo", base)).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "מסד הנתונים ריק. אנא העלה קטלוג תחילה");

    upload(&client, &base, foo_bar()).await;

    let (status, body) = get_json(
        &client,
        format!("{}/search?column=title%3B%20DROP%20TABLE&text=oo", base),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].is_string());

    let (_, body) = get_json(&client, format!("{}/stats", base)).await;
    assert_eq!(body["totalRecords"], 2);
}

#[tokio::test]
async fn test_search_no_match_and_wildcards() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();
    upload(&client, &base, foo_bar()).await;

    let (status, body) = get_json(&client, format!("{}/search?column=title&text=zzz", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "success": true, "results": [], "count": 0 }));

    let (_, body) = get_json(&client, format!("{}/search?column=title&text=%25", base)).await;
    assert_eq!(body["count"], 0, "'%' must match literally");
}

#[tokio::test]
async fn test_search_by_hebrew_header() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();
    upload(&client, &base, foo_bar()).await;

    let resp = client
        .get(format!("{}/search", base))
        .query(&[("column", "דאנאקוד"), ("text", "A2")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Bar");
}

#[tokio::test]
async fn test_export_lists_records() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/export", base)).await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));

    upload(&client, &base, foo_bar()).await;
    let (_, body) = get_json(&client, format!("{}/export", base)).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["title"], "Bar");
    assert_eq!(records[1]["price"].as_f64(), Some(20.0));
}

#[tokio::test]
async fn test_rows_without_code_are_always_added() {
    let tmp = TempDir::new().unwrap();
    let base = start(&tmp).await;
    let client = reqwest::Client::new();

    let keyless = || {
        workbook(
            &["title", "price"],
            &[
                vec![Cell::Text("Foo"), Cell::Number(10.0)],
                vec![Cell::Text("Bar"), Cell::Number(20.0)],
                vec![Cell::Text("Foo"), Cell::Number(10.0)],
            ],
        )
    };

    let (status, body) = upload(&client, &base, keyless()).await;
    assert_eq!(status, 200, "upload failed: {}", body);
    assert_eq!(
        body,
        json!({ "success": true, "added": 3, "skipped": 0, "total": 3 })
    );

    let (_, body) = upload(&client, &base, keyless()).await;
    assert_eq!(
        body,
        json!({ "success": true, "added": 3, "skipped": 0, "total": 6 })
    );
}
