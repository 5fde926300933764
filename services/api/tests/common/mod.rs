//! Shared fixtures for the `api` integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use api_lib::adapters::DbAdapter;
use api_lib::config::Config;
use api_lib::web::{router, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;
use url::Url;
use web_summarizer_core::{RenderError, RenderService, SummarizationError, SummaryService};

pub const PAGE: &str = "<html><body><script>evil()</script><p>Hello World</p></body></html>";
pub const PASSWORD: &str = "hunter2hunter2";

pub struct FakeRenderer {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

#[async_trait]
impl RenderService for FakeRenderer {
    async fn render(&self, _url: &Url) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(PAGE.to_string())
    }
}

pub struct FakeSummarizer;

#[async_trait]
impl SummaryService for FakeSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizationError> {
        Ok(format!("- {}", text))
    }
}

pub async fn memory_db() -> Arc<DbAdapter> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = DbAdapter::new(pool);
    db.run_migrations().await.unwrap();
    Arc::new(db)
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<DbAdapter>,
    pub state: Arc<AppState>,
    pub renderer: Arc<FakeRenderer>,
}

/// An app with effectively no rate limit and an instant renderer.
pub async fn test_app() -> TestApp {
    test_app_with(60_000, Duration::ZERO).await
}

pub async fn test_app_with(rate_limit_per_minute: u32, render_delay: Duration) -> TestApp {
    let db = memory_db().await;
    let renderer = Arc::new(FakeRenderer {
        delay: render_delay,
        calls: AtomicUsize::new(0),
    });
    let config = Arc::new(Config {
        rate_limit_per_minute,
        ..Config::default()
    });
    let state = Arc::new(AppState::new(
        db.clone(),
        renderer.clone(),
        Arc::new(FakeSummarizer),
        config,
    ));
    TestApp {
        router: router(state.clone()),
        db,
        state,
        renderer,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, cookie: Option<&str>, body: Value) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn signup(&self, username: &str, email: &str) -> Response<Body> {
        self.post_json(
            "/auth/signup",
            None,
            serde_json::json!({
                "username": username,
                "email": email,
                "password": PASSWORD,
                "confirm_password": PASSWORD,
            }),
        )
        .await
    }

    /// Signs up and logs in, returning the account id and the `session=...` cookie.
    pub async fn signed_in(&self, username: &str) -> (uuid::Uuid, String) {
        let resp = self.signup(username, &format!("{username}@example.com")).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = self
            .post_json(
                "/auth/login",
                None,
                serde_json::json!({ "username": username, "password": PASSWORD }),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = session_cookie(&resp);
        let body = json_body(resp).await;
        let account_id = body["account_id"].as_str().unwrap().parse().unwrap();
        (account_id, cookie)
    }

    /// Polls a job until it leaves `pending`.
    pub async fn wait_for_job(&self, job_id: &str, cookie: &str) -> Value {
        for _ in 0..500 {
            let resp = self.get(&format!("/summaries/jobs/{job_id}"), Some(cookie)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body = json_body(resp).await;
            if body["status"] != "pending" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} never finished");
    }
}

pub fn session_cookie(resp: &Response<Body>) -> String {
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

pub async fn json_body(resp: Response<Body>) -> Value {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(resp: Response<Body>) -> String {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
