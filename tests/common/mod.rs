//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use studentdesk_core::{
    api::{ApiServer, AppState},
    error::{PortalError, Result},
    services::GenerateRequest,
    types::{Account, Procedure, ProcedureVariable, Role},
    MemoryStore, PortalConfig, PortalStore, TextGenerator,
};
use tower::ServiceExt;

pub const STUDENT_ID: &str = "22004001";
pub const STUDENT_PASSWORD: &str = "matkhau";

/// Text generator that replays canned replies and records each request
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|r| r.to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| PortalError::LlmApi("no scripted reply left".to_string()))
    }
}

/// Knowledge base entry with a custom print template
pub fn leave_procedure() -> Procedure {
    Procedure {
        id: "proc_leave".to_string(),
        title: "Bảo lưu kết quả học tập".to_string(),
        content: "Sinh viên nộp đơn bảo lưu tại văn phòng khoa trước kỳ học.".to_string(),
        category: "Đào tạo".to_string(),
        required_forms: vec!["Đơn xin bảo lưu".to_string()],
        variables: vec![ProcedureVariable {
            name: "semester".to_string(),
            label: "Học kỳ".to_string(),
            required: true,
            data_type: None,
        }],
        export_template: Some(
            "<h1>{{title}}</h1><p>{{studentName}} - {{studentId}}</p><p>{{semester}}</p><p>{{reason}}</p><p>{{date}}</p>"
                .to_string(),
        ),
    }
}

/// Store seeded with one procedure and one student account
pub async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::with_procedures(vec![leave_procedure()]));
    store
        .add_account(&Account {
            username: STUDENT_ID.to_string(),
            password: Some(STUDENT_PASSWORD.to_string()),
            role: Role::Student,
            full_name: "Nguyễn Văn A".to_string(),
            student_id: Some(STUDENT_ID.to_string()),
        })
        .await
        .unwrap();
    store
}

pub async fn test_app(llm: Option<Arc<dyn TextGenerator>>) -> (Router, AppState) {
    let store = seeded_store().await;
    let state = AppState::new(store, llm, &PortalConfig::default());
    (ApiServer::build_router(state.clone()), state)
}

/// Send a request and decode the JSON body (Null when empty or not JSON)
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, text) = send_raw(router, method, uri, token, body).await;
    (status, serde_json::from_str(&text).unwrap_or(Value::Null))
}

/// Send a request and return the body as text
pub async fn send_raw(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, String) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

pub async fn login(router: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

pub async fn login_admin(router: &Router) -> String {
    login(router, "admin", "admin").await
}

pub async fn login_student(router: &Router) -> String {
    login(router, STUDENT_ID, STUDENT_PASSWORD).await
}
