//! Assistant chat integration tests
//!
//! Exercise the chat endpoints with a scripted text generator standing in
//! for the hosted LLM.

mod common;

use axum::http::{Method, StatusCode};
use common::{login_student, send, test_app, ScriptedLlm, STUDENT_ID};
use serde_json::json;
use std::sync::Arc;
use studentdesk_core::{
    assistant::{CONNECTION_FALLBACK, EMPTY_REPLY_FALLBACK},
    services::Part,
    TextGenerator,
};

fn as_generator(llm: &Arc<ScriptedLlm>) -> Option<Arc<dyn TextGenerator>> {
    Some(llm.clone() as Arc<dyn TextGenerator>)
}

#[tokio::test]
async fn test_empty_history_shows_welcome() {
    let (router, _state) = test_app(None).await;
    let token = login_student(&router).await;

    let (status, history) = send(&router, Method::GET, "/chat/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["id"], "welcome");
    assert_eq!(history[0]["role"], "model");
}

#[tokio::test]
async fn test_ticket_intent_short_circuits_llm() {
    let llm = ScriptedLlm::replying(&[]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    let (status, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Mình muốn làm đơn xin bảng điểm" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["kind"], "ticket_intent");
    assert_eq!(outcome["draft"]["title"], "Xin bảng điểm");
    assert_eq!(outcome["draft"]["type"], "Đào tạo");
    assert_eq!(llm.request_count(), 0);

    // Nothing was stored
    let (_, history) = send(&router, Method::GET, "/chat/history", Some(&token), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_question_is_answered_with_retrieved_context() {
    let llm = ScriptedLlm::replying(&["Bạn cần nộp **Đơn xin bảo lưu** tại văn phòng khoa."]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    let (status, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "bảo lưu kết quả" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["kind"], "reply");
    assert_eq!(outcome["userMessage"]["text"], "bảo lưu kết quả");
    assert!(outcome["reply"]["text"].as_str().unwrap().contains("Đơn xin bảo lưu"));
    assert!(outcome.get("ticketDraft").is_none());

    let requests = llm.requests.lock().unwrap();
    let request = &requests[0];
    let instruction = request.system_instruction.as_deref().unwrap();
    assert!(instruction.contains("--- QUY TRÌNH: Bảo lưu kết quả học tập ---"));
    assert!(instruction.contains("Nguyễn Văn A"));
    // The welcome message never reaches the model
    assert_eq!(request.contents.len(), 1);
    assert!(matches!(&request.contents[0].parts[0], Part::Text { text } if text == "bảo lưu kết quả"));
    drop(requests);

    let (_, history) = send(&router, Method::GET, "/chat/history", Some(&token), None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "model");
}

#[tokio::test]
async fn test_reply_with_ticket_proposal() {
    let reply = r#"```json
{
  "isTicketRequest": true,
  "ticketData": {
    "title": "Bảo lưu kết quả học tập",
    "type": "Đào tạo",
    "description": "Bảo lưu HK2",
    "formValues": { "semester": "HK2 2024-2025" }
  },
  "responseMessage": "Mình đã điền sẵn đơn, bạn kiểm tra lại nhé."
}
```"#;
    let llm = ScriptedLlm::replying(&[reply]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    let (_, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Giúp mình điền đơn bảo lưu", "detectIntent": false })),
    )
    .await;
    assert_eq!(outcome["kind"], "reply");
    let draft = &outcome["ticketDraft"];
    assert_eq!(draft["title"], "Bảo lưu kết quả học tập");
    assert_eq!(draft["formValues"]["semester"], "HK2 2024-2025");

    let (status, created) = send(
        &router,
        Method::POST,
        "/chat/tickets",
        Some(&token),
        Some(draft.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["ticket"]["studentId"], STUDENT_ID);
    assert!(created["message"]["text"]
        .as_str()
        .unwrap()
        .contains("Đã tạo hồ sơ thành công"));

    let (_, tickets) = send(&router, Method::GET, "/tickets", Some(&token), None).await;
    assert_eq!(tickets.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ticket_proposal_with_numeric_form_values() {
    let reply = r#"{"isTicketRequest": true, "ticketData": {"title": "Xin bảng điểm", "type": "Đào tạo",
"description": "", "variables": [{"name": "semester"}], "formValues": {"semester": 2}}}"#;
    let llm = ScriptedLlm::replying(&[reply]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    let (_, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Điền giúp mình đơn", "detectIntent": false })),
    )
    .await;
    assert_eq!(outcome["kind"], "reply");
    let draft = &outcome["ticketDraft"];
    assert_eq!(draft["formValues"]["semester"], "2");
    assert_eq!(draft["variables"][0]["label"], "semester");
}

#[tokio::test]
async fn test_blank_model_reply_uses_fallback() {
    let llm = ScriptedLlm::replying(&[""]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    let (_, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Học phí kỳ này bao nhiêu?" })),
    )
    .await;
    assert_eq!(outcome["reply"]["text"], EMPTY_REPLY_FALLBACK);
}

#[tokio::test]
async fn test_assistant_offline_without_llm() {
    let (router, _state) = test_app(None).await;
    let token = login_student(&router).await;

    let (status, outcome) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Học phí kỳ này bao nhiêu?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["reply"]["text"], CONNECTION_FALLBACK);
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let (router, _state) = test_app(None).await;
    let token = login_student(&router).await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_history_returns_welcome() {
    let llm = ScriptedLlm::replying(&["Chào bạn!"]);
    let (router, _state) = test_app(as_generator(&llm)).await;
    let token = login_student(&router).await;

    send(
        &router,
        Method::POST,
        "/chat/messages",
        Some(&token),
        Some(json!({ "text": "Xin chào" })),
    )
    .await;

    let (status, welcome) = send(&router, Method::DELETE, "/chat/history", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(welcome["id"], "welcome");

    let (_, history) = send(&router, Method::GET, "/chat/history", Some(&token), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_suggestions_are_distinct() {
    let (router, _state) = test_app(None).await;
    let token = login_student(&router).await;

    let (status, suggestions) =
        send(&router, Method::GET, "/chat/suggestions?count=3", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let mut items: Vec<&str> = suggestions
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert_eq!(items.len(), 3);
    items.sort();
    items.dedup();
    assert_eq!(items.len(), 3);
}
