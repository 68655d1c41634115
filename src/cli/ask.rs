//! One-shot question to the procedure assistant

use super::helpers::{build_llm, build_store};
use studentdesk_core::{
    assistant::{parse_reply, AssistantReply},
    error::Result,
    Assistant, PortalConfig, Role, User,
};
use tracing::debug;

/// Ask the assistant a single question, optionally as a known student
pub async fn handle(config: PortalConfig, question: String, student: Option<String>) -> Result<()> {
    let store = build_store(&config)?;
    let procedures = store.list_procedures().await?;
    debug!("Answering with {} procedures in the knowledge base", procedures.len());

    let profile = match &student {
        Some(id) => store.get_student(id).await?,
        None => None,
    };
    let user = match (&student, &profile) {
        (_, Some(profile)) => User {
            id: profile.id.clone(),
            name: profile.name.clone(),
            role: Role::Student,
            email: profile.email.clone(),
        },
        (Some(id), None) => User {
            id: id.clone(),
            name: id.clone(),
            role: Role::Student,
            email: format!("{}@{}", id, config.portal.student_email_domain),
        },
        (None, None) => User {
            id: "guest".to_string(),
            name: "Khách".to_string(),
            role: Role::Student,
            email: String::new(),
        },
    };

    let assistant = Assistant::new(
        build_llm(&config),
        config.portal.organization.clone(),
        config.llm.chat_temperature,
    );
    let answer = assistant
        .send_message(&question, &[], &procedures, &user, profile.as_ref())
        .await;

    match parse_reply(&answer) {
        AssistantReply::Text { text } => println!("{}", text),
        AssistantReply::TicketRequest {
            ticket_data,
            response_message,
        } => {
            println!("{}", response_message);
            println!();
            println!("Proposed ticket:");
            println!("  Title: {}", ticket_data.title);
            println!("  Type: {}", ticket_data.kind);
            if !ticket_data.description.is_empty() {
                println!("  Description: {}", ticket_data.description);
            }
        }
    }

    Ok(())
}
