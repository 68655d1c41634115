//! Procedure (knowledge base) endpoints

use super::auth::{AdminUser, CurrentUser};
use super::error::ApiResult;
use super::events::Event;
use super::state::AppState;
use crate::assistant::analyzer::ANALYSIS_FAILED;
use crate::assistant::{DocumentUpload, ProcedureDraft};
use crate::error::PortalError;
use crate::export::default_template;
use crate::storage::ActivityEntry;
use crate::types::{Procedure, ProcedureVariable, Severity};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

/// Procedure as submitted by the editor; the id is optional on create
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcedureInput {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub required_forms: Vec<String>,
    pub variables: Vec<ProcedureVariable>,
    pub export_template: Option<String>,
}

impl ProcedureInput {
    fn into_procedure(self, id: String) -> ApiResult<Procedure> {
        if self.title.trim().is_empty() {
            return Err(PortalError::InvalidOperation("Vui lòng nhập tên quy trình".to_string()).into());
        }
        Ok(Procedure {
            id,
            title: self.title,
            content: self.content,
            category: self.category,
            required_forms: self.required_forms,
            variables: self.variables,
            export_template: self.export_template,
        })
    }
}

pub async fn list_procedures_handler(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> ApiResult<Json<Vec<Procedure>>> {
    Ok(Json(state.store.list_procedures().await?))
}

pub async fn create_procedure_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(input): Json<ProcedureInput>,
) -> ApiResult<(StatusCode, Json<Procedure>)> {
    let id = match input.id.trim() {
        "" => format!("proc_{}", Utc::now().timestamp_millis()),
        id => id.to_string(),
    };
    let procedure = input.into_procedure(id)?;

    state.store.add_procedure(&procedure).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "THÊM QUY TRÌNH",
                format!("Đã thêm quy trình mới: {}", procedure.title),
            )
            .by(&admin),
        )
        .await;
    state.events.publish(Event::procedure_changed(procedure.id.clone()));

    Ok((StatusCode::CREATED, Json(procedure)))
}

pub async fn update_procedure_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(input): Json<ProcedureInput>,
) -> ApiResult<Json<Procedure>> {
    let procedure = input.into_procedure(id)?;

    state.store.update_procedure(&procedure).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "CẬP NHẬT QUY TRÌNH",
                format!("Đã cập nhật quy trình: {}", procedure.title),
            )
            .by(&admin),
        )
        .await;
    state.events.publish(Event::procedure_changed(procedure.id.clone()));

    Ok(Json(procedure))
}

pub async fn delete_procedure_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let title = state
        .store
        .list_procedures()
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .map(|p| p.title)
        .unwrap_or_else(|| id.clone());

    state.store.delete_procedure(&id).await?;
    state
        .log_activity(
            ActivityEntry::new("XÓA QUY TRÌNH", format!("Đã xóa quy trình: {}", title))
                .by(&admin)
                .with_kind(Severity::Warning),
        )
        .await;
    state.events.publish(Event::procedure_changed(id));

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateQuery {
    /// Seed from an existing procedure's title and variables
    pub id: Option<String>,
    /// Title to use when no procedure is given
    pub title: Option<String>,
}

/// Default print template for a procedure
pub async fn template_handler(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<TemplateQuery>,
) -> ApiResult<Html<String>> {
    let procedure = match &query.id {
        Some(id) => Some(
            state
                .store
                .list_procedures()
                .await?
                .into_iter()
                .find(|p| &p.id == id)
                .ok_or_else(|| PortalError::NotFound(format!("procedure {}", id)))?,
        ),
        None => None,
    };

    let (title, variables) = match &procedure {
        Some(p) => (Some(p.title.as_str()), p.variables.as_slice()),
        None => (query.title.as_deref(), &[][..]),
    };

    Ok(Html(default_template(title, variables, &state.style.addressee)))
}

/// Extract a procedure draft from an uploaded document
pub async fn analyze_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(upload): Json<DocumentUpload>,
) -> ApiResult<Json<ProcedureDraft>> {
    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| PortalError::LlmApi(ANALYSIS_FAILED.to_string()))?;
    Ok(Json(analyzer.analyze(&upload).await?))
}
