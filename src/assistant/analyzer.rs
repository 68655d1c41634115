//! Procedure extraction from uploaded documents
//!
//! A scanned form or PDF is sent inline to the LLM, which returns the
//! procedure's metadata, its fillable variables and an HTML print template
//! with `{{variable}}` placeholders.

use crate::error::{PortalError, Result};
use crate::services::{Content, GenerateRequest, TextGenerator};
use crate::types::ProcedureVariable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Message returned to the user for any analysis failure
pub const ANALYSIS_FAILED: &str =
    "Không thể phân tích tài liệu. Vui lòng thử lại hoặc nhập thủ công.";

const ANALYSIS_PROMPT: &str = r#"Hãy đóng vai một chuyên viên hành chính khoa CNTT.
Đọc tài liệu được cung cấp (ảnh scan hoặc file PDF).

Nhiệm vụ 1: Trích xuất thông tin chung.
Nhiệm vụ 2: Xác định các BIẾN SỐ (chỗ trống cần điền).
Nhiệm vụ 3: TẠO MẪU IN ẤN HTML (Quan trọng).

Hãy chuyển đổi toàn bộ nội dung và bố cục của tài liệu này thành mã HTML & CSS inline (để in trên khổ A4).
Trong mã HTML này, hãy thay thế các vị trí điền thông tin bằng cú pháp Handlebars tương ứng với biến số đã tìm được.
Ví dụ: Nếu trong văn bản là "Họ và tên: .................", hãy đổi thành "Họ và tên: {{studentName}}".

Output JSON (No Markdown):
{
  "title": "Tên quy trình",
  "category": "Phân loại",
  "content": "Tóm tắt các bước...",
  "requiredForms": ["Tên file nếu có"],
  "variables": [
     {
       "name": "key_bien",
       "label": "Tên hiển thị",
       "required": true,
       "dataType": "text"
     }
  ],
  "exportTemplate": "<!DOCTYPE html><html>... (Mã HTML trọn vẹn tái hiện lại tài liệu, đã chèn biến {{variable}}) ...</html>"
}
"#;

/// Uploaded document, base64 encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub mime_type: String,
    /// Base64 payload; a `data:<mime>;base64,` prefix is tolerated
    pub data: String,
}

impl DocumentUpload {
    fn payload(&self) -> &str {
        match self.data.split_once(',') {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => &self.data,
        }
    }
}

/// Procedure fields extracted from a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub required_forms: Vec<String>,
    #[serde(default)]
    pub variables: Vec<ProcedureVariable>,
    #[serde(default)]
    pub export_template: String,
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker, then trim
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the model's answer into a draft
pub fn parse_draft(text: &str) -> Result<ProcedureDraft> {
    // The model sometimes answers `null` for list fields
    let mut value: serde_json::Value = serde_json::from_str(&strip_code_fences(text))?;
    if let Some(object) = value.as_object_mut() {
        object.retain(|_, v| !v.is_null());
    }
    Ok(serde_json::from_value(value)?)
}

/// Extracts procedure drafts from documents through the LLM
pub struct DocumentAnalyzer {
    llm: Arc<dyn TextGenerator>,
    temperature: f64,
}

impl DocumentAnalyzer {
    pub fn new(llm: Arc<dyn TextGenerator>, temperature: f64) -> Self {
        Self { llm, temperature }
    }

    pub async fn analyze(&self, document: &DocumentUpload) -> Result<ProcedureDraft> {
        info!("Analyzing uploaded {} document", document.mime_type);

        match self.try_analyze(document).await {
            Ok(draft) => Ok(draft),
            Err(e) => {
                error!("Document analysis error: {}", e);
                Err(PortalError::LlmApi(ANALYSIS_FAILED.to_string()))
            }
        }
    }

    async fn try_analyze(&self, document: &DocumentUpload) -> Result<ProcedureDraft> {
        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content::document(
                document.mime_type.clone(),
                document.payload(),
                ANALYSIS_PROMPT,
            )],
            temperature: self.temperature,
        };

        let text = self.llm.generate(request).await?;
        if text.trim().is_empty() {
            return Err(PortalError::LlmApi("No response from AI".to_string()));
        }

        parse_draft(&text)
    }
}
