//! Ticket intent detection run before a message reaches the LLM

use crate::types::TicketDraft;

/// Phrases that mark a message as a request to file something
const TRIGGERS: &[&str] = &["tạo hồ sơ", "làm đơn", "xin giấy", "đăng ký", "nộp đơn"];

/// Type used when no specific pattern matches
pub const DEFAULT_TICKET_TYPE: &str = "Hành chính";

struct Pattern {
    phrase: &'static str,
    title: &'static str,
    kind: &'static str,
}

/// Checked in order; the first hit wins
const PATTERNS: &[Pattern] = &[
    Pattern {
        phrase: "xác nhận sinh viên",
        title: "Xin giấy xác nhận sinh viên",
        kind: "Hành chính",
    },
    Pattern {
        phrase: "bảng điểm",
        title: "Xin bảng điểm",
        kind: "Đào tạo",
    },
    Pattern {
        phrase: "phúc khảo",
        title: "Phúc khảo điểm thi",
        kind: "Đào tạo",
    },
    Pattern {
        phrase: "bảo lưu",
        title: "Xin bảo lưu kết quả",
        kind: "Công tác sinh viên",
    },
    Pattern {
        phrase: "mượn phòng",
        title: "Đăng ký phòng Lab",
        kind: "Cơ sở vật chất",
    },
];

/// Detect a ticket request in `text`.
///
/// Returns a draft with the original text as description, or `None` when no
/// trigger phrase is present. An unrecognised request gets an empty title so
/// the user can fill it in.
pub fn detect_ticket_intent(text: &str) -> Option<TicketDraft> {
    let lower = text.to_lowercase();

    if !TRIGGERS.iter().any(|t| lower.contains(t)) {
        return None;
    }

    let specific = PATTERNS.iter().find(|p| lower.contains(p.phrase));

    Some(TicketDraft {
        title: specific.map(|p| p.title).unwrap_or_default().to_string(),
        kind: specific.map(|p| p.kind).unwrap_or(DEFAULT_TICKET_TYPE).to_string(),
        description: text.to_string(),
        variables: None,
        form_values: None,
    })
}
