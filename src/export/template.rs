//! Placeholder substitution and the built-in ticket layout

use super::layout::{page, Page};
use crate::types::{Procedure, Ticket};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Printed in place of any field without a value
pub const EMPTY_FIELD: &str = "....................";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}").expect("valid regex"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"));

/// Wording that varies between faculties
#[derive(Debug, Clone)]
pub struct DocumentStyle {
    /// City on the date line
    pub city: String,
    /// Recipient of the request letter
    pub addressee: String,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            city: "Hà Nội".to_string(),
            addressee: "Ban Chủ nhiệm Khoa Công nghệ Thông tin".to_string(),
        }
    }
}

impl DocumentStyle {
    /// Style for a faculty called `organization`
    pub fn new(city: impl Into<String>, organization: &str) -> Self {
        Self {
            city: city.into(),
            addressee: format!("Ban Chủ nhiệm {}", organization),
        }
    }
}

/// `DD/MM/YYYY` for a `YYYY-MM-DD` value; anything else is returned unchanged
pub fn format_iso_date(value: &str) -> String {
    match ISO_DATE.captures(value) {
        Some(c) => format!("{}/{}/{}", &c[3], &c[2], &c[1]),
        None => value.to_string(),
    }
}

/// `<city>, ngày D tháng M năm YYYY`
pub fn document_date_line(city: &str, today: NaiveDate) -> String {
    format!(
        "{}, ngày {} tháng {} năm {}",
        city,
        today.day(),
        today.month(),
        today.year()
    )
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn same_title(procedure: &Procedure, ticket: &Ticket) -> bool {
    procedure.title.trim().to_lowercase() == ticket.title.trim().to_lowercase()
}

/// Render `ticket` with the default style
pub fn render_ticket(ticket: &Ticket, procedures: &[Procedure], today: NaiveDate) -> String {
    render_ticket_with(ticket, procedures, today, &DocumentStyle::default())
}

/// Render `ticket` as printable HTML.
///
/// The procedure whose title matches the ticket's (case and surrounding
/// whitespace ignored) supplies the template.
pub fn render_ticket_with(
    ticket: &Ticket,
    procedures: &[Procedure],
    today: NaiveDate,
    style: &DocumentStyle,
) -> String {
    let date_line = document_date_line(&style.city, today);

    match procedures
        .iter()
        .find(|p| same_title(p, ticket))
        .and_then(Procedure::template)
    {
        Some(template) => fill_template(template, ticket, &date_line),
        None => builtin_layout(ticket, &date_line, style),
    }
}

fn fill_template(template: &str, ticket: &Ticket, date_line: &str) -> String {
    let mut html = template
        .replace("{{title}}", &escape_html(&ticket.title.to_uppercase()))
        .replace("{{studentName}}", &escape_html(&ticket.student_name))
        .replace("{{date}}", &escape_html(date_line))
        .replace("{{description}}", &escape_html(&ticket.description));

    if let Some(id) = &ticket.student_id {
        html = html.replace("{{studentId}}", &escape_html(id));
    }

    if let Some(values) = &ticket.form_values {
        for (key, value) in values {
            let placeholder = format!("{{{{{}}}}}", key);
            html = html.replace(&placeholder, &escape_html(&format_iso_date(value)));
        }
    }

    PLACEHOLDER.replace_all(&html, EMPTY_FIELD).into_owned()
}

fn builtin_layout(ticket: &Ticket, date_line: &str, style: &DocumentStyle) -> String {
    let body = match (&ticket.variables, &ticket.form_values) {
        (Some(variables), Some(values)) => variables
            .iter()
            .map(|v| {
                let value = match values.get(&v.name).filter(|s| !s.is_empty()) {
                    Some(raw) if v.is_date() => escape_html(&format_iso_date(raw)),
                    Some(raw) => escape_html(raw),
                    None => EMPTY_FIELD.to_string(),
                };
                format!("<p><strong>{}:</strong> {}</p>", escape_html(&v.label), value)
            })
            .collect::<String>(),
        _ => format!(
            "<p style=\"white-space: pre-wrap;\">{}</p>",
            escape_html(&ticket.description)
        ),
    };

    let student_name = escape_html(&ticket.student_name);
    let student_id = ticket
        .student_id
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| EMPTY_FIELD.to_string());

    page(&Page {
        head_title: &format!("Đơn {}", escape_html(&ticket.title)),
        title: &escape_html(&ticket.title.to_uppercase()),
        addressee: &style.addressee,
        student_name: &student_name,
        student_id: &student_id,
        body: &body,
        date_line,
    })
}
