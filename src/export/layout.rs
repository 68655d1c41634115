//! A4 document layout shared by the built-in export and the template editor

use super::template::escape_html;
use crate::types::ProcedureVariable;

const STYLE: &str = r#"    @page { size: A4; margin: 2cm; }
    body { font-family: 'Times New Roman', Times, serif; padding: 40px; width: 100%; margin: 0; line-height: 1.6; box-sizing: border-box; }
    .header { text-align: center; margin-bottom: 30px; }
    .nation { font-weight: bold; font-size: 14pt; text-transform: uppercase; margin: 0; }
    .motto { font-weight: bold; font-size: 14pt; margin: 5px 0 0 0; text-decoration: underline; }
    .title { font-weight: bold; font-size: 16pt; text-transform: uppercase; margin-top: 40px; text-align: center; }
    .content { margin-top: 30px; font-size: 13pt; text-align: justify; }
    .signature-section { margin-top: 50px; display: flex; justify-content: space-between; }
    .signature-box { text-align: center; width: 45%; }"#;

/// Pieces that differ between documents
pub(crate) struct Page<'a> {
    pub head_title: &'a str,
    /// Upper-cased request name printed after `ĐƠN`
    pub title: &'a str,
    pub addressee: &'a str,
    pub student_name: &'a str,
    pub student_id: &'a str,
    /// Pre-rendered body paragraphs
    pub body: &'a str,
    pub date_line: &'a str,
}

pub(crate) fn page(p: &Page<'_>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>{head_title}</title>
  <style>
{style}
  </style>
</head>
<body>
  <div class="header">
    <p class="nation">CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM</p>
    <p class="motto">Độc lập - Tự do - Hạnh phúc</p>
  </div>

  <h2 class="title">ĐƠN {title}</h2>

  <div class="content">
    <p><strong>Kính gửi:</strong> {addressee}</p>
    <p>Tôi tên là: <strong>{student_name}</strong></p>
    <p>Mã số sinh viên: <strong>{student_id}</strong></p>

    <p>Tôi làm đơn này xin trình bày nội dung sau:</p>

    <div style="margin-left: 20px;">
       {body}
    </div>

    <p>Kính mong Quý Khoa xem xét và giải quyết yêu cầu của tôi.</p>
    <p>Tôi xin chân thành cảm ơn.</p>
  </div>

  <div class="signature-section">
     <div class="signature-box"></div>
     <div class="signature-box">
       <p><i>{date_line}</i></p>
       <p><strong>Người làm đơn</strong></p>
       <br><br><br>
       <p>{student_name}</p>
     </div>
  </div>
</body>
</html>"#,
        head_title = p.head_title,
        style = STYLE,
        title = p.title,
        addressee = p.addressee,
        student_name = p.student_name,
        student_id = p.student_id,
        body = p.body,
        date_line = p.date_line,
    )
}

/// Editable template seeded into a procedure without one.
///
/// Uses `{{TITLE}}` when the procedure has no title yet, one labelled
/// `{{name}}` line per variable, or `{{description}}` without variables.
pub fn default_template(title: Option<&str>, variables: &[ProcedureVariable], addressee: &str) -> String {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| escape_html(&t.to_uppercase()))
        .unwrap_or_else(|| "{{TITLE}}".to_string());

    let body = if variables.is_empty() {
        "<p>{{description}}</p>".to_string()
    } else {
        variables
            .iter()
            .map(|v| {
                format!(
                    "<p><strong>{}:</strong> {{{{{}}}}}</p>",
                    escape_html(&v.label),
                    v.name
                )
            })
            .collect::<Vec<_>>()
            .join("\n       ")
    };

    page(&Page {
        head_title: "Mẫu In Ấn",
        title: &title,
        addressee,
        student_name: "{{studentName}}",
        student_id: "{{studentId}}",
        body: &body,
        date_line: "{{date}}",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESSEE: &str = "Ban Chủ nhiệm Khoa Công nghệ Thông tin";

    #[test]
    fn test_default_template_placeholders() {
        let variables = vec![ProcedureVariable {
            name: "course_code".to_string(),
            label: "Mã học phần".to_string(),
            required: true,
            data_type: None,
        }];

        let html = default_template(Some("Phúc khảo điểm thi"), &variables, ADDRESSEE);
        assert!(html.contains("<h2 class=\"title\">ĐƠN PHÚC KHẢO ĐIỂM THI</h2>"));
        assert!(html.contains("<p><strong>Mã học phần:</strong> {{course_code}}</p>"));
        assert!(html.contains("<p><i>{{date}}</i></p>"));
        assert_eq!(html.matches("{{studentName}}").count(), 2);
        assert!(!html.contains("{{description}}"));
    }

    #[test]
    fn test_default_template_escapes_labels() {
        let variables = vec![ProcedureVariable {
            name: "gpa".to_string(),
            label: "Điểm <trung bình> & xếp loại".to_string(),
            required: false,
            data_type: None,
        }];

        let html = default_template(Some("Xác nhận <b>"), &variables, ADDRESSEE);
        assert!(html.contains(
            "<p><strong>Điểm &lt;trung bình&gt; &amp; xếp loại:</strong> {{gpa}}</p>"
        ));
        assert!(html.contains("ĐƠN XÁC NHẬN &lt;B&gt;"));
        assert!(!html.contains("<trung bình>"));
    }

    #[test]
    fn test_default_template_without_title_or_variables() {
        let html = default_template(None, &[], ADDRESSEE);
        assert!(html.contains("ĐƠN {{TITLE}}"));
        assert!(html.contains("<p>{{description}}</p>"));
        assert!(html.contains("<title>Mẫu In Ấn</title>"));
    }
}
