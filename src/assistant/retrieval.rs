//! Keyword retrieval over the procedure knowledge base

use crate::types::Procedure;

/// Query words at or below this many characters never match on their own
const MIN_KEYWORD_CHARS: usize = 3;

fn matches(procedure: &Procedure, query: &str) -> bool {
    let title = procedure.title.to_lowercase();
    let content = procedure.content.to_lowercase();

    if title.contains(query) || content.contains(query) {
        return true;
    }

    query
        .split(' ')
        .filter(|word| word.chars().count() > MIN_KEYWORD_CHARS)
        .any(|word| title.contains(word) || content.contains(word))
}

fn render(procedure: &Procedure) -> String {
    let mut block = format!(
        "--- QUY TRÌNH: {} ---\nPhân loại: {}\nNội dung:\n{}\nBiểu mẫu đi kèm: {}",
        procedure.title,
        procedure.category,
        procedure.content,
        procedure.required_forms.join(", ")
    );

    if !procedure.variables.is_empty() {
        let variables = serde_json::to_string(&procedure.variables).unwrap_or_default();
        block.push_str("\nCác trường thông tin cần điền (Variables): ");
        block.push_str(&variables);
    }

    block
}

/// Render every procedure relevant to `query` as a context block.
///
/// A procedure is relevant when its title or content contains the whole
/// lower-cased query, or any query word longer than three characters.
/// Returns an empty string when nothing matches.
pub fn retrieve_context(query: &str, knowledge_base: &[Procedure]) -> String {
    let query = query.to_lowercase();

    knowledge_base
        .iter()
        .filter(|p| matches(p, &query))
        .map(render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProcedureVariable;

    fn procedure(title: &str, content: &str) -> Procedure {
        Procedure {
            id: title.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            category: "Đào tạo".to_string(),
            required_forms: vec!["Mẫu 01".to_string(), "Mẫu 02".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_match_renders_block() {
        let kb = vec![
            procedure("Phúc khảo điểm thi", "Nộp đơn trong 7 ngày"),
            procedure("Mượn phòng Lab", "Liên hệ văn phòng"),
        ];

        let context = retrieve_context("Thủ tục PHÚC KHẢO thế nào", &kb);
        assert_eq!(
            context,
            "--- QUY TRÌNH: Phúc khảo điểm thi ---\nPhân loại: Đào tạo\nNội dung:\nNộp đơn trong 7 ngày\nBiểu mẫu đi kèm: Mẫu 01, Mẫu 02"
        );
    }

    #[test]
    fn test_short_words_do_not_match() {
        let kb = vec![procedure("Xin bảng điểm", "Nộp tại phòng đào tạo")];
        // "xin" and "tôi" are too short to match by themselves
        assert_eq!(retrieve_context("tôi xin", &kb), "");
    }

    #[test]
    fn test_whole_query_match_and_variables() {
        let mut p = procedure("Bảo lưu", "Bảo lưu kết quả học tập");
        p.variables = vec![ProcedureVariable {
            name: "reason".to_string(),
            label: "Lý do".to_string(),
            required: true,
            data_type: None,
        }];

        let context = retrieve_context("kết quả", &[p]);
        assert!(context.ends_with(
            "\nCác trường thông tin cần điền (Variables): [{\"name\":\"reason\",\"label\":\"Lý do\",\"required\":true}]"
        ));
    }

    #[test]
    fn test_multiple_matches_joined_with_blank_line() {
        let kb = vec![
            procedure("Xin bảng điểm", "a"),
            procedure("Bảng điểm tiếng Anh", "b"),
        ];
        let context = retrieve_context("bảng điểm", &kb);
        assert_eq!(context.matches("--- QUY TRÌNH").count(), 2);
        assert!(context.contains("Mẫu 02\n\n--- QUY TRÌNH: Bảng điểm tiếng Anh"));
    }

    #[test]
    fn test_empty_knowledge_base() {
        assert_eq!(retrieve_context("bất kỳ", &[]), "");
    }
}
