//! System instruction assembly for the assistant

use crate::types::{StudentProfile, User};
use chrono::NaiveDate;

/// Everything the system instruction is built from
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    /// Faculty the assistant speaks for
    pub organization: &'a str,
    pub today: NaiveDate,
    pub user: &'a User,
    pub profile: Option<&'a StudentProfile>,
    /// Output of [`super::retrieve_context`]; empty when nothing matched
    pub context: &'a str,
}

/// `d/m/yyyy`, the way Vietnamese locales print a date
pub fn vi_date(date: NaiveDate) -> String {
    date.format("%-d/%-m/%Y").to_string()
}

fn profile_block(profile: Option<&StudentProfile>) -> String {
    let Some(p) = profile else {
        return "Không có thông tin chi tiết sinh viên.".to_string();
    };

    format!(
        "THÔNG TIN SINH VIÊN CHI TIẾT (Dùng để điền tự động):
- Họ tên (name): {name}
- Mã số SV (id): {id}
- Lớp (className/classId): {class_name} ({class_id})
- Giới tính (gender): {gender}
- Ngày sinh (dob): {dob}
- Nơi sinh (placeOfBirth): {place_of_birth}
- Địa chỉ (address): {address}
- CCCD/CMND (identityCard): {identity_card}
- Email: {email}
- SĐT (phone): {phone}
- Trạng thái (status): {status}
- Ngành học (majorName): {major_name}
- Chuyên ngành (specialization): {specialization}",
        name = p.name,
        id = p.id,
        class_name = p.class_name,
        class_id = p.class_id,
        gender = p.gender.as_str(),
        dob = p.dob,
        place_of_birth = p.place_of_birth,
        address = p.address,
        identity_card = p.identity_card,
        email = p.email,
        phone = p.phone,
        status = p.status.as_str(),
        major_name = p.major_name,
        specialization = p
            .specialization
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("Không"),
    )
}

/// Build the system instruction sent with every assistant turn
pub fn build_system_instruction(ctx: &PromptContext<'_>) -> String {
    let today = ctx.today.format("%Y-%m-%d").to_string();
    let knowledge = if ctx.context.is_empty() {
        "Không tìm thấy quy trình cụ thể trong cơ sở dữ liệu hiện tại."
    } else {
        ctx.context
    };

    format!(
        r#"Bạn là Trợ lý ảo AI của {organization}.

THÔNG TIN NGỮ CẢNH:
- Thời gian hệ thống: {today} ({today_display})
- Người dùng: {user_name} ({role})
{profile}

Nhiệm vụ của bạn là hỗ trợ sinh viên và giảng viên giải đáp thắc mắc về các quy trình, thủ tục nội bộ.

DỮ LIỆU QUY TRÌNH NỘI BỘ (Knowledge Base):
{knowledge}

HƯỚNG DẪN TRẢ LỜI & ĐIỀN ĐƠN (AUTO-FILL):
1. Nếu người dùng muốn thực hiện một thủ tục, hãy TRÍCH XUẤT thông tin và trả về JSON.

   Kiểm tra xem quy trình đó có danh sách "Variables" hay không.
   - Nếu có, trích xuất thông tin để điền vào 'formValues'.
   - Auto-fill: Đối chiếu tên biến (Variable Name/Label) với "THÔNG TIN SINH VIÊN". Nếu trùng khớp ý nghĩa, hãy TỰ ĐỘNG ĐIỀN giá trị.
     Quy tắc ánh xạ:
     + 'student_name' / 'Họ và tên' -> Lấy từ Họ tên.
     + 'student_id' / 'Mã sinh viên' / 'MSSV' -> Lấy từ Mã số SV.
     + 'student_class' / 'Lớp' -> Lấy từ Mã lớp hoặc Tên lớp.
     + 'phone_number' / 'SĐT' -> Lấy từ SĐT.
     + 'email' -> Lấy từ Email.
     + 'dob' / 'Ngày sinh' -> Lấy từ Ngày sinh.
     + 'place_of_birth' / 'Nơi sinh' -> Lấy từ Nơi sinh.

   - Xử lý NGÀY THÁNG (dataType: 'date'):
     + Nếu người dùng nói "hôm nay", điền: "{today}".
     + Nếu nói "ngày mai", hãy tính toán dựa trên ngày hệ thống.
     + Luôn trả về định dạng YYYY-MM-DD cho trường kiểu date.

   Cấu trúc JSON bắt buộc (đặt trong khối ```json ... ```):
   {{
     "isTicketRequest": true,
     "ticketData": {{
       "title": "Tiêu đề ngắn gọn",
       "type": "Loại hồ sơ",
       "description": "Nội dung tóm tắt",
       "variables": [ ... ],
       "formValues": {{
         "var_name": "Giá trị",
         "date_field": "YYYY-MM-DD"
       }}
     }},
     "responseMessage": "Câu trả lời xác nhận."
   }}

2. Nếu không phải yêu cầu làm đơn, trả lời bằng văn bản Markdown bình thường.
3. Nếu có biểu mẫu, dùng format "[Ten_File](download:Ten_File)".
"#,
        organization = ctx.organization,
        today = today,
        today_display = vi_date(ctx.today),
        user_name = ctx.user.name,
        role = ctx.user.role,
        profile = profile_block(ctx.profile),
        knowledge = knowledge,
    )
}
