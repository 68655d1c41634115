//! Quick-action suggestions offered next to the chat box

use rand::seq::SliceRandom;

pub const DEFAULT_SUGGESTION_COUNT: usize = 4;

pub const SUGGESTION_POOL: [&str; 14] = [
    "Thủ tục xác nhận SV",
    "Phúc khảo điểm thi",
    "Mượn phòng Lab",
    "Bảo lưu kết quả",
    "Đăng ký đề tài tốt nghiệp",
    "Xin bảng điểm",
    "Cấp lại thẻ sinh viên",
    "Lịch tiếp sinh viên",
    "Quy chế đào tạo",
    "Liên hệ Giáo vụ",
    "Đăng ký học phần",
    "Xét tốt nghiệp",
    "Học bổng khuyến khích",
    "Giấy vay vốn ngân hàng",
];

/// Pick `count` distinct suggestions at random
pub fn suggestions(count: usize) -> Vec<&'static str> {
    let mut rng = rand::thread_rng();
    SUGGESTION_POOL
        .choose_multiple(&mut rng, count)
        .copied()
        .collect()
}
