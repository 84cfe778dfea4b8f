//! Application configuration constants
//!
//! Central location for storage keys, fixed labels, resource limits
//! and defaults used throughout the application.

// ===== Persisted State Layout =====

/// Storage key holding the serialized student roster
pub const STUDENTS_KEY: &str = "teacher_app_students";
/// Storage key holding the serialized log entries
pub const LOGS_KEY: &str = "teacher_app_logs";
/// Storage key holding the serialized teacher notes
pub const NOTES_KEY: &str = "teacher_app_notes";

/// Data directory used when none is given on the command line
pub const DEFAULT_DATA_DIR: &str = "./classbook-data";

/// SQLite database file name inside the data directory
pub const DATABASE_FILE: &str = "classbook.sqlite";
/// Settings file name inside the data directory
pub const SETTINGS_FILE: &str = "settings.json";
/// Sub-directory of the data directory receiving CSV exports
pub const EXPORTS_DIR: &str = "exports";

// ===== Starter Roster =====

/// Roster seeded when no student list has ever been persisted: (id, name)
pub const INITIAL_STUDENTS: &[(&str, &str)] = &[
    ("hs01", "Nguyễn Văn An"),
    ("hs02", "Trần Thị Bình"),
    ("hs03", "Lê Minh Cường"),
    ("hs04", "Phạm Thùy Dung"),
    ("hs05", "Hoàng Văn Giang"),
    ("hs06", "Vũ Thị Hà"),
];

/// Avatar URL template; `{seed}` is replaced by the student id
pub const AVATAR_URL_TEMPLATE: &str = "https://picsum.photos/seed/{seed}/100";

// ===== Statistics =====

/// Number of calendar days covered by the behavior timeline (today included)
pub const TIMELINE_DAYS: usize = 30;

/// Display name used when a log entry references a student that no longer exists
pub const DELETED_STUDENT_NAME: &str = "Học sinh đã bị xoá";

// ===== Export =====

/// Header row of the CSV export
pub const EXPORT_HEADERS: &[&str] = &["Học sinh", "Ngày", "Phân loại", "Chi tiết", "Đánh giá", "Nội dung"];

/// Student column value when the student id cannot be resolved
pub const UNKNOWN_STUDENT_NAME: &str = "Không rõ";

/// Prefix of the exported file name, followed by the local date
pub const EXPORT_FILENAME_PREFIX: &str = "Xuat_du_lieu_ghi_nhan_";

/// UTF-8 byte-order marker so spreadsheet tools detect the encoding
pub const UTF8_BOM: &str = "\u{FEFF}";

// ===== AI Advisor =====

/// Maximum number of recent entries sent as context with a suggestion request
pub const RECENT_CONTEXT_LOGS: usize = 5;

/// Default Gemini model
pub const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";

/// Default Gemini REST endpoint
pub const DEFAULT_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted, in order, for the Gemini credential
pub const AI_API_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "API_KEY"];

/// Message shown in place of any AI failure
pub const AI_FALLBACK_MESSAGE: &str = "Đã xảy ra lỗi khi kết nối với AI. Vui lòng thử lại sau.";

/// Stand-in student name for free-form questions not tied to a student
pub const GENERIC_STUDENT_NAME: &str = "một học sinh";
