//! Record models
//!
//! Rust types for the three persisted collections: students, log entries
//! and teacher notes. Enumerations serialize to their Vietnamese labels so
//! the stored JSON is the same shape the notebook has always written.

use crate::config::AVATAR_URL_TEMPLATE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new record id such as `log_3f2a...`
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Kind of observation recorded in a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Hành vi")]
    Behavior,
    #[serde(rename = "Ghi chú Học tập")]
    AcademicNote,
    #[serde(rename = "Đánh giá Môn học")]
    AcademicReview,
    #[serde(rename = "Chung")]
    General,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Self::Behavior,
        Self::AcademicNote,
        Self::AcademicReview,
        Self::General,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Behavior => "Hành vi",
            Self::AcademicNote => "Ghi chú Học tập",
            Self::AcademicReview => "Đánh giá Môn học",
            Self::General => "Chung",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tone of a behavior observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "Tích cực")]
    Positive,
    #[serde(rename = "Bình thường")]
    Neutral,
    #[serde(rename = "Cần cải thiện")]
    NeedsImprovement,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Self::Positive, Self::Neutral, Self::NeedsImprovement];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "Tích cực",
            Self::Neutral => "Bình thường",
            Self::NeedsImprovement => "Cần cải thiện",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion level given in an academic review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "Hoàn thành xuất sắc")]
    Excellent,
    #[serde(rename = "Hoàn thành tốt")]
    Good,
    #[serde(rename = "Hoàn thành")]
    Completed,
    #[serde(rename = "Chưa hoàn thành")]
    Incomplete,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Self::Excellent, Self::Good, Self::Completed, Self::Incomplete];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Hoàn thành xuất sắc",
            Self::Good => "Hoàn thành tốt",
            Self::Completed => "Hoàn thành",
            Self::Incomplete => "Chưa hoàn thành",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Primary-school subjects that can receive an academic review.
///
/// Declaration order is the order subjects are listed and reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "Tiếng Việt")]
    VietnameseLanguage,
    #[serde(rename = "Toán")]
    Mathematics,
    #[serde(rename = "Khoa học")]
    Science,
    #[serde(rename = "Lịch sử và Địa lí")]
    HistoryGeography,
    #[serde(rename = "Công nghệ")]
    Technology,
    #[serde(rename = "Đạo đức")]
    Ethics,
    /// Hoạt động trải nghiệm
    #[serde(rename = "HĐTN")]
    ExperientialActivities,
}

impl Subject {
    pub const ALL: [Subject; 7] = [
        Self::VietnameseLanguage,
        Self::Mathematics,
        Self::Science,
        Self::HistoryGeography,
        Self::Technology,
        Self::Ethics,
        Self::ExperientialActivities,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::VietnameseLanguage => "Tiếng Việt",
            Self::Mathematics => "Toán",
            Self::Science => "Khoa học",
            Self::HistoryGeography => "Lịch sử và Địa lí",
            Self::Technology => "Công nghệ",
            Self::Ethics => "Đạo đức",
            Self::ExperientialActivities => "HĐTN",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A student on the class roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Avatar image URI
    pub avatar: String,
}

impl Student {
    /// Build a student whose avatar is seeded from its id
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let avatar = AVATAR_URL_TEMPLATE.replace("{seed}", &id);
        Self {
            id,
            name: name.into(),
            avatar,
        }
    }
}

/// Category-dependent part of a log entry.
///
/// Serialized inline with the entry, tagged by its `category` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum LogDetail {
    #[serde(rename = "Hành vi")]
    Behavior {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sentiment: Option<Sentiment>,
    },
    #[serde(rename = "Ghi chú Học tập")]
    AcademicNote,
    #[serde(rename = "Đánh giá Môn học")]
    AcademicReview { subject: Subject, grade: Grade },
    #[serde(rename = "Chung")]
    General,
}

impl LogDetail {
    pub const fn category(&self) -> Category {
        match self {
            Self::Behavior { .. } => Category::Behavior,
            Self::AcademicNote => Category::AcademicNote,
            Self::AcademicReview { .. } => Category::AcademicReview,
            Self::General => Category::General,
        }
    }
}

/// A single dated observation about one student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub student_id: String,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: LogDetail,
    pub content: String,
}

impl LogEntry {
    pub fn category(&self) -> Category {
        self.detail.category()
    }

    /// Sentiment of a behavior entry, if one was chosen
    pub fn sentiment(&self) -> Option<Sentiment> {
        match self.detail {
            LogDetail::Behavior { sentiment } => sentiment,
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<Subject> {
        match self.detail {
            LogDetail::AcademicReview { subject, .. } => Some(subject),
            _ => None,
        }
    }

    pub fn grade(&self) -> Option<Grade> {
        match self.detail {
            LogDetail::AcademicReview { grade, .. } => Some(grade),
            _ => None,
        }
    }
}

/// A to-do style note kept by the teacher, unrelated to any student
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Note {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Create log entry request for a single student
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub student_id: String,
    #[serde(flatten)]
    pub detail: LogDetail,
    pub content: String,
}

/// Create the same log entry for several students at once
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBulkLogRequest {
    pub student_ids: Vec<String>,
    #[serde(flatten)]
    pub detail: LogDetail,
    pub content: String,
}
