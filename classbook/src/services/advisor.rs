//! AI advisor
//!
//! Builds pedagogical prompts from a student's log history and sends them to
//! a text generator. Every failure on the way degrades to a fixed message
//! that is shown to the teacher in place of the answer.

use crate::config::{
    AI_API_KEY_VARS, AI_FALLBACK_MESSAGE, DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL,
    GENERIC_STUDENT_NAME, RECENT_CONTEXT_LOGS,
};
use crate::database::{new_id, Category, LogDetail, LogEntry, Student};
use crate::error::{AppError, Result};
use crate::services::records::Records;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;

/// Something that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Connection settings for the Gemini REST API
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// Take the credential from the first non-empty key variable
    pub fn from_env(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        let api_key = AI_API_KEY_VARS
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty());

        Self {
            api_key,
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::from_env(DEFAULT_AI_MODEL, DEFAULT_AI_BASE_URL)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        if config.api_key.is_none() {
            tracing::warn!("No Gemini API key configured; AI suggestions will be unavailable");
        }

        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Ai("API key not set".to_string()))?;

        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        tracing::debug!("Calling Gemini model {}", self.config.model);

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Ai(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Ai(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Ai(format!(
                "API request failed with status {}: {}",
                status, body
            )));
        }

        parse_response(&body)
    }
}

/// Concatenated text of the first candidate
fn parse_response(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Ai(format!("Failed to parse response: {}", e)))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Ai("Empty response from API".to_string()));
    }

    Ok(text)
}

/// Prompt building and graceful degradation around a text generator
#[derive(Clone)]
pub struct AdvisorService {
    generator: Arc<dyn TextGenerator>,
}

impl AdvisorService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Suggestions for one entry, with a few other recent entries as context
    pub async fn suggest_for_log(
        &self,
        student: &Student,
        log: &LogEntry,
        recent: &[&LogEntry],
    ) -> String {
        let prompt = suggestion_prompt(&student.name, log, recent);
        self.ask(&prompt).await
    }

    /// Suggestions for a stored entry, looked up by id
    pub async fn suggest_for_entry(&self, records: &Records, log_id: &str) -> Result<String> {
        let log = records
            .logs
            .iter()
            .find(|log| log.id == log_id)
            .ok_or_else(|| AppError::Validation(format!("Log entry not found: {}", log_id)))?;
        let student = records
            .student(&log.student_id)
            .ok_or_else(|| AppError::StudentNotFound(log.student_id.clone()))?;

        let recent = recent_context(records, log);
        Ok(self.suggest_for_log(student, log, &recent).await)
    }

    /// Suggestions for a free-form question not tied to any student
    pub async fn suggest_for_question(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question cannot be empty".to_string()));
        }

        let student = Student {
            id: "generic".to_string(),
            name: GENERIC_STUDENT_NAME.to_string(),
            avatar: String::new(),
        };
        let log = LogEntry {
            id: new_id("query"),
            student_id: student.id.clone(),
            date: Utc::now(),
            detail: LogDetail::General,
            content: question.to_string(),
        };

        Ok(self.suggest_for_log(&student, &log, &[]).await)
    }

    /// Whole-history assessment, returned as lightly marked-up HTML
    pub async fn summarize_student(&self, student: &Student, logs: &[&LogEntry]) -> String {
        let mut history: Vec<&LogEntry> = logs.to_vec();
        history.sort_by_key(|log| log.date);

        let prompt = summary_prompt(&student.name, &history);
        match self.generator.generate(&prompt).await {
            Ok(text) => render_summary(&text),
            Err(e) => {
                tracing::warn!("AI summary for {} failed: {}", student.id, e);
                AI_FALLBACK_MESSAGE.to_string()
            }
        }
    }

    async fn ask(&self, prompt: &str) -> String {
        match self.generator.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("AI suggestion failed: {}", e);
                AI_FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

/// Up to five most recent entries of the same student, excluding `log`
pub fn recent_context<'a>(records: &'a Records, log: &LogEntry) -> Vec<&'a LogEntry> {
    let mut others: Vec<&LogEntry> = records
        .logs
        .iter()
        .filter(|other| other.student_id == log.student_id && other.id != log.id)
        .collect();
    others.sort_by(|a, b| b.date.cmp(&a.date));
    others.truncate(RECENT_CONTEXT_LOGS);
    others
}

fn local_date(date: &DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%-d/%-m/%Y").to_string()
}

fn suggestion_prompt(student_name: &str, log: &LogEntry, recent: &[&LogEntry]) -> String {
    let history = recent
        .iter()
        .map(|entry| {
            format!(
                "- Ngày {}: {} ({})",
                local_date(&entry.date),
                entry.content,
                entry.category().label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let history = if history.is_empty() {
        "Chưa có ghi nhận nào gần đây.".to_string()
    } else {
        history
    };

    let (situation, focus) = match log.detail {
        LogDetail::AcademicReview { subject, grade } => (
            format!(
                "- Phân loại: {}\n- Môn học: {}\n- Mức độ hoàn thành: {}\n- Nhận xét chi tiết: \"{}\"",
                log.category().label(),
                subject.label(),
                grade.label(),
                log.content
            ),
            "Các giải pháp cần tập trung vào việc hỗ trợ học tập, tìm ra nguyên nhân và đề xuất phương pháp giúp học sinh tiến bộ trong môn học này.",
        ),
        _ => (
            format!(
                "- Phân loại: {} ({})\n- Nội dung: \"{}\"",
                log.category().label(),
                log.sentiment().map(|s| s.label()).unwrap_or("Không có"),
                log.content
            ),
            "Các giải pháp cần tập trung vào các phương pháp tích cực, khuyến khích thay vì trừng phạt.",
        ),
    };

    format!(
        "Với vai trò là một chuyên gia giáo dục tiểu học và tâm lý học đường giàu kinh nghiệm, \
hãy đưa ra các gợi ý và giải pháp cụ thể, mang tính xây dựng cho tình huống sau:

Học sinh: {name}
Tình huống cần tư vấn (ghi nhận ngày {date}):
{situation}

Bối cảnh bổ sung (một vài ghi nhận gần đây của học sinh {name}):
{history}

Dựa trên thông tin trên, hãy đề xuất 3-4 giải pháp hoặc hướng tiếp cận khả thi mà một giáo viên chủ nhiệm có thể áp dụng. Các giải pháp cần:
1. Phù hợp với lứa tuổi tiểu học.
2. Cung cấp các bước hành động cụ thể.
3. {focus}
4. Ngôn ngữ chuyên nghiệp, đồng cảm và hỗ trợ.

Vui lòng trình bày câu trả lời dưới dạng các gạch đầu dòng rõ ràng.",
        name = student_name,
        date = local_date(&log.date),
        situation = situation,
        history = history,
        focus = focus,
    )
}

fn summary_prompt(student_name: &str, history: &[&LogEntry]) -> String {
    let lines = history
        .iter()
        .map(|log| {
            let details = match (log.category(), log.detail) {
                (_, LogDetail::AcademicReview { subject, grade }) => format!(
                    "Môn {} ({}): {}",
                    subject.label(),
                    grade.label(),
                    log.content
                ),
                (Category::Behavior, _) => format!(
                    "Hành vi ({}): {}",
                    log.sentiment().map(|s| s.label()).unwrap_or("Không có"),
                    log.content
                ),
                (category, _) => format!("{}: {}", category.label(), log.content),
            };
            format!("- Ngày {}: {}", local_date(&log.date), details)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Với vai trò là một chuyên gia giáo dục tiểu học và tâm lý học đường, \
hãy phân tích toàn bộ các ghi nhận sau đây về học sinh {name}.

Lịch sử ghi nhận:
{lines}

Dựa trên toàn bộ lịch sử ghi nhận này, hãy đưa ra một bản tổng hợp và đánh giá toàn diện về học sinh. Báo cáo của bạn cần bao gồm 3 phần rõ ràng với tiêu đề in đậm:
1. **Điểm mạnh nổi bật:** Xác định các xu hướng hành vi tích cực và các môn học mà học sinh thể hiện tốt.
2. **Lĩnh vực cần cải thiện:** Chỉ ra các thách thức về hành vi hoặc học tập mà học sinh đang gặp phải một cách nhất quán.
3. **Gợi ý chiến lược cho giáo viên:** Đề xuất 2-3 chiến lược cụ thể, khả thi mà giáo viên có thể áp dụng để hỗ trợ sự phát triển toàn diện của học sinh, dựa trên những phân tích ở trên.

Vui lòng trình bày với văn phong chuyên nghiệp, mang tính xây dựng, tích cực và sử dụng định dạng Markdown cho các tiêu đề và danh sách.",
        name = student_name,
        lines = lines,
    )
}

/// Escape HTML, then turn `**bold**` into `<strong>` and `* item` lines,
/// indented ones included, into `<li>`
pub fn render_summary(text: &str) -> String {
    text.lines()
        .map(|line| {
            let escaped = escape_html(line);
            let body = escaped.trim_start();
            let indent = &escaped[..escaped.len() - body.len()];
            match body.strip_prefix("* ") {
                Some(item) => format!("{}<li>{}</li>", indent, convert_bold(item)),
                None => convert_bold(&escaped),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(text: &str) -> String {
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

fn convert_bold(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str("<strong>");
        out.push_str(&after[..end]);
        out.push_str("</strong>");
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}
