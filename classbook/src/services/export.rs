//! CSV export service
//!
//! Exports the log entries of a chosen set of students over a date range
//! as a UTF-8 CSV file that spreadsheet tools open with diacritics intact.

use crate::config::{EXPORT_FILENAME_PREFIX, EXPORT_HEADERS, UNKNOWN_STUDENT_NAME, UTF8_BOM};
use crate::database::LogEntry;
use crate::error::{AppError, Result};
use crate::services::records::Records;
use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// How far back an export reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateRange {
    /// Since the most recent Sunday
    #[serde(rename = "week")]
    Week,
    /// Since the first day of the current month
    #[default]
    #[serde(rename = "month")]
    Month,
    /// Since the first day of the month three months ago
    #[serde(rename = "3month")]
    ThreeMonths,
    #[serde(rename = "all")]
    All,
}

impl DateRange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::ThreeMonths => "3month",
            Self::All => "all",
        }
    }

    /// Inclusive lower bound of the range at local midnight in `now`'s
    /// timezone, or `None` when the range is unbounded.
    pub fn start_at<Tz: TimeZone>(self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let today = now.date_naive();
        let first_of_month = today - Duration::days(i64::from(today.day0()));

        let start = match self {
            Self::Week => today - Duration::days(i64::from(today.weekday().num_days_from_sunday())),
            Self::Month => first_of_month,
            Self::ThreeMonths => first_of_month
                .checked_sub_months(Months::new(3))
                .unwrap_or(NaiveDate::MIN),
            Self::All => return None,
        };

        Some(local_midnight(&now.timezone(), start))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateRange {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "3month" => Ok(Self::ThreeMonths),
            "all" => Ok(Self::All),
            other => Err(AppError::Validation(format!("Unknown date range: {}", other))),
        }
    }
}

/// Students and period to export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub student_ids: HashSet<String>,
    /// `None` means the range preselected in settings
    #[serde(default)]
    pub range: Option<DateRange>,
}

impl ExportRequest {
    /// Fill in the range when the caller did not choose one
    pub fn with_default_range(mut self, default: DateRange) -> Self {
        self.range = self.range.or(Some(default));
        self
    }

    pub fn effective_range(&self) -> DateRange {
        self.range.unwrap_or_default()
    }
}

/// One formatted CSV data row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRow {
    pub student: String,
    pub date: String,
    pub category: String,
    pub subject: String,
    /// Grade for reviews, sentiment for behavior entries
    pub assessment: String,
    pub content: String,
}

impl ExportRow {
    fn fields(&self) -> [&str; 6] {
        [
            &self.student,
            &self.date,
            &self.category,
            &self.subject,
            &self.assessment,
            &self.content,
        ]
    }
}

/// A rendered export ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub contents: String,
    pub row_count: usize,
}

/// Entries of the selected students dated on or after the range start, newest first
pub fn select_logs<'a, Tz: TimeZone>(
    records: &'a Records,
    req: &ExportRequest,
    now: &DateTime<Tz>,
) -> Vec<&'a LogEntry> {
    let start = req.effective_range().start_at(now).map(|start| start.with_timezone(&Utc));

    let mut logs: Vec<&LogEntry> = records
        .logs
        .iter()
        .filter(|log| req.student_ids.contains(&log.student_id))
        .filter(|log| start.map_or(true, |start| log.date >= start))
        .collect();
    logs.sort_by(|a, b| b.date.cmp(&a.date));
    logs
}

/// Format the selected entries, failing with `NothingToExport` when none match
pub fn build_rows<Tz: TimeZone>(
    records: &Records,
    req: &ExportRequest,
    now: &DateTime<Tz>,
) -> Result<Vec<ExportRow>> {
    let logs = select_logs(records, req, now);
    if logs.is_empty() {
        return Err(AppError::NothingToExport);
    }

    let tz = now.timezone();
    let rows = logs
        .into_iter()
        .map(|log| ExportRow {
            student: records
                .student(&log.student_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|| UNKNOWN_STUDENT_NAME.to_string()),
            date: log
                .date
                .with_timezone(&tz)
                .naive_local()
                .format("%H:%M:%S %-d/%-m/%Y")
                .to_string(),
            category: log.category().label().to_string(),
            subject: log.subject().map(|s| s.label().to_string()).unwrap_or_default(),
            assessment: log
                .grade()
                .map(|g| g.label())
                .or_else(|| log.sentiment().map(|s| s.label()))
                .unwrap_or_default()
                .to_string(),
            content: log.content.clone(),
        })
        .collect();

    Ok(rows)
}

/// Render rows as CSV text with a byte-order marker and header row
pub fn render_csv(rows: &[ExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(EXPORT_HEADERS.join(","));

    for row in rows {
        let quoted: Vec<String> = row.fields().iter().map(|field| quote(field)).collect();
        lines.push(quoted.join(","));
    }

    format!("{}{}", UTF8_BOM, lines.join("\n"))
}

/// Export using the local clock and timezone
pub fn export_csv(records: &Records, req: &ExportRequest) -> Result<CsvExport> {
    export_csv_at(records, req, &Local::now())
}

pub fn export_csv_at<Tz: TimeZone>(
    records: &Records,
    req: &ExportRequest,
    now: &DateTime<Tz>,
) -> Result<CsvExport> {
    let rows = build_rows(records, req, now)?;

    let export = CsvExport {
        filename: export_filename(now),
        contents: render_csv(&rows),
        row_count: rows.len(),
    };

    tracing::info!(
        "Prepared export {} ({} rows, range {})",
        export.filename,
        export.row_count,
        req.effective_range()
    );
    Ok(export)
}

/// File name embedding the local date, e.g. `Xuat_du_lieu_ghi_nhan_19-10-2026.csv`
pub fn export_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    format!(
        "{}{}.csv",
        EXPORT_FILENAME_PREFIX,
        now.date_naive().format("%d-%m-%Y")
    )
}

/// Write an export into `dir`, replacing any file of the same name
pub async fn write_export(dir: &Path, export: &CsvExport) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    let path = dir.join(&export.filename);
    let temp_path = path.with_extension("csv.tmp");

    let written = async {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(export.contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &path).await
    }
    .await;

    if let Err(e) = written {
        // Don't leave a partial file next to the exports
        if let Err(cleanup) = fs::remove_file(&temp_path).await {
            tracing::debug!("No temp export to remove at {:?}: {}", temp_path, cleanup);
        }
        return Err(e.into());
    }

    tracing::info!("Wrote export to {:?}", path);
    Ok(path)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    first_valid_local(date, |local| tz.from_local_datetime(local).earliest())
        .unwrap_or_else(|| tz.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Earliest whole hour of `date` that `resolve` accepts, starting at midnight.
///
/// A DST change that skips midnight moves the start of the day to the first
/// wall-clock time that exists.
fn first_valid_local<T, F>(date: NaiveDate, resolve: F) -> Option<T>
where
    F: Fn(&NaiveDateTime) -> Option<T>,
{
    let midnight = date.and_time(NaiveTime::MIN);
    (0..24)
        .map(|hour| midnight + Duration::hours(hour))
        .find_map(|local| resolve(&local))
}
