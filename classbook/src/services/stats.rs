//! Statistics service
//!
//! Pure aggregations over the observation log: behavior and academic
//! distributions, the 30-day behavior timeline and the student
//! leaderboards shown on the dashboard and report views. Nothing here
//! fails; entries that do not qualify for a view are skipped.

use crate::config::{DELETED_STUDENT_NAME, TIMELINE_DAYS};
use crate::database::{Grade, LogEntry, Sentiment, Student, Subject};
use crate::services::records::Records;
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Count of behavior entries per sentiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub needs_improvement: usize,
}

impl SentimentCounts {
    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positive => self.positive,
            Sentiment::Neutral => self.neutral,
            Sentiment::NeedsImprovement => self.needs_improvement,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.needs_improvement
    }

    fn increment(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::NeedsImprovement => self.needs_improvement += 1,
        }
    }
}

/// Count of academic reviews per grade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCounts {
    pub excellent: usize,
    pub good: usize,
    pub completed: usize,
    pub incomplete: usize,
}

impl GradeCounts {
    pub fn get(&self, grade: Grade) -> usize {
        match grade {
            Grade::Excellent => self.excellent,
            Grade::Good => self.good,
            Grade::Completed => self.completed,
            Grade::Incomplete => self.incomplete,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.completed + self.incomplete
    }

    fn increment(&mut self, grade: Grade) {
        match grade {
            Grade::Excellent => self.excellent += 1,
            Grade::Good => self.good += 1,
            Grade::Completed => self.completed += 1,
            Grade::Incomplete => self.incomplete += 1,
        }
    }
}

/// Grade counts per subject; only subjects with at least one review appear
pub type AcademicDistribution = BTreeMap<Subject, GradeCounts>;

/// One calendar day of the behavior timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: SentimentCounts,
}

/// A student's position on a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub student_id: String,
    pub name: String,
    pub avatar: String,
    pub count: usize,
}

/// Per-student figures for the student detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub total_logs: usize,
    pub behavior: SentimentCounts,
}

/// Everything the dashboard and report views display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub behavior: SentimentCounts,
    pub academic: AcademicDistribution,
    pub timeline: Vec<TimelineDay>,
    pub needs_improvement: Vec<LeaderboardEntry>,
    pub log_counts: Vec<LeaderboardEntry>,
}

impl DashboardStats {
    /// Compute every dashboard view using the local clock
    pub fn compute(records: &Records) -> Self {
        Self::compute_at(records, &Local::now())
    }

    pub fn compute_at<Tz: TimeZone>(records: &Records, now: &DateTime<Tz>) -> Self {
        Self {
            behavior: behavior_distribution(&records.logs),
            academic: academic_distribution(&records.logs),
            timeline: behavior_timeline_at(&records.logs, now),
            needs_improvement: needs_improvement_leaderboard(&records.logs, &records.students),
            log_counts: log_count_leaderboard(&records.logs, &records.students),
        }
    }
}

/// Count behavior entries by sentiment. Entries without a sentiment are skipped.
pub fn behavior_distribution<'a, I>(logs: I) -> SentimentCounts
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut counts = SentimentCounts::default();
    for sentiment in logs.into_iter().filter_map(LogEntry::sentiment) {
        counts.increment(sentiment);
    }
    counts
}

/// Count academic reviews by subject, then grade
pub fn academic_distribution<'a, I>(logs: I) -> AcademicDistribution
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut stats = AcademicDistribution::new();
    for log in logs {
        if let (Some(subject), Some(grade)) = (log.subject(), log.grade()) {
            stats.entry(subject).or_default().increment(grade);
        }
    }
    stats
}

/// Behavior counts for each of the last 30 local calendar days, oldest first
pub fn behavior_timeline<'a, I>(logs: I) -> Vec<TimelineDay>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    behavior_timeline_at(logs, &Local::now())
}

/// Behavior counts for the 30 calendar days ending on `now`'s date in `now`'s timezone.
///
/// Always returns exactly 30 days, oldest first. Entries dated outside
/// that window, including future dates, are not counted.
pub fn behavior_timeline_at<'a, I, Tz>(logs: I, now: &DateTime<Tz>) -> Vec<TimelineDay>
where
    I: IntoIterator<Item = &'a LogEntry>,
    Tz: TimeZone,
{
    let tz = now.timezone();
    let today = now.date_naive();

    let mut days: Vec<TimelineDay> = (0..TIMELINE_DAYS as i64)
        .rev()
        .map(|back| TimelineDay {
            date: today - Duration::days(back),
            counts: SentimentCounts::default(),
        })
        .collect();
    let first_day = today - Duration::days(TIMELINE_DAYS as i64 - 1);

    for log in logs {
        if let Some(sentiment) = log.sentiment() {
            let day = log.date.with_timezone(&tz).date_naive();
            if day < first_day || day > today {
                continue;
            }
            let index = (day - first_day).num_days() as usize;
            days[index].counts.increment(sentiment);
        }
    }

    days
}

/// Students ranked by number of "needs improvement" behavior entries.
///
/// Students without any such entry are left out. Ties keep the order in
/// which the students first appear in `logs`.
pub fn needs_improvement_leaderboard(logs: &[LogEntry], students: &[Student]) -> Vec<LeaderboardEntry> {
    let flagged = logs
        .iter()
        .filter(|log| log.sentiment() == Some(Sentiment::NeedsImprovement));
    let counts = count_by_student(flagged);

    let mut board: Vec<LeaderboardEntry> = counts
        .into_iter()
        .map(|(student_id, count)| leaderboard_entry(students, student_id, count))
        .collect();
    board.sort_by(|a, b| b.count.cmp(&a.count));
    board
}

/// Every roster student ranked by total number of log entries.
///
/// Zero-count students are included; ties keep roster order.
pub fn log_count_leaderboard(logs: &[LogEntry], students: &[Student]) -> Vec<LeaderboardEntry> {
    let mut counts: HashMap<&str, usize> = count_by_student(logs.iter()).into_iter().collect();

    let mut board: Vec<LeaderboardEntry> = students
        .iter()
        .map(|student| LeaderboardEntry {
            student_id: student.id.clone(),
            name: student.name.clone(),
            avatar: student.avatar.clone(),
            count: counts.remove(student.id.as_str()).unwrap_or(0),
        })
        .collect();

    // Entries whose student no longer exists, in order of first appearance
    let mut orphans: Vec<(&str, usize)> = counts.into_iter().collect();
    orphans.sort_by_key(|(id, _)| logs.iter().position(|log| log.student_id == *id));
    board.extend(
        orphans
            .into_iter()
            .map(|(student_id, count)| leaderboard_entry(students, student_id, count)),
    );

    board.sort_by(|a, b| b.count.cmp(&a.count));
    board
}

/// Totals and behavior distribution for one student
pub fn student_summary(records: &Records, student_id: &str) -> StudentSummary {
    let logs: Vec<&LogEntry> = records.logs_for_student(student_id).collect();
    StudentSummary {
        student_id: student_id.to_string(),
        total_logs: logs.len(),
        behavior: behavior_distribution(logs),
    }
}

/// Count entries per student id, keeping first-appearance order
fn count_by_student<'a, I>(logs: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for log in logs {
        let id = log.student_id.as_str();
        match index.get(id) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(id, order.len());
                order.push((id, 1));
            }
        }
    }

    order
}

fn leaderboard_entry(students: &[Student], student_id: &str, count: usize) -> LeaderboardEntry {
    match students.iter().find(|s| s.id == student_id) {
        Some(student) => LeaderboardEntry {
            student_id: student.id.clone(),
            name: student.name.clone(),
            avatar: student.avatar.clone(),
            count,
        },
        None => LeaderboardEntry {
            student_id: student_id.to_string(),
            name: DELETED_STUDENT_NAME.to_string(),
            avatar: String::new(),
            count,
        },
    }
}
