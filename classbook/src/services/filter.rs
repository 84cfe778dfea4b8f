//! Log feed filtering
//!
//! Narrows a student's log feed by category and, for behavior entries and
//! academic reviews, by sentiment or subject. The detail filter is owned by
//! `LogFilter` so that changing the category or the selected student always
//! clears it in the same step.

use crate::database::{Category, LogEntry, Sentiment, Student, Subject};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Which categories pass the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

/// Secondary filter for behavior entries or academic reviews
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetailFilter {
    #[default]
    All,
    Sentiment(Sentiment),
    Subject(Subject),
}

/// Category and detail selection applied to a log feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LogFilter {
    category: CategoryFilter,
    detail: DetailFilter,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    pub fn detail(&self) -> DetailFilter {
        self.detail
    }

    /// Switch category; the detail filter goes back to `All`
    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
        self.detail = DetailFilter::All;
    }

    /// Choose a detail value belonging to the active category
    pub fn set_detail(&mut self, detail: DetailFilter) -> Result<()> {
        let allowed = match (self.category, detail) {
            (_, DetailFilter::All) => true,
            (CategoryFilter::Only(Category::Behavior), DetailFilter::Sentiment(_)) => true,
            (CategoryFilter::Only(Category::AcademicReview), DetailFilter::Subject(_)) => true,
            _ => false,
        };

        if !allowed {
            return Err(AppError::Validation(format!(
                "{:?} does not apply to {:?}",
                detail, self.category
            )));
        }

        self.detail = detail;
        Ok(())
    }

    /// Clear the detail filter, keeping the category
    pub fn reset_detail(&mut self) {
        self.detail = DetailFilter::All;
    }

    /// Whether one entry passes the filter
    pub fn matches(&self, log: &LogEntry) -> bool {
        let category = match self.category {
            CategoryFilter::All => return true,
            CategoryFilter::Only(category) => category,
        };

        if log.category() != category {
            return false;
        }

        match (category, self.detail) {
            (_, DetailFilter::All) => true,
            (Category::Behavior, DetailFilter::Sentiment(wanted)) => log.sentiment() == Some(wanted),
            (Category::Behavior, DetailFilter::Subject(_)) => false,
            (Category::AcademicReview, DetailFilter::Subject(wanted)) => log.subject() == Some(wanted),
            (Category::AcademicReview, DetailFilter::Sentiment(_)) => false,
            (Category::AcademicNote | Category::General, _) => true,
        }
    }

    /// Entries passing the filter, in their original order
    pub fn apply<'a, I>(&self, logs: I) -> Vec<&'a LogEntry>
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        logs.into_iter().filter(|log| self.matches(log)).collect()
    }
}

/// Log feed of the student currently open in the detail view
#[derive(Debug, Clone, Default)]
pub struct StudentFeed {
    student_id: Option<String>,
    filter: LogFilter,
}

impl StudentFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn student_id(&self) -> Option<&str> {
        self.student_id.as_deref()
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut LogFilter {
        &mut self.filter
    }

    /// Open another student; the detail filter is cleared
    pub fn select_student(&mut self, student_id: Option<String>) {
        if self.student_id != student_id {
            self.student_id = student_id;
            self.filter.reset_detail();
        }
    }

    /// The selected student's entries passing the filter
    pub fn entries<'a>(&self, logs: &'a [LogEntry]) -> Vec<&'a LogEntry> {
        match self.student_id.as_deref() {
            Some(id) => self
                .filter
                .apply(logs.iter().filter(|log| log.student_id == id)),
            None => Vec::new(),
        }
    }
}

/// Students whose name contains `term`, ignoring case
pub fn search_students<'a>(students: &'a [Student], term: &str) -> Vec<&'a Student> {
    let term = term.to_lowercase();
    students
        .iter()
        .filter(|student| student.name.to_lowercase().contains(&term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{Grade, LogDetail};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn entry(id: &str, student_id: &str, detail: LogDetail) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            student_id: student_id.to_string(),
            date: Utc::now(),
            detail,
            content: id.to_string(),
        }
    }

    fn feed() -> Vec<LogEntry> {
        vec![
            entry("pos", "hs01", LogDetail::Behavior { sentiment: Some(Sentiment::Positive) }),
            entry("neg", "hs01", LogDetail::Behavior { sentiment: Some(Sentiment::NeedsImprovement) }),
            entry("blank", "hs01", LogDetail::Behavior { sentiment: None }),
            entry(
                "math",
                "hs01",
                LogDetail::AcademicReview { subject: Subject::Mathematics, grade: Grade::Good },
            ),
            entry(
                "sci",
                "hs01",
                LogDetail::AcademicReview { subject: Subject::Science, grade: Grade::Completed },
            ),
            entry("note", "hs01", LogDetail::AcademicNote),
            entry("general", "hs01", LogDetail::General),
            entry("other", "hs02", LogDetail::General),
        ]
    }

    fn ids(entries: &[&LogEntry]) -> Vec<String> {
        entries.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_all_passes_everything_in_order() {
        let logs = feed();
        let filter = LogFilter::new();

        assert_eq!(filter.apply(&logs).len(), logs.len());
    }

    #[test]
    fn test_category_only() {
        let logs = feed();
        let mut filter = LogFilter::new();
        filter.set_category(CategoryFilter::Only(Category::Behavior));

        assert_eq!(ids(&filter.apply(&logs)), vec!["pos", "neg", "blank"]);
    }

    #[test]
    fn test_behavior_by_sentiment() {
        let logs = feed();
        let mut filter = LogFilter::new();
        filter.set_category(CategoryFilter::Only(Category::Behavior));
        filter
            .set_detail(DetailFilter::Sentiment(Sentiment::NeedsImprovement))
            .unwrap();

        assert_eq!(ids(&filter.apply(&logs)), vec!["neg"]);
    }

    #[test]
    fn test_review_by_subject() {
        let logs = feed();
        let mut filter = LogFilter::new();
        filter.set_category(CategoryFilter::Only(Category::AcademicReview));
        filter
            .set_detail(DetailFilter::Subject(Subject::Science))
            .unwrap();

        assert_eq!(ids(&filter.apply(&logs)), vec!["sci"]);
    }

    #[test]
    fn test_changing_category_resets_detail() {
        let mut filter = LogFilter::new();
        filter.set_category(CategoryFilter::Only(Category::Behavior));
        filter
            .set_detail(DetailFilter::Sentiment(Sentiment::Positive))
            .unwrap();

        filter.set_category(CategoryFilter::Only(Category::AcademicReview));
        assert_eq!(filter.detail(), DetailFilter::All);

        filter.set_category(CategoryFilter::All);
        assert_eq!(filter.detail(), DetailFilter::All);
    }

    #[test]
    fn test_detail_must_match_category() {
        let mut filter = LogFilter::new();
        assert!(filter
            .set_detail(DetailFilter::Sentiment(Sentiment::Positive))
            .is_err());

        filter.set_category(CategoryFilter::Only(Category::Behavior));
        assert!(filter
            .set_detail(DetailFilter::Subject(Subject::Mathematics))
            .is_err());
        assert_eq!(filter.detail(), DetailFilter::All);

        filter.set_category(CategoryFilter::Only(Category::General));
        assert!(filter.set_detail(DetailFilter::All).is_ok());
    }

    #[test]
    fn test_filter_is_idempotent() {
        let logs = feed();
        let mut filter = LogFilter::new();
        filter.set_category(CategoryFilter::Only(Category::AcademicReview));
        filter
            .set_detail(DetailFilter::Subject(Subject::Mathematics))
            .unwrap();

        let once = filter.apply(&logs);
        let twice = filter.apply(once.iter().copied());

        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn test_student_feed_selection_resets_detail() {
        let logs = feed();
        let mut feed = StudentFeed::new();
        assert!(feed.entries(&logs).is_empty());

        feed.select_student(Some("hs01".to_string()));
        feed.filter_mut()
            .set_category(CategoryFilter::Only(Category::Behavior));
        feed.filter_mut()
            .set_detail(DetailFilter::Sentiment(Sentiment::Positive))
            .unwrap();
        assert_eq!(ids(&feed.entries(&logs)), vec!["pos"]);

        feed.select_student(Some("hs02".to_string()));
        assert_eq!(feed.filter().detail(), DetailFilter::All);
        assert_eq!(
            feed.filter().category(),
            CategoryFilter::Only(Category::Behavior)
        );
        assert!(feed.entries(&logs).is_empty());

        feed.filter_mut().set_category(CategoryFilter::All);
        assert_eq!(ids(&feed.entries(&logs)), vec!["other"]);
    }

    #[test]
    fn test_search_students_ignores_case() {
        let students = vec![
            Student::new("hs01", "Nguyễn Văn An"),
            Student::new("hs02", "Trần Thị Bình"),
        ];

        let found = search_students(&students, "văn");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "hs01");

        assert_eq!(search_students(&students, "").len(), 2);
        assert!(search_students(&students, "xyz").is_empty());
    }
}
