//! Record store service
//!
//! Owns the student roster, the observation log and the teacher's notes.
//! Collections are loaded once at startup and written back through the
//! injected `KeyValueStore` on every mutation. A mutation is persisted
//! before it becomes visible in memory, so a failed write leaves the
//! store unchanged.

use crate::config::{INITIAL_STUDENTS, LOGS_KEY, NOTES_KEY, STUDENTS_KEY};
use crate::database::{new_id, CreateBulkLogRequest, CreateLogRequest, LogEntry, Note, Student};
use crate::error::{AppError, Result};
use crate::storage::KeyValueStore;
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;

/// Snapshot of the three collections
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Records {
    pub students: Vec<Student>,
    /// Newest first
    pub logs: Vec<LogEntry>,
    /// Newest first
    pub notes: Vec<Note>,
}

impl Records {
    pub fn student(&self, id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// Log entries of one student, in stored order
    pub fn logs_for_student<'a>(&'a self, student_id: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.logs.iter().filter(move |log| log.student_id == student_id)
    }
}

/// Confirmed intent to delete a student together with all of its log entries.
///
/// Obtained from [`RecordStore::plan_student_deletion`] so the caller can
/// show what will be removed before committing.
#[derive(Debug, Clone)]
pub struct StudentDeletion {
    student: Student,
    log_count: usize,
}

impl StudentDeletion {
    pub fn student(&self) -> &Student {
        &self.student
    }

    /// Number of log entries that will be removed with the student
    pub fn log_count(&self) -> usize {
        self.log_count
    }
}

/// Service owning the notebook's records
pub struct RecordStore {
    storage: Arc<dyn KeyValueStore>,
    records: Records,
}

impl RecordStore {
    /// Load all collections, seeding the starter roster on first use
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Result<Self> {
        tracing::info!("Loading notebook records");

        let (students, seeded) = match read_collection::<Student>(&*storage, STUDENTS_KEY).await? {
            Some(students) => (students, false),
            None => {
                let roster: Vec<Student> = INITIAL_STUDENTS
                    .iter()
                    .map(|(id, name)| Student::new(*id, *name))
                    .collect();
                (roster, true)
            }
        };

        if seeded {
            tracing::info!("No saved roster, seeding {} starter students", students.len());
            storage.set(STUDENTS_KEY, serde_json::to_string(&students)?).await?;
        }

        let logs = read_collection::<LogEntry>(&*storage, LOGS_KEY)
            .await?
            .unwrap_or_default();
        let notes = read_collection::<Note>(&*storage, NOTES_KEY)
            .await?
            .unwrap_or_default();

        tracing::info!(
            "Loaded {} students, {} log entries, {} notes",
            students.len(),
            logs.len(),
            notes.len()
        );

        Ok(Self {
            storage,
            records: Records {
                students,
                logs,
                notes,
            },
        })
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn students(&self) -> &[Student] {
        &self.records.students
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.records.logs
    }

    pub fn notes(&self) -> &[Note] {
        &self.records.notes
    }

    pub fn student(&self, id: &str) -> Option<&Student> {
        self.records.student(id)
    }

    // ===== Students =====

    /// Add one student to the end of the roster
    pub async fn add_student(&mut self, name: &str) -> Result<Student> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Student name is required".to_string()));
        }

        let student = Student::new(new_id("std"), name);

        let mut students = self.records.students.clone();
        students.push(student.clone());
        self.commit_students(students).await?;

        tracing::info!("Added student {} ({})", student.name, student.id);
        Ok(student)
    }

    /// Add one student per non-blank line of `names`
    pub async fn add_students(&mut self, names: &str) -> Result<Vec<Student>> {
        let added: Vec<Student> = names
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| Student::new(new_id("std"), name))
            .collect();

        if added.is_empty() {
            return Err(AppError::Validation(
                "Enter at least one student name".to_string(),
            ));
        }

        let mut students = self.records.students.clone();
        students.extend(added.iter().cloned());
        self.commit_students(students).await?;

        tracing::info!("Added {} students", added.len());
        Ok(added)
    }

    /// Change a student's display name
    pub async fn rename_student(&mut self, id: &str, new_name: &str) -> Result<Student> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(AppError::Validation("Student name is required".to_string()));
        }

        let mut students = self.records.students.clone();
        let student = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;
        student.name = new_name.to_string();
        let renamed = student.clone();

        self.commit_students(students).await?;

        tracing::info!("Renamed student {} to {}", id, renamed.name);
        Ok(renamed)
    }

    /// Describe what deleting a student would remove
    pub fn plan_student_deletion(&self, id: &str) -> Result<StudentDeletion> {
        let student = self
            .student(id)
            .cloned()
            .ok_or_else(|| AppError::StudentNotFound(id.to_string()))?;
        let log_count = self.records.logs_for_student(id).count();

        Ok(StudentDeletion { student, log_count })
    }

    /// Delete a student and every log entry referencing it.
    ///
    /// Both collections are written in one storage call; returns the number
    /// of log entries removed.
    pub async fn delete_student(&mut self, deletion: StudentDeletion) -> Result<usize> {
        let id = deletion.student.id.as_str();
        if self.student(id).is_none() {
            return Err(AppError::StudentNotFound(id.to_string()));
        }

        let students: Vec<Student> = self
            .records
            .students
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        let logs: Vec<LogEntry> = self
            .records
            .logs
            .iter()
            .filter(|log| log.student_id != id)
            .cloned()
            .collect();
        let removed = self.records.logs.len() - logs.len();

        self.storage
            .set_many(&[
                (STUDENTS_KEY, serde_json::to_string(&students)?),
                (LOGS_KEY, serde_json::to_string(&logs)?),
            ])
            .await?;

        self.records.students = students;
        self.records.logs = logs;

        tracing::info!("Deleted student {} and {} log entries", id, removed);
        Ok(removed)
    }

    // ===== Log entries =====

    /// Record an observation for one student
    pub async fn add_log(&mut self, req: CreateLogRequest) -> Result<LogEntry> {
        let content = req.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Log content is required".to_string()));
        }
        if self.student(&req.student_id).is_none() {
            return Err(AppError::StudentNotFound(req.student_id));
        }

        let entry = LogEntry {
            id: new_id("log"),
            student_id: req.student_id,
            date: Utc::now(),
            detail: req.detail,
            content: content.to_string(),
        };

        let mut logs = Vec::with_capacity(self.records.logs.len() + 1);
        logs.push(entry.clone());
        logs.extend(self.records.logs.iter().cloned());
        self.commit_logs(logs).await?;

        tracing::info!(
            "Added {} log {} for student {}",
            entry.category(),
            entry.id,
            entry.student_id
        );
        Ok(entry)
    }

    /// Record the same observation for several students
    pub async fn add_logs(&mut self, req: CreateBulkLogRequest) -> Result<Vec<LogEntry>> {
        let content = req.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Log content is required".to_string()));
        }

        let mut seen = HashSet::new();
        let student_ids: Vec<String> = req
            .student_ids
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if student_ids.is_empty() {
            return Err(AppError::Validation(
                "Select at least one student".to_string(),
            ));
        }
        if let Some(missing) = student_ids.iter().find(|id| self.student(id).is_none()) {
            return Err(AppError::StudentNotFound(missing.clone()));
        }

        let now = Utc::now();
        let added: Vec<LogEntry> = student_ids
            .into_iter()
            .map(|student_id| LogEntry {
                id: new_id("log"),
                student_id,
                date: now,
                detail: req.detail,
                content: content.to_string(),
            })
            .collect();

        let mut logs = Vec::with_capacity(self.records.logs.len() + added.len());
        logs.extend(added.iter().cloned());
        logs.extend(self.records.logs.iter().cloned());
        self.commit_logs(logs).await?;

        tracing::info!("Added {} log entries in bulk", added.len());
        Ok(added)
    }

    // ===== Notes =====

    /// Add a note to the top of the list
    pub async fn add_note(&mut self, content: &str) -> Result<Note> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Note content is required".to_string()));
        }

        let note = Note {
            id: new_id("note"),
            content: content.to_string(),
            created_at: Utc::now(),
            completed_at: None,
        };

        let mut notes = Vec::with_capacity(self.records.notes.len() + 1);
        notes.push(note.clone());
        notes.extend(self.records.notes.iter().cloned());
        self.commit_notes(notes).await?;

        tracing::info!("Added note {}", note.id);
        Ok(note)
    }

    /// Mark a note completed now, or reopen it if already completed
    pub async fn toggle_note(&mut self, id: &str) -> Result<Note> {
        let mut notes = self.records.notes.clone();
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NoteNotFound(id.to_string()))?;
        note.completed_at = match note.completed_at {
            Some(_) => None,
            None => Some(Utc::now()),
        };
        let toggled = note.clone();

        self.commit_notes(notes).await?;

        tracing::debug!("Toggled note {} (completed: {})", id, toggled.is_completed());
        Ok(toggled)
    }

    /// Permanently remove a note
    pub async fn delete_note(&mut self, id: &str) -> Result<()> {
        if !self.records.notes.iter().any(|n| n.id == id) {
            return Err(AppError::NoteNotFound(id.to_string()));
        }

        let notes: Vec<Note> = self
            .records
            .notes
            .iter()
            .filter(|n| n.id != id)
            .cloned()
            .collect();
        self.commit_notes(notes).await?;

        tracing::info!("Deleted note {}", id);
        Ok(())
    }

    // ===== Persistence =====

    async fn commit_students(&mut self, students: Vec<Student>) -> Result<()> {
        self.storage
            .set(STUDENTS_KEY, serde_json::to_string(&students)?)
            .await?;
        self.records.students = students;
        Ok(())
    }

    async fn commit_logs(&mut self, logs: Vec<LogEntry>) -> Result<()> {
        self.storage.set(LOGS_KEY, serde_json::to_string(&logs)?).await?;
        self.records.logs = logs;
        Ok(())
    }

    async fn commit_notes(&mut self, notes: Vec<Note>) -> Result<()> {
        self.storage
            .set(NOTES_KEY, serde_json::to_string(&notes)?)
            .await?;
        self.records.notes = notes;
        Ok(())
    }
}

async fn read_collection<T>(storage: &dyn KeyValueStore, key: &str) -> Result<Option<Vec<T>>>
where
    T: DeserializeOwned,
{
    match storage.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{LogDetail, Sentiment};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    async fn create_test_store() -> (RecordStore, MemoryStore) {
        let backend = MemoryStore::new();
        let store = RecordStore::load(Arc::new(backend.clone())).await.unwrap();
        (store, backend)
    }

    fn behavior(student_id: &str, sentiment: Sentiment, content: &str) -> CreateLogRequest {
        CreateLogRequest {
            student_id: student_id.to_string(),
            detail: LogDetail::Behavior {
                sentiment: Some(sentiment),
            },
            content: content.to_string(),
        }
    }

    /// Storage that accepts reads but rejects every write
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Ok(Some("[]".to_string()))
        }

        async fn set_many(&self, _entries: &[(&str, String)]) -> Result<()> {
            Err(AppError::Generic("read-only".to_string()))
        }
    }

    #[tokio::test]
    async fn test_first_load_seeds_roster() {
        let (store, backend) = create_test_store().await;

        assert_eq!(store.students().len(), INITIAL_STUDENTS.len());
        assert_eq!(store.students()[0].id, "hs01");
        assert!(store.logs().is_empty());
        assert!(store.notes().is_empty());

        let saved = backend.get(STUDENTS_KEY).await.unwrap().unwrap();
        let saved: Vec<Student> = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved, store.students());
    }

    #[tokio::test]
    async fn test_empty_saved_roster_is_not_reseeded() {
        let backend = MemoryStore::new();
        backend.set(STUDENTS_KEY, "[]".to_string()).await.unwrap();

        let store = RecordStore::load(Arc::new(backend)).await.unwrap();

        assert!(store.students().is_empty());
    }

    #[tokio::test]
    async fn test_reload_sees_persisted_mutations() {
        let (mut store, backend) = create_test_store().await;

        store.add_student("Đỗ Minh Khang").await.unwrap();
        store
            .add_log(behavior("hs01", Sentiment::Positive, "Giúp bạn"))
            .await
            .unwrap();
        store.add_note("Gọi phụ huynh").await.unwrap();

        let reloaded = RecordStore::load(Arc::new(backend)).await.unwrap();
        assert_eq!(reloaded.records(), store.records());
    }

    #[tokio::test]
    async fn test_add_student_rejects_blank_name() {
        let (mut store, _) = create_test_store().await;

        let result = store.add_student("   ").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.students().len(), INITIAL_STUDENTS.len());
    }

    #[tokio::test]
    async fn test_add_students_skips_blank_lines() {
        let (mut store, _) = create_test_store().await;

        let added = store
            .add_students("Nguyễn Văn A\n\n  Trần Thị B  \n")
            .await
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(added[1].name, "Trần Thị B");
        assert_ne!(added[0].id, added[1].id);
        assert_eq!(store.students().len(), INITIAL_STUDENTS.len() + 2);
    }

    #[tokio::test]
    async fn test_add_students_requires_a_name() {
        let (mut store, _) = create_test_store().await;

        let result = store.add_students("\n  \n").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rename_student() {
        let (mut store, _) = create_test_store().await;

        let renamed = store.rename_student("hs02", " Trần Thị Bích ").await.unwrap();

        assert_eq!(renamed.name, "Trần Thị Bích");
        assert_eq!(store.student("hs02").unwrap().name, "Trần Thị Bích");
        assert!(matches!(
            store.rename_student("missing", "X").await,
            Err(AppError::StudentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_student_cascades_to_its_logs_only() {
        let (mut store, backend) = create_test_store().await;

        store.add_log(behavior("hs01", Sentiment::Positive, "a")).await.unwrap();
        store
            .add_log(behavior("hs02", Sentiment::Neutral, "b"))
            .await
            .unwrap();
        store
            .add_log(behavior("hs01", Sentiment::NeedsImprovement, "c"))
            .await
            .unwrap();

        let plan = store.plan_student_deletion("hs01").unwrap();
        assert_eq!(plan.log_count(), 2);
        assert_eq!(plan.student().name, "Nguyễn Văn An");

        let removed = store.delete_student(plan).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.student("hs01").is_none());
        assert_eq!(store.logs().len(), 1);
        assert!(store.logs().iter().all(|log| log.student_id != "hs01"));

        let reloaded = RecordStore::load(Arc::new(backend)).await.unwrap();
        assert_eq!(reloaded.logs().len(), 1);
        assert!(reloaded.student("hs01").is_none());
    }

    #[tokio::test]
    async fn test_delete_student_twice_fails() {
        let (mut store, _) = create_test_store().await;

        let plan = store.plan_student_deletion("hs03").unwrap();
        store.delete_student(plan.clone()).await.unwrap();

        assert!(matches!(
            store.delete_student(plan).await,
            Err(AppError::StudentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_state_unchanged() {
        let mut store = RecordStore::load(Arc::new(ReadOnlyStore)).await.unwrap();

        let result = store.add_note("Không lưu được").await;

        assert!(result.is_err());
        assert!(store.notes().is_empty());
    }

    #[tokio::test]
    async fn test_add_log_validation() {
        let (mut store, _) = create_test_store().await;

        let blank = store.add_log(behavior("hs01", Sentiment::Positive, "  ")).await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let unknown = store
            .add_log(behavior("nobody", Sentiment::Positive, "x"))
            .await;
        assert!(matches!(unknown, Err(AppError::StudentNotFound(_))));

        assert!(store.logs().is_empty());
    }

    #[tokio::test]
    async fn test_new_logs_are_listed_first() {
        let (mut store, _) = create_test_store().await;

        let first = store.add_log(behavior("hs01", Sentiment::Positive, "1")).await.unwrap();
        let second = store.add_log(behavior("hs01", Sentiment::Neutral, "2")).await.unwrap();

        assert_eq!(store.logs()[0].id, second.id);
        assert_eq!(store.logs()[1].id, first.id);
        assert!(second.date >= first.date);
    }

    #[tokio::test]
    async fn test_add_logs_for_selected_students() {
        let (mut store, _) = create_test_store().await;

        let added = store
            .add_logs(CreateBulkLogRequest {
                student_ids: vec!["hs01".to_string(), "hs04".to_string(), "hs01".to_string()],
                detail: LogDetail::General,
                content: "Tham gia văn nghệ".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(store.logs().len(), 2);
        assert_ne!(added[0].id, added[1].id);
        assert_eq!(store.records().logs_for_student("hs04").count(), 1);
    }

    #[tokio::test]
    async fn test_add_logs_requires_students() {
        let (mut store, _) = create_test_store().await;

        let result = store
            .add_logs(CreateBulkLogRequest {
                student_ids: Vec::new(),
                detail: LogDetail::General,
                content: "x".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_toggle_and_delete_note() {
        let (mut store, _) = create_test_store().await;

        let note = store.add_note("Chấm bài kiểm tra").await.unwrap();
        assert!(!note.is_completed());

        let done = store.toggle_note(&note.id).await.unwrap();
        assert!(done.is_completed());

        let reopened = store.toggle_note(&note.id).await.unwrap();
        assert!(!reopened.is_completed());

        store.delete_note(&note.id).await.unwrap();
        assert!(store.notes().is_empty());
        assert!(matches!(
            store.delete_note(&note.id).await,
            Err(AppError::NoteNotFound(_))
        ));
    }
}
