//! Notes views
//!
//! Splits the teacher's to-do notes into the open list and the completed
//! archive, each in the order the notebook shows them.

use crate::database::Note;
use serde::Serialize;

/// Notes partitioned by completion
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBoard<'a> {
    /// Open notes, newest created first
    pub active: Vec<&'a Note>,
    /// Completed notes, most recently completed first
    pub completed: Vec<&'a Note>,
}

impl<'a> NoteBoard<'a> {
    pub fn new(notes: &'a [Note]) -> Self {
        Self {
            active: active_notes(notes),
            completed: completed_notes(notes),
        }
    }
}

/// Notes without a completion time, newest created first
pub fn active_notes(notes: &[Note]) -> Vec<&Note> {
    let mut active: Vec<&Note> = notes.iter().filter(|n| !n.is_completed()).collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    active
}

/// Completed notes, most recently completed first
pub fn completed_notes(notes: &[Note]) -> Vec<&Note> {
    let mut completed: Vec<&Note> = notes.iter().filter(|n| n.is_completed()).collect();
    completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    completed
}
