//! Services module
//!
//! Business logic services that sit between the host application and storage.

pub mod advisor;
pub mod export;
pub mod filter;
pub mod notes;
pub mod records;
pub mod settings;
pub mod stats;

pub use advisor::{AdvisorService, GeminiClient, GeminiConfig, TextGenerator};
pub use export::{CsvExport, DateRange, ExportRequest};
pub use filter::{CategoryFilter, DetailFilter, LogFilter, StudentFeed};
pub use notes::NoteBoard;
pub use records::{RecordStore, Records, StudentDeletion};
pub use settings::{AppSettings, SettingsService};
pub use stats::DashboardStats;
