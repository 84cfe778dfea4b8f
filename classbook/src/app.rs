//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::{DATABASE_FILE, EXPORTS_DIR};
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::export::{self, ExportRequest};
use crate::services::{
    AdvisorService, AppSettings, GeminiClient, GeminiConfig, RecordStore, SettingsService,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub records: Arc<Mutex<RecordStore>>,
    pub advisor: AdvisorService,
    pub settings: SettingsService,
}

impl AppState {
    pub fn new(
        data_dir: PathBuf,
        records: RecordStore,
        advisor: AdvisorService,
        settings: SettingsService,
    ) -> Self {
        Self {
            data_dir,
            records: Arc::new(Mutex::new(records)),
            advisor,
            settings,
        }
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join(EXPORTS_DIR)
    }

    /// Apply the range preselected in settings when the request has none
    pub async fn resolve_export_request(&self, req: ExportRequest) -> Result<ExportRequest> {
        if req.range.is_some() {
            return Ok(req);
        }

        let default_range = self.settings.get_export().await?.default_range;
        Ok(req.with_default_range(default_range))
    }

    /// Render the requested export and save it under the exports directory
    pub async fn export_to_disk(&self, req: ExportRequest) -> Result<PathBuf> {
        let req = self.resolve_export_request(req).await?;

        let csv = {
            let store = self.records.lock().await;
            export::export_csv(store.records(), &req)?
        };

        export::write_export(&self.exports_dir(), &csv).await
    }
}

/// Application setup - called once on startup
pub async fn setup(data_dir: &Path) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("App data directory: {:?}", data_dir);

    // Create necessary directories
    tokio::fs::create_dir_all(data_dir).await?;
    tokio::fs::create_dir_all(data_dir.join(EXPORTS_DIR)).await?;

    let pool = create_pool(&data_dir.join(DATABASE_FILE)).await?;
    let repo = Repository::new(pool);
    let records = RecordStore::load(Arc::new(repo)).await?;

    let settings = SettingsService::new(data_dir.to_path_buf());
    let app_settings = settings.load().await?;
    let advisor = build_advisor(&app_settings);

    let state = AppState::new(data_dir.to_path_buf(), records, advisor, settings);

    tracing::info!("Application initialized successfully");

    Ok(state)
}

/// Gemini-backed advisor using the configured model
pub fn build_advisor(settings: &AppSettings) -> AdvisorService {
    let config = GeminiConfig::from_env(settings.ai.model.clone(), settings.ai.base_url.clone());
    AdvisorService::new(Arc::new(GeminiClient::new(config)))
}
