//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{DEFAULT_AI_BASE_URL, DEFAULT_AI_MODEL, SETTINGS_FILE};
use crate::error::{AppError, Result};
use crate::services::export::DateRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Generative model selection. The API key is never stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

fn default_ai_base_url() -> String {
    DEFAULT_AI_BASE_URL.to_string()
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: default_ai_model(),
            base_url: default_ai_base_url(),
        }
    }
}

/// CSV export preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExportSettings {
    /// Range preselected in the export dialog
    #[serde(default)]
    pub default_range: DateRange,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join(SETTINGS_FILE),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn get_ai(&self) -> Result<AiSettings> {
        let settings = self.load().await?;
        Ok(settings.ai)
    }

    /// Update model settings; takes effect the next time the advisor is built
    pub async fn update_ai(&self, ai: AiSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.ai = ai;
        self.save(&settings).await?;
        Ok(())
    }

    pub async fn get_export(&self) -> Result<ExportSettings> {
        let settings = self.load().await?;
        Ok(settings.export)
    }

    pub async fn update_export(&self, export: ExportSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.export = export;
        self.save(&settings).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.ai.model, "gemini-2.5-flash");
        assert_eq!(settings.export.default_range, DateRange::Month);
        assert!(temp.path().join(SETTINGS_FILE).exists());
    }

    #[tokio::test]
    async fn test_export_settings_get_and_update() {
        let (service, _temp) = create_test_service();

        service
            .update_export(ExportSettings {
                default_range: DateRange::ThreeMonths,
            })
            .await
            .unwrap();

        let loaded = service.get_export().await.unwrap();
        assert_eq!(loaded.default_range, DateRange::ThreeMonths);
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().to_path_buf();

        {
            let service = SettingsService::new(settings_path.clone());
            let updated = AiSettings {
                model: "gemini-2.5-pro".to_string(),
                ..AiSettings::default()
            };
            service.update_ai(updated).await.unwrap();
        }

        {
            let service = SettingsService::new(settings_path);
            let loaded = service.get_ai().await.unwrap();
            assert_eq!(loaded.model, "gemini-2.5-pro");
            assert_eq!(loaded.base_url, DEFAULT_AI_BASE_URL);
        }
    }

    #[tokio::test]
    async fn test_missing_sections_use_defaults() {
        let (service, temp) = create_test_service();
        std::fs::write(
            temp.path().join(SETTINGS_FILE),
            r#"{"export":{"default_range":"week"}}"#,
        )
        .unwrap();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.export.default_range, DateRange::Week);
        assert_eq!(settings.ai, AiSettings::default());
    }

    #[tokio::test]
    async fn test_ai_preserved_after_export_update() {
        let (service, _temp) = create_test_service();

        let initial = service.load().await.unwrap();

        service
            .update_export(ExportSettings {
                default_range: DateRange::All,
            })
            .await
            .unwrap();

        let settings = service.load().await.unwrap();
        assert_eq!(settings.ai, initial.ai);
    }
}
