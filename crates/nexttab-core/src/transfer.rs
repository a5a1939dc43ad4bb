//! Export and import of all synced sections as one bundle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use nexttab_cell::StorageCell;

use crate::commands::CommandSettings;
use crate::error::CoreError;
use crate::quick_links::{QuickLink, QuickLinkStore};
use crate::schema::{self, Section};
use crate::settings::{Settings, SettingsStore, WallpaperType};
use crate::theme::Theme;
use crate::Result;

pub const FORMAT_VERSION: &str = "1.0.0";

/// The export artifact.
///
/// Every section is optional so that bundles with some sections missing
/// still parse. Field names of older exports are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    #[serde(alias = "version")]
    pub format_version: String,
    #[serde(alias = "exportDate")]
    pub export_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, alias = "quickUrls", skip_serializing_if = "Option::is_none")]
    pub quick_links: Option<Vec<QuickLink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_settings: Option<CommandSettings>,
}

impl ExportBundle {
    pub fn suggested_file_name(&self) -> String {
        format!(
            "nexttab-settings-{}.json",
            self.export_timestamp.format("%Y-%m-%d")
        )
    }
}

/// Outcome of an import that was not rejected outright.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub warnings: Vec<String>,
    /// Sections written, in import order
    pub imported_sections: Vec<Section>,
    pub skipped_quick_links: usize,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Reads and writes the cells that make up a bundle.
#[derive(Clone)]
pub struct DataTransfer {
    settings: SettingsStore,
    quick_links: QuickLinkStore,
    theme: StorageCell<Theme>,
    command_settings: StorageCell<CommandSettings>,
}

impl DataTransfer {
    pub fn new(
        settings: SettingsStore,
        quick_links: QuickLinkStore,
        theme: StorageCell<Theme>,
        command_settings: StorageCell<CommandSettings>,
    ) -> Self {
        Self {
            settings,
            quick_links,
            theme,
            command_settings,
        }
    }

    pub async fn export(&self) -> Result<ExportBundle> {
        let (settings, quick_links, theme, command_settings) = tokio::try_join!(
            self.settings.get(),
            self.quick_links.get(),
            self.theme.get(),
            self.command_settings.get(),
        )?;

        Ok(ExportBundle {
            format_version: FORMAT_VERSION.to_string(),
            export_timestamp: Utc::now(),
            theme: Some(theme),
            settings: Some(settings),
            quick_links: Some(quick_links),
            command_settings: Some(command_settings),
        })
    }

    /// Exports as pretty-printed JSON, ready to be saved.
    pub async fn export_json(&self) -> Result<Vec<u8>> {
        let bundle = self.export().await?;
        Ok(serde_json::to_vec_pretty(&bundle)?)
    }

    pub async fn import_json(&self, bytes: &[u8]) -> Result<ImportReport> {
        let bundle: Value = serde_json::from_slice(bytes)
            .map_err(|e| CoreError::InvalidBundle(format!("not valid JSON ({})", e)))?;
        self.import_value(&bundle).await
    }

    /// Imports every recognised section on its own.
    ///
    /// Only a bundle that is not a record, or that has no recognised
    /// section, fails the call; that check happens before any write. Section
    /// problems come back as warnings. A section key that is present with a
    /// `null` value counts as present and is reported as invalid.
    pub async fn import_value(&self, bundle: &Value) -> Result<ImportReport> {
        let Some(record) = bundle.as_object() else {
            return Err(CoreError::InvalidBundle(
                "expected a JSON object".to_string(),
            ));
        };

        let sections: Vec<(Section, &Value)> = Section::ALL
            .into_iter()
            .filter_map(|section| section_value(record, section).map(|value| (section, value)))
            .collect();

        if sections.is_empty() {
            let expected = Section::ALL
                .iter()
                .map(Section::field_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CoreError::InvalidBundle(format!(
                "no recognized sections, expected one of {}",
                expected
            )));
        }

        let mut report = ImportReport::default();
        for (section, value) in sections {
            match self.import_section(section, value, &mut report).await {
                Ok(()) => report.imported_sections.push(section),
                Err(warning) => {
                    tracing::warn!(section = %section, reason = %warning, "Skipped import section");
                    report.warnings.push(warning);
                }
            }
        }

        tracing::info!(
            imported = report.imported_sections.len(),
            warnings = report.warnings.len(),
            skipped_quick_links = report.skipped_quick_links,
            "Import finished"
        );
        Ok(report)
    }

    async fn import_section(
        &self,
        section: Section,
        value: &Value,
        report: &mut ImportReport,
    ) -> std::result::Result<(), String> {
        match section {
            Section::Settings => {
                let mut patch = schema::validate_settings_patch(value).map_err(|e| e.to_string())?;
                remap_wallpaper_type(&mut patch);
                self.settings
                    .merge(&Value::Object(patch))
                    .await
                    .map_err(|e| save_failed(section, e))?;
            }
            Section::QuickLinks => {
                let batch = schema::validate_quick_links(value).map_err(|e| e.to_string())?;
                if batch.skipped > 0 {
                    report.skipped_quick_links += batch.skipped;
                    report.warnings.push(format!(
                        "Skipped {} invalid quick link item(s)",
                        batch.skipped
                    ));
                }
                self.quick_links
                    .set(batch.links)
                    .await
                    .map_err(|e| save_failed(section, e))?;
            }
            Section::Theme => {
                let theme = schema::validate_theme(value).map_err(|e| e.to_string())?;
                self.theme
                    .set(theme)
                    .await
                    .map_err(|e| save_failed(section, e))?;
            }
            Section::CommandSettings => {
                let settings =
                    schema::validate_command_settings(value).map_err(|e| e.to_string())?;
                self.command_settings
                    .set(settings)
                    .await
                    .map_err(|e| save_failed(section, e))?;
            }
        }
        Ok(())
    }
}

/// A section is present when its key exists, whatever the value. The
/// current field name wins over the legacy one.
fn section_value(record: &Map<String, Value>, section: Section) -> Option<&Value> {
    record.get(section.field_name()).or_else(|| {
        section
            .legacy_field_name()
            .and_then(|name| record.get(name))
    })
}

/// Bundles never carry the device-local image, so any wallpaper source other
/// than a URL becomes one.
fn remap_wallpaper_type(patch: &mut Map<String, Value>) {
    let synced = WallpaperType::Local.synced_equivalent().as_str();
    if let Some(kind) = patch.get_mut("wallpaperType") {
        if kind.as_str() != Some(synced) {
            tracing::debug!(from = %kind, to = synced, "Remapping imported wallpaper type");
            *kind = Value::from(synced);
        }
    }
}

fn save_failed(section: Section, err: impl std::fmt::Display) -> String {
    format!("Failed to save {}: {}", section, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_suggested_file_name_uses_export_date() {
        let bundle = ExportBundle {
            format_version: FORMAT_VERSION.to_string(),
            export_timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap(),
            theme: None,
            settings: None,
            quick_links: None,
            command_settings: None,
        };
        assert_eq!(bundle.suggested_file_name(), "nexttab-settings-2024-03-09.json");

        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(
            value,
            json!({"formatVersion": "1.0.0", "exportTimestamp": "2024-03-09T23:59:00Z"})
        );
    }

    #[test]
    fn test_older_field_names_parse() {
        let bundle: ExportBundle = serde_json::from_value(json!({
            "version": "1.0.0",
            "exportDate": "2023-11-02T08:00:00.000Z",
            "theme": "light",
            "quickUrls": [{"id": "1", "title": "A", "url": "http://a"}],
        }))
        .unwrap();

        assert_eq!(bundle.theme, Some(Theme::Light));
        assert_eq!(bundle.quick_links.map(|l| l.len()), Some(1));
        assert!(bundle.settings.is_none());
    }

    #[test]
    fn test_null_section_counts_as_present() {
        let record = json!({"theme": null, "quickLinks": null, "quickUrls": []});
        let record = record.as_object().unwrap();

        assert_eq!(section_value(record, Section::Theme), Some(&Value::Null));
        assert_eq!(section_value(record, Section::QuickLinks), Some(&Value::Null));
        assert!(section_value(record, Section::Settings).is_none());

        let legacy = json!({"quickUrls": []});
        assert_eq!(
            section_value(legacy.as_object().unwrap(), Section::QuickLinks),
            Some(&json!([]))
        );
    }

    #[test]
    fn test_wallpaper_type_remap() {
        for kind in [json!("local"), json!("video"), json!("url"), json!(5), Value::Null] {
            let mut patch = Map::new();
            patch.insert("wallpaperType".into(), kind);
            remap_wallpaper_type(&mut patch);
            assert_eq!(patch["wallpaperType"], json!("url"));
        }

        let mut patch = Map::new();
        remap_wallpaper_type(&mut patch);
        assert!(patch.is_empty());
    }
}
