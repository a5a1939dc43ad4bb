//! Section validation for import bundles
//!
//! Each top-level section of a bundle is checked on its own. A check either
//! yields a normalized value ready to store or a [`SchemaError`] naming the
//! section and every failing field. Quick links are checked per element so
//! one bad entry only drops that entry.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::commands::CommandSettings;
use crate::quick_links::QuickLink;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Settings,
    QuickLinks,
    Theme,
    CommandSettings,
}

impl Section {
    /// In import order
    pub const ALL: [Section; 4] = [
        Section::Settings,
        Section::QuickLinks,
        Section::Theme,
        Section::CommandSettings,
    ];

    pub fn field_name(&self) -> &'static str {
        match self {
            Section::Settings => "settings",
            Section::QuickLinks => "quickLinks",
            Section::Theme => "theme",
            Section::CommandSettings => "commandSettings",
        }
    }

    /// Field name used by bundles from older exports.
    pub fn legacy_field_name(&self) -> Option<&'static str> {
        match self {
            Section::QuickLinks => Some("quickUrls"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Dotted path inside the section, empty for the section itself
    pub path: String,
    pub reason: String,
}

impl FieldFailure {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{section} section is invalid: {}", join_failures(.failures))]
pub struct SchemaError {
    pub section: Section,
    pub failures: Vec<FieldFailure>,
}

fn join_failures(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy)]
enum FieldType {
    /// Any JSON value, null included
    Any,
    Bool,
    Text,
    NonEmptyText,
    OneOf(&'static [&'static str]),
    Record(&'static [FieldSpec]),
}

#[derive(Debug)]
struct FieldSpec {
    name: &'static str,
    ty: FieldType,
    required: bool,
    nullable: bool,
}

const fn optional(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
        nullable: false,
    }
}

const fn required(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: true,
        nullable: false,
    }
}

const fn nullable(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec {
        name,
        ty,
        required: false,
        nullable: true,
    }
}

const MQTT_FIELDS: &[FieldSpec] = &[
    optional("enabled", FieldType::Bool),
    optional("username", FieldType::Text),
    optional("secretKey", FieldType::Text),
];

// wallpaperType takes any value here; the importer stores every value it
// is given as a URL source.
const SETTINGS_FIELDS: &[FieldSpec] = &[
    optional("useHistorySuggestion", FieldType::Bool),
    optional("showBookmarksInQuickUrlMenu", FieldType::Bool),
    optional("showOpenTabsInQuickUrlMenu", FieldType::Bool),
    nullable("wallpaperUrl", FieldType::Text),
    optional("wallpaperType", FieldType::Any),
    optional("mqttSettings", FieldType::Record(MQTT_FIELDS)),
];

const QUICK_LINK_FIELDS: &[FieldSpec] = &[
    required("id", FieldType::NonEmptyText),
    required("title", FieldType::NonEmptyText),
    required("url", FieldType::NonEmptyText),
    nullable("icon", FieldType::Text),
];

const THEME_VALUES: &[&str] = &Theme::VALUES;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "record",
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Checks the known fields of a record and returns only those. Unknown
/// fields are dropped.
fn validate_record(
    fields: &[FieldSpec],
    value: &Value,
    path: &str,
    failures: &mut Vec<FieldFailure>,
) -> Map<String, Value> {
    let Some(record) = value.as_object() else {
        failures.push(FieldFailure::new(
            path,
            format!("expected record, found {}", kind_of(value)),
        ));
        return Map::new();
    };

    let mut normalized = Map::new();
    for spec in fields {
        let field_path = join_path(path, spec.name);
        match record.get(spec.name) {
            None => {
                if spec.required {
                    failures.push(FieldFailure::new(&field_path, "missing required field"));
                }
            }
            Some(Value::Null) if spec.nullable => {
                normalized.insert(spec.name.to_string(), Value::Null);
            }
            Some(field) => {
                if let Some(checked) = check_type(spec.ty, field, &field_path, failures) {
                    normalized.insert(spec.name.to_string(), checked);
                }
            }
        }
    }

    for name in record.keys() {
        if !fields.iter().any(|spec| spec.name == name) {
            tracing::debug!(field = %join_path(path, name), "Dropping unknown field");
        }
    }

    normalized
}

fn check_type(
    ty: FieldType,
    value: &Value,
    path: &str,
    failures: &mut Vec<FieldFailure>,
) -> Option<Value> {
    let mismatch = |expected: &str| {
        FieldFailure::new(
            path,
            format!("expected {}, found {}", expected, kind_of(value)),
        )
    };

    match ty {
        FieldType::Any => Some(value.clone()),
        FieldType::Bool if value.is_boolean() => Some(value.clone()),
        FieldType::Bool => {
            failures.push(mismatch("boolean"));
            None
        }
        FieldType::Text if value.is_string() => Some(value.clone()),
        FieldType::Text => {
            failures.push(mismatch("string"));
            None
        }
        FieldType::NonEmptyText => match value.as_str() {
            Some(s) if !s.is_empty() => Some(value.clone()),
            Some(_) => {
                failures.push(FieldFailure::new(path, "must not be empty"));
                None
            }
            None => {
                failures.push(mismatch("string"));
                None
            }
        },
        FieldType::OneOf(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => Some(value.clone()),
            Some(s) => {
                failures.push(FieldFailure::new(
                    path,
                    format!("expected one of {}, found \"{}\"", allowed.join(", "), s),
                ));
                None
            }
            None => {
                failures.push(mismatch("string"));
                None
            }
        },
        FieldType::Record(fields) => {
            let before = failures.len();
            let record = validate_record(fields, value, path, failures);
            (failures.len() == before).then_some(Value::Object(record))
        }
    }
}

/// Validates a partial settings record. The result holds only known fields
/// and is meant to be deep-merged into the stored settings.
pub fn validate_settings_patch(value: &Value) -> Result<Map<String, Value>, SchemaError> {
    let mut failures = Vec::new();
    let patch = validate_record(SETTINGS_FIELDS, value, "", &mut failures);
    if failures.is_empty() {
        Ok(patch)
    } else {
        Err(SchemaError {
            section: Section::Settings,
            failures,
        })
    }
}

pub fn validate_quick_link(value: &Value) -> Result<QuickLink, Vec<FieldFailure>> {
    let mut failures = Vec::new();
    let record = validate_record(QUICK_LINK_FIELDS, value, "", &mut failures);
    if !failures.is_empty() {
        return Err(failures);
    }
    serde_json::from_value(Value::Object(record)).map_err(|e| vec![FieldFailure::new("", e.to_string())])
}

/// Valid links of an imported list and how many entries were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuickLinkBatch {
    pub links: Vec<QuickLink>,
    pub skipped: usize,
}

/// Fails only when the section is not a list; bad elements are counted and
/// dropped.
pub fn validate_quick_links(value: &Value) -> Result<QuickLinkBatch, SchemaError> {
    let Some(items) = value.as_array() else {
        return Err(SchemaError {
            section: Section::QuickLinks,
            failures: vec![FieldFailure::new(
                "",
                format!("expected array, found {}", kind_of(value)),
            )],
        });
    };

    let mut batch = QuickLinkBatch::default();
    for (index, item) in items.iter().enumerate() {
        match validate_quick_link(item) {
            Ok(link) => batch.links.push(link),
            Err(failures) => {
                tracing::debug!(
                    index,
                    reason = %join_failures(&failures),
                    "Dropping invalid quick link"
                );
                batch.skipped += 1;
            }
        }
    }
    Ok(batch)
}

pub fn validate_theme(value: &Value) -> Result<Theme, SchemaError> {
    let mut failures = Vec::new();
    let checked = check_type(FieldType::OneOf(THEME_VALUES), value, "", &mut failures);
    match checked.as_ref().and_then(Value::as_str).map(str::parse::<Theme>) {
        Some(Ok(theme)) => Ok(theme),
        Some(Err(reason)) => Err(SchemaError {
            section: Section::Theme,
            failures: vec![FieldFailure::new("", reason)],
        }),
        None => Err(SchemaError {
            section: Section::Theme,
            failures,
        }),
    }
}

/// Every plugin entry must itself be a record; its contents are the plugin's
/// own business.
pub fn validate_command_settings(value: &Value) -> Result<CommandSettings, SchemaError> {
    let Some(plugins) = value.as_object() else {
        return Err(SchemaError {
            section: Section::CommandSettings,
            failures: vec![FieldFailure::new(
                "",
                format!("expected record, found {}", kind_of(value)),
            )],
        });
    };

    let mut settings = CommandSettings::new();
    let mut failures = Vec::new();
    for (plugin, entry) in plugins {
        match entry.as_object() {
            Some(record) => {
                settings.insert(plugin.clone(), record.clone());
            }
            None => failures.push(FieldFailure::new(
                plugin,
                format!("expected record, found {}", kind_of(entry)),
            )),
        }
    }

    if failures.is_empty() {
        Ok(settings)
    } else {
        Err(SchemaError {
            section: Section::CommandSettings,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_patch_keeps_known_fields_only() {
        let patch = validate_settings_patch(&json!({
            "useHistorySuggestion": false,
            "wallpaperUrl": null,
            "mqttSettings": {"enabled": true, "broker": "x"},
            "localWallpaperData": "data:image/png;base64,AAAA",
        }))
        .unwrap();

        assert_eq!(
            Value::Object(patch),
            json!({
                "useHistorySuggestion": false,
                "wallpaperUrl": null,
                "mqttSettings": {"enabled": true},
            })
        );
    }

    #[test]
    fn test_settings_patch_reports_every_bad_field() {
        let err = validate_settings_patch(&json!({
            "useHistorySuggestion": "yes",
            "mqttSettings": {"enabled": 1, "username": "bob"},
        }))
        .unwrap_err();

        assert_eq!(err.section, Section::Settings);
        assert_eq!(
            err.failures,
            vec![
                FieldFailure::new("useHistorySuggestion", "expected boolean, found string"),
                FieldFailure::new("mqttSettings.enabled", "expected boolean, found number"),
            ]
        );
        assert_eq!(
            err.to_string(),
            "settings section is invalid: useHistorySuggestion: expected boolean, found string; \
             mqttSettings.enabled: expected boolean, found number"
        );
    }

    #[test]
    fn test_settings_patch_accepts_any_wallpaper_type() {
        for kind in [json!("local"), json!(5), json!(null), json!({"kind": "video"})] {
            let patch = validate_settings_patch(&json!({
                "wallpaperType": kind.clone(),
                "useHistorySuggestion": false,
            }))
            .unwrap();
            assert_eq!(patch["wallpaperType"], kind);
            assert_eq!(patch["useHistorySuggestion"], json!(false));
        }
    }

    #[test]
    fn test_settings_patch_rejects_null_for_non_nullable() {
        let err = validate_settings_patch(&json!({"mqttSettings": null})).unwrap_err();
        assert_eq!(err.failures[0].path, "mqttSettings");
    }

    #[test]
    fn test_settings_patch_must_be_record() {
        let err = validate_settings_patch(&json!([1, 2])).unwrap_err();
        assert_eq!(err.failures, vec![FieldFailure::new("", "expected record, found array")]);
    }

    #[test]
    fn test_quick_links_drop_bad_elements() {
        let batch = validate_quick_links(&json!([
            {"id": "1", "title": "A", "url": "http://a"},
            {"id": "2"},
            {"id": "3", "title": "", "url": "http://c"},
            "not a record",
            {"id": "4", "title": "D", "url": "http://d", "icon": null, "extra": 1},
        ]))
        .unwrap();

        assert_eq!(batch.skipped, 3);
        assert_eq!(
            batch.links,
            vec![
                QuickLink {
                    id: "1".into(),
                    title: "A".into(),
                    url: "http://a".into(),
                    icon: None,
                },
                QuickLink {
                    id: "4".into(),
                    title: "D".into(),
                    url: "http://d".into(),
                    icon: None,
                },
            ]
        );
    }

    #[test]
    fn test_quick_links_section_must_be_list() {
        let err = validate_quick_links(&json!({"id": "1"})).unwrap_err();
        assert_eq!(err.section, Section::QuickLinks);
    }

    #[test]
    fn test_theme_values() {
        assert_eq!(validate_theme(&json!("dark")).unwrap(), Theme::Dark);

        let err = validate_theme(&json!("sepia")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "theme section is invalid: expected one of light, dark, system, found \"sepia\""
        );
        assert!(validate_theme(&json!(3)).is_err());
    }

    #[test]
    fn test_command_settings_entries_must_be_records() {
        let settings = validate_command_settings(&json!({
            "bookmarks": {"enabled": true, "prefix": "b"},
            "tabs": {},
        }))
        .unwrap();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings["bookmarks"]["prefix"], json!("b"));

        let err = validate_command_settings(&json!({"tabs": [1]})).unwrap_err();
        assert_eq!(err.failures, vec![FieldFailure::new("tabs", "expected record, found array")]);

        assert!(validate_command_settings(&json!(null)).is_err());
    }
}
