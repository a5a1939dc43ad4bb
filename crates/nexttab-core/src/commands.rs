//! Per-plugin command settings
//!
//! Each command plugin owns a free-form record keyed by its id. This layer
//! only requires that every entry is a record.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type PluginCommandSettings = Map<String, Value>;

pub type CommandSettings = BTreeMap<String, PluginCommandSettings>;

pub const COMMAND_SETTINGS_KEY: &str = "command-settings-storage-key";
