//! Model capability table: the built-in model list merged with the
//! operator's `custom_models` overrides.

use serde::Serialize;
use std::collections::HashMap;

/// Models known to the proxy out of the box. All start out available.
pub const DEFAULT_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4-0613",
    "gpt-4-32k",
    "gpt-4-1106-preview",
    "gpt-4-vision-preview",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-1106",
    "gpt-3.5-turbo-16k",
    "gemini-pro",
];

/// One row of the model table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub available: bool,
    pub display_name: String,
}

/// Model name → availability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModelTable(HashMap<String, ModelEntry>);

impl ModelTable {
    /// Builds the table from `defaults` and a comma-separated override list.
    ///
    /// Each override is `[+|-]name[=Display]`; `all` as the name flips every
    /// model already in the table. Overrides apply left to right.
    #[must_use]
    pub fn collect(defaults: &[&str], custom_models: &str) -> Self {
        let mut table: HashMap<String, ModelEntry> = defaults
            .iter()
            .map(|name| {
                (
                    (*name).to_string(),
                    ModelEntry {
                        available: true,
                        display_name: (*name).to_string(),
                    },
                )
            })
            .collect();

        for raw in custom_models.split(',') {
            let item = raw.trim();
            if item.is_empty() {
                continue;
            }
            let available = !item.starts_with('-');
            let spec = item
                .strip_prefix('+')
                .or_else(|| item.strip_prefix('-'))
                .unwrap_or(item);
            let (name, display) = match spec.split_once('=') {
                Some((name, display)) => (name.trim(), Some(display.trim())),
                None => (spec.trim(), None),
            };
            if name.is_empty() {
                continue;
            }
            if name == "all" {
                for entry in table.values_mut() {
                    entry.available = available;
                }
            } else {
                let display_name = display
                    .filter(|d| !d.is_empty())
                    .unwrap_or(name)
                    .to_string();
                table.insert(
                    name.to_string(),
                    ModelEntry {
                        available,
                        display_name,
                    },
                );
            }
        }

        Self(table)
    }

    /// Looks up a model by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.0.get(name)
    }

    /// `true` only when the table explicitly marks `name` unavailable.
    /// Unknown names have no policy and are never disabled.
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.get(name).is_some_and(|entry| !entry.available)
    }
}
