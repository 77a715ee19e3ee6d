//! Read-path locale resolution.
//!
//! Given the loaded translation rows of an entity and the ambient current
//! locale, selects the single row to expose under the configured fallback
//! policy. Absence is a defined result, never an error.

use std::collections::BTreeMap;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::models::TranslationRecord;

/// Rule determining which translation to expose when none exists for the
/// current locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// No fallback: a missing current-locale row resolves to absent.
    #[default]
    None,

    /// Fall back to the application-configured fallback locale.
    App,

    /// Fall back to the first row in load order.
    First,
}

impl FallbackPolicy {
    /// Parse a configuration value ("none"/"null"/empty, "app", or "first").
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "none" | "null" => Ok(Self::None),
            "app" => Ok(Self::App),
            "first" => Ok(Self::First),
            other => bail!("invalid fallback policy '{other}': must be 'app', 'first', or 'none'"),
        }
    }
}

/// Select the translation row to expose for `current_locale`.
///
/// In order: the row matching `current_locale`; under [`FallbackPolicy::App`]
/// the row matching `fallback_locale`; under [`FallbackPolicy::First`] the
/// first row in load order (no sort is imposed here; load order is whatever
/// the storage layer returned); otherwise absent.
pub fn resolve<'a>(
    records: &'a [TranslationRecord],
    current_locale: &str,
    policy: FallbackPolicy,
    fallback_locale: Option<&str>,
) -> Option<&'a TranslationRecord> {
    if let Some(record) = records.iter().find(|r| r.locale == current_locale) {
        return Some(record);
    }

    match policy {
        FallbackPolicy::App => {
            fallback_locale.and_then(|locale| records.iter().find(|r| r.locale == locale))
        }
        FallbackPolicy::First => records.first(),
        FallbackPolicy::None => None,
    }
}

/// Map every loaded row's locale to its value for `attribute`, independent of
/// fallback policy.
pub fn all_translations(
    records: &[TranslationRecord],
    attribute: &str,
) -> BTreeMap<String, Option<String>> {
    records
        .iter()
        .map(|r| (r.locale.clone(), r.value(attribute).map(str::to_string)))
        .collect()
}
