//! Write-path attribute extraction.
//!
//! Splits a flat attribute map into the base-entity attributes and a
//! locale-indexed translation set, validating shape along the way.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{TranslationError, TranslationResult};
use crate::locale::validate_locale;
use crate::registry::TranslatableDefinition;

/// Flat attribute map, as accepted by the write path.
pub type AttributeMap = Map<String, Value>;

/// Locale-indexed translation values: locale -> attribute -> value.
///
/// Transient; produced by [`extract`] and consumed immediately by the
/// synchronizer. BTreeMap keys give deterministic per-locale write order.
pub type TranslationSet = BTreeMap<String, BTreeMap<String, Value>>;

/// Fail with [`TranslationError::MissingTranslatables`] when the type never
/// declared translatable attributes. The synchronizer runs this before
/// opening a transaction.
pub(crate) fn ensure_declared(def: &TranslatableDefinition) -> TranslationResult<()> {
    if def.translatable.is_empty() {
        return Err(TranslationError::MissingTranslatables {
            type_name: def.type_name.clone(),
        });
    }
    Ok(())
}

/// Split `attributes` into (remaining base attributes, translation set).
///
/// Each declared translatable attribute present in the map must be a JSON
/// object mapping locale codes to scalar values; declared attributes absent
/// from the map are skipped. Non-translatable entries pass through untouched.
pub fn extract(
    def: &TranslatableDefinition,
    attributes: AttributeMap,
) -> TranslationResult<(AttributeMap, TranslationSet)> {
    ensure_declared(def)?;

    let mut remaining = attributes;
    let mut set = TranslationSet::new();

    for attribute in &def.translatable {
        let Some(value) = remaining.remove(attribute) else {
            continue;
        };

        let Value::Object(locales) = value else {
            return Err(TranslationError::InvalidFormat {
                attribute: attribute.clone(),
            });
        };

        for (locale, value) in locales {
            validate_locale(&locale)?;
            if value.is_object() || value.is_array() {
                return Err(TranslationError::InvalidFormat {
                    attribute: attribute.clone(),
                });
            }
            set.entry(locale)
                .or_default()
                .insert(attribute.clone(), value);
        }
    }

    Ok((remaining, set))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::registry::TranslatableDefinition;

    fn product() -> TranslatableDefinition {
        TranslatableDefinition::new("app.catalog.Product", "product", ["name", "description"])
    }

    fn attrs(value: Value) -> AttributeMap {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn splits_translatable_from_base_attributes() {
        let input = attrs(json!({
            "sku": "CH-001",
            "price": 1999,
            "name": {"en": "Chair", "fr": "Chaise"},
            "description": {"en": "A chair"},
        }));

        let (remaining, set) = extract(&product(), input).unwrap();

        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining["sku"], json!("CH-001"));
        assert_eq!(remaining["price"], json!(1999));

        assert_eq!(set.len(), 2);
        assert_eq!(set["en"]["name"], json!("Chair"));
        assert_eq!(set["en"]["description"], json!("A chair"));
        assert_eq!(set["fr"]["name"], json!("Chaise"));
        assert!(!set["fr"].contains_key("description"));
    }

    #[test]
    fn absent_translatable_attributes_are_skipped() {
        let input = attrs(json!({"sku": "CH-001", "name": {"en": "Chair"}}));
        let (remaining, set) = extract(&product(), input).unwrap();

        assert_eq!(remaining.len(), 1);
        assert_eq!(set.len(), 1);
        // "description" was declared but not supplied: no entry for any locale.
        assert!(!set["en"].contains_key("description"));
    }

    #[test]
    fn no_translatable_input_yields_empty_set() {
        let input = attrs(json!({"sku": "CH-001"}));
        let (remaining, set) = extract(&product(), input).unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn plain_string_for_translatable_attribute_is_invalid() {
        let input = attrs(json!({"name": "Chair"}));
        let err = extract(&product(), input).unwrap_err();
        match err {
            TranslationError::InvalidFormat { attribute } => assert_eq!(attribute, "name"),
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn nested_object_value_is_invalid() {
        let input = attrs(json!({"name": {"en": {"value": "Chair"}}}));
        let err = extract(&product(), input).unwrap_err();
        match err {
            TranslationError::InvalidFormat { attribute } => assert_eq!(attribute, "name"),
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }

    #[test]
    fn scalar_values_of_any_json_kind_are_accepted() {
        let input = attrs(json!({"name": {"en": "Chair", "fr": 7, "de": true, "es": null}}));
        let (_, set) = extract(&product(), input).unwrap();
        assert_eq!(set["fr"]["name"], json!(7));
        assert_eq!(set["de"]["name"], json!(true));
        assert_eq!(set["es"]["name"], json!(null));
    }

    #[test]
    fn malformed_locale_key_is_rejected() {
        let input = attrs(json!({"name": {"EN": "Chair"}}));
        let err = extract(&product(), input).unwrap_err();
        match err {
            TranslationError::InvalidLocale { locale } => assert_eq!(locale, "EN"),
            other => panic!("expected InvalidLocale, got {other:?}"),
        }
    }

    #[test]
    fn missing_declaration_is_a_configuration_error() {
        let def = TranslatableDefinition::new("app.catalog.Widget", "widget", Vec::<String>::new());
        let input = attrs(json!({"name": {"en": "Widget"}}));
        let err = extract(&def, input).unwrap_err();
        assert!(matches!(err, TranslationError::MissingTranslatables { .. }));
    }
}
