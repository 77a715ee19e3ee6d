//! Integration tests for the translation engine public API.
//!
//! These tests exercise extraction, locale resolution, predicate building,
//! and the synchronizer's fail-fast configuration check. Flows that need a
//! live PostgreSQL (actual row writes and rollback) are covered by the
//! statement-level tests in the library modules.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use tradotto::{
    AttributeMap, Comparison, FallbackPolicy, FixedLocale, TranslatableDefinition,
    TranslatableRegistry, TranslatedEntity, TranslationError, TranslationQuery, TranslationRecord,
    TranslationSynchronizer, extract,
};

fn product() -> TranslatableDefinition {
    TranslatableDefinition::new("app.catalog.Product", "product", ["name", "description"])
}

fn attrs(value: Value) -> AttributeMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn record(entity_id: Uuid, locale: &str, name: &str) -> TranslationRecord {
    let mut values = BTreeMap::new();
    values.insert("name".to_string(), Some(name.to_string()));
    values.insert("description".to_string(), None);
    TranslationRecord {
        id: Uuid::now_v7(),
        entity_id,
        locale: locale.to_string(),
        values,
    }
}

fn entity_with(locales: &[(&str, &str)]) -> TranslatedEntity {
    let id = Uuid::now_v7();
    let mut entity = TranslatedEntity::new(id, AttributeMap::new());
    entity.set_translations(
        locales
            .iter()
            .map(|(locale, name)| record(id, locale, name))
            .collect(),
    );
    entity
}

/// A pool that never connects: the fail-fast tests assert errors raised
/// before any database call.
fn unreachable_pool() -> sqlx::PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost:1/tradotto_test")
        .expect("lazy pool construction does not connect")
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn extract_splits_base_and_translations() {
    let input = attrs(json!({
        "sku": "CH-001",
        "name": {"en": "Chair", "fr": "Chaise"},
    }));

    let (remaining, set) = extract(&product(), input).unwrap();
    assert_eq!(remaining["sku"], json!("CH-001"));
    assert!(!remaining.contains_key("name"));
    assert_eq!(set["en"]["name"], json!("Chair"));
    assert_eq!(set["fr"]["name"], json!("Chaise"));
}

#[test]
fn extract_rejects_plain_string_translatable() {
    let err = extract(&product(), attrs(json!({"name": "Chair"}))).unwrap_err();
    match err {
        TranslationError::InvalidFormat { attribute } => assert_eq!(attribute, "name"),
        other => panic!("expected InvalidFormat, got {other:?}"),
    }
}

#[test]
fn extract_requires_translatable_declaration() {
    let undeclared =
        TranslatableDefinition::new("app.catalog.Widget", "widget", Vec::<String>::new());
    let err = extract(&undeclared, attrs(json!({"sku": "W-1"}))).unwrap_err();
    assert!(matches!(err, TranslationError::MissingTranslatables { .. }));
}

// ============================================================================
// Locale resolution through entity accessors
// ============================================================================

#[test]
fn translated_returns_per_locale_values() {
    let entity = entity_with(&[("en", "Chair"), ("fr", "Chaise")]);

    let en = FixedLocale::new("en");
    let fr = FixedLocale::new("fr");
    assert_eq!(
        entity.translated("name", &en, FallbackPolicy::None),
        Some("Chair")
    );
    assert_eq!(
        entity.translated("name", &fr, FallbackPolicy::None),
        Some("Chaise")
    );
}

#[test]
fn app_fallback_exposes_fallback_locale_value() {
    let entity = entity_with(&[("en", "Chair")]);
    let de = FixedLocale::with_fallback("de", "en");
    assert_eq!(
        entity.translated("name", &de, FallbackPolicy::App),
        Some("Chair")
    );
}

#[test]
fn first_fallback_exposes_some_loaded_value() {
    let entity = entity_with(&[("fr", "Chaise"), ("de", "Stuhl")]);
    let en = FixedLocale::new("en");
    let value = entity.translated("name", &en, FallbackPolicy::First);
    // Load order is storage-defined; only membership is guaranteed.
    assert!(matches!(value, Some("Chaise") | Some("Stuhl")));
}

#[test]
fn unresolvable_access_is_absent_not_error() {
    let entity = entity_with(&[("fr", "Chaise")]);
    let de = FixedLocale::with_fallback("de", "en");
    assert_eq!(entity.translated("name", &de, FallbackPolicy::App), None);
    assert_eq!(entity.translated("name", &de, FallbackPolicy::None), None);
}

#[test]
fn all_translations_lists_every_locale() {
    let entity = entity_with(&[("en", "Chair"), ("fr", "Chaise")]);
    let all = entity.all_translations("name");
    assert_eq!(all.len(), 2);
    assert_eq!(all["en"], Some("Chair".to_string()));
    assert_eq!(all["fr"], Some("Chaise".to_string()));
}

// ============================================================================
// Translation type resolution and auto eager load
// ============================================================================

#[test]
fn translation_type_follows_convention() {
    let registry = TranslatableRegistry::new(false);
    registry.register(TranslatableDefinition::new(
        "App.Models.Product",
        "product",
        ["name"],
    ));
    assert_eq!(
        registry.translation_type_of("App.Models.Product").unwrap(),
        "App.Models.Translations.ProductTranslation"
    );
}

#[test]
fn translation_type_override_wins() {
    let def = product().with_translation_type("app.catalog.ProductI18n");
    assert_eq!(def.translation_type(), "app.catalog.ProductI18n");
}

#[test]
fn auto_load_enrollment_is_idempotent() {
    let registry = TranslatableRegistry::new(true);
    registry.register(product());
    registry.register(product());
    registry.enable_auto_load("app.catalog.Product");

    assert_eq!(registry.len(), 1);
    assert!(registry.auto_load_enabled("app.catalog.Product"));
    assert!(!registry.auto_load_enabled("app.catalog.Other"));
}

// ============================================================================
// Query predicates
// ============================================================================

#[test]
fn where_translation_filters_by_locale_and_value() {
    let sql = TranslationQuery::new(Arc::new(product()), "en")
        .where_translation_op("name", Comparison::Like, "%X%")
        .build();

    assert!(sql.contains("EXISTS"), "{sql}");
    assert!(sql.contains("\"locale\" = 'en'"), "{sql}");
    assert!(sql.contains("LIKE '%X%'"), "{sql}");
}

#[test]
fn where_any_translation_matches_across_locales() {
    let with_locale = TranslationQuery::new(Arc::new(product()), "en")
        .where_translation_op("name", Comparison::Like, "%X%")
        .build();
    let any_locale = TranslationQuery::new(Arc::new(product()), "en")
        .where_any_translation_op("name", Comparison::Like, "%X%")
        .build();

    // Same value constraint, no locale constraint: a superset of the matches.
    assert!(any_locale.contains("LIKE '%X%'"), "{any_locale}");
    assert!(with_locale.contains("\"locale\""), "{with_locale}");
    assert!(!any_locale.contains("\"locale\""), "{any_locale}");
}

#[test]
fn or_where_composes_with_or() {
    let sql = TranslationQuery::new(Arc::new(product()), "en")
        .where_translation("name", "Chair")
        .or_where_translation_at("name", Comparison::Eq, "Chaise", "fr")
        .build();

    assert!(sql.contains(" OR "), "{sql}");
    assert!(sql.contains("'fr'"), "{sql}");
}

// ============================================================================
// Synchronizer fail-fast (no database touched)
// ============================================================================

#[tokio::test]
async fn write_paths_fail_fast_without_translatable_declaration() {
    let undeclared = Arc::new(TranslatableDefinition::new(
        "app.catalog.Widget",
        "widget",
        Vec::<String>::new(),
    ));
    let sync = TranslationSynchronizer::new(unreachable_pool(), undeclared);

    let err = sync
        .create_with_translations(attrs(json!({"sku": "W-1"})))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::MissingTranslatables { .. }));

    let mut entity = TranslatedEntity::new(Uuid::now_v7(), AttributeMap::new());
    let err = sync
        .update_with_translations(&mut entity, attrs(json!({"sku": "W-2"})))
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::MissingTranslatables { .. }));

    let err = sync
        .first_or_create_with_translations(attrs(json!({"sku": "W-1"})), AttributeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::MissingTranslatables { .. }));

    let err = sync
        .update_or_create_with_translations(attrs(json!({"sku": "W-1"})), AttributeMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TranslationError::MissingTranslatables { .. }));
}
