//! Translated entity and translation record models.
//!
//! A base entity row is carried generically as a JSON map (fetched via
//! `row_to_json`), with its translation rows loaded through the declared
//! definition. Translated attribute values cross the read boundary as text:
//! the select list casts each declared column with `CAST(.. AS TEXT)` so the
//! engine stays agnostic of the column types the migration chose.

use std::collections::BTreeMap;

use anyhow::{Context, anyhow};
use sea_query::{Alias, Expr, ExprTrait, PostgresQueryBuilder, Query};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::TranslationResult;
use crate::extract::AttributeMap;
use crate::locale::LocaleProvider;
use crate::registry::{TranslatableDefinition, TranslatableRegistry};
use crate::resolve::{self, FallbackPolicy};

/// One translation row: the per-locale values of a base entity.
///
/// At most one record exists per (entity, locale); the write path upserts by
/// explicit (foreign key, locale) match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Owning base entity.
    pub entity_id: Uuid,

    /// Locale code (e.g., "en", "fr").
    pub locale: String,

    /// Value per declared translatable attribute (null column -> None).
    pub values: BTreeMap<String, Option<String>>,
}

impl TranslationRecord {
    /// Value of a translatable attribute on this record.
    pub fn value(&self, attribute: &str) -> Option<&str> {
        self.values.get(attribute).and_then(|v| v.as_deref())
    }

    /// Load all translation rows of an entity, in storage order.
    pub async fn list_for_entity(
        pool: &PgPool,
        def: &TranslatableDefinition,
        entity_id: Uuid,
    ) -> TranslationResult<Vec<Self>> {
        let sql = select_translations_sql(def, entity_id);
        let rows = sqlx::query(&sql).fetch_all(pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(Self::from_pg_row(def, &row)?);
        }
        Ok(records)
    }

    fn from_pg_row(def: &TranslatableDefinition, row: &PgRow) -> TranslationResult<Self> {
        let id: Uuid = row.try_get("id")?;
        let entity_id: Uuid = row.try_get(def.foreign_key.as_str())?;
        let locale: String = row.try_get("locale")?;

        let mut values = BTreeMap::new();
        for attribute in &def.translatable {
            let value: Option<String> = row.try_get(attribute.as_str())?;
            values.insert(attribute.clone(), value);
        }

        Ok(Self {
            id,
            entity_id,
            locale,
            values,
        })
    }
}

/// Select the translation rows of an entity.
///
/// No ORDER BY: load order is whatever the storage layer returns, and the
/// "first" fallback policy follows it.
fn select_translations_sql(def: &TranslatableDefinition, entity_id: Uuid) -> String {
    let table = Alias::new(&def.translation_table);
    let mut query = Query::select();
    query
        .column((table.clone(), Alias::new("id")))
        .column((table.clone(), Alias::new(&def.foreign_key)))
        .column((table.clone(), Alias::new("locale")));
    for attribute in &def.translatable {
        query.expr_as(
            Expr::col((table.clone(), Alias::new(attribute))).cast_as(Alias::new("text")),
            Alias::new(attribute),
        );
    }
    query
        .from(table.clone())
        .and_where(Expr::col((table, Alias::new(&def.foreign_key))).eq(entity_id));
    query.to_string(PostgresQueryBuilder)
}

/// A base entity with its translation association.
#[derive(Debug, Clone)]
pub struct TranslatedEntity {
    /// Base entity identifier.
    pub id: Uuid,

    /// Base row attributes (including `id`), as returned by `row_to_json`.
    pub attributes: AttributeMap,

    translations: Vec<TranslationRecord>,
    translations_loaded: bool,
}

impl TranslatedEntity {
    /// Wrap a known base row. The association starts unloaded.
    pub fn new(id: Uuid, attributes: AttributeMap) -> Self {
        Self {
            id,
            attributes,
            translations: Vec::new(),
            translations_loaded: false,
        }
    }

    /// Build an entity from a `row_to_json` value.
    pub(crate) fn from_row(value: Value) -> TranslationResult<Self> {
        let Value::Object(attributes) = value else {
            return Err(anyhow!("entity row is not a JSON object").into());
        };
        let id = attributes
            .get("id")
            .and_then(Value::as_str)
            .map(Uuid::parse_str)
            .transpose()
            .context("entity id is not a UUID")?
            .ok_or_else(|| anyhow!("entity row has no id column"))?;
        Ok(Self::new(id, attributes))
    }

    /// Find an entity by ID. When the registry has the type enrolled for
    /// eager loading, the translation association is loaded in the same call.
    pub async fn find_by_id(
        pool: &PgPool,
        def: &TranslatableDefinition,
        registry: &TranslatableRegistry,
        id: Uuid,
    ) -> TranslationResult<Option<Self>> {
        let table = Alias::new(&def.base_table);
        let mut query = Query::select();
        query
            .expr_as(
                Expr::cust(format!("row_to_json(\"{}\")", def.base_table)),
                Alias::new("entity"),
            )
            .from(table.clone())
            .and_where(Expr::col((table, Alias::new("id"))).eq(id))
            .limit(1);
        let sql = query.to_string(PostgresQueryBuilder);

        let row: Option<Value> = sqlx::query_scalar(&sql).fetch_optional(pool).await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut entity = Self::from_row(row)?;
        if registry.auto_load_enabled(&def.type_name) {
            entity.load_translations(pool, def).await?;
        }
        Ok(Some(entity))
    }

    /// Loaded translation rows. Empty until loaded.
    pub fn translations(&self) -> &[TranslationRecord] {
        &self.translations
    }

    /// Whether the translation association has been loaded.
    pub fn translations_loaded(&self) -> bool {
        self.translations_loaded
    }

    /// Replace the association with freshly loaded rows.
    pub async fn load_translations(
        &mut self,
        pool: &PgPool,
        def: &TranslatableDefinition,
    ) -> TranslationResult<()> {
        self.translations = TranslationRecord::list_for_entity(pool, def, self.id).await?;
        self.translations_loaded = true;
        Ok(())
    }

    /// Load the association unless it is already loaded. A latency side
    /// effect, not a correctness concern.
    pub async fn ensure_translations(
        &mut self,
        pool: &PgPool,
        def: &TranslatableDefinition,
    ) -> TranslationResult<()> {
        if self.translations_loaded {
            return Ok(());
        }
        self.load_translations(pool, def).await
    }

    /// Set the association from rows loaded elsewhere.
    pub fn set_translations(&mut self, records: Vec<TranslationRecord>) {
        self.translations = records;
        self.translations_loaded = true;
    }

    /// A base (non-translatable) attribute value.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Value of a translatable attribute under the fallback policy.
    ///
    /// The current and fallback locales are read from the provider at each
    /// access. Resolution failure yields None, never an error.
    pub fn translated(
        &self,
        attribute: &str,
        locales: &dyn LocaleProvider,
        policy: FallbackPolicy,
    ) -> Option<&str> {
        let current = locales.current_locale();
        let fallback = locales.fallback_locale();
        resolve::resolve(&self.translations, &current, policy, fallback.as_deref())
            .and_then(|record| record.value(attribute))
    }

    /// Every loaded locale's value for `attribute`, independent of policy.
    pub fn all_translations(&self, attribute: &str) -> BTreeMap<String, Option<String>> {
        resolve::all_translations(&self.translations, attribute)
    }

    /// Whether a loaded translation row exists for `locale`.
    pub fn has_translation(&self, locale: &str) -> bool {
        self.translations.iter().any(|r| r.locale == locale)
    }
}
