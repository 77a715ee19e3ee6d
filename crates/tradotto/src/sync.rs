//! Write-path synchronization of base entities and their translation rows.
//!
//! Every operation runs its whole read/write sequence inside one transaction:
//! either all base and translation writes commit, or none do. Dropping the
//! transaction on any early-return path rolls it back. Statements are built
//! with SeaQuery and rendered for Postgres with values inline, so the engine
//! stays generic over the column types each registered table declares.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sea_query::{Alias, Expr, ExprTrait, PostgresQueryBuilder, Query, SimpleExpr};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::error::TranslationResult;
use crate::extract::{self, AttributeMap};
use crate::models::TranslatedEntity;
use crate::registry::TranslatableDefinition;

/// Orchestrates transactional create/update/upsert of a base entity plus its
/// translation rows.
#[derive(Clone)]
pub struct TranslationSynchronizer {
    pool: PgPool,
    def: Arc<TranslatableDefinition>,
}

impl TranslationSynchronizer {
    /// Create a synchronizer for one registered type.
    pub fn new(pool: PgPool, def: Arc<TranslatableDefinition>) -> Self {
        Self { pool, def }
    }

    /// The definition this synchronizer writes against.
    pub fn definition(&self) -> &TranslatableDefinition {
        &self.def
    }

    /// Create a base entity and one translation row per supplied locale.
    pub async fn create_with_translations(
        &self,
        attributes: AttributeMap,
    ) -> TranslationResult<TranslatedEntity> {
        extract::ensure_declared(&self.def)?;

        let mut tx = self.pool.begin().await?;
        let (remaining, set) = extract::extract(&self.def, attributes)?;

        let id = Uuid::now_v7();
        let now = Utc::now().timestamp();

        let sql = insert_entity_sql(&self.def, id, &remaining)?;
        sqlx::query(&sql).execute(&mut *tx).await?;

        for (locale, fields) in &set {
            let sql = insert_translation_sql(&self.def, Uuid::now_v7(), id, locale, fields, now)?;
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!(
            entity_id = %id,
            base_table = %self.def.base_table,
            locales = set.len(),
            "entity created with translations"
        );

        let mut attributes = remaining;
        attributes.insert("id".to_string(), Value::String(id.to_string()));
        let mut entity = TranslatedEntity::new(id, attributes);
        entity.load_translations(&self.pool, &self.def).await?;
        Ok(entity)
    }

    /// Update a base entity and upsert the supplied translation rows.
    ///
    /// Locales not named in this call are left entirely untouched; fields not
    /// named on a matched row keep their current value. Returns whether the
    /// base-entity update reported a change. The entity's association is
    /// refreshed from storage afterwards.
    pub async fn update_with_translations(
        &self,
        entity: &mut TranslatedEntity,
        attributes: AttributeMap,
    ) -> TranslationResult<bool> {
        extract::ensure_declared(&self.def)?;

        let mut tx = self.pool.begin().await?;
        let (remaining, set) = extract::extract(&self.def, attributes)?;
        let now = Utc::now().timestamp();

        let changed = match update_entity_sql(&self.def, entity.id, &remaining) {
            Some(sql) => sqlx::query(&sql).execute(&mut *tx).await?.rows_affected() > 0,
            None => false,
        };

        for (locale, fields) in &set {
            sync_translation(&mut tx, &self.def, entity.id, locale, fields, now).await?;
        }

        tx.commit().await?;
        info!(
            entity_id = %entity.id,
            base_table = %self.def.base_table,
            locales = set.len(),
            changed,
            "entity translations synchronized"
        );

        for (name, value) in remaining {
            entity.attributes.insert(name, value);
        }
        entity.load_translations(&self.pool, &self.def).await?;
        Ok(changed)
    }

    /// Return the entity matching `match_attrs`, or create it with the merged
    /// attributes and translations.
    ///
    /// On the found path no translation write occurs: existing translations
    /// are never touched, only reloaded.
    pub async fn first_or_create_with_translations(
        &self,
        match_attrs: AttributeMap,
        extra_attrs: AttributeMap,
    ) -> TranslationResult<TranslatedEntity> {
        extract::ensure_declared(&self.def)?;
        let merged = merge_attributes(&match_attrs, &extra_attrs);

        let mut tx = self.pool.begin().await?;
        let (remaining, set) = extract::extract(&self.def, merged)?;

        let lookup = base_match_attributes(&self.def, &match_attrs);
        let sql = find_entity_sql(&self.def, &lookup);
        let found: Option<Value> = sqlx::query_scalar(&sql).fetch_optional(&mut *tx).await?;

        let mut entity = match found {
            Some(row) => {
                tx.commit().await?;
                TranslatedEntity::from_row(row)?
            }
            None => {
                let id = Uuid::now_v7();
                let now = Utc::now().timestamp();

                let sql = insert_entity_sql(&self.def, id, &remaining)?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                for (locale, fields) in &set {
                    let sql =
                        insert_translation_sql(&self.def, Uuid::now_v7(), id, locale, fields, now)?;
                    sqlx::query(&sql).execute(&mut *tx).await?;
                }
                tx.commit().await?;
                info!(
                    entity_id = %id,
                    base_table = %self.def.base_table,
                    locales = set.len(),
                    "entity created with translations"
                );

                let mut attributes = remaining;
                attributes.insert("id".to_string(), Value::String(id.to_string()));
                TranslatedEntity::new(id, attributes)
            }
        };

        entity.load_translations(&self.pool, &self.def).await?;
        Ok(entity)
    }

    /// Upsert the entity matching `match_attrs` and reconcile every supplied
    /// translation locale, regardless of which base branch ran.
    pub async fn update_or_create_with_translations(
        &self,
        match_attrs: AttributeMap,
        extra_attrs: AttributeMap,
    ) -> TranslationResult<TranslatedEntity> {
        extract::ensure_declared(&self.def)?;
        let merged = merge_attributes(&match_attrs, &extra_attrs);

        let mut tx = self.pool.begin().await?;
        let (remaining, set) = extract::extract(&self.def, merged)?;
        let now = Utc::now().timestamp();

        let lookup = base_match_attributes(&self.def, &match_attrs);
        let sql = find_entity_sql(&self.def, &lookup);
        let found: Option<Value> = sqlx::query_scalar(&sql).fetch_optional(&mut *tx).await?;

        let (id, attributes) = match found {
            Some(row) => {
                let mut existing = TranslatedEntity::from_row(row)?;
                if let Some(sql) = update_entity_sql(&self.def, existing.id, &remaining) {
                    sqlx::query(&sql).execute(&mut *tx).await?;
                }
                for (name, value) in remaining {
                    existing.attributes.insert(name, value);
                }
                (existing.id, existing.attributes)
            }
            None => {
                let id = Uuid::now_v7();
                let sql = insert_entity_sql(&self.def, id, &remaining)?;
                sqlx::query(&sql).execute(&mut *tx).await?;

                let mut attributes = remaining;
                attributes.insert("id".to_string(), Value::String(id.to_string()));
                (id, attributes)
            }
        };

        for (locale, fields) in &set {
            sync_translation(&mut tx, &self.def, id, locale, fields, now).await?;
        }

        tx.commit().await?;
        info!(
            entity_id = %id,
            base_table = %self.def.base_table,
            locales = set.len(),
            "entity upserted with translations"
        );

        let mut entity = TranslatedEntity::new(id, attributes);
        entity.load_translations(&self.pool, &self.def).await?;
        Ok(entity)
    }
}

/// Upsert one translation row, matched by (foreign key, locale).
///
/// The engine relies on storage isolation plus the recommended uniqueness
/// constraint to prevent duplicate rows under race; no extra locking here.
async fn sync_translation(
    tx: &mut Transaction<'_, Postgres>,
    def: &TranslatableDefinition,
    entity_id: Uuid,
    locale: &str,
    fields: &BTreeMap<String, Value>,
    now: i64,
) -> TranslationResult<()> {
    let sql = find_translation_sql(def, entity_id, locale);
    let existing: Option<Uuid> = sqlx::query_scalar(&sql).fetch_optional(&mut **tx).await?;

    match existing {
        Some(row_id) => {
            let sql = update_translation_sql(def, row_id, fields, now);
            sqlx::query(&sql).execute(&mut **tx).await?;
        }
        None => {
            let sql = insert_translation_sql(def, Uuid::now_v7(), entity_id, locale, fields, now)?;
            sqlx::query(&sql).execute(&mut **tx).await?;
        }
    }
    Ok(())
}

/// Merge match and extra attributes; extra wins on overlap.
fn merge_attributes(match_attrs: &AttributeMap, extra_attrs: &AttributeMap) -> AttributeMap {
    let mut merged = match_attrs.clone();
    for (name, value) in extra_attrs {
        merged.insert(name.clone(), value.clone());
    }
    merged
}

/// Match attributes usable as base-table predicates: translatable entries
/// carry per-locale payloads, not column values, so they are dropped from
/// the lookup.
fn base_match_attributes(def: &TranslatableDefinition, match_attrs: &AttributeMap) -> AttributeMap {
    match_attrs
        .iter()
        .filter(|(name, _)| !def.translatable.iter().any(|a| a == *name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Render a JSON scalar for inline SQL. Arrays and objects target JSON
/// columns on the base table and render as JSON literals.
pub(crate) fn json_to_value(value: &Value) -> sea_query::Value {
    match value {
        Value::Null => sea_query::Value::from(None::<String>),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(f) = n.as_f64() {
                f.into()
            } else {
                n.to_string().into()
            }
        }
        Value::String(s) => s.clone().into(),
        other => other.clone().into(),
    }
}

fn insert_entity_sql(
    def: &TranslatableDefinition,
    id: Uuid,
    attributes: &AttributeMap,
) -> anyhow::Result<String> {
    let mut columns = vec![Alias::new("id")];
    let mut values: Vec<SimpleExpr> = vec![id.into()];
    for (name, value) in attributes {
        columns.push(Alias::new(name));
        values.push(json_to_value(value).into());
    }

    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(&def.base_table)).columns(columns);
    stmt.values(values).context("build entity insert")?;
    Ok(stmt.to_string(PostgresQueryBuilder))
}

/// None when there is nothing to update.
fn update_entity_sql(
    def: &TranslatableDefinition,
    id: Uuid,
    attributes: &AttributeMap,
) -> Option<String> {
    if attributes.is_empty() {
        return None;
    }

    let mut stmt = Query::update();
    stmt.table(Alias::new(&def.base_table));
    for (name, value) in attributes {
        stmt.value(Alias::new(name), json_to_value(value));
    }
    stmt.and_where(Expr::col(Alias::new("id")).eq(id));
    Some(stmt.to_string(PostgresQueryBuilder))
}

/// Select one entity row (as `row_to_json`) by equality on every match
/// attribute.
fn find_entity_sql(def: &TranslatableDefinition, match_attrs: &AttributeMap) -> String {
    let table = Alias::new(&def.base_table);
    let mut query = Query::select();
    query
        .expr_as(
            Expr::cust(format!("row_to_json(\"{}\")", def.base_table)),
            Alias::new("entity"),
        )
        .from(table.clone());
    for (name, value) in match_attrs {
        query.and_where(Expr::col((table.clone(), Alias::new(name))).eq(json_to_value(value)));
    }
    query.limit(1);
    query.to_string(PostgresQueryBuilder)
}

fn find_translation_sql(def: &TranslatableDefinition, entity_id: Uuid, locale: &str) -> String {
    let table = Alias::new(&def.translation_table);
    let mut query = Query::select();
    query
        .column((table.clone(), Alias::new("id")))
        .from(table.clone())
        .and_where(Expr::col((table.clone(), Alias::new(&def.foreign_key))).eq(entity_id))
        .and_where(Expr::col((table, Alias::new("locale"))).eq(locale))
        .limit(1);
    query.to_string(PostgresQueryBuilder)
}

fn insert_translation_sql(
    def: &TranslatableDefinition,
    row_id: Uuid,
    entity_id: Uuid,
    locale: &str,
    fields: &BTreeMap<String, Value>,
    now: i64,
) -> anyhow::Result<String> {
    let mut columns = vec![
        Alias::new("id"),
        Alias::new(&def.foreign_key),
        Alias::new("locale"),
    ];
    let mut values: Vec<SimpleExpr> = vec![row_id.into(), entity_id.into(), locale.into()];
    for (name, value) in fields {
        columns.push(Alias::new(name));
        values.push(json_to_value(value).into());
    }
    if def.timestamps {
        columns.push(Alias::new("created"));
        columns.push(Alias::new("changed"));
        values.push(now.into());
        values.push(now.into());
    }

    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(&def.translation_table))
        .columns(columns);
    stmt.values(values).context("build translation insert")?;
    Ok(stmt.to_string(PostgresQueryBuilder))
}

/// Update only the supplied fields on a matched translation row.
fn update_translation_sql(
    def: &TranslatableDefinition,
    row_id: Uuid,
    fields: &BTreeMap<String, Value>,
    now: i64,
) -> String {
    let mut stmt = Query::update();
    stmt.table(Alias::new(&def.translation_table));
    for (name, value) in fields {
        stmt.value(Alias::new(name), json_to_value(value));
    }
    if def.timestamps {
        stmt.value(Alias::new("changed"), now);
    }
    stmt.and_where(Expr::col(Alias::new("id")).eq(row_id));
    stmt.to_string(PostgresQueryBuilder)
}
