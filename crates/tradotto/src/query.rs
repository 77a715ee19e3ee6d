//! Query predicates over translated attributes.
//!
//! Every predicate is an existence sub-select against the translation table,
//! correlated on the foreign key: an entity matches when at least one of its
//! translation rows satisfies the locale and attribute constraints. Built
//! with SeaQuery and rendered for Postgres.

use std::sync::Arc;

use sea_query::{Alias, Asterisk, Expr, ExprTrait, PostgresQueryBuilder, Query, SimpleExpr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::TranslationResult;
use crate::locale::LocaleProvider;
use crate::models::TranslatedEntity;
use crate::registry::{TranslatableDefinition, TranslatableRegistry};
use crate::sync::json_to_value;

/// Comparison operator usable inside a translation predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

/// Builder for base-entity queries filtered by translated content.
///
/// Callers may omit the operator only when comparing for equality: the
/// `where_*` shorthands fix it to `=`, the `*_op` twins take it explicitly.
/// `or_where_*` methods compose with OR against the predicate chain built so
/// far; everything else composes with AND (left-associative).
#[derive(Debug, Clone)]
pub struct TranslationQuery {
    def: Arc<TranslatableDefinition>,
    locale: String,
    predicate: Option<SimpleExpr>,
}

impl TranslationQuery {
    /// Create a query builder scoped to one locale.
    pub fn new(def: Arc<TranslatableDefinition>, locale: impl Into<String>) -> Self {
        Self {
            def,
            locale: locale.into(),
            predicate: None,
        }
    }

    /// Create a query builder scoped to the provider's current locale.
    pub fn for_provider(def: Arc<TranslatableDefinition>, locales: &dyn LocaleProvider) -> Self {
        let locale = locales.current_locale();
        Self::new(def, locale)
    }

    /// Match entities with a translation equal to `value` in the builder
    /// locale.
    pub fn where_translation(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.where_translation_op(attribute, Comparison::Eq, value)
    }

    /// Match entities with a translation satisfying `op` in the builder
    /// locale.
    pub fn where_translation_op(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        let locale = self.locale.clone();
        let expr = self.exists_expr(attribute, op, &value.into(), Some(&locale));
        self.push(expr, false)
    }

    /// Match entities with a translation satisfying `op` in an explicit
    /// locale.
    pub fn where_translation_at(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
        locale: &str,
    ) -> Self {
        let expr = self.exists_expr(attribute, op, &value.into(), Some(locale));
        self.push(expr, false)
    }

    /// Match entities with a translation equal to `value` in any locale.
    pub fn where_any_translation(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.where_any_translation_op(attribute, Comparison::Eq, value)
    }

    /// Match entities with a translation satisfying `op` in any locale.
    pub fn where_any_translation_op(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        let expr = self.exists_expr(attribute, op, &value.into(), None);
        self.push(expr, false)
    }

    /// OR-composed twin of [`where_translation`](Self::where_translation).
    pub fn or_where_translation(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.or_where_translation_op(attribute, Comparison::Eq, value)
    }

    /// OR-composed twin of [`where_translation_op`](Self::where_translation_op).
    pub fn or_where_translation_op(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        let locale = self.locale.clone();
        let expr = self.exists_expr(attribute, op, &value.into(), Some(&locale));
        self.push(expr, true)
    }

    /// OR-composed twin of [`where_translation_at`](Self::where_translation_at).
    pub fn or_where_translation_at(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
        locale: &str,
    ) -> Self {
        let expr = self.exists_expr(attribute, op, &value.into(), Some(locale));
        self.push(expr, true)
    }

    /// OR-composed twin of [`where_any_translation`](Self::where_any_translation).
    pub fn or_where_any_translation(self, attribute: &str, value: impl Into<Value>) -> Self {
        self.or_where_any_translation_op(attribute, Comparison::Eq, value)
    }

    /// OR-composed twin of [`where_any_translation_op`](Self::where_any_translation_op).
    pub fn or_where_any_translation_op(
        self,
        attribute: &str,
        op: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        let expr = self.exists_expr(attribute, op, &value.into(), None);
        self.push(expr, true)
    }

    /// Build the main SELECT over the base table.
    pub fn build(&self) -> String {
        let table = Alias::new(&self.def.base_table);
        let mut query = Query::select();
        query.column((table.clone(), Asterisk)).from(table);
        if let Some(ref predicate) = self.predicate {
            query.and_where(predicate.clone());
        }
        query.to_string(PostgresQueryBuilder)
    }

    /// Build a COUNT query for total results.
    pub fn build_count(&self) -> String {
        let table = Alias::new(&self.def.base_table);
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count()).from(table);
        if let Some(ref predicate) = self.predicate {
            query.and_where(predicate.clone());
        }
        query.to_string(PostgresQueryBuilder)
    }

    /// Fetch matching entity IDs.
    pub async fn fetch_ids(&self, pool: &PgPool) -> TranslationResult<Vec<Uuid>> {
        let table = Alias::new(&self.def.base_table);
        let mut query = Query::select();
        query
            .column((table.clone(), Alias::new("id")))
            .from(table);
        if let Some(ref predicate) = self.predicate {
            query.and_where(predicate.clone());
        }
        let sql = query.to_string(PostgresQueryBuilder);

        let ids: Vec<Uuid> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
        Ok(ids)
    }

    /// Fetch matching entities. When the registry has the type enrolled for
    /// eager loading, each entity's translation association is loaded too.
    pub async fn fetch(
        &self,
        pool: &PgPool,
        registry: &TranslatableRegistry,
    ) -> TranslationResult<Vec<TranslatedEntity>> {
        let table = Alias::new(&self.def.base_table);
        let mut query = Query::select();
        query
            .expr_as(
                Expr::cust(format!("row_to_json(\"{}\")", self.def.base_table)),
                Alias::new("entity"),
            )
            .from(table);
        if let Some(ref predicate) = self.predicate {
            query.and_where(predicate.clone());
        }
        let sql = query.to_string(PostgresQueryBuilder);

        let rows: Vec<Value> = sqlx::query_scalar(&sql).fetch_all(pool).await?;
        let mut entities = Vec::with_capacity(rows.len());
        for row in rows {
            entities.push(TranslatedEntity::from_row(row)?);
        }

        if registry.auto_load_enabled(&self.def.type_name) {
            for entity in &mut entities {
                entity.load_translations(pool, &self.def).await?;
            }
        }
        Ok(entities)
    }

    fn push(mut self, expr: SimpleExpr, or: bool) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(prev) if or => prev.or(expr),
            Some(prev) => prev.and(expr),
            None => expr,
        });
        self
    }

    /// EXISTS sub-select correlated on the foreign key; `locale` of None
    /// matches across all locales.
    fn exists_expr(
        &self,
        attribute: &str,
        op: Comparison,
        value: &Value,
        locale: Option<&str>,
    ) -> SimpleExpr {
        let base = Alias::new(&self.def.base_table);
        let table = Alias::new(&self.def.translation_table);

        let mut sub = Query::select();
        sub.expr(Expr::val(1)).from(table.clone()).and_where(
            Expr::col((table.clone(), Alias::new(&self.def.foreign_key)))
                .equals((base, Alias::new("id"))),
        );
        if let Some(locale) = locale {
            sub.and_where(Expr::col((table.clone(), Alias::new("locale"))).eq(locale));
        }
        sub.and_where(comparison_expr(
            Expr::col((table, Alias::new(attribute))),
            op,
            value,
        ));

        Expr::exists(sub)
    }
}

fn comparison_expr(column: Expr, op: Comparison, value: &Value) -> SimpleExpr {
    match op {
        Comparison::Eq => column.eq(json_to_value(value)),
        Comparison::Ne => column.ne(json_to_value(value)),
        Comparison::Gt => column.gt(json_to_value(value)),
        Comparison::Gte => column.gte(json_to_value(value)),
        Comparison::Lt => column.lt(json_to_value(value)),
        Comparison::Lte => column.lte(json_to_value(value)),
        Comparison::Like => column.like(like_pattern(value)),
        Comparison::NotLike => column.not_like(like_pattern(value)),
    }
}

/// LIKE patterns are caller-supplied verbatim, wildcards included.
fn like_pattern(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
