//! Translatable type registry.
//!
//! Each type using the engine registers a [`TranslatableDefinition`] once at
//! startup: table names, the foreign-key column, and the ordered list of
//! translatable attributes. The registry also carries the per-type eager-load
//! flag consulted by the read and query paths.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Namespace segment inserted by the translation-type naming convention.
const TRANSLATION_NAMESPACE: &str = "Translations";

/// Suffix appended by the translation-type naming convention.
const TRANSLATION_SUFFIX: &str = "Translation";

/// Per-type descriptor for a translatable entity.
///
/// The base table is expected to carry a UUID `id` primary key; the
/// translation table carries `id`, the foreign-key column, `locale`, one
/// nullable column per translatable attribute, and (when `timestamps` is set)
/// `created`/`changed` Unix timestamps. A uniqueness constraint on
/// (foreign key, locale) is recommended at the storage layer; the engine
/// upserts by explicit match rather than relying on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableDefinition {
    /// Fully-qualified type name (e.g. "app.catalog.Product").
    pub type_name: String,

    /// Explicit translation-type identifier, overriding the naming convention.
    pub translation_type: Option<String>,

    /// Base entity table.
    pub base_table: String,

    /// Translation table (default: `{base_table}_translation`).
    pub translation_table: String,

    /// Foreign-key column on the translation table (default: `{base_table}_id`).
    pub foreign_key: String,

    /// Ordered translatable attribute names. Empty means the type never
    /// declared any; every write-path call then fails with
    /// [`MissingTranslatables`](crate::error::TranslationError::MissingTranslatables).
    pub translatable: Vec<String>,

    /// Whether the translation table carries `created`/`changed` columns.
    pub timestamps: bool,
}

impl TranslatableDefinition {
    /// Create a definition with convention-derived table names.
    pub fn new(
        type_name: impl Into<String>,
        base_table: impl Into<String>,
        translatable: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let base_table = base_table.into();
        Self {
            type_name: type_name.into(),
            translation_type: None,
            translation_table: format!("{base_table}_translation"),
            foreign_key: format!("{base_table}_id"),
            base_table,
            translatable: translatable.into_iter().map(Into::into).collect(),
            timestamps: false,
        }
    }

    /// Override the translation-type identifier.
    pub fn with_translation_type(mut self, translation_type: impl Into<String>) -> Self {
        self.translation_type = Some(translation_type.into());
        self
    }

    /// Override the translation table name.
    pub fn with_translation_table(mut self, table: impl Into<String>) -> Self {
        self.translation_table = table.into();
        self
    }

    /// Override the foreign-key column name.
    pub fn with_foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = column.into();
        self
    }

    /// Enable `created`/`changed` timestamp columns on the translation table.
    pub fn with_timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    /// Identifier of the associated translation type.
    ///
    /// Returns the explicit override verbatim when set; otherwise applies the
    /// convention: insert a `Translations` segment before the final name
    /// segment and append the `Translation` suffix. There is no error path;
    /// a wrong convention surfaces later as an unknown relation at the
    /// persistence layer.
    pub fn translation_type(&self) -> String {
        if let Some(ref explicit) = self.translation_type {
            return explicit.clone();
        }
        match self.type_name.rsplit_once('.') {
            Some((namespace, name)) => {
                format!("{namespace}.{TRANSLATION_NAMESPACE}.{name}{TRANSLATION_SUFFIX}")
            }
            None => format!(
                "{TRANSLATION_NAMESPACE}.{}{TRANSLATION_SUFFIX}",
                self.type_name
            ),
        }
    }
}

/// Registry of translatable types.
///
/// Definitions are registered at startup and cached in memory for fast
/// access; the registry is cheap to clone and share.
#[derive(Clone)]
pub struct TranslatableRegistry {
    inner: Arc<TranslatableRegistryInner>,
}

struct TranslatableRegistryInner {
    types: DashMap<String, Arc<TranslatableDefinition>>,
    eager: DashSet<String>,
    auto_load: bool,
}

impl TranslatableRegistry {
    /// Create a registry. When `auto_load` is true, every registered type is
    /// enrolled in eager association loading.
    pub fn new(auto_load: bool) -> Self {
        Self {
            inner: Arc::new(TranslatableRegistryInner {
                types: DashMap::new(),
                eager: DashSet::new(),
                auto_load,
            }),
        }
    }

    /// Register a translatable type definition.
    pub fn register(&self, definition: TranslatableDefinition) -> Arc<TranslatableDefinition> {
        if definition.translatable.is_empty() {
            warn!(
                type_name = %definition.type_name,
                "registered translatable type declares no translatable attributes"
            );
        }

        let definition = Arc::new(definition);
        if self.inner.auto_load {
            self.enable_auto_load(&definition.type_name);
        }
        self.inner
            .types
            .insert(definition.type_name.clone(), Arc::clone(&definition));

        info!(type_name = %definition.type_name, "registered translatable type");
        definition
    }

    /// Get a definition by type name.
    pub fn get(&self, type_name: &str) -> Option<Arc<TranslatableDefinition>> {
        self.inner.types.get(type_name).map(|r| Arc::clone(r.value()))
    }

    /// Enroll a type in eager association loading. Idempotent: registering
    /// the same type twice must not double-load.
    pub fn enable_auto_load(&self, type_name: &str) {
        self.inner.eager.insert(type_name.to_string());
    }

    /// Whether loads of this type should include the translation association.
    pub fn auto_load_enabled(&self, type_name: &str) -> bool {
        self.inner.eager.contains(type_name)
    }

    /// Resolve the translation-type identifier for a registered type.
    pub fn translation_type_of(&self, type_name: &str) -> Option<String> {
        self.get(type_name).map(|def| def.translation_type())
    }

    /// List registered type names.
    pub fn type_names(&self) -> Vec<String> {
        self.inner.types.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.inner.types.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.types.is_empty()
    }
}
