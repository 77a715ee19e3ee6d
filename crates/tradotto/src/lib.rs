//! Tradotto — locale-aware entity translation engine for PostgreSQL.
//!
//! Base entities keep their locale-varying attributes in a separate
//! translation table, one row per (entity, locale). Tradotto manages that
//! relationship: transactional synchronization of base and translation rows
//! on the write path, locale resolution with fallback on the read path, and
//! query predicates filtering base entities by translated content.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod locale;
pub mod models;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod sync;

pub use config::Config;
pub use error::{TranslationError, TranslationResult};
pub use extract::{AttributeMap, TranslationSet, extract};
pub use locale::{FixedLocale, LocaleProvider, validate_locale};
pub use models::{TranslatedEntity, TranslationRecord};
pub use query::{Comparison, TranslationQuery};
pub use registry::{TranslatableDefinition, TranslatableRegistry};
pub use resolve::{FallbackPolicy, all_translations, resolve};
pub use sync::TranslationSynchronizer;
