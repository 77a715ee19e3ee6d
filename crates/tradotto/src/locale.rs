//! Ambient locale access and locale code validation.
//!
//! The host application owns locale detection; the engine only consumes the
//! current locale through [`LocaleProvider`], read at the moment of each
//! translatable-attribute access.

use crate::error::{TranslationError, TranslationResult};

/// Narrow interface to the host's locale state.
///
/// Implementations must return the locale in effect at call time; the engine
/// never caches the result across accesses.
pub trait LocaleProvider: Send + Sync {
    /// The locale the caller is currently operating in.
    fn current_locale(&self) -> String;

    /// The application-configured fallback locale, consumed only when the
    /// fallback policy is [`FallbackPolicy::App`](crate::resolve::FallbackPolicy).
    fn fallback_locale(&self) -> Option<String> {
        None
    }
}

/// Plain [`LocaleProvider`] holding fixed locale values.
#[derive(Debug, Clone)]
pub struct FixedLocale {
    current: String,
    fallback: Option<String>,
}

impl FixedLocale {
    /// Create a provider with only a current locale.
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            fallback: None,
        }
    }

    /// Create a provider with a current and a fallback locale.
    pub fn with_fallback(current: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            fallback: Some(fallback.into()),
        }
    }
}

impl LocaleProvider for FixedLocale {
    fn current_locale(&self) -> String {
        self.current.clone()
    }

    fn fallback_locale(&self) -> Option<String> {
        self.fallback.clone()
    }
}

/// Validate that a locale code follows BCP 47 primary subtag format.
///
/// Accepts: lowercase alpha 2-3 chars, optionally followed by hyphen-separated
/// alphanumeric subtags (e.g., "en", "fr", "pt-br", "zh-hans").
pub fn validate_locale(code: &str) -> TranslationResult<()> {
    let invalid = || TranslationError::InvalidLocale {
        locale: code.to_string(),
    };

    if code.is_empty() || code.len() > 12 {
        return Err(invalid());
    }

    let mut parts = code.split('-');

    // Primary subtag: 2-3 lowercase letters
    match parts.next() {
        Some(primary) if (2..=3).contains(&primary.len()) => {
            if !primary.bytes().all(|b| b.is_ascii_lowercase()) {
                return Err(invalid());
            }
        }
        _ => return Err(invalid()),
    }

    // Optional subtags: alphanumeric, 1-8 chars each
    for subtag in parts {
        if subtag.is_empty()
            || subtag.len() > 8
            || !subtag.bytes().all(|b| b.is_ascii_alphanumeric())
        {
            return Err(invalid());
        }
    }

    Ok(())
}
