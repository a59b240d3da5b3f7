//! Ambient locale for the current request
//!
//! The locale chosen by the middleware lives in task-local storage for as
//! long as the downstream handler runs. Leaving the scope, whether by
//! returning, panicking or being dropped, restores whatever was visible
//! before, so concurrent requests never see each other's locale.

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use crate::locale::Locale;

tokio::task_local! {
    static CURRENT_LOCALE: Locale;
}

/// Get the locale of the request being handled by the current task.
///
/// Returns `None` outside a request scope.
pub fn current_locale() -> Option<Locale> {
    CURRENT_LOCALE.try_with(Clone::clone).ok()
}

/// Run `fut` with `locale` as the current locale.
pub async fn with_locale<F>(locale: Locale, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_LOCALE.scope(locale, fut).await
}

/// Run `f` with `locale` as the current locale, for blocking code.
pub fn with_locale_blocking<F, R>(locale: Locale, f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_LOCALE.sync_scope(locale, f)
}

/// Supplies the fallback locale. Read on every request, never written by
/// the middleware.
pub trait DefaultLocaleSource: Send + Sync {
    fn default_locale(&self) -> Locale;
}

impl DefaultLocaleSource for Locale {
    fn default_locale(&self) -> Locale {
        self.clone()
    }
}

impl<F> DefaultLocaleSource for F
where
    F: Fn() -> Locale + Send + Sync,
{
    fn default_locale(&self) -> Locale {
        self()
    }
}

/// Shared, runtime-adjustable default locale.
///
/// Clones share the same value, so the application can change the default
/// while the middleware keeps reading it.
#[derive(Debug, Clone)]
pub struct Localization {
    default_locale: Arc<RwLock<Locale>>,
}

impl Localization {
    pub fn new(default_locale: Locale) -> Self {
        Self { default_locale: Arc::new(RwLock::new(default_locale)) }
    }

    pub fn set_default_locale(&self, locale: Locale) {
        let mut guard = self.default_locale.write().unwrap_or_else(PoisonError::into_inner);
        *guard = locale;
    }
}

impl DefaultLocaleSource for Localization {
    fn default_locale(&self) -> Locale {
        self.default_locale.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
