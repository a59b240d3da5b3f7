//! User locale resolution for axum.
//!
//! [`user_locale_middleware`] picks a locale for every request from the
//! locale cookie, the `Accept-Language` header or a default, makes it
//! available to handlers and persists it in a cookie.

pub mod app;
pub mod config;
pub mod locale;
pub mod middleware;
pub mod utils;

#[cfg(test)]
mod tests;

pub use config::{Config, LocaleConfig};
pub use locale::{
    AcceptList, Locale, LocaleSource, ResolvedLocale, WeightedLanguage, browser_locale,
    parse_accept_language, resolve_locale, should_set_cookie, trim_cookie_quotes,
};
pub use middleware::{DEFAULT_COOKIE_NAME, LocaleResolver, user_locale_middleware};
pub use utils::{
    DefaultLocaleSource, LocaleError, LocaleResult, Localization, current_locale, with_locale,
    with_locale_blocking,
};
