pub mod locale;

pub use locale::{DEFAULT_COOKIE_NAME, LocaleResolver, user_locale_middleware};
