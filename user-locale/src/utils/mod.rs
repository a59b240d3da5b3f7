pub mod error;
pub mod i18n;

pub use error::{LocaleError, LocaleResult};
pub use i18n::{
    DefaultLocaleSource, Localization, current_locale, with_locale, with_locale_blocking,
};
