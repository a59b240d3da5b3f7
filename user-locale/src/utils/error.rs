use axum::http::header::InvalidHeaderValue;
use thiserror::Error;

/// Errors raised while configuring the locale middleware or encoding its cookie.
///
/// Resolving a locale never fails; these only surface from construction
/// and from writing the `Set-Cookie` header.
#[derive(Error, Debug)]
pub enum LocaleError {
    #[error("Invalid locale: {0:?}")]
    InvalidLocale(String),

    #[error("Invalid cookie name: {0:?}")]
    InvalidCookieName(String),

    #[error("Invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] InvalidHeaderValue),
}

impl LocaleError {
    /// Helper to create invalid locale error
    pub fn invalid_locale(value: impl Into<String>) -> Self {
        Self::InvalidLocale(value.into())
    }

    /// Helper to create invalid cookie name error
    pub fn invalid_cookie_name(value: impl Into<String>) -> Self {
        Self::InvalidCookieName(value.into())
    }

    /// Helper to create invalid method error
    pub fn invalid_method(value: impl Into<String>) -> Self {
        Self::InvalidMethod(value.into())
    }
}

pub type LocaleResult<T> = Result<T, LocaleError>;
