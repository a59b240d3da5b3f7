//! Demo application wired with the user locale middleware.

use std::sync::Arc;

use axum::{Extension, Json, Router, middleware, routing::get};

use crate::locale::ResolvedLocale;
use crate::middleware::{LocaleResolver, user_locale_middleware};
use crate::utils::current_locale;

/// Router with the demo routes behind [`user_locale_middleware`].
pub fn build_router(resolver: Arc<LocaleResolver>) -> Router {
    Router::new()
        .route("/", get(echo_locale).post(echo_locale).put(echo_locale).delete(echo_locale))
        .route("/locale", get(show_locale))
        .layer(middleware::from_fn_with_state(resolver, user_locale_middleware))
}

// Reads the ambient locale, not the request extension
async fn echo_locale() -> String {
    let locale = current_locale().map(|l| l.to_string()).unwrap_or_default();
    format!("Locale: {}", locale)
}

async fn show_locale(Extension(resolved): Extension<ResolvedLocale>) -> Json<ResolvedLocale> {
    Json(resolved)
}
