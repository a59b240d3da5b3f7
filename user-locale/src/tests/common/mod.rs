// Common test utilities and helpers

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header::SET_COOKIE},
};
use tower::ServiceExt;

use crate::app::build_router;
use crate::locale::Locale;
use crate::middleware::LocaleResolver;

pub const ACCEPTED: &[&str] = &["en", "es", "fr", "de", "ja", "nl"];

/// Resolver with default locale `en` and no accept-list
pub fn open_resolver() -> LocaleResolver {
    LocaleResolver::new(Locale::parse("en").expect("valid locale"))
}

/// Resolver with default locale `en` accepting [`ACCEPTED`]
pub fn accepting_resolver() -> LocaleResolver {
    open_resolver().with_accepted_locales(ACCEPTED).expect("valid accept-list")
}

pub fn router(resolver: LocaleResolver) -> Router {
    build_router(Arc::new(resolver))
}

/// Captured response of a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<String>,
    pub body: String,
}

impl TestResponse {
    pub fn set_cookie(&self) -> Option<&str> {
        assert!(self.set_cookies.len() <= 1, "more than one Set-Cookie: {:?}", self.set_cookies);
        self.set_cookies.first().map(String::as_str)
    }
}

/// Build a request with optional Cookie and Accept-Language headers
pub fn request(method: Method, uri: &str, cookie: Option<&str>, accept_language: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    if let Some(langs) = accept_language {
        builder = builder.header("accept-language", langs);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.expect("infallible router");
    let status = response.status();
    let set_cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().expect("ascii Set-Cookie").to_string())
        .collect();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("readable body");

    TestResponse { status, set_cookies, body: String::from_utf8_lossy(&body).into_owned() }
}

/// GET / and return the response
pub async fn get_root(resolver: LocaleResolver, cookie: Option<&str>, accept_language: Option<&str>) -> TestResponse {
    send(router(resolver), request(Method::GET, "/", cookie, accept_language)).await
}
