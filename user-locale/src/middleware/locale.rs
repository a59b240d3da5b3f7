//! User locale middleware
//!
//! Resolves the locale from the locale cookie, the Accept-Language header
//! or the default, exposes it to the downstream handler and writes it back
//! as a cookie when the client does not already hold it.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method,
        header::{ACCEPT_LANGUAGE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::config::LocaleConfig;
use crate::locale::{AcceptList, Locale, ResolvedLocale, resolve_locale, should_set_cookie};
use crate::utils::{DefaultLocaleSource, LocaleError, LocaleResult, with_locale};

pub const DEFAULT_COOKIE_NAME: &str = "user-locale";

/// Locale resolution settings shared by every request.
#[derive(Clone)]
pub struct LocaleResolver {
    accepted: AcceptList,
    cookie_name: String,
    cookie_domain: Option<String>,
    cookie_methods: HashSet<Method>,
    default_locale: Arc<dyn DefaultLocaleSource>,
}

impl std::fmt::Debug for LocaleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleResolver")
            .field("accepted", &self.accepted)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_domain", &self.cookie_domain)
            .field("cookie_methods", &self.cookie_methods)
            .field("default_locale", &self.default_locale.default_locale())
            .finish()
    }
}

impl LocaleResolver {
    /// Resolver that accepts every locale and uses the `user-locale` cookie.
    pub fn new(default_locale: impl DefaultLocaleSource + 'static) -> Self {
        Self {
            accepted: AcceptList::default(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_domain: None,
            cookie_methods: HashSet::new(),
            default_locale: Arc::new(default_locale),
        }
    }

    /// Build a resolver from the `[locale]` config section.
    ///
    /// `default_locale` is the source the application keeps ownership of;
    /// `config.default_locale` only seeds it in the binary.
    pub fn from_config(
        config: &LocaleConfig,
        default_locale: impl DefaultLocaleSource + 'static,
    ) -> LocaleResult<Self> {
        let mut resolver = Self::new(default_locale)
            .with_cookie_name(&config.cookie_name)?
            .with_accepted_locales(&config.accepted_locales)?;

        if let Some(domain) = config.cookie_domain.as_deref().filter(|d| !d.is_empty()) {
            resolver = resolver.with_cookie_domain(domain);
        }

        let methods = config
            .cookie_methods
            .iter()
            .map(|m| parse_method(m))
            .collect::<LocaleResult<Vec<_>>>()?;

        Ok(resolver.with_cookie_methods(methods))
    }

    pub fn with_cookie_name(mut self, name: &str) -> LocaleResult<Self> {
        if !is_cookie_token(name) {
            return Err(LocaleError::invalid_cookie_name(name));
        }
        self.cookie_name = name.to_string();
        Ok(self)
    }

    pub fn with_accepted_locales<I, S>(mut self, locales: I) -> LocaleResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.accepted = AcceptList::parse(locales)?;
        Ok(self)
    }

    pub fn with_cookie_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_domain = Some(domain.into());
        self
    }

    /// Restrict cookie writes to these methods. An empty set allows all.
    pub fn with_cookie_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.cookie_methods = methods.into_iter().collect();
        self
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn accepted_locales(&self) -> &AcceptList {
        &self.accepted
    }

    pub fn default_locale(&self) -> Locale {
        self.default_locale.default_locale()
    }

    /// Resolve the locale from request headers (`Cookie` and `Accept-Language`).
    pub fn resolve(&self, headers: &HeaderMap) -> ResolvedLocale {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(&self.cookie_name).map(Cookie::value_trimmed);
        self.resolve_from(cookie, accept_language(headers))
    }

    /// Resolve from an already extracted cookie value and header.
    pub fn resolve_from(&self, cookie: Option<&str>, accept_language: Option<&str>) -> ResolvedLocale {
        resolve_locale(cookie, accept_language, &self.accepted, self.default_locale())
    }

    /// Whether a response to `method` may carry the locale cookie.
    pub fn writes_cookie_for(&self, method: &Method) -> bool {
        self.cookie_methods.is_empty() || self.cookie_methods.contains(method)
    }

    /// `Set-Cookie` value persisting `locale`: `<name>=<locale>; Path=/`.
    pub fn set_cookie_value(&self, locale: &Locale) -> LocaleResult<HeaderValue> {
        let mut cookie = Cookie::build((self.cookie_name.as_str(), locale.as_str())).path("/");
        if let Some(domain) = &self.cookie_domain {
            cookie = cookie.domain(domain.as_str());
        }

        Ok(HeaderValue::from_str(&cookie.build().to_string())?)
    }
}

/// Middleware resolving the user locale for every request.
///
/// The resolved locale is stored in the request extensions as
/// [`ResolvedLocale`] and is the current locale while the downstream
/// handler runs.
pub async fn user_locale_middleware(
    State(resolver): State<Arc<LocaleResolver>>,
    mut req: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let existing = jar.get(resolver.cookie_name()).map(|c| c.value_trimmed().to_string());

    let resolved = resolver.resolve_from(existing.as_deref(), accept_language(req.headers()));
    let locale = resolved.locale.clone();

    tracing::debug!(
        "Resolved locale {} from {:?} for {} {}",
        locale,
        resolved.source,
        req.method(),
        req.uri()
    );

    let write_cookie =
        resolver.writes_cookie_for(req.method()) && should_set_cookie(existing.as_deref(), &locale);

    req.extensions_mut().insert(resolved);

    let mut response = with_locale(locale.clone(), next.run(req)).await;

    if write_cookie {
        match resolver.set_cookie_value(&locale) {
            Ok(value) => {
                tracing::debug!("Setting {} cookie to {}", resolver.cookie_name(), locale);
                response.headers_mut().append(SET_COOKIE, value);
            },
            Err(err) => {
                tracing::warn!("Skipping {} cookie for {}: {}", resolver.cookie_name(), locale, err);
            },
        }
    }

    response
}

fn accept_language(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok())
}

fn parse_method(method: &str) -> LocaleResult<Method> {
    let method = method.trim().to_ascii_uppercase();
    match Method::from_bytes(method.as_bytes()) {
        Ok(parsed) if !method.is_empty() => Ok(parsed),
        _ => Err(LocaleError::invalid_method(method)),
    }
}

/// RFC 6265 cookie-name: an RFC 2616 token.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::LocaleSource;
    use axum::http::header::{COOKIE, HeaderName};

    fn resolver() -> LocaleResolver {
        LocaleResolver::new(Locale::parse("en").unwrap())
    }

    fn headers(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_cookie_token() {
        assert!(is_cookie_token("user-locale"));
        assert!(is_cookie_token("foo_locale"));
        assert!(!is_cookie_token(""));
        assert!(!is_cookie_token("user locale"));
        assert!(!is_cookie_token("a=b"));
        assert!(!is_cookie_token("a;b"));
    }

    #[test]
    fn test_invalid_cookie_name_rejected() {
        let err = resolver().with_cookie_name("bad name").unwrap_err();
        assert!(matches!(err, LocaleError::InvalidCookieName(_)));
    }

    #[test]
    fn test_invalid_accepted_locale_rejected() {
        let err = resolver().with_accepted_locales(["en", ""]).unwrap_err();
        assert!(matches!(err, LocaleError::InvalidLocale(_)));
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method(" POST ").unwrap(), Method::POST);
        assert!(parse_method("").is_err());
        assert!(parse_method("GE T").is_err());
    }

    #[test]
    fn test_resolve_reads_cookie_from_headers() {
        let resolver = resolver().with_cookie_name("foo-locale").unwrap();
        let map = headers(&[(COOKIE, "other=1; foo-locale=be"), (ACCEPT_LANGUAGE, "fr")]);
        assert_eq!(resolver.resolve(&map).locale, "be");
    }

    #[test]
    fn test_resolve_keeps_cookie_octet_values() {
        for value in ["sr@latin", "en.UTF-8"] {
            let cookie = format!("user-locale={}", value);
            let map = headers(&[(COOKIE, cookie.as_str()), (ACCEPT_LANGUAGE, "de")]);
            let resolved = resolver().resolve(&map);
            assert_eq!(resolved.locale, value);
            assert_eq!(resolved.source, LocaleSource::Cookie);
        }
    }

    #[test]
    fn test_resolve_unquotes_cookie() {
        let map = headers(&[(COOKIE, "user-locale=\"fr\""), (ACCEPT_LANGUAGE, "de")]);
        let resolved = resolver().resolve(&map);
        assert_eq!(resolved.locale, "fr");
        assert_eq!(resolved.source, LocaleSource::Cookie);
    }

    #[test]
    fn test_set_cookie_value_for_cookie_octet_locale() {
        let sr = Locale::parse("sr@latin").unwrap();
        let value = resolver().set_cookie_value(&sr).unwrap();
        assert_eq!(value.to_str().unwrap(), "user-locale=sr@latin; Path=/");
    }

    #[test]
    fn test_resolve_ignores_other_cookie_names() {
        let map = headers(&[(COOKIE, "foo-locale=be"), (ACCEPT_LANGUAGE, "fr-be")]);
        assert_eq!(resolver().resolve(&map).locale, "fr");
    }

    #[test]
    fn test_default_follows_source() {
        let localization = crate::utils::Localization::new(Locale::parse("en").unwrap());
        let resolver = LocaleResolver::new(localization.clone());
        localization.set_default_locale(Locale::parse("de").unwrap());
        assert_eq!(resolver.resolve(&HeaderMap::new()).locale, "de");
    }

    #[test]
    fn test_set_cookie_value() {
        let fr = Locale::parse("fr").unwrap();
        let value = resolver().set_cookie_value(&fr).unwrap();
        assert_eq!(value.to_str().unwrap(), "user-locale=fr; Path=/");

        let value = resolver().with_cookie_domain("example.com").set_cookie_value(&fr).unwrap();
        assert_eq!(value.to_str().unwrap(), "user-locale=fr; Path=/; Domain=example.com");
    }

    #[test]
    fn test_cookie_methods_policy() {
        assert!(resolver().writes_cookie_for(&Method::POST));

        let resolver = resolver().with_cookie_methods([Method::GET]);
        assert!(resolver.writes_cookie_for(&Method::GET));
        assert!(!resolver.writes_cookie_for(&Method::DELETE));
    }

    #[test]
    fn test_from_config() {
        let config = LocaleConfig {
            default_locale: "en".to_string(),
            accepted_locales: vec!["en".to_string(), "fr".to_string()],
            cookie_name: "lang".to_string(),
            cookie_domain: Some(String::new()),
            cookie_methods: vec!["get".to_string(), "head".to_string()],
        };
        let resolver = LocaleResolver::from_config(&config, Locale::parse("en").unwrap()).unwrap();
        assert_eq!(resolver.cookie_name(), "lang");
        assert_eq!(resolver.accepted_locales().len(), 2);
        assert!(resolver.writes_cookie_for(&Method::HEAD));
        assert!(!resolver.writes_cookie_for(&Method::PUT));

        let fr = Locale::parse("fr").unwrap();
        let value = resolver.set_cookie_value(&fr).unwrap();
        assert_eq!(value.to_str().unwrap(), "lang=fr; Path=/");
    }
}
