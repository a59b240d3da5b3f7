//! Locale resolution
//!
//! Parses and weight-sorts the `Accept-Language` header, reconciles the
//! candidates against an optional accept-list and decides whether the
//! resolved locale has to be written back to the client.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::utils::{LocaleError, LocaleResult};

/// A bare locale token such as `en` or `fr`.
///
/// Never empty. Any RFC 6265 `cookie-octet` is allowed (printable ASCII
/// except space, `"`, `,`, `;` and `\`), so values such as `sr@latin` or
/// `en.UTF-8` survive and every token can be written back as a cookie value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    /// Validate and wrap a locale token. Surrounding whitespace is ignored.
    pub fn parse(token: &str) -> LocaleResult<Self> {
        let token = token.trim();
        let valid = !token.is_empty() && token.bytes().all(is_cookie_octet);

        if valid {
            Ok(Self(token.to_string()))
        } else {
            Err(LocaleError::invalid_locale(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn into_ascii_lowercase(mut self) -> Self {
        self.0.make_ascii_lowercase();
        self
    }
}

fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Strip one pair of surrounding DQUOTEs, as allowed by the cookie grammar.
pub fn trim_cookie_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Locale {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Locale {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Locale {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The set of locales an application is willing to serve.
///
/// An empty list accepts every locale. Entries are stored ASCII-lowercased
/// and lookups ignore ASCII case, so `EN` in the list matches an `en-US`
/// header entry and an `En` cookie alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptList {
    locales: HashSet<Locale>,
}

impl AcceptList {
    pub fn new<I>(locales: I) -> Self
    where
        I: IntoIterator<Item = Locale>,
    {
        Self { locales: locales.into_iter().map(Locale::into_ascii_lowercase).collect() }
    }

    /// Build an accept-list from raw tokens, rejecting the first invalid one.
    pub fn parse<I, S>(tokens: I) -> LocaleResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let locales = tokens
            .into_iter()
            .map(|token| Locale::parse(token.as_ref()).map(Locale::into_ascii_lowercase))
            .collect::<LocaleResult<HashSet<_>>>()?;
        Ok(Self { locales })
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    /// Membership test. Does not treat an empty list as "accept all".
    pub fn contains(&self, locale: &str) -> bool {
        self.locales.contains(locale.to_ascii_lowercase().as_str())
    }

    /// Whether `locale` may be served: always true for an empty list.
    pub fn permits(&self, locale: &str) -> bool {
        self.is_empty() || self.contains(locale)
    }
}

/// One comma-separated segment of `Accept-Language`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedLanguage {
    pub tag: String,
    pub quality: f32,
}

impl WeightedLanguage {
    /// Parse `tag[;q=weight]`.
    ///
    /// Returns `None` for empty segments, the `*` wildcard and segments whose
    /// weight is not a finite number. A missing weight means `1.0`; weights
    /// outside `[0, 1]` are clamped.
    pub fn parse(segment: &str) -> Option<Self> {
        let mut params = segment.split(';');
        let tag = params.next()?.trim();
        if tag.is_empty() || tag == "*" {
            return None;
        }

        let mut quality = 1.0;
        for param in params {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("q") {
                continue;
            }
            match value.trim().parse::<f32>() {
                Ok(q) if q.is_finite() => quality = q.clamp(0.0, 1.0),
                _ => {
                    tracing::debug!("Skipping Accept-Language segment with bad weight: {}", segment);
                    return None;
                },
            }
        }

        Some(Self { tag: tag.to_string(), quality })
    }

    /// Primary subtag of the language tag, lowercased (`fr-BE` -> `fr`).
    pub fn primary_subtag(&self) -> String {
        primary_subtag(&self.tag).to_ascii_lowercase()
    }
}

/// Parse an `Accept-Language` value into entries sorted by descending weight.
///
/// The sort is stable, so among equal weights the first listed tag stays first.
pub fn parse_accept_language(header: &str) -> Vec<WeightedLanguage> {
    let mut languages: Vec<WeightedLanguage> =
        header.split(',').filter_map(WeightedLanguage::parse).collect();

    languages.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
    languages
}

/// First `-`-separated component of a language tag.
pub fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag).trim()
}

/// Pick a locale from the browser's `Accept-Language` header.
///
/// Without an accept-list the primary subtag of the highest weighted entry
/// wins; an entry whose subtag is not a usable token is passed over. With one, the first weight-sorted entry whose primary subtag is
/// accepted wins, or nothing if none is.
pub fn browser_locale(header: &str, accepted: &AcceptList) -> Option<Locale> {
    let languages = parse_accept_language(header);

    if accepted.is_empty() {
        return languages
            .iter()
            .find_map(|language| Locale::parse(&language.primary_subtag()).ok());
    }

    languages
        .iter()
        .map(WeightedLanguage::primary_subtag)
        .find(|primary| accepted.contains(primary))
        .and_then(|primary| Locale::parse(&primary).ok())
}

/// Where the resolved locale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSource {
    Cookie,
    Header,
    Default,
}

/// The locale chosen for one request.
///
/// Inserted into the request extensions by the middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocale {
    pub locale: Locale,
    pub source: LocaleSource,
}

impl ResolvedLocale {
    fn fallback(default_locale: Locale) -> Self {
        Self { locale: default_locale, source: LocaleSource::Default }
    }
}

/// Resolve the locale for a request.
///
/// Priority: cookie, then `Accept-Language`, then the default. With a
/// non-empty accept-list, a cookie value outside the list is replaced by
/// the default as well. A quoted cookie value is unquoted first; empty values
/// and values that are not cookie-octets count as absent.
pub fn resolve_locale(
    cookie: Option<&str>,
    accept_language: Option<&str>,
    accepted: &AcceptList,
    default_locale: Locale,
) -> ResolvedLocale {
    let cookie_locale = cookie
        .map(trim_cookie_quotes)
        .filter(|value| !value.is_empty())
        .and_then(|value| {
            Locale::parse(value)
                .map_err(|err| tracing::warn!("Ignoring locale cookie: {}", err))
                .ok()
        });

    if let Some(locale) = cookie_locale {
        if accepted.permits(locale.as_str()) {
            return ResolvedLocale { locale, source: LocaleSource::Cookie };
        }
        tracing::debug!("Cookie locale {} is not accepted, using default {}", locale, default_locale);
        return ResolvedLocale::fallback(default_locale);
    }

    match accept_language.and_then(|header| browser_locale(header, accepted)) {
        Some(locale) => ResolvedLocale { locale, source: LocaleSource::Header },
        None => ResolvedLocale::fallback(default_locale),
    }
}

/// A `Set-Cookie` is needed unless the client's cookie already holds `resolved`.
pub fn should_set_cookie(existing: Option<&str>, resolved: &Locale) -> bool {
    existing.map(trim_cookie_quotes) != Some(resolved.as_str())
}
