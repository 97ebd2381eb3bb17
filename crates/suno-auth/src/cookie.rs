//! Cookie jar for Suno session state
//!
//! Clerk rotates the `__client` cookie on every token refresh and returns
//! the replacement via `Set-Cookie`. The jar keeps name/value pairs in
//! first-seen order so the serialized header stays stable across merges,
//! and strips cookie attributes (`Path`, `Expires`, ...) that must not be
//! echoed back in a `Cookie` header.

/// Attribute names that appear in `Set-Cookie` lines but are not cookies.
const COOKIE_ATTRIBUTES: &[&str] = &[
    "path",
    "domain",
    "expires",
    "max-age",
    "samesite",
    "secure",
    "httponly",
    "partitioned",
    "priority",
];

/// An ordered collection of cookie name/value pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    entries: Vec<(String, String)>,
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw cookie string (`k1=v1; k2=v2`) into a fresh jar.
    pub fn parse(raw: &str) -> Self {
        let mut jar = Self::new();
        jar.load(raw);
        jar
    }

    /// Merges a raw cookie string into the jar. Existing names are updated
    /// in place (keeping their position), new names append at the end.
    /// Accepts both `Cookie` header syntax and `Set-Cookie` lines; cookie
    /// attributes and valueless flags (`Secure`, `HttpOnly`) are dropped.
    pub fn load(&mut self, raw: &str) {
        for part in raw.split(';') {
            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                continue;
            }
            if COOKIE_ATTRIBUTES.iter().any(|a| name.eq_ignore_ascii_case(a)) {
                continue;
            }
            match self.entries.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => self.entries.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Returns the value of a cookie by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serializes the jar as a `Cookie` header value (`k1=v1;k2=v2`).
    pub fn header_value(&self) -> String {
        self.entries
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Number of cookies in the jar.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the jar holds no cookies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
