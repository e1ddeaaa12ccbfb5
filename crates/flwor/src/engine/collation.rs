use crate::engine::runtime::{Error, ErrorCode};
use core::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

pub use crate::consts::{CODEPOINT_URI, SIMPLE_ACCENT_URI, SIMPLE_CASE_ACCENT_URI, SIMPLE_CASE_URI};

/// Named string comparison used by ordering, grouping and value comparisons.
///
/// `key` must be consistent with `compare`: two strings compare `Equal`
/// exactly when their keys are equal. Grouping hashes on the key.
pub trait Collation: Send + Sync {
    fn uri(&self) -> &str;
    fn compare(&self, a: &str, b: &str) -> Ordering;
    fn key(&self, s: &str) -> String {
        s.to_string()
    }
}

pub struct CodepointCollation;

impl Collation for CodepointCollation {
    fn uri(&self) -> &str {
        CODEPOINT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}

/// Case-insensitive collation
pub struct SimpleCaseCollation;

impl Collation for SimpleCaseCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        s.to_lowercase()
    }
}

fn strip_marks(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    use unicode_normalization::char::canonical_combining_class as ccc;
    s.nfd().filter(|&ch| ccc(ch) == 0).collect()
}

/// Accent-insensitive collation (NFD, combining marks removed)
pub struct SimpleAccentCollation;

impl Collation for SimpleAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s)
    }
}

pub struct SimpleCaseAccentCollation;

impl Collation for SimpleCaseAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s).to_lowercase()
    }
}

/// Registry of available collations, keyed by URI.
pub struct CollationRegistry {
    by_uri: HashMap<String, Arc<dyn Collation>>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        let mut reg = Self {
            by_uri: HashMap::new(),
        };
        reg.insert(Arc::new(CodepointCollation));
        reg.insert(Arc::new(SimpleCaseCollation));
        reg.insert(Arc::new(SimpleAccentCollation));
        reg.insert(Arc::new(SimpleCaseAccentCollation));
        reg
    }
}

impl CollationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &str) -> Option<Arc<dyn Collation>> {
        self.by_uri.get(uri).cloned()
    }

    pub fn insert(&mut self, collation: Arc<dyn Collation>) {
        self.by_uri.insert(collation.uri().to_string(), collation);
    }

    /// Resolves `uri`, or `fallback` when no URI is given. Unknown URIs raise `FOCH0002`.
    pub fn resolve(
        &self,
        uri: Option<&str>,
        fallback: &Arc<dyn Collation>,
    ) -> Result<Arc<dyn Collation>, Error> {
        match uri {
            None => Ok(fallback.clone()),
            Some(u) => self.get(u).ok_or_else(|| {
                Error::from_code(ErrorCode::FOCH0002, format!("unknown collation URI: {u}"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SIMPLE_CASE_URI, "Straße", "STRASSE", false)]
    #[case(SIMPLE_CASE_URI, "Apple", "aPPLE", true)]
    #[case(SIMPLE_ACCENT_URI, "café", "cafe", true)]
    #[case(SIMPLE_ACCENT_URI, "Café", "cafe", false)]
    #[case(SIMPLE_CASE_ACCENT_URI, "Café", "CAFE", true)]
    #[case(CODEPOINT_URI, "a", "A", false)]
    fn keys_agree_with_compare(
        #[case] uri: &str,
        #[case] a: &str,
        #[case] b: &str,
        #[case] equal: bool,
    ) {
        let reg = CollationRegistry::default();
        let c = reg.get(uri).unwrap();
        assert_eq!(c.compare(a, b) == Ordering::Equal, equal);
        assert_eq!(c.key(a) == c.key(b), equal);
    }

    #[rstest]
    fn unknown_uri_is_foch0002() {
        let reg = CollationRegistry::default();
        let fallback: Arc<dyn Collation> = Arc::new(CodepointCollation);
        let err = reg.resolve(Some("urn:nope"), &fallback).err().unwrap();
        assert_eq!(err.code_enum(), ErrorCode::FOCH0002);
        assert_eq!(reg.resolve(None, &fallback).unwrap().uri(), CODEPOINT_URI);
    }
}
