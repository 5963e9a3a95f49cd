//! Locale handling: URL path-segment rewriting and key→string catalogs.
//!
//! The path rewrite is a pure function: find the first two-letter path
//! segment (a prefix wins over an embedded one), replace it with the target
//! locale code, or prepend the code when no segment exists. Catalogs are
//! nested JSON documents looked up by dotted key; a missing key falls back
//! to returning the key itself so untranslated UI stays debuggable instead
//! of blank.

use crate::error::PagebindError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Supported interface locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    En,
    Zh,
    Ja,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::En, Locale::Zh, Locale::Ja];

    /// Two-letter locale code used in URL paths and file names.
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
            Locale::Ja => "ja",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Locale::En),
            "zh" => Some(Locale::Zh),
            "ja" => Some(Locale::Ja),
            _ => None,
        }
    }
}

static PREFIX_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/([a-z]{2})(/|$)").unwrap());
static EMBEDDED_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/([a-z]{2})(/|$)").unwrap());

/// Rewrite `path` so its locale segment becomes `target`.
///
/// A two-letter segment at the start of the path is replaced in place; an
/// embedded one is replaced at its first occurrence; a path with no such
/// segment gets the locale prepended.
pub fn swap_locale_segment(path: &str, target: Locale) -> String {
    let code = target.code();
    if PREFIX_SEGMENT.is_match(path) {
        return PREFIX_SEGMENT
            .replace(path, format!("/{code}$2"))
            .into_owned();
    }
    if EMBEDDED_SEGMENT.is_match(path) {
        return EMBEDDED_SEGMENT
            .replace(path, format!("/{code}$2"))
            .into_owned();
    }
    if path == "/" || path.is_empty() {
        format!("/{code}/")
    } else if path.starts_with('/') {
        format!("/{code}{path}")
    } else {
        format!("/{code}/{path}")
    }
}

/// A per-locale key→string catalog backed by a nested JSON document.
pub struct Catalog {
    root: Value,
}

static EN_CATALOG: Lazy<Catalog> =
    Lazy::new(|| Catalog::parse(include_str!("../locales/en.json")).unwrap());
static ZH_CATALOG: Lazy<Catalog> =
    Lazy::new(|| Catalog::parse(include_str!("../locales/zh.json")).unwrap());
static JA_CATALOG: Lazy<Catalog> =
    Lazy::new(|| Catalog::parse(include_str!("../locales/ja.json")).unwrap());

impl Catalog {
    /// Parse a catalog from its JSON text.
    pub fn parse(text: &str) -> Result<Self, PagebindError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| PagebindError::LocaleCatalog {
                detail: e.to_string(),
            })?;
        if !root.is_object() {
            return Err(PagebindError::LocaleCatalog {
                detail: "top level must be an object".to_string(),
            });
        }
        Ok(Self { root })
    }

    /// Load a catalog from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PagebindError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PagebindError::LocaleCatalog {
            detail: format!("'{}': {e}", path.display()),
        })?;
        Self::parse(&text)
    }

    /// The embedded catalog for a built-in locale.
    pub fn builtin(locale: Locale) -> &'static Catalog {
        match locale {
            Locale::En => &EN_CATALOG,
            Locale::Zh => &ZH_CATALOG,
            Locale::Ja => &JA_CATALOG,
        }
    }

    /// Look up a dotted key ("merge.done"), returning the key itself when no
    /// translation exists.
    pub fn get(&self, key: &str) -> String {
        let mut value = &self.root;
        for part in key.split('.') {
            match value.get(part) {
                Some(v) => value = v,
                None => return key.to_string(),
            }
        }
        value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_segment_is_replaced() {
        assert_eq!(swap_locale_segment("/zh/", Locale::En), "/en/");
        assert_eq!(
            swap_locale_segment("/zh/pic2pdf/", Locale::Ja),
            "/ja/pic2pdf/"
        );
        assert_eq!(swap_locale_segment("/en", Locale::Zh), "/zh");
    }

    #[test]
    fn embedded_segment_is_replaced() {
        assert_eq!(
            swap_locale_segment("/tools/en/pdf2pic/", Locale::Zh),
            "/tools/zh/pdf2pic/"
        );
    }

    #[test]
    fn missing_segment_is_prepended() {
        assert_eq!(swap_locale_segment("/", Locale::En), "/en/");
        assert_eq!(
            swap_locale_segment("/pic2pdf/index.html", Locale::Zh),
            "/zh/pic2pdf/index.html"
        );
        assert_eq!(swap_locale_segment("pic2pdf", Locale::En), "/en/pic2pdf");
    }

    #[test]
    fn long_segments_are_not_mistaken_for_locales() {
        assert_eq!(
            swap_locale_segment("/pictures/index.html", Locale::Ja),
            "/ja/pictures/index.html"
        );
    }

    #[test]
    fn locale_codes_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(Locale::from_code(locale.code()), Some(locale));
        }
        assert_eq!(Locale::from_code("xx"), None);
    }

    #[test]
    fn dotted_lookup_hits_nested_keys() {
        let catalog = Catalog::parse(r#"{"merge": {"done": "Merged!"}}"#).unwrap();
        assert_eq!(catalog.get("merge.done"), "Merged!");
    }

    #[test]
    fn missing_key_falls_back_to_key() {
        let catalog = Catalog::parse(r#"{"merge": {"done": "Merged!"}}"#).unwrap();
        assert_eq!(catalog.get("merge.missing"), "merge.missing");
        assert_eq!(catalog.get("nope.deep.key"), "nope.deep.key");
    }

    #[test]
    fn non_string_leaf_falls_back_to_key() {
        let catalog = Catalog::parse(r#"{"merge": {"count": 3}}"#).unwrap();
        assert_eq!(catalog.get("merge.count"), "merge.count");
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(Catalog::parse("[1, 2, 3]").is_err());
        assert!(Catalog::parse("not json").is_err());
    }

    #[test]
    fn builtin_catalogs_share_keys() {
        // Every key present in the English catalog must resolve in the other
        // locales too — a missing translation would leak the raw key.
        fn keys(prefix: &str, value: &Value, out: &mut Vec<String>) {
            if let Value::Object(map) = value {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    if v.is_object() {
                        keys(&key, v, out);
                    } else {
                        out.push(key);
                    }
                }
            }
        }

        let en = Catalog::builtin(Locale::En);
        let mut all_keys = Vec::new();
        keys("", &en.root, &mut all_keys);
        assert!(!all_keys.is_empty());

        for locale in [Locale::Zh, Locale::Ja] {
            let catalog = Catalog::builtin(locale);
            for key in &all_keys {
                assert_ne!(
                    &catalog.get(key),
                    key,
                    "{locale:?} catalog is missing '{key}'"
                );
            }
        }
    }
}
