//! Collects printable-ish byte runs from a file, mirroring the reference
//! implementation's `ScanStrings`.

use std::sync::OnceLock;

use async_trait::async_trait;
use indexmap::IndexSet;
use regex::bytes::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::model::File;
use crate::scanner::{Options, ScanContext, Scanner};

fn strings_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\x00-\x1F\x7F-\xFF]{4,}").unwrap())
}

fn always_keep_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)0x|qr|/js").unwrap())
}

fn has_alpha_or_digit_run(s: &str, n: usize) -> bool {
    let mut prev = None;
    let mut run = 0usize;
    for c in s.chars() {
        let class = if c.is_alphabetic() {
            'a'
        } else if c.is_ascii_digit() {
            'd'
        } else {
            'o'
        };
        if Some(class) == prev {
            run += 1;
        } else {
            prev = Some(class);
            run = 1;
        }
        if class != 'o' && run >= n {
            return true;
        }
    }
    false
}

fn delimiters_in_order(s: &str) -> bool {
    let mut seen_paren = false;
    let mut seen_bracket = false;
    let mut seen_brace = false;
    for c in s.chars() {
        match c {
            '(' => seen_paren = true,
            '[' => seen_bracket = true,
            '{' => seen_brace = true,
            ')' if !seen_paren => return false,
            ']' if !seen_bracket => return false,
            '}' if !seen_brace => return false,
            _ => {}
        }
    }
    true
}

/// Heuristic from the reference `ScanStrings._keep_string`: keeps strings
/// that are "probably not garbage ASCII" once the input wasn't fully valid
/// UTF-8 text — long enough, matching one of a few always-interesting
/// patterns, or with a visible letter/digit run and correctly nested
/// bracket-like delimiters.
fn keep_string(s: &str) -> bool {
    if s.len() >= 7 {
        return true;
    }
    if always_keep_regex().is_match(s) {
        return true;
    }
    if !has_alpha_or_digit_run(s, 3) {
        return false;
    }
    delimiters_in_order(s)
}

/// Extracts runs of non-control, non-extended-ASCII bytes (length ≥ 4),
/// deduplicated in first-seen order and optionally capped by
/// `options.limit`.
pub struct Strings;

#[async_trait]
impl Scanner for Strings {
    fn name(&self) -> &str {
        "ScanStrings"
    }

    async fn scan(&self, data: &[u8], _file: &File, options: &Options, ctx: &mut ScanContext) -> Result<()> {
        let limit = options.get("limit").and_then(Value::as_u64).unwrap_or(0) as usize;

        let mut strings: IndexSet<String> = IndexSet::new();
        for m in strings_regex().find_iter(data) {
            if let Ok(s) = std::str::from_utf8(m.as_bytes()) {
                strings.insert(s.to_string());
            }
        }

        let successful_decode = std::str::from_utf8(data).is_ok();
        if !successful_decode {
            strings.retain(|s| keep_string(s));
        }

        let mut strings: Vec<String> = strings.into_iter().collect();
        if limit > 0 {
            strings.truncate(limit);
        }

        ctx.set("strings", strings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBlobStore;
    use crate::deadline::Deadline;
    use std::sync::Arc;

    fn fresh_context() -> ScanContext {
        ScanContext::new(
            "ScanStrings".to_string(),
            Arc::new(InMemoryBlobStore::new()),
            Deadline::from_now(60.0),
        )
    }

    #[tokio::test]
    async fn extracts_deduplicated_runs_in_order() {
        let mut ctx = fresh_context();
        let file = File::root("p");
        Strings
            .scan(b"hello hello world1234", &file, &Options::new(), &mut ctx)
            .await
            .unwrap();
        match ctx.fields.get("strings") {
            Some(crate::model::FieldValue::Json(Value::Array(items))) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], Value::String("hello".to_string()));
                assert_eq!(items[1], Value::String("world1234".to_string()));
            }
            other => panic!("unexpected fields.strings: {other:?}"),
        }
    }

    #[test]
    fn keep_string_always_keeps_short_hex_qr_and_js_path_markers() {
        assert!(keep_string("0x1"));
        assert!(keep_string("QR"));
        assert!(keep_string("/js"));
        assert!(!keep_string("zz"));
    }

    #[tokio::test]
    async fn short_non_utf8_garbage_without_markers_is_dropped() {
        let mut ctx = fresh_context();
        let file = File::root("p");
        // A trailing invalid-UTF-8 byte forces the non-successful-decode
        // filtering path. "ab!!" has no always-keep marker and no 3-run of
        // the same character class, so it's dropped; "0x!!" fails that same
        // run check but survives via the always-keep shortcut.
        let mut data = b"ab!!\n0x!!\n".to_vec();
        data.push(0xFF);
        Strings.scan(&data, &file, &Options::new(), &mut ctx).await.unwrap();
        match ctx.fields.get("strings") {
            Some(crate::model::FieldValue::Json(Value::Array(items))) => {
                assert!(!items.contains(&Value::String("ab!!".to_string())));
                assert!(items.contains(&Value::String("0x!!".to_string())));
            }
            other => panic!("unexpected fields.strings: {other:?}"),
        }
    }

    #[tokio::test]
    async fn limit_option_caps_results() {
        let mut ctx = fresh_context();
        let file = File::root("p");
        let mut options = Options::new();
        options.insert("limit".to_string(), Value::from(1));
        Strings
            .scan(b"alpha beta gamma", &file, &options, &mut ctx)
            .await
            .unwrap();
        match ctx.fields.get("strings") {
            Some(crate::model::FieldValue::Json(Value::Array(items))) => assert_eq!(items.len(), 1),
            other => panic!("unexpected fields.strings: {other:?}"),
        }
    }
}
