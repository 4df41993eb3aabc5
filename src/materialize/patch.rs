// src/materialize/patch.rs

//! Line-level edits of an engine configuration document.
//!
//! The document is treated as semi-structured text: only the touched
//! assignments and section boundaries are interpreted, everything else is
//! passed through byte-for-byte.

use anyhow::Result;
use regex::{Captures, Regex};
use tracing::warn;

/// Section that receives the user query.
pub const RUNFLOW_SECTION: &str = "runflow";
pub const USER_QUERY_KEY: &str = "user_query";

/// A bracketed table or array-of-tables header at the start of a line.
const SECTION_HEADER: &str = r"(?m)^[ \t]*\[\[?[A-Za-z0-9_.-]+\]\]?";

/// Replace the quoted value of every `key = "..."` assignment whose key is
/// exactly `key`, keeping the key, spacing and everything else intact.
///
/// Returns the new text and the number of assignments rewritten.
pub fn rewrite_quoted_field(content: &str, key: &str, value: &str) -> Result<(String, usize)> {
    let pattern = format!(
        r#"(?m)^([ \t]*{}[ \t]*=[ \t]*)"(?:[^"\\\n]|\\.)*""#,
        regex::escape(key)
    );
    let re = Regex::new(&pattern)?;
    let quoted = format!("\"{}\"", escape_basic_string(value));

    let mut count = 0;
    let rewritten = re.replace_all(content, |caps: &Captures| {
        count += 1;
        format!("{}{}", &caps[1], quoted)
    });

    Ok((rewritten.into_owned(), count))
}

/// Escape text for a double-quoted TOML basic string.
///
/// Each character is mapped exactly once, so a backslash produced by one
/// escape is never escaped again.
pub fn escape_basic_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Add `user_query = "<escaped>"` to the `[runflow]` section.
///
/// - No `[runflow]` text anywhere: an empty section is appended first.
/// - The section exists: the key goes right before the next section header,
///   or at the end of the document when `[runflow]` is the last section.
/// - The section already assigns `user_query`: that line is replaced, so the
///   document never carries two.
/// - `[runflow]` appears only as text (not as a header): a fresh section with
///   the key is appended at the very end.
pub fn insert_user_query(content: &str, escaped: &str) -> Result<String> {
    let line = format!("{USER_QUERY_KEY} = \"{escaped}\"\n");
    let marker = format!("[{RUNFLOW_SECTION}]");

    let mut doc = content.to_string();
    if !doc.contains(&marker) {
        doc.push_str(&format!("\n\n{marker}\n"));
    }

    let header = Regex::new(&format!(r"(?m)^[ \t]*\[{}\]", regex::escape(RUNFLOW_SECTION)))?;
    let Some(found) = header.find(&doc) else {
        warn!("[{RUNFLOW_SECTION}] header not found; appending a new section at end of file");
        return Ok(format!("{}\n\n{marker}\n{line}", doc.trim_end()));
    };

    // Body starts on the line after the header.
    let body_start = doc[found.end()..]
        .find('\n')
        .map(|i| found.end() + i + 1)
        .unwrap_or(doc.len());

    let next_header = Regex::new(SECTION_HEADER)?;
    let body_end = next_header
        .find(&doc[body_start..])
        .map(|m| body_start + m.start());

    let existing = Regex::new(&format!(
        r"(?m)^[ \t]*{}[ \t]*=.*(?:\n|$)",
        regex::escape(USER_QUERY_KEY)
    ))?;
    let section = &doc[body_start..body_end.unwrap_or(doc.len())];
    if let Some(m) = existing.find(section) {
        warn!("template already assigns {USER_QUERY_KEY}; replacing it");
        let (start, end) = (body_start + m.start(), body_start + m.end());
        let mut out = String::with_capacity(doc.len() + line.len());
        out.push_str(&doc[..start]);
        out.push_str(&line);
        out.push_str(&doc[end..]);
        return Ok(out);
    }

    Ok(match body_end {
        Some(at) => {
            let mut out = String::with_capacity(doc.len() + line.len());
            out.push_str(&doc[..at]);
            out.push_str(&line);
            out.push_str(&doc[at..]);
            out
        }
        None => format!("{}\n{line}", doc.trim_end()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runflow_query(doc: &str) -> String {
        let table: toml::Table = toml::from_str(doc).unwrap();
        table["runflow"]["user_query"].as_str().unwrap().to_string()
    }

    #[test]
    fn rewrite_touches_only_the_named_key() {
        let doc = "[io]\ninput_dir = \"old\"\nraw_input_dir = \"keep\"\n  input_dir=\"old2\"\n";
        let (out, n) = rewrite_quoted_field(doc, "input_dir", "/db/r1/input").unwrap();

        assert_eq!(n, 2);
        assert_eq!(
            out,
            "[io]\ninput_dir = \"/db/r1/input\"\nraw_input_dir = \"keep\"\n  input_dir=\"/db/r1/input\"\n"
        );
    }

    #[test]
    fn rewrite_value_with_dollar_is_literal() {
        let (out, _) = rewrite_quoted_field("output_dir = \"x\"\n", "output_dir", "/a/$1/b").unwrap();
        assert_eq!(out, "output_dir = \"/a/$1/b\"\n");
    }

    #[test]
    fn escape_handles_the_usual_suspects() {
        assert_eq!(
            escape_basic_string("a\\b\"c\nd\re\tf"),
            "a\\\\b\\\"c\\nd\\re\\tf"
        );
    }

    #[test]
    fn missing_section_is_appended_once() {
        let out = insert_user_query("[io]\ninput_dir = \"x\"\n", "hello").unwrap();

        assert_eq!(out.matches("[runflow]").count(), 1);
        assert_eq!(out.matches("user_query").count(), 1);
        assert_eq!(runflow_query(&out), "hello");
    }

    #[test]
    fn key_lands_before_the_following_section() {
        let doc = "[runflow]\nmode = \"fast\"\n\n[other]\nx = 1\n";
        let out = insert_user_query(doc, "q").unwrap();

        let runflow = out.find("[runflow]").unwrap();
        let key = out.find("user_query").unwrap();
        let other = out.find("[other]").unwrap();
        assert!(runflow < key && key < other);

        let table: toml::Table = toml::from_str(&out).unwrap();
        assert!(table["other"].get("user_query").is_none());
        assert_eq!(table["runflow"]["mode"].as_str(), Some("fast"));
    }

    #[test]
    fn header_directly_followed_by_next_section() {
        let out = insert_user_query("[runflow]\n[other]\nx = 1\n", "q").unwrap();
        assert_eq!(out, "[runflow]\nuser_query = \"q\"\n[other]\nx = 1\n");
    }

    #[test]
    fn last_section_gets_key_appended() {
        let out = insert_user_query("[io]\na = \"b\"\n\n[runflow]\nmode = 1\n\n\n", "q").unwrap();
        assert_eq!(out, "[io]\na = \"b\"\n\n[runflow]\nmode = 1\nuser_query = \"q\"\n");
    }

    #[test]
    fn marker_inside_a_value_triggers_fresh_section() {
        let doc = "[io]\nnote = \"see [runflow] docs\"\n";
        let out = insert_user_query(doc, "q").unwrap();

        assert!(out.ends_with("\n\n[runflow]\nuser_query = \"q\"\n"));
        assert_eq!(runflow_query(&out), "q");
    }

    #[test]
    fn existing_user_query_is_replaced() {
        let doc = "[runflow]\nuser_query = \"stale\"\nmode = 1\n";
        let out = insert_user_query(doc, "fresh").unwrap();
        assert_eq!(out, "[runflow]\nuser_query = \"fresh\"\nmode = 1\n");
    }

    #[test]
    fn array_of_tables_counts_as_section_boundary() {
        let doc = "[runflow]\nmode = 1\n[[agents]]\nname = \"a\"\n";
        let out = insert_user_query(doc, "q").unwrap();
        assert_eq!(runflow_query(&out), "q");
    }
}
