//! Text cleanup for raw PDF extractions.
//!
//! The output keeps line structure (one `\n` between non-empty lines) because header
//! detection is line based; everything else is collapsed to single spaces.

use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on cleanup passes. Each pass either leaves the text unchanged or makes it
/// shorter, so the fixpoint is normally reached in two or three passes.
const MAX_PASSES: usize = 16;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\bhttps?://|\bftp://|\bwww\.)[^\s<>()\[\]{}]+|\bdoi:\s*10\.\d{4,9}/\S+")
            .unwrap_or_else(|e| panic!("url pattern: {e}"))
    })
}

fn boilerplate_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            // Copyright lines run to end of line: "© 2021 Elsevier Ltd. All rights reserved."
            r"(?i)(?:\bcopyright\b|©|\(c\)\s*\d{4})[^\n]*",
            r"(?i)\ball rights reserved\b\.?",
            r"(?i)\bdownloaded from\b[^\n]*",
            r"(?i)\bfor personal use only\b\.?",
            r"(?i)\bclick here\b[^\n.]*\.?",
            r"(?i)\bview (?:this )?article online\b[^\n.]*\.?",
        ]
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("boilerplate pattern {p:?}: {e}")))
        .collect()
    })
}

/// Re-join words broken across lines: "exam-\nple" -> "example".
///
/// Only joins when the continuation starts lowercase; chains ("a-\nb-\nc") join in one pass.
fn dehyphenate(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-'
            && i > 0
            && chars[i - 1].is_alphabetic()
            && chars.get(i + 1) == Some(&'\n')
            && chars.get(i + 2).is_some_and(|n| n.is_lowercase())
        {
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Collapse horizontal whitespace to single spaces, trim lines, and drop empty lines.
fn normalize_ws(s: &str) -> String {
    let t = s
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{000C}', "\n");
    let mut out = String::with_capacity(t.len());
    for line in t.split('\n') {
        let mut words = line.split_whitespace().peekable();
        if words.peek().is_none() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let mut first = true;
        for w in words {
            if !first {
                out.push(' ');
            }
            out.push_str(w);
            first = false;
        }
    }
    out
}

fn clean_pass(s: &str) -> String {
    let mut t = normalize_ws(s);
    t = dehyphenate(&t);
    t = url_re().replace_all(&t, " ").into_owned();
    for re in boilerplate_res() {
        t = re.replace_all(&t, " ").into_owned();
    }
    normalize_ws(&t)
}

/// Normalize extracted text: strip URLs and publisher boilerplate, re-join hyphenated line
/// breaks, and collapse whitespace.
///
/// Pure and idempotent: `clean(&clean(t)) == clean(t)`. Empty or whitespace-only input
/// yields an empty string.
pub fn clean(text: &str) -> String {
    let mut cur = clean_pass(text);
    for _ in 1..MAX_PASSES {
        let next = clean_pass(&cur);
        if next == cur {
            break;
        }
        cur = next;
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_and_blank_input_clean_to_empty() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("  \n\t \r\n  "), "");
    }

    #[test]
    fn collapses_whitespace_but_keeps_lines() {
        let s = clean("Abstract  \n\n\n  This   paper\tstudies X.\r\nIt finds Y.");
        assert_eq!(s, "Abstract\nThis paper studies X.\nIt finds Y.");
    }

    #[test]
    fn strips_urls_and_dois() {
        let s = clean(
            "See https://example.org/a?b=c for data and www.lab.edu too. doi: 10.1000/xyz123",
        );
        assert!(!s.contains("example.org"), "{s:?}");
        assert!(!s.contains("lab.edu"), "{s:?}");
        assert!(!s.contains("10.1000"), "{s:?}");
        assert!(s.starts_with("See for data"), "{s:?}");
    }

    #[test]
    fn strips_copyright_and_rights_lines() {
        let s = clean(
            "Results\nWe saw an effect.\n© 2021 Elsevier Ltd. All rights reserved.\nCopyright 2020 The Authors\nMore text.",
        );
        assert_eq!(s, "Results\nWe saw an effect.\nMore text.");
    }

    #[test]
    fn rejoins_hyphenated_line_breaks() {
        assert_eq!(clean("an exam-\nple of this"), "an example of this");
        // Capitalized continuation is a real line start, not a broken word.
        assert_eq!(clean("pre-\nTrial"), "pre-\nTrial");
    }

    #[test]
    fn strips_tracking_link_text() {
        let s = clean(
            "Downloaded from journals.example.com on May 1\nBody text here.\nClick here to view the supplement",
        );
        assert_eq!(s, "Body text here.");
    }

    proptest! {
        #[test]
        fn clean_is_idempotent(s in "(?s).{0,200}") {
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once);
        }

        #[test]
        fn clean_is_idempotent_on_paper_like_text(
            lines in prop::collection::vec("[A-Za-z ©()\\-:./]{0,40}", 0..12),
        ) {
            let s = lines.join("\n");
            let once = clean(&s);
            prop_assert_eq!(clean(&once), once.clone());
            prop_assert!(!once.contains("  "));
            prop_assert!(!once.contains("\n\n"));
        }
    }
}
