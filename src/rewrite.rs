//! Rewrites asset references inside textual assets so they point into the packed tree.
//!
//! Only markup lines (containing both `<` and `>`) are inspected. Every double-quoted
//! span on such a line is treated as a potential path:
//!
//! ```text
//! <Texture path="/Data/sprite.png"/>  ->  <Texture path="/Data/Packed/sprite.img"/>
//! ```

use std::borrow::Cow;

use crate::extension::packed_extension;

const DATA_SEGMENT: &str = "Data";
const PACKED_SEGMENT: &str = "Packed";

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Rewrites every quoted span of a single line (without its terminator).
pub fn rewrite_line(line: &str) -> Cow<'_, str> {
    if !line.contains('<') || !line.contains('>') {
        return Cow::Borrowed(line);
    }

    let mut out = line.to_string();
    let mut cursor = 0;

    loop {
        let Some(open) = out[cursor..].find('"').map(|i| cursor + i) else {
            break;
        };
        let start = open + 1;
        let Some(close) = out[start..].find('"').map(|i| start + i) else {
            break;
        };

        let rewritten = rewrite_quoted(&out[start..close]);
        let new_close = start + rewritten.len();
        if let Cow::Owned(text) = rewritten {
            out.replace_range(start..close, &text);
        }

        // resume after the closing quote of the rewritten span
        cursor = new_close + 1;
    }

    if out == line {
        Cow::Borrowed(line)
    } else {
        Cow::Owned(out)
    }
}

/// Applies the Data segment insertion and the extension mapping to one quoted span.
pub fn rewrite_quoted(text: &str) -> Cow<'_, str> {
    let with_root = insert_packed_segment(text);
    match replace_extension(&with_root) {
        Cow::Owned(replaced) => Cow::Owned(replaced),
        Cow::Borrowed(_) => with_root,
    }
}

/// Inserts `Packed` after the first `Data` segment bounded by separators.
fn insert_packed_segment(text: &str) -> Cow<'_, str> {
    for (idx, _) in text.match_indices(DATA_SEGMENT) {
        let before = text[..idx].chars().next_back();
        let after_idx = idx + DATA_SEGMENT.len();
        let after = text[after_idx..].chars().next();

        let (Some(before), Some(sep)) = (before, after) else {
            continue;
        };
        if !is_separator(before) || !is_separator(sep) {
            continue;
        }

        let tail = &text[after_idx + 1..];
        if tail
            .strip_prefix(PACKED_SEGMENT)
            .and_then(|rest| rest.chars().next())
            .is_some_and(is_separator)
        {
            return Cow::Borrowed(text);
        }

        let mut out = String::with_capacity(text.len() + PACKED_SEGMENT.len() + 1);
        out.push_str(&text[..=after_idx]);
        out.push_str(PACKED_SEGMENT);
        out.push(sep);
        out.push_str(tail);
        return Cow::Owned(out);
    }

    Cow::Borrowed(text)
}

/// Replaces the extension of the last path component, if it has one.
fn replace_extension(text: &str) -> Cow<'_, str> {
    let name_start = text.rfind(is_separator).map_or(0, |i| i + 1);
    let Some(dot) = text[name_start..].rfind('.').map(|i| name_start + i) else {
        return Cow::Borrowed(text);
    };

    let ext = &text[dot..];
    let packed = packed_extension(ext);
    if packed == ext {
        return Cow::Borrowed(text);
    }

    Cow::Owned(format!("{}{packed}", &text[..dot]))
}
