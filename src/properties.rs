use std::collections::HashMap;

/// Parsed property-file text (`key=value` lines).
///
/// Follows the `.properties` conventions used by the remote service:
/// `=`, `:` or whitespace separate key and value, lines starting with `#` or
/// `!` are comments, a trailing odd backslash continues the logical line, and
/// `\t`, `\n`, `\r`, `\f`, `\uXXXX` escapes are honoured. When a key repeats,
/// the last value wins. Parsing never fails: unrecognised escapes keep the
/// escaped character and malformed `\u` sequences are kept verbatim.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            entries.insert(unescape(key), unescape(value));
        }
        Properties { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Take the value stored under exactly `key`.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{c}')
}

fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;

    for raw in text.lines() {
        let piece = raw.trim_start_matches(is_blank);
        if !continuing && (piece.is_empty() || piece.starts_with('#') || piece.starts_with('!')) {
            continue;
        }
        let trailing = piece.chars().rev().take_while(|c| *c == '\\').count();
        if trailing % 2 == 1 {
            current.push_str(&piece[..piece.len() - 1]);
            continuing = true;
        } else {
            current.push_str(piece);
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            key_end = idx;
            break;
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(&['=', ':'][..]) {
        rest = stripped.trim_start_matches(is_blank);
    }
    (key, rest)
}

fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    // Consecutive `\uXXXX` escapes with their source text, decoded together so
    // surrogate pairs combine.
    let mut pending: Vec<(u16, &str)> = Vec::new();
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if let Some(unit) = unicode_escape(rest) {
            pending.push((unit, &rest[..6]));
            rest = &rest[6..];
            continue;
        }
        flush_escapes(&mut pending, &mut out);
        rest = &rest[c.len_utf8()..];
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = rest.chars().next() else {
            break;
        };
        rest = &rest[next.len_utf8()..];
        match next {
            't' => out.push('\t'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            'f' => out.push('\u{c}'),
            'u' => out.push_str("\\u"),
            other => out.push(other),
        }
    }
    flush_escapes(&mut pending, &mut out);
    out
}

fn unicode_escape(text: &str) -> Option<u16> {
    let hex = text.strip_prefix("\\u")?.get(..4)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(hex, 16).ok()
}

fn flush_escapes(pending: &mut Vec<(u16, &str)>, out: &mut String) {
    if pending.is_empty() {
        return;
    }
    let units: Vec<u16> = pending.iter().map(|(unit, _)| *unit).collect();
    decode_utf16_into(&units, out, |idx, out| out.push_str(pending[idx].1));
    pending.clear();
}

/// Append UTF-16 code units to `out`, combining surrogate pairs.
///
/// `unpaired` is called with the index of every lone surrogate in `units`.
pub(crate) fn decode_utf16_into(
    units: &[u16],
    out: &mut String,
    mut unpaired: impl FnMut(usize, &mut String),
) {
    let mut idx = 0;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(c) => {
                out.push(c);
                idx += c.len_utf16();
            }
            Err(_) => {
                unpaired(idx, out);
                idx += 1;
            }
        }
    }
}
