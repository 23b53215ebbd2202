use std::borrow::Cow;

use thiserror::Error;
use tracing::{info, warn};

use crate::codec::SharedCodec;
use crate::listener::{ChangeEvent, SharedListener};
use crate::properties::{decode_utf16_into, Properties};
use crate::watch::{DataListener, WatchEvent};

/// A `\u` escape that is truncated, not hexadecimal, or an unpaired surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("malformed unicode escape")]
pub struct MalformedEscape;

/// Replace `\uXXXX` escapes with the characters they encode.
///
/// Escapes are UTF-16 code units, so consecutive escapes forming a surrogate
/// pair decode to a single character.
pub fn unescape_unicode(input: &str) -> Result<Cow<'_, str>, MalformedEscape> {
    if !input.contains("\\u") {
        return Ok(Cow::Borrowed(input));
    }

    let mut out = String::with_capacity(input.len());
    let mut units: Vec<u16> = Vec::new();
    let mut rest = input;
    while let Some(pos) = rest.find("\\u") {
        let (literal, tail) = rest.split_at(pos);
        if !literal.is_empty() {
            flush_units(&mut units, &mut out)?;
            out.push_str(literal);
        }
        let hex = tail
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or(MalformedEscape)?;
        units.push(u16::from_str_radix(hex, 16).map_err(|_| MalformedEscape)?);
        rest = &tail[6..];
    }
    flush_units(&mut units, &mut out)?;
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) -> Result<(), MalformedEscape> {
    let mut malformed = false;
    decode_utf16_into(units, out, |_, _| malformed = true);
    units.clear();
    if malformed {
        Err(MalformedEscape)
    } else {
        Ok(())
    }
}

/// Normalise the text stored on a watch node into property-file content.
///
/// The store keeps the file as a quoted string with `\uXXXX` escapes for
/// non-ASCII text and literal `\n` line separators. A malformed escape leaves
/// the text as it was rather than failing.
pub fn decode_payload(raw: &str) -> String {
    let unescaped = unescape_unicode(raw).unwrap_or(Cow::Borrowed(raw));
    let mut content: &str = &unescaped;
    if let Some(stripped) = content.strip_prefix('"') {
        content = stripped;
    }
    if let Some(stripped) = content.strip_suffix('"') {
        content = stripped;
    }
    content.replace("\\n", "\n")
}

/// Watch callback bound to one `(key, listener)` pair.
///
/// Each notification is handled independently: the payload is decoded, the
/// bound key is looked up and the caller's listener runs on the current
/// (watch service) thread.
pub struct WatchAdapter {
    key: String,
    listener: SharedListener,
    codec: SharedCodec,
}

impl WatchAdapter {
    pub fn new(key: impl Into<String>, listener: SharedListener, codec: SharedCodec) -> Self {
        WatchAdapter {
            key: key.into(),
            listener,
            codec,
        }
    }

    /// Value of the bound key in a raw node payload.
    pub fn extract_value(&self, payload: &[u8]) -> Option<String> {
        if payload.is_empty() {
            return None;
        }
        let text = match self.codec.decode(payload) {
            Ok(text) => text,
            Err(err) => {
                warn!(key = %self.key, error = %err, "payload codec failed, reading raw bytes");
                String::from_utf8_lossy(payload).into_owned()
            }
        };
        Properties::parse(&decode_payload(&text)).remove(&self.key)
    }
}

impl DataListener for WatchAdapter {
    fn handle_event(&self, path: &str, event: WatchEvent) {
        let event = match event {
            WatchEvent::Changed { payload } => {
                let new_value = self.extract_value(&payload);
                info!(key = %self.key, path, new_value = ?new_value, "config modified");
                ChangeEvent::modified(self.key.as_str(), new_value)
            }
            WatchEvent::Deleted => {
                info!(key = %self.key, path, "config deleted");
                ChangeEvent::deleted(self.key.as_str())
            }
        };
        self.listener.on_change_event(event);
    }
}
