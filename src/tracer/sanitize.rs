//! Redaction and truncation of captured payloads.
//!
//! Every string reachable from an event's input, output or metadata is
//! scrubbed with the configured pattern and then cut to the field limit.
//! Keys, numbers and booleans pass through untouched.

use regex::Regex;
use serde_json::Value;

use super::events::IngestionEvent;

const REDACTED: &str = "[REDACTED]";

/// Applies the configured redaction pattern and size limit to event bodies
#[derive(Clone, Debug)]
pub struct Sanitizer {
    pattern: Option<Regex>,
    max_bytes: usize,
}

impl Sanitizer {
    pub fn new(pattern: Option<Regex>, max_bytes: usize) -> Self {
        Self { pattern, max_bytes }
    }

    /// Scrub the free-form JSON fields of an event before it is queued.
    /// Score events carry none and are left as they are.
    pub fn sanitize_event(&self, event: &mut IngestionEvent) {
        for field in event.json_fields_mut() {
            self.scrub(field);
        }
    }

    fn scrub(&self, value: &mut Value) {
        match value {
            Value::String(text) => self.scrub_text(text),
            Value::Array(items) => items.iter_mut().for_each(|item| self.scrub(item)),
            Value::Object(map) => map.values_mut().for_each(|item| self.scrub(item)),
            _ => {}
        }
    }

    fn scrub_text(&self, text: &mut String) {
        if let Some(pattern) = &self.pattern {
            if pattern.is_match(text) {
                *text = pattern.replace_all(text, REDACTED).into_owned();
            }
        }
        if text.len() > self.max_bytes {
            let mut end = self.max_bytes;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
    }
}
