//! Log Redaction
//!
//! Scrubs API keys, access tokens, and phone numbers from strings prior to logging.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_\-]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static TELEPHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    // Tokens first, so digits inside a key are not mistaken for a phone number.
    let redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]");
    TELEPHONE_RE
        .replace_all(&redacted, "[REDACTED_PHONE]")
        .into_owned()
}

/// Redacts every string leaf of a JSON value.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive_data(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_phone_and_bearer() {
        let raw = "Sending to +1-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("+1-555-123-4567"));
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(clean.contains("[REDACTED_PHONE]"));
        assert!(clean.contains("[REDACTED_TOKEN]"));
    }

    #[test]
    fn api_key_with_digits_is_one_token() {
        let clean = redact_sensitive_data("key=sk-1234567890123456789012345");
        assert_eq!(clean, "key=[REDACTED_TOKEN]");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(redact_sensitive_data("select * from orders"), "select * from orders");
    }

    #[test]
    fn redacts_nested_json_strings() {
        let v = json!({"auth": {"header": "Bearer abc.def"}, "n": 5, "list": ["555-123-4567"]});
        let clean = redact_value(&v);
        assert_eq!(clean["auth"]["header"], "[REDACTED_TOKEN]");
        assert_eq!(clean["n"], 5);
        assert_eq!(clean["list"][0], "[REDACTED_PHONE]");
    }
}
