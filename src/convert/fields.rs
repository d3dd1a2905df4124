use serde_json::Value;
use url::Url;

use super::ConversionError;

static NULL: Value = Value::Null;

/// Lenient field access over one JSON object on behalf of `entity`.
///
/// Optional scalars fall back to their empty value and coerce across JSON
/// types the way the catalog service mixes them (`"12"` reads as `12`, `12`
/// reads as `"12"`). Required fields go through `required_*` and fail with a
/// [`ConversionError`] naming the field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fields<'a> {
    entity: &'static str,
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(entity: &'static str, value: &'a Value) -> Self {
        Self { entity, value }
    }

    pub(crate) fn get(&self, key: &str) -> &'a Value {
        self.value.get(key).unwrap_or(&NULL)
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        !self.get(key).is_null()
    }

    /// Nested object, read with the same entity name.
    pub(crate) fn object(&self, key: &str) -> Fields<'a> {
        Fields::new(self.entity, self.get(key))
    }

    pub(crate) fn str(&self, key: &str) -> String {
        value_to_string(self.get(key)).unwrap_or_default()
    }

    /// The field's text only when the payload holds a non-empty string.
    pub(crate) fn opt_str(&self, key: &str) -> Option<&'a str> {
        self.get(key).as_str().filter(|s| !s.is_empty())
    }

    pub(crate) fn int(&self, key: &str) -> i64 {
        value_to_i64(self.get(key)).unwrap_or(0)
    }

    pub(crate) fn float(&self, key: &str) -> f64 {
        value_to_f64(self.get(key)).unwrap_or(0.0)
    }

    pub(crate) fn bool(&self, key: &str) -> bool {
        match self.get(key) {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "t" | "yes" | "y" | "1"
            ),
            _ => false,
        }
    }

    pub(crate) fn array(&self, key: &str) -> &'a [Value] {
        self.get(key).as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn strings(&self, key: &str) -> Vec<String> {
        self.array(key)
            .iter()
            .map(|v| value_to_string(v).unwrap_or_default())
            .collect()
    }

    pub(crate) fn url(&self, key: &str, base: &Url) -> Option<Url> {
        resolve_url(&self.str(key), base)
    }

    pub(crate) fn required_id(&self, key: &str) -> Result<u64, ConversionError> {
        match self.get(key) {
            Value::Null => Err(ConversionError::missing(self.entity, key)),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| ConversionError::malformed(self.entity, key)),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| ConversionError::malformed(self.entity, key)),
            _ => Err(ConversionError::malformed(self.entity, key)),
        }
    }

    pub(crate) fn required_str(&self, key: &str) -> Result<String, ConversionError> {
        match self.get(key) {
            Value::Null => Err(ConversionError::missing(self.entity, key)),
            other => {
                value_to_string(other).ok_or_else(|| ConversionError::malformed(self.entity, key))
            }
        }
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Resolves an image or icon reference from the payload.
///
/// Absolute URLs are kept, protocol-relative ones get `https:`, and bare
/// paths are joined onto `base`. Empty or unusable values are `None`.
pub fn resolve_url(raw: &str, base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("//") {
        return Url::parse(&format!("https:{raw}")).ok();
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(raw).ok(),
        Err(_) => None,
    }
}
