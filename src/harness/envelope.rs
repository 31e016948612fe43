use serde::Deserialize;
use serde_json::Value;

/// Response body shared by every resource module: `{ success, data?, error? }`.
///
/// Decoding is lenient: a missing `success` counts as `false` and unknown
/// keys are ignored, so a sloppy module loses points instead of failing to
/// parse.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    pub fn data_is_array(&self) -> bool {
        matches!(self.data, Some(Value::Array(_)))
    }

    /// Identifier of the returned record (`data._id`), if it is a non-empty string.
    pub fn record_id(&self) -> Option<&str> {
        self.field("_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(name))
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.field(name).and_then(Value::as_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_list_envelope() {
        let env = parse(r#"{"success": true, "data": []}"#);
        assert!(env.success);
        assert!(env.data_is_array());
        assert!(env.record_id().is_none());
    }

    #[test]
    fn test_missing_success_is_false() {
        let env = parse(r#"{"data": {"_id": "abc"}}"#);
        assert!(!env.success);
        assert_eq!(env.record_id(), Some("abc"));
    }

    #[test]
    fn test_record_fields() {
        let env = parse(
            r#"{"success": true, "data": {"_id": "65f0", "name": "Test Item", "price": 19.99, "quantity": 5}}"#,
        );
        assert_eq!(env.str_field("name"), Some("Test Item"));
        assert_eq!(env.f64_field("price"), Some(19.99));
        assert_eq!(env.f64_field("quantity"), Some(5.0));
        assert!(!env.data_is_array());
    }

    #[test]
    fn test_non_string_or_empty_id_ignored() {
        assert!(parse(r#"{"success": true, "data": {"_id": 42}}"#).record_id().is_none());
        assert!(parse(r#"{"success": true, "data": {"_id": ""}}"#).record_id().is_none());
    }

    #[test]
    fn test_error_envelope() {
        let env = parse(r#"{"success": false, "error": "Invalid id"}"#);
        assert_eq!(env.error.as_deref(), Some("Invalid id"));
        assert!(env.data.is_none());
    }
}
