use serde_json::Value;

use crate::errors::{ErrorCode, PurchaseError};

/// Null-safety default for list-returning native calls: `null`/non-array
/// results become an empty vector, never `null` to callers.
pub(crate) fn list_or_empty(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Null-safety default for string-returning native calls: `null`/non-string
/// results become `""`.
pub(crate) fn string_or_empty(value: Value) -> String {
    match value {
        Value::String(s) => s,
        _ => String::new(),
    }
}

/// Null-safety default for boolean completion getters: a missing/undefined
/// result becomes `false`.
pub(crate) fn bool_or_false(value: Value) -> bool {
    value.as_bool().unwrap_or(false)
}

/// Fails fast, before any native call, when a required string argument is
/// missing. The message is pattern-matchable: `"<operation> requires a
/// <argument>"`.
pub(crate) fn require_argument(
    value: &str,
    argument: &str,
    operation: &str,
) -> Result<(), PurchaseError> {
    if value.trim().is_empty() {
        return Err(PurchaseError::new(
            ErrorCode::DeveloperError,
            format!("{operation} requires a {argument}"),
        ));
    }
    Ok(())
}

/// Same contract for required non-empty list arguments.
pub(crate) fn require_non_empty(
    values: &[String],
    argument: &str,
    operation: &str,
) -> Result<(), PurchaseError> {
    if values.is_empty() || values.iter().all(|v| v.trim().is_empty()) {
        return Err(PurchaseError::new(
            ErrorCode::DeveloperError,
            format!("{operation} requires a {argument}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_default_never_propagates_null() {
        assert_eq!(list_or_empty(Value::Null), Vec::<Value>::new());
        assert_eq!(list_or_empty(json!("oops")), Vec::<Value>::new());
        assert_eq!(list_or_empty(json!([1, 2])), vec![json!(1), json!(2)]);
    }

    #[test]
    fn scalar_defaults_are_literal() {
        assert_eq!(string_or_empty(Value::Null), "");
        assert_eq!(string_or_empty(json!("jws")), "jws");
        assert!(!bool_or_false(Value::Null));
        assert!(bool_or_false(json!(true)));
    }

    #[test]
    fn require_argument_message_is_pattern_matchable() {
        let err = require_argument("", "SKU", "validateReceipt").unwrap_err();
        assert_eq!(err.code, ErrorCode::DeveloperError);
        assert!(err.message.contains("requires a SKU"));
        assert!(require_argument("a.sku", "SKU", "validateReceipt").is_ok());
    }

    #[test]
    fn require_non_empty_rejects_blank_lists() {
        assert!(require_non_empty(&[], "skus array", "requestPurchase").is_err());
        assert!(require_non_empty(&["".to_owned()], "skus array", "requestPurchase").is_err());
        assert!(require_non_empty(&["a.b".to_owned()], "skus array", "requestPurchase").is_ok());
    }
}
