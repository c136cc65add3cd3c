//! Canonical form of JSON documents kept in state

use serde_json::Value as Json;

/// Sorted object keys and no insignificant whitespace
pub fn canonicalize(text: &str) -> Result<String, serde_json::Error> {
    let value: Json = serde_json::from_str(text)?;
    serde_json::to_string(&value)
}

/// Canonical text of an already parsed document
pub fn canonical_string(value: &Json) -> String {
    // serializing a Value cannot fail; its map keys are always strings
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_sorted_and_whitespace_dropped() {
        let text = r#"{ "b": [1, 2, {"z": true, "a": null}],
                       "a": "x y" }"#;
        assert_eq!(
            canonicalize(text).unwrap(),
            r#"{"a":"x y","b":[1,2,{"a":null,"z":true}]}"#
        );
    }

    #[test]
    fn equivalent_documents_share_one_form() {
        let a = canonicalize(r#"{"x":1,"y":[ "a" ]}"#).unwrap();
        let b = canonicalize("{\n  \"y\": [\"a\"],\n  \"x\": 1\n}").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        assert!(canonicalize("{\"x\":").is_err());
    }
}
