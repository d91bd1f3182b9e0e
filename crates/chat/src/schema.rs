use serde_json::{Map, Value};

/// Keywords Gemini's function-declaration schema understands.
const KEPT_KEYS: [&str; 8] = ["type", "description", "properties", "required", "items", "enum", "format", "nullable"];

/// Reduce a JSON schema to the OpenAPI subset Gemini accepts.
///
/// Unknown keywords are dropped, `type: [T, "null"]` becomes `type: T` with
/// `nullable: true`, and string formats other than `enum`/`date-time` are
/// removed.
pub fn sanitize_for_gemini(schema: &Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return schema.clone();
    };

    let mut out = Map::new();
    for (key, value) in obj {
        if !KEPT_KEYS.contains(&key.as_str()) {
            continue;
        }
        let value = match key.as_str() {
            "properties" => match value.as_object() {
                Some(props) => Value::Object(props.iter().map(|(k, v)| (k.clone(), sanitize_for_gemini(v))).collect()),
                None => continue,
            },
            "items" => sanitize_for_gemini(value),
            "type" => match value {
                Value::Array(types) => {
                    let mut non_null = types.iter().filter(|t| t.as_str() != Some("null"));
                    if types.len() > 1 && types.iter().any(|t| t.as_str() == Some("null")) {
                        out.insert("nullable".into(), Value::Bool(true));
                    }
                    match non_null.next() {
                        Some(t) => t.clone(),
                        None => continue,
                    }
                }
                other => other.clone(),
            },
            _ => value.clone(),
        };
        out.insert(key.clone(), value);
    }

    let is_string = out.get("type").and_then(Value::as_str) == Some("string");
    let keep_format = matches!(out.get("format").and_then(Value::as_str), Some("enum" | "date-time"));
    if is_string && !keep_format {
        out.remove("format");
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drops_unsupported_keywords_recursively() {
        let schema = json!({
            "type": "object",
            "title": "Body",
            "additionalProperties": false,
            "properties": {
                "email": {"type": "string", "format": "email", "example": "a@x.com"},
                "tags": {"type": "array", "items": {"type": "string", "minLength": 1}}
            },
            "required": ["email"]
        });
        assert_eq!(
            sanitize_for_gemini(&schema),
            json!({
                "type": "object",
                "properties": {
                    "email": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["email"]
            })
        );
    }

    #[test]
    fn type_unions_with_null_become_nullable() {
        let schema = json!({"type": ["string", "null"], "description": "Phone"});
        assert_eq!(sanitize_for_gemini(&schema), json!({"type": "string", "nullable": true, "description": "Phone"}));
    }

    #[test]
    fn numeric_formats_are_kept() {
        let schema = json!({"type": "number", "format": "double"});
        assert_eq!(sanitize_for_gemini(&schema), schema);
        let schema = json!({"type": "string", "format": "date-time"});
        assert_eq!(sanitize_for_gemini(&schema), schema);
    }
}
