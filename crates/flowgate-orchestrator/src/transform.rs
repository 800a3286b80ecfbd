//! Payload format transformation
//!
//! Source format is detected by structural sniffing; supported
//! conversions are JSON<->XML (structural element mapping) and
//! JSON<->form-encoded (flat key=value pairs). Unsupported pairs return
//! the payload unchanged.

use flowgate_core::prelude::*;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire format of a message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadFormat {
    Json,
    Xml,
    Form,
    Text,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Form => "form",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

/// Structural format sniffing
pub fn detect_format(payload: &str) -> PayloadFormat {
    let trimmed = payload.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        PayloadFormat::Json
    } else if trimmed.starts_with('<') {
        PayloadFormat::Xml
    } else if payload.contains('=') && payload.contains('&') {
        PayloadFormat::Form
    } else {
        PayloadFormat::Text
    }
}

/// Outcome of a transformation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// Payload converted to the target format
    Converted,
    /// Source already matches the target; payload unchanged
    Identity,
    /// No conversion exists for this format pair; payload unchanged
    Unsupported,
    /// Conversion failed; payload unchanged
    Failed(String),
}

/// Transformation result; `payload` is the original content unless the
/// outcome is `Converted`
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub payload: String,
    pub source: PayloadFormat,
    pub target: PayloadFormat,
    pub outcome: TransformOutcome,
}

impl TransformResult {
    pub fn succeeded(&self) -> bool {
        matches!(
            self.outcome,
            TransformOutcome::Converted | TransformOutcome::Identity
        )
    }
}

/// Transform a payload into the target format
pub fn transform_payload(payload: &str, target: PayloadFormat) -> TransformResult {
    let source = detect_format(payload);

    if source == target {
        return TransformResult {
            payload: payload.to_string(),
            source,
            target,
            outcome: TransformOutcome::Identity,
        };
    }

    let converted = match (source, target) {
        (PayloadFormat::Json, PayloadFormat::Xml) => {
            serde_json::from_str::<Value>(payload)
                .map(|v| json_to_xml(&v))
                .map_err(|e| e.to_string())
        }
        (PayloadFormat::Xml, PayloadFormat::Json) => xml_to_json(payload)
            .map(|v| v.to_string())
            .map_err(|e| e.to_string()),
        (PayloadFormat::Json, PayloadFormat::Form) => serde_json::from_str::<Value>(payload)
            .map_err(|e| e.to_string())
            .and_then(|v| json_to_form(&v)),
        (PayloadFormat::Form, PayloadFormat::Json) => {
            form_to_json(payload).map(|v| v.to_string())
        }
        _ => {
            return TransformResult {
                payload: payload.to_string(),
                source,
                target,
                outcome: TransformOutcome::Unsupported,
            };
        }
    };

    match converted {
        Ok(converted) => TransformResult {
            payload: converted,
            source,
            target,
            outcome: TransformOutcome::Converted,
        },
        Err(reason) => TransformResult {
            payload: payload.to_string(),
            source,
            target,
            outcome: TransformOutcome::Failed(reason),
        },
    }
}

// ============================================================================
// JSON <-> XML
// ============================================================================

fn json_to_xml(value: &Value) -> String {
    format!("<root>{}</root>", value_children(value))
}

fn value_children(value: &Value) -> String {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| element(k, v)).collect(),
        Value::Array(arr) => arr.iter().map(|v| element("item", v)).collect(),
        scalar => scalar_text(scalar),
    }
}

fn element(name: &str, value: &Value) -> String {
    match value {
        // arrays map to repeated sibling elements
        Value::Array(arr) => arr.iter().map(|v| element(name, v)).collect(),
        _ => format!("<{}>{}</{}>", name, value_children(value), name),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => escape(s).to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn xml_to_json(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // element stack: (name, children, accumulated text)
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                attach(&mut stack, &mut root, name, Value::Null);
            }
            Ok(Event::Text(ref t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| FlowgateError::serialization(format!("bad XML text: {}", e)))?;
                if let Some(top) = stack.last_mut() {
                    top.2.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| FlowgateError::serialization("unbalanced XML element"))?;
                let value = if children.is_empty() {
                    parse_scalar(text.trim())
                } else {
                    Value::Object(children)
                };
                attach(&mut stack, &mut root, name, value);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FlowgateError::serialization(format!("XML parse error: {}", e)));
            }
            _ => {}
        }
    }

    root.ok_or_else(|| FlowgateError::serialization("empty XML document"))
}

/// Attach a completed element to its parent, or take it as the document
/// value when the stack is empty (the root wrapper is unwrapped)
fn attach(
    stack: &mut [(String, Map<String, Value>, String)],
    root: &mut Option<Value>,
    name: String,
    value: Value,
) {
    match stack.last_mut() {
        Some(parent) => insert_with_siblings(&mut parent.1, name, value),
        None => *root = Some(value),
    }
}

/// Repeated sibling elements collapse into an array
fn insert_with_siblings(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(arr)) => arr.push(value),
        Some(existing) => {
            let prev = existing.take();
            *existing = Value::Array(vec![prev, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

fn parse_scalar(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    if let Ok(b) = text.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

// ============================================================================
// JSON <-> form-encoded
// ============================================================================

fn json_to_form(value: &Value) -> std::result::Result<String, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "form encoding requires a flat object".to_string())?;

    Ok(obj
        .iter()
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", urlencoding::encode(k), urlencoding::encode(&text))
        })
        .collect::<Vec<_>>()
        .join("&"))
}

fn form_to_json(form: &str) -> std::result::Result<Value, String> {
    let mut map = Map::new();
    for pair in form.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key)
            .map_err(|e| format!("bad form key: {}", e))?
            .into_owned();
        let value = urlencoding::decode(value)
            .map_err(|e| format!("bad form value: {}", e))?
            .into_owned();
        map.insert(key, parse_scalar(&value));
    }
    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection() {
        assert_eq!(detect_format(r#"{"a":1}"#), PayloadFormat::Json);
        assert_eq!(detect_format("  [1,2]"), PayloadFormat::Json);
        assert_eq!(detect_format("<order><id>1</id></order>"), PayloadFormat::Xml);
        assert_eq!(detect_format("a=1&b=2"), PayloadFormat::Form);
        assert_eq!(detect_format("a=1"), PayloadFormat::Text);
        assert_eq!(detect_format("plain words"), PayloadFormat::Text);
    }

    #[test]
    fn test_identity_leaves_payload_unchanged() {
        let result = transform_payload(r#"{"a":1}"#, PayloadFormat::Json);
        assert_eq!(result.outcome, TransformOutcome::Identity);
        assert_eq!(result.payload, r#"{"a":1}"#);
    }

    #[test]
    fn test_json_to_xml() {
        let result = transform_payload(r#"{"id":1,"name":"widget"}"#, PayloadFormat::Xml);
        assert_eq!(result.outcome, TransformOutcome::Converted);
        assert!(result.payload.contains("<id>1</id>"));
        assert!(result.payload.contains("<name>widget</name>"));
        assert!(result.payload.starts_with("<root>"));
    }

    #[test]
    fn test_json_xml_structural_round_trip() {
        let original = r#"{"id":7,"name":"widget","tags":["a","b"],"spec":{"weight":2}}"#;
        let xml = transform_payload(original, PayloadFormat::Xml);
        assert_eq!(xml.outcome, TransformOutcome::Converted);

        let back = transform_payload(&xml.payload, PayloadFormat::Json);
        assert_eq!(back.outcome, TransformOutcome::Converted);

        let value: Value = serde_json::from_str(&back.payload).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["name"], "widget");
        assert_eq!(value["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(value["spec"]["weight"], 2);
    }

    #[test]
    fn test_json_form_round_trip_preserves_keys_and_values() {
        let original = r#"{"name":"Widget Co","qty":3,"active":true}"#;
        let form = transform_payload(original, PayloadFormat::Form);
        assert_eq!(form.outcome, TransformOutcome::Converted);
        assert!(form.payload.contains("name=Widget%20Co"));

        let back = transform_payload(&form.payload, PayloadFormat::Json);
        assert_eq!(back.outcome, TransformOutcome::Converted);

        let value: Value = serde_json::from_str(&back.payload).unwrap();
        assert_eq!(value["name"], "Widget Co");
        assert_eq!(value["qty"], 3);
        assert_eq!(value["active"], true);
    }

    #[test]
    fn test_xml_escaping_in_values() {
        let result = transform_payload(r#"{"text":"a<b&c"}"#, PayloadFormat::Xml);
        assert_eq!(result.outcome, TransformOutcome::Converted);
        assert!(result.payload.contains("a&lt;b&amp;c"));
    }

    #[test]
    fn test_unsupported_pair_returns_original() {
        let xml = "<order><id>1</id></order>";
        let result = transform_payload(xml, PayloadFormat::Form);
        assert_eq!(result.outcome, TransformOutcome::Unsupported);
        assert_eq!(result.payload, xml);
    }

    #[test]
    fn test_text_source_is_unsupported() {
        let result = transform_payload("plain words", PayloadFormat::Json);
        assert_eq!(result.outcome, TransformOutcome::Unsupported);
        assert_eq!(result.payload, "plain words");
    }

    #[test]
    fn test_malformed_json_fails_with_original_payload() {
        let broken = r#"{"a":"#;
        let result = transform_payload(broken, PayloadFormat::Xml);
        assert!(matches!(result.outcome, TransformOutcome::Failed(_)));
        assert_eq!(result.payload, broken);
    }

    #[test]
    fn test_form_encoding_requires_object() {
        let result = transform_payload("[1,2,3]", PayloadFormat::Form);
        assert!(matches!(result.outcome, TransformOutcome::Failed(_)));
    }
}
