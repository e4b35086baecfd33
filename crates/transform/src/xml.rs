use quick_xml::Reader;
use quick_xml::events::Event;
use serde_json::{Map, Value};

use crate::TransformError;

/// Converts an XML document into a nested JSON object.
///
/// The result maps the root element name to its converted value: elements with
/// children become objects, text-only elements become strings, and empty
/// elements become `null`. Repeated sibling names collapse into an array.
/// Attributes, XML declarations, comments and processing instructions are
/// dropped; parsing starts at the first tag and stops when the root closes.
pub fn xml_to_json(input: &str) -> Result<Value, TransformError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    // (element name, accumulated children, accumulated text)
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TransformError::Xml(e.to_string()))?;

        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Event::Empty(empty) => {
                let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some((_, children, _)) => insert_child(children, name, Value::Null),
                    // Self-closing root: the whole document is one empty element.
                    None => return Ok(root_object(name, Value::Null)),
                }
            }
            Event::Text(text) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    let chunk = text
                        .unescape()
                        .map_err(|e| TransformError::Xml(e.to_string()))?;
                    buf.push_str(&chunk);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                let (name, children, text) = match stack.pop() {
                    Some(frame) => frame,
                    None => return Err(TransformError::Xml("unexpected closing tag".into())),
                };
                let value = element_value(children, text);
                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, value),
                    None => return Ok(root_object(name, value)),
                }
            }
            // Declarations, comments and PIs carry no content of interest.
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => {
                return if stack.is_empty() {
                    Err(TransformError::NoRoot)
                } else {
                    Err(TransformError::Xml("unexpected end of document".into()))
                };
            }
            _ => {}
        }
    }
}

/// A finished element: children win over mixed text, bare text becomes a
/// string, neither becomes `null`.
fn element_value(children: Map<String, Value>, text: String) -> Value {
    if !children.is_empty() {
        Value::Object(children)
    } else if !text.is_empty() {
        Value::String(text)
    } else {
        Value::Null
    }
}

fn root_object(name: String, value: Value) -> Value {
    let mut root = Map::new();
    root.insert(name, value);
    Value::Object(root)
}

/// Inserts a child value, collapsing repeated sibling names into an array.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_elements() {
        let v = xml_to_json("<a><b>1</b></a>").unwrap();
        assert_eq!(v, json!({"a": {"b": "1"}}));
    }

    #[test]
    fn deeply_nested() {
        let v = xml_to_json("<root><outer><inner>x</inner></outer></root>").unwrap();
        assert_eq!(v, json!({"root": {"outer": {"inner": "x"}}}));
    }

    #[test]
    fn declaration_is_stripped() {
        let v = xml_to_json("<?xml version=\"1.0\" encoding=\"utf-8\"?><a><b>1</b></a>").unwrap();
        assert_eq!(v, json!({"a": {"b": "1"}}));
    }

    #[test]
    fn attributes_are_dropped() {
        let v = xml_to_json(r#"<a id="7" kind="test"><b attr="x">1</b></a>"#).unwrap();
        assert_eq!(v, json!({"a": {"b": "1"}}));
        let rendered = v.to_string();
        assert!(!rendered.contains("id"));
        assert!(!rendered.contains("@"));
    }

    #[test]
    fn repeated_siblings_become_array() {
        let v = xml_to_json("<list><item>1</item><item>2</item><item>3</item></list>").unwrap();
        assert_eq!(v, json!({"list": {"item": ["1", "2", "3"]}}));
    }

    #[test]
    fn empty_elements_become_null() {
        let v = xml_to_json("<a><b/></a>").unwrap();
        assert_eq!(v, json!({"a": {"b": null}}));
        let v = xml_to_json("<a/>").unwrap();
        assert_eq!(v, json!({"a": null}));
    }

    #[test]
    fn cdata_is_text() {
        let v = xml_to_json("<a><![CDATA[raw <text>]]></a>").unwrap();
        assert_eq!(v, json!({"a": "raw <text>"}));
    }

    #[test]
    fn entities_are_unescaped() {
        let v = xml_to_json("<a>1 &lt; 2 &amp; 3</a>").unwrap();
        assert_eq!(v, json!({"a": "1 < 2 & 3"}));
    }

    #[test]
    fn comments_are_ignored() {
        let v = xml_to_json("<a><!-- note --><b>1</b></a>").unwrap();
        assert_eq!(v, json!({"a": {"b": "1"}}));
    }

    #[test]
    fn unclosed_document_is_error() {
        assert!(xml_to_json("<a><b>1</b>").is_err());
    }

    #[test]
    fn mismatched_tags_are_error() {
        assert!(xml_to_json("<a><b>1</a></b>").is_err());
    }

    #[test]
    fn empty_input_is_error() {
        assert!(matches!(xml_to_json(""), Err(TransformError::NoRoot)));
        assert!(matches!(xml_to_json("   "), Err(TransformError::NoRoot)));
    }
}
