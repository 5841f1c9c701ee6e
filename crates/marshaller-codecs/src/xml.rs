//! XML codec.
//!
//! The root element is named after the root content variable. Structure
//! members become child elements, or attributes when flagged with
//! [`XML_ATTRIBUTE`](marshaller_core::XML_ATTRIBUTE). A list that is a
//! structure member is written as repeated sibling elements carrying the
//! member's name; any other list is an element wrapping one `<item>` per
//! entry. Variable-length maps use the runtime keys as element names.
//!
//! Decoding is schema guided: undeclared elements are ignored and primitive
//! text is parsed per declared type.

use marshaller_core::value::{parse_scalar, render_scalar};
use marshaller_core::{formats, Container, ContentVariable, Kind, MarshallerError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::io::Write;

use crate::Codec;

/// Element name of entries of a list that is not a structure member.
pub const LIST_ITEM: &str = "item";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn format_id(&self) -> &'static str {
        formats::XML
    }

    fn marshal(&self, value: &Value, schema: &ContentVariable) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, &schema.name, value, schema)?;
        String::from_utf8(writer.into_inner()).map_err(codec_error)
    }

    fn unmarshal(&self, wire: &str, schema: &ContentVariable) -> Result<Value> {
        let document = parse_document(wire)?;
        if document.name != schema.name {
            return Err(MarshallerError::Codec(format!(
                "expected root element <{}>, found <{}>",
                schema.name, document.name
            )));
        }
        read_element(&document, schema)
    }
}

fn codec_error(e: impl Display) -> MarshallerError {
    MarshallerError::Codec(format!("xml: {}", e))
}

fn is_list(kind: &Kind<ContentVariable>) -> bool {
    matches!(
        kind,
        Kind::List(_)
            | Kind::VariableLength {
                container: Container::List,
                ..
            }
    )
}

/// Schema of the `index`-th entry of a list node.
fn entry_schema(schema: &ContentVariable, index: usize) -> Option<&ContentVariable> {
    match &schema.kind {
        Kind::List(children) => children.get(index),
        Kind::VariableLength { element, .. } => Some(element.as_ref()),
        _ => None,
    }
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &Value,
    schema: &ContentVariable,
) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match (&schema.kind, value) {
        (Kind::Primitive(_), Value::Array(_) | Value::Object(_)) => {
            Err(MarshallerError::type_mismatch(&schema.name, schema.kind.label(), value))
        }
        (Kind::Primitive(_), scalar) => {
            let text = render_scalar(scalar);
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(codec_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(codec_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(codec_error)
        }
        (Kind::Structure(children), Value::Object(fields)) => {
            let mut start = BytesStart::new(name);
            for child in children.iter().filter(|c| c.serialize_as_attribute()) {
                match fields.get(&child.name) {
                    None | Some(Value::Null) => {}
                    Some(v @ (Value::Array(_) | Value::Object(_))) => {
                        return Err(MarshallerError::type_mismatch(&child.name, "attribute", v))
                    }
                    Some(v) => {
                        start.push_attribute((child.name.as_str(), render_scalar(v).as_str()))
                    }
                }
            }
            writer.write_event(Event::Start(start)).map_err(codec_error)?;
            for child in children.iter().filter(|c| !c.serialize_as_attribute()) {
                if let Some(v) = fields.get(&child.name) {
                    write_member(writer, &child.name, v, child)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(codec_error)
        }
        (
            Kind::VariableLength {
                container: Container::Map,
                element,
            },
            Value::Object(fields),
        ) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(codec_error)?;
            for (key, v) in fields {
                write_element(writer, key, v, element)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(codec_error)
        }
        (kind, Value::Array(entries)) if is_list(kind) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(codec_error)?;
            for (i, entry) in entries.iter().enumerate() {
                if let Some(entry_schema) = entry_schema(schema, i) {
                    write_element(writer, LIST_ITEM, entry, entry_schema)?;
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(codec_error)
        }
        (kind, other) => Err(MarshallerError::type_mismatch(&schema.name, kind.label(), other)),
    }
}

/// Write a structure member; lists repeat the member element per entry.
fn write_member<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &Value,
    schema: &ContentVariable,
) -> Result<()> {
    if !is_list(&schema.kind) {
        return write_element(writer, name, value, schema);
    }
    match value {
        Value::Null => Ok(()),
        Value::Array(entries) => {
            for (i, entry) in entries.iter().enumerate() {
                if let Some(entry_schema) = entry_schema(schema, i) {
                    write_element(writer, name, entry, entry_schema)?;
                }
            }
            Ok(())
        }
        other => Err(MarshallerError::type_mismatch(&schema.name, schema.kind.label(), other)),
    }
}

/// Parsed element tree.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(codec_error)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(codec_error)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            ..Self::default()
        })
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        Ok(())
    } else if root.is_some() {
        Err(MarshallerError::Codec("xml: multiple root elements".to_string()))
    } else {
        *root = Some(element);
        Ok(())
    }
}

fn parse_document(wire: &str) -> Result<Element> {
    let mut reader = Reader::from_str(wire);
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event().map_err(codec_error)? {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| MarshallerError::Codec("xml: unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape().map_err(codec_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if !stack.is_empty() {
        return Err(MarshallerError::Codec("xml: unclosed element".to_string()));
    }
    root.ok_or_else(|| MarshallerError::Codec("xml: empty document".to_string()))
}

fn read_scalar(text: &str, schema: &ContentVariable) -> Result<Value> {
    match &schema.kind {
        Kind::Primitive(p) => parse_scalar(text, *p),
        other => Err(MarshallerError::Codec(format!(
            "xml: '{}' holds text but is declared {}",
            schema.name,
            other.label()
        ))),
    }
}

fn read_element(element: &Element, schema: &ContentVariable) -> Result<Value> {
    match &schema.kind {
        Kind::Primitive(_) => read_scalar(&element.text, schema),
        Kind::Structure(children) => {
            let mut fields = Map::new();
            for child in children {
                if child.serialize_as_attribute() {
                    if let Some(text) = element.attribute(&child.name) {
                        fields.insert(child.name.clone(), read_scalar(text, child)?);
                    }
                    continue;
                }
                let group: Vec<&Element> = element
                    .children
                    .iter()
                    .filter(|e| e.name == child.name)
                    .collect();
                if group.is_empty() {
                    continue;
                }
                fields.insert(child.name.clone(), read_member(&group, child)?);
            }
            Ok(Value::Object(fields))
        }
        Kind::VariableLength {
            container: Container::Map,
            element: entry,
        } => {
            let mut fields = Map::new();
            for child in &element.children {
                fields.insert(child.name.clone(), read_element(child, entry)?);
            }
            Ok(Value::Object(fields))
        }
        Kind::List(_)
        | Kind::VariableLength {
            container: Container::List,
            ..
        } => read_entries(element.children.iter(), schema),
    }
}

fn read_entries<'e>(
    entries: impl Iterator<Item = &'e Element>,
    schema: &ContentVariable,
) -> Result<Value> {
    let mut values = Vec::new();
    for (i, entry) in entries.enumerate() {
        match entry_schema(schema, i) {
            Some(entry_schema) => values.push(read_element(entry, entry_schema)?),
            None => break,
        }
    }
    Ok(Value::Array(values))
}

fn read_member(group: &[&Element], schema: &ContentVariable) -> Result<Value> {
    if is_list(&schema.kind) {
        return read_entries(group.iter().copied(), schema);
    }
    match group.first() {
        Some(element) => read_element(element, schema),
        None => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshaller_core::{PrimitiveType, XML_ATTRIBUTE};
    use serde_json::json;

    fn lamp() -> ContentVariable {
        ContentVariable::structure(
            "root",
            "lamp",
            vec![
                ContentVariable::primitive("id", "id", PrimitiveType::String)
                    .with_serialization_option(XML_ATTRIBUTE),
                ContentVariable::primitive("on", "on", PrimitiveType::Boolean),
                ContentVariable::variable_length(
                    "levels",
                    "level",
                    Container::List,
                    ContentVariable::primitive("level-item", "*", PrimitiveType::Float),
                ),
            ],
        )
    }

    #[test]
    fn test_marshal_attributes_and_repeated_lists() {
        let wire = XmlCodec
            .marshal(
                &json!({"id": "lamp-1", "on": true, "level": [10, 20.5]}),
                &lamp(),
            )
            .unwrap();
        assert_eq!(
            wire,
            r#"<lamp id="lamp-1"><on>true</on><level>10</level><level>20.5</level></lamp>"#
        );
    }

    #[test]
    fn test_unmarshal_is_schema_guided() {
        let value = XmlCodec
            .unmarshal(
                r#"<lamp id="lamp-2">
                    <on>false</on>
                    <level>1</level>
                    <level>2</level>
                    <ignored>x</ignored>
                </lamp>"#,
                &lamp(),
            )
            .unwrap();
        assert_eq!(value, json!({"id": "lamp-2", "on": false, "level": [1, 2]}));
    }

    #[test]
    fn test_root_list_wraps_items() {
        let schema = ContentVariable::variable_length(
            "r",
            "values",
            Container::List,
            ContentVariable::primitive("e", "*", PrimitiveType::Integer),
        );
        let wire = XmlCodec.marshal(&json!([1, 2]), &schema).unwrap();
        assert_eq!(wire, "<values><item>1</item><item>2</item></values>");
        assert_eq!(XmlCodec.unmarshal(&wire, &schema).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_wrong_root_element() {
        assert!(matches!(
            XmlCodec.unmarshal("<switch/>", &lamp()),
            Err(MarshallerError::Codec(_))
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        assert!(matches!(
            XmlCodec.marshal(&json!(3), &lamp()),
            Err(MarshallerError::TypeMismatch { .. })
        ));
    }
}
