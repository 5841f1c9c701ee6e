//! End-to-end marshalling over the example registry.

use marshaller_codecs::CodecRegistry;
use marshaller_concepts::fixtures::{self, ids};
use marshaller_concepts::{ConceptRepository, InMemoryRegistry};
use marshaller_core::{
    Configurable, ConfigurableValue, Container, Content, ContentVariable, DeviceType,
    MarshallerError, MissingPathPolicy, PrimitiveType, Protocol, Service, XML_ATTRIBUTE,
};
use marshaller_mapping::{CastRegistry, Marshaller, MarshallingInput, ServicePaths, WireMap};
use serde_json::{json, Value};
use std::sync::Arc;

const PROTOCOL: &str = "example-protocol";
const BODY: &str = "seg-body";

fn protocol() -> Protocol {
    Protocol::new(PROTOCOL).with_segment(BODY, "body")
}

async fn marshaller() -> Marshaller {
    let repository = ConceptRepository::connect(&fixtures::registry()).await.unwrap();
    Marshaller::new(
        Arc::new(repository),
        Arc::new(CastRegistry::builtin().unwrap()),
        Arc::new(CodecRegistry::with_defaults()),
    )
}

fn color_node() -> ContentVariable {
    ContentVariable::structure(
        "color",
        "color",
        vec![
            ContentVariable::primitive("red", "red", PrimitiveType::Integer)
                .with_characteristic(ids::RGB_R),
            ContentVariable::primitive("green", "green", PrimitiveType::Integer)
                .with_characteristic(ids::RGB_G),
            ContentVariable::primitive("blue", "blue", PrimitiveType::Integer)
                .with_characteristic(ids::RGB_B),
        ],
    )
    .with_function(ids::SET_COLOR)
}

fn body(root: ContentVariable) -> Content {
    Content::new(root, "json", BODY)
}

fn color_service() -> Service {
    Service::new("set-color", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![color_node()],
    )))
}

fn level(name: &str) -> ContentVariable {
    ContentVariable::primitive(name, name, PrimitiveType::Float)
        .with_characteristic(ids::CELSIUS)
        .with_function(ids::GET_TEMPERATURE)
}

fn temperature_service() -> Service {
    Service::new("get-temperature", PROTOCOL).with_output(body(ContentVariable::structure(
        "root",
        "value",
        vec![
            level("level"),
            ContentVariable::primitive("unit", "unit", PrimitiveType::String)
                .with_value(json!("°C")),
        ],
    )))
}

/// Service whose only temperature is the `*` entry of a list.
fn history_service() -> Service {
    let root = ContentVariable::structure(
        "root",
        "value",
        vec![ContentVariable::variable_length(
            "history",
            "history",
            Container::List,
            level("*"),
        )],
    );
    Service::new("history", PROTOCOL)
        .with_input(body(root.clone()))
        .with_output(body(root))
}

fn wire(body: Value) -> WireMap {
    WireMap::from([("body".to_string(), body.to_string())])
}

fn assert_close(value: &Value, expected: f64) {
    let actual = value.as_f64().unwrap_or(f64::NAN);
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, value);
}

#[tokio::test]
async fn test_hex_is_marshalled_into_rgb_fields() {
    let marshaller = marshaller().await;
    let wire = marshaller
        .marshal_inputs(&protocol(), &color_service(), &json!("#ff0064"), ids::HEX, &[], &[])
        .unwrap();
    assert_eq!(wire["body"], r#"{"color":{"blue":100,"green":0,"red":255}}"#);
}

#[tokio::test]
async fn test_allow_list_leaves_other_fields_at_zero() {
    let marshaller = marshaller().await;
    let allow = vec!["value.color.red".to_string()];
    let wire = marshaller
        .marshal_inputs(&protocol(), &color_service(), &json!("#ff0064"), ids::HEX, &allow, &[])
        .unwrap();
    assert_eq!(wire["body"], r#"{"color":{"blue":0,"green":0,"red":255}}"#);
}

#[tokio::test]
async fn test_configurables_are_marshalled_alongside() {
    let marshaller = marshaller().await;
    let service = Service::new("set-color-level", PROTOCOL).with_input(body(
        ContentVariable::structure("root", "value", vec![color_node(), level("level")]),
    ));
    let configurable = Configurable {
        characteristic_id: ids::RGB.to_string(),
        values: vec![
            ConfigurableValue::new("r", "r", "1"),
            ConfigurableValue::new("g", "g", "2"),
            ConfigurableValue::new("b", "b", "3"),
        ],
    };
    let wire = marshaller
        .marshal_inputs(&protocol(), &service, &json!(20.5), ids::CELSIUS, &[], &[configurable])
        .unwrap();
    let sent: Value = serde_json::from_str(&wire["body"]).unwrap();
    assert_eq!(sent, json!({"color": {"red": 1, "green": 2, "blue": 3}, "level": 20.5}));
}

#[tokio::test]
async fn test_protocol_mismatch_is_rejected() {
    let marshaller = marshaller().await;
    let result = marshaller.marshal_inputs(
        &Protocol::new("other").with_segment(BODY, "body"),
        &color_service(),
        &json!("#ff0064"),
        ids::HEX,
        &[],
        &[],
    );
    assert!(matches!(result, Err(MarshallerError::Validation(_))));
}

#[tokio::test]
async fn test_unmarshal_celsius_as_kelvin() {
    let marshaller = marshaller().await;
    let value = marshaller
        .unmarshal_outputs(
            &protocol(),
            &temperature_service(),
            &wire(json!({"level": 21, "unit": "°C"})),
            ids::KELVIN,
            &[],
            &[],
        )
        .unwrap();
    assert_close(&value, 294.15);
}

#[tokio::test]
async fn test_hints_pick_between_matching_outputs() {
    let marshaller = marshaller().await;
    let service = Service::new("two-levels", PROTOCOL).with_output(body(ContentVariable::structure(
        "root",
        "value",
        vec![level("inside"), level("outside")],
    )));
    let body = wire(json!({"inside": 21, "outside": 4}));

    let first = marshaller
        .unmarshal_outputs(&protocol(), &service, &body, ids::CELSIUS, &[], &[])
        .unwrap();
    assert_eq!(first, json!(21));

    let hinted = marshaller
        .unmarshal_outputs(
            &protocol(),
            &service,
            &body,
            ids::CELSIUS,
            &[],
            &["value.outside".to_string()],
        )
        .unwrap();
    assert_eq!(hinted, json!(4));
}

#[tokio::test]
async fn test_unmarshal_reads_first_list_entry() {
    let marshaller = marshaller().await;
    let body = wire(json!({"history": [21.0, 22.0]}));

    let kelvin = marshaller
        .unmarshal_outputs(&protocol(), &history_service(), &body, ids::KELVIN, &[], &[])
        .unwrap();
    assert_close(&kelvin, 294.15);

    let celsius = marshaller
        .unmarshal_outputs(&protocol(), &history_service(), &body, ids::CELSIUS, &[], &[])
        .unwrap();
    assert_eq!(celsius, json!(21));

    let allow = vec!["value.history.*".to_string()];
    let allowed = marshaller
        .unmarshal_outputs(&protocol(), &history_service(), &body, ids::CELSIUS, &allow, &[])
        .unwrap();
    assert_eq!(allowed, json!(21));
}

#[tokio::test]
async fn test_unmarshal_empty_list_is_not_found() {
    let marshaller = marshaller().await;
    let result = marshaller.unmarshal_outputs(
        &protocol(),
        &history_service(),
        &wire(json!({"history": []})),
        ids::CELSIUS,
        &[],
        &[],
    );
    assert!(matches!(result, Err(MarshallerError::NotFound { .. })));
}

#[tokio::test]
async fn test_marshal_into_single_list_entry() {
    let marshaller = marshaller().await;
    let wire = marshaller
        .marshal_inputs(&protocol(), &history_service(), &json!(21.0), ids::CELSIUS, &[], &[])
        .unwrap();
    assert_eq!(wire["body"], r#"{"history":[21]}"#);
}

#[tokio::test]
async fn test_marshal_into_unbound_map_is_rejected() {
    let marshaller = marshaller().await;
    let service = Service::new("rooms", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![ContentVariable::variable_length(
            "rooms",
            "rooms",
            Container::Map,
            level("*"),
        )],
    )));
    let result =
        marshaller.marshal_inputs(&protocol(), &service, &json!(21.0), ids::CELSIUS, &[], &[]);
    assert!(matches!(result, Err(MarshallerError::Validation(_))));
}

#[tokio::test]
async fn test_unmarshal_wrong_wire_type() {
    let marshaller = marshaller().await;
    let result = marshaller.unmarshal_outputs(
        &protocol(),
        &temperature_service(),
        &wire(json!({"level": "warm", "unit": "°C"})),
        ids::KELVIN,
        &[],
        &[],
    );
    assert_eq!(
        result,
        Err(MarshallerError::TypeMismatch {
            path: "value.level".to_string(),
            expected: "float".to_string(),
            actual: "string".to_string(),
        })
    );
}

#[tokio::test]
async fn test_unmarshal_reads_whole_nested_color() {
    let marshaller = marshaller().await;
    let channel = |name: &str, id: &str| {
        ContentVariable::primitive(name, name, PrimitiveType::Integer).with_characteristic(id)
    };
    let nested = |name: &str, inner: ContentVariable| {
        ContentVariable::structure(name, name, vec![inner])
    };
    let service = Service::new("get-color", PROTOCOL).with_output(body(ContentVariable::structure(
        "root",
        "value",
        vec![ContentVariable::structure(
            "a",
            "a",
            vec![
                nested("b", channel("red", ids::RGB_R)),
                nested("c", channel("green", ids::RGB_G)),
            ],
        )],
    )));
    let value = marshaller
        .unmarshal_outputs(
            &protocol(),
            &service,
            &wire(json!({"a": {"b": {"red": 255}, "c": {"green": 16}}})),
            ids::HEX,
            &[],
            &[],
        )
        .unwrap();
    assert_eq!(value, json!("#ff1000"));
}

#[tokio::test]
async fn test_xml_attribute_through_marshaller() {
    let marshaller = marshaller().await;
    let root = ContentVariable::structure(
        "root",
        "value",
        vec![
            ContentVariable::primitive("unit", "unit", PrimitiveType::String)
                .with_value(json!("C"))
                .with_serialization_option(XML_ATTRIBUTE),
            level("level"),
        ],
    );
    let service = Service::new("xml-temperature", PROTOCOL)
        .with_input(Content::new(root.clone(), "xml", BODY))
        .with_output(Content::new(root, "xml", BODY));

    let sent = marshaller
        .marshal_inputs(&protocol(), &service, &json!(21.0), ids::CELSIUS, &[], &[])
        .unwrap();
    assert_eq!(sent["body"], r#"<value unit="C"><level>21</level></value>"#);

    let kelvin = marshaller
        .unmarshal_outputs(&protocol(), &service, &sent, ids::KELVIN, &[], &[])
        .unwrap();
    assert_close(&kelvin, 294.15);
}

#[tokio::test]
async fn test_unmarshal_without_matching_output() {
    let marshaller = marshaller().await;
    let result = marshaller.unmarshal_outputs(
        &protocol(),
        &temperature_service(),
        &wire(json!({"level": 21})),
        ids::HEX,
        &[],
        &[],
    );
    assert!(matches!(result, Err(MarshallerError::NotFound { .. })));
}

#[tokio::test]
async fn test_marshal_v2_by_function() {
    let marshaller = marshaller().await;
    let input = MarshallingInput::for_function(json!("#ff0064"), ids::HEX, ids::SET_COLOR);
    let wire = marshaller.marshal_v2(&protocol(), &color_service(), &[input]).unwrap();
    assert_eq!(wire["body"], r#"{"color":{"blue":100,"green":0,"red":255}}"#);
}

#[tokio::test]
async fn test_marshal_v2_by_path() {
    let marshaller = marshaller().await;
    let paths = vec!["value.color.green".to_string()];
    let input = MarshallingInput::at_paths(json!("#ff0064"), ids::HEX, paths);
    let wire = marshaller.marshal_v2(&protocol(), &color_service(), &[input]).unwrap();
    assert_eq!(wire["body"], r#"{"color":{"blue":0,"green":0,"red":0}}"#);

    let paths = vec!["value.color.red".to_string()];
    let input = MarshallingInput::at_paths(json!("#ff0064"), ids::HEX, paths);
    let wire = marshaller.marshal_v2(&protocol(), &color_service(), &[input]).unwrap();
    assert_eq!(wire["body"], r#"{"color":{"blue":0,"green":0,"red":255}}"#);
}

#[tokio::test]
async fn test_marshal_v2_by_aspect() {
    let marshaller = marshaller().await;
    let tagged = |name: &str, aspect: &str| level(name).with_aspect(aspect);
    let service = Service::new("climate", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![
            tagged("inside", ids::INSIDE_AIR),
            tagged("server_room", ids::SERVER_ROOM_AIR),
            tagged("outside", ids::OUTSIDE_AIR),
        ],
    )));
    let input = MarshallingInput::for_function(json!(21.0), ids::CELSIUS, ids::GET_TEMPERATURE)
        .with_aspect(ids::INSIDE_AIR);
    let wire = marshaller.marshal_v2(&protocol(), &service, &[input]).unwrap();
    let sent: Value = serde_json::from_str(&wire["body"]).unwrap();
    assert_eq!(sent, json!({"inside": 21, "server_room": 21, "outside": 0}));
}

#[tokio::test]
async fn test_marshal_v2_unknown_function_is_reported() {
    let marshaller = marshaller().await;
    let service = Service::new("set-level", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![level("level").with_function("unknown-function")],
    )));
    let paths = vec!["value.level".to_string()];
    let input = MarshallingInput::at_paths(json!(21.0), ids::CELSIUS, paths);
    assert!(matches!(
        marshaller.marshal_v2(&protocol(), &service, &[input]),
        Err(MarshallerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_marshal_v2_needs_an_address() {
    let marshaller = marshaller().await;
    let input = MarshallingInput {
        value: json!(1),
        characteristic_id: None,
        paths: Vec::new(),
        function_id: None,
        aspect_node_id: None,
    };
    assert!(matches!(
        marshaller.marshal_v2(&protocol(), &color_service(), &[input]),
        Err(MarshallerError::Validation(_))
    ));

    let input = MarshallingInput::at_paths(json!(1), ids::RGB_R, vec!["value.missing".to_string()]);
    assert!(matches!(
        marshaller.marshal_v2(&protocol(), &color_service(), &[input]),
        Err(MarshallerError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unmarshal_v2_uses_extension_chain() {
    let marshaller = marshaller().await;
    let value = marshaller
        .unmarshal_v2(
            &protocol(),
            &temperature_service(),
            Some(ids::KELVIN),
            "value.level",
            &wire(json!({"level": 21, "unit": "°C"})),
        )
        .unwrap();
    assert_close(&value, 294.15);
}

#[tokio::test]
async fn test_unmarshal_v2_list_entries() {
    let marshaller = marshaller().await;
    let service = Service::new("history", PROTOCOL).with_output(body(ContentVariable::structure(
        "root",
        "value",
        vec![ContentVariable::variable_length(
            "list",
            "list",
            Container::List,
            ContentVariable::primitive("item", "*", PrimitiveType::Integer),
        )],
    )));
    let items = [7, 8, 9, 10];
    let body = wire(json!({ "list": items }));

    for (i, expected) in items.iter().enumerate() {
        let value = marshaller
            .unmarshal_v2(&protocol(), &service, None, &format!("value.list.{}", i), &body)
            .unwrap();
        assert_eq!(value, json!(expected));
    }
    let first = marshaller
        .unmarshal_v2(&protocol(), &service, None, "value.list.*", &body)
        .unwrap();
    assert_eq!(first, json!(7));
}

#[tokio::test]
async fn test_missing_path_policy() {
    let body = wire(json!({"level": 21}));

    let strict = marshaller().await;
    assert!(matches!(
        strict.unmarshal_v2(&protocol(), &temperature_service(), None, "value.humidity", &body),
        Err(MarshallerError::NotFound { .. })
    ));

    let lenient = marshaller().await.with_missing_path(MissingPathPolicy::Null);
    assert_eq!(
        lenient
            .unmarshal_v2(&protocol(), &temperature_service(), None, "value.humidity", &body)
            .unwrap(),
        Value::Null
    );
}

#[tokio::test]
async fn test_configurables_shared_by_all_services() {
    let marshaller = marshaller().await;
    let with_level = Service::new("a", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![color_node(), level("level")],
    )));
    let color_only = Service::new("b", PROTOCOL).with_input(body(ContentVariable::structure(
        "root",
        "value",
        vec![color_node()],
    )));

    let configurables = marshaller
        .find_configurables(ids::CELSIUS, &[with_level, color_only])
        .unwrap();
    assert_eq!(
        configurables,
        vec![Configurable {
            characteristic_id: ids::RGB.to_string(),
            values: vec![
                ConfigurableValue::new("r", "r", "0"),
                ConfigurableValue::new("g", "g", "0"),
                ConfigurableValue::new("b", "b", "0"),
            ],
        }]
    );
}

#[tokio::test]
async fn test_path_options_ranked_by_aspect() {
    let marshaller = marshaller().await;
    let tagged = |name: &str, aspect: &str| level(name).with_aspect(aspect);
    let service = Service::new("climate", PROTOCOL).with_output(body(ContentVariable::structure(
        "root",
        "value",
        vec![
            tagged("server_room", ids::SERVER_ROOM_AIR),
            tagged("outside", ids::OUTSIDE_AIR),
            tagged("air", ids::AIR),
            tagged("lamp", ids::LIGHTING),
        ],
    )));
    let client = InMemoryRegistry::new().with_device_type(DeviceType {
        id: "thermometer".to_string(),
        name: "Thermometer".to_string(),
        services: vec![service],
    });

    let options = marshaller
        .get_path_options(
            &client,
            &["thermometer".to_string()],
            ids::GET_TEMPERATURE,
            Some(ids::AIR),
            &[],
            false,
        )
        .await
        .unwrap();
    assert_eq!(
        options["thermometer"],
        vec![ServicePaths {
            service_id: "climate".to_string(),
            paths: vec!["air".to_string(), "outside".to_string(), "server_room".to_string()],
        }]
    );

    let filtered = marshaller
        .get_path_options(
            &client,
            &["thermometer".to_string()],
            ids::GET_TEMPERATURE,
            None,
            &[ids::KELVIN.to_string()],
            true,
        )
        .await
        .unwrap();
    assert!(filtered["thermometer"].is_empty());
}
