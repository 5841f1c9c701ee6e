//! Example registry content: temperature, color and on/off concepts.
//!
//! Concept and characteristic ids are the [`builtin`](crate::builtin) ones,
//! so the in-process casts apply. Tests in every crate and the CLI's offline
//! mode agree on one registry.

use marshaller_core::{
    AspectNode, Characteristic, Concept, ConverterExtension, Function, PrimitiveType,
};

use crate::memory::InMemoryRegistry;

pub mod ids {
    pub use crate::builtin::ids::*;

    pub const GET_TEMPERATURE: &str = "example-get-temperature";
    pub const GET_COLOR: &str = "example-get-color";
    pub const GET_ON_OFF_STATE: &str = "example-get-on-off-state";
    pub const SET_COLOR: &str = "example-set-color";
    pub const SET_ON_OFF: &str = "example-set-on-off";

    pub const AIR: &str = "example-air";
    pub const INSIDE_AIR: &str = "example-inside-air";
    pub const SERVER_ROOM_AIR: &str = "example-server-room-air";
    pub const OUTSIDE_AIR: &str = "example-outside-air";
    pub const LIGHTING: &str = "example-lighting";
}

pub fn concepts() -> Vec<Concept> {
    vec![
        Concept::new(ids::TEMPERATURE, "temperature")
            .with_base(ids::CELSIUS)
            .with_characteristic(ids::KELVIN)
            .with_characteristic(ids::FAHRENHEIT)
            .with_conversion(ConverterExtension::new(ids::CELSIUS, ids::KELVIN, "x + 273.15", 1))
            .with_conversion(ConverterExtension::new(ids::KELVIN, ids::CELSIUS, "x - 273.15", 1)),
        Concept::new(ids::COLOR, "color")
            .with_base(ids::RGB)
            .with_characteristic(ids::HEX),
        Concept::new(ids::ON_OFF, "on/off")
            .with_base(ids::BOOLEAN)
            .with_characteristic(ids::BINARY_STATE)
            .with_characteristic(ids::BINARY_CODE),
    ]
}

pub fn characteristics() -> Vec<Characteristic> {
    vec![
        Characteristic::primitive(ids::CELSIUS, "celsius", PrimitiveType::Float)
            .with_display_unit("°C"),
        Characteristic::primitive(ids::KELVIN, "kelvin", PrimitiveType::Float)
            .with_display_unit("K"),
        Characteristic::primitive(ids::FAHRENHEIT, "fahrenheit", PrimitiveType::Float)
            .with_display_unit("°F"),
        Characteristic::structure(
            ids::RGB,
            "rgb",
            vec![
                Characteristic::primitive(ids::RGB_R, "r", PrimitiveType::Integer),
                Characteristic::primitive(ids::RGB_G, "g", PrimitiveType::Integer),
                Characteristic::primitive(ids::RGB_B, "b", PrimitiveType::Integer),
            ],
        ),
        Characteristic::primitive(ids::HEX, "hex", PrimitiveType::String),
        Characteristic::primitive(ids::BOOLEAN, "boolean", PrimitiveType::Boolean),
        Characteristic::primitive(ids::BINARY_STATE, "binary state", PrimitiveType::String),
        Characteristic::primitive(ids::BINARY_CODE, "binary code", PrimitiveType::Integer),
    ]
}

pub fn functions() -> Vec<Function> {
    vec![
        Function::measuring(ids::GET_TEMPERATURE, "getTemperature", ids::TEMPERATURE),
        Function::measuring(ids::GET_COLOR, "getColor", ids::COLOR),
        Function::measuring(ids::GET_ON_OFF_STATE, "getOnOffState", ids::ON_OFF),
        Function::controlling(ids::SET_COLOR, "setColor", ids::COLOR),
        Function::controlling(ids::SET_ON_OFF, "setOnOff", ids::ON_OFF),
    ]
}

/// air > {inside air > server room air, outside air}; lighting stands alone.
pub fn aspect_nodes() -> Vec<AspectNode> {
    let aspect = |id: &str, name: &str, root: &str, parent: &str| AspectNode {
        name: name.to_string(),
        root_id: root.to_string(),
        parent_id: parent.to_string(),
        ..AspectNode::new(id)
    };
    vec![
        AspectNode {
            child_ids: vec![ids::INSIDE_AIR.into(), ids::OUTSIDE_AIR.into()],
            descendent_ids: vec![
                ids::INSIDE_AIR.into(),
                ids::OUTSIDE_AIR.into(),
                ids::SERVER_ROOM_AIR.into(),
            ],
            ..aspect(ids::AIR, "air", ids::AIR, "")
        },
        AspectNode {
            child_ids: vec![ids::SERVER_ROOM_AIR.into()],
            descendent_ids: vec![ids::SERVER_ROOM_AIR.into()],
            ancestor_ids: vec![ids::AIR.into()],
            ..aspect(ids::INSIDE_AIR, "inside air", ids::AIR, ids::AIR)
        },
        AspectNode {
            ancestor_ids: vec![ids::INSIDE_AIR.into(), ids::AIR.into()],
            ..aspect(ids::SERVER_ROOM_AIR, "server room air", ids::AIR, ids::INSIDE_AIR)
        },
        AspectNode {
            ancestor_ids: vec![ids::AIR.into()],
            ..aspect(ids::OUTSIDE_AIR, "outside air", ids::AIR, ids::AIR)
        },
        aspect(ids::LIGHTING, "lighting", ids::LIGHTING, ""),
    ]
}

/// Registry holding every example entity.
pub fn registry() -> InMemoryRegistry {
    InMemoryRegistry {
        concepts: concepts(),
        characteristics: characteristics(),
        functions: functions(),
        aspect_nodes: aspect_nodes(),
        ..InMemoryRegistry::default()
    }
}
