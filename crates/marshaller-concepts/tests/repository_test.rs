//! Concept repository loading, lookups and refresh.

use async_trait::async_trait;
use marshaller_concepts::fixtures::{self, ids};
use marshaller_concepts::{ConceptRepository, InMemoryRegistry, RegistryClient};
use marshaller_core::config::RefreshConfig;
use marshaller_core::{
    AspectNode, Characteristic, Concept, DeviceType, Function, MarshallerError, Protocol, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Registry whose content can be replaced or made unavailable mid-test.
struct SwitchableRegistry {
    inner: Mutex<Option<InMemoryRegistry>>,
}

impl SwitchableRegistry {
    fn new(registry: InMemoryRegistry) -> Self {
        Self {
            inner: Mutex::new(Some(registry)),
        }
    }

    fn set(&self, registry: Option<InMemoryRegistry>) {
        *self.inner.lock() = registry;
    }

    fn current(&self) -> Result<InMemoryRegistry> {
        self.inner
            .lock()
            .clone()
            .ok_or_else(|| MarshallerError::Registry("connection refused".to_string()))
    }
}

#[async_trait]
impl RegistryClient for SwitchableRegistry {
    async fn list_concept_ids(&self) -> Result<Vec<String>> {
        self.current()?.list_concept_ids().await
    }

    async fn fetch_concept(&self, id: &str) -> Result<Concept> {
        self.current()?.fetch_concept(id).await
    }

    async fn fetch_characteristic(&self, id: &str) -> Result<Characteristic> {
        self.current()?.fetch_characteristic(id).await
    }

    async fn list_functions(&self) -> Result<Vec<Function>> {
        self.current()?.list_functions().await
    }

    async fn list_aspect_nodes(&self) -> Result<Vec<AspectNode>> {
        self.current()?.list_aspect_nodes().await
    }

    async fn fetch_device_type(&self, id: &str) -> Result<DeviceType> {
        self.current()?.fetch_device_type(id).await
    }

    async fn fetch_protocol(&self, id: &str) -> Result<Protocol> {
        self.current()?.fetch_protocol(id).await
    }
}

#[tokio::test]
async fn test_every_loaded_characteristic_has_its_concept() {
    let registry = fixtures::registry();
    let repository = ConceptRepository::connect(&registry).await.unwrap();

    for concept in fixtures::concepts() {
        for root_id in &concept.characteristic_ids {
            let root = repository.get_characteristic(root_id).unwrap();
            let mut ids = vec![root.id.clone()];
            ids.extend(root.descendants().into_iter().map(|c| c.id.clone()));
            for id in ids {
                let owner = repository.get_concept_of_characteristic(&id).unwrap();
                assert_eq!(owner.id, concept.id, "characteristic {}", id);
            }
        }
    }
}

#[tokio::test]
async fn test_nested_characteristic_lookups() {
    let repository = ConceptRepository::connect(&fixtures::registry()).await.unwrap();

    let green = repository.get_characteristic(ids::RGB_G).unwrap();
    assert_eq!(green.name, "g");
    assert_eq!(repository.get_root_characteristic_id(ids::RGB_G).unwrap(), ids::RGB);

    let roots = repository
        .get_root_characteristics(&[
            ids::RGB_R.to_string(),
            ids::CELSIUS.to_string(),
            ids::RGB_B.to_string(),
        ])
        .unwrap();
    let root_ids: Vec<&str> = roots.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(root_ids, vec![ids::RGB, ids::CELSIUS]);
}

#[tokio::test]
async fn test_characteristics_of_function() {
    let repository = ConceptRepository::connect(&fixtures::registry()).await.unwrap();
    let characteristics = repository
        .get_characteristics_of_function(ids::GET_TEMPERATURE)
        .unwrap();
    let names: Vec<&str> = characteristics.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["celsius", "kelvin", "fahrenheit"]);
    assert!(repository.get_function(ids::SET_COLOR).unwrap().is_controlling());
    assert_eq!(
        repository.get_aspect_node(ids::INSIDE_AIR).unwrap().parent_id,
        ids::AIR
    );
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let repository = ConceptRepository::connect(&fixtures::registry()).await.unwrap();
    assert!(matches!(
        repository.get_characteristic("urn:unknown"),
        Err(MarshallerError::NotFound { kind: "characteristic", .. })
    ));
    assert!(repository.get_concept("urn:unknown").unwrap_err().is_not_found());
    assert!(repository.get_concept_of_characteristic("urn:unknown").is_err());
    assert!(repository.get_root_characteristics(&["urn:unknown".to_string()]).is_err());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_snapshot() {
    let client = SwitchableRegistry::new(fixtures::registry());
    let repository = ConceptRepository::connect(&client).await.unwrap();
    let before = repository.stats();

    client.set(None);
    let result = repository.load(&client).await;
    assert!(matches!(result, Err(MarshallerError::Registry(_))));
    assert_eq!(repository.stats(), before);
    assert!(repository.get_characteristic(ids::KELVIN).is_ok());
}

#[tokio::test]
async fn test_refresh_task_swaps_snapshot() {
    let client = Arc::new(SwitchableRegistry::new(fixtures::registry()));
    let repository = Arc::new(ConceptRepository::connect(client.as_ref()).await.unwrap());

    let smaller = InMemoryRegistry::new()
        .with_concept(Concept::new("only", "only").with_base("only-char"))
        .with_characteristic(Characteristic::primitive(
            "only-char",
            "only",
            marshaller_core::PrimitiveType::String,
        ));
    client.set(Some(smaller));

    let handle = repository.spawn_refresh(
        client.clone(),
        RefreshConfig {
            interval_secs: 1,
            jitter_secs: 0,
        },
    );
    tokio::time::sleep(Duration::from_millis(1500)).await;
    handle.abort();

    assert_eq!(repository.stats().concepts, 1);
    assert!(repository.get_characteristic(ids::CELSIUS).is_err());
    assert!(repository.get_characteristic("only-char").is_ok());
}
