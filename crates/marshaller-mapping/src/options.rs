//! Path options: which content paths of which services can serve a function.

use marshaller_concepts::RegistryClient;
use marshaller_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::marshal::Marshaller;
use crate::paths::{aspect_distances, paths_for, sort_by_aspect_distance, strip_envelope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePaths {
    pub service_id: String,
    pub paths: Vec<String>,
}

impl Marshaller {
    /// Candidate paths per device type and service for `function_id`.
    ///
    /// Controlling functions are looked up in service inputs, all others in
    /// outputs. With an aspect, paths are ordered by aspect tree distance.
    /// A non-empty `characteristic_filter` keeps paths whose characteristic,
    /// or its root, is listed. Without the envelope the root name is dropped
    /// and the root path itself is skipped.
    pub async fn get_path_options(
        &self,
        client: &dyn RegistryClient,
        device_type_ids: &[String],
        function_id: &str,
        aspect_id: Option<&str>,
        characteristic_filter: &[String],
        with_envelope: bool,
    ) -> Result<BTreeMap<String, Vec<ServicePaths>>> {
        let repository = self.repository();
        let controlling = repository.get_function(function_id)?.is_controlling();
        let aspect = aspect_id.map(|id| repository.get_aspect_node(id)).transpose()?;
        let distances = aspect
            .as_deref()
            .map(|a| aspect_distances(a, |id| repository.get_aspect_node(id).ok()));

        let mut options = BTreeMap::new();
        for device_type_id in device_type_ids {
            let device_type = client.fetch_device_type(device_type_id).await?;
            let mut services = Vec::new();
            for service in &device_type.services {
                let contents = if controlling { &service.inputs } else { &service.outputs };
                let mut matches = paths_for(contents, Some(function_id), aspect.as_deref());
                if let Some(distances) = &distances {
                    sort_by_aspect_distance(distances, &mut matches);
                }

                let mut paths = Vec::new();
                for m in matches {
                    if !characteristic_filter.is_empty() {
                        let Some(id) = m.node.characteristic_id.as_deref() else {
                            continue;
                        };
                        let root = repository.get_root_characteristic_id(id)?;
                        if !characteristic_filter.iter().any(|f| f == id || *f == root) {
                            continue;
                        }
                    }
                    let path = if with_envelope {
                        m.path.as_str()
                    } else {
                        strip_envelope(&m.path)
                    };
                    if path.is_empty() {
                        continue;
                    }
                    paths.push(path.to_string());
                }
                if !paths.is_empty() {
                    services.push(ServicePaths {
                        service_id: service.id.clone(),
                        paths,
                    });
                }
            }
            debug!(
                category = "options",
                device_type_id = %device_type_id,
                services = services.len(),
                "Resolved path options"
            );
            options.insert(device_type_id.clone(), services);
        }
        Ok(options)
    }
}
