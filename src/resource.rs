// System
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// Third Party
use clap::ValueEnum;
use k8s_openapi::{
    api::core::v1::{ConfigMap, Event},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
    NamespaceResourceScope,
};
use kube::Resource;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};

/// Key used for the Event reason and the ConfigMap data entry of every generated object.
pub const LOAD_TEST_KEY: &str = "CPburnerTest";

/// Prefix shared by every object name this tool generates.
pub const COMMON_PREFIX: &str = "evt";

/// Published into every namespace by the root CA publisher, which recreates it as soon as it is
/// deleted.
pub const ROOT_CA_CONFIG_MAP: &str = "kube-root-ca.crt";

/// 24k payload for each generated object.
pub const DEFAULT_PAYLOAD_SIZE: usize = 24 * 1024;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    #[value(name = "event")]
    Event,
    #[value(name = "configmap")]
    ConfigMap,
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ResourceKind::Event => "event",
            ResourceKind::ConfigMap => "configmap",
        }
    }
}

/// A namespaced Kubernetes object the driver can create, list and delete in bulk.
pub trait ChurnResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Build an object carrying `payload`, named `name`.
    fn generate(name: &str, payload: &str) -> Self;

    /// Objects owned by the cluster itself, which cleanup must not delete.
    fn is_protected(&self) -> bool {
        false
    }
}

impl ChurnResource for Event {
    fn generate(name: &str, payload: &str) -> Self {
        Event {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            reason: Some(LOAD_TEST_KEY.to_string()),
            message: Some(payload.to_string()),
            ..Default::default()
        }
    }
}

impl ChurnResource for ConfigMap {
    fn generate(name: &str, payload: &str) -> Self {
        let mut data = BTreeMap::new();
        data.insert(LOAD_TEST_KEY.to_string(), payload.to_string());
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        }
    }

    fn is_protected(&self) -> bool {
        self.metadata.name.as_deref() == Some(ROOT_CA_CONFIG_MAP)
    }
}

/// The objects a `create` run generates.
#[derive(Debug, Clone)]
pub struct Batch {
    pub resource_count: usize,
    pub name_prefix: String,
    pub payload: Arc<str>,
}

impl Batch {
    pub fn new(resource_count: usize, payload_size: usize) -> Self {
        let mut rng = rand::thread_rng();
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self {
            resource_count,
            name_prefix: name_prefix(unix_secs, &mut rng),
            payload: random_letters(payload_size, &mut rng).into(),
        }
    }

    /// Name prefix for the objects created by worker `worker`.
    pub fn worker_prefix(&self, worker: usize) -> String {
        format!("{}-{}", self.name_prefix, worker)
    }
}

/// `evt-<unix seconds>-<0..9999>`, unique enough to keep concurrent runs apart.
pub fn name_prefix(unix_secs: u64, rng: &mut impl Rng) -> String {
    format!("{}-{}-{}", COMMON_PREFIX, unix_secs, rng.gen_range(0..9999))
}

pub fn random_letters(len: usize, rng: &mut impl Rng) -> String {
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    // Third Party
    use k8s_openapi::api::core::v1::{ConfigMap, Event};
    use kube::ResourceExt;
    use rand::rngs::mock::StepRng;

    // Local
    use super::*;

    #[test]
    fn test_event_carries_payload_in_message() {
        let event = Event::generate("evt-1-2-0-0", "payload");
        assert_eq!(event.name_any(), "evt-1-2-0-0");
        assert_eq!(event.reason.as_deref(), Some(LOAD_TEST_KEY));
        assert_eq!(event.message.as_deref(), Some("payload"));
        assert!(event.metadata.namespace.is_none());
    }

    #[test]
    fn test_config_map_carries_payload_in_data() {
        let config_map = ConfigMap::generate("evt-1-2-0-0", "payload");
        assert_eq!(config_map.name_any(), "evt-1-2-0-0");
        let data = config_map.data.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[LOAD_TEST_KEY], "payload");
    }

    #[test]
    fn test_only_root_ca_is_protected() {
        assert!(ConfigMap::generate(ROOT_CA_CONFIG_MAP, "").is_protected());
        assert!(!ConfigMap::generate("evt-1-2-0-0", "").is_protected());
        assert!(!Event::generate(ROOT_CA_CONFIG_MAP, "").is_protected());
    }

    #[test]
    fn test_name_prefix_format() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(name_prefix(1700000000, &mut rng), "evt-1700000000-0");

        let prefix = name_prefix(42, &mut rand::thread_rng());
        let parts: Vec<&str> = prefix.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], COMMON_PREFIX);
        assert_eq!(parts[1], "42");
        assert!(parts[2].parse::<u32>().unwrap() < 9999);
    }

    #[test]
    fn test_random_letters() {
        let payload = random_letters(DEFAULT_PAYLOAD_SIZE, &mut rand::thread_rng());
        assert_eq!(payload.len(), DEFAULT_PAYLOAD_SIZE);
        assert!(payload.bytes().all(|b| b.is_ascii_alphabetic()));
        assert!(random_letters(0, &mut rand::thread_rng()).is_empty());
    }

    #[test]
    fn test_batch_worker_prefix() {
        let batch = Batch::new(10, 16);
        assert_eq!(batch.payload.len(), 16);
        assert!(batch.name_prefix.starts_with("evt-"));
        assert_eq!(
            batch.worker_prefix(7),
            format!("{}-7", batch.name_prefix)
        );
    }

    #[test]
    fn test_resource_kind_values() {
        assert_eq!(
            ResourceKind::from_str("configmap", false).unwrap(),
            ResourceKind::ConfigMap
        );
        assert_eq!(
            ResourceKind::from_str("event", false).unwrap(),
            ResourceKind::Event
        );
        assert!(ResourceKind::from_str("pod", false).is_err());
        assert_eq!(ResourceKind::ConfigMap.name(), "configmap");
    }
}
