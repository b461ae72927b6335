//! Component registry -- a process-wide, concurrency-safe mapping from
//! component-type id to the factory that builds instances of it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

use super::Component;

/// Constructs a fresh, un-prepared [`Component`] instance.
pub type ComponentFactory = Arc<dyn Fn() -> Box<dyn Component> + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("component id must not be empty")]
    EmptyId,

    /// Registration is append-only: a second `register` for the same id
    /// is rejected rather than silently replacing the first factory.
    #[error("component type {0:?} is already registered")]
    DuplicateId(String),

    #[error("no component registered for type {0:?}")]
    UnknownComponent(String),

    #[error("prepare failed for component {id:?}: {source}")]
    PrepareFailed {
        id: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Process-wide mapping `component-type id -> factory`.
///
/// Registration is append-only and takes an exclusive lock; lookups
/// (`build`, `list_ids`) take only a shared lock and may run concurrently
/// with each other.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: RwLock<HashMap<String, ComponentFactory>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `id`. Fails if `id` is empty or already
    /// registered.
    pub fn register(
        &self,
        id: impl Into<String>,
        factory: ComponentFactory,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }

        let mut factories = self.factories.write().expect("registry lock poisoned");
        if factories.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }
        factories.insert(id, factory);
        Ok(())
    }

    /// Register a factory, panicking on failure. For startup wiring where
    /// a duplicate or empty id is a programming error.
    pub fn must_register(&self, id: impl Into<String>, factory: ComponentFactory) {
        let id = id.into();
        self.register(id.clone(), factory)
            .unwrap_or_else(|e| panic!("must_register({id:?}) failed: {e}"));
    }

    /// Construct a component for `id` and run its `prepare(cfg)`.
    /// `validate` is a separate step left to the caller (the phase
    /// orchestrator), matching the build/validate split in the engine's
    /// construction sequence.
    pub async fn build(
        &self,
        id: &str,
        cfg: &HashMap<String, Value>,
    ) -> Result<Box<dyn Component>, RegistryError> {
        let factory = {
            let factories = self.factories.read().expect("registry lock poisoned");
            factories
                .get(id)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownComponent(id.to_string()))?
        };

        let mut component = factory();
        component
            .prepare(cfg)
            .await
            .map_err(|source| RegistryError::PrepareFailed {
                id: id.to_string(),
                source,
            })?;

        Ok(component)
    }

    /// List every registered component-type id, sorted for deterministic
    /// output (e.g. `tcc component list`).
    pub fn list_ids(&self) -> Vec<String> {
        let factories = self.factories.read().expect("registry lock poisoned");
        let mut ids: Vec<String> = factories.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{TryRequest, TryResponse};
    use async_trait::async_trait;
    use uuid::Uuid;

    struct NoopComponent;

    #[async_trait]
    impl Component for NoopComponent {
        fn id(&self) -> &str {
            "noop"
        }

        async fn prepare(&mut self, _cfg: &HashMap<String, Value>) -> anyhow::Result<()> {
            Ok(())
        }

        async fn validate(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn try_action(&self, _req: &TryRequest) -> anyhow::Result<TryResponse> {
            Ok(TryResponse::ok(Value::Null))
        }

        async fn confirm(&self, _tx_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }

        async fn cancel(&self, _tx_id: Uuid) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn noop_factory() -> ComponentFactory {
        Arc::new(|| Box::new(NoopComponent))
    }

    #[test]
    fn register_rejects_empty_id() {
        let registry = ComponentRegistry::new();
        let err = registry.register("", noop_factory()).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyId));
    }

    #[test]
    fn register_rejects_duplicate() {
        let registry = ComponentRegistry::new();
        registry.register("noop", noop_factory()).unwrap();
        let err = registry.register("noop", noop_factory()).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(id) if id == "noop"));
    }

    #[tokio::test]
    async fn build_unknown_component_fails() {
        let registry = ComponentRegistry::new();
        let err = registry.build("missing", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownComponent(id) if id == "missing"));
    }

    #[tokio::test]
    async fn build_runs_prepare() {
        let registry = ComponentRegistry::new();
        registry.register("noop", noop_factory()).unwrap();
        let component = registry.build("noop", &HashMap::new()).await.unwrap();
        assert_eq!(component.id(), "noop");
    }

    #[test]
    fn list_ids_is_sorted() {
        let registry = ComponentRegistry::new();
        registry.register("zeta", noop_factory()).unwrap();
        registry.register("alpha", noop_factory()).unwrap();
        registry.register("mid", noop_factory()).unwrap();
        assert_eq!(registry.list_ids(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    #[should_panic(expected = "must_register")]
    fn must_register_panics_on_duplicate() {
        let registry = ComponentRegistry::new();
        registry.register("noop", noop_factory()).unwrap();
        registry.must_register("noop", noop_factory());
    }
}
