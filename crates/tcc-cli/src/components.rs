//! Wires the reference [`Component`](tcc_core::component::Component)
//! plugins into a fresh [`ComponentRegistry`] for the CLI binary.
//!
//! A real deployment would register its own participant-specific
//! components here (or load them from a plugin mechanism); this binary
//! only ships the three reference plugins tcc-core provides.

use std::sync::Arc;

use sqlx::PgPool;
use tcc_core::component::{ComponentRegistry, DbComponent, HttpComponent, MqComponent};

/// Build a registry with `http`, `db`, and `mq` registered under those
/// ids. `db` and `mq` close over a clone of `pool`; `http` needs none.
pub fn build_registry(pool: PgPool) -> ComponentRegistry {
    let registry = ComponentRegistry::new();

    registry.must_register("http", Arc::new(|| Box::new(HttpComponent::new())));

    let db_pool = pool.clone();
    registry.must_register("db", Arc::new(move || Box::new(DbComponent::new(db_pool.clone()))));

    registry.must_register("mq", Arc::new(move || Box::new(MqComponent::new(pool.clone()))));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_registry_registers_all_reference_components() {
        let registry = build_registry(dummy_pool());
        assert_eq!(registry.list_ids(), vec!["db", "http", "mq"]);
    }

    /// A `PgPool` that is never connected to -- fine here since these
    /// tests only exercise registration, not `prepare`/`try_action`.
    fn dummy_pool() -> PgPool {
        PgPool::connect_lazy("postgresql://localhost:5432/tcc_unused_in_tests")
            .expect("lazy pool construction does not touch the network")
    }
}
