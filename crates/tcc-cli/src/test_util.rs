//! Test-only helpers shared across `tcc-cli`'s unit tests.

use std::sync::{Mutex, MutexGuard};

/// Tests that mutate process environment variables (`TCC_DATABASE_URL`,
/// `XDG_CONFIG_HOME`, ...) run under this lock so they don't race each
/// other across threads within the same test binary.
static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
