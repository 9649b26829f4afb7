//! Load coordinator: the only path through which the resident slot changes.
//!
//! Two guarantees:
//!
//! - Concurrent requests for the same unloaded pair share one instantiation.
//!   The first caller spawns the load and publishes it as a shared future;
//!   later callers await that same future and receive the same result, success
//!   or failure. The entry is removed as soon as the load settles, so a failed
//!   load can be retried by the next caller.
//! - Slot transitions are serialized. Installs run under the write half of an
//!   `RwLock`; translations hold the read half through an [`EngineLease`], so an
//!   engine is never destroyed while a call on it is in flight.
//!
//! Requests for different pairs take turns evicting each other. That thrashing
//! is the cost of the single-slot memory budget; it is counted as evictions in
//! [`EngineMetrics`].

use crate::engine::EngineRuntime;
use crate::error::TranslateError;
use crate::metrics::EngineMetrics;
use crate::registry::ModelRegistry;
use crate::slot::{ResidentEngine, ResidentSlot};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::debug;

/// Shared access to the resident engine for one pair.
///
/// While any lease is alive the engine cannot be evicted, so a lease must be
/// dropped before acquiring an engine for a different pair.
#[derive(Clone)]
pub struct EngineLease {
    engine: Arc<OwnedRwLockReadGuard<ResidentSlot, ResidentEngine>>,
}

impl Deref for EngineLease {
    type Target = ResidentEngine;

    fn deref(&self) -> &ResidentEngine {
        &self.engine
    }
}

impl EngineLease {
    /// Translate on a blocking thread.
    ///
    /// A clone of the lease moves into the blocking task, so the engine stays
    /// pinned until the native call returns even if the caller stops waiting.
    pub async fn translate(&self, text: &str) -> Result<String, TranslateError> {
        let lease = self.clone();
        let input = text.to_string();

        tokio::task::spawn_blocking(move || lease.translate_blocking(&input))
            .await
            .map_err(|e| TranslateError::EngineRuntime {
                key: self.key().to_string(),
                reason: format!("translation task failed: {}", e),
            })?
    }
}

impl std::fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EngineLease").field(&self.key()).finish()
    }
}

type LoadResult = Result<EngineLease, TranslateError>;
type PendingLoad = Shared<BoxFuture<'static, LoadResult>>;
type PendingLoads = Arc<Mutex<HashMap<String, PendingLoad>>>;

pub struct LoadCoordinator {
    registry: Arc<ModelRegistry>,
    slot: Arc<RwLock<ResidentSlot>>,
    pending: PendingLoads,
    metrics: Arc<EngineMetrics>,
}

impl LoadCoordinator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        runtime: Arc<dyn EngineRuntime>,
        load_timeout: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let slot = ResidentSlot::new(runtime, load_timeout, Arc::clone(&metrics));
        Self {
            registry,
            slot: Arc::new(RwLock::new(slot)),
            pending: Arc::new(Mutex::new(HashMap::new())),
            metrics,
        }
    }

    /// Get the engine for `key`, loading it (and evicting whatever is
    /// resident) if necessary.
    pub async fn acquire(&self, key: &str) -> LoadResult {
        let current = Arc::clone(&self.slot).read_owned().await;
        match OwnedRwLockReadGuard::try_map(current, |slot| {
            slot.resident().filter(|engine| engine.key() == key)
        }) {
            Ok(engine) => {
                self.metrics.record_cache_hit();
                return Ok(EngineLease {
                    engine: Arc::new(engine),
                });
            }
            // Release the read half before waiting on a load that needs the write half.
            Err(current) => drop(current),
        }

        self.pending_load(key).await
    }

    /// Key of the resident engine, if any.
    pub async fn resident_key(&self) -> Option<String> {
        self.slot.read().await.resident_key().map(str::to_string)
    }

    /// Number of loads currently in flight.
    pub fn pending_loads(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Destroy the resident engine and any engine left behind by a timed-out
    /// load. Waits for outstanding leases.
    pub async fn evict(&self) -> Option<String> {
        self.slot.write().await.release().await
    }

    fn pending_load(&self, key: &str) -> PendingLoad {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(load) = pending.get(key) {
            debug!("Joining in-flight load of {}", key);
            self.metrics.record_deduplicated_wait();
            return load.clone();
        }

        let load = self.spawn_load(key.to_string());
        pending.insert(key.to_string(), load.clone());
        load
    }

    /// Start a load on its own task so it runs to completion even if every
    /// caller waiting on it goes away.
    fn spawn_load(&self, key: String) -> PendingLoad {
        let registry = Arc::clone(&self.registry);
        let slot = Arc::clone(&self.slot);
        let settle = SettleOnDrop {
            pending: Arc::clone(&self.pending),
            key: key.clone(),
        };

        let task = tokio::spawn(async move {
            let result = load_into_slot(&registry, slot, &settle.key).await;
            drop(settle);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(TranslateError::EngineInit {
                    key,
                    reason: format!("load task failed: {}", e),
                })
            })
        }
        .boxed()
        .shared()
    }
}

async fn load_into_slot(
    registry: &ModelRegistry,
    slot: Arc<RwLock<ResidentSlot>>,
    key: &str,
) -> LoadResult {
    let descriptor = registry
        .lookup(key)
        .ok_or_else(|| TranslateError::model_not_available(key, "no model registered for this pair"))?;

    let mut guard = slot.write_owned().await;
    guard.install(&descriptor).await?;

    // Downgrade without releasing, so no other transition can slip in
    // between the install and the waiters' first use.
    OwnedRwLockReadGuard::try_map(guard.downgrade(), |slot| slot.resident())
        .map(|engine| EngineLease {
            engine: Arc::new(engine),
        })
        .map_err(|_| TranslateError::EngineInit {
            key: key.to_string(),
            reason: "slot emptied after install".to_string(),
        })
}

/// Removes a pending entry when its load task finishes, including by panic.
struct SettleOnDrop {
    pending: PendingLoads,
    key: String,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.key);
    }
}
