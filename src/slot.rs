//! The resident engine slot.
//!
//! Holds at most one instantiated engine. Installing a different pair first
//! destroys the current engine, so two engines never share the memory budget.
//! The slot has no locking of its own: the load coordinator owns it behind a
//! lock and is the only caller of [`ResidentSlot::install`].

use crate::engine::{DecodingConfig, EngineHandle, EngineRuntime};
use crate::error::TranslateError;
use crate::metrics::EngineMetrics;
use crate::registry::ModelDescriptor;
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The single instantiated engine and the pair it was built for.
pub struct ResidentEngine {
    key: String,
    handle: Box<dyn EngineHandle>,
}

impl ResidentEngine {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run the native translate call on the current thread.
    ///
    /// Async callers go through `EngineLease::translate`, which keeps the
    /// engine pinned for as long as this call runs.
    pub fn translate_blocking(&self, text: &str) -> Result<String, TranslateError> {
        self.handle
            .translate(text)
            .map_err(|e| TranslateError::EngineRuntime {
                key: self.key.clone(),
                reason: format!("{:#}", e),
            })
    }
}

impl std::fmt::Debug for ResidentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResidentEngine")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

type Instantiation = JoinHandle<Result<Box<dyn EngineHandle>>>;

pub struct ResidentSlot {
    runtime: Arc<dyn EngineRuntime>,
    config: DecodingConfig,
    load_timeout: Duration,
    metrics: Arc<EngineMetrics>,
    resident: Option<ResidentEngine>,
    // An instantiation that outlived its timeout. Its engine is never
    // installed, but it must finish (and be dropped) before another starts.
    abandoned: Option<Instantiation>,
}

impl ResidentSlot {
    pub fn new(
        runtime: Arc<dyn EngineRuntime>,
        load_timeout: Duration,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            runtime,
            config: DecodingConfig::default(),
            load_timeout,
            metrics,
            resident: None,
            abandoned: None,
        }
    }

    pub fn resident(&self) -> Option<&ResidentEngine> {
        self.resident.as_ref()
    }

    pub fn resident_key(&self) -> Option<&str> {
        self.resident.as_ref().map(ResidentEngine::key)
    }

    /// Make `descriptor`'s engine resident, evicting any other engine first.
    ///
    /// On failure the slot is left empty.
    pub async fn install(
        &mut self,
        descriptor: &ModelDescriptor,
    ) -> Result<&ResidentEngine, TranslateError> {
        if self.resident_key() == Some(descriptor.key()) {
            self.metrics.record_cache_hit();
            return self.resident.as_ref().ok_or_else(|| unreachable_empty(descriptor));
        }

        self.evict();
        if !self.reap_abandoned().await {
            return Err(TranslateError::EngineInitTimeout {
                key: descriptor.key().to_string(),
                timeout: self.load_timeout,
            });
        }

        let artifacts = descriptor.load_artifacts().await.inspect_err(|_| {
            self.metrics.record_load_failure();
        })?;

        let started = Instant::now();
        let runtime = Arc::clone(&self.runtime);
        let config = self.config.clone();
        let source_lang = descriptor.source_lang().to_string();
        let target_lang = descriptor.target_lang().to_string();
        let mut instantiation: Instantiation = tokio::task::spawn_blocking(move || {
            runtime.instantiate(&source_lang, &target_lang, &config, &artifacts)
        });

        let handle = match tokio::time::timeout(self.load_timeout, &mut instantiation).await {
            Ok(Ok(Ok(handle))) => handle,
            Ok(Ok(Err(e))) => {
                self.metrics.record_load_failure();
                warn!("Engine for {} failed to initialize: {:#}", descriptor.key(), e);
                return Err(TranslateError::EngineInit {
                    key: descriptor.key().to_string(),
                    reason: format!("{:#}", e),
                });
            }
            Ok(Err(join_error)) => {
                self.metrics.record_load_failure();
                return Err(TranslateError::EngineInit {
                    key: descriptor.key().to_string(),
                    reason: format!("instantiation task failed: {}", join_error),
                });
            }
            Err(_) => {
                self.metrics.record_load_timeout();
                warn!(
                    "Engine for {} did not initialize within {:?}",
                    descriptor.key(),
                    self.load_timeout
                );
                self.abandoned = Some(instantiation);
                return Err(TranslateError::EngineInitTimeout {
                    key: descriptor.key().to_string(),
                    timeout: self.load_timeout,
                });
            }
        };

        self.metrics.record_load();
        info!(
            "Loaded engine {} in {:.2?}",
            descriptor.key(),
            started.elapsed()
        );

        Ok(&*self.resident.insert(ResidentEngine {
            key: descriptor.key().to_string(),
            handle,
        }))
    }

    /// Destroy the resident engine, if any.
    pub fn evict(&mut self) -> Option<String> {
        let engine = self.resident.take()?;
        let key = engine.key.clone();
        drop(engine);

        self.metrics.record_eviction();
        info!("Evicted engine {}", key);
        Some(key)
    }

    /// Destroy the resident engine and any engine still held by a timed-out
    /// instantiation. Used at shutdown.
    pub async fn release(&mut self) -> Option<String> {
        let evicted = self.evict();
        if !self.reap_abandoned().await {
            warn!("Abandoned engine instantiation still running after {:?}", self.load_timeout);
        }
        evicted
    }

    /// Wait for a timed-out instantiation to finish and drop its engine.
    /// Returns false if it is still running after another timeout period.
    async fn reap_abandoned(&mut self) -> bool {
        let Some(mut abandoned) = self.abandoned.take() else {
            return true;
        };

        match tokio::time::timeout(self.load_timeout, &mut abandoned).await {
            Ok(late_engine) => {
                drop(late_engine);
                info!("Released engine from a timed-out instantiation");
                true
            }
            Err(_) => {
                self.abandoned = Some(abandoned);
                false
            }
        }
    }
}

fn unreachable_empty(descriptor: &ModelDescriptor) -> TranslateError {
    TranslateError::EngineInit {
        key: descriptor.key().to_string(),
        reason: "slot emptied during install".to_string(),
    }
}
