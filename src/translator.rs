//! End-to-end translation: resolve the source language, plan a route, run
//! each hop on the resident engine, and record the outcome.

use crate::activity::ActivityLog;
use crate::coordinator::LoadCoordinator;
use crate::error::TranslateError;
use crate::language::{normalize, LanguageDetector};
use crate::metrics::EngineMetrics;
use crate::registry::ModelRegistry;
use crate::router::PivotRouter;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    /// Canonical source language, detected if the caller did not give one.
    pub from: String,
    pub to: String,
    /// 0 for identity, 1 for a direct model, 2 for a pivot.
    pub hops: usize,
}

pub struct Translator {
    registry: Arc<ModelRegistry>,
    router: PivotRouter,
    coordinator: Arc<LoadCoordinator>,
    detector: Box<dyn LanguageDetector>,
    activity: Arc<ActivityLog>,
    metrics: Arc<EngineMetrics>,
}

impl Translator {
    pub fn new(
        registry: Arc<ModelRegistry>,
        coordinator: Arc<LoadCoordinator>,
        detector: Box<dyn LanguageDetector>,
        activity: Arc<ActivityLog>,
        metrics: Arc<EngineMetrics>,
        hub_language: &str,
    ) -> Self {
        Self {
            router: PivotRouter::new(Arc::clone(&registry), hub_language),
            registry,
            coordinator,
            detector,
            activity,
            metrics,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &LoadCoordinator {
        &self.coordinator
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Detected canonical language of `text`.
    pub fn detect(&self, text: &str) -> String {
        self.detector.detect(text)
    }

    /// Translate `text` into `to`.
    ///
    /// `from` may be `None`, empty or `"auto"`, in which case the source
    /// language is inferred.
    pub async fn translate(
        &self,
        text: &str,
        from: Option<&str>,
        to: &str,
    ) -> Result<Translation, TranslateError> {
        if text.trim().is_empty() {
            return Err(TranslateError::Validation("text must not be empty".to_string()));
        }
        let to = normalize(to);
        if to.is_empty() {
            return Err(TranslateError::Validation(
                "target language must not be empty".to_string(),
            ));
        }
        let from = self.source_language(text, from);

        let route = self.router.route(&from, &to)?;

        let mut current = text.to_string();
        for hop in &route {
            let key = hop.key();
            // The lease is dropped at the end of each hop so the next hop
            // can evict this engine.
            let engine = self.coordinator.acquire(&key).await?;
            current = match engine.translate(&current).await {
                Ok(translated) => translated,
                Err(e) => {
                    self.metrics.record_runtime_error();
                    return Err(e);
                }
            };
        }

        if route.is_empty() {
            debug!("Identity translation for '{}', returning input unchanged", to);
        } else {
            info!(
                "Translated {} chars {} -> {} in {} hop(s)",
                text.chars().count(),
                from,
                to,
                route.len()
            );
        }

        self.metrics.record_translation(route.len());
        self.activity.record(&from, &to, text, &current);

        Ok(Translation {
            text: current,
            from,
            to,
            hops: route.len(),
        })
    }

    /// Canonical source language for `text`.
    ///
    /// An explicit code wins. Without one (`None`, empty or `"auto"`), the
    /// only registered source language is used if there is exactly one;
    /// otherwise the detector decides.
    pub fn source_language(&self, text: &str, from: Option<&str>) -> String {
        let explicit = from
            .map(str::trim)
            .filter(|code| !code.is_empty() && !code.eq_ignore_ascii_case("auto"));
        if let Some(code) = explicit {
            return normalize(code);
        }

        let sources = self.registry.source_languages();
        if sources.len() == 1 {
            if let Some(only) = sources.into_iter().next() {
                return only;
            }
        }

        let detected = self.detector.detect(text);
        debug!("Detected source language '{}'", detected);
        detected
    }
}
