//! Pivot routing between language pairs.
//!
//! A direct model always wins. Without one, a request can go through the hub
//! language in two hops when both halves are registered. Only a single pivot
//! is supported.

use crate::error::TranslateError;
use crate::language::{normalize, pair_key};
use crate::registry::ModelRegistry;
use std::sync::Arc;
use tracing::debug;

/// One translation step, always backed by a registered model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub from: String,
    pub to: String,
}

impl Hop {
    fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Registry key of the model serving this hop.
    pub fn key(&self) -> String {
        pair_key(&self.from, &self.to)
    }
}

pub struct PivotRouter {
    registry: Arc<ModelRegistry>,
    hub: String,
}

impl PivotRouter {
    pub fn new(registry: Arc<ModelRegistry>, hub: &str) -> Self {
        Self {
            registry,
            hub: normalize(hub),
        }
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Plan the hops from `from` to `to`.
    ///
    /// An empty plan means source and target are the same language and the
    /// text should be returned unchanged.
    pub fn route(&self, from: &str, to: &str) -> Result<Vec<Hop>, TranslateError> {
        let from = normalize(from);
        let to = normalize(to);

        if from == to {
            return Ok(Vec::new());
        }

        if self.registry.contains(&pair_key(&from, &to)) {
            return Ok(vec![Hop::new(&from, &to)]);
        }

        if from != self.hub
            && to != self.hub
            && self.registry.contains(&pair_key(&from, &self.hub))
            && self.registry.contains(&pair_key(&self.hub, &to))
        {
            debug!("Pivoting {} -> {} through {}", from, to, self.hub);
            return Ok(vec![Hop::new(&from, &self.hub), Hop::new(&self.hub, &to)]);
        }

        Err(TranslateError::RouteNotFound { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn router_with(root: &Path, pairs: &[&str]) -> PivotRouter {
        for pair in pairs {
            let dir = root.join(pair);
            std::fs::create_dir_all(&dir).unwrap();
            for file in ["model.bin", "lex.bin", "vocab.spm"] {
                std::fs::write(dir.join(file), b"bytes").unwrap();
            }
        }
        let registry = ModelRegistry::new();
        registry.scan(root).unwrap();
        PivotRouter::new(Arc::new(registry), "en")
    }

    fn hops(route: &[Hop]) -> Vec<(&str, &str)> {
        route.iter().map(|h| (h.from.as_str(), h.to.as_str())).collect()
    }

    // ==================== Identity Tests ====================

    #[test]
    fn test_identity_route_is_empty() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &[]);

        for code in ["en", "zh", "xx", ""] {
            assert!(router.route(code, code).unwrap().is_empty());
        }
    }

    #[test]
    fn test_identity_after_normalization() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &[]);

        assert!(router.route("zh-CN", "zh").unwrap().is_empty());
        assert!(router.route("en_US", "EN").unwrap().is_empty());
    }

    // ==================== Direct Route Tests ====================

    #[test]
    fn test_direct_route() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["en-zh"]);

        let route = router.route("en", "zh").unwrap();
        assert_eq!(hops(&route), vec![("en", "zh")]);
        assert_eq!(route[0].key(), "en-zh");
    }

    #[test]
    fn test_direct_route_normalizes_codes() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["en-zh"]);

        let route = router.route("en-GB", "zh_Hans").unwrap();
        assert_eq!(hops(&route), vec![("en", "zh")]);
    }

    // ==================== Pivot Tests ====================

    #[test]
    fn test_pivot_through_hub() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["en-zh", "zh-en", "en-ja", "ja-en"]);

        let route = router.route("zh", "ja").unwrap();
        assert_eq!(hops(&route), vec![("zh", "en"), ("en", "ja")]);
    }

    #[test]
    fn test_direct_preferred_over_pivot() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["en-zh", "zh-en", "en-ja", "ja-en", "zh-ja"]);

        let route = router.route("zh", "ja").unwrap();
        assert_eq!(hops(&route), vec![("zh", "ja")]);
    }

    #[test]
    fn test_pivot_needs_both_halves() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["zh-en", "ja-en"]);

        let err = router.route("zh", "ja").unwrap_err();
        assert_eq!(
            err,
            TranslateError::RouteNotFound {
                from: "zh".to_string(),
                to: "ja".to_string()
            }
        );
    }

    #[test]
    fn test_no_pivot_when_hub_is_an_endpoint() {
        let tmp = TempDir::new().unwrap();
        let router = router_with(tmp.path(), &["zh-en"]);

        assert!(matches!(
            router.route("en", "zh"),
            Err(TranslateError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn test_custom_hub() {
        let tmp = TempDir::new().unwrap();
        for pair in ["ja-zh", "zh-ko"] {
            let dir = tmp.path().join(pair);
            std::fs::create_dir_all(&dir).unwrap();
            for file in ["model.bin", "lex.bin", "vocab.spm"] {
                std::fs::write(dir.join(file), b"bytes").unwrap();
            }
        }
        let registry = ModelRegistry::new();
        registry.scan(tmp.path()).unwrap();
        let router = PivotRouter::new(Arc::new(registry), "zh-CN");

        assert_eq!(router.hub(), "zh");
        let route = router.route("ja", "ko").unwrap();
        assert_eq!(hops(&route), vec![("ja", "zh"), ("zh", "ko")]);
    }
}
