//! Model registry: discovery and validation of language-pair model directories.
//!
//! A models root contains one directory per pair, named `<from>-<to>` or as a
//! four-letter `<from><to>` concatenation (`enzh`, `jpen`). Each directory must
//! hold the four artifacts described in [`patterns`]. Directories that do not
//! parse or are incomplete are skipped with a warning; the scan itself only
//! fails if the root cannot be read.

mod patterns;

pub use patterns::{classify, resolve, ArtifactFiles, ArtifactRole};

use crate::error::TranslateError;
use crate::language::{is_single_code, normalize};
use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info, warn};

/// Raw artifact bytes handed to the engine runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    pub weights: Vec<u8>,
    pub lexicon: Vec<u8>,
    pub source_vocab: Vec<u8>,
    pub target_vocab: Vec<u8>,
}

impl ModelArtifacts {
    pub fn total_bytes(&self) -> usize {
        self.weights.len() + self.lexicon.len() + self.source_vocab.len() + self.target_vocab.len()
    }
}

/// One discoverable language pair.
///
/// Immutable after registration except for the artifact bytes, which are
/// read at most once and then shared.
#[derive(Debug)]
pub struct ModelDescriptor {
    key: String,
    source_lang: String,
    target_lang: String,
    artifact_dir: PathBuf,
    files: ArtifactFiles,
    artifacts: OnceLock<Arc<ModelArtifacts>>,
}

impl ModelDescriptor {
    /// Build a descriptor for `dir`, validating that all four artifact roles
    /// are present.
    pub fn from_dir(from: &str, to: &str, dir: &Path) -> Result<Self, TranslateError> {
        let from = normalize(from);
        let to = normalize(to);
        let key = format!("{}-{}", from, to);

        if from.is_empty() || to.is_empty() {
            return Err(TranslateError::Validation(format!(
                "Invalid language pair '{}'",
                key
            )));
        }

        let file_names = list_file_names(dir)
            .map_err(|e| TranslateError::model_not_available(&key, format!("{:#}", e)))?;

        let files = resolve(&file_names).map_err(|missing| {
            let missing: Vec<&str> = missing.iter().map(ArtifactRole::as_str).collect();
            TranslateError::model_not_available(
                &key,
                format!(
                    "{} is missing {}",
                    dir.display(),
                    missing.join(", ")
                ),
            )
        })?;

        Ok(Self {
            key,
            source_lang: from,
            target_lang: to,
            artifact_dir: dir.to_path_buf(),
            files,
            artifacts: OnceLock::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn files(&self) -> &ArtifactFiles {
        &self.files
    }

    /// Cached artifact bytes, if they have been read already.
    pub fn cached_artifacts(&self) -> Option<Arc<ModelArtifacts>> {
        self.artifacts.get().cloned()
    }

    /// Read the artifact bytes, caching them on the descriptor.
    ///
    /// A failed read leaves the cache empty so a later call retries.
    pub async fn load_artifacts(&self) -> Result<Arc<ModelArtifacts>, TranslateError> {
        if let Some(artifacts) = self.artifacts.get() {
            return Ok(Arc::clone(artifacts));
        }

        let read = |name: &str| {
            let path = self.artifact_dir.join(name);
            let key = self.key.clone();
            async move {
                tokio::fs::read(&path).await.map_err(|e| {
                    TranslateError::model_not_available(
                        key,
                        format!("failed to read {}: {}", path.display(), e),
                    )
                })
            }
        };

        let weights = read(&self.files.weights).await?;
        let lexicon = read(&self.files.lexicon).await?;
        let source_vocab = read(&self.files.source_vocab).await?;
        let target_vocab = if self.files.target_vocab == self.files.source_vocab {
            source_vocab.clone()
        } else {
            read(&self.files.target_vocab).await?
        };

        let artifacts = Arc::new(ModelArtifacts {
            weights,
            lexicon,
            source_vocab,
            target_vocab,
        });
        debug!(
            "Read {} bytes of artifacts for {}",
            artifacts.total_bytes(),
            self.key
        );

        // A concurrent reader may have won; either copy is equivalent.
        Ok(Arc::clone(self.artifacts.get_or_init(|| artifacts)))
    }
}

fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read model directory {}", dir.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn split_pair(name: &str) -> (&str, &str) {
    let splits = name.match_indices('-').map(|(at, _)| (&name[..at], &name[at + 1..]));

    for (from, to) in splits {
        if is_single_code(from) && is_single_code(to) {
            return (from, to);
        }
    }
    name.split_once('-').unwrap_or((name, ""))
}

/// Parse a model directory name into a canonical `(from, to)` pair.
///
/// Accepts `<from>-<to>` or a four-letter `<from><to>` concatenation.
/// Either side of the hyphenated form may itself be a hyphenated code such
/// as `zh-hant`; the first split where both sides are whole codes wins, and
/// otherwise the name is split on its first hyphen. Anything else yields
/// `None`.
pub fn parse_pair_dir(name: &str) -> Option<(String, String)> {
    let (from, to) = if name.contains('-') {
        split_pair(name)
    } else if name.len() == 4 && name.chars().all(|c| c.is_ascii_alphabetic()) {
        (&name[0..2], &name[2..4])
    } else {
        return None;
    };

    let from = normalize(from);
    let to = normalize(to);
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some((from, to))
}

/// Lookup table from canonical key to model descriptor.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<BTreeMap<String, Arc<ModelDescriptor>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a models root and register every valid pair directory.
    ///
    /// Returns the descriptors registered by this scan (already-known keys
    /// included).
    pub fn scan(&self, root: &Path) -> Result<Vec<Arc<ModelDescriptor>>> {
        let mut registered = Vec::new();

        let mut entries: Vec<_> = std::fs::read_dir(root)
            .with_context(|| format!("Failed to read models directory {}", root.display()))?
            .collect::<std::io::Result<_>>()
            .with_context(|| format!("Failed to list models directory {}", root.display()))?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let dir_name = entry.file_name().to_string_lossy().into_owned();
            debug!("Looking for models in {}", path.display());

            let Some((from, to)) = parse_pair_dir(&dir_name) else {
                warn!(
                    "Skipping '{}': expected '<from>-<to>' or a 4-letter pair like 'enzh'",
                    dir_name
                );
                continue;
            };

            match self.register(&from, &to, &path) {
                Ok(descriptor) => registered.push(descriptor),
                Err(e) => warn!("Skipping '{}': {}", dir_name, e),
            }
        }

        info!(
            "Registered {} model(s) from {}",
            registered.len(),
            root.display()
        );
        Ok(registered)
    }

    /// Register one pair. Registering a key that is already known is a no-op
    /// that returns the existing descriptor.
    pub fn register(
        &self,
        from: &str,
        to: &str,
        dir: &Path,
    ) -> Result<Arc<ModelDescriptor>, TranslateError> {
        let key = format!("{}-{}", normalize(from), normalize(to));
        if let Some(existing) = self.lookup(&key) {
            debug!("Model {} already registered", key);
            return Ok(existing);
        }

        let descriptor = Arc::new(ModelDescriptor::from_dir(from, to, dir)?);

        let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
        let descriptor = Arc::clone(
            models
                .entry(key)
                .or_insert_with(|| Arc::clone(&descriptor)),
        );
        info!(
            "Registered model {} from {}",
            descriptor.key(),
            descriptor.artifact_dir().display()
        );
        Ok(descriptor)
    }

    pub fn lookup(&self, key: &str) -> Option<Arc<ModelDescriptor>> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    /// Distinct source languages across all registered pairs.
    pub fn source_languages(&self) -> BTreeSet<String> {
        self.models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|descriptor| descriptor.source_lang().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read every registered model's artifacts into memory.
    ///
    /// Only shortens the first request for each pair; failures are logged
    /// and left for the load path to report.
    pub async fn preload_artifacts(&self) {
        let descriptors: Vec<_> = self
            .models
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();

        for descriptor in descriptors {
            if let Err(e) = descriptor.load_artifacts().await {
                warn!("Failed to preload artifacts: {}", e);
            }
        }
    }
}
