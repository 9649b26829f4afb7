//! Engine runtime boundary.
//!
//! The translation engine itself is an external native library. This module
//! defines the seam the rest of the crate talks to: a runtime that builds
//! engine handles from artifact bytes, and handles that translate text and
//! release their native memory when dropped.

mod native;

pub use native::NativeRuntime;

use crate::registry::ModelArtifacts;
use anyhow::Result;
use std::fmt;

/// Builds engine instances. One runtime is created at startup and shared.
pub trait EngineRuntime: Send + Sync + 'static {
    /// Instantiate an engine for one language pair.
    ///
    /// Blocking and potentially slow; callers run it off the async workers.
    fn instantiate(
        &self,
        source_lang: &str,
        target_lang: &str,
        config: &DecodingConfig,
        artifacts: &ModelArtifacts,
    ) -> Result<Box<dyn EngineHandle>>;
}

/// An instantiated engine. Dropping the handle destroys the native instance.
pub trait EngineHandle: Send + Sync {
    fn translate(&self, text: &str) -> Result<String>;
}

/// Fixed decoding options passed to every instantiation.
///
/// Not tunable per request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingConfig {
    pub beam_size: u32,
    pub normalize: f32,
    pub word_penalty: f32,
    pub max_length_break: u32,
    pub mini_batch_words: u32,
    pub workspace: u32,
    pub max_length_factor: f32,
    pub skip_cost: bool,
    /// 0 lets the engine decide.
    pub cpu_threads: u32,
    pub gemm_precision: &'static str,
    pub alignment: &'static str,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            beam_size: 1,
            normalize: 1.0,
            word_penalty: 0.0,
            max_length_break: 512,
            mini_batch_words: 1024,
            workspace: 128,
            max_length_factor: 2.0,
            skip_cost: true,
            cpu_threads: 0,
            gemm_precision: "int8shiftAlphaAll",
            alignment: "soft",
        }
    }
}

impl fmt::Display for DecodingConfig {
    /// Renders the `key: value` lines the engine parses.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "beam-size: {}", self.beam_size)?;
        writeln!(f, "normalize: {:.1}", self.normalize)?;
        writeln!(f, "word-penalty: {}", self.word_penalty)?;
        writeln!(f, "max-length-break: {}", self.max_length_break)?;
        writeln!(f, "mini-batch-words: {}", self.mini_batch_words)?;
        writeln!(f, "workspace: {}", self.workspace)?;
        writeln!(f, "max-length-factor: {:.1}", self.max_length_factor)?;
        writeln!(f, "skip-cost: {}", self.skip_cost)?;
        writeln!(f, "cpu-threads: {}", self.cpu_threads)?;
        writeln!(f, "quiet: true")?;
        writeln!(f, "quiet-translation: true")?;
        writeln!(f, "gemm-precision: {}", self.gemm_precision)?;
        write!(f, "alignment: {}", self.alignment)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoding_config_render() {
        let rendered = DecodingConfig::default().to_string();

        assert!(rendered.starts_with("beam-size: 1\n"));
        assert!(rendered.contains("normalize: 1.0\n"));
        assert!(rendered.contains("max-length-break: 512\n"));
        assert!(rendered.contains("mini-batch-words: 1024\n"));
        assert!(rendered.contains("max-length-factor: 2.0\n"));
        assert!(rendered.contains("skip-cost: true\n"));
        assert!(rendered.contains("cpu-threads: 0\n"));
        assert!(rendered.contains("gemm-precision: int8shiftAlphaAll\n"));
        assert!(rendered.ends_with("alignment: soft"));
    }
}
