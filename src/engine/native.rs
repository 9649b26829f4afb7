//! C ABI binding to the native translation engine.
//!
//! The shared library is opened once at startup. It must export:
//!
//! ```c
//! void *engine_model_new(const char *from, const char *to, const char *config,
//!                        const uint8_t *weights, size_t weights_len,
//!                        const uint8_t *lexicon, size_t lexicon_len,
//!                        const uint8_t *src_vocab, size_t src_vocab_len,
//!                        const uint8_t *trg_vocab, size_t trg_vocab_len);
//! char *engine_model_translate(void *model, const char *text);
//! void  engine_string_free(char *text);
//! void  engine_model_free(void *model);
//! const char *engine_last_error(void);
//! ```
//!
//! `engine_model_new` and `engine_model_translate` return NULL on failure, with
//! a message available from `engine_last_error`.

use super::{DecodingConfig, EngineHandle, EngineRuntime};
use crate::registry::ModelArtifacts;
use anyhow::{anyhow, bail, Context, Result};
use libloading::{Library, Symbol};
use std::alloc::{self, Layout};
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use tracing::info;

type ModelNewFn = unsafe extern "C" fn(
    *const c_char,
    *const c_char,
    *const c_char,
    *const u8,
    usize,
    *const u8,
    usize,
    *const u8,
    usize,
    *const u8,
    usize,
) -> *mut c_void;
type TranslateFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> *mut c_char;
type StringFreeFn = unsafe extern "C" fn(*mut c_char);
type ModelFreeFn = unsafe extern "C" fn(*mut c_void);
type LastErrorFn = unsafe extern "C" fn() -> *const c_char;

/// Model weights are read with SIMD loads and must be 256-byte aligned.
const WEIGHTS_ALIGNMENT: usize = 256;
const DEFAULT_ALIGNMENT: usize = 64;

struct NativeApi {
    model_new: ModelNewFn,
    translate: TranslateFn,
    string_free: StringFreeFn,
    model_free: ModelFreeFn,
    last_error: LastErrorFn,
    // Keeps the function pointers above valid.
    _lib: Library,
}

impl NativeApi {
    fn last_error(&self) -> String {
        let ptr = unsafe { (self.last_error)() };
        if ptr.is_null() {
            return "unknown engine error".to_string();
        }
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

fn symbol<T: Copy>(lib: &Library, name: &[u8]) -> Result<T> {
    let sym: Symbol<T> = unsafe { lib.get(name) }.with_context(|| {
        format!(
            "Missing engine symbol '{}'",
            String::from_utf8_lossy(&name[..name.len().saturating_sub(1)])
        )
    })?;
    Ok(*sym)
}

/// Engine runtime backed by a dynamically loaded shared library.
pub struct NativeRuntime {
    api: Arc<NativeApi>,
}

impl NativeRuntime {
    pub fn load(path: &Path) -> Result<Self> {
        let lib = unsafe { Library::new(path) }
            .with_context(|| format!("Failed to load engine library {}", path.display()))?;

        let api = NativeApi {
            model_new: symbol(&lib, b"engine_model_new\0")?,
            translate: symbol(&lib, b"engine_model_translate\0")?,
            string_free: symbol(&lib, b"engine_string_free\0")?,
            model_free: symbol(&lib, b"engine_model_free\0")?,
            last_error: symbol(&lib, b"engine_last_error\0")?,
            _lib: lib,
        };

        info!("Loaded engine library {}", path.display());
        Ok(Self { api: Arc::new(api) })
    }
}

impl EngineRuntime for NativeRuntime {
    fn instantiate(
        &self,
        source_lang: &str,
        target_lang: &str,
        config: &DecodingConfig,
        artifacts: &ModelArtifacts,
    ) -> Result<Box<dyn EngineHandle>> {
        let from = CString::new(source_lang).context("source language contains NUL")?;
        let to = CString::new(target_lang).context("target language contains NUL")?;
        let config = CString::new(config.to_string()).context("config contains NUL")?;

        let weights = AlignedBytes::copy_from(&artifacts.weights, WEIGHTS_ALIGNMENT)?;
        let lexicon = AlignedBytes::copy_from(&artifacts.lexicon, DEFAULT_ALIGNMENT)?;
        let src_vocab = AlignedBytes::copy_from(&artifacts.source_vocab, DEFAULT_ALIGNMENT)?;
        let trg_vocab = AlignedBytes::copy_from(&artifacts.target_vocab, DEFAULT_ALIGNMENT)?;

        // The engine copies what it needs; the aligned buffers only have to
        // outlive this call.
        let model = unsafe {
            (self.api.model_new)(
                from.as_ptr(),
                to.as_ptr(),
                config.as_ptr(),
                weights.as_ptr(),
                weights.len(),
                lexicon.as_ptr(),
                lexicon.len(),
                src_vocab.as_ptr(),
                src_vocab.len(),
                trg_vocab.as_ptr(),
                trg_vocab.len(),
            )
        };

        let model = NonNull::new(model).ok_or_else(|| anyhow!(self.api.last_error()))?;

        Ok(Box::new(NativeHandle {
            model,
            api: Arc::clone(&self.api),
            calls: Mutex::new(()),
        }))
    }
}

struct NativeHandle {
    model: NonNull<c_void>,
    api: Arc<NativeApi>,
    // The engine is not reentrant per instance.
    calls: Mutex<()>,
}

// SAFETY: the model pointer is only used under `calls`, and freed once in Drop.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

impl EngineHandle for NativeHandle {
    fn translate(&self, text: &str) -> Result<String> {
        let text = CString::new(text).context("text contains NUL")?;
        let _call = self.calls.lock().unwrap_or_else(|e| e.into_inner());

        let out = unsafe { (self.api.translate)(self.model.as_ptr(), text.as_ptr()) };
        if out.is_null() {
            bail!(self.api.last_error());
        }

        let translated = unsafe { CStr::from_ptr(out) }.to_string_lossy().into_owned();
        unsafe { (self.api.string_free)(out) };
        Ok(translated)
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        let _call = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { (self.api.model_free)(self.model.as_ptr()) };
    }
}

/// Heap copy of a byte buffer with a guaranteed alignment.
struct AlignedBytes {
    ptr: NonNull<u8>,
    layout: Layout,
    len: usize,
}

impl AlignedBytes {
    fn copy_from(bytes: &[u8], align: usize) -> Result<Self> {
        // Zero-sized allocations are not allowed; round up to one byte.
        let layout = Layout::from_size_align(bytes.len().max(1), align)
            .context("invalid artifact buffer layout")?;
        let ptr = NonNull::new(unsafe { alloc::alloc(layout) })
            .ok_or_else(|| anyhow!("failed to allocate {} bytes", layout.size()))?;
        unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };

        Ok(Self {
            ptr,
            layout,
            len: bytes.len(),
        })
    }

    fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for AlignedBytes {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}
