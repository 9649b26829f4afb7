//! Language code handling.
//!
//! Every language code that reaches routing or the model registry passes
//! through [`normalize`] first, so cache keys are stable regardless of how a
//! client spells a locale.
//!
//! # Architecture
//!
//! - `normalize`: alias table and the canonicalization function
//! - `names`: localized display names used by the name-based compatibility surface
//! - `detect`: pluggable language identification for `auto` source languages

mod detect;
mod names;
mod normalize;

pub use detect::{LanguageDetector, WhichlangDetector};
pub use names::{code_for_name, name_for_code};
pub use normalize::{is_single_code, normalize, pair_key};
