//! Level 3: End-to-end emitter scenarios
//!
//! Effect library scenarios live in `tests/effect_library.rs` behind the
//! `serde-support` feature.

mod lifecycle;
mod rendering;
