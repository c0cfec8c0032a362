//! Formatting utilities

use humansize::{DECIMAL, format_size};

/// Format a byte count in human-readable form
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a millisecond duration as seconds
pub fn format_ms(ms: u64) -> String {
    format!("{:.3}s", ms as f64 / 1000.0)
}

/// Format a vector with fixed precision
pub fn format_vec3(v: glam::Vec3) -> String {
    format!("({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
}
