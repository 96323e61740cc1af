// Utility functions for DraftDesk Core

use crate::types::Timestamp;

/// Get current timestamp in milliseconds
pub fn now() -> Timestamp {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as i64
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Generate a unique ID (UUID v4)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Count whitespace-separated words
pub fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}
