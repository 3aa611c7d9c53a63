//! Password sample buffer.
//!
//! The buffer accumulates one character per capture cycle and is the only
//! mutable string state in a session. It is written by the capture cycle
//! controller, read and cleared by the password gate path, and truncated
//! by the operator's delete-last action. All operations are total.

use tracing::warn;

/// Default maximum buffer length.
///
/// The buffer grows by at most one character every capture interval, so
/// this bound is generous; it exists to keep a session that is never
/// submitted from growing without limit.
pub const DEFAULT_MAX_LEN: usize = 64;

/// Character used when rendering the buffer in its concealed form.
const MASK_CHAR: char = '\u{2022}';

/// Ordered, bounded sequence of password candidate characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    chars: String,
    max_len: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl SampleBuffer {
    /// Creates an empty buffer bounded to `max_len` characters.
    #[must_use]
    pub fn new(max_len: usize) -> Self {
        Self {
            chars: String::new(),
            max_len,
        }
    }

    /// Appends one character.
    ///
    /// Returns `false` (and leaves the buffer unchanged) when the buffer
    /// is already at its length cap.
    pub fn push(&mut self, ch: char) -> bool {
        if self.chars.chars().count() >= self.max_len {
            warn!(max_len = self.max_len, "sample buffer at capacity; dropping sample");
            return false;
        }
        self.chars.push(ch);
        true
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.chars.clear();
    }

    /// Removes the final character if present. No-op on an empty buffer.
    pub fn delete_last(&mut self) {
        self.chars.pop();
    }

    /// Current contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    /// Number of accumulated characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.chars().count()
    }

    /// Whether the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Concealed rendering: one bullet per accumulated character.
    #[must_use]
    pub fn masked(&self) -> String {
        MASK_CHAR.to_string().repeat(self.len())
    }
}
