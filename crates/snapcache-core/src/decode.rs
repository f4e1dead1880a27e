//! Byte-to-text decoding policy
//!
//! Dump files and live binary columns may carry byte sequences that are not
//! valid UTF-8. They are decoded permissively under an explicit policy.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Invalid sequences are dropped
    #[default]
    Drop,
    /// Invalid sequences become U+FFFD
    Replace,
}

impl DecodePolicy {
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            DecodePolicy::Replace => String::from_utf8_lossy(bytes),
            DecodePolicy::Drop => match std::str::from_utf8(bytes) {
                Ok(text) => Cow::Borrowed(text),
                Err(_) => {
                    let mut out = String::with_capacity(bytes.len());
                    for chunk in bytes.utf8_chunks() {
                        out.push_str(chunk.valid());
                    }
                    Cow::Owned(out)
                }
            },
        }
    }
}
