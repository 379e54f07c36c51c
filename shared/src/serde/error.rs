use thiserror::Error;

/// Errors raised while decoding through a [`StreamRead`](super::StreamRead)
/// implementation. Every variant is reachable from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Input ended before the value was complete
    #[error("Unexpected end of stream: needed {needed} bytes but {remaining} remain")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// String bytes were not valid UTF-8
    #[error("String field is not valid UTF-8")]
    InvalidUtf8,

    /// Value has the wrong shape for what is being read
    #[error("Expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Required object key is absent
    #[error("Missing object key `{key}`")]
    MissingKey { key: String },

    /// Numeric value does not fit the target type
    #[error("Value {value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// Array/object calls are not balanced, or a value was read with none pending
    #[error("Malformed stream structure: {context}")]
    Structure { context: &'static str },

    /// The encoding cannot perform the requested operation
    #[error("Operation `{operation}` is not supported by this encoding")]
    Unsupported { operation: &'static str },
}
