use thiserror::Error;

use super::descriptor::Charset;

/// Failures raised while encoding or decoding fixed-length values.
///
/// Encode-side variants are caller contract violations (a value does not fit
/// the bounds its type declared). Decode-side variants mean the input does
/// not match the descriptor it is being read against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A collection holds more elements than its declared capacity.
    #[error("{field}: {actual} elements exceed declared capacity of {capacity}")]
    CapacityExceeded {
        field: &'static str,
        capacity: usize,
        actual: usize,
    },

    /// A string's encoded form does not fit the declared byte budget.
    #[error("{field}: {charset} encoding takes {actual} bytes, budget is {budget}")]
    StringTooLong {
        field: &'static str,
        charset: Charset,
        budget: usize,
        actual: usize,
    },

    /// A character cannot be represented in the declared charset.
    #[error("{field}: character {ch:?} is not representable in {charset}")]
    UnsupportedCharacter {
        field: &'static str,
        charset: Charset,
        ch: char,
    },

    /// The enum value is not one of the codec's variants.
    #[error("{field}: value is not a declared variant")]
    UnknownVariant { field: &'static str },

    /// The primitive layer was asked to write a value it has no fixed layout for.
    #[error("{kind} values must be decomposed by a composite codec before encoding")]
    UnsupportedPrimitive { kind: &'static str },

    /// Input ended before the descriptor was satisfied.
    #[error("insufficient data for descriptor: expected {expected} units, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Input held more units than the descriptor accounts for.
    #[error("trailing data after descriptor: expected {expected} units, got {actual}")]
    TrailingData { expected: usize, actual: usize },

    /// A bit-packed unit held something other than 0 or 1.
    #[error("{field}: bit unit at offset {offset} holds {value}, expected 0 or 1")]
    InvalidBit {
        field: &'static str,
        offset: usize,
        value: u8,
    },

    /// A decoded field holds a value its codec cannot produce.
    #[error("{field}: invalid value ({reason})")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// A codec wrote a different number of units than its descriptor declares.
    #[error("codec for {descriptor} wrote {actual} units, descriptor declares {expected}")]
    LengthMismatch {
        descriptor: String,
        expected: usize,
        actual: usize,
    },

    /// No codec registered for the requested type.
    #[error("no codec registered for {type_name}")]
    UnregisteredType { type_name: &'static str },
}

impl CodecError {
    pub fn unsupported(kind: &'static str) -> Self {
        CodecError::UnsupportedPrimitive { kind }
    }

    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        CodecError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// True for failures caused by a value that does not fit its declared bounds.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            CodecError::CapacityExceeded { .. }
                | CodecError::StringTooLong { .. }
                | CodecError::UnsupportedCharacter { .. }
                | CodecError::UnknownVariant { .. }
        )
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
