//! Fixed-length witness codec.
//!
//! Every codec owns a [`SizeDescriptor`] computed from declared bounds and
//! writes exactly that many units for any value, whichever [`Scheme`] is in
//! use. Composite codecs decompose their values into primitives; the binary
//! schemes only ever see fixed-width integers and booleans.

mod binary;
mod composite;
mod descriptor;
mod enumeration;
mod error;
mod primitive;
mod registry;
mod string;

pub use binary::{
    BinaryDecoder, BinaryEncoder, BitDecoder, BitEncoder, ByteDecoder, ByteEncoder, Scheme,
};
pub use composite::{CharCodec, DefaultedCodec, F32Codec, F64Codec, FixedListCodec, NullableCodec};
pub use descriptor::{Charset, PrimitiveKind, Shape, SizeDescriptor};
pub use enumeration::EnumCodec;
pub use error::{CodecError, CodecResult};
pub use primitive::{
    BoolCodec, I16Codec, I32Codec, I64Codec, I8Codec, Primitive, PrimitiveCodec, U16Codec,
    U32Codec, U64Codec, U8Codec,
};
pub use registry::{CodecRegistry, SharedCodec};
pub use string::{FixedBytesCodec, FixedStringCodec};

/// A serializer whose output length is fixed by its descriptor.
///
/// Codecs are built once and reused; they hold no state between calls.
pub trait FixedCodec {
    type Value;

    fn descriptor(&self) -> &SizeDescriptor;

    /// Value written into unused slots of fixed-capacity containers.
    fn default_value(&self) -> Self::Value;

    fn write(&self, value: &Self::Value, out: &mut dyn BinaryEncoder) -> CodecResult<()>;

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<Self::Value>;

    /// Encodes `value` into exactly `descriptor().len(scheme)` units.
    fn encode(&self, value: &Self::Value, scheme: Scheme) -> CodecResult<Vec<u8>> {
        let descriptor = self.descriptor();
        let mut out = scheme.encoder(descriptor.byte_size());
        self.write(value, out.as_mut())?;
        let units = out.finish();
        let expected = descriptor.len(scheme);
        if units.len() != expected {
            return Err(CodecError::LengthMismatch {
                descriptor: descriptor.to_string(),
                expected,
                actual: units.len(),
            });
        }
        Ok(units)
    }

    /// Decodes a value from input that must match the descriptor exactly.
    fn decode(&self, units: &[u8], scheme: Scheme) -> CodecResult<Self::Value> {
        let expected = self.descriptor().len(scheme);
        if units.len() < expected {
            return Err(CodecError::InsufficientData {
                expected,
                actual: units.len(),
            });
        }
        if units.len() > expected {
            return Err(CodecError::TrailingData {
                expected,
                actual: units.len(),
            });
        }
        let mut input = scheme.decoder(units);
        self.read(input.as_mut())
    }
}
