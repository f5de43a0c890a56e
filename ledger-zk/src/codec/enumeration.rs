use super::binary::{BinaryDecoder, BinaryEncoder};
use super::descriptor::SizeDescriptor;
use super::error::{CodecError, CodecResult};
use super::FixedCodec;

/// Enum stored as the `u32` ordinal of its variant.
///
/// Every variant has the same width, so the encoded length never reveals
/// which one was chosen.
#[derive(Debug, Clone)]
pub struct EnumCodec<E> {
    variants: Vec<E>,
    descriptor: SizeDescriptor,
}

impl<E: PartialEq + Clone> EnumCodec<E> {
    /// Variants in ordinal order. The first one is the default, so at
    /// least one is required.
    pub fn new(variants: impl Into<Vec<E>>) -> CodecResult<Self> {
        let variants = variants.into();
        if variants.is_empty() {
            return Err(CodecError::invalid_value("enum", "no variants declared"));
        }
        let descriptor = SizeDescriptor::enumeration(variants.len());
        Ok(Self {
            variants,
            descriptor,
        })
    }

    pub fn ordinal(&self, value: &E) -> Option<u32> {
        self.variants
            .iter()
            .position(|variant| variant == value)
            .map(|index| index as u32)
    }
}

impl<E: PartialEq + Clone> FixedCodec for EnumCodec<E> {
    type Value = E;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> E {
        self.variants[0].clone()
    }

    fn write(&self, value: &E, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        let ordinal = self
            .ordinal(value)
            .ok_or(CodecError::UnknownVariant { field: "enum" })?;
        out.write_u32(ordinal)
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<E> {
        let ordinal = input.read_u32("enum ordinal")?;
        self.variants.get(ordinal as usize).cloned().ok_or_else(|| {
            CodecError::invalid_value(
                "enum ordinal",
                format!("{ordinal} out of {} variants", self.variants.len()),
            )
        })
    }
}
