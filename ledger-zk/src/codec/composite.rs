use super::binary::{BinaryDecoder, BinaryEncoder};
use super::descriptor::{PrimitiveKind, SizeDescriptor};
use super::error::{CodecError, CodecResult};
use super::FixedCodec;

/// Presence marker followed by the inner slot.
///
/// The slot is zero-filled when the value is absent, so `None` and `Some`
/// encode to the same length.
#[derive(Debug, Clone)]
pub struct NullableCodec<C> {
    inner: C,
    descriptor: SizeDescriptor,
}

impl<C: FixedCodec> NullableCodec<C> {
    pub fn new(inner: C) -> Self {
        let descriptor = SizeDescriptor::nullable(inner.descriptor().clone());
        Self { inner, descriptor }
    }
}

impl<C: FixedCodec> FixedCodec for NullableCodec<C> {
    type Value = Option<C::Value>;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> Self::Value {
        None
    }

    fn write(&self, value: &Self::Value, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        match value {
            Some(inner) => {
                out.write_bool(true)?;
                self.inner.write(inner, out)
            }
            None => {
                out.write_bool(false)?;
                out.write_padding(self.inner.descriptor().byte_size());
                Ok(())
            }
        }
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<Self::Value> {
        if input.read_bool("presence")? {
            Ok(Some(self.inner.read(input)?))
        } else {
            input.skip(self.inner.descriptor().byte_size(), "absent value")?;
            Ok(None)
        }
    }
}

/// Element count followed by `capacity` element slots.
///
/// Slots past the element count hold the inner codec's default value.
#[derive(Debug, Clone)]
pub struct FixedListCodec<C> {
    capacity: usize,
    inner: C,
    descriptor: SizeDescriptor,
}

impl<C: FixedCodec> FixedListCodec<C> {
    pub fn new(capacity: usize, inner: C) -> Self {
        let descriptor = SizeDescriptor::fixed_list(capacity, inner.descriptor().clone());
        Self {
            capacity,
            inner,
            descriptor,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<C: FixedCodec> FixedCodec for FixedListCodec<C> {
    type Value = Vec<C::Value>;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> Self::Value {
        Vec::new()
    }

    fn write(&self, value: &Self::Value, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        if value.len() > self.capacity {
            return Err(CodecError::CapacityExceeded {
                field: "list",
                capacity: self.capacity,
                actual: value.len(),
            });
        }
        out.write_u32(value.len() as u32)?;
        for item in value {
            self.inner.write(item, out)?;
        }
        let filler = self.inner.default_value();
        for _ in value.len()..self.capacity {
            self.inner.write(&filler, out)?;
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<Self::Value> {
        let len = input.read_u32("list length")? as usize;
        if len > self.capacity {
            return Err(CodecError::invalid_value(
                "list length",
                format!("{len} exceeds capacity {}", self.capacity),
            ));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.inner.read(input)?);
        }
        input.skip(
            (self.capacity - len) * self.inner.descriptor().byte_size(),
            "list padding",
        )?;
        Ok(items)
    }
}

/// Supplies a default where a product type needs a value but callers carry an
/// optional one.
///
/// Absence does not survive a round trip: decoding always yields `Some`.
#[derive(Debug, Clone)]
pub struct DefaultedCodec<C: FixedCodec> {
    inner: C,
    default: C::Value,
}

impl<C: FixedCodec> DefaultedCodec<C> {
    pub fn new(inner: C, default: C::Value) -> Self {
        Self { inner, default }
    }
}

impl<C> FixedCodec for DefaultedCodec<C>
where
    C: FixedCodec,
    C::Value: Clone,
{
    type Value = Option<C::Value>;

    fn descriptor(&self) -> &SizeDescriptor {
        self.inner.descriptor()
    }

    fn default_value(&self) -> Self::Value {
        Some(self.default.clone())
    }

    fn write(&self, value: &Self::Value, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        self.inner.write(value.as_ref().unwrap_or(&self.default), out)
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<Self::Value> {
        self.inner.read(input).map(Some)
    }
}

/// `f32` as its IEEE-754 bit pattern.
#[derive(Debug, Clone)]
pub struct F32Codec {
    descriptor: SizeDescriptor,
}

impl F32Codec {
    pub fn new() -> Self {
        Self {
            descriptor: SizeDescriptor::primitive(PrimitiveKind::U32),
        }
    }
}

impl Default for F32Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedCodec for F32Codec {
    type Value = f32;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> f32 {
        0.0
    }

    fn write(&self, value: &f32, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        out.write_u32(value.to_bits())
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<f32> {
        input.read_u32("f32").map(f32::from_bits)
    }
}

/// `f64` as its IEEE-754 bit pattern.
#[derive(Debug, Clone)]
pub struct F64Codec {
    descriptor: SizeDescriptor,
}

impl F64Codec {
    pub fn new() -> Self {
        Self {
            descriptor: SizeDescriptor::primitive(PrimitiveKind::U64),
        }
    }
}

impl Default for F64Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedCodec for F64Codec {
    type Value = f64;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> f64 {
        0.0
    }

    fn write(&self, value: &f64, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        out.write_u64(value.to_bits())
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<f64> {
        input.read_u64("f64").map(f64::from_bits)
    }
}

/// A single Unicode scalar value.
#[derive(Debug, Clone)]
pub struct CharCodec {
    descriptor: SizeDescriptor,
}

impl CharCodec {
    pub fn new() -> Self {
        Self {
            descriptor: SizeDescriptor::primitive(PrimitiveKind::U32),
        }
    }
}

impl Default for CharCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedCodec for CharCodec {
    type Value = char;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> char {
        '\0'
    }

    fn write(&self, value: &char, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        out.write_u32(u32::from(*value))
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<char> {
        let scalar = input.read_u32("char")?;
        char::from_u32(scalar)
            .ok_or_else(|| CodecError::invalid_value("char", format!("{scalar:#x} is not a scalar value")))
    }
}
