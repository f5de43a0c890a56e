use core::marker::PhantomData;

use super::binary::{BinaryDecoder, BinaryEncoder};
use super::descriptor::{PrimitiveKind, SizeDescriptor};
use super::error::CodecResult;
use super::FixedCodec;

/// Values the binary schemes can lay out directly.
pub trait Primitive: Copy + Default {
    const KIND: PrimitiveKind;

    fn write_to(self, out: &mut dyn BinaryEncoder) -> CodecResult<()>;

    fn read_from(input: &mut dyn BinaryDecoder, field: &'static str) -> CodecResult<Self>;
}

macro_rules! primitive {
    ($ty:ty, $kind:ident, $write:ident, $read:ident) => {
        impl Primitive for $ty {
            const KIND: PrimitiveKind = PrimitiveKind::$kind;

            fn write_to(self, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
                out.$write(self)
            }

            fn read_from(input: &mut dyn BinaryDecoder, field: &'static str) -> CodecResult<Self> {
                input.$read(field)
            }
        }
    };
}

primitive!(bool, Bool, write_bool, read_bool);
primitive!(u8, U8, write_u8, read_u8);
primitive!(i8, I8, write_i8, read_i8);
primitive!(u16, U16, write_u16, read_u16);
primitive!(i16, I16, write_i16, read_i16);
primitive!(u32, U32, write_u32, read_u32);
primitive!(i32, I32, write_i32, read_i32);
primitive!(u64, U64, write_u64, read_u64);
primitive!(i64, I64, write_i64, read_i64);

/// Codec for a single fixed-width primitive.
#[derive(Debug, Clone)]
pub struct PrimitiveCodec<T> {
    descriptor: SizeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Primitive> PrimitiveCodec<T> {
    pub fn new() -> Self {
        Self {
            descriptor: SizeDescriptor::primitive(T::KIND),
            _marker: PhantomData,
        }
    }
}

impl<T: Primitive> Default for PrimitiveCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Primitive> FixedCodec for PrimitiveCodec<T> {
    type Value = T;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> T {
        T::default()
    }

    fn write(&self, value: &T, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        value.write_to(out)
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<T> {
        T::read_from(input, "primitive")
    }
}

pub type BoolCodec = PrimitiveCodec<bool>;
pub type U8Codec = PrimitiveCodec<u8>;
pub type I8Codec = PrimitiveCodec<i8>;
pub type U16Codec = PrimitiveCodec<u16>;
pub type I16Codec = PrimitiveCodec<i16>;
pub type U32Codec = PrimitiveCodec<u32>;
pub type I32Codec = PrimitiveCodec<i32>;
pub type U64Codec = PrimitiveCodec<u64>;
pub type I64Codec = PrimitiveCodec<i64>;
