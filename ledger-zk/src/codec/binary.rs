//! Low-level binary schemes.
//!
//! Both schemes write big-endian fixed-width primitives. The byte-packed
//! scheme emits one output unit per byte; the bit-packed scheme expands every
//! byte into eight units holding 0 or 1, which is the boolean-per-byte layout
//! the proving toolchain reads.

use serde::{Deserialize, Serialize};

use super::error::{CodecError, CodecResult};

/// Selects the low-level layout used by every codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Bytes,
    #[default]
    Bits,
}

impl Scheme {
    /// Output units written per logical byte.
    pub const fn units_per_byte(self) -> usize {
        match self {
            Scheme::Bytes => 1,
            Scheme::Bits => 8,
        }
    }

    pub fn encoder(self, byte_capacity: usize) -> Box<dyn BinaryEncoder> {
        match self {
            Scheme::Bytes => Box::new(ByteEncoder::with_capacity(byte_capacity)),
            Scheme::Bits => Box::new(BitEncoder::with_capacity(byte_capacity)),
        }
    }

    pub fn decoder(self, units: &[u8]) -> Box<dyn BinaryDecoder + '_> {
        match self {
            Scheme::Bytes => Box::new(ByteDecoder::new(units)),
            Scheme::Bits => Box::new(BitDecoder::new(units)),
        }
    }
}

/// Primitive writer shared by both schemes.
///
/// Implementors only decide how one logical byte becomes output units; the
/// provided methods lay out every fixed-width primitive on top of that. Values
/// without a fixed layout are refused here and must be decomposed by a
/// composite codec first.
pub trait BinaryEncoder {
    fn scheme(&self) -> Scheme;

    fn write_byte(&mut self, byte: u8);

    /// Output units written so far.
    fn units(&self) -> usize;

    fn finish(self: Box<Self>) -> Vec<u8>;

    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }

    /// Zero-fills `bytes` logical bytes.
    fn write_padding(&mut self, bytes: usize) {
        for _ in 0..bytes {
            self.write_byte(0);
        }
    }

    fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_byte(value as u8);
        Ok(())
    }

    fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_byte(value);
        Ok(())
    }

    fn write_i8(&mut self, value: i8) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.write_bytes(&value.to_be_bytes());
        Ok(())
    }

    fn write_f32(&mut self, _value: f32) -> CodecResult<()> {
        Err(CodecError::unsupported("f32"))
    }

    fn write_f64(&mut self, _value: f64) -> CodecResult<()> {
        Err(CodecError::unsupported("f64"))
    }

    fn write_char(&mut self, _value: char) -> CodecResult<()> {
        Err(CodecError::unsupported("char"))
    }

    fn write_str(&mut self, _value: &str) -> CodecResult<()> {
        Err(CodecError::unsupported("string"))
    }

    fn write_seq_len(&mut self, _len: usize) -> CodecResult<()> {
        Err(CodecError::unsupported("collection"))
    }
}

/// Primitive reader mirroring [`BinaryEncoder`].
pub trait BinaryDecoder {
    fn scheme(&self) -> Scheme;

    fn read_byte(&mut self, field: &'static str) -> CodecResult<u8>;

    /// Output units left to read.
    fn remaining(&self) -> usize;

    fn read_bytes(&mut self, len: usize, field: &'static str) -> CodecResult<Vec<u8>> {
        (0..len).map(|_| self.read_byte(field)).collect()
    }

    /// Skips `bytes` logical bytes without interpreting them.
    fn skip(&mut self, bytes: usize, field: &'static str) -> CodecResult<()> {
        let units = bytes * self.scheme().units_per_byte();
        if units > self.remaining() {
            return Err(CodecError::InsufficientData {
                expected: units,
                actual: self.remaining(),
            });
        }
        for _ in 0..bytes {
            self.read_byte(field)?;
        }
        Ok(())
    }

    fn read_bool(&mut self, field: &'static str) -> CodecResult<bool> {
        match self.read_byte(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::invalid_value(field, format!("boolean byte {other}"))),
        }
    }

    fn read_u8(&mut self, field: &'static str) -> CodecResult<u8> {
        self.read_byte(field)
    }

    fn read_i8(&mut self, field: &'static str) -> CodecResult<i8> {
        Ok(self.read_byte(field)? as i8)
    }

    fn read_u16(&mut self, field: &'static str) -> CodecResult<u16> {
        Ok(u16::from_be_bytes(read_fixed(self, field)?))
    }

    fn read_i16(&mut self, field: &'static str) -> CodecResult<i16> {
        Ok(i16::from_be_bytes(read_fixed(self, field)?))
    }

    fn read_u32(&mut self, field: &'static str) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(read_fixed(self, field)?))
    }

    fn read_i32(&mut self, field: &'static str) -> CodecResult<i32> {
        Ok(i32::from_be_bytes(read_fixed(self, field)?))
    }

    fn read_u64(&mut self, field: &'static str) -> CodecResult<u64> {
        Ok(u64::from_be_bytes(read_fixed(self, field)?))
    }

    fn read_i64(&mut self, field: &'static str) -> CodecResult<i64> {
        Ok(i64::from_be_bytes(read_fixed(self, field)?))
    }
}

fn read_fixed<const N: usize, D>(decoder: &mut D, field: &'static str) -> CodecResult<[u8; N]>
where
    D: BinaryDecoder + ?Sized,
{
    let mut out = [0u8; N];
    for slot in out.iter_mut() {
        *slot = decoder.read_byte(field)?;
    }
    Ok(out)
}

/// One output unit per byte.
#[derive(Debug, Default)]
pub struct ByteEncoder {
    out: Vec<u8>,
}

impl ByteEncoder {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            out: Vec::with_capacity(bytes),
        }
    }
}

impl BinaryEncoder for ByteEncoder {
    fn scheme(&self) -> Scheme {
        Scheme::Bytes
    }

    fn write_byte(&mut self, byte: u8) {
        self.out.push(byte);
    }

    fn units(&self) -> usize {
        self.out.len()
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.out
    }
}

/// Eight output units per byte, most significant bit first.
#[derive(Debug, Default)]
pub struct BitEncoder {
    out: Vec<u8>,
}

impl BitEncoder {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            out: Vec::with_capacity(bytes * 8),
        }
    }
}

impl BinaryEncoder for BitEncoder {
    fn scheme(&self) -> Scheme {
        Scheme::Bits
    }

    fn write_byte(&mut self, byte: u8) {
        for shift in (0..8).rev() {
            self.out.push((byte >> shift) & 1);
        }
    }

    fn units(&self) -> usize {
        self.out.len()
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        self.out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ByteDecoder<'a> {
    units: &'a [u8],
    offset: usize,
}

impl<'a> ByteDecoder<'a> {
    pub fn new(units: &'a [u8]) -> Self {
        Self { units, offset: 0 }
    }
}

impl BinaryDecoder for ByteDecoder<'_> {
    fn scheme(&self) -> Scheme {
        Scheme::Bytes
    }

    fn read_byte(&mut self, _field: &'static str) -> CodecResult<u8> {
        let byte = *self.units.get(self.offset).ok_or(CodecError::InsufficientData {
            expected: self.offset + 1,
            actual: self.units.len(),
        })?;
        self.offset += 1;
        Ok(byte)
    }

    fn remaining(&self) -> usize {
        self.units.len().saturating_sub(self.offset)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BitDecoder<'a> {
    units: &'a [u8],
    offset: usize,
}

impl<'a> BitDecoder<'a> {
    pub fn new(units: &'a [u8]) -> Self {
        Self { units, offset: 0 }
    }
}

impl BinaryDecoder for BitDecoder<'_> {
    fn scheme(&self) -> Scheme {
        Scheme::Bits
    }

    fn read_byte(&mut self, field: &'static str) -> CodecResult<u8> {
        let end = self.offset + 8;
        let bits = self.units.get(self.offset..end).ok_or(CodecError::InsufficientData {
            expected: end,
            actual: self.units.len(),
        })?;
        let mut byte = 0u8;
        for (index, bit) in bits.iter().enumerate() {
            match bit {
                0 | 1 => byte = (byte << 1) | bit,
                other => {
                    return Err(CodecError::InvalidBit {
                        field,
                        offset: self.offset + index,
                        value: *other,
                    });
                }
            }
        }
        self.offset = end;
        Ok(byte)
    }

    fn remaining(&self) -> usize {
        self.units.len().saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_scheme_is_big_endian() {
        let mut enc = Scheme::Bytes.encoder(4);
        enc.write_u32(0x0102_0304).unwrap();
        assert_eq!(enc.finish(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn bit_scheme_expands_msb_first() {
        let mut enc = Scheme::Bits.encoder(1);
        enc.write_u8(0b1000_0101).unwrap();
        assert_eq!(enc.finish(), vec![1, 0, 0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn both_schemes_read_back_signed_values() {
        for scheme in [Scheme::Bytes, Scheme::Bits] {
            let mut enc = scheme.encoder(15);
            enc.write_i64(-42).unwrap();
            enc.write_i16(i16::MIN).unwrap();
            enc.write_i32(7).unwrap();
            enc.write_bool(true).unwrap();
            let units = enc.finish();
            assert_eq!(units.len(), 15 * scheme.units_per_byte());

            let mut dec = scheme.decoder(&units);
            assert_eq!(dec.read_i64("a").unwrap(), -42);
            assert_eq!(dec.read_i16("b").unwrap(), i16::MIN);
            assert_eq!(dec.read_i32("c").unwrap(), 7);
            assert!(dec.read_bool("d").unwrap());
            assert_eq!(dec.remaining(), 0);
        }
    }

    #[test]
    fn primitive_layer_refuses_unfixed_values() {
        for scheme in [Scheme::Bytes, Scheme::Bits] {
            let mut enc = scheme.encoder(0);
            assert_eq!(enc.write_f32(1.5), Err(CodecError::unsupported("f32")));
            assert_eq!(enc.write_f64(1.5), Err(CodecError::unsupported("f64")));
            assert_eq!(enc.write_char('x'), Err(CodecError::unsupported("char")));
            assert_eq!(enc.write_str("x"), Err(CodecError::unsupported("string")));
            assert_eq!(enc.write_seq_len(1), Err(CodecError::unsupported("collection")));
            assert_eq!(enc.units(), 0);
        }
    }

    #[test]
    fn bit_decoder_rejects_non_binary_units() {
        let units = [0, 1, 0, 2, 0, 0, 0, 0];
        let mut dec = Scheme::Bits.decoder(&units);
        assert!(matches!(
            dec.read_u8("flag"),
            Err(CodecError::InvalidBit { offset: 3, value: 2, .. })
        ));
    }

    #[test]
    fn short_input_is_insufficient() {
        let units = [0, 1];
        let mut dec = Scheme::Bytes.decoder(&units);
        assert!(matches!(dec.read_u32("len"), Err(CodecError::InsufficientData { .. })));
    }
}
