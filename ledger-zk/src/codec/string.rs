use crate::constants::STRING_FILLER;

use super::binary::{BinaryDecoder, BinaryEncoder};
use super::descriptor::{Charset, SizeDescriptor};
use super::error::{CodecError, CodecResult};
use super::FixedCodec;

/// String stored in a fixed byte budget.
///
/// Layout: encoded byte length as `u32`, the encoded bytes, then filler up to
/// the budget.
#[derive(Debug, Clone)]
pub struct FixedStringCodec {
    budget: usize,
    charset: Charset,
    descriptor: SizeDescriptor,
}

impl FixedStringCodec {
    pub fn new(budget: usize, charset: Charset) -> Self {
        Self {
            budget,
            charset,
            descriptor: SizeDescriptor::fixed_string(budget, charset),
        }
    }

    pub fn ascii(budget: usize) -> Self {
        Self::new(budget, Charset::Ascii)
    }

    pub fn utf8(budget: usize) -> Self {
        Self::new(budget, Charset::Utf8)
    }

    pub fn utf16(budget: usize) -> Self {
        Self::new(budget, Charset::Utf16)
    }

    pub fn utf32(budget: usize) -> Self {
        Self::new(budget, Charset::Utf32)
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    fn encode_chars(&self, value: &str) -> CodecResult<Vec<u8>> {
        let bytes = match self.charset {
            Charset::Ascii => {
                if let Some(ch) = value.chars().find(|ch| !ch.is_ascii()) {
                    return Err(CodecError::UnsupportedCharacter {
                        field: "string",
                        charset: self.charset,
                        ch,
                    });
                }
                value.as_bytes().to_vec()
            }
            Charset::Utf8 => value.as_bytes().to_vec(),
            Charset::Utf16 => value.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Charset::Utf32 => value.chars().flat_map(|ch| u32::from(ch).to_be_bytes()).collect(),
        };
        Ok(bytes)
    }

    fn decode_chars(&self, bytes: Vec<u8>) -> CodecResult<String> {
        match self.charset {
            Charset::Ascii => {
                if let Some(byte) = bytes.iter().find(|byte| !byte.is_ascii()) {
                    return Err(CodecError::invalid_value(
                        "string",
                        format!("byte {byte:#04x} is not ASCII"),
                    ));
                }
                String::from_utf8(bytes).map_err(|err| CodecError::invalid_value("string", err.to_string()))
            }
            Charset::Utf8 => {
                String::from_utf8(bytes).map_err(|err| CodecError::invalid_value("string", err.to_string()))
            }
            Charset::Utf16 => {
                if bytes.len() % 2 != 0 {
                    return Err(CodecError::invalid_value("string", "odd UTF-16 byte length"));
                }
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16(&units).map_err(|err| CodecError::invalid_value("string", err.to_string()))
            }
            Charset::Utf32 => {
                if bytes.len() % 4 != 0 {
                    return Err(CodecError::invalid_value("string", "UTF-32 length not a multiple of 4"));
                }
                bytes
                    .chunks_exact(4)
                    .map(|quad| {
                        let scalar = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
                        char::from_u32(scalar).ok_or_else(|| {
                            CodecError::invalid_value("string", format!("{scalar:#x} is not a scalar value"))
                        })
                    })
                    .collect()
            }
        }
    }
}

impl FixedCodec for FixedStringCodec {
    type Value = String;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> String {
        String::new()
    }

    fn write(&self, value: &String, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        let bytes = self.encode_chars(value)?;
        if bytes.len() > self.budget {
            return Err(CodecError::StringTooLong {
                field: "string",
                charset: self.charset,
                budget: self.budget,
                actual: bytes.len(),
            });
        }
        out.write_u32(bytes.len() as u32)?;
        out.write_bytes(&bytes);
        for _ in bytes.len()..self.budget {
            out.write_byte(STRING_FILLER);
        }
        Ok(())
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<String> {
        let len = input.read_u32("string length")? as usize;
        if len > self.budget {
            return Err(CodecError::invalid_value(
                "string length",
                format!("{len} exceeds budget {}", self.budget),
            ));
        }
        let bytes = input.read_bytes(len, "string")?;
        input.skip(self.budget - len, "string filler")?;
        self.decode_chars(bytes)
    }
}

/// Raw bytes stored in a fixed capacity, zero padded.
#[derive(Debug, Clone)]
pub struct FixedBytesCodec {
    capacity: usize,
    descriptor: SizeDescriptor,
}

impl FixedBytesCodec {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            descriptor: SizeDescriptor::fixed_bytes(capacity),
        }
    }
}

impl FixedCodec for FixedBytesCodec {
    type Value = Vec<u8>;

    fn descriptor(&self) -> &SizeDescriptor {
        &self.descriptor
    }

    fn default_value(&self) -> Vec<u8> {
        Vec::new()
    }

    fn write(&self, value: &Vec<u8>, out: &mut dyn BinaryEncoder) -> CodecResult<()> {
        if value.len() > self.capacity {
            return Err(CodecError::CapacityExceeded {
                field: "bytes",
                capacity: self.capacity,
                actual: value.len(),
            });
        }
        out.write_u32(value.len() as u32)?;
        out.write_bytes(value);
        out.write_padding(self.capacity - value.len());
        Ok(())
    }

    fn read(&self, input: &mut dyn BinaryDecoder) -> CodecResult<Vec<u8>> {
        let len = input.read_u32("bytes length")? as usize;
        if len > self.capacity {
            return Err(CodecError::invalid_value(
                "bytes length",
                format!("{len} exceeds capacity {}", self.capacity),
            ));
        }
        let bytes = input.read_bytes(len, "bytes")?;
        input.skip(self.capacity - len, "bytes padding")?;
        Ok(bytes)
    }
}
