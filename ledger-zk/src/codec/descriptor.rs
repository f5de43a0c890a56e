//! Structural size descriptors.
//!
//! A descriptor is built from a type's declared shape and bounds, never from a
//! value. Every codec owns one, and every encoding it produces is exactly
//! `descriptor.len(scheme)` units long.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{ENUM_ORDINAL_BYTES, LENGTH_PREFIX_BYTES};

use super::binary::Scheme;

/// Fixed-width primitive kinds understood by the binary schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
}

impl PrimitiveKind {
    /// Width in bytes under the byte-packed scheme.
    pub const fn byte_width(self) -> usize {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::U8 | PrimitiveKind::I8 => 1,
            PrimitiveKind::U16 | PrimitiveKind::I16 => 2,
            PrimitiveKind::U32 | PrimitiveKind::I32 => 4,
            PrimitiveKind::U64 | PrimitiveKind::I64 => 8,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::I64 => "i64",
        };
        f.write_str(name)
    }
}

/// Character sets accepted by fixed-byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Charset {
    Ascii,
    Utf8,
    /// Big-endian code units.
    Utf16,
    /// Big-endian scalar values.
    Utf32,
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Charset::Ascii => write!(f, "ASCII"),
            Charset::Utf8 => write!(f, "UTF-8"),
            Charset::Utf16 => write!(f, "UTF-16"),
            Charset::Utf32 => write!(f, "UTF-32"),
        }
    }
}

/// Shape recorded alongside the size, mostly for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Primitive { kind: PrimitiveKind },
    Nullable,
    FixedList { capacity: usize },
    FixedBytes { capacity: usize },
    FixedString { budget: usize, charset: Charset },
    Enum { variants: usize },
    Composite { name: String },
}

/// Exact serialized size of a type, with the descriptors of its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDescriptor {
    #[serde(flatten)]
    shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    byte_size: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<SizeDescriptor>,
}

/// Rejects sizes whose byte or bit length would not fit in `usize`.
fn checked_size(size: Option<usize>, shape: &str) -> usize {
    match size.filter(|bytes| bytes.checked_mul(8).is_some()) {
        Some(bytes) => bytes,
        None => panic!("{shape} size overflows usize"),
    }
}

/// Constructors panic when the declared bounds describe more bits than
/// `usize` can count. Bounds are fixed per type, so this is a programming
/// error rather than a runtime condition.
impl SizeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self {
            shape: Shape::Primitive { kind },
            label: None,
            byte_size: kind.byte_width(),
            children: Vec::new(),
        }
    }

    /// Presence marker followed by the inner slot, which is written even when absent.
    pub fn nullable(inner: SizeDescriptor) -> Self {
        Self {
            shape: Shape::Nullable,
            label: None,
            byte_size: checked_size(
                inner.byte_size.checked_add(PrimitiveKind::Bool.byte_width()),
                "nullable",
            ),
            children: vec![inner],
        }
    }

    /// Element count prefix followed by `capacity` element slots.
    pub fn fixed_list(capacity: usize, element: SizeDescriptor) -> Self {
        Self {
            shape: Shape::FixedList { capacity },
            label: None,
            byte_size: checked_size(
                capacity
                    .checked_mul(element.byte_size)
                    .and_then(|slots| slots.checked_add(LENGTH_PREFIX_BYTES)),
                "fixed list",
            ),
            children: vec![element],
        }
    }

    /// Byte count prefix followed by `capacity` raw bytes.
    pub fn fixed_bytes(capacity: usize) -> Self {
        Self {
            shape: Shape::FixedBytes { capacity },
            label: None,
            byte_size: checked_size(capacity.checked_add(LENGTH_PREFIX_BYTES), "fixed bytes"),
            children: Vec::new(),
        }
    }

    /// Byte count prefix followed by a `budget`-byte slot in the given charset.
    pub fn fixed_string(budget: usize, charset: Charset) -> Self {
        Self {
            shape: Shape::FixedString { budget, charset },
            label: None,
            byte_size: checked_size(budget.checked_add(LENGTH_PREFIX_BYTES), "fixed string"),
            children: Vec::new(),
        }
    }

    /// Ordinal of the variant; identical for every variant.
    pub fn enumeration(variants: usize) -> Self {
        Self {
            shape: Shape::Enum { variants },
            label: None,
            byte_size: ENUM_ORDINAL_BYTES,
            children: Vec::new(),
        }
    }

    /// Product type: its fields laid out back to back in declaration order.
    pub fn composite<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, SizeDescriptor)>,
        S: Into<String>,
    {
        let children: Vec<SizeDescriptor> = fields
            .into_iter()
            .map(|(label, field)| field.with_label(label))
            .collect();
        Self {
            shape: Shape::Composite { name: name.into() },
            label: None,
            byte_size: checked_size(
                children
                    .iter()
                    .try_fold(0usize, |total, child| total.checked_add(child.byte_size)),
                "composite",
            ),
            children,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn children(&self) -> &[SizeDescriptor] {
        &self.children
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn bit_size(&self) -> usize {
        self.byte_size * 8
    }

    /// Encoded length in output units for the given scheme.
    pub fn len(&self, scheme: Scheme) -> usize {
        self.byte_size * scheme.units_per_byte()
    }

    pub fn is_empty(&self) -> bool {
        self.byte_size == 0
    }
}

impl fmt::Display for SizeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        match &self.shape {
            Shape::Primitive { kind } => write!(f, "{kind}")?,
            Shape::Nullable => write!(f, "nullable")?,
            Shape::FixedList { capacity } => write!(f, "list[{capacity}]")?,
            Shape::FixedBytes { capacity } => write!(f, "bytes[{capacity}]")?,
            Shape::FixedString { budget, charset } => write!(f, "{charset} string[{budget}]")?,
            Shape::Enum { variants } => write!(f, "enum({variants})")?,
            Shape::Composite { name } => write!(f, "{name}")?,
        }
        write!(f, " ({} bytes)", self.byte_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_sizes_add_up_without_a_value() {
        let amount = SizeDescriptor::composite(
            "Amount",
            [
                ("quantity", SizeDescriptor::primitive(PrimitiveKind::I64)),
                ("token", SizeDescriptor::fixed_string(8, Charset::Ascii)),
            ],
        );
        assert_eq!(amount.byte_size(), 8 + 4 + 8);

        let owners = SizeDescriptor::fixed_list(3, SizeDescriptor::fixed_bytes(32));
        assert_eq!(owners.byte_size(), 4 + 3 * (4 + 32));

        let maybe = SizeDescriptor::nullable(amount.clone());
        assert_eq!(maybe.byte_size(), 1 + amount.byte_size());
        assert_eq!(maybe.bit_size(), 8 * maybe.byte_size());
    }

    #[test]
    fn enum_width_ignores_variant_count() {
        assert_eq!(
            SizeDescriptor::enumeration(2).byte_size(),
            SizeDescriptor::enumeration(200).byte_size()
        );
    }

    #[test]
    fn scheme_scales_length() {
        let desc = SizeDescriptor::primitive(PrimitiveKind::U32);
        assert_eq!(desc.len(Scheme::Bytes), 4);
        assert_eq!(desc.len(Scheme::Bits), 32);
    }

    #[test]
    #[should_panic(expected = "fixed list size overflows")]
    fn oversized_list_bounds_panic_at_construction() {
        SizeDescriptor::fixed_list(usize::MAX / 4, SizeDescriptor::fixed_bytes(32));
    }

    #[test]
    fn largest_representable_bytes_still_scale_to_bits() {
        let desc = SizeDescriptor::fixed_bytes(usize::MAX / 8 - LENGTH_PREFIX_BYTES);
        assert_eq!(desc.bit_size(), (usize::MAX / 8) * 8);
    }

    #[test]
    #[should_panic(expected = "fixed bytes size overflows")]
    fn bytes_beyond_bit_range_panic() {
        SizeDescriptor::fixed_bytes(usize::MAX / 8);
    }

    #[test]
    fn composite_labels_children() {
        let desc = SizeDescriptor::composite("Pair", [("a", SizeDescriptor::primitive(PrimitiveKind::U8))]);
        assert_eq!(desc.children()[0].label(), Some("a"));
        assert_eq!(desc.to_string(), "Pair (1 bytes)");
    }
}
