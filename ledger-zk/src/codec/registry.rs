use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use super::binary::Scheme;
use super::descriptor::SizeDescriptor;
use super::error::{CodecError, CodecResult};
use super::FixedCodec;

/// Type-erased handle to a codec for `T`.
pub type SharedCodec<T> = Arc<dyn FixedCodec<Value = T> + Send + Sync>;

/// Lookup table from a Rust type to the codec that serializes it.
///
/// Built once at startup and passed to whatever assembles witnesses.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `codec` for its value type, replacing any earlier entry.
    pub fn register<C>(&mut self, codec: C) -> &mut Self
    where
        C: FixedCodec + Send + Sync + 'static,
        C::Value: 'static,
    {
        let shared: SharedCodec<C::Value> = Arc::new(codec);
        self.codecs.insert(TypeId::of::<C::Value>(), Box::new(shared));
        self
    }

    pub fn get<T: 'static>(&self) -> Option<SharedCodec<T>> {
        self.codecs
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<SharedCodec<T>>())
            .cloned()
    }

    pub fn require<T: 'static>(&self) -> CodecResult<SharedCodec<T>> {
        self.get::<T>().ok_or(CodecError::UnregisteredType {
            type_name: type_name::<T>(),
        })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.codecs.contains_key(&TypeId::of::<T>())
    }

    pub fn descriptor<T: 'static>(&self) -> CodecResult<SizeDescriptor> {
        Ok(self.require::<T>()?.descriptor().clone())
    }

    pub fn encode<T: 'static>(&self, value: &T, scheme: Scheme) -> CodecResult<Vec<u8>> {
        self.require::<T>()?.encode(value, scheme)
    }

    pub fn decode<T: 'static>(&self, units: &[u8], scheme: Scheme) -> CodecResult<T> {
        self.require::<T>()?.decode(units, scheme)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
