use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::CodecError;

/// Turns text into the bytes stored on a watch node and back.
pub trait PayloadCodec: Debug + Send + Sync {
    fn encode(&self, text: &str) -> Vec<u8>;

    fn decode(&self, payload: &[u8]) -> Result<String, CodecError>;
}

pub type SharedCodec = Arc<dyn PayloadCodec>;

/// Payload is the raw UTF-8 text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Utf8Codec;

impl PayloadCodec for Utf8Codec {
    fn encode(&self, text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    fn decode(&self, payload: &[u8]) -> Result<String, CodecError> {
        Ok(String::from_utf8(payload.to_vec())?)
    }
}

/// Payload is a single JSON string literal.
#[cfg(feature = "json")]
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStringCodec;

#[cfg(feature = "json")]
impl PayloadCodec for JsonStringCodec {
    fn encode(&self, text: &str) -> Vec<u8> {
        // Serializing a &str cannot fail.
        serde_json::to_vec(text).unwrap_or_default()
    }

    fn decode(&self, payload: &[u8]) -> Result<String, CodecError> {
        Ok(serde_json::from_slice::<String>(payload)?)
    }
}

pub type CodecFactory = fn() -> SharedCodec;

/// Name to constructor mapping used to resolve the `serializer` option.
///
/// Unknown or blank names resolve to the default entry.
#[derive(Clone)]
pub struct CodecRegistry {
    factories: HashMap<String, CodecFactory>,
    default_name: &'static str,
}

pub const UTF8_CODEC: &str = "utf8";
#[cfg(feature = "json")]
pub const JSON_CODEC: &str = "json";

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = CodecRegistry {
            factories: HashMap::new(),
            default_name: UTF8_CODEC,
        };
        registry.register(UTF8_CODEC, || Arc::new(Utf8Codec) as SharedCodec);
        #[cfg(feature = "json")]
        registry.register(JSON_CODEC, || Arc::new(JsonStringCodec) as SharedCodec);
        registry
    }
}

impl CodecRegistry {
    /// Add or replace a named codec.
    pub fn register(&mut self, name: impl Into<String>, factory: CodecFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn resolve(&self, name: Option<&str>) -> SharedCodec {
        let name = name.map(str::trim).filter(|name| !name.is_empty());
        if let Some(name) = name {
            match self.factories.get(name) {
                Some(factory) => return factory(),
                None => warn!(serializer = name, "no payload codec registered under this name"),
            }
        }
        info!(codec = self.default_name, "using default payload codec");
        self.default_codec()
    }

    fn default_codec(&self) -> SharedCodec {
        self.factories
            .get(self.default_name)
            .map(|factory| factory())
            .unwrap_or_else(|| Arc::new(Utf8Codec))
    }
}
