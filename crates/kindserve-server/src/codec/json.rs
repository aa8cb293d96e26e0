//! JSON [`Codec`] over the kinds a [`Scheme`] knows.

use kindserve_kernel::{
    Codec, CodecError, GroupVersionKind, Object, ObjectList, PartialObject, Scheme, TypeMeta,
};
use std::sync::Arc;

/// JSON wire format for every kind registered in a [`Scheme`].
pub struct JsonCodec {
    scheme: Arc<Scheme>,
}

impl JsonCodec {
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self { scheme }
    }
}

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn decode(
        &self,
        data: &[u8],
        default_gvk: Option<&GroupVersionKind>,
    ) -> Result<Object, CodecError> {
        let mut obj: Object =
            serde_json::from_slice(data).map_err(|e| CodecError::Malformed(e.to_string()))?;

        if obj.types.is_empty() {
            if let Some(gvk) = default_gvk {
                obj.types = TypeMeta::from(gvk);
            }
        }
        if obj.types.api_version.is_empty() || obj.types.kind.is_empty() {
            return Err(CodecError::Malformed(
                "apiVersion and kind must both be set".into(),
            ));
        }
        let gvk = obj.gvk().ok_or_else(|| {
            CodecError::Malformed(format!("invalid apiVersion {:?}", obj.types.api_version))
        })?;
        if !self.scheme.recognizes(&gvk) {
            return Err(CodecError::UnknownType(gvk.to_string()));
        }
        Ok(obj)
    }

    fn decode_partial(&self, data: &[u8]) -> Result<Vec<PartialObject>, CodecError> {
        serde_json::Deserializer::from_slice(data)
            .into_iter::<PartialObject>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CodecError::Malformed(e.to_string()))
    }

    fn encode_object(&self, obj: &Object) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(obj).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn encode_list(&self, list: &ObjectList) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(list).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn default(&self, obj: &mut Object) -> Result<(), CodecError> {
        self.scheme
            .default_object(obj)
            .map_err(|e| CodecError::UnknownType(e.to_string()))
    }
}
