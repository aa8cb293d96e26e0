//! Codec contract: wire bytes ⇄ objects.
//!
//! The routing engine never looks inside a payload beyond what a codec
//! hands back. Implementations live in `kindserve-server`.

use thiserror::Error;

use crate::meta::{GroupVersionKind, Object, ObjectList, PartialObject};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The payload is not syntactically valid for this codec.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The payload names a kind the type registry does not know.
    #[error("no kind {0:?} is registered")]
    UnknownType(String),

    #[error("encoding failed: {0}")]
    Encode(String),
}

pub trait Codec: Send + Sync {
    /// `Content-Type` of encoded payloads.
    fn content_type(&self) -> &'static str;

    /// Fully decode one object.
    ///
    /// When the payload carries no `apiVersion`/`kind`, `default_gvk` is
    /// assumed. The resulting kind must be registered.
    fn decode(
        &self,
        data: &[u8],
        default_gvk: Option<&GroupVersionKind>,
    ) -> Result<Object, CodecError>;

    /// Decode every top-level value in `data` down to type and identity
    /// only. The caller decides how many partial objects are acceptable.
    fn decode_partial(&self, data: &[u8]) -> Result<Vec<PartialObject>, CodecError>;

    fn encode_object(&self, obj: &Object) -> Result<Vec<u8>, CodecError>;

    fn encode_list(&self, list: &ObjectList) -> Result<Vec<u8>, CodecError>;

    /// Fill in default field values for the object's kind.
    fn default(&self, obj: &mut Object) -> Result<(), CodecError>;
}
