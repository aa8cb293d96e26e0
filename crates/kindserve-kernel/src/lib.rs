//! `kindserve-kernel`: contracts and pure algorithms for the generic
//! resource API.
//!
//! No HTTP types live here. The kernel describes *what* a resource kind is
//! and how its instances are addressed; `kindserve-server` turns that into
//! routes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              kindserve-kernel  (this crate)                 │
//! │  Scheme + KindCapabilities    KindDescriptor                │
//! │  identity::resolve            PartialObject                 │
//! │  Codec trait                  ObjectStore trait             │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              kindserve-server  (runtime crate)              │
//! │  ApiGroupsRegistry / GroupVersionHandler / ResourceHandler  │
//! │  request context chain, hook pipelines, axum wiring         │
//! │  InMemoryStore, JsonCodec                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use kindserve_kernel::identity;
//! use kindserve_kernel::meta::{GroupVersionKind, KindDescriptor};
//! use kindserve_kernel::scheme::{KindCapabilities, Scheme};
//!
//! let mut scheme = Scheme::new();
//! scheme
//!     .register(
//!         GroupVersionKind::new("g", "v1", "Widget"),
//!         KindCapabilities::new().namespaced(),
//!     )
//!     .unwrap();
//!
//! let gvk = GroupVersionKind::new("g", "v1", "Widget");
//! let descriptor = KindDescriptor::for_kind(&gvk, scheme.capabilities(&gvk).unwrap());
//! assert_eq!(descriptor.resource, "widgets");
//!
//! let key = identity::resolve(&descriptor, Some("ns1"), Some("a")).unwrap();
//! assert_eq!(key.identifier.to_string(), "ns1/a");
//! ```

pub mod codec;
pub mod identity;
pub mod meta;
pub mod scheme;
pub mod store;

pub use codec::{Codec, CodecError};
pub use identity::{Identifier, IdentityError, ObjectKey};
pub use meta::{
    GroupVersion, GroupVersionKind, KindDescriptor, Object, ObjectList, ObjectMeta, PartialObject,
    TypeMeta,
};
pub use scheme::{KindCapabilities, Scheme, SchemeError};
pub use store::{ListFilter, ObjectStore, StoreError, StoreResult};
