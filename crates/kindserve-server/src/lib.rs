//! `kindserve-server`: generic CRUD REST front-end.
//!
//! Turns the kernel contracts of `kindserve-kernel` into axum routes:
//!
//! | Kernel contract | Implementation |
//! |-----------------|----------------|
//! | [`ObjectStore`](kindserve_kernel::ObjectStore) | [`store::InMemoryStore`] |
//! | [`Codec`](kindserve_kernel::Codec) | [`codec::JsonCodec`] |
//!
//! [`ApiGroupsRegistry`] builds one [`GroupVersionHandler`] per served
//! group-version and one [`ResourceHandler`] per kind. Every request passes
//! through the [`context`] chain before reaching a handler operation.
//! [`server::RestServer`] wires it all into a service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use kindserve_kernel::{GroupVersionKind, KindCapabilities, Scheme};
//! use kindserve_server::{
//!     codec::JsonCodec, config::ServerConfig, server::RestServer, store::InMemoryStore,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut scheme = Scheme::new();
//!     scheme.register(
//!         GroupVersionKind::new("example.dev", "v1", "Widget"),
//!         KindCapabilities::new().namespaced(),
//!     )?;
//!     let scheme = Arc::new(scheme);
//!
//!     let server = RestServer::new(
//!         ServerConfig::default(),
//!         scheme.clone(),
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(JsonCodec::new(scheme)),
//!     );
//!     server.listen().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod demo;
pub mod error;
pub mod group;
pub mod hooks;
pub mod registry;
pub mod resource;
pub mod router;
pub mod server;
pub mod store;

pub use context::{
    ApiState, NamedResourceContext, NamedScope, NamespacedResourceContext, ResourceContext,
    ResourceScope, StorageContext,
};
pub use error::{ApiError, ApiResult};
pub use group::GroupVersionHandler;
pub use hooks::{NamedHook, NamedSubResource, ObjectHook, SubResource};
pub use registry::ApiGroupsRegistry;
pub use resource::ResourceHandler;
