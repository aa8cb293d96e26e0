//! Request context chain.
//!
//! Every request is enriched layer by layer, each layer owning the one
//! beneath it:
//!
//! ```text
//! StorageContext            store/codec/scheme handles, headers, params, body, warnings
//!   └─ ResourceContext      + KindDescriptor, conditional-defaulting writer
//!        ├─ NamespacedResourceContext   + required {namespace}
//!        └─ NamedResourceContext<S>     + required {name} (or singleton) → ObjectKey
//! ```
//!
//! Handlers take the concrete layer they need; hooks and sub-resources see
//! it through the [`ResourceScope`] / [`NamedScope`] traits. Nothing here
//! outlives the request.

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_TYPE, WARNING},
    },
    response::{IntoResponse, Response},
};
use kindserve_kernel::{
    Codec, KindDescriptor, Object, ObjectKey, ObjectList, ObjectStore, Scheme,
    identity::{self, KindKey},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Request header that toggles response defaulting. Absent or `"true"`
/// means enabled, anything else disables it.
pub const DEFAULT_HEADER: &str = "default";

pub const NAMESPACE_PARAM: &str = "namespace";
pub const NAME_PARAM: &str = "name";

// ─────────────────────────────────────────────────────────────────────────────
// Shared handles
// ─────────────────────────────────────────────────────────────────────────────

/// Collaborators shared by every request. Read-only after startup.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ObjectStore>,
    pub codec: Arc<dyn Codec>,
    pub scheme: Arc<Scheme>,
}

impl ApiState {
    pub fn new(store: Arc<dyn ObjectStore>, codec: Arc<dyn Codec>, scheme: Arc<Scheme>) -> Self {
        Self {
            store,
            codec,
            scheme,
        }
    }
}

/// The parts of an inbound request the context chain cares about.
///
/// Path parameters are optional here; each layer decides which ones it
/// requires.
pub struct RawRequest {
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub body: Bytes,
}

impl<S> FromRequest<S> for RawRequest
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();
        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let headers = parts.headers.clone();
        // `Bytes` honours `DefaultBodyLimit`
        let body = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| ApiError::status(rejection.status(), rejection.body_text()))?;
        Ok(Self {
            headers,
            params,
            body,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StorageContext
// ─────────────────────────────────────────────────────────────────────────────

pub struct StorageContext {
    state: ApiState,
    request_id: Uuid,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
    warnings: Mutex<Vec<String>>,
}

impl StorageContext {
    pub fn new(state: ApiState, raw: RawRequest) -> Self {
        Self {
            state,
            request_id: Uuid::new_v4(),
            headers: raw.headers,
            params: raw.params,
            body: raw.body,
            warnings: Mutex::new(Vec::new()),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.state.store.as_ref()
    }

    pub fn codec(&self) -> &dyn Codec {
        self.state.codec.as_ref()
    }

    pub fn scheme(&self) -> &Scheme {
        &self.state.scheme
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// A non-empty path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The raw request body, read exactly once.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Queue a caller-visible `Warning` header. Non-fatal.
    pub fn warn(&self, msg: impl Into<String>) {
        self.warnings.lock().push(msg.into());
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    /// Attach queued warnings to an outgoing response.
    fn finish(&self, mut response: Response) -> Response {
        for msg in self.warnings.lock().iter() {
            if let Ok(value) = HeaderValue::from_str(&format!("299 - {msg:?}")) {
                response.headers_mut().append(WARNING, value);
            }
        }
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scopes
// ─────────────────────────────────────────────────────────────────────────────

/// Read access to a resource-level context, whatever its depth.
pub trait ResourceScope: Send + Sync {
    fn resource_context(&self) -> &ResourceContext;

    /// The namespace this request is scoped to, if any.
    fn namespace(&self) -> Option<&str> {
        None
    }

    fn storage(&self) -> &StorageContext {
        &self.resource_context().storage
    }

    fn descriptor(&self) -> &KindDescriptor {
        &self.resource_context().descriptor
    }

    fn kind_key(&self) -> KindKey {
        self.descriptor().gvk()
    }

    fn warn(&self, msg: &str) {
        self.storage().warn(msg);
    }
}

/// A scope that has resolved the addressed object.
pub trait NamedScope: ResourceScope {
    /// `None` for singletons.
    fn name(&self) -> Option<&str>;

    fn object_key(&self) -> &ObjectKey;
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceContext
// ─────────────────────────────────────────────────────────────────────────────

pub struct ResourceContext {
    storage: StorageContext,
    descriptor: Arc<KindDescriptor>,
}

impl ResourceContext {
    pub fn new(storage: StorageContext, descriptor: Arc<KindDescriptor>) -> Self {
        Self {
            storage,
            descriptor,
        }
    }

    pub fn should_default(&self) -> bool {
        match self.storage.header(DEFAULT_HEADER) {
            None => true,
            Some(value) => value.is_empty() || value == "true",
        }
    }

    /// Encode `obj`, defaulting it first unless the caller opted out.
    pub fn respond_object(&self, status: StatusCode, mut obj: Object) -> ApiResult<Response> {
        let codec = self.storage.codec();
        if self.should_default() {
            codec.default(&mut obj)?;
        }
        let body = codec.encode_object(&obj)?;
        Ok(self.respond_bytes(status, body))
    }

    /// Encode a `List` of `items`, defaulting each item unless the caller
    /// opted out.
    pub fn respond_list(&self, mut items: Vec<Object>) -> ApiResult<Response> {
        let codec = self.storage.codec();
        if self.should_default() {
            for item in &mut items {
                codec.default(item)?;
            }
        }
        let list = ObjectList::new(&self.descriptor.group_version(), items);
        let body = codec.encode_list(&list)?;
        Ok(self.respond_bytes(StatusCode::OK, body))
    }

    pub fn respond_empty(&self, status: StatusCode) -> Response {
        self.storage.finish(status.into_response())
    }

    fn respond_bytes(&self, status: StatusCode, body: Vec<u8>) -> Response {
        let content_type = self.storage.codec().content_type();
        self.storage
            .finish((status, [(CONTENT_TYPE, content_type)], body).into_response())
    }
}

impl ResourceScope for ResourceContext {
    fn resource_context(&self) -> &ResourceContext {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NamespacedResourceContext
// ─────────────────────────────────────────────────────────────────────────────

pub struct NamespacedResourceContext {
    resource: ResourceContext,
    namespace: String,
}

impl NamespacedResourceContext {
    /// Requires a non-empty `{namespace}` path parameter.
    pub fn new(resource: ResourceContext) -> ApiResult<Self> {
        let namespace = resource
            .storage
            .param(NAMESPACE_PARAM)
            .ok_or_else(|| ApiError::bad_request("namespace parameter is mandatory"))?
            .to_string();
        Ok(Self {
            resource,
            namespace,
        })
    }
}

impl ResourceScope for NamespacedResourceContext {
    fn resource_context(&self) -> &ResourceContext {
        &self.resource
    }

    fn namespace(&self) -> Option<&str> {
        Some(&self.namespace)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NamedResourceContext
// ─────────────────────────────────────────────────────────────────────────────

pub struct NamedResourceContext<S> {
    scope: S,
    name: Option<String>,
    key: ObjectKey,
}

impl<S: ResourceScope> NamedResourceContext<S> {
    /// Resolve the addressed object: the singleton key for singleton kinds,
    /// otherwise the required `{name}` path parameter combined with the
    /// scope's namespace.
    pub fn new(scope: S) -> ApiResult<Self> {
        let descriptor = scope.descriptor();
        if descriptor.singleton {
            let key = identity::singleton_key(descriptor);
            return Ok(Self {
                scope,
                name: None,
                key,
            });
        }

        let name = scope
            .storage()
            .param(NAME_PARAM)
            .ok_or_else(|| ApiError::bad_request("name parameter is mandatory"))?
            .to_string();
        let key = identity::resolve(descriptor, scope.namespace(), Some(&name))?;
        Ok(Self {
            scope,
            name: Some(name),
            key,
        })
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }
}

impl<S: ResourceScope> ResourceScope for NamedResourceContext<S> {
    fn resource_context(&self) -> &ResourceContext {
        self.scope.resource_context()
    }

    fn namespace(&self) -> Option<&str> {
        self.scope.namespace()
    }
}

impl<S: ResourceScope> NamedScope for NamedResourceContext<S> {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn object_key(&self) -> &ObjectKey {
        &self.key
    }
}
