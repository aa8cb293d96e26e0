//! Per-kind CRUD handler.
//!
//! A [`ResourceHandler`] owns one [`KindDescriptor`], its hook pipelines and
//! its sub-resources, and knows how to mount itself under a group-version
//! prefix. Route shapes:
//!
//! | kind        | routes                                                        |
//! |-------------|---------------------------------------------------------------|
//! | cluster     | `GET POST PUT PATCH /r/`, `GET DELETE /r/{name}/`             |
//! | namespaced  | `GET POST PUT PATCH /r/` and `/namespaces/{namespace}/r/`,    |
//! |             | `GET DELETE /namespaces/{namespace}/r/{name}/`                |
//! | singleton   | `GET PATCH /r/`                                               |

use axum::{
    http::{Method, StatusCode},
    response::Response,
};
use kindserve_kernel::{
    KindDescriptor, ListFilter, Object, ObjectKey, PartialObject, StoreError, identity,
};
use std::future::Future;
use std::sync::Arc;

use crate::context::{
    ApiState, NamedResourceContext, NamedScope, NamespacedResourceContext, RawRequest,
    ResourceContext, ResourceScope, StorageContext,
};
use crate::error::{ApiError, ApiResult};
use crate::hooks::{HookPipeline, NamedHook, NamedSubResource, ObjectHook, SubResource};
use crate::router::{RouteError, RouteTable};
use crate::store::merge_patch;

pub struct ResourceHandler {
    descriptor: Arc<KindDescriptor>,
    post_hooks: HookPipeline<dyn ObjectHook>,
    put_hooks: HookPipeline<dyn ObjectHook>,
    delete_hooks: HookPipeline<dyn NamedHook>,
    sub_resources: Vec<(String, Arc<dyn SubResource>)>,
    named_sub_resources: Vec<(String, Arc<dyn NamedSubResource>)>,
}

impl ResourceHandler {
    pub fn new(descriptor: KindDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            post_hooks: HookPipeline::default(),
            put_hooks: HookPipeline::default(),
            delete_hooks: HookPipeline::default(),
            sub_resources: Vec::new(),
            named_sub_resources: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &KindDescriptor {
        &self.descriptor
    }

    // ── registration ────────────────────────────────────────────────────────

    /// Runs before every create.
    pub fn register_post_hook(&mut self, hook: impl ObjectHook + 'static) {
        self.post_hooks.push(Arc::new(hook));
    }

    /// Runs before every full replace.
    pub fn register_put_hook(&mut self, hook: impl ObjectHook + 'static) {
        self.put_hooks.push(Arc::new(hook));
    }

    /// Runs before every delete, ahead of the store call.
    pub fn register_delete_hook(&mut self, hook: impl NamedHook + 'static) {
        self.delete_hooks.push(Arc::new(hook));
    }

    /// Mount `PUT <resource>/<name>/`.
    pub fn register_sub_resource(
        &mut self,
        name: impl Into<String>,
        sub: impl SubResource + 'static,
    ) {
        self.sub_resources.push((name.into(), Arc::new(sub)));
    }

    /// Mount `PUT <resource>/{name}/<name>/`. For singletons the object path
    /// is the resource path itself.
    pub fn register_named_sub_resource(
        &mut self,
        name: impl Into<String>,
        sub: impl NamedSubResource + 'static,
    ) {
        self.named_sub_resources.push((name.into(), Arc::new(sub)));
    }

    // ── operations ──────────────────────────────────────────────────────────

    /// All objects of this kind, narrowed to the context's namespace if it
    /// carries one.
    pub async fn list<C: ResourceScope>(&self, ctx: &C) -> ApiResult<Response> {
        let filters: Vec<ListFilter> = ctx
            .namespace()
            .map(|ns| ListFilter::Namespace(ns.to_string()))
            .into_iter()
            .collect();
        let items = ctx
            .storage()
            .store()
            .list(&ctx.kind_key(), &filters)
            .await?;
        ctx.resource_context().respond_list(items)
    }

    pub async fn create<C: ResourceScope>(&self, ctx: &C) -> ApiResult<Response> {
        let mut obj = self.decode_body(ctx)?;
        identity::resolve(&self.descriptor, obj.namespace(), obj.name())?;
        self.post_hooks.run(ctx, &mut obj).await?;

        // hooks may have rewritten the identity
        let key = identity::resolve(&self.descriptor, obj.namespace(), obj.name())?;
        ctx.storage().store().create(&key, &obj).await?;
        tracing::info!(
            kind = %self.descriptor.kind,
            id = %key.identifier,
            request_id = %ctx.storage().request_id(),
            "object created"
        );
        ctx.resource_context()
            .respond_object(StatusCode::CREATED, obj)
    }

    pub async fn update<C: ResourceScope>(&self, ctx: &C) -> ApiResult<Response> {
        let mut obj = self.decode_body(ctx)?;
        identity::resolve(&self.descriptor, obj.namespace(), obj.name())?;
        self.put_hooks.run(ctx, &mut obj).await?;

        // hooks may have rewritten the identity
        let key = identity::resolve(&self.descriptor, obj.namespace(), obj.name())?;
        ctx.storage().store().update(&key, &obj).await?;
        tracing::info!(
            kind = %self.descriptor.kind,
            id = %key.identifier,
            request_id = %ctx.storage().request_id(),
            "object updated"
        );
        ctx.resource_context().respond_object(StatusCode::OK, obj)
    }

    /// Merge the raw body into the record it identifies.
    ///
    /// The body is only decoded as far as a [`PartialObject`] to find the
    /// target; the store receives the bytes untouched. Namespaced/singleton
    /// shape always comes from this handler's descriptor. Only the singleton
    /// is created by a patch; any other missing record is `NotFound`.
    pub async fn patch<C: ResourceScope>(&self, ctx: &C) -> ApiResult<Response> {
        let storage = ctx.storage();
        let body = storage.body();
        let partial = single_partial(storage.codec().decode_partial(body)?)?;

        if !partial.types.is_empty() {
            let expected = self.descriptor.gvk();
            if partial.types.gvk().as_ref() != Some(&expected) {
                return Err(ApiError::bad_request(format!(
                    "patch declares {}/{}, expected {}",
                    partial.types.api_version, partial.types.kind, expected
                )));
            }
        }
        if let (Some(path_ns), Some(body_ns)) = (ctx.namespace(), partial.namespace()) {
            if path_ns != body_ns {
                return Err(namespace_mismatch(path_ns, body_ns));
            }
        }

        let key = identity::resolve_partial(&self.descriptor, &partial, ctx.namespace())?;
        self.check_merged(ctx, &key, body).await?;
        storage.store().patch(&key, body).await?;
        let obj = storage.store().get(&key).await?;
        tracing::info!(
            kind = %self.descriptor.kind,
            id = %key.identifier,
            request_id = %storage.request_id(),
            "object patched"
        );
        ctx.resource_context().respond_object(StatusCode::OK, obj)
    }

    pub async fn get<S: ResourceScope>(&self, ctx: &NamedResourceContext<S>) -> ApiResult<Response> {
        let obj = ctx.storage().store().get(ctx.object_key()).await?;
        ctx.resource_context().respond_object(StatusCode::OK, obj)
    }

    /// `get` for singleton kinds, whose object is addressed by the resource
    /// path alone.
    pub async fn get_singleton(&self, ctx: ResourceContext) -> ApiResult<Response> {
        let named = NamedResourceContext::new(ctx)?;
        self.get(&named).await
    }

    /// Delete hooks run first; a hook error leaves the record in place.
    pub async fn delete<S: ResourceScope>(
        &self,
        ctx: &NamedResourceContext<S>,
    ) -> ApiResult<Response> {
        self.delete_hooks.run(ctx).await?;
        ctx.storage().store().delete(ctx.object_key()).await?;
        tracing::info!(
            kind = %self.descriptor.kind,
            id = %ctx.object_key().identifier,
            request_id = %ctx.storage().request_id(),
            "object deleted"
        );
        Ok(ctx.resource_context().respond_empty(StatusCode::NO_CONTENT))
    }

    // ── body checks ─────────────────────────────────────────────────────────

    fn decode_body<C: ResourceScope>(&self, ctx: &C) -> ApiResult<Object> {
        let storage = ctx.storage();
        let gvk = self.descriptor.gvk();
        let mut obj = storage.codec().decode(storage.body(), Some(&gvk))?;
        self.validate_body(ctx, &mut obj)?;
        Ok(obj)
    }

    /// Identity invariants for a fully decoded body, then the kind's own
    /// validator. A namespace on a cluster-scoped object is pruned with a
    /// warning rather than rejected.
    fn validate_body<C: ResourceScope>(&self, ctx: &C, obj: &mut Object) -> ApiResult<()> {
        let d = &self.descriptor;
        let expected = d.gvk();
        if obj.gvk().as_ref() != Some(&expected) {
            return Err(ApiError::bad_request(format!(
                "body declares {}/{}, expected {}",
                obj.types.api_version, obj.types.kind, expected
            )));
        }

        if !d.singleton && obj.name().is_none() {
            return Err(ApiError::bad_request(format!(
                "metadata.name is required for kind {}",
                d.kind
            )));
        }
        if let Some(name) = obj.name() {
            if self.sub_resources.iter().any(|(sub, _)| sub == name) {
                return Err(ApiError::bad_request(format!(
                    "metadata.name {name:?} is reserved by a {} sub-resource",
                    d.resource
                )));
            }
        }

        if d.namespaced {
            let Some(body_ns) = obj.namespace() else {
                return Err(ApiError::bad_request(format!(
                    "metadata.namespace is required for namespaced kind {}",
                    d.kind
                )));
            };
            if let Some(path_ns) = ctx.namespace() {
                if path_ns != body_ns {
                    return Err(namespace_mismatch(path_ns, body_ns));
                }
            }
        } else if let Some(ns) = obj.metadata.namespace.take() {
            if !ns.is_empty() {
                let msg = format!("namespace {ns:?} ignored: kind {} is not namespaced", d.kind);
                tracing::warn!(kind = %d.kind, namespace = %ns, "pruned namespace from body");
                ctx.warn(&msg);
            }
        }

        ctx.storage().scheme().validate_if_possible(obj).map_err(|msg| {
            ApiError::bad_request(format!("{} {:?} is invalid: {msg}", d.kind, obj.name().unwrap_or_default()))
        })
    }

    /// Run the kind's validator on the document a merge patch would
    /// produce, before the store sees the patch.
    async fn check_merged<C: ResourceScope>(
        &self,
        ctx: &C,
        key: &ObjectKey,
        patch: &[u8],
    ) -> ApiResult<()> {
        let storage = ctx.storage();
        let current = match storage.store().get(key).await {
            Ok(obj) => Some(obj),
            Err(StoreError::NotFound(_)) if key.identifier.is_singleton() => None,
            Err(e) => return Err(e.into()),
        };
        let merged = merge_patch(current.as_ref(), key, patch)?;
        storage.scheme().validate_if_possible(&merged).map_err(|msg| {
            ApiError::bad_request(format!(
                "{} {:?} is invalid: {msg}",
                self.descriptor.kind,
                key.identifier.to_string()
            ))
        })
    }

    // ── mounting ────────────────────────────────────────────────────────────

    /// Register this handler's routes under `prefix` (e.g. `/apis/g/v1`).
    pub fn mount(
        self: Arc<Self>,
        table: &mut RouteTable,
        prefix: &str,
        state: &ApiState,
    ) -> Result<(), RouteError> {
        let base = format!("{prefix}/{}/", self.descriptor.resource);

        if self.descriptor.singleton {
            table.add(Method::GET, &base, self.endpoint(state, |h, ctx| async move {
                h.get_singleton(ctx).await
            }))?;
            table.add(Method::PATCH, &base, self.endpoint(state, |h, ctx| async move {
                h.patch(&ctx).await
            }))?;
            self.mount_sub_resources(table, &base, state, |ctx| Ok(ctx))?;
            return self.mount_named_sub_resources(table, &base, state, |ctx| {
                NamedResourceContext::new(ctx)
            });
        }

        table.add(Method::GET, &base, self.endpoint(state, |h, ctx| async move {
            h.list(&ctx).await
        }))?;
        table.add(Method::POST, &base, self.endpoint(state, |h, ctx| async move {
            h.create(&ctx).await
        }))?;
        table.add(Method::PUT, &base, self.endpoint(state, |h, ctx| async move {
            h.update(&ctx).await
        }))?;
        table.add(Method::PATCH, &base, self.endpoint(state, |h, ctx| async move {
            h.patch(&ctx).await
        }))?;
        self.mount_sub_resources(table, &base, state, |ctx| Ok(ctx))?;

        if self.descriptor.namespaced {
            let ns_base = format!(
                "{prefix}/namespaces/{{namespace}}/{}/",
                self.descriptor.resource
            );
            table.add(Method::GET, &ns_base, self.endpoint(state, |h, ctx| async move {
                h.list(&NamespacedResourceContext::new(ctx)?).await
            }))?;
            table.add(Method::POST, &ns_base, self.endpoint(state, |h, ctx| async move {
                h.create(&NamespacedResourceContext::new(ctx)?).await
            }))?;
            table.add(Method::PUT, &ns_base, self.endpoint(state, |h, ctx| async move {
                h.update(&NamespacedResourceContext::new(ctx)?).await
            }))?;
            table.add(Method::PATCH, &ns_base, self.endpoint(state, |h, ctx| async move {
                h.patch(&NamespacedResourceContext::new(ctx)?).await
            }))?;
            self.mount_sub_resources(table, &ns_base, state, NamespacedResourceContext::new)?;

            let named = format!("{ns_base}{{name}}/");
            table.add(Method::GET, &named, self.endpoint(state, |h, ctx| async move {
                h.get(&named_in_namespace(ctx)?).await
            }))?;
            table.add(Method::DELETE, &named, self.endpoint(state, |h, ctx| async move {
                h.delete(&named_in_namespace(ctx)?).await
            }))?;
            self.mount_named_sub_resources(table, &named, state, named_in_namespace)
        } else {
            let named = format!("{base}{{name}}/");
            table.add(Method::GET, &named, self.endpoint(state, |h, ctx| async move {
                h.get(&NamedResourceContext::new(ctx)?).await
            }))?;
            table.add(Method::DELETE, &named, self.endpoint(state, |h, ctx| async move {
                h.delete(&NamedResourceContext::new(ctx)?).await
            }))?;
            self.mount_named_sub_resources(table, &named, state, NamedResourceContext::new)
        }
    }

    fn mount_sub_resources<C, B>(
        &self,
        table: &mut RouteTable,
        base: &str,
        state: &ApiState,
        build: B,
    ) -> Result<(), RouteError>
    where
        C: ResourceScope + 'static,
        B: Fn(ResourceContext) -> ApiResult<C> + Clone + Send + Sync + 'static,
    {
        for (name, sub) in &self.sub_resources {
            let sub = sub.clone();
            let build = build.clone();
            let handler = context_endpoint(self.descriptor.clone(), state, move |ctx| {
                let sub = sub.clone();
                let built = build(ctx);
                async move { sub.handle(&built?).await }
            });
            table.add(Method::PUT, &format!("{base}{name}/"), handler)?;
        }
        Ok(())
    }

    fn mount_named_sub_resources<C, B>(
        &self,
        table: &mut RouteTable,
        base: &str,
        state: &ApiState,
        build: B,
    ) -> Result<(), RouteError>
    where
        C: NamedScope + 'static,
        B: Fn(ResourceContext) -> ApiResult<C> + Clone + Send + Sync + 'static,
    {
        for (name, sub) in &self.named_sub_resources {
            let sub = sub.clone();
            let build = build.clone();
            let handler = context_endpoint(self.descriptor.clone(), state, move |ctx| {
                let sub = sub.clone();
                let built = build(ctx);
                async move { sub.handle(&built?).await }
            });
            table.add(Method::PUT, &format!("{base}{name}/"), handler)?;
        }
        Ok(())
    }

    /// Route handler that builds a [`ResourceContext`] for this kind and
    /// hands it to `op` together with the handler.
    fn endpoint<F, Fut>(
        self: &Arc<Self>,
        state: &ApiState,
        op: F,
    ) -> impl Fn(RawRequest) -> Fut + Clone + Send + Sync + 'static
    where
        F: Fn(Arc<Self>, ResourceContext) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ApiResult<Response>> + Send + 'static,
    {
        let handler = self.clone();
        context_endpoint(self.descriptor.clone(), state, move |ctx| op(handler.clone(), ctx))
    }
}

fn context_endpoint<F, Fut>(
    descriptor: Arc<KindDescriptor>,
    state: &ApiState,
    op: F,
) -> impl Fn(RawRequest) -> Fut + Clone + Send + Sync + 'static
where
    F: Fn(ResourceContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<Response>> + Send + 'static,
{
    let state = state.clone();
    move |raw: RawRequest| {
        let storage = StorageContext::new(state.clone(), raw);
        op(ResourceContext::new(storage, descriptor.clone()))
    }
}

fn named_in_namespace(
    ctx: ResourceContext,
) -> ApiResult<NamedResourceContext<NamespacedResourceContext>> {
    NamedResourceContext::new(NamespacedResourceContext::new(ctx)?)
}

fn single_partial(partials: Vec<PartialObject>) -> ApiResult<PartialObject> {
    let count = partials.len();
    let [partial]: [PartialObject; 1] = partials.try_into().map_err(|_| {
        ApiError::bad_request(format!(
            "patch body must contain exactly one object, found {count}"
        ))
    })?;
    Ok(partial)
}

fn namespace_mismatch(path_ns: &str, body_ns: &str) -> ApiError {
    ApiError::bad_request(format!(
        "namespace {body_ns:?} in body does not match namespace {path_ns:?} in path"
    ))
}
