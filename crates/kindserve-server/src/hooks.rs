//! Lifecycle hooks and sub-resources.
//!
//! Hooks are scoped to a single [`ResourceHandler`](crate::ResourceHandler)
//! and run strictly in registration order. The first error aborts the
//! operation and reaches the caller unchanged; nothing is written to the
//! store after a hook fails.

use async_trait::async_trait;
use axum::response::Response;
use kindserve_kernel::Object;
use std::sync::Arc;

use crate::context::{NamedScope, ResourceScope};
use crate::error::ApiResult;

/// Runs on a decoded object before it is created or replaced. May mutate
/// the object.
#[async_trait]
pub trait ObjectHook: Send + Sync {
    async fn run(&self, ctx: &dyn ResourceScope, obj: &mut Object) -> ApiResult<()>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Runs against an addressed object before it is deleted.
#[async_trait]
pub trait NamedHook: Send + Sync {
    async fn run(&self, ctx: &dyn NamedScope) -> ApiResult<()>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Extra route mounted under a resource collection path.
#[async_trait]
pub trait SubResource: Send + Sync {
    async fn handle(&self, ctx: &dyn ResourceScope) -> ApiResult<Response>;
}

/// Extra route mounted under a single object's path.
#[async_trait]
pub trait NamedSubResource: Send + Sync {
    async fn handle(&self, ctx: &dyn NamedScope) -> ApiResult<Response>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure adapters
// ─────────────────────────────────────────────────────────────────────────────

/// Wraps a synchronous closure as a hook or sub-resource.
///
/// Build one with [`object_hook_fn`], [`named_hook_fn`],
/// [`sub_resource_fn`] or [`named_sub_resource_fn`]; those pin down the
/// closure signature so argument types need no annotations.
pub struct HookFn<F>(F);

pub fn object_hook_fn<F>(f: F) -> HookFn<F>
where
    F: Fn(&dyn ResourceScope, &mut Object) -> ApiResult<()> + Send + Sync,
{
    HookFn(f)
}

pub fn named_hook_fn<F>(f: F) -> HookFn<F>
where
    F: Fn(&dyn NamedScope) -> ApiResult<()> + Send + Sync,
{
    HookFn(f)
}

pub fn sub_resource_fn<F>(f: F) -> HookFn<F>
where
    F: Fn(&dyn ResourceScope) -> ApiResult<Response> + Send + Sync,
{
    HookFn(f)
}

pub fn named_sub_resource_fn<F>(f: F) -> HookFn<F>
where
    F: Fn(&dyn NamedScope) -> ApiResult<Response> + Send + Sync,
{
    HookFn(f)
}

#[async_trait]
impl<F> ObjectHook for HookFn<F>
where
    F: Fn(&dyn ResourceScope, &mut Object) -> ApiResult<()> + Send + Sync,
{
    async fn run(&self, ctx: &dyn ResourceScope, obj: &mut Object) -> ApiResult<()> {
        (self.0)(ctx, obj)
    }
}

#[async_trait]
impl<F> NamedHook for HookFn<F>
where
    F: Fn(&dyn NamedScope) -> ApiResult<()> + Send + Sync,
{
    async fn run(&self, ctx: &dyn NamedScope) -> ApiResult<()> {
        (self.0)(ctx)
    }
}

#[async_trait]
impl<F> SubResource for HookFn<F>
where
    F: Fn(&dyn ResourceScope) -> ApiResult<Response> + Send + Sync,
{
    async fn handle(&self, ctx: &dyn ResourceScope) -> ApiResult<Response> {
        (self.0)(ctx)
    }
}

#[async_trait]
impl<F> NamedSubResource for HookFn<F>
where
    F: Fn(&dyn NamedScope) -> ApiResult<Response> + Send + Sync,
{
    async fn handle(&self, ctx: &dyn NamedScope) -> ApiResult<Response> {
        (self.0)(ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only, ordered list of hooks.
pub struct HookPipeline<H: ?Sized> {
    hooks: Vec<Arc<H>>,
}

impl<H: ?Sized> Default for HookPipeline<H> {
    fn default() -> Self {
        Self { hooks: Vec::new() }
    }
}

impl<H: ?Sized> HookPipeline<H> {
    pub fn push(&mut self, hook: Arc<H>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl HookPipeline<dyn ObjectHook> {
    /// Run every hook in order, stopping at the first error.
    pub async fn run(&self, ctx: &dyn ResourceScope, obj: &mut Object) -> ApiResult<()> {
        for hook in &self.hooks {
            tracing::debug!(hook = hook.name(), kind = %ctx.descriptor().kind, "running object hook");
            hook.run(ctx, obj).await?;
        }
        Ok(())
    }
}

impl HookPipeline<dyn NamedHook> {
    /// Run every hook in order, stopping at the first error.
    pub async fn run(&self, ctx: &dyn NamedScope) -> ApiResult<()> {
        for hook in &self.hooks {
            tracing::debug!(
                hook = hook.name(),
                key = %ctx.object_key(),
                "running named hook"
            );
            hook.run(ctx).await?;
        }
        Ok(())
    }
}
