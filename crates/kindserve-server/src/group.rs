//! Group/version handler.

use axum::{Json, http::Method};
use kindserve_kernel::{GroupVersion, GroupVersionKind, KindDescriptor, Scheme};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

use crate::context::ApiState;
use crate::resource::ResourceHandler;
use crate::router::{RouteError, RouteTable};

/// Body of `GET /apis/<group>/<version>/`.
#[derive(Debug, Clone, Serialize)]
pub struct GroupVersionInfo {
    pub group: String,
    pub version: String,
    pub resources: Vec<KindDescriptor>,
}

/// Every [`ResourceHandler`] of one group-version, in scheme order.
pub struct GroupVersionHandler {
    group_version: GroupVersion,
    resources: Vec<ResourceHandler>,
}

impl GroupVersionHandler {
    /// One handler per kind the scheme knows in `gv`, minus `ignored_kinds`.
    pub fn new(
        group_version: GroupVersion,
        scheme: &Scheme,
        ignored_kinds: &HashSet<GroupVersionKind>,
    ) -> Self {
        let mut resources = Vec::new();
        for (kind, caps) in scheme.known_kinds(&group_version) {
            let gvk = group_version.with_kind(kind);
            if ignored_kinds.contains(&gvk) {
                tracing::debug!(kind = %gvk, "kind ignored");
                continue;
            }
            let descriptor = KindDescriptor::for_kind(&gvk, caps);
            tracing::debug!(
                kind = %gvk,
                resource = %descriptor.resource,
                namespaced = descriptor.namespaced,
                singleton = descriptor.singleton,
                "resource registered"
            );
            resources.push(ResourceHandler::new(descriptor));
        }
        Self {
            group_version,
            resources,
        }
    }

    pub fn group_version(&self) -> &GroupVersion {
        &self.group_version
    }

    pub fn kind(&self, kind: &str) -> Option<&ResourceHandler> {
        self.resources.iter().find(|r| r.descriptor().kind == kind)
    }

    /// Mutable access for registering hooks and sub-resources before the
    /// server starts.
    pub fn kind_mut(&mut self, kind: &str) -> Option<&mut ResourceHandler> {
        self.resources
            .iter_mut()
            .find(|r| r.descriptor().kind == kind)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceHandler> {
        self.resources.iter()
    }

    pub fn info(&self) -> GroupVersionInfo {
        GroupVersionInfo {
            group: self.group_version.group.clone(),
            version: self.group_version.version.clone(),
            resources: self
                .resources
                .iter()
                .map(|r| r.descriptor().clone())
                .collect(),
        }
    }

    /// Route prefix, `/apis/<group>/<version>`.
    pub fn prefix(&self) -> String {
        format!("/apis/{}", self.group_version)
    }

    pub fn mount(self, table: &mut RouteTable, state: &ApiState) -> Result<(), RouteError> {
        let prefix = self.prefix();
        let info = Arc::new(self.info());
        table.add(Method::GET, &format!("{prefix}/"), move || {
            let info = info.clone();
            async move { Json(info.as_ref().clone()) }
        })?;

        for resource in self.resources {
            Arc::new(resource).mount(table, &prefix, state)?;
        }
        Ok(())
    }
}
