//! API groups registry.
//!
//! Walks the [`Scheme`] once at startup and builds a
//! [`GroupVersionHandler`] for every group-version that is not ignored.
//! Collaborators then look handlers up to attach hooks and sub-resources,
//! and [`mount`](ApiGroupsRegistry::mount) turns the lot into routes.

use axum::{Json, http::Method};
use kindserve_kernel::{GroupVersion, GroupVersionKind, Scheme};
use std::collections::HashSet;
use std::sync::Arc;

use crate::context::ApiState;
use crate::group::GroupVersionHandler;
use crate::resource::ResourceHandler;
use crate::router::{RouteError, RouteTable};

pub struct ApiGroupsRegistry {
    group_versions: Vec<GroupVersionHandler>,
}

impl ApiGroupsRegistry {
    pub fn new(
        scheme: &Scheme,
        ignored_group_versions: &HashSet<GroupVersion>,
        ignored_kinds: &HashSet<GroupVersionKind>,
    ) -> Self {
        let group_versions = scheme
            .prioritized_versions_all_groups()
            .iter()
            .filter(|gv| {
                let ignored = ignored_group_versions.contains(*gv);
                if ignored {
                    tracing::debug!(group_version = %gv, "group-version ignored");
                }
                !ignored
            })
            .map(|gv| GroupVersionHandler::new(gv.clone(), scheme, ignored_kinds))
            .collect();
        Self { group_versions }
    }

    pub fn group_version(&self, gv: &GroupVersion) -> Option<&GroupVersionHandler> {
        self.group_versions
            .iter()
            .find(|h| h.group_version() == gv)
    }

    pub fn group_version_mut(&mut self, gv: &GroupVersion) -> Option<&mut GroupVersionHandler> {
        self.group_versions
            .iter_mut()
            .find(|h| h.group_version() == gv)
    }

    /// Shorthand for `group_version_mut(gv)?.kind_mut(kind)`.
    pub fn resource_mut(&mut self, gvk: &GroupVersionKind) -> Option<&mut ResourceHandler> {
        self.group_version_mut(&gvk.group_version())?
            .kind_mut(&gvk.kind)
    }

    /// Served group-versions as `group/version` strings, sorted.
    pub fn group_version_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .group_versions
            .iter()
            .map(|h| h.group_version().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn mount(self, table: &mut RouteTable, state: &ApiState) -> Result<(), RouteError> {
        let names = Arc::new(self.group_version_names());
        table.add(Method::GET, "/apis/", move || {
            let names = names.clone();
            async move { Json(names.as_ref().clone()) }
        })?;

        for handler in self.group_versions {
            tracing::info!(
                group_version = %handler.group_version(),
                kinds = handler.resources().count(),
                "serving group-version"
            );
            handler.mount(table, state)?;
        }
        Ok(())
    }
}
