//! The type registry.
//!
//! A [`Scheme`] is built explicitly at startup and passed by reference to
//! whoever needs it. Each registered kind carries a [`KindCapabilities`]
//! record that answers "is it namespaced?", "is it a singleton?", "can it be
//! validated?" and "how is it defaulted?" once, instead of probing objects at
//! request time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::meta::{GroupVersion, GroupVersionKind, Object, resource_name};

/// Per-kind validation; the error string becomes a BadRequest message.
pub type Validator = Arc<dyn Fn(&Object) -> Result<(), String> + Send + Sync>;

/// Per-kind defaulting, applied to objects on their way out.
pub type Defaulter = Arc<dyn Fn(&mut Object) + Send + Sync>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemeError {
    #[error("kind {0} is already registered")]
    DuplicateKind(String),

    #[error("kinds {0} and {1} both map to resource {2:?}")]
    ResourceCollision(String, String, String),

    #[error("no kind registered for {0}")]
    UnknownKind(String),
}

/// Declared capabilities of a kind. Everything defaults to off.
#[derive(Clone, Default)]
pub struct KindCapabilities {
    pub namespaced: bool,
    pub singleton: bool,
    pub validator: Option<Validator>,
    pub defaulter: Option<Defaulter>,
}

impl KindCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: instances are scoped by namespace.
    pub fn namespaced(mut self) -> Self {
        self.namespaced = true;
        self
    }

    /// Builder: exactly one addressable instance.
    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn with_defaulter<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Object) + Send + Sync + 'static,
    {
        self.defaulter = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for KindCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindCapabilities")
            .field("namespaced", &self.namespaced)
            .field("singleton", &self.singleton)
            .field("validator", &self.validator.is_some())
            .field("defaulter", &self.defaulter.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct GroupVersionEntry {
    /// Kinds in registration order.
    kinds: Vec<(String, KindCapabilities)>,
}

/// Registry of every known kind, grouped by group-version.
#[derive(Debug, Default)]
pub struct Scheme {
    /// Group-versions in the order they were first registered.
    order: Vec<GroupVersion>,
    versions: HashMap<GroupVersion, GroupVersionEntry>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `gvk` with its capabilities.
    ///
    /// Fails if the kind is already known, or if another kind of the same
    /// group-version would be served under the same resource name.
    pub fn register(
        &mut self,
        gvk: GroupVersionKind,
        caps: KindCapabilities,
    ) -> Result<(), SchemeError> {
        let gv = gvk.group_version();
        let resource = resource_name(&gvk.kind, caps.singleton);
        if !self.versions.contains_key(&gv) {
            self.order.push(gv.clone());
        }
        let entry = self.versions.entry(gv).or_default();

        for (kind, existing) in &entry.kinds {
            if *kind == gvk.kind {
                return Err(SchemeError::DuplicateKind(gvk.to_string()));
            }
            if resource_name(kind, existing.singleton) == resource {
                return Err(SchemeError::ResourceCollision(
                    kind.clone(),
                    gvk.kind.clone(),
                    resource,
                ));
            }
        }
        entry.kinds.push((gvk.kind, caps));
        Ok(())
    }

    /// All group-versions, in registration order.
    pub fn prioritized_versions_all_groups(&self) -> &[GroupVersion] {
        &self.order
    }

    /// Kinds known in `gv`, in registration order.
    pub fn known_kinds<'a>(
        &'a self,
        gv: &GroupVersion,
    ) -> impl Iterator<Item = (&'a str, &'a KindCapabilities)> + 'a {
        self.versions
            .get(gv)
            .into_iter()
            .flat_map(|entry| entry.kinds.iter().map(|(k, c)| (k.as_str(), c)))
    }

    pub fn capabilities(&self, gvk: &GroupVersionKind) -> Option<&KindCapabilities> {
        self.versions
            .get(&gvk.group_version())?
            .kinds
            .iter()
            .find(|(kind, _)| *kind == gvk.kind)
            .map(|(_, caps)| caps)
    }

    pub fn recognizes(&self, gvk: &GroupVersionKind) -> bool {
        self.capabilities(gvk).is_some()
    }

    /// Run the kind's validator, if it declares one.
    pub fn validate_if_possible(&self, obj: &Object) -> Result<(), String> {
        let Some(caps) = obj.gvk().and_then(|gvk| self.capabilities(&gvk)) else {
            return Ok(());
        };
        match &caps.validator {
            Some(validate) => validate(obj),
            None => Ok(()),
        }
    }

    /// Run the kind's defaulter, if it declares one.
    pub fn default_object(&self, obj: &mut Object) -> Result<(), SchemeError> {
        let gvk = obj
            .gvk()
            .ok_or_else(|| SchemeError::UnknownKind(format!("{:?}", obj.types)))?;
        let caps = self
            .capabilities(&gvk)
            .ok_or_else(|| SchemeError::UnknownKind(gvk.to_string()))?;
        if let Some(default) = &caps.defaulter {
            default(obj);
        }
        Ok(())
    }
}
