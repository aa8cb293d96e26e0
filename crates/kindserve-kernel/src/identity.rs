//! Identity resolution: (kind, namespace, name) → [`ObjectKey`].
//!
//! This module is the only place an [`ObjectKey`] is constructed. The
//! shape of the identifier is decided by the kind, never by the payload:
//!
//! | Kind shape                  | Identifier            | String form        |
//! |-----------------------------|-----------------------|--------------------|
//! | singleton                   | `Singleton`           | `@singleton`       |
//! | namespaced, not singleton   | `Namespaced{ns,name}` | `<ns>/<name>`      |
//! | cluster-scoped              | `Cluster(name)`       | `<name>`           |
//!
//! Segments must be non-empty and must not contain `/`, so the string form
//! parses back unambiguously.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::meta::{GroupVersionKind, KindDescriptor, PartialObject};

/// String form of the singleton identifier.
pub const SINGLETON_IDENTIFIER: &str = "@singleton";

const SEPARATOR: char = '/';

/// Storage-level kind key.
pub type KindKey = GroupVersionKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("name must be set")]
    MissingName,

    #[error("namespace must be set for namespaced kind {0}")]
    MissingNamespace(String),

    #[error("invalid {field} {value:?}: must not contain '/'")]
    InvalidSegment { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
enum Repr {
    Singleton,
    Cluster(String),
    Namespaced { namespace: String, name: String },
}

/// Opaque per-kind identifier of one stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(Repr);

impl Identifier {
    pub fn is_singleton(&self) -> bool {
        matches!(self.0, Repr::Singleton)
    }

    /// The object name, `None` for the singleton.
    pub fn name(&self) -> Option<&str> {
        match &self.0 {
            Repr::Singleton => None,
            Repr::Cluster(name) | Repr::Namespaced { name, .. } => Some(name),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match &self.0 {
            Repr::Namespaced { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    /// Inverse of the [`Display`](fmt::Display) form.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        if s == SINGLETON_IDENTIFIER {
            return Ok(Self(Repr::Singleton));
        }
        match s.split_once(SEPARATOR) {
            Some((namespace, name)) => Ok(Self(Repr::Namespaced {
                namespace: segment("namespace", Some(namespace))
                    .map_err(|_| IdentityError::MissingNamespace(s.to_string()))?,
                name: segment("name", Some(name))?,
            })),
            None => Ok(Self(Repr::Cluster(segment("name", Some(s))?))),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Singleton => f.write_str(SINGLETON_IDENTIFIER),
            Repr::Cluster(name) => f.write_str(name),
            Repr::Namespaced { namespace, name } => write!(f, "{namespace}{SEPARATOR}{name}"),
        }
    }
}

/// The sole addressing unit handed to an [`ObjectStore`](crate::store::ObjectStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: KindKey,
    pub identifier: Identifier,
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.identifier)
    }
}

fn segment(field: &'static str, value: Option<&str>) -> Result<String, IdentityError> {
    match value {
        None | Some("") => Err(IdentityError::MissingName),
        Some(v) if v.contains(SEPARATOR) => Err(IdentityError::InvalidSegment {
            field,
            value: v.to_string(),
        }),
        Some(v) => Ok(v.to_string()),
    }
}

/// Compute the key of an object of kind `descriptor`.
///
/// Singletons ignore `namespace` and `name` entirely. Cluster-scoped kinds
/// ignore `namespace`.
pub fn resolve(
    descriptor: &KindDescriptor,
    namespace: Option<&str>,
    name: Option<&str>,
) -> Result<ObjectKey, IdentityError> {
    if descriptor.singleton {
        return Ok(singleton_key(descriptor));
    }
    let name = segment("name", name)?;
    let repr = if descriptor.namespaced {
        let namespace = match namespace {
            None | Some("") => return Err(IdentityError::MissingNamespace(descriptor.kind.clone())),
            Some(ns) => segment("namespace", Some(ns))?,
        };
        Repr::Namespaced { namespace, name }
    } else {
        Repr::Cluster(name)
    };
    Ok(ObjectKey {
        kind: descriptor.gvk(),
        identifier: Identifier(repr),
    })
}

/// The one key a singleton kind ever uses.
pub fn singleton_key(descriptor: &KindDescriptor) -> ObjectKey {
    ObjectKey {
        kind: descriptor.gvk(),
        identifier: Identifier(Repr::Singleton),
    }
}

/// Key for a patch payload. Identity comes from the partial object, but its
/// shape comes from `descriptor`; `fallback_namespace` (the request path
/// namespace, if any) is used when the payload carries none.
pub fn resolve_partial(
    descriptor: &KindDescriptor,
    partial: &PartialObject,
    fallback_namespace: Option<&str>,
) -> Result<ObjectKey, IdentityError> {
    resolve(
        descriptor,
        partial.namespace().or(fallback_namespace),
        partial.name(),
    )
}
