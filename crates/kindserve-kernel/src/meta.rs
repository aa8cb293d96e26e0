//! Type and identity metadata shared by every resource kind.
//!
//! Objects are kept dynamically typed ([`Object`]): the routing engine is
//! kind-agnostic and only ever looks at `apiVersion`, `kind`,
//! `metadata.name` and `metadata.namespace`. Everything else is carried
//! through untouched in [`Object::data`].

use inflector::Inflector;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::scheme::KindCapabilities;

// ─────────────────────────────────────────────────────────────────────────────
// Group / Version / Kind
// ─────────────────────────────────────────────────────────────────────────────

/// An API group at a specific version, e.g. `apps.example.com/v1`.
///
/// The empty group is the "core" group and renders as just the version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersion {
    #[serde(default)]
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Parse an `apiVersion` string (`group/version` or bare `version`).
    ///
    /// Returns `None` for empty input or more than one `/`.
    pub fn parse_api_version(api_version: &str) -> Option<Self> {
        match api_version.split('/').collect::<Vec<_>>().as_slice() {
            [version] if !version.is_empty() => Some(Self::new("", *version)),
            [group, version] if !group.is_empty() && !version.is_empty() => {
                Some(Self::new(*group, *version))
            }
            _ => None,
        }
    }

    pub fn with_kind(&self, kind: impl Into<String>) -> GroupVersionKind {
        GroupVersionKind {
            group: self.group.clone(),
            version: self.version.clone(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Fully qualified kind identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }

    /// The `apiVersion` string objects of this kind carry.
    pub fn api_version(&self) -> String {
        self.group_version().to_string()
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.group_version(), self.kind)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// KindDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the routing engine needs to know about one kind.
///
/// Built once at startup from the [`Scheme`](crate::scheme::Scheme) and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindDescriptor {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Lowercase URL segment: the plural of `kind`, or the singular for
    /// singletons.
    pub resource: String,
    pub namespaced: bool,
    pub singleton: bool,
}

impl KindDescriptor {
    /// Derive the descriptor of `gvk` from its declared capabilities.
    pub fn for_kind(gvk: &GroupVersionKind, caps: &KindCapabilities) -> Self {
        Self {
            group: gvk.group.clone(),
            version: gvk.version.clone(),
            kind: gvk.kind.clone(),
            resource: resource_name(&gvk.kind, caps.singleton),
            namespaced: caps.namespaced,
            singleton: caps.singleton,
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(self.group.clone(), self.version.clone(), self.kind.clone())
    }

    pub fn group_version(&self) -> GroupVersion {
        GroupVersion::new(self.group.clone(), self.version.clone())
    }
}

/// `Widget` → `widgets`, `Policy` → `policies`; singletons stay singular.
pub fn resource_name(kind: &str, singleton: bool) -> String {
    if singleton {
        kind.to_lowercase()
    } else {
        kind.to_plural().to_lowercase()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Objects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl TypeMeta {
    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty() && self.kind.is_empty()
    }

    /// `None` when either half is missing or `apiVersion` is malformed.
    pub fn gvk(&self) -> Option<GroupVersionKind> {
        if self.kind.is_empty() {
            return None;
        }
        GroupVersion::parse_api_version(&self.api_version).map(|gv| gv.with_kind(self.kind.clone()))
    }
}

impl From<&GroupVersionKind> for TypeMeta {
    fn from(gvk: &GroupVersionKind) -> Self {
        Self {
            api_version: gvk.api_version(),
            kind: gvk.kind.clone(),
        }
    }
}

/// Identity metadata. Unknown metadata fields (labels, annotations, …) are
/// preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObjectMeta {
    /// The name, treating `""` as unset.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// The namespace, treating `""` as unset.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}

/// A dynamically typed API object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(flatten)]
    pub types: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Object {
    /// An empty object of the given kind.
    pub fn new(gvk: &GroupVersionKind) -> Self {
        Self {
            types: gvk.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = Some(name.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.namespace = Some(namespace.into());
        self
    }

    /// Builder: set a top-level field such as `spec`.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace()
    }

    pub fn gvk(&self) -> Option<GroupVersionKind> {
        self.types.gvk()
    }
}

/// The `List{items: [...]}` wrapper returned by collection reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectList {
    #[serde(flatten)]
    pub types: TypeMeta,
    pub items: Vec<Object>,
}

impl ObjectList {
    pub const KIND: &'static str = "List";

    pub fn new(group_version: &GroupVersion, items: Vec<Object>) -> Self {
        Self {
            types: TypeMeta {
                api_version: group_version.to_string(),
                kind: Self::KIND.to_string(),
            },
            items,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Partial objects
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialObjectMeta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

/// Just the type and identity of a payload, used to locate the record a
/// patch applies to before the patch body itself is interpreted.
///
/// Partial objects deliberately carry no namespaced/singleton flags: those
/// always come from the handler's [`KindDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PartialObject {
    #[serde(flatten)]
    pub types: TypeMeta,
    #[serde(default)]
    pub metadata: PartialObjectMeta,
}

impl PartialObject {
    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
