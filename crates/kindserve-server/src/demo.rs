//! The `digitized.kindserve.dev/v1alpha1` API group served by the
//! `kindserve` binary.
//!
//! | kind       | shape      | rules                                              |
//! |------------|------------|----------------------------------------------------|
//! | `Project`  | cluster    | name is a DNS-1123 label                           |
//! | `Cassette` | namespaced | name is three digits; namespace names a Project    |
//! | `Recorder` | singleton  | `spec.action` defaults to `None`                   |
//! | `Config`   | cluster    | registered but never served                        |

use async_trait::async_trait;
use kindserve_kernel::{
    GroupVersion, GroupVersionKind, KindCapabilities, KindDescriptor, Object, ObjectStore, Scheme,
    StoreError, identity,
};
use regex::Regex;
use serde_json::{Value, json};

use crate::context::ResourceScope;
use crate::error::{ApiError, ApiResult};
use crate::hooks::ObjectHook;
use crate::registry::ApiGroupsRegistry;

pub const GROUP: &str = "digitized.kindserve.dev";
pub const VERSION: &str = "v1alpha1";

pub const PROJECT: &str = "Project";
pub const CASSETTE: &str = "Cassette";
pub const RECORDER: &str = "Recorder";
pub const CONFIG: &str = "Config";

const RECORDER_ACTIONS: [&str; 3] = ["None", "Preview", "Record"];

pub fn group_version() -> GroupVersion {
    GroupVersion::new(GROUP, VERSION)
}

pub fn gvk(kind: &str) -> GroupVersionKind {
    group_version().with_kind(kind)
}

/// Kinds registered for decoding only.
pub fn ignored_kinds() -> Vec<GroupVersionKind> {
    vec![gvk(CONFIG)]
}

fn spec_str<'a>(obj: &'a Object, field: &str) -> Option<&'a str> {
    obj.data.get("spec")?.get(field)?.as_str()
}

fn is_cassette_name(name: &str) -> bool {
    name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit())
}

pub fn scheme() -> anyhow::Result<Scheme> {
    let dns_label = Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$")?;

    let mut scheme = Scheme::new();
    scheme.register(gvk(CONFIG), KindCapabilities::new())?;
    scheme.register(
        gvk(PROJECT),
        KindCapabilities::new().with_validator(move |obj| {
            let name = obj.name().unwrap_or_default();
            if name.len() > 63 || !dns_label.is_match(name) {
                return Err(format!("metadata.name {name:?} is not a DNS-1123 label"));
            }
            Ok(())
        }),
    )?;
    scheme.register(
        gvk(CASSETTE),
        KindCapabilities::new().namespaced().with_validator(|obj| {
            let name = obj.name().unwrap_or_default();
            if !is_cassette_name(name) {
                return Err(format!("metadata.name {name:?} must be three digits"));
            }
            Ok(())
        }),
    )?;
    scheme.register(
        gvk(RECORDER),
        KindCapabilities::new()
            .singleton()
            .with_defaulter(|obj| {
                let spec = obj.data.entry("spec").or_insert_with(|| json!({}));
                if let Value::Object(spec) = spec {
                    let action = spec.entry("action").or_insert(Value::Null);
                    if action.as_str().is_none_or(str::is_empty) {
                        *action = json!("None");
                    }
                }
            })
            .with_validator(|obj| {
                let action = spec_str(obj, "action").unwrap_or("None");
                if !RECORDER_ACTIONS.contains(&action) {
                    return Err(format!("spec.action {action:?} is not one of {RECORDER_ACTIONS:?}"));
                }
                let cassette = spec_str(obj, "cassette").unwrap_or_default();
                if !cassette.is_empty() && !is_cassette_name(cassette) {
                    return Err(format!("spec.cassette {cassette:?} must be three digits"));
                }
                if action != "None" && cassette.is_empty() {
                    return Err(format!("spec.cassette is required for action {action:?}"));
                }
                Ok(())
            }),
    )?;
    Ok(scheme)
}

/// Rejects Cassettes whose namespace does not name an existing Project.
pub struct ProjectExists {
    project: KindDescriptor,
}

impl ProjectExists {
    pub fn new() -> Self {
        Self {
            project: KindDescriptor::for_kind(&gvk(PROJECT), &KindCapabilities::new()),
        }
    }
}

impl Default for ProjectExists {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectHook for ProjectExists {
    async fn run(&self, ctx: &dyn ResourceScope, obj: &mut Object) -> ApiResult<()> {
        let project = obj.namespace().unwrap_or_default().to_string();
        let key = identity::resolve(&self.project, None, Some(&project))?;
        match ctx.storage().store().get(&key).await {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound(_)) => Err(ApiError::bad_request(format!(
                "project {project:?} does not exist"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "project-exists"
    }
}

/// Attach the demo hooks to an already built registry.
pub fn register_hooks(registry: &mut ApiGroupsRegistry) {
    if let Some(cassettes) = registry.resource_mut(&gvk(CASSETTE)) {
        cassettes.register_post_hook(ProjectExists::new());
    }
}

/// Create the Recorder singleton unless it already exists.
pub async fn seed(store: &dyn ObjectStore, scheme: &Scheme) -> anyhow::Result<()> {
    let recorder = gvk(RECORDER);
    let caps = scheme
        .capabilities(&recorder)
        .ok_or_else(|| anyhow::anyhow!("{recorder} is not registered"))?;
    let key = identity::singleton_key(&KindDescriptor::for_kind(&recorder, caps));
    let obj = Object::new(&recorder).with_field("spec", json!({"action": "None"}));
    match store.create(&key, &obj).await {
        Ok(()) => {
            tracing::info!(key = %key, "seeded recorder");
            Ok(())
        }
        Err(StoreError::AlreadyExists(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
