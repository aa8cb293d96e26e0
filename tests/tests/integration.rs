use axum::{
    Json,
    http::{Method, StatusCode, header::WARNING},
    response::IntoResponse,
};
use kindserve_kernel::{GroupVersionKind, ObjectStore};
use kindserve_server::{
    ApiError, NamedScope, ResourceScope,
    demo,
    hooks::{named_hook_fn, named_sub_resource_fn, object_hook_fn, sub_resource_fn},
    store::InMemoryStore,
};
use kindserve_testing::{
    RecordingStore, StoreOp, app, app_with, assert_store_calls,
    fixtures::{self, send_raw, send_with},
    send,
};
use serde_json::json;
use std::sync::Arc;

fn recording() -> (RecordingStore, Arc<dyn ObjectStore>) {
    let store = RecordingStore::new();
    let shared: Arc<dyn ObjectStore> = Arc::new(store.clone());
    (store, shared)
}

#[tokio::test]
async fn widget_create_get_delete() {
    let app = app(Arc::new(InMemoryStore::new()));

    let created = send(
        &app,
        Method::POST,
        "/apis/g/v1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns1"}})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["apiVersion"], "g/v1");
    assert_eq!(created.body["kind"], "Widget");
    assert_eq!(created.body["spec"]["replicas"], 1);
    assert_eq!(
        created.header("content-type"),
        Some("application/json")
    );

    let fetched = send(&app, Method::GET, "/apis/g/v1/namespaces/ns1/widgets/a/", None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created.body);

    let deleted = send(&app, Method::DELETE, "/apis/g/v1/namespaces/ns1/widgets/a/", None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = send(&app, Method::GET, "/apis/g/v1/namespaces/ns1/widgets/a/", None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["kind"], "Status");
    assert_eq!(gone.body["code"], 404);
    assert_eq!(gone.body["reason"], "NotFound");
}

#[tokio::test]
async fn singleton_patch_upserts_and_merges() {
    let app = app(Arc::new(InMemoryStore::new()));

    let missing = send(&app, Method::GET, "/apis/g/v1/settings/", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let first = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/settings/",
        Some(json!({"metadata": {"name": "ignored", "namespace": "nowhere"}, "spec": {"x": 1}})),
    )
    .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["kind"], "Settings");
    assert_eq!(first.body["spec"], json!({"x": 1}));
    assert!(first.body["metadata"].get("name").is_none());
    assert!(first.body["metadata"].get("namespace").is_none());

    let second = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/settings/",
        Some(json!({"spec": {"y": 2}})),
    )
    .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["spec"], json!({"x": 1, "y": 2}));

    let fetched = send(&app, Method::GET, "/apis/g/v1/settings/", None).await;
    assert_eq!(fetched.body, second.body);
}

#[tokio::test]
async fn singleton_has_no_list_or_create_routes() {
    let app = app(Arc::new(InMemoryStore::new()));
    let post = send(&app, Method::POST, "/apis/g/v1/settings/", Some(json!({}))).await;
    assert_eq!(post.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(post.body["kind"], "Status");
    assert_eq!(post.body["code"], 405);
    let allow = post.header("allow").unwrap_or_default();
    assert!(allow.contains("PATCH"), "{allow}");

    let delete = send(&app, Method::DELETE, "/apis/g/v1/widgets/", None).await;
    assert_eq!(delete.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(delete.body["code"], 405);

    let named = send(&app, Method::GET, "/apis/g/v1/settings/x/", None).await;
    assert_eq!(named.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn namespaced_kind_requires_namespace() {
    let (store, shared) = recording();
    let app = app(shared);

    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": ""}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], 400);
    assert_store_calls!(store, StoreOp::Create, 0);
}

#[tokio::test]
async fn stray_namespace_on_cluster_kind_is_pruned_with_warning() {
    let app = app(Arc::new(InMemoryStore::new()));

    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "g1", "namespace": "foo"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["metadata"].get("namespace").is_none());
    let warning = response.header(WARNING.as_str()).unwrap_or_default();
    assert!(warning.starts_with("299 - "), "{warning}");
    assert!(warning.contains("foo"));

    let fetched = send(&app, Method::GET, "/apis/g/v1/gadgets/g1/", None).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert!(fetched.body["metadata"].get("namespace").is_none());
}

#[tokio::test]
async fn create_conflict_keeps_existing_record() {
    let app = app(Arc::new(InMemoryStore::new()));
    let body = |x: i64| json!({"metadata": {"name": "g1"}, "spec": {"x": x}});

    let first = send(&app, Method::POST, "/apis/g/v1/gadgets/", Some(body(1))).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let second = send(&app, Method::POST, "/apis/g/v1/gadgets/", Some(body(2))).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["reason"], "AlreadyExists");

    let fetched = send(&app, Method::GET, "/apis/g/v1/gadgets/g1/", None).await;
    assert_eq!(fetched.body["spec"]["x"], 1);
}

#[tokio::test]
async fn delete_hooks_run_before_store_reports_not_found() {
    let (store, shared) = recording();
    let journal = store.clone();
    let app = app_with(fixtures::scheme(), shared, move |registry| {
        let widgets = registry.resource_mut(&fixtures::widget()).unwrap();
        widgets.register_delete_hook(named_hook_fn(move |ctx: &dyn NamedScope| {
            journal.note(format!("hook {}", ctx.object_key().identifier));
            Ok(())
        }));
    });

    let response = send(
        &app,
        Method::DELETE,
        "/apis/g/v1/namespaces/ns1/widgets/missing/",
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(store.journal(), vec!["hook ns1/missing", "delete ns1/missing"]);
}

#[tokio::test]
async fn failing_delete_hook_keeps_record() {
    let (store, shared) = recording();
    let app = app_with(fixtures::scheme(), shared, |registry| {
        let gadgets = registry.resource_mut(&fixtures::gadget()).unwrap();
        gadgets.register_delete_hook(named_hook_fn(|_| {
            Err(ApiError::bad_request("gadgets are forever"))
        }));
    });

    send(&app, Method::POST, "/apis/g/v1/gadgets/", Some(json!({"metadata": {"name": "g1"}}))).await;
    let response = send(&app, Method::DELETE, "/apis/g/v1/gadgets/g1/", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "gadgets are forever");
    assert_store_calls!(store, StoreOp::Delete, 0);

    let fetched = send(&app, Method::GET, "/apis/g/v1/gadgets/g1/", None).await;
    assert_eq!(fetched.status, StatusCode::OK);
}

#[tokio::test]
async fn post_hook_error_aborts_create_unchanged() {
    let (store, shared) = recording();
    let later = RecordingStore::new();
    let later_journal = later.clone();
    let app = app_with(fixtures::scheme(), shared, move |registry| {
        let widgets = registry.resource_mut(&fixtures::widget()).unwrap();
        widgets.register_post_hook(object_hook_fn(|_, _| {
            Err(ApiError::status(StatusCode::FORBIDDEN, "no widgets today"))
        }));
        widgets.register_post_hook(object_hook_fn(move |_, _| {
            later.note("second hook ran");
            Ok(())
        }));
    });

    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns1"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["code"], 403);
    assert_eq!(response.body["message"], "no widgets today");
    assert_store_calls!(store, StoreOp::Create, 0);
    assert!(later_journal.journal().is_empty());
}

#[tokio::test]
async fn post_hooks_may_mutate_before_store() {
    let app = app_with(fixtures::scheme(), Arc::new(InMemoryStore::new()), |registry| {
        let gadgets = registry.resource_mut(&fixtures::gadget()).unwrap();
        gadgets.register_post_hook(object_hook_fn(|ctx: &dyn ResourceScope, obj| {
            obj.data
                .insert("createdBy".into(), json!(format!("{}-hook", ctx.descriptor().resource)));
            Ok(())
        }));
    });

    send(&app, Method::POST, "/apis/g/v1/gadgets/", Some(json!({"metadata": {"name": "g1"}}))).await;
    let fetched = send(&app, Method::GET, "/apis/g/v1/gadgets/g1/", None).await;
    assert_eq!(fetched.body["createdBy"], "gadgets-hook");
}

#[tokio::test]
async fn patch_requires_exactly_one_object() {
    let (store, shared) = recording();
    let app = app(shared);

    let empty = send_raw(&app, Method::PATCH, "/apis/g/v1/settings/", Vec::new(), &[]).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let two = send_raw(
        &app,
        Method::PATCH,
        "/apis/g/v1/settings/",
        br#"{"spec":{"x":1}} {"spec":{"x":2}}"#.to_vec(),
        &[],
    )
    .await;
    assert_eq!(two.status, StatusCode::BAD_REQUEST);

    let garbage = send_raw(&app, Method::PATCH, "/apis/g/v1/settings/", b"{nope".to_vec(), &[]).await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);

    assert_store_calls!(store, StoreOp::Patch, 0);
}

#[tokio::test]
async fn patch_rejects_other_kinds() {
    let app = app(Arc::new(InMemoryStore::new()));
    let response = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/settings/",
        Some(json!({"apiVersion": "g/v1", "kind": "Widget", "spec": {}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn namespaced_patch_adopts_path_namespace() {
    let app = app(Arc::new(InMemoryStore::new()));
    send(
        &app,
        Method::POST,
        "/apis/g/v1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns1"}, "spec": {"x": 1}})),
    )
    .await;

    let patched = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/namespaces/ns1/widgets/",
        Some(json!({"metadata": {"name": "a"}, "spec": {"y": 2}})),
    )
    .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.body["metadata"]["namespace"], "ns1");
    assert_eq!(patched.body["spec"]["x"], 1);
    assert_eq!(patched.body["spec"]["y"], 2);

    let mismatch = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/namespaces/ns1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns2"}})),
    )
    .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn path_namespace_must_match_body() {
    let app = app(Arc::new(InMemoryStore::new()));
    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/namespaces/ns1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns2"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let ok = send(
        &app,
        Method::POST,
        "/apis/g/v1/namespaces/ns1/widgets/",
        Some(json!({"metadata": {"name": "a", "namespace": "ns1"}})),
    )
    .await;
    assert_eq!(ok.status, StatusCode::CREATED);
}

#[tokio::test]
async fn body_kind_must_match_route() {
    let app = app(Arc::new(InMemoryStore::new()));
    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"apiVersion": "g/v1", "kind": "Widget", "metadata": {"name": "a", "namespace": "ns1"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let unknown = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"apiVersion": "g/v1", "kind": "Gizmo", "metadata": {"name": "a"}})),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_replaces_existing_only() {
    let app = app(Arc::new(InMemoryStore::new()));
    let missing = send(
        &app,
        Method::PUT,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "g1"}, "spec": {"x": 1}})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "g1"}, "spec": {"x": 1, "keep": true}})),
    )
    .await;
    let updated = send(
        &app,
        Method::PUT,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "g1"}, "spec": {"x": 2}})),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["spec"], json!({"x": 2}));
}

#[tokio::test]
async fn list_filters_by_path_namespace() {
    let app = app(Arc::new(InMemoryStore::new()));
    for (ns, name) in [("ns1", "a"), ("ns1", "b"), ("ns2", "a")] {
        let created = send(
            &app,
            Method::POST,
            "/apis/g/v1/widgets/",
            Some(json!({"metadata": {"name": name, "namespace": ns}})),
        )
        .await;
        assert_eq!(created.status, StatusCode::CREATED);
    }

    let all = send(&app, Method::GET, "/apis/g/v1/widgets/", None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.body["kind"], "List");
    assert_eq!(all.body["apiVersion"], "g/v1");
    assert_eq!(all.body["items"].as_array().map(Vec::len), Some(3));
    assert_eq!(all.body["items"][0]["spec"]["replicas"], 1);

    let ns1 = send(&app, Method::GET, "/apis/g/v1/namespaces/ns1/widgets/", None).await;
    let names: Vec<_> = ns1.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["metadata"]["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn default_header_disables_defaulting() {
    let app = app(Arc::new(InMemoryStore::new()));
    let body = json!({"metadata": {"name": "a", "namespace": "ns1"}});

    let raw = send_with(
        &app,
        Method::POST,
        "/apis/g/v1/widgets/",
        Some(body),
        &[("default", "false")],
    )
    .await;
    assert_eq!(raw.status, StatusCode::CREATED);
    assert!(raw.body.get("spec").is_none());

    let defaulted = send_with(
        &app,
        Method::GET,
        "/apis/g/v1/namespaces/ns1/widgets/a/",
        None,
        &[("default", "true")],
    )
    .await;
    assert_eq!(defaulted.body["spec"]["replicas"], 1);
}

#[tokio::test]
async fn discovery_endpoints() {
    let app = app(Arc::new(InMemoryStore::new()));

    let root = send(&app, Method::GET, "/", None).await;
    assert_eq!(root.status, StatusCode::OK);
    let routes = root.body.as_array().unwrap();
    assert!(routes.contains(&json!({"method": "GET", "path": "/apis/"})));
    assert!(routes.contains(&json!({"method": "DELETE", "path": "/apis/g/v1/namespaces/{namespace}/widgets/{name}/"})));
    assert!(routes.contains(&json!({"method": "PATCH", "path": "/apis/g/v1/settings/"})));
    assert!(!routes.contains(&json!({"method": "POST", "path": "/apis/g/v1/settings/"})));

    let groups = send(&app, Method::GET, "/apis/", None).await;
    assert_eq!(groups.body, json!(["g/v1"]));

    let gv = send(&app, Method::GET, "/apis/g/v1/", None).await;
    assert_eq!(gv.body["group"], "g");
    assert_eq!(gv.body["version"], "v1");
    let resources = gv.body["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);
    assert!(resources.contains(&json!({
        "group": "g",
        "version": "v1",
        "kind": "Settings",
        "resource": "settings",
        "namespaced": false,
        "singleton": true
    })));
}

#[tokio::test]
async fn paths_without_trailing_slash_reach_the_same_route() {
    let app = app(Arc::new(InMemoryStore::new()));
    let apis = send(&app, Method::GET, "/apis", None).await;
    assert_eq!(apis.status, StatusCode::OK);
    assert_eq!(apis.body, json!(["g/v1"]));

    let widgets = send(&app, Method::GET, "/apis/g/v1/widgets", None).await;
    assert_eq!(widgets.status, StatusCode::OK);
    assert_eq!(widgets.body["kind"], "List");
}

#[tokio::test]
async fn unknown_paths_render_status() {
    let app = app(Arc::new(InMemoryStore::new()));
    let response = send(&app, Method::GET, "/apis/nope/v9/things/", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["kind"], "Status");
    assert_eq!(response.body["status"], "Failure");
}

#[tokio::test]
async fn ignored_group_versions_and_kinds_are_not_routed() {
    let mut scheme = fixtures::scheme();
    scheme
        .register(
            GroupVersionKind::new("internal", "v1", "Secret"),
            kindserve_kernel::KindCapabilities::new(),
        )
        .unwrap();
    let config = kindserve_server::config::ServerConfig {
        ignored_group_versions: vec![kindserve_kernel::GroupVersion::new("internal", "v1")],
        ignored_kinds: vec![fixtures::gadget()],
        ..Default::default()
    };
    let scheme = Arc::new(scheme);
    let server = kindserve_server::server::RestServer::new(
        config,
        scheme.clone(),
        Arc::new(InMemoryStore::new()),
        Arc::new(kindserve_server::codec::JsonCodec::new(scheme)),
    );
    let app = server.build_service().unwrap();

    let groups = send(&app, Method::GET, "/apis/", None).await;
    assert_eq!(groups.body, json!(["g/v1"]));
    let gadgets = send(&app, Method::GET, "/apis/g/v1/gadgets/", None).await;
    assert_eq!(gadgets.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sub_resources_receive_their_context() {
    let app = app_with(fixtures::scheme(), Arc::new(InMemoryStore::new()), |registry| {
        let widgets = registry.resource_mut(&fixtures::widget()).unwrap();
        widgets.register_sub_resource(
            "summary",
            sub_resource_fn(|ctx| {
                Ok(Json(json!({
                    "kind": ctx.descriptor().kind,
                    "namespace": ctx.namespace(),
                }))
                .into_response())
            }),
        );

        let gadgets = registry.resource_mut(&fixtures::gadget()).unwrap();
        gadgets.register_named_sub_resource(
            "touch",
            named_sub_resource_fn(|ctx| {
                Ok(Json(json!({"id": ctx.object_key().identifier.to_string()})).into_response())
            }),
        );

        let settings = registry.resource_mut(&fixtures::settings()).unwrap();
        settings.register_named_sub_resource(
            "reset",
            named_sub_resource_fn(|ctx| {
                Ok(Json(json!({"id": ctx.object_key().identifier.to_string()})).into_response())
            }),
        );
    });

    let cluster = send(&app, Method::PUT, "/apis/g/v1/widgets/summary/", None).await;
    assert_eq!(cluster.body, json!({"kind": "Widget", "namespace": null}));

    let scoped = send(&app, Method::PUT, "/apis/g/v1/namespaces/ns1/widgets/summary/", None).await;
    assert_eq!(scoped.body, json!({"kind": "Widget", "namespace": "ns1"}));

    let touched = send(&app, Method::PUT, "/apis/g/v1/gadgets/g1/touch/", None).await;
    assert_eq!(touched.body, json!({"id": "g1"}));

    let reset = send(&app, Method::PUT, "/apis/g/v1/settings/reset/", None).await;
    assert_eq!(reset.body, json!({"id": "@singleton"}));
}

#[tokio::test]
async fn demo_cassettes_require_their_project() {
    let scheme = demo::scheme().unwrap();
    let store = Arc::new(InMemoryStore::new());
    demo::seed(store.as_ref(), &scheme).await.unwrap();
    let app = app_with(scheme, store, demo::register_hooks);

    let recorder = send(&app, Method::GET, "/apis/digitized.kindserve.dev/v1alpha1/recorder/", None).await;
    assert_eq!(recorder.status, StatusCode::OK);
    assert_eq!(recorder.body["spec"]["action"], "None");

    let cassette = json!({
        "metadata": {"name": "001", "namespace": "summer"},
        "spec": {"description": "beach"}
    });
    let orphan = send(
        &app,
        Method::POST,
        "/apis/digitized.kindserve.dev/v1alpha1/cassettes/",
        Some(cassette.clone()),
    )
    .await;
    assert_eq!(orphan.status, StatusCode::BAD_REQUEST);
    assert!(orphan.body["message"].as_str().unwrap().contains("summer"));

    let project = send(
        &app,
        Method::POST,
        "/apis/digitized.kindserve.dev/v1alpha1/projects/",
        Some(json!({"metadata": {"name": "summer"}})),
    )
    .await;
    assert_eq!(project.status, StatusCode::CREATED);

    let adopted = send(
        &app,
        Method::POST,
        "/apis/digitized.kindserve.dev/v1alpha1/cassettes/",
        Some(cassette),
    )
    .await;
    assert_eq!(adopted.status, StatusCode::CREATED);

    let invalid = send(
        &app,
        Method::POST,
        "/apis/digitized.kindserve.dev/v1alpha1/projects/",
        Some(json!({"metadata": {"name": "Not_A_Label"}})),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_never_creates_named_objects() {
    let (store, shared) = recording();
    let app = app(shared);

    let widget = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/namespaces/ns1/widgets/",
        Some(json!({"metadata": {"name": "ghost"}, "spec": {"x": 1}})),
    )
    .await;
    assert_eq!(widget.status, StatusCode::NOT_FOUND);

    let gadget = send(
        &app,
        Method::PATCH,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "ghost"}})),
    )
    .await;
    assert_eq!(gadget.status, StatusCode::NOT_FOUND);

    assert_store_calls!(store, StoreOp::Patch, 0);
    assert!(store.inner().is_empty().await);
}

#[tokio::test]
async fn demo_patches_are_validated_and_cannot_bypass_hooks() {
    let scheme = demo::scheme().unwrap();
    let store = Arc::new(InMemoryStore::new());
    demo::seed(store.as_ref(), &scheme).await.unwrap();
    let app = app_with(scheme, store.clone(), demo::register_hooks);
    let base = "/apis/digitized.kindserve.dev/v1alpha1";

    let orphan = send(
        &app,
        Method::PATCH,
        &format!("{base}/namespaces/ghost/cassettes/"),
        Some(json!({"metadata": {"name": "001"}})),
    )
    .await;
    assert_eq!(orphan.status, StatusCode::NOT_FOUND);

    let project = send(
        &app,
        Method::PATCH,
        &format!("{base}/projects/"),
        Some(json!({"metadata": {"name": "Not_A_Label"}})),
    )
    .await;
    assert_eq!(project.status, StatusCode::NOT_FOUND);

    let rewind = send(
        &app,
        Method::PATCH,
        &format!("{base}/recorder/"),
        Some(json!({"spec": {"action": "Rewind"}})),
    )
    .await;
    assert_eq!(rewind.status, StatusCode::BAD_REQUEST);
    assert!(rewind.body["message"].as_str().unwrap().contains("Rewind"));

    let recorder = send(&app, Method::GET, &format!("{base}/recorder/"), None).await;
    assert_eq!(recorder.body["spec"]["action"], "None");
    assert_eq!(store.len().await, 1);

    let record = send(
        &app,
        Method::PATCH,
        &format!("{base}/recorder/"),
        Some(json!({"spec": {"action": "Record", "cassette": "007"}})),
    )
    .await;
    assert_eq!(record.status, StatusCode::OK);
    assert_eq!(record.body["spec"]["action"], "Record");
}

#[tokio::test]
async fn oversized_bodies_are_rejected_as_status() {
    let (store, shared) = recording();
    let app = app(shared);

    let mut body = br#"{"metadata":{"name":"g1"},"pad":""#.to_vec();
    body.extend(std::iter::repeat_n(b'x', 3 * 1024 * 1024));
    body.extend(br#""}"#);
    let response = send_raw(&app, Method::POST, "/apis/g/v1/gadgets/", body, &[]).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.body["kind"], "Status");
    assert_store_calls!(store, StoreOp::Create, 0);
}

#[tokio::test]
async fn invalid_names_are_rejected_before_hooks() {
    let hooks_seen = RecordingStore::new();
    let seen = hooks_seen.clone();
    let app = app_with(fixtures::scheme(), Arc::new(InMemoryStore::new()), move |registry| {
        let gadgets = registry.resource_mut(&fixtures::gadget()).unwrap();
        gadgets.register_post_hook(object_hook_fn(move |_, obj| {
            seen.note(format!("hook {}", obj.name().unwrap_or_default()));
            Ok(())
        }));
    });

    let response = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "a/b"}})),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(hooks_seen.journal().is_empty());
}

#[tokio::test]
async fn sub_resource_names_are_reserved() {
    let app = app_with(fixtures::scheme(), Arc::new(InMemoryStore::new()), |registry| {
        let gadgets = registry.resource_mut(&fixtures::gadget()).unwrap();
        gadgets.register_sub_resource(
            "summary",
            sub_resource_fn(|_| Ok(Json(json!({})).into_response())),
        );
    });

    let reserved = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "summary"}})),
    )
    .await;
    assert_eq!(reserved.status, StatusCode::BAD_REQUEST);
    assert!(reserved.body["message"].as_str().unwrap().contains("reserved"));

    let plain = send(
        &app,
        Method::POST,
        "/apis/g/v1/gadgets/",
        Some(json!({"metadata": {"name": "other"}})),
    )
    .await;
    assert_eq!(plain.status, StatusCode::CREATED);
}
