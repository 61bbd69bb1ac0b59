//! Full provisioning runs against the in-memory store.

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use vms_ids::{CollectionId, TenantId};
use vms_provision::{
    CollectionNaming, CreationOutcome, EngineOptions, ProvisionError, ProvisionSettings,
    SkipReason, TemplateSource, TenantService, UnresolvedRelationPolicy, WiringOutcome,
    PLACEHOLDER_FIELD,
};
use vms_schema::{Field, Template};
use vms_store::{
    CollectionRecord, CollectionStore, InMemoryStore, NewCollection, SchemaUpdate, Session,
    StoreError, TenantRecord,
};

const BASE_ITEMS: &str = r#"[
    {
        "id": "tpl_base_items",
        "name": "base_items",
        "type": "base",
        "schema": [
            {"id": "f1", "system": false, "name": "label", "type": "text", "required": true},
            {"id": "f2", "name": "created", "type": "autodate", "options": {"onCreate": true}}
        ],
        "listRule": "",
        "viewRule": ""
    }
]"#;

/// users <- cameras <-> sites, with cameras also pointing at itself.
const SURVEILLANCE: &str = r#"[
    {
        "id": "tpl_users",
        "name": "users",
        "type": "base",
        "schema": [{"name": "email", "type": "email", "required": true}]
    },
    {
        "id": "tpl_cameras",
        "name": "cameras",
        "schema": [
            {"name": "label", "type": "text"},
            {"name": "site", "type": "relation", "options": {"collectionId": "tpl_sites", "maxSelect": 1}},
            {"name": "owner", "type": "relation", "options": {"collectionId": "tpl_users", "cascadeDelete": true}},
            {"name": "backup", "type": "relation", "options": {"collectionId": "tpl_cameras"}}
        ]
    },
    {
        "id": "tpl_sites",
        "name": "sites",
        "schema": [
            {"name": "primary_camera", "type": "relation", "options": {"collectionId": "tpl_cameras", "displayFields": ["label"]}}
        ]
    }
]"#;

fn loaded(json: &str) -> TemplateSource {
    TemplateSource::Loaded(Arc::new(Template::from_json_str(json).unwrap()))
}

fn service(store: Arc<InMemoryStore>, template: TemplateSource) -> TenantService {
    TenantService::new(store, ProvisionSettings::new(template))
}

fn service_with_policy(
    store: Arc<InMemoryStore>,
    template: TemplateSource,
    policy: UnresolvedRelationPolicy,
) -> TenantService {
    let engine = EngineOptions {
        naming: CollectionNaming::default(),
        unresolved_relations: policy,
    };
    TenantService::new(store, ProvisionSettings::new(template).with_engine(engine))
}

fn has_placeholder(record: &CollectionRecord) -> bool {
    record
        .schema
        .iter()
        .any(|f| f.name.starts_with(PLACEHOLDER_FIELD))
}

#[tokio::test]
async fn test_acme_base_items_end_to_end() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BASE_ITEMS.as_bytes()).unwrap();
    let store = Arc::new(InMemoryStore::new());
    let service = service(
        store.clone(),
        TemplateSource::Path(file.path().to_path_buf()),
    );

    let result = service.create_tenant_configuration("Acme").await.unwrap();

    assert_eq!(result.tenant_id.as_str().len(), 8);
    assert_eq!(result.tenant_name, "Acme");
    assert_eq!(result.collections_created, 1);
    assert_eq!(result.status, "success");
    assert!(result.report.is_clean());

    let name = format!("vms_{}_base_items", result.tenant_id);
    let record = store.collection_by_name(&name).unwrap();
    let fields: Vec<_> = record.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["label", "created"]);
    assert_eq!(record.field("created").unwrap().field_type.as_str(), "date");
    assert!(record.schema.iter().all(|f| f.extra.is_empty()));

    let tenants = store.tenants();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].tenant_id, result.tenant_id);

    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(
        body,
        serde_json::json!({
            "tenant_id": result.tenant_id.as_str(),
            "tenant_name": "Acme",
            "collections_created": 1,
            "status": "success"
        })
    );
}

#[tokio::test]
async fn test_cycles_and_self_references_are_wired() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(store.clone(), loaded(SURVEILLANCE));

    let result = service.create_tenant_configuration("Northwind").await.unwrap();
    let report = &result.report;

    assert_eq!(result.collections_created, 3);
    assert!(report.is_clean());

    let id_of = |template_id: &str| report.mapping.resolve(template_id).unwrap().clone();
    let scoped = |base: &str| format!("vms_{}_{}", result.tenant_id, base);

    let cameras = store.collection_by_name(&scoped("cameras")).unwrap();
    let sites = store.collection_by_name(&scoped("sites")).unwrap();
    assert_eq!(cameras.id, id_of("tpl_cameras"));
    assert_eq!(sites.id, id_of("tpl_sites"));

    let site = cameras.field("site").unwrap().relation_options().unwrap();
    assert_eq!(site.collection_id.as_deref(), Some(sites.id.as_str()));
    assert_eq!(site.max_select, Some(1));
    assert_eq!(site.cascade_delete, Some(false));

    let owner = cameras.field("owner").unwrap().relation_options().unwrap();
    assert_eq!(owner.collection_id.as_deref(), Some(id_of("tpl_users").as_str()));
    assert_eq!(owner.cascade_delete, Some(true));

    assert_eq!(
        cameras.field("backup").unwrap().relation_target(),
        Some(cameras.id.as_str())
    );
    assert_eq!(
        sites.field("primary_camera").unwrap().relation_target(),
        Some(cameras.id.as_str())
    );

    // Every relation now points at a collection of this tenant.
    let own_ids: Vec<CollectionId> = store.collections().into_iter().map(|c| c.id).collect();
    for collection in store.collections() {
        for field in &collection.schema {
            if let Some(target) = field.relation_target() {
                assert!(own_ids.iter().any(|id| id.as_str() == target), "{}", target);
            }
        }
    }
}

/// Relation options exported with loose value shapes.
const LOOSE_RELATIONS: &str = r#"[
    {
        "id": "tpl_tags",
        "name": "tags",
        "schema": [{"name": "label", "type": "text"}]
    },
    {
        "id": "tpl_posts",
        "name": "posts",
        "schema": [
            {"name": "title", "type": "text"},
            {"name": "tags", "type": "relation", "options": {"collectionId": "tpl_tags", "maxSelect": 1.0, "displayFields": "label"}},
            {"name": "parent", "type": "relation", "options": {"collectionId": "tpl_posts", "minSelect": -1, "cascadeDelete": true}},
            {"name": "orphan", "type": "relation", "options": {"collectionId": null}}
        ]
    }
]"#;

#[tokio::test]
async fn test_loose_relation_options_are_wired() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(store.clone(), loaded(LOOSE_RELATIONS));

    let result = service.create_tenant_configuration("Loose Co").await.unwrap();
    let report = &result.report;
    assert_eq!(result.collections_created, 2);

    let posts_name = format!("vms_{}_posts", result.tenant_id);
    let requests = store.creation_requests();
    let posts_request = requests.iter().find(|r| r.name == posts_name).unwrap();
    let created: Vec<_> = posts_request.schema.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(created, vec!["title"]);

    let posts = store.collection_by_name(&posts_name).unwrap();
    let tags_id = report.mapping.resolve("tpl_tags").unwrap();
    let options = |name: &str| {
        serde_json::to_value(posts.field(name).unwrap()).unwrap()["options"].clone()
    };
    assert_eq!(
        options("tags"),
        serde_json::json!({
            "collectionId": tags_id.as_str(),
            "cascadeDelete": false,
            "minSelect": null,
            "maxSelect": 1.0,
            "displayFields": "label"
        })
    );
    assert_eq!(options("parent")["collectionId"], posts.id.as_str());
    assert_eq!(options("parent")["minSelect"], -1);
    assert_eq!(options("parent")["cascadeDelete"], true);

    match report.collections[1].wiring.as_ref().unwrap() {
        WiringOutcome::Wired {
            relations,
            unresolved,
            ..
        } => {
            assert_eq!(*relations, 2);
            assert_eq!(unresolved.len(), 1);
            assert_eq!(unresolved[0].field, "orphan");
            assert_eq!(unresolved[0].target, "null");
        }
        other => panic!("unexpected wiring outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_placeholder_only_during_creation() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(store.clone(), loaded(SURVEILLANCE));

    let result = service.create_tenant_configuration("Placeholder Co").await.unwrap();

    let sites = &result.report.collections[2];
    assert!(matches!(
        sites.creation,
        CreationOutcome::Created { placeholder: true, .. }
    ));
    let placeholders = result
        .report
        .collections
        .iter()
        .filter(|c| matches!(c.creation, CreationOutcome::Created { placeholder: true, .. }))
        .count();
    assert_eq!(placeholders, 1);

    assert!(store.collections().iter().all(|c| !has_placeholder(c)));
}

#[tokio::test]
async fn test_creation_failure_is_isolated_leave_policy() {
    let store = Arc::new(InMemoryStore::new().failing_create("_sites"));
    let service = service(store.clone(), loaded(SURVEILLANCE));

    let result = service.create_tenant_configuration("Partial").await.unwrap();
    let report = &result.report;

    assert_eq!(result.collections_created, 2);
    assert!(matches!(report.collections[2].creation, CreationOutcome::Failed { .. }));
    assert_eq!(
        report.collections[2].wiring,
        Some(WiringOutcome::Skipped {
            reason: SkipReason::NotCreated
        })
    );

    let cameras_report = &report.collections[1];
    match cameras_report.wiring.as_ref().unwrap() {
        WiringOutcome::Wired {
            relations,
            unresolved,
            dropped,
        } => {
            assert_eq!(*relations, 2);
            assert_eq!(unresolved.len(), 1);
            assert_eq!(unresolved[0].field, "site");
            assert_eq!(unresolved[0].target, "tpl_sites");
            assert!(dropped.is_empty());
        }
        other => panic!("unexpected wiring outcome {:?}", other),
    }
    assert_eq!(report.degraded().count(), 1);

    let cameras = store
        .collection_by_name(&format!("vms_{}_cameras", result.tenant_id))
        .unwrap();
    assert_eq!(cameras.field("site").unwrap().relation_target(), Some("tpl_sites"));
}

#[tokio::test]
async fn test_drop_policy_omits_unresolved_relations() {
    let store = Arc::new(InMemoryStore::new().failing_create("_sites"));
    let service = service_with_policy(store.clone(), loaded(SURVEILLANCE), UnresolvedRelationPolicy::Drop);

    let result = service.create_tenant_configuration("Dropper").await.unwrap();

    let cameras = store
        .collection_by_name(&format!("vms_{}_cameras", result.tenant_id))
        .unwrap();
    assert!(cameras.field("site").is_none());
    assert!(cameras.field("owner").is_some());
    assert!(matches!(
        result.report.collections[1].wiring,
        Some(WiringOutcome::Wired { ref dropped, .. }) if dropped.len() == 1
    ));
}

#[tokio::test]
async fn test_fail_policy_skips_update() {
    let store = Arc::new(InMemoryStore::new().failing_create("_sites"));
    let service = service_with_policy(store.clone(), loaded(SURVEILLANCE), UnresolvedRelationPolicy::Fail);

    let result = service.create_tenant_configuration("Strict").await.unwrap();

    assert!(matches!(
        result.report.collections[1].wiring,
        Some(WiringOutcome::Failed { ref unresolved, .. }) if unresolved.len() == 1
    ));
    // users is still wired; cameras keeps its creation-time schema.
    assert_eq!(store.update_calls(), 1);
    let cameras = store
        .collection_by_name(&format!("vms_{}_cameras", result.tenant_id))
        .unwrap();
    assert!(cameras.field("owner").is_none());
    assert_eq!(result.report.failures().count(), 2);
}

#[tokio::test]
async fn test_update_failure_does_not_stop_other_collections() {
    let store = Arc::new(InMemoryStore::new().failing_update("_cameras"));
    let service = service(store.clone(), loaded(SURVEILLANCE));

    let result = service.create_tenant_configuration("Flaky").await.unwrap();

    assert_eq!(result.collections_created, 3);
    assert!(matches!(
        result.report.collections[1].wiring,
        Some(WiringOutcome::Failed { .. })
    ));
    assert!(matches!(
        result.report.collections[2].wiring,
        Some(WiringOutcome::Wired { relations: 1, .. })
    ));
    assert_eq!(store.update_calls(), 3);
}

#[tokio::test]
async fn test_exhaustion_aborts_before_any_write() {
    let store = Arc::new(InMemoryStore::new().with_all_tenant_ids_occupied());
    let service = service(store.clone(), loaded(BASE_ITEMS));

    let err = service.create_tenant_configuration("Acme").await.unwrap_err();

    assert!(matches!(err, ProvisionError::Exhausted { attempts: 10 }));
    assert_eq!(store.probe_calls(), 10);
    assert!(store.tenants().is_empty());
    assert!(store.collections().is_empty());
}

#[tokio::test]
async fn test_missing_template_aborts_before_any_write() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(
        store.clone(),
        TemplateSource::Path("/nonexistent/pb_schema.json".into()),
    );

    let err = service.create_tenant_configuration("Acme").await.unwrap_err();

    assert!(matches!(err, ProvisionError::Template(_)));
    assert_eq!(store.probe_calls(), 0);
    assert!(store.tenants().is_empty());
}

#[tokio::test]
async fn test_invalid_name_rejected_before_store_access() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(store.clone(), loaded(BASE_ITEMS));

    let err = service.create_tenant_configuration("  x ").await.unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(store.probe_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_id_length_aborts_before_store_access() {
    let store = Arc::new(InMemoryStore::new());
    let mut settings = ProvisionSettings::new(loaded(BASE_ITEMS));
    settings.id_length = 0;
    let service = TenantService::new(store.clone(), settings);

    let err = service.create_tenant_configuration("Acme").await.unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidIdLength { length: 0, .. }));
    assert_eq!(store.auth_calls(), 0);
    assert!(store.tenants().is_empty());
}

#[tokio::test]
async fn test_authentication_failure_is_fatal() {
    let store = Arc::new(InMemoryStore::new().rejecting_auth());
    let service = service(store.clone(), loaded(BASE_ITEMS));

    let err = service.create_tenant_configuration("Acme").await.unwrap_err();

    assert!(matches!(err, ProvisionError::Store(StoreError::Auth(_))));
    assert_eq!(store.auth_calls(), 1);
    assert_eq!(store.probe_calls(), 0);
    assert!(store.tenants().is_empty());
    assert!(store.creation_requests().is_empty());
}

#[tokio::test]
async fn test_duplicate_tenant_id_is_run_failure() {
    // Probe says free, but another run recorded the same id in between.
    let store = Arc::new(RacingStore::new());
    let settings = ProvisionSettings::new(loaded(BASE_ITEMS)).with_rng_seed(99);
    let service = TenantService::new(store.clone(), settings);

    let first = service.create_tenant_configuration("First").await.unwrap();
    let err = service.create_tenant_configuration("Second").await.unwrap_err();

    assert!(matches!(err, ProvisionError::TenantRecord(StoreError::Conflict(_))));
    assert_eq!(store.inner.tenants().len(), 1);
    assert_eq!(store.inner.tenants()[0].tenant_id, first.tenant_id);
    assert_eq!(store.inner.collections().len(), 1);
}

#[tokio::test]
async fn test_describe_tenant_lists_its_collections() {
    let store = Arc::new(InMemoryStore::new());
    let service = service(store.clone(), loaded(SURVEILLANCE));
    let first = service.create_tenant_configuration("One").await.unwrap();
    service.create_tenant_configuration("Two").await.unwrap();

    let detail = service.describe_tenant(&first.tenant_id).await.unwrap().unwrap();
    assert_eq!(detail.tenant_name, "One");
    assert_eq!(detail.collections.len(), 3);
    assert!(detail
        .collections
        .iter()
        .all(|name| name.starts_with(&format!("vms_{}_", first.tenant_id))));

    let unknown = TenantId::parse("zzzzzzzz").unwrap();
    assert!(service.describe_tenant(&unknown).await.unwrap().is_none());
}

/// Store whose probe always reports ids as free, like a check that lost a race.
struct RacingStore {
    inner: InMemoryStore,
}

impl RacingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
        }
    }

}

#[async_trait]
impl CollectionStore for RacingStore {
    fn name(&self) -> &str {
        "racing"
    }

    async fn authenticate(&self) -> Result<Session, StoreError> {
        self.inner.authenticate().await
    }

    async fn create_collection(&self, spec: &NewCollection) -> Result<CollectionRecord, StoreError> {
        self.inner.create_collection(spec).await
    }

    async fn update_collection(
        &self,
        id: &CollectionId,
        update: &SchemaUpdate,
    ) -> Result<CollectionRecord, StoreError> {
        self.inner.update_collection(id, update).await
    }

    async fn create_tenant_record(
        &self,
        name: &str,
        tenant_id: &TenantId,
    ) -> Result<TenantRecord, StoreError> {
        self.inner.create_tenant_record(name, tenant_id).await
    }

    async fn identifier_in_use(&self, _tenant_id: &TenantId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn find_tenant(&self, tenant_id: &TenantId) -> Result<Option<TenantRecord>, StoreError> {
        self.inner.find_tenant(tenant_id).await
    }

    async fn list_collections(&self, name_prefix: &str) -> Result<Vec<CollectionRecord>, StoreError> {
        self.inner.list_collections(name_prefix).await
    }
}

#[test]
fn test_relation_field_helper_targets_template_id() {
    assert_eq!(Field::relation("x", "tpl_a").relation_target(), Some("tpl_a"));
}
