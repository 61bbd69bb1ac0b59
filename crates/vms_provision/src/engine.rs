//! Schema instantiation engine.
//!
//! Copies a template into the store for one tenant in two passes:
//!
//! 1. **Create**: every collection is created with its non-relational fields
//!    only, so creation order never matters. Store-assigned ids are recorded in
//!    an [`IdMapping`].
//! 2. **Wire**: every created collection gets its full field list, with each
//!    relation retargeted from its template-local id to the new store id.
//!
//! Failures of a single collection are recorded in its [`CollectionReport`] and
//! the run moves on to the next one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use vms_ids::{CollectionId, TemplateCollectionId, TenantId};
use vms_schema::{classify, extract_non_relational, Field, Template, TemplateCollection};
use vms_store::{CollectionStore, NewCollection, SchemaUpdate};

use crate::naming::CollectionNaming;

/// Name of the text field that stands in for an otherwise empty field list.
pub const PLACEHOLDER_FIELD: &str = "__vms_placeholder";

/// What to do with a relation whose target collection was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedRelationPolicy {
    /// Keep the field pointing at its template-local id.
    #[default]
    Leave,
    /// Omit the field from the wired schema.
    Drop,
    /// Do not update the collection at all.
    Fail,
}

impl UnresolvedRelationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnresolvedRelationPolicy::Leave => "leave",
            UnresolvedRelationPolicy::Drop => "drop",
            UnresolvedRelationPolicy::Fail => "fail",
        }
    }
}

impl fmt::Display for UnresolvedRelationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnresolvedRelationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "leave" | "keep" => Ok(UnresolvedRelationPolicy::Leave),
            "drop" => Ok(UnresolvedRelationPolicy::Drop),
            "fail" => Ok(UnresolvedRelationPolicy::Fail),
            _ => Err(format!(
                "Invalid unresolved relation policy: '{}' (expected leave, drop or fail)",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineOptions {
    pub naming: CollectionNaming,
    pub unresolved_relations: UnresolvedRelationPolicy,
}

/// Template-local collection id to store-assigned id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdMapping(BTreeMap<TemplateCollectionId, CollectionId>);

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, template_id: TemplateCollectionId, store_id: CollectionId) {
        self.0.insert(template_id, store_id);
    }

    pub fn get(&self, template_id: &TemplateCollectionId) -> Option<&CollectionId> {
        self.0.get(template_id)
    }

    /// Look up a relation target as written in a template.
    pub fn resolve(&self, target: &str) -> Option<&CollectionId> {
        self.0.get(&TemplateCollectionId::new(target))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TemplateCollectionId, &CollectionId)> {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreationOutcome {
    Created {
        collection_id: CollectionId,
        /// The collection was created with the placeholder field.
        placeholder: bool,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotCreated,
}

/// A relation field whose target had no store id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRelation {
    pub field: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WiringOutcome {
    Wired {
        /// Relations retargeted to a store id.
        relations: usize,
        /// Kept with their template-local target.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unresolved: Vec<UnresolvedRelation>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        dropped: Vec<UnresolvedRelation>,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        reason: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        unresolved: Vec<UnresolvedRelation>,
    },
}

impl WiringOutcome {
    /// Wired, but with at least one relation left unresolved or dropped.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            WiringOutcome::Wired { unresolved, dropped, .. }
                if !unresolved.is_empty() || !dropped.is_empty()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub template_id: TemplateCollectionId,
    pub collection_name: String,
    pub creation: CreationOutcome,
    /// `None` until the wiring pass has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wiring: Option<WiringOutcome>,
}

impl CollectionReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.creation, CreationOutcome::Failed { .. })
            || matches!(self.wiring, Some(WiringOutcome::Failed { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstantiationReport {
    pub tenant_id: TenantId,
    pub mapping: IdMapping,
    pub collections: Vec<CollectionReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl InstantiationReport {
    pub fn collections_created(&self) -> usize {
        self.mapping.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectionReport> {
        self.collections.iter().filter(|c| c.is_failed())
    }

    pub fn degraded(&self) -> impl Iterator<Item = &CollectionReport> {
        self.collections
            .iter()
            .filter(|c| c.wiring.as_ref().is_some_and(WiringOutcome::is_degraded))
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none() && self.degraded().next().is_none()
    }
}

/// Run both passes of `template` for `tenant_id`.
pub async fn instantiate(
    store: &dyn CollectionStore,
    template: &Template,
    tenant_id: &TenantId,
    options: &EngineOptions,
) -> InstantiationReport {
    let started_at = Utc::now();
    tracing::info!(
        "Instantiating {} template collections for tenant {} on {}",
        template.len(),
        tenant_id,
        store.name()
    );

    let (mapping, mut collections) = create_collections(store, template, tenant_id, options).await;
    wire_relations(store, template, &mapping, &mut collections, options).await;

    let report = InstantiationReport {
        tenant_id: tenant_id.clone(),
        mapping,
        collections,
        started_at,
        finished_at: Utc::now(),
    };
    tracing::info!(
        "Tenant {}: {} of {} collections created, {} failed, {} degraded",
        tenant_id,
        report.collections_created(),
        template.len(),
        report.failures().count(),
        report.degraded().count()
    );
    report
}

/// Pass 1: create every collection with its non-relational fields.
pub async fn create_collections(
    store: &dyn CollectionStore,
    template: &Template,
    tenant_id: &TenantId,
    options: &EngineOptions,
) -> (IdMapping, Vec<CollectionReport>) {
    let mut mapping = IdMapping::new();
    let mut reports = Vec::with_capacity(template.len());

    for collection in template.collections() {
        let name = options.naming.scoped_name(tenant_id, &collection.name);
        let mut fields = extract_non_relational(collection);
        let placeholder = collection.declares_fields() && fields.is_empty();
        if placeholder {
            fields.push(Field::text(placeholder_name(collection)));
        }

        let spec = NewCollection {
            name: name.clone(),
            kind: collection.kind.clone(),
            schema: fields,
            list_rule: collection.list_rule.clone(),
            view_rule: collection.view_rule.clone(),
            create_rule: collection.create_rule.clone(),
            update_rule: collection.update_rule.clone(),
            delete_rule: collection.delete_rule.clone(),
            options: collection.options.clone(),
        };

        let creation = match store.create_collection(&spec).await {
            Ok(record) => {
                tracing::info!("Created collection {} ({})", name, record.id);
                mapping.insert(collection.id.clone(), record.id.clone());
                CreationOutcome::Created {
                    collection_id: record.id,
                    placeholder,
                }
            }
            Err(e) => {
                tracing::error!("Failed to create collection {}: {}", name, e);
                CreationOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        reports.push(CollectionReport {
            template_id: collection.id.clone(),
            collection_name: name,
            creation,
            wiring: None,
        });
    }

    (mapping, reports)
}

/// Pass 2: replace each created collection's field list with the complete,
/// retargeted one. `reports` must come from [`create_collections`] for the
/// same template.
pub async fn wire_relations(
    store: &dyn CollectionStore,
    template: &Template,
    mapping: &IdMapping,
    reports: &mut [CollectionReport],
    options: &EngineOptions,
) {
    for (collection, report) in template.collections().iter().zip(reports.iter_mut()) {
        let Some(store_id) = mapping.get(&collection.id) else {
            tracing::debug!("Skipping wiring of {}: not created", report.collection_name);
            report.wiring = Some(WiringOutcome::Skipped {
                reason: SkipReason::NotCreated,
            });
            continue;
        };

        let policy = options.unresolved_relations;
        let rebuilt = rebuild_fields(collection, mapping, policy);
        for relation in rebuilt.unresolved.iter().chain(&rebuilt.dropped) {
            tracing::warn!(
                "Relation {}.{} targets '{}', which was not created ({} policy)",
                report.collection_name,
                relation.field,
                relation.target,
                policy
            );
        }

        if policy == UnresolvedRelationPolicy::Fail && !rebuilt.unresolved.is_empty() {
            report.wiring = Some(WiringOutcome::Failed {
                reason: format!(
                    "{} unresolved relation(s); update not submitted",
                    rebuilt.unresolved.len()
                ),
                unresolved: rebuilt.unresolved,
            });
            continue;
        }

        let update = SchemaUpdate {
            schema: rebuilt.fields,
        };
        report.wiring = Some(match store.update_collection(store_id, &update).await {
            Ok(_) => {
                tracing::info!(
                    "Wired {} relation(s) on {}",
                    rebuilt.relations,
                    report.collection_name
                );
                WiringOutcome::Wired {
                    relations: rebuilt.relations,
                    unresolved: rebuilt.unresolved,
                    dropped: rebuilt.dropped,
                }
            }
            Err(e) => {
                tracing::error!("Failed to update collection {}: {}", report.collection_name, e);
                WiringOutcome::Failed {
                    reason: e.to_string(),
                    unresolved: rebuilt.unresolved,
                }
            }
        });
    }
}

struct RebuiltFields {
    fields: Vec<Field>,
    relations: usize,
    unresolved: Vec<UnresolvedRelation>,
    dropped: Vec<UnresolvedRelation>,
}

/// Full normalised field list in template order. Never contains the placeholder.
fn rebuild_fields(
    collection: &TemplateCollection,
    mapping: &IdMapping,
    policy: UnresolvedRelationPolicy,
) -> RebuiltFields {
    let mut rebuilt = RebuiltFields {
        fields: Vec::with_capacity(collection.fields().len()),
        relations: 0,
        unresolved: Vec::new(),
        dropped: Vec::new(),
    };

    for field in collection.fields() {
        let classification = classify(field);
        let normalized = classification.normalized;
        if !classification.relational {
            rebuilt.fields.push(normalized);
            continue;
        }

        let target = field.relation_target();
        let retargeted = target
            .and_then(|target| mapping.resolve(target))
            .map(|store_id| normalized.options.retarget(store_id.as_str()));
        match retargeted {
            Some(options) => {
                rebuilt.fields.push(normalized.with_options(options));
                rebuilt.relations += 1;
            }
            None => {
                let written = match target {
                    Some(target) => target.to_string(),
                    None => field
                        .options
                        .raw_target()
                        .map(|value| value.to_string())
                        .unwrap_or_default(),
                };
                let unresolved = UnresolvedRelation {
                    field: field.name.clone(),
                    target: written,
                };
                match policy {
                    UnresolvedRelationPolicy::Leave => {
                        rebuilt.fields.push(normalized);
                        rebuilt.unresolved.push(unresolved);
                    }
                    UnresolvedRelationPolicy::Drop => rebuilt.dropped.push(unresolved),
                    UnresolvedRelationPolicy::Fail => rebuilt.unresolved.push(unresolved),
                }
            }
        }
    }

    rebuilt
}

/// [`PLACEHOLDER_FIELD`], suffixed until it collides with no template field.
fn placeholder_name(collection: &TemplateCollection) -> String {
    let taken = |name: &str| collection.fields().iter().any(|f| f.name == name);
    let mut name = PLACEHOLDER_FIELD.to_string();
    let mut suffix = 1;
    while taken(&name) {
        name = format!("{}_{}", PLACEHOLDER_FIELD, suffix);
        suffix += 1;
    }
    name
}
