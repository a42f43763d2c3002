//! # Operation Dispatcher
//!
//! Resolves the model, checks that the operation is allowed, shapes input,
//! calls the store and builds the JSON:API document.
//!
//! Every operation resolves the model first: an unknown model is a 404
//! before any permission, body or storage check runs.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::errors::{PlaygroundError, PlaygroundResult, WriteOperation};
use super::filter::plan_filters;
use super::inflection::singularize;
use super::pagination::{plan_pagination, total_pages};
use super::parser::{attributes_of, whitelist, ListParams};
use super::record::Record;
use super::registry::{ModelEntry, Registry};
use super::response::{
    DataDocument, ListDocument, ListMeta, Outcome, PaginationMeta, ShowDocument, ShowMeta,
};
use super::serializer::serialize;
use super::store::{Scope, StoreError};

/// A requested operation and its input
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    List(ListParams),
    Show { id: String },
    Create { body: Value },
    Update { id: String, body: Value },
    Delete { id: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::List(_) => "list",
            Operation::Show { .. } => "show",
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}

/// Stateless request handler over a shared registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run one operation against `model_name`
    pub fn dispatch(&self, model_name: &str, operation: Operation) -> PlaygroundResult<Outcome> {
        let name = operation.name();
        let result = match operation {
            Operation::List(params) => self.list(model_name, &params).map(Outcome::List),
            Operation::Show { id } => self.show(model_name, &id).map(Outcome::Show),
            Operation::Create { body } => self.create(model_name, &body).map(Outcome::Created),
            Operation::Update { id, body } => {
                self.update(model_name, &id, &body).map(Outcome::Updated)
            }
            Operation::Delete { id } => self.delete(model_name, &id).map(|_| Outcome::Deleted),
        };

        if let Err(err) = &result {
            if err.is_domain() {
                warn!(
                    operation = name,
                    model = model_name,
                    status = err.status_code().as_u16(),
                    "{}",
                    err
                );
            }
        }
        result
    }

    /// Singularize and look up; anything unresolvable is "model not found"
    fn resolve(&self, model_name: &str) -> PlaygroundResult<ModelEntry> {
        let key = singularize(model_name);
        self.registry
            .lookup(&key)
            .ok_or_else(|| PlaygroundError::model_not_found(model_name, self.registry.model_names()))
    }

    fn find(&self, entry: &ModelEntry, id: &str) -> PlaygroundResult<Record> {
        entry
            .store
            .find(id, &entry.config.relationships)?
            .ok_or_else(|| PlaygroundError::record_not_found(entry.config.name.clone(), id))
    }

    /// List records with filtering and pagination
    #[instrument(skip_all, fields(operation = "list", model = %model_name))]
    pub fn list(&self, model_name: &str, params: &ListParams) -> PlaygroundResult<ListDocument> {
        let entry = self.resolve(model_name)?;
        let config = &entry.config;

        let predicates = plan_filters(&params.filters, &config.filters);
        let mut scope = Scope::new()
            .including(&config.relationships)
            .filtered(predicates);
        debug!(predicates = ?scope.predicates, "filters planned");

        let pagination = config.pagination;
        let total_count = if pagination.enabled && pagination.total_count {
            Some(entry.store.count(&scope)?)
        } else {
            None
        };

        let page = if pagination.enabled {
            let plan = plan_pagination(&params.page, &pagination);
            debug!(?plan, "page planned");
            scope = scope.windowed(plan.offset, plan.limit);
            Some(plan)
        } else {
            None
        };

        let records = entry.store.load(&scope)?;
        let data = records.iter().map(|r| serialize(r, config)).collect();

        let pagination_meta = page.map(|plan| PaginationMeta {
            current_page: plan.page_number,
            page_size: plan.page_size,
            total_pages: total_count.map(|total| total_pages(total, plan.page_size)),
        });

        Ok(ListDocument {
            data,
            meta: ListMeta {
                available_attributes: config.attributes_json(),
                available_filters: config.filters.clone(),
                available_models: self.registry.model_names(),
                total_count,
                pagination: pagination_meta,
            },
        })
    }

    /// Fetch one record by id
    #[instrument(skip_all, fields(operation = "show", model = %model_name, id = %id))]
    pub fn show(&self, model_name: &str, id: &str) -> PlaygroundResult<ShowDocument> {
        let entry = self.resolve(model_name)?;
        let record = self.find(&entry, id)?;

        Ok(ShowDocument {
            data: serialize(&record, &entry.config),
            meta: ShowMeta {
                available_attributes: entry.config.attributes_json(),
                available_models: self.registry.model_names(),
            },
        })
    }

    /// Create a record from whitelisted attributes
    #[instrument(skip_all, fields(operation = "create", model = %model_name))]
    pub fn create(&self, model_name: &str, body: &Value) -> PlaygroundResult<DataDocument> {
        let entry = self.resolve(model_name)?;
        let config = &entry.config;

        let allowed = config
            .requests
            .create
            .fields()
            .ok_or_else(|| PlaygroundError::not_supported(config.name.clone(), WriteOperation::Create))?;

        let attributes = whitelist(attributes_of(body)?, allowed);
        let record = entry
            .store
            .create(attributes)
            .map_err(|err| write_error(&config.name, err))?;
        info!(model = %config.name, id = record.id(), "record created");

        Ok(DataDocument {
            data: serialize(&record, config),
        })
    }

    /// Partially update a record from whitelisted attributes
    #[instrument(skip_all, fields(operation = "update", model = %model_name, id = %id))]
    pub fn update(&self, model_name: &str, id: &str, body: &Value) -> PlaygroundResult<DataDocument> {
        let entry = self.resolve(model_name)?;
        let config = &entry.config;

        let allowed = config
            .requests
            .update
            .fields()
            .ok_or_else(|| PlaygroundError::not_supported(config.name.clone(), WriteOperation::Update))?;

        let record = self.find(&entry, id)?;
        let attributes = whitelist(attributes_of(body)?, allowed);
        let updated = entry
            .store
            .update(&record, attributes)
            .map_err(|err| write_error(&config.name, err))?;
        info!(model = %config.name, id = updated.id(), "record updated");

        Ok(DataDocument {
            data: serialize(&updated, config),
        })
    }

    /// Destroy a record
    #[instrument(skip_all, fields(operation = "delete", model = %model_name, id = %id))]
    pub fn delete(&self, model_name: &str, id: &str) -> PlaygroundResult<()> {
        let entry = self.resolve(model_name)?;
        let config = &entry.config;

        if !config.requests.delete {
            return Err(PlaygroundError::not_supported(config.name.clone(), WriteOperation::Delete));
        }

        let record = self.find(&entry, id)?;
        entry.store.destroy(&record).map_err(|err| match err {
            StoreError::NotDestroyed { reason } => {
                debug!(%reason, "destroy refused");
                PlaygroundError::Deletion {
                    model: config.name.clone(),
                    id: id.to_string(),
                }
            }
            StoreError::NotFound { id } => PlaygroundError::record_not_found(config.name.clone(), id),
            other => PlaygroundError::Storage(other),
        })?;
        info!(model = %config.name, id, "record destroyed");
        Ok(())
    }
}

/// Validation failures and vanished records are domain errors; everything
/// else stays a fault
fn write_error(model: &str, err: StoreError) -> PlaygroundError {
    match err {
        StoreError::Invalid(errors) => PlaygroundError::Validation(errors),
        StoreError::NotFound { id } => PlaygroundError::record_not_found(model, id),
        other => PlaygroundError::Storage(other),
    }
}
