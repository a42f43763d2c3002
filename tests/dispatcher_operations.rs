//! Dispatcher Operation Tests
//!
//! End-to-end behavior of list/show/create/update/delete against the
//! in-memory store:
//! - Unknown models fail identically at every operation
//! - Page sizes are clamped, page numbers are echoed
//! - Writes only ever see whitelisted fields
//! - Updates are partial
//! - Validation and deletion failures render as error envelopes

use std::sync::Arc;

use playground::playground::{
    Attributes, Dispatcher, FieldValue, FilterDef, ListParams, MemoryStore, ModelConfiguration,
    ModelOptions, Operation, Outcome, PlaygroundError, Record, RecordStore, Registry, Relation,
    Scope, StoreResult, WriteOperation,
};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn recipe_options() -> ModelOptions {
    ModelOptions::new()
        .attributes(["title", "body"])
        .create(["title", "body"])
        .update(["title", "body"])
        .delete(true)
        .filter(FilterDef::partial("title"))
        .filter(FilterDef::exact("status"))
        .page_size(2)
}

fn setup() -> (Dispatcher, Arc<MemoryStore>) {
    let registry = Arc::new(Registry::new());
    let store = Arc::new(MemoryStore::new().require(["title", "body"]));
    registry.register("recipe", recipe_options(), store.clone());
    registry.register(
        "ingredient",
        ModelOptions::new().attributes(["name"]),
        Arc::new(MemoryStore::new()),
    );
    (Dispatcher::new(registry), store)
}

fn body(attributes: Value) -> Value {
    json!({"data": {"type": "recipes", "attributes": attributes}})
}

fn create(dispatcher: &Dispatcher, title: &str, body_text: &str) -> String {
    dispatcher
        .create("recipe", &body(json!({"title": title, "body": body_text})))
        .unwrap()
        .data
        .id
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

// =============================================================================
// Model Resolution
// =============================================================================

/// Every operation reports an unknown model the same way.
#[test]
fn test_unknown_model_is_identical_across_operations() {
    let (dispatcher, _) = setup();
    let operations = vec![
        Operation::List(ListParams::default()),
        Operation::Show { id: "1".to_string() },
        Operation::Create { body: body(json!({})) },
        Operation::Update {
            id: "1".to_string(),
            body: body(json!({})),
        },
        Operation::Delete { id: "1".to_string() },
    ];

    let envelopes: Vec<Value> = operations
        .into_iter()
        .map(|op| match dispatcher.dispatch("widgets", op) {
            Err(err) => to_json(&err.to_envelope()),
            Ok(outcome) => panic!("expected failure, got {:?}", outcome),
        })
        .collect();

    for envelope in &envelopes {
        assert_eq!(envelope, &envelopes[0]);
    }
    assert_eq!(envelopes[0]["errors"][0]["status"], "404");
    assert_eq!(
        envelopes[0]["errors"][0]["available_models"],
        json!(["ingredient", "recipe"])
    );
}

/// Singular and plural path segments reach the same model.
#[test]
fn test_plural_and_singular_names_resolve() {
    let (dispatcher, _) = setup();
    let id = create(&dispatcher, "Soup", "Hot");

    let plural = dispatcher.show("recipes", &id).unwrap();
    let singular = dispatcher.show("recipe", &id).unwrap();
    assert_eq!(to_json(&plural), to_json(&singular));
}

// =============================================================================
// Pagination
// =============================================================================

/// Page size stays within 1..=50 whatever is requested.
#[test]
fn test_page_size_is_clamped() {
    let (dispatcher, _) = setup();
    for i in 0..3 {
        create(&dispatcher, &format!("R{}", i), "B");
    }

    for (requested, expected) in [(0, 1), (-5, 1), (1, 1), (50, 50), (51, 50), (i64::MAX, 50)] {
        let doc = dispatcher
            .list("recipe", &ListParams::default().with_page(1, requested))
            .unwrap();
        assert_eq!(doc.meta.pagination.unwrap().page_size, expected);
    }
}

/// Five records at two per page make three pages; page 4 is empty but echoed.
#[test]
fn test_total_pages_and_out_of_range_page() {
    let (dispatcher, _) = setup();
    for i in 0..5 {
        create(&dispatcher, &format!("R{}", i), "B");
    }

    let doc = dispatcher.list("recipe", &ListParams::default()).unwrap();
    assert_eq!(doc.data.len(), 2);
    assert_eq!(doc.meta.total_count, Some(5));
    let pagination = doc.meta.pagination.unwrap();
    assert_eq!(pagination.total_pages, Some(3));
    assert_eq!(pagination.current_page, 1);

    let last = dispatcher
        .list("recipe", &ListParams::default().with_page(3, 2))
        .unwrap();
    assert_eq!(last.data.len(), 1);

    let beyond = dispatcher
        .list("recipe", &ListParams::default().with_page(4, 2))
        .unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.meta.pagination.unwrap().current_page, 4);
}

/// Without pagination the whole set comes back and no pagination meta is sent.
#[test]
fn test_pagination_disabled() {
    let registry = Arc::new(Registry::new());
    let store = Arc::new(MemoryStore::new());
    for i in 0..20 {
        store
            .insert(Record::new(i.to_string()).with_field("name", format!("n{}", i)))
            .unwrap();
    }
    registry.register(
        "tag",
        ModelOptions::new().attributes(["name"]).without_pagination(),
        store,
    );
    let dispatcher = Dispatcher::new(registry);

    let doc = dispatcher.list("tags", &ListParams::default()).unwrap();
    assert_eq!(doc.data.len(), 20);
    let meta = to_json(&doc.meta);
    assert!(meta.get("pagination").is_none());
    assert!(meta.get("total_count").is_none());
}

/// total_count can be switched off independently of pagination.
#[test]
fn test_total_count_disabled() {
    let registry = Arc::new(Registry::new());
    registry.register(
        "tag",
        ModelOptions::new().attributes(["name"]).without_total_count(),
        Arc::new(MemoryStore::new()),
    );
    let doc = Dispatcher::new(registry)
        .list("tag", &ListParams::default())
        .unwrap();

    assert_eq!(doc.meta.total_count, None);
    let pagination = doc.meta.pagination.unwrap();
    assert_eq!(pagination.total_pages, None);
    assert_eq!(pagination.page_size, 15);
}

// =============================================================================
// Filtering
// =============================================================================

/// Filters combine conjunctively; unconfigured filter keys are ignored.
#[test]
fn test_filters_are_conjunctive_and_whitelisted() {
    let (dispatcher, store) = setup();
    store
        .insert(
            Record::new("1")
                .with_field("title", "Tomato Soup")
                .with_field("body", "B")
                .with_field("status", "published"),
        )
        .unwrap();
    store
        .insert(
            Record::new("2")
                .with_field("title", "Onion soup")
                .with_field("body", "B")
                .with_field("status", "draft"),
        )
        .unwrap();
    store
        .insert(
            Record::new("3")
                .with_field("title", "Salad")
                .with_field("body", "B")
                .with_field("status", "published"),
        )
        .unwrap();

    let params = ListParams::default()
        .with_filter("title", "SOUP")
        .with_filter("status", "published")
        .with_filter("body", "nothing matches this");
    let doc = dispatcher.list("recipe", &params).unwrap();

    let ids: Vec<&str> = doc.data.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
    assert_eq!(doc.meta.total_count, Some(1));
    assert_eq!(
        to_json(&doc.meta.available_filters),
        json!([{"field": "title", "type": "partial"}, {"field": "status", "type": "exact"}])
    );
}

// =============================================================================
// Writes
// =============================================================================

/// Declared example: create with title and body answers 201 with both.
#[test]
fn test_create_example() {
    let (dispatcher, _) = setup();
    let outcome = dispatcher
        .dispatch(
            "recipe",
            Operation::Create {
                body: body(json!({"title": "T", "body": "B"})),
            },
        )
        .unwrap();

    assert_eq!(outcome.status_code(), 201);
    match outcome {
        Outcome::Created(doc) => {
            assert_eq!(Value::Object(doc.data.attributes), json!({"title": "T", "body": "B"}));
            assert_eq!(doc.data.kind, "recipes");
        }
        other => panic!("expected Created, got {:?}", other),
    }
}

/// Fields outside the whitelist never reach the store.
#[test]
fn test_create_drops_unauthorized_fields() {
    let (dispatcher, store) = setup();
    let doc = dispatcher
        .create(
            "recipe",
            &body(json!({"title": "T", "body": "B", "unauthorized_field": "x"})),
        )
        .unwrap();

    assert!(doc.data.attributes.get("unauthorized_field").is_none());
    let stored = store_record(&store, &doc.data.id);
    assert!(stored.read("unauthorized_field").is_none());
}

fn store_record(store: &MemoryStore, id: &str) -> Record {
    use playground::playground::RecordStore;
    store.find(id, &[]).unwrap().unwrap()
}

/// Updating only the title leaves the body untouched.
#[test]
fn test_partial_update() {
    let (dispatcher, _) = setup();
    let id = create(&dispatcher, "Soup", "Hot");

    let updated = dispatcher
        .update("recipe", &id, &body(json!({"title": "Stew"})))
        .unwrap();
    assert_eq!(updated.data.attributes["title"], "Stew");
    assert_eq!(updated.data.attributes["body"], "Hot");
}

/// What was written is what show returns.
#[test]
fn test_create_then_show_round_trip() {
    let (dispatcher, _) = setup();
    let created = dispatcher
        .create("recipe", &body(json!({"title": "Soup", "body": "Hot"})))
        .unwrap();
    let shown = dispatcher.show("recipe", &created.data.id).unwrap();

    assert_eq!(shown.data.attributes, created.data.attributes);
    assert_eq!(to_json(&shown.meta.available_attributes), json!({"ungrouped": ["title", "body"]}));
}

/// Two blank required fields produce two errors with distinct pointers.
#[test]
fn test_validation_errors_per_field() {
    let (dispatcher, store) = setup();
    let err = dispatcher
        .create("recipe", &body(json!({"title": "", "body": null})))
        .unwrap_err();

    assert!(matches!(err, PlaygroundError::Validation(_)));
    let envelope = err.to_envelope();
    assert_eq!(envelope.errors.len(), 2);

    let pointers: Vec<String> = envelope
        .errors
        .iter()
        .map(|e| e.source.as_ref().unwrap().pointer.clone())
        .collect();
    assert_eq!(pointers, vec!["/data/attributes/title", "/data/attributes/body"]);
    assert!(envelope.errors.iter().all(|e| e.status == "422"));
    assert!(store.is_empty().unwrap());
}

/// A failed update does not change the stored record.
#[test]
fn test_failed_update_is_not_applied() {
    let (dispatcher, store) = setup();
    let id = create(&dispatcher, "Soup", "Hot");

    let err = dispatcher
        .update("recipe", &id, &body(json!({"title": " ", "body": "Cold"})))
        .unwrap_err();
    assert_eq!(err.status_code().as_u16(), 422);
    assert_eq!(store_record(&store, &id).read("body"), Some(&FieldValue::from("Hot")));
}

/// Missing `data` and missing `attributes` are both 400s naming the member.
#[test]
fn test_missing_body_members() {
    let (dispatcher, _) = setup();

    let err = dispatcher.create("recipe", &json!({"title": "T"})).unwrap_err();
    assert!(matches!(err, PlaygroundError::ParameterMissing(ref p) if p == "data"));
    assert_eq!(err.status_code().as_u16(), 400);

    let err = dispatcher
        .create("recipe", &json!({"data": {"type": "recipes"}}))
        .unwrap_err();
    assert!(matches!(err, PlaygroundError::ParameterMissing(ref p) if p == "attributes"));
}

/// Disabled operations are refused before the body or record is examined.
#[test]
fn test_disabled_operations() {
    let (dispatcher, _) = setup();

    let err = dispatcher.create("ingredient", &json!(null)).unwrap_err();
    assert!(matches!(
        err,
        PlaygroundError::RequestNotSupported {
            operation: WriteOperation::Create,
            ..
        }
    ));
    assert_eq!(err.status_code().as_u16(), 405);
    assert_eq!(
        err.to_envelope().errors[0].detail,
        "The model 'ingredients' does not support create operations"
    );

    let err = dispatcher.update("ingredient", "404", &json!(null)).unwrap_err();
    assert_eq!(err.status_code().as_u16(), 405);

    let err = dispatcher.delete("ingredient", "404").unwrap_err();
    assert_eq!(err.status_code().as_u16(), 405);
}

// =============================================================================
// Reads and Deletes
// =============================================================================

/// Show of a missing id cites the id as given.
#[test]
fn test_show_missing_record() {
    let (dispatcher, _) = setup();
    let err = dispatcher.show("recipes", "abc").unwrap_err();

    let envelope = err.to_envelope();
    assert_eq!(envelope.errors[0].title, "Record not found");
    assert_eq!(envelope.errors[0].detail, "Could not find recipe with id 'abc'");
}

/// First delete succeeds with no body, the second is a 404 for the same id.
#[test]
fn test_delete_twice() {
    let (dispatcher, _) = setup();
    let id = create(&dispatcher, "Soup", "Hot");

    let first = dispatcher
        .dispatch("recipe", Operation::Delete { id: id.clone() })
        .unwrap();
    assert_eq!(first, Outcome::Deleted);
    assert_eq!(first.status_code(), 204);

    let second = dispatcher
        .dispatch("recipe", Operation::Delete { id: id.clone() })
        .unwrap_err();
    assert!(matches!(second, PlaygroundError::RecordNotFound { id: ref missing, .. } if *missing == id));
}

/// A refused destroy is a 422 pointing at the record.
#[test]
fn test_refused_delete() {
    let registry = Arc::new(Registry::new());
    let store = Arc::new(MemoryStore::new().with_destroy_guard(|record| {
        (record.read("locked") == Some(&FieldValue::Bool(true)))
            .then(|| "record is locked".to_string())
    }));
    store
        .insert(Record::new("5").with_field("locked", true))
        .unwrap();
    registry.register("recipe", ModelOptions::new().delete(true), store.clone());

    let err = Dispatcher::new(registry).delete("recipe", "5").unwrap_err();
    let envelope = err.to_envelope();
    assert_eq!(envelope.errors[0].status, "422");
    assert_eq!(envelope.errors[0].title, "Deletion Error");
    assert_eq!(envelope.errors[0].source.as_ref().unwrap().pointer, "/data/recipe/5");
    assert_eq!(store.len().unwrap(), 1);
}

/// Finds every id but holds nothing, as if each record were removed right
/// after being looked up.
struct VanishingStore(MemoryStore);

impl RecordStore for VanishingStore {
    fn find(&self, id: &str, _includes: &[String]) -> StoreResult<Option<Record>> {
        Ok(Some(Record::new(id)))
    }

    fn load(&self, scope: &Scope) -> StoreResult<Vec<Record>> {
        self.0.load(scope)
    }

    fn count(&self, scope: &Scope) -> StoreResult<usize> {
        self.0.count(scope)
    }

    fn create(&self, attributes: Attributes) -> StoreResult<Record> {
        self.0.create(attributes)
    }

    fn update(&self, record: &Record, attributes: Attributes) -> StoreResult<Record> {
        self.0.update(record, attributes)
    }

    fn destroy(&self, record: &Record) -> StoreResult<()> {
        self.0.destroy(record)
    }
}

/// A record gone by the time it is written to is a 404, not a refusal.
#[test]
fn test_record_removed_before_write_is_not_found() {
    let registry = Arc::new(Registry::new());
    registry.register(
        "recipe",
        ModelOptions::new()
            .attributes(["title"])
            .update(["title"])
            .delete(true),
        Arc::new(VanishingStore(MemoryStore::new())),
    );
    let dispatcher = Dispatcher::new(registry);

    let err = dispatcher.delete("recipe", "5").unwrap_err();
    assert!(matches!(err, PlaygroundError::RecordNotFound { ref id, .. } if id == "5"));
    assert_eq!(err.to_envelope().errors[0].status, "404");

    let err = dispatcher
        .update("recipe", "5", &body(json!({"title": "T"})))
        .unwrap_err();
    assert!(matches!(err, PlaygroundError::RecordNotFound { .. }));
}

// =============================================================================
// Serialization Through the Dispatcher
// =============================================================================

/// Attributes a create leaves out read as null; collections start empty.
#[test]
fn test_omitted_attributes_read_as_null() {
    let options = ModelOptions::new()
        .attributes(["title", "body"])
        .relationships(["ingredients", "author"])
        .create(["title", "body"]);
    let store = MemoryStore::for_model(&ModelConfiguration::normalize("recipe", options.clone()));
    let registry = Arc::new(Registry::new());
    registry.register("recipe", options, Arc::new(store));
    let dispatcher = Dispatcher::new(registry);

    let created = to_json(
        &dispatcher
            .create("recipe", &body(json!({"title": "T"})))
            .unwrap()
            .data,
    );
    assert_eq!(created["attributes"], json!({"title": "T", "body": null}));
    assert!(created["attributes"].get("_errors").is_none());
    assert_eq!(
        created["relationships"],
        json!({"ingredients": {"data": []}, "author": {"data": null}})
    );

    let listed = dispatcher.list("recipe", &ListParams::default()).unwrap();
    assert_eq!(to_json(&listed.data[0]), created);
}

/// Groups nest, relationships link by relationship name.
#[test]
fn test_grouped_attributes_and_relationships() {
    let registry = Arc::new(Registry::new());
    let store = Arc::new(MemoryStore::new());
    store
        .insert(
            Record::new("1")
                .with_field("title", "Soup")
                .with_field("servings", 4i64)
                .with_relation("ingredients", Relation::Many(vec!["7".to_string()]))
                .with_relation("author", Relation::One(None)),
        )
        .unwrap();
    registry.register(
        "recipe",
        ModelOptions::new()
            .attributes(["title"])
            .group("details", ["servings"])
            .relationships(["ingredients", "author"]),
        store,
    );

    let doc = Dispatcher::new(registry).show("recipe", "1").unwrap();
    let data = to_json(&doc.data);
    assert_eq!(data["attributes"], json!({"title": "Soup", "details": {"servings": 4}}));
    assert_eq!(
        data["relationships"],
        json!({
            "ingredients": {"data": [{"id": "7", "type": "ingredients"}]},
            "author": {"data": null}
        })
    );
    assert_eq!(
        to_json(&doc.meta.available_attributes),
        json!({"ungrouped": ["title"], "details": ["servings"]})
    );
}

/// Re-declaring a model takes effect on the next request.
#[test]
fn test_redeclared_model_applies_immediately() {
    let registry = Arc::new(Registry::new());
    registry.register(
        "recipe",
        ModelOptions::new().attributes(["title"]),
        Arc::new(MemoryStore::new()),
    );
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    assert!(dispatcher.create("recipe", &body(json!({"title": "T"}))).is_err());

    registry.declare("recipe", ModelOptions::new().attributes(["title"]).create(["title"]));
    assert!(dispatcher.create("recipe", &body(json!({"title": "T"}))).is_ok());
}
