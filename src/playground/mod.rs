//! # Playground
//!
//! Generic JSON:API CRUD layer over registered models. A model is exposed
//! by declaring its attributes, relationships, permitted write operations,
//! filters and pagination in the [`Registry`]; the [`Dispatcher`] answers
//! list, show, create, update and delete requests against it.
//!
//! # Request flow
//!
//! ```text
//! route → dispatcher → registry lookup → planners → RecordStore → serializer
//!                    ↘ PlaygroundError → error envelope
//! ```

pub mod dispatcher;
pub mod errors;
pub mod filter;
pub mod inflection;
pub mod memory;
pub mod openapi;
pub mod pagination;
pub mod parser;
pub mod record;
pub mod registry;
pub mod response;
pub mod serializer;
pub mod server;
pub mod store;

pub use dispatcher::{Dispatcher, Operation};
pub use errors::{ErrorEnvelope, ErrorObject, PlaygroundError, PlaygroundResult, WriteOperation};
pub use filter::{FilterDef, FilterType};
pub use memory::MemoryStore;
pub use pagination::PaginationConfig;
pub use parser::ListParams;
pub use record::{Attributes, FieldValue, Record, Relation};
pub use registry::{ModelConfiguration, ModelOptions, Registry};
pub use response::Outcome;
pub use server::{router, PlaygroundState};
pub use store::{RecordStore, Scope, StoreError, StoreResult, ValidationErrors};
