//! Configuration document model shared by the interface settings controllers.
//!
//! - [`document`]: order-preserving configuration tree
//! - [`store`]: durable store with request-scoped write transactions
//! - [`schema`]: explicit entity schemas and the model registry
//! - [`validate`]: generic field validation
//! - [`crud`]: search/get/add/set/delete over one collection
//! - [`guard`]: reference integrity against dependent collections
//! - [`lock`]: cross-process file locks
//! - [`pending`]: log of retired names awaiting reconfiguration
//! - [`reconfigure`]: trigger for the external apply job

pub mod crud;
pub mod document;
pub mod guard;
pub mod lock;
pub mod pending;
pub mod reconfigure;
pub mod schema;
pub mod store;
pub mod validate;

pub use crud::{
    CrudService, EntityView, MutationResult, MutationStatus, Row, SearchQuery, SearchResult,
};
pub use document::{ConfigDocument, Section};
pub use guard::{ReferenceGuard, ReferenceIndex};
pub use lock::FileLock;
pub use pending::PendingChangeLog;
pub use reconfigure::{ReconfigureInvoker, ReconfigureStatus, RequestIntent};
pub use schema::{Dependency, EntitySchema, FieldKind, FieldSpec, ModelRegistry, UniqueConstraint};
pub use store::{ConfigStore, Transaction};
pub use validate::{validate_record, Validations};
