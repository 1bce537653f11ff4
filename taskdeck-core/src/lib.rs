pub mod cache;
pub mod config;
pub mod confirm;
pub mod format;
pub mod memory_gateway;
pub mod pagination;
pub mod queries;
pub mod query;
pub mod router;
pub mod types;
pub mod validation;

pub use cache::{CacheOptions, QueryCache, QueryState};
pub use confirm::{ConfirmDialog, DialogState};
pub use memory_gateway::MemoryTaskGateway;
pub use pagination::Pagination;
pub use queries::TaskQueries;
pub use query::{apply_update, default_list_params, ParamsUpdate, StatusFilter};
pub use router::{Navigator, Route, RouteError, ViewGuard};
pub use types::*;
pub use validation::{validate, FieldErrors, FormField, TaskFormValues, ValidatedTask};
