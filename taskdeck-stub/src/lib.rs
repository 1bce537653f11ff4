pub mod app;
pub mod error;
pub mod routes;

pub use app::{create_app, serve, spawn, RunningStub};
pub use error::StubError;
