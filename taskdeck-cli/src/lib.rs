pub mod app;
pub mod error;
pub mod shell;
pub mod views;

pub use app::{App, AppOptions, LoadedView, PendingLoad};
pub use error::AppError;
pub use shell::Command;
pub use views::View;
