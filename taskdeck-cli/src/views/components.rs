use std::fmt;

use taskdeck_core::{ApiError, Pagination, Route};

pub const BRAND: &str = "Task Manager";
pub const ALL_TASKS_LABEL: &str = "All Tasks";
pub const NEW_TASK_LABEL: &str = "New Task";
pub const TRY_AGAIN_LABEL: &str = "Try again";
pub const CREATE_TASK_LABEL: &str = "Create Task";
pub const EMPTY_MESSAGE: &str = "No tasks found. Create your first task to get started.";
pub const NOT_FOUND_MESSAGE: &str = "Task not found.";
pub const BACK_TO_LIST_LABEL: &str = "Back to task list";

/// A labelled target, rendered as `label <path>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub route: Route,
}

impl Link {
    pub fn new(label: impl Into<String>, route: Route) -> Self {
        Self {
            label: label.into(),
            route,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.label, self.route)
    }
}

/// An action button, rendered `[label]` when enabled and `(label)` when not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button<'a> {
    pub label: &'a str,
    pub enabled: bool,
}

impl<'a> Button<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            enabled: true,
        }
    }

    pub fn enabled(label: &'a str, enabled: bool) -> Self {
        Self { label, enabled }
    }
}

impl fmt::Display for Button<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "[{}]", self.label)
        } else {
            write!(f, "({})", self.label)
        }
    }
}

pub fn list_badge(completed: bool) -> &'static str {
    if completed {
        "Done"
    } else {
        "Pending"
    }
}

pub fn detail_badge(completed: bool) -> &'static str {
    if completed {
        "Completed"
    } else {
        "Pending"
    }
}

// ─── Navigation bar ──────────────────────────────────────────────────────────

pub struct NavBar {
    pub route: Route,
}

impl fmt::Display for NavBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = if self.route == Route::TaskList {
            format!("*{ALL_TASKS_LABEL}*")
        } else {
            ALL_TASKS_LABEL.to_string()
        };
        writeln!(f, "{BRAND}  |  {all} <{}>  |  {NEW_TASK_LABEL} <{}>", Route::TaskList, Route::TaskCreate)?;
        writeln!(f, "{}", "=".repeat(60))
    }
}

// ─── Panels ──────────────────────────────────────────────────────────────────

/// Generic retryable failure display.
pub struct ErrorPanel<'a> {
    pub error: &'a ApiError,
}

impl fmt::Display for ErrorPanel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.error.message)?;
        writeln!(f, "{}", Button::new(TRY_AGAIN_LABEL))
    }
}

pub struct EmptyState;

impl fmt::Display for EmptyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{EMPTY_MESSAGE}")?;
        writeln!(f, "{}", Link::new(CREATE_TASK_LABEL, Route::TaskCreate))
    }
}

pub struct NotFoundPanel;

impl fmt::Display for NotFoundPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{NOT_FOUND_MESSAGE}")?;
        writeln!(f, "{}", Link::new(BACK_TO_LIST_LABEL, Route::TaskList))
    }
}

/// Previous/next controls; renders nothing without a [`Pagination`].
pub struct PaginationBar(pub Option<Pagination>);

impl fmt::Display for PaginationBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(p) = self.0 else {
            return Ok(());
        };
        writeln!(
            f,
            "{}  {}  {}",
            Button::enabled("Previous", p.has_previous()),
            p,
            Button::enabled("Next", p.has_next())
        )
    }
}
