use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Client-side pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    TaskList,
    TaskCreate,
    TaskDetail(i64),
    TaskEdit(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no page at {0}")]
    NotFound(String),
}

impl Route {
    /// Resolve a path. The root redirects to the list. A task id that is not
    /// a number resolves to 0, which no task has.
    pub fn parse(path: &str) -> Result<Route, RouteError> {
        let trimmed = path.split(['?', '#']).next().unwrap_or("").trim();
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] | ["tasks"] => Ok(Route::TaskList),
            ["tasks", "new"] => Ok(Route::TaskCreate),
            ["tasks", id] => Ok(Route::TaskDetail(parse_id(id))),
            ["tasks", id, "edit"] => Ok(Route::TaskEdit(parse_id(id))),
            _ => Err(RouteError::NotFound(path.to_string())),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::TaskList => "/tasks".to_string(),
            Route::TaskCreate => "/tasks/new".to_string(),
            Route::TaskDetail(id) => format!("/tasks/{id}"),
            Route::TaskEdit(id) => format!("/tasks/{id}/edit"),
        }
    }

    pub fn task_id(&self) -> Option<i64> {
        match self {
            Route::TaskDetail(id) | Route::TaskEdit(id) => Some(*id),
            Route::TaskList | Route::TaskCreate => None,
        }
    }
}

fn parse_id(segment: &str) -> i64 {
    segment.parse().unwrap_or(0)
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::parse(s)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

// ─── Navigator ──────────────────────────────────────────────────────────────

/// Current route plus back/forward history.
///
/// Every route change advances an epoch. A [`ViewGuard`] taken before a
/// fetch only lets the result through if no navigation happened since.
#[derive(Debug)]
pub struct Navigator {
    history: Vec<Route>,
    index: usize,
    epoch: Arc<AtomicU64>,
}

impl Navigator {
    pub fn new(start: Route) -> Self {
        Self {
            history: vec![start],
            index: 0,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn current(&self) -> Route {
        self.history[self.index]
    }

    /// Push `route`, dropping any forward history.
    pub fn navigate(&mut self, route: Route) {
        self.history.truncate(self.index + 1);
        self.history.push(route);
        self.index += 1;
        self.bump(route);
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.history.len()
    }

    pub fn back(&mut self) -> Option<Route> {
        if !self.can_go_back() {
            return None;
        }
        self.index -= 1;
        let route = self.current();
        self.bump(route);
        Some(route)
    }

    pub fn forward(&mut self) -> Option<Route> {
        if !self.can_go_forward() {
            return None;
        }
        self.index += 1;
        let route = self.current();
        self.bump(route);
        Some(route)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn guard(&self) -> ViewGuard {
        ViewGuard {
            taken_at: self.epoch(),
            epoch: Arc::clone(&self.epoch),
        }
    }

    fn bump(&self, route: Route) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%route, epoch, "navigated");
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::TaskList)
    }
}

/// Snapshot of the navigation epoch for one view.
#[derive(Debug, Clone)]
pub struct ViewGuard {
    taken_at: u64,
    epoch: Arc<AtomicU64>,
}

impl ViewGuard {
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.taken_at
    }

    /// `Some(value)` if the view is still mounted, otherwise the value is
    /// dropped.
    pub fn apply<T>(&self, value: T) -> Option<T> {
        if self.is_current() {
            Some(value)
        } else {
            tracing::debug!(taken_at = self.taken_at, "dropping result for departed view");
            None
        }
    }
}
