use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};

use crate::types::{
    ApiError, FieldError, PagedResponse, SortBy, SortDirection, Task, TaskCreateRequest,
    TaskGateway, TaskQueryParams, TaskUpdateRequest,
};
use crate::validation::{
    DESCRIPTION_MAX_CHARS, DESCRIPTION_TOO_LONG, TITLE_MAX_CHARS, TITLE_REQUIRED, TITLE_TOO_LONG,
};

pub const MAX_PAGE_SIZE: u32 = 100;
pub const DUE_DATE_INVALID: &str = "Due date must be a valid date-time";

const STORED_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";
const STORED_TIMESTAMP: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const ACCEPTED_DATE_TIMES: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

// ─── MemoryTaskGateway ──────────────────────────────────────────────────────

struct Store {
    tasks: BTreeMap<i64, Task>,
    next_id: i64,
}

#[derive(Default)]
struct Faults {
    calls: HashMap<String, usize>,
    queued: HashMap<String, VecDeque<ApiError>>,
    offline: bool,
    latency: Option<Duration>,
}

/// In-process task backend with the same validation, filtering, sorting and
/// paging rules as the REST service.
///
/// Besides serving the stub server it records per-operation call counts and
/// can inject failures, which is what the cache and application tests use.
/// Operation names are `list`, `get`, `create`, `update`, `toggle`, `delete`.
pub struct MemoryTaskGateway {
    store: RwLock<Store>,
    faults: Mutex<Faults>,
}

impl MemoryTaskGateway {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                tasks: BTreeMap::new(),
                next_id: 1,
            }),
            faults: Mutex::new(Faults::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().unwrap().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times `op` has been called, failed calls included.
    pub fn call_count(&self, op: &str) -> usize {
        let faults = self.faults.lock().unwrap();
        faults.calls.get(op).copied().unwrap_or(0)
    }

    /// Make the next call to `op` fail with `error`. Queued errors are used
    /// in order, one per call.
    pub fn fail_next(&self, op: &str, error: ApiError) {
        let mut faults = self.faults.lock().unwrap();
        faults.queued.entry(op.to_string()).or_default().push_back(error);
    }

    /// While offline every call fails as a network error.
    pub fn set_offline(&self, offline: bool) {
        self.faults.lock().unwrap().offline = offline;
    }

    /// Delay every call by `latency` before it is served.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults.lock().unwrap().latency = latency;
    }

    async fn enter(&self, op: &str) -> Result<(), ApiError> {
        let (latency, injected) = {
            let mut faults = self.faults.lock().unwrap();
            *faults.calls.entry(op.to_string()).or_insert(0) += 1;
            let injected = if faults.offline {
                Some(ApiError::network())
            } else {
                faults.queued.get_mut(op).and_then(VecDeque::pop_front)
            };
            (faults.latency, injected)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match injected {
            Some(err) => {
                tracing::debug!(op, status = err.status, "injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }
}

impl Default for MemoryTaskGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskGateway for MemoryTaskGateway {
    async fn list(&self, params: &TaskQueryParams) -> Result<PagedResponse<Task>, ApiError> {
        self.enter("list").await?;

        let from = parse_query_bound("dueDateFrom", params.due_date_from.as_deref())?;
        let to = parse_query_bound("dueDateTo", params.due_date_to.as_deref())?;
        let sort_by = params.sort_by.unwrap_or(SortBy::CreatedAt);
        let direction = params.sort_direction.unwrap_or(SortDirection::Asc);
        let size = params.size.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);
        let page = params.page.unwrap_or(0);

        let store = self.store.read().unwrap();
        let mut matching: Vec<&Task> = store
            .tasks
            .values()
            .filter(|t| params.is_completed.map_or(true, |c| t.is_completed == c))
            .filter(|t| in_due_range(t, from, to))
            .collect();

        matching.sort_by(|a, b| {
            let ord = compare_by(a, b, sort_by).then(a.id.cmp(&b.id));
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total_elements = matching.len() as u64;
        let total_pages = total_elements.div_ceil(u64::from(size)) as u32;
        let content = matching
            .into_iter()
            .skip(page as usize * size as usize)
            .take(size as usize)
            .cloned()
            .collect();

        Ok(PagedResponse {
            content,
            total_elements,
            total_pages,
            page,
            size,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Task, ApiError> {
        self.enter("get").await?;
        let store = self.store.read().unwrap();
        store.tasks.get(&id).cloned().ok_or_else(|| ApiError::not_found(id))
    }

    async fn create(&self, request: &TaskCreateRequest) -> Result<Task, ApiError> {
        self.enter("create").await?;

        let mut errors = Vec::new();
        if request.title.trim().is_empty() {
            errors.push(field_error("title", TITLE_REQUIRED));
        }
        check_lengths(Some(&request.title), request.description.as_deref(), &mut errors);
        let due_date = normalize_due_date(request.due_date.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        let now = now_local();
        let mut store = self.store.write().unwrap();
        let id = store.next_id;
        store.next_id += 1;

        let task = Task {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            is_completed: false,
            due_date,
            created_at: now.clone(),
            updated_at: now,
            assigned_to: request.assigned_to.clone(),
        };
        store.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update(&self, id: i64, request: &TaskUpdateRequest) -> Result<Task, ApiError> {
        self.enter("update").await?;

        let mut errors = Vec::new();
        check_lengths(request.title.as_deref(), request.description.as_deref(), &mut errors);
        let due_date = normalize_due_date(request.due_date.as_deref(), &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        let mut store = self.store.write().unwrap();
        let task = store.tasks.get_mut(&id).ok_or_else(|| ApiError::not_found(id))?;

        // Absent fields are left as they are.
        if let Some(title) = &request.title {
            task.title = title.clone();
        }
        if let Some(description) = &request.description {
            task.description = Some(description.clone());
        }
        if let Some(completed) = request.is_completed {
            task.is_completed = completed;
        }
        if due_date.is_some() {
            task.due_date = due_date;
        }
        if let Some(assigned_to) = &request.assigned_to {
            task.assigned_to = Some(assigned_to.clone());
        }
        task.updated_at = now_local();
        Ok(task.clone())
    }

    async fn toggle(&self, id: i64) -> Result<Task, ApiError> {
        self.enter("toggle").await?;
        let mut store = self.store.write().unwrap();
        let task = store.tasks.get_mut(&id).ok_or_else(|| ApiError::not_found(id))?;
        task.is_completed = !task.is_completed;
        task.updated_at = now_local();
        Ok(task.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.enter("delete").await?;
        let mut store = self.store.write().unwrap();
        store
            .tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(id))
    }
}

// ─── Rules ──────────────────────────────────────────────────────────────────

fn field_error(field: &str, message: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn check_lengths(title: Option<&str>, description: Option<&str>, errors: &mut Vec<FieldError>) {
    if title.is_some_and(|t| t.chars().count() > TITLE_MAX_CHARS) {
        errors.push(field_error("title", TITLE_TOO_LONG));
    }
    if description.is_some_and(|d| d.chars().count() > DESCRIPTION_MAX_CHARS) {
        errors.push(field_error("description", DESCRIPTION_TOO_LONG));
    }
}

fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    ACCEPTED_DATE_TIMES
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

fn normalize_due_date(input: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let input = input?;
    match parse_date_time(input) {
        Some(dt) => Some(dt.format(STORED_DATE_TIME).to_string()),
        None => {
            errors.push(field_error("dueDate", DUE_DATE_INVALID));
            None
        }
    }
}

fn parse_query_bound(name: &str, input: Option<&str>) -> Result<Option<NaiveDateTime>, ApiError> {
    match input {
        None => Ok(None),
        Some(raw) => parse_date_time(raw)
            .map(Some)
            .ok_or_else(|| ApiError::new(400, format!("Invalid value for {name}: {raw}"))),
    }
}

/// Bounds are inclusive; a task without a due date never matches a bound.
fn in_due_range(task: &Task, from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    let Some(due) = task.due_date.as_deref().and_then(parse_date_time) else {
        return false;
    };
    from.map_or(true, |f| due >= f) && to.map_or(true, |t| due <= t)
}

/// Missing due dates sort after present ones.
fn compare_by(a: &Task, b: &Task, sort_by: SortBy) -> Ordering {
    match sort_by {
        SortBy::Title => a.title.cmp(&b.title),
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
        SortBy::DueDate => {
            let a_due = a.due_date.as_deref().and_then(parse_date_time);
            let b_due = b.due_date.as_deref().and_then(parse_date_time);
            match (a_due, b_due) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
    }
}

fn now_local() -> String {
    Local::now().naive_local().format(STORED_TIMESTAMP).to_string()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
