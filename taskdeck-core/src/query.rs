use std::fmt;
use std::str::FromStr;

use crate::types::{SortBy, SortDirection, TaskQueryParams};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// The status filter as presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn from_param(is_completed: Option<bool>) -> Self {
        match is_completed {
            None => StatusFilter::All,
            Some(false) => StatusFilter::Pending,
            Some(true) => StatusFilter::Completed,
        }
    }

    pub fn to_param(self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Pending => Some(false),
            StatusFilter::Completed => Some(true),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Pending => "Pending",
            StatusFilter::Completed => "Completed",
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "all" => Ok(StatusFilter::All),
            "pending" | "false" => Ok(StatusFilter::Pending),
            "completed" | "done" | "true" => Ok(StatusFilter::Completed),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single change made through the list controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamsUpdate {
    Status(StatusFilter),
    DueDateFrom(Option<String>),
    DueDateTo(Option<String>),
    SortBy(SortBy),
    SortDirection(SortDirection),
    Page(u32),
}

impl ParamsUpdate {
    /// Filter changes move back to the first page; sorting and paging do not.
    pub fn resets_page(&self) -> bool {
        matches!(
            self,
            ParamsUpdate::Status(_) | ParamsUpdate::DueDateFrom(_) | ParamsUpdate::DueDateTo(_)
        )
    }
}

/// Initial parameters of the list view: newest first, first page.
pub fn default_list_params(page_size: u32) -> TaskQueryParams {
    TaskQueryParams {
        page: Some(0),
        size: Some(page_size),
        sort_by: Some(SortBy::CreatedAt),
        sort_direction: Some(SortDirection::Desc),
        ..Default::default()
    }
}

/// Produce the request parameters that follow from applying `update` to the
/// current list state.
pub fn apply_update(params: &TaskQueryParams, update: ParamsUpdate) -> TaskQueryParams {
    let mut next = params.clone();
    let resets_page = update.resets_page();

    match update {
        ParamsUpdate::Status(status) => next.is_completed = status.to_param(),
        ParamsUpdate::DueDateFrom(bound) => next.due_date_from = normalize_bound(bound),
        ParamsUpdate::DueDateTo(bound) => next.due_date_to = normalize_bound(bound),
        ParamsUpdate::SortBy(sort_by) => next.sort_by = Some(sort_by),
        ParamsUpdate::SortDirection(direction) => next.sort_direction = Some(direction),
        ParamsUpdate::Page(page) => next.page = Some(page),
    }

    if resets_page {
        next.page = Some(0);
    }
    next
}

/// Cleared bounds (empty input or `-`) are dropped rather than sent empty.
fn normalize_bound(bound: Option<String>) -> Option<String> {
    bound
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty() && b != "-")
}
