use std::fmt;

use taskdeck_core::format::{format_date, PLACEHOLDER};
use taskdeck_core::{
    ApiError, PagedResponse, Pagination, Route, SortBy, SortDirection, StatusFilter, Task,
    TaskQueryParams,
};

use super::components::{list_badge, Button, EmptyState, ErrorPanel, Link, PaginationBar};

/// The task list page: filter bar plus either the table, the empty state or
/// an error panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub params: TaskQueryParams,
    pub outcome: Result<PagedResponse<Task>, ApiError>,
}

impl ListView {
    pub fn page(&self) -> Option<&PagedResponse<Task>> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ApiError> {
        self.outcome.as_ref().err()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        let page = self.page()?;
        Pagination::new(page.page, page.total_pages)
    }

    /// Title links of the rows on this page.
    pub fn links(&self) -> Vec<Link> {
        self.page()
            .map(|p| {
                p.content
                    .iter()
                    .map(|t| Link::new(t.title.clone(), Route::TaskDetail(t.id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_task(&self, id: i64) -> bool {
        self.page()
            .is_some_and(|p| p.content.iter().any(|t| t.id == id))
    }
}

fn filter_bar(params: &TaskQueryParams) -> String {
    let status = StatusFilter::from_param(params.is_completed);
    let from = params.due_date_from.as_deref().unwrap_or(PLACEHOLDER);
    let to = params.due_date_to.as_deref().unwrap_or(PLACEHOLDER);
    let sort = params.sort_by.unwrap_or(SortBy::CreatedAt);
    let dir = params.sort_direction.unwrap_or(SortDirection::Desc);
    format!(
        "Status: {}  |  Due from: {from}  |  Due to: {to}  |  Sort: {} ({})",
        status.label(),
        sort.label(),
        dir.label()
    )
}

struct Row {
    check: &'static str,
    title: String,
    due: String,
    assignee: String,
    status: &'static str,
    actions: String,
}

impl Row {
    fn from_task(task: &Task) -> Self {
        Self {
            check: if task.is_completed { "[x]" } else { "[ ]" },
            title: Link::new(task.title.clone(), Route::TaskDetail(task.id)).to_string(),
            due: format_date(task.due_date.as_deref()),
            assignee: task
                .assigned_to
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            status: list_badge(task.is_completed),
            actions: format!(
                "{} <{}>  {}",
                Button::new("Edit"),
                Route::TaskEdit(task.id),
                Button::new("Delete")
            ),
        }
    }
}

fn column_width(rows: &[Row], header: &str, cell: impl Fn(&Row) -> usize) -> usize {
    rows.iter().map(cell).max().unwrap_or(0).max(header.chars().count())
}

fn write_table(f: &mut fmt::Formatter<'_>, tasks: &[Task]) -> fmt::Result {
    let rows: Vec<Row> = tasks.iter().map(Row::from_task).collect();
    let w_title = column_width(&rows, "Title", |r| r.title.chars().count());
    let w_due = column_width(&rows, "Due Date", |r| r.due.chars().count());
    let w_assignee = column_width(&rows, "Assigned To", |r| r.assignee.chars().count());
    let w_status = column_width(&rows, "Status", |r| r.status.len());

    writeln!(
        f,
        "    {:<w_title$}  {:<w_due$}  {:<w_assignee$}  {:<w_status$}  Actions",
        "Title", "Due Date", "Assigned To", "Status"
    )?;
    for row in &rows {
        writeln!(
            f,
            "{} {:<w_title$}  {:<w_due$}  {:<w_assignee$}  {:<w_status$}  {}",
            row.check, row.title, row.due, row.assignee, row.status, row.actions
        )?;
    }
    Ok(())
}

impl fmt::Display for ListView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tasks")?;
        writeln!(f, "{}", filter_bar(&self.params))?;
        writeln!(f)?;

        match &self.outcome {
            Err(error) => write!(f, "{}", ErrorPanel { error }),
            Ok(page) if page.is_empty() => write!(f, "{EmptyState}"),
            Ok(page) => {
                write_table(f, &page.content)?;
                writeln!(f)?;
                write!(f, "{}", PaginationBar(self.pagination()))
            }
        }
    }
}
