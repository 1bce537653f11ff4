use std::fmt;

use taskdeck_core::format::{format_date_time, PLACEHOLDER};
use taskdeck_core::{Route, Task};

use super::components::{detail_badge, Button, Link, BACK_TO_LIST_LABEL};

pub const MARK_COMPLETE_LABEL: &str = "Mark Complete";
pub const MARK_INCOMPLETE_LABEL: &str = "Mark Incomplete";
pub const NO_DESCRIPTION: &str = "No description provided.";

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub task: Task,
}

impl DetailView {
    pub fn toggle_label(&self) -> &'static str {
        if self.task.is_completed {
            MARK_INCOMPLETE_LABEL
        } else {
            MARK_COMPLETE_LABEL
        }
    }

    pub fn badge(&self) -> &'static str {
        detail_badge(self.task.is_completed)
    }
}

impl fmt::Display for DetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = &self.task;
        writeln!(f, "{}  [{}]", task.title, self.badge())?;
        writeln!(
            f,
            "{}  {} <{}>  {}",
            Button::new(self.toggle_label()),
            Button::new("Edit"),
            Route::TaskEdit(task.id),
            Button::new("Delete")
        )?;
        writeln!(f)?;

        let assignee = task
            .assigned_to
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or(PLACEHOLDER);
        writeln!(f, "Assigned To: {assignee}")?;
        writeln!(f, "Due Date:    {}", format_date_time(task.due_date.as_deref()))?;
        writeln!(f, "Created:     {}", format_date_time(Some(&task.created_at)))?;
        writeln!(f)?;

        writeln!(f, "Description")?;
        match task.description.as_deref().filter(|d| !d.is_empty()) {
            Some(description) => writeln!(f, "{description}")?,
            None => writeln!(f, "{NO_DESCRIPTION}")?,
        }
        writeln!(f)?;
        writeln!(f, "{}", Link::new(BACK_TO_LIST_LABEL, Route::TaskList))
    }
}
