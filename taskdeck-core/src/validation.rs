//! Client-side rules for the task form, applied before anything is sent.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use chrono::{Local, TimeZone};

use crate::format::to_input_date_time_local_in;
use crate::types::{ApiError, Task, TaskCreateRequest, TaskUpdateRequest};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

pub const TITLE_REQUIRED: &str = "Title is required";
pub const TITLE_TOO_LONG: &str = "Title must not exceed 100 characters";
pub const DESCRIPTION_TOO_LONG: &str = "Description must not exceed 500 characters";

// ─── Fields ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Title,
    Description,
    DueDate,
    AssignedTo,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Title,
        FormField::Description,
        FormField::DueDate,
        FormField::AssignedTo,
    ];

    /// Name used by the backend in field errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Title => "title",
            FormField::Description => "description",
            FormField::DueDate => "dueDate",
            FormField::AssignedTo => "assignedTo",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::DueDate => "Due Date",
            FormField::AssignedTo => "Assigned To",
        }
    }
}

impl FromStr for FormField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(FormField::Title),
            "description" | "desc" => Ok(FormField::Description),
            "dueDate" | "due" => Ok(FormField::DueDate),
            "assignedTo" | "assignee" => Ok(FormField::AssignedTo),
            other => Err(format!("unknown field: {other}")),
        }
    }
}

impl Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ─── Values ──────────────────────────────────────────────────────────────────

/// Raw form input, exactly as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFormValues {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub assigned_to: String,
}

impl TaskFormValues {
    /// Prefill for edit mode, with the due date shown in the local zone.
    pub fn from_task(task: &Task) -> Self {
        Self::from_task_in(task, &Local)
    }

    pub fn from_task_in<Tz>(task: &Task, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due_date: to_input_date_time_local_in(task.due_date.as_deref(), tz),
            assigned_to: task.assigned_to.clone().unwrap_or_default(),
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::DueDate => &self.due_date,
            FormField::AssignedTo => &self.assigned_to,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Title => self.title = value,
            FormField::Description => self.description = value,
            FormField::DueDate => self.due_date = value,
            FormField::AssignedTo => self.assigned_to = value,
        }
    }
}

/// Form input that passed every client-side rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTask {
    title: String,
    description: String,
    due_date: String,
    assigned_to: String,
}

impl ValidatedTask {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Empty optional fields are left out of a create.
    pub fn into_create_request(self) -> TaskCreateRequest {
        TaskCreateRequest {
            title: self.title,
            description: non_empty(self.description),
            due_date: non_empty(self.due_date),
            assigned_to: non_empty(self.assigned_to),
        }
    }

    /// Text fields are always sent so they can be cleared; an empty due date
    /// leaves the stored one untouched.
    pub fn into_update_request(self) -> TaskUpdateRequest {
        TaskUpdateRequest {
            title: Some(self.title),
            description: Some(self.description),
            is_completed: None,
            due_date: non_empty(self.due_date),
            assigned_to: Some(self.assigned_to),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: BTreeMap<FormField, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// Fold in the server's per-field errors. A client-side error for the
    /// same field wins.
    pub fn merge_server(&mut self, server: &ApiError) {
        for field in FormField::ALL {
            if self.errors.contains_key(&field) {
                continue;
            }
            if let Some(message) = server.field_message(field.as_str()) {
                self.errors.insert(field, message.to_string());
            }
        }
    }
}

// ─── Rules ───────────────────────────────────────────────────────────────────

pub fn validate(values: &TaskFormValues) -> Result<ValidatedTask, FieldErrors> {
    let mut errors = FieldErrors::new();

    if values.title.is_empty() {
        errors.insert(FormField::Title, TITLE_REQUIRED);
    } else if values.title.chars().count() > TITLE_MAX_CHARS {
        errors.insert(FormField::Title, TITLE_TOO_LONG);
    }

    if values.description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.insert(FormField::Description, DESCRIPTION_TOO_LONG);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedTask {
        title: values.title.clone(),
        description: values.description.clone(),
        due_date: values.due_date.trim().to_string(),
        assigned_to: values.assigned_to.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldError;
    use chrono::Utc;

    fn values(title: &str) -> TaskFormValues {
        TaskFormValues {
            title: title.to_string(),
            ..Default::default()
        }
    }

    // ─── Title ──────────────────────────────────────────────────────────

    #[test]
    fn empty_title_is_required() {
        let errors = validate(&values("")).unwrap_err();
        assert_eq!(errors.get(FormField::Title), Some(TITLE_REQUIRED));
    }

    #[test]
    fn title_at_limit_passes() {
        assert!(validate(&values(&"A".repeat(100))).is_ok());
    }

    #[test]
    fn title_over_limit_fails() {
        let errors = validate(&values(&"A".repeat(101))).unwrap_err();
        assert!(errors.get(FormField::Title).unwrap().contains("must not exceed 100"));
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        assert!(validate(&values(&"\u{e9}".repeat(100))).is_ok());
    }

    // ─── Description ────────────────────────────────────────────────────

    #[test]
    fn description_over_limit_fails() {
        let mut v = values("ok");
        v.description = "d".repeat(501);
        let errors = validate(&v).unwrap_err();
        assert_eq!(errors.get(FormField::Description), Some(DESCRIPTION_TOO_LONG));
        assert_eq!(errors.get(FormField::Title), None);
    }

    #[test]
    fn due_date_and_assignee_are_unconstrained() {
        let mut v = values("ok");
        v.due_date = "whenever".to_string();
        v.assigned_to = "x".repeat(1000);
        assert!(validate(&v).is_ok());
    }

    // ─── Requests ───────────────────────────────────────────────────────

    #[test]
    fn create_request_drops_empty_fields() {
        let req = validate(&values("Buy milk")).unwrap().into_create_request();
        assert_eq!(
            req,
            TaskCreateRequest {
                title: "Buy milk".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_request_keeps_clearable_fields() {
        let mut v = values("Buy milk");
        v.due_date = "2026-03-15T10:30".to_string();
        let req = validate(&v).unwrap().into_update_request();
        assert_eq!(req.title.as_deref(), Some("Buy milk"));
        assert_eq!(req.description.as_deref(), Some(""));
        assert_eq!(req.assigned_to.as_deref(), Some(""));
        assert_eq!(req.due_date.as_deref(), Some("2026-03-15T10:30"));
        assert_eq!(req.is_completed, None);
    }

    // ─── Edit prefill ───────────────────────────────────────────────────

    #[test]
    fn from_task_prefills_and_converts_due_date() {
        let task = Task {
            id: 1,
            title: "Existing Task".to_string(),
            description: Some("Some description".to_string()),
            is_completed: false,
            due_date: Some("2026-03-15T10:30:00".to_string()),
            created_at: "2026-01-01T00:00:00".to_string(),
            updated_at: "2026-01-01T00:00:00".to_string(),
            assigned_to: Some("Alice".to_string()),
        };
        let v = TaskFormValues::from_task_in(&task, &Utc);
        assert_eq!(v.title, "Existing Task");
        assert_eq!(v.description, "Some description");
        assert_eq!(v.due_date, "2026-03-15T10:30");
        assert_eq!(v.assigned_to, "Alice");
    }

    #[test]
    fn from_task_keeps_minute_precision_due_date_with_offset() {
        let task = Task {
            id: 2,
            title: "Call".to_string(),
            description: None,
            is_completed: false,
            due_date: Some("2026-03-15T10:30Z".to_string()),
            created_at: "2026-01-01T00:00:00".to_string(),
            updated_at: "2026-01-01T00:00:00".to_string(),
            assigned_to: None,
        };
        let v = TaskFormValues::from_task_in(&task, &Utc);
        assert_eq!(v.due_date, "2026-03-15T10:30");
    }

    // ─── Server errors ──────────────────────────────────────────────────

    #[test]
    fn server_errors_fill_fields_without_client_errors() {
        let server = ApiError::validation(vec![
            FieldError {
                field: "title".to_string(),
                message: "Title already exists".to_string(),
            },
            FieldError {
                field: "description".to_string(),
                message: "Description is odd".to_string(),
            },
        ]);

        let mut errors = FieldErrors::new();
        errors.insert(FormField::Description, DESCRIPTION_TOO_LONG);
        errors.merge_server(&server);

        assert_eq!(errors.get(FormField::Title), Some("Title already exists"));
        assert_eq!(errors.get(FormField::Description), Some(DESCRIPTION_TOO_LONG));
    }

    #[test]
    fn unknown_server_fields_are_ignored() {
        let server = ApiError::validation(vec![FieldError {
            field: "priority".to_string(),
            message: "nope".to_string(),
        }]);
        let mut errors = FieldErrors::new();
        errors.merge_server(&server);
        assert!(errors.is_empty());
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("due".parse::<FormField>().unwrap(), FormField::DueDate);
        assert_eq!("assignedTo".parse::<FormField>().unwrap(), FormField::AssignedTo);
        assert!("owner".parse::<FormField>().is_err());
    }
}
