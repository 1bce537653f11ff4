use std::fmt;

use taskdeck_core::{FieldErrors, FormField, TaskFormValues};

use super::components::Button;

pub const CREATE_SUBMIT_LABEL: &str = "Create Task";
pub const UPDATE_SUBMIT_LABEL: &str = "Update Task";
pub const SAVING_LABEL: &str = "Saving...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

impl FormMode {
    pub fn heading(&self) -> &'static str {
        match self {
            FormMode::Create => "Create New Task",
            FormMode::Edit(_) => "Edit Task",
        }
    }
}

/// The create/edit form. Values survive failed submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub mode: FormMode,
    pub values: TaskFormValues,
    pub errors: FieldErrors,
    pub form_error: Option<String>,
    pub submitting: bool,
}

impl FormView {
    pub fn create() -> Self {
        Self::new(FormMode::Create, TaskFormValues::default())
    }

    pub fn new(mode: FormMode, values: TaskFormValues) -> Self {
        Self {
            mode,
            values,
            errors: FieldErrors::new(),
            form_error: None,
            submitting: false,
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match (self.submitting, self.mode) {
            (true, _) => SAVING_LABEL,
            (false, FormMode::Create) => CREATE_SUBMIT_LABEL,
            (false, FormMode::Edit(_)) => UPDATE_SUBMIT_LABEL,
        }
    }
}

fn field_label(field: FormField) -> String {
    match field {
        FormField::Title => format!("{} *", field.label()),
        _ => field.label().to_string(),
    }
}

impl fmt::Display for FormView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.mode.heading())?;
        writeln!(f)?;
        if let Some(message) = &self.form_error {
            writeln!(f, "! {message}")?;
            writeln!(f)?;
        }

        for field in FormField::ALL {
            writeln!(f, "{:<14} {}", format!("{}:", field_label(field)), self.values.get(field))?;
            if let Some(message) = self.errors.get(field) {
                writeln!(f, "{:<14} ^ {message}", "")?;
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "{}  {}",
            Button::enabled(self.submit_label(), !self.submitting),
            Button::enabled("Cancel", !self.submitting)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::validation::TITLE_REQUIRED;

    #[test]
    fn submit_label_tracks_mode_and_progress() {
        let mut view = FormView::create();
        assert_eq!(view.submit_label(), CREATE_SUBMIT_LABEL);
        view.mode = FormMode::Edit(2);
        assert_eq!(view.submit_label(), UPDATE_SUBMIT_LABEL);
        view.submitting = true;
        assert_eq!(view.submit_label(), SAVING_LABEL);
        assert!(view.to_string().contains("(Saving...)"));
    }

    #[test]
    fn field_errors_render_under_their_field() {
        let mut view = FormView::create();
        view.errors.insert(FormField::Title, TITLE_REQUIRED);
        let out = view.to_string();
        let title_at = out.find("Title *:").unwrap();
        let error_at = out.find(TITLE_REQUIRED).unwrap();
        let description_at = out.find("Description:").unwrap();
        assert!(title_at < error_at && error_at < description_at);
    }

    #[test]
    fn form_error_renders_above_fields() {
        let mut view = FormView::new(FormMode::Edit(1), TaskFormValues::default());
        view.form_error = Some("Something broke".to_string());
        let out = view.to_string();
        assert!(out.find("! Something broke").unwrap() < out.find("Title *:").unwrap());
        assert!(out.starts_with("Edit Task"));
    }
}
