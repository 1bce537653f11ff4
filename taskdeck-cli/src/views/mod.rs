pub mod components;
pub mod detail;
pub mod form;
pub mod list;

use std::fmt;

use taskdeck_core::confirm::{
    CANCEL_LABEL, DELETE_CONFIRM_LABEL, DELETE_DIALOG_MESSAGE, DELETE_DIALOG_TITLE,
};
use taskdeck_core::{ApiError, Route};

use components::{Button, ErrorPanel, NavBar, NotFoundPanel};
pub use detail::DetailView;
pub use form::{FormMode, FormView};
pub use list::ListView;

/// What the current route shows.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Loading(Route),
    List(ListView),
    Detail(DetailView),
    Form(FormView),
    NotFound,
    Failed(ApiError),
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Loading(_) => writeln!(f, "Loading..."),
            View::List(list) => write!(f, "{list}"),
            View::Detail(detail) => write!(f, "{detail}"),
            View::Form(form) => write!(f, "{form}"),
            View::NotFound => write!(f, "{NotFoundPanel}"),
            View::Failed(error) => write!(f, "{}", ErrorPanel { error }),
        }
    }
}

/// Modal delete confirmation drawn over the page.
pub struct DeleteDialog;

impl fmt::Display for DeleteDialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "{DELETE_DIALOG_TITLE}")?;
        writeln!(f, "{DELETE_DIALOG_MESSAGE}")?;
        writeln!(
            f,
            "{} (yes)  {} (no)",
            Button::new(DELETE_CONFIRM_LABEL),
            Button::new(CANCEL_LABEL)
        )?;
        writeln!(f, "{rule}")
    }
}

/// A full frame: navigation bar, page, then any notice and open dialog.
pub struct Screen<'a> {
    pub route: Route,
    pub view: &'a View,
    pub notice: Option<&'a str>,
    pub dialog_open: bool,
}

impl fmt::Display for Screen<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", NavBar { route: self.route })?;
        write!(f, "{}", self.view)?;
        if let Some(notice) = self.notice {
            writeln!(f)?;
            writeln!(f, "! {notice}")?;
        }
        if self.dialog_open {
            writeln!(f)?;
            write!(f, "{DeleteDialog}")?;
        }
        Ok(())
    }
}
