pub const DELETE_DIALOG_TITLE: &str = "Delete Task";
pub const DELETE_DIALOG_MESSAGE: &str =
    "Are you sure you want to delete this task? This action cannot be undone.";
pub const DELETE_CONFIRM_LABEL: &str = "Delete";
pub const CANCEL_LABEL: &str = "Cancel";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState<T> {
    Closed,
    Open(T),
}

/// Modal gate in front of a destructive action.
///
/// The only transitions are `Closed -> Open` (open), `Open -> Closed` with the
/// pending target handed back (confirm) and `Open -> Closed` discarding the
/// target (cancel). Anything else is rejected and leaves the state unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog<T> {
    state: DialogState<T>,
}

impl<T> ConfirmDialog<T> {
    pub fn new() -> Self {
        Self {
            state: DialogState::Closed,
        }
    }

    pub fn state(&self) -> &DialogState<T> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open(_))
    }

    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            DialogState::Open(target) => Some(target),
            DialogState::Closed => None,
        }
    }

    /// Returns `false` if the dialog was already open.
    pub fn open(&mut self, target: T) -> bool {
        if self.is_open() {
            return false;
        }
        self.state = DialogState::Open(target);
        true
    }

    /// Close the dialog and hand back the target the caller must now act on.
    pub fn confirm(&mut self) -> Option<T> {
        match std::mem::replace(&mut self.state, DialogState::Closed) {
            DialogState::Open(target) => Some(target),
            DialogState::Closed => None,
        }
    }

    /// Close the dialog without side effects. Returns `false` if it was closed.
    pub fn cancel(&mut self) -> bool {
        matches!(std::mem::replace(&mut self.state, DialogState::Closed), DialogState::Open(_))
    }
}

impl<T> Default for ConfirmDialog<T> {
    fn default() -> Self {
        Self::new()
    }
}
