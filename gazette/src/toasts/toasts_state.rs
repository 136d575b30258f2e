use crate::Action;

pub type ToastId = u64;

pub const CLOSE_BUTTON: &str = "close";
pub const UNDO_BUTTON: &str = "undo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastButton {
    pub id: String,
    pub text: String,
}

impl ToastButton {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn close() -> Self {
        Self::new(CLOSE_BUTTON, "Close")
    }

    pub fn undo() -> Self {
        Self::new(UNDO_BUTTON, "Undo")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub text: String,
    pub buttons: Vec<ToastButton>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToastsAction {
    Create(Toast),
    /// `button_id` is the button that closed the toast, `None` for a timeout.
    Close {
        id: ToastId,
        button_id: Option<String>,
    },
}

impl Action for ToastsAction {
    fn kind(&self) -> &'static str {
        match self {
            ToastsAction::Create(_) => "toasts/create",
            ToastsAction::Close { .. } => "toasts/close",
        }
    }
}

/// Toasts currently on screen, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToastsState {
    pub toasts: Vec<Toast>,
}

impl ToastsState {
    pub fn get(&self, id: ToastId) -> Option<&Toast> {
        self.toasts.iter().find(|toast| toast.id == id)
    }

    pub fn reduce(mut self, action: &ToastsAction) -> Self {
        match action {
            ToastsAction::Create(toast) => {
                if self.get(toast.id).is_none() {
                    self.toasts.push(toast.clone());
                }
            }
            ToastsAction::Close { id, .. } => self.toasts.retain(|toast| toast.id != *id),
        }
        self
    }
}
