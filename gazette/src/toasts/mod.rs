mod toasts_saga;
mod toasts_state;

pub use toasts_saga::*;
pub use toasts_state::*;
