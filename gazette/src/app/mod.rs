mod app_model;
mod app_state;
mod saga_context;

pub use app_model::*;
pub use app_state::*;
pub use saga_context::*;
