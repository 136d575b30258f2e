mod auth_saga;
mod auth_state;

pub use auth_saga::*;
pub use auth_state::*;
