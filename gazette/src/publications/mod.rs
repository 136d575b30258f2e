mod publications_saga;
mod publications_state;

pub use publications_saga::*;
pub use publications_state::*;
