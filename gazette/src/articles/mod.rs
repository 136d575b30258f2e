mod articles_saga;
mod articles_state;

pub use articles_saga::*;
pub use articles_state::*;
