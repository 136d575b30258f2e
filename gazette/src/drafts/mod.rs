mod drafts_saga;
mod drafts_state;

pub use drafts_saga::*;
pub use drafts_state::*;
