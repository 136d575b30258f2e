mod navigation_state;

pub use navigation_state::*;
