pub mod handlers;
pub mod render;
pub mod router;

pub use router::{PrefsState, prefs_router};
