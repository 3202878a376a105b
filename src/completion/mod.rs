//! Cursor analysis and result shaping shared by the daemon's completion path.

pub mod partial;
pub mod pipeline;

pub use partial::extract_partial;
pub use pipeline::build_proposals;
