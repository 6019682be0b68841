//! Message handlers, one module per concern

mod chunk_requests;
mod lifecycle;
mod persistence;
mod tile_actions;

pub use chunk_requests::*;
pub use lifecycle::*;
pub use persistence::*;
pub use tile_actions::*;
