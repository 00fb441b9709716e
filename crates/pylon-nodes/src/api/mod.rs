//! API entry/exit adapter nodes.

mod input;
mod output;

pub use input::ApiInputNode;
pub use output::ApiOutputNode;
