pub mod capacity;
mod types;

pub use types::*;
