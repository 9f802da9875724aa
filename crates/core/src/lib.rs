#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod thread;
pub mod time;

pub use error::Error;
pub use thread::{ReplyNode, ThreadForest, build_tree};
pub use time::Clock;
