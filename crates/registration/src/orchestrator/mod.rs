pub mod pick_engine;

pub use pick_engine::*;
