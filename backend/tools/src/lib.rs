pub mod loop_detection;

pub use loop_detection::{LoopGuard, DEFAULT_LOOP_WINDOW};
