pub mod runner;

pub use runner::{LoopHandle, LoopOptions, RecognitionLoop};
