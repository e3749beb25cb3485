pub mod null;
pub mod recognizer;
pub mod registry;
pub mod shazam;

pub use null::NullRecognizer;
pub use recognizer::Recognizer;
pub use registry::ProviderRegistry;
pub use shazam::ShazamRecognizer;
