pub mod atomic;
pub mod host;
pub mod icecast;
pub mod json_file;
pub mod publisher;
pub mod registry;

pub use atomic::atomic_write;
pub use host::PublisherHost;
pub use icecast::IcecastSink;
pub use json_file::JsonFileSink;
pub use publisher::Publisher;
pub use registry::SinkRegistry;
