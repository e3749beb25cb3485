use crate::publisher::Publisher;
use needle_core::PublishError;
use std::collections::HashMap;

pub struct SinkRegistry {
    factories: HashMap<String, fn() -> Box<dyn Publisher>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("json_file", || Box::new(crate::json_file::JsonFileSink::new()));
        registry.register("icecast", || Box::new(crate::icecast::IcecastSink::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Publisher>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Publisher>, PublishError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| PublishError::NotFound(name.to_string()))
    }

    pub fn list_sinks(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}
