use crate::recognizer::Recognizer;
use needle_core::RecognizeError;
use std::collections::HashMap;

pub struct ProviderRegistry {
    factories: HashMap<String, fn() -> Box<dyn Recognizer>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || Box::new(crate::null::NullRecognizer::new()));
        registry.register("shazam", || Box::new(crate::shazam::ShazamRecognizer::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn Recognizer>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Recognizer>, RecognizeError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| RecognizeError::ProviderNotFound(name.to_string()))
    }

    pub fn list_providers(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
