//! Event fixtures shared by the micro-invoke benchmarks.

use serde_json::Value;

#[derive(Debug, Copy, Clone)]
pub struct EventFixture {
    name: &'static str,
    size: FixtureSize,
    file_name: &'static str,
    content: &'static str,
}

impl EventFixture {
    pub const fn new(name: &'static str, size: FixtureSize, file_name: &'static str, content: &'static str) -> Self {
        Self { name, size, file_name, content }
    }

    pub const fn small(name: &'static str, file_name: &'static str, content: &'static str) -> Self {
        Self::new(name, FixtureSize::Small, file_name, content)
    }

    pub const fn large(name: &'static str, file_name: &'static str, content: &'static str) -> Self {
        Self::new(name, FixtureSize::Large, file_name, content)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> FixtureSize {
        self.size
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    /// Parses the fixture into the JSON payload a gateway would send.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(self.content)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixtureSize {
    Small,
    Large,
}
