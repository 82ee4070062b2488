//! Deterministic code generator.

use crate::challenge::CodeGenerator;

/// Always produces the same code.
#[derive(Debug, Clone)]
pub struct FixedCodeGenerator {
    code: String,
}

impl FixedCodeGenerator {
    /// Generator that returns `code` on every call, whatever length is asked.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self, _digits: u32) -> String {
        self.code.clone()
    }
}
