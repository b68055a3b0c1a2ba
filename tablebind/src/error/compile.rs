//! Template compilation error types

/// Error reported by a [`TemplateCompiler`](crate::TemplateCompiler).
///
/// Compilation failures are logged by the scheduler and never abort a
/// flush; the remaining rows of the batch are still compiled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to compile {node}: {message}")]
pub struct CompileError {
    /// Id of the node that failed.
    pub node: String,
    /// Compiler supplied message.
    pub message: String,
}

impl CompileError {
    /// Creates a new compile error.
    pub fn new(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            message: message.into(),
        }
    }
}
