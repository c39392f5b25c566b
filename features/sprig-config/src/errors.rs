/// Errors raised while storing, resolving or binding properties
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A referenced key has neither a value nor a default
    #[error("property '{0}' not found")]
    Missing(String),

    /// `${…}` expansion came back to a key that is still being expanded
    #[error("circular property reference: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    /// The reference is malformed
    #[error("invalid property reference '{reference}': {reason}")]
    Syntax {
        reference: String,
        reason: &'static str,
    },

    /// The resolved value could not be converted to the requested type
    #[error("property '{key}' = '{value}' can't be bound to {target}: {reason}")]
    Bind {
        key: String,
        value: String,
        target: &'static str,
        reason: String,
    },

    /// A key would be both a leaf and the parent of other keys
    #[error("property '{key}' conflicts with existing property '{existing}'")]
    Conflict { key: String, existing: String },
}
