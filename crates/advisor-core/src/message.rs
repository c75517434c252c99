//! Prompt Messages
//!
//! Backend-neutral prompt format; each provider maps it to its own wire shape.

/// Who a prompt message speaks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Standing instructions
    System,
    /// The request itself
    User,
}

/// A single message in a prompt
#[derive(Clone, Debug)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Instructions the backend should follow for the whole exchange
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}
