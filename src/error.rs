use serde::{Deserialize, Serialize};

/// An error carrying a human readable context and, possibly, the message of the error it was propagated from.
///
/// Every fallible operation of this crate returns it, from the spreadsheet loading down to
/// a single failed section of an invoice page.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ContextError {
    pub context: String,
    pub source_error: Option<String>,
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.context)?;
        if let Some(source_error) = &self.source_error {
            write!(formatter, ": {}", lowercase_first_letter(source_error))?;
        }
        Ok(())
    }
}

impl std::error::Error for ContextError {}

impl ContextError {
    /// An error which is not caused by another one.
    pub fn with_context<S: Into<String>>(context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: None,
        }
    }

    /// An error caused by another one, whose message is kept.
    pub fn with_error<S: Into<String>>(context: S, error: &dyn std::error::Error) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(error.to_string()),
        }
    }

    /// Wrap this error into an outer context, keeping the whole chain in the source message.
    pub fn within<S: Into<String>>(self, context: S) -> ContextError {
        ContextError {
            context: context.into(),
            source_error: Some(self.to_string()),
        }
    }
}

/// Error messages are chained after a colon, so the first letter of the inner one is lowered.
fn lowercase_first_letter(message: &str) -> String {
    let mut characters = message.chars();
    characters
        .next()
        .map(|first| first.to_lowercase().chain(characters).collect())
        .unwrap_or_default()
}
