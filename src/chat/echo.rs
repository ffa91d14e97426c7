//! Default reply generator.

/// Return the message unchanged.
#[must_use]
pub fn echo(message: &str) -> String {
    message.to_string()
}
