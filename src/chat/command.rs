//! Chat command parsing

use thiserror::Error;

/// One parsed chat line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `S <topic>`
    Subscribe { topic: &'a str },
    /// `UNS <topic>`
    Unsubscribe { topic: &'a str },
    /// `P <topic> <message>`
    Publish { topic: &'a str, message: &'a str },
}

/// Lines that are not a valid command
///
/// The display text is the reply sent back to the client, if any.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// No space separating command and data
    #[error("Invalid message format. Expected: <command> <data>")]
    InvalidFormat,

    /// `P` without a message after the topic
    #[error("Invalid publish format")]
    MissingMessage,

    #[error("Unknown command: {0}")]
    Unknown(String),
}

impl CommandError {
    /// Whether the client is told about this error
    pub fn is_reported(&self) -> bool {
        !matches!(self, CommandError::MissingMessage)
    }
}

impl<'a> Command<'a> {
    /// Split a line at the first space into command and data
    pub fn parse(line: &'a str) -> Result<Self, CommandError> {
        let (command, data) = line.split_once(' ').ok_or(CommandError::InvalidFormat)?;

        match command {
            "S" => Ok(Command::Subscribe { topic: data }),
            "UNS" => Ok(Command::Unsubscribe { topic: data }),
            "P" => {
                let (topic, message) = data.split_once(' ').ok_or(CommandError::MissingMessage)?;
                Ok(Command::Publish { topic, message })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}
