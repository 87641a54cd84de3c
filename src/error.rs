//! Error types shared across the crate.

use std::time::Duration;

use thiserror::Error;

/// A network-level failure while talking to a platform.
///
/// Never escapes [`Checker::check`](crate::check::Checker::check): the
/// checker turns it into [`Availability::Unknown`](crate::check::Availability::Unknown).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The HTTP layer failed (timeout, DNS, TLS, connection reset, ...).
    #[error("request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    /// A test double or custom transport reported a failure.
    #[error("{0}")]
    Other(String),
}

impl From<ureq::Error> for TransportError {
    fn from(e: ureq::Error) -> Self {
        Self::Http(Box::new(e))
    }
}

/// A username that does not match a platform's allowed format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{username}` does not meet the username requirements for {platform}")]
pub struct InvalidUsername {
    /// Display name of the platform that rejected the username.
    pub platform: &'static str,
    /// The rejected username.
    pub username: String,
}

/// Errors from parsing or running a chat command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CommandError {
    /// The input line was empty or only a prefix.
    #[error("empty command")]
    Empty,
    /// The command name is not recognised.
    #[error("unknown command `{0}`, try !help")]
    UnknownCommand(String),
    /// A command that needs an argument was given none.
    #[error("missing argument: usage is {usage}")]
    MissingArgument {
        /// Usage string for the command.
        usage: &'static str,
    },
    /// The user invoked the command again before its cooldown expired.
    #[error("command is on cooldown, try again in {:.0}s", retry_after.as_secs_f64().ceil())]
    Cooldown {
        /// Time left until the command may be used again.
        retry_after: Duration,
    },
}

/// Invalid runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The cache TTL must be positive.
    #[error("cache TTL must be greater than zero")]
    ZeroTtl,
    /// The request timeout must be positive.
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    /// At least one request must be allowed in flight.
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}
