//! Chat-message rendering for check results, searches, stats, and help.
//!
//! A [`Message`] mirrors a chat embed: an optional title and description, a
//! list of named fields, and an optional footer. Its [`Display`](fmt::Display)
//! impl produces Markdown-flavoured plain text.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::check::{Availability, PlatformResult};
use crate::error::CommandError;
use crate::platform::{self, PlatformSpec};

/// Most fields a single message may carry before spilling into the next.
pub const FIELDS_PER_MESSAGE: usize = 6;

/// One name/value pair in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Field heading.
    pub name: String,
    /// Field body; may contain Markdown links.
    pub value: String,
}

impl Field {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Bold heading line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free text under the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Named fields, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    /// Small print at the bottom.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Message {
    /// A message with only a description.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            description: Some(text.into()),
            ..Self::default()
        }
    }

    fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::new(name, value));
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blocks: Vec<String> = Vec::new();
        if let Some(title) = &self.title {
            blocks.push(format!("**{title}**"));
        }
        if let Some(description) = &self.description {
            blocks.push(description.clone());
        }
        for field in &self.fields {
            blocks.push(format!("**{}**\n{}", field.name, field.value));
        }
        if let Some(footer) = &self.footer {
            blocks.push(format!("_{footer}_"));
        }
        f.write_str(&blocks.join("\n\n"))
    }
}

/// The status line shown for a verdict.
pub fn status_label(availability: Availability) -> &'static str {
    match availability {
        Availability::Available => "✅ Available",
        Availability::Taken => "❌ Taken",
        Availability::Unknown => "⚠️ Error",
    }
}

/// Warning listing platforms whose format rules reject the username, if any.
pub fn validation_warning(invalid: &[&PlatformSpec]) -> Option<Message> {
    if invalid.is_empty() {
        return None;
    }
    let names: Vec<_> = invalid.iter().map(|p| p.display_name).collect();
    Some(Message::text(format!(
        "⚠️ Username doesn't meet requirements for: {}",
        names.join(", ")
    )))
}

/// Availability results, split across as many messages as needed.
///
/// Only the first message carries the title.
pub fn availability_report(username: &str, results: &[PlatformResult]) -> Vec<Message> {
    let mut messages: Vec<Message> = results
        .chunks(FIELDS_PER_MESSAGE)
        .map(|chunk| {
            chunk.iter().fold(Message::default(), |msg, r| {
                msg.field(
                    r.platform.display_name,
                    format!(
                        "{}\n[Check]({})",
                        status_label(r.availability),
                        r.platform.profile_url(username)
                    ),
                )
            })
        })
        .collect();
    let title = format!("Username Availability: {username}");
    match messages.first_mut() {
        Some(first) => first.title = Some(title),
        None => messages.push(Message::titled(title)),
    }
    messages
}

/// Links to search for `name` on Google and on every platform.
pub fn search_results(name: &str) -> Message {
    let handle: String = name.chars().filter(|c| *c != ' ').collect();
    let google = format!(
        "[Search on Google](https://www.google.com/search?q={})",
        name.replace(' ', "+")
    );
    platform::all().iter().fold(
        Message::titled(format!("🔍 Search Results for {name}")).field("Google Search", google),
        |msg, p| msg.field(p.display_name, format!("[View Profile]({})", p.profile_url(&handle))),
    )
}

/// Usage counters shown by the stats command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Searches and checks served since start.
    pub searches: u64,
    /// Time since the bot started.
    pub uptime: Duration,
    /// Results currently held in the cache.
    pub cached_results: usize,
}

/// Bot statistics.
pub fn stats(stats: &Stats) -> Message {
    Message::titled("📊 Bot Statistics")
        .field("Total Searches", stats.searches.to_string())
        .field("Uptime", format_uptime(stats.uptime))
        .field("Cached Results", stats.cached_results.to_string())
}

/// Format a duration as `H:MM:SS`, dropping fractions of a second.
///
/// ```
/// use std::time::Duration;
/// assert_eq!(handle_avail::render::format_uptime(Duration::from_secs(3725)), "1:02:05");
/// ```
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

const COMMANDS: &[(&str, &str)] = &[
    ("!search <name>", "Search for a name across social media"),
    ("!check <username>", "Check username availability"),
    ("!stats", "Show bot statistics"),
    ("!help", "Show this help message"),
];

/// The help menu.
pub fn help() -> Message {
    let mut msg = Message::titled("🆘 Social Search Bot Help");
    msg.description = Some("A bot to search usernames across social media platforms".into());
    msg = COMMANDS
        .iter()
        .fold(msg, |msg, (cmd, desc)| msg.field(*cmd, *desc));
    msg.footer = Some(format!("Checks {} platforms", platform::all().len()));
    msg
}

/// A command failure, as shown to the user.
pub fn error(err: &CommandError) -> Message {
    Message::text(format!("❌ {err}"))
}
