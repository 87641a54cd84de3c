//! Chat command handling: parsing, cooldowns, and dispatch to the checker.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use governor::clock::{Clock as RateClock, DefaultClock};
use governor::state::keyed::DefaultKeyedStateStore;
use governor::middleware::NoOpMiddleware;
use governor::{Quota, RateLimiter};

use crate::cache::{Clock, SystemClock};
use crate::check::{Checker, Client, Transport};
use crate::error::CommandError;
use crate::platform;
use crate::render::{self, Message, Stats};

/// Minimum gap between two `search` commands from one user.
pub const SEARCH_COOLDOWN: Duration = Duration::from_secs(15);

/// Minimum gap between two `check` commands from one user.
pub const CHECK_COOLDOWN: Duration = Duration::from_secs(20);

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Link to a name's profile on every platform.
    Search {
        /// Free-form name; may contain spaces.
        name: String,
    },
    /// Check username availability on every platform.
    Check {
        /// Candidate username.
        username: String,
    },
    /// Show usage statistics.
    Stats,
    /// Show the help menu.
    Help,
}

impl Command {
    /// Parse a line such as `!check alice`.
    ///
    /// Both `!` and `/` prefixes are accepted, and the prefix may be omitted.
    /// Command names are case-insensitive; the argument is the rest of the
    /// line, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for empty input, unknown commands, or a
    /// missing argument.
    pub fn parse(input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        let input = input
            .strip_prefix('!')
            .or_else(|| input.strip_prefix('/'))
            .unwrap_or(input)
            .trim_start();
        if input.is_empty() {
            return Err(CommandError::Empty);
        }

        let (name, rest) = input
            .split_once(char::is_whitespace)
            .unwrap_or((input, ""));
        let arg = rest.trim();

        match name.to_lowercase().as_str() {
            "search" => {
                if arg.is_empty() {
                    return Err(CommandError::MissingArgument {
                        usage: "!search <name>",
                    });
                }
                Ok(Self::Search {
                    name: arg.to_owned(),
                })
            }
            "check" => {
                if arg.is_empty() {
                    return Err(CommandError::MissingArgument {
                        usage: "!check <username>",
                    });
                }
                Ok(Self::Check {
                    username: arg.to_owned(),
                })
            }
            "stats" => Ok(Self::Stats),
            "help" => Ok(Self::Help),
            other => Err(CommandError::UnknownCommand(other.to_owned())),
        }
    }
}

type UserLimiter<G> =
    RateLimiter<String, DefaultKeyedStateStore<String>, G, NoOpMiddleware<<G as RateClock>::Instant>>;

fn per_user<G: RateClock>(window: Duration, clock: G) -> UserLimiter<G> {
    let quota = Quota::with_period(window).expect("cooldown windows are non-zero");
    RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock)
}

/// One keyed limiter per rate-limited command, each allowing a user one use
/// per window.
struct Cooldowns<G: RateClock> {
    search: UserLimiter<G>,
    check: UserLimiter<G>,
    clock: G,
}

impl<G: RateClock + Clone> Cooldowns<G> {
    fn new(clock: G) -> Self {
        Self {
            search: per_user(SEARCH_COOLDOWN, clock.clone()),
            check: per_user(CHECK_COOLDOWN, clock.clone()),
            clock,
        }
    }

    fn acquire(&self, user: &str, command: &Command) -> Result<(), CommandError> {
        let limiter = match command {
            Command::Search { .. } => &self.search,
            Command::Check { .. } => &self.check,
            Command::Stats | Command::Help => return Ok(()),
        };
        limiter
            .check_key(&user.to_owned())
            .map_err(|not_until| CommandError::Cooldown {
                retry_after: not_until.wait_time_from(self.clock.now()),
            })?;
        // Forget users whose window has already passed.
        limiter.retain_recent();
        Ok(())
    }
}

/// The chat bot: owns a checker and answers commands with messages.
pub struct Bot<T = Client, C = SystemClock, G: RateClock = DefaultClock> {
    checker: Checker<T, C>,
    cooldowns: Cooldowns<G>,
    searches: AtomicU64,
    started: Instant,
}

impl<T: Transport, C: Clock> Bot<T, C, DefaultClock> {
    /// A bot around `checker`; uptime counts from now on the checker's clock.
    pub fn new(checker: Checker<T, C>) -> Self {
        Self::with_cooldown_clock(checker, DefaultClock::default())
    }
}

impl<T: Transport, C: Clock, G: RateClock + Clone> Bot<T, C, G> {
    /// A bot whose command cooldowns are timed by `clock`.
    pub fn with_cooldown_clock(checker: Checker<T, C>, clock: G) -> Self {
        let started = checker.cache().clock().now();
        Self {
            checker,
            cooldowns: Cooldowns::new(clock),
            searches: AtomicU64::new(0),
            started,
        }
    }

    /// The underlying checker.
    pub fn checker(&self) -> &Checker<T, C> {
        &self.checker
    }

    /// Parse and run one line of input from `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when the line does not parse or the command
    /// is on cooldown for this user.
    pub fn handle_line(&self, user: &str, line: &str) -> Result<Vec<Message>, CommandError> {
        let command = Command::parse(line)?;
        self.handle(user, &command)
    }

    /// Run a parsed command for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Cooldown`] when `user` ran the same command
    /// too recently.
    pub fn handle(&self, user: &str, command: &Command) -> Result<Vec<Message>, CommandError> {
        self.cooldowns.acquire(user, command)?;
        tracing::info!(user, ?command, "handling command");

        let messages = match command {
            Command::Search { name } => {
                self.searches.fetch_add(1, Ordering::Relaxed);
                vec![render::search_results(name)]
            }
            Command::Check { username } => {
                self.searches.fetch_add(1, Ordering::Relaxed);
                self.check(username)
            }
            Command::Stats => vec![render::stats(&self.stats())],
            Command::Help => vec![render::help()],
        };
        Ok(messages)
    }

    /// Validation warning (if any) followed by the availability report.
    ///
    /// Platforms that reject the format are still checked.
    pub fn check(&self, username: &str) -> Vec<Message> {
        let invalid = platform::invalid_platforms(username);
        let results = self.checker.check_all(username);
        render::validation_warning(&invalid)
            .into_iter()
            .chain(render::availability_report(username, &results))
            .collect()
    }

    /// Current usage counters.
    pub fn stats(&self) -> Stats {
        Stats {
            searches: self.searches.load(Ordering::Relaxed),
            uptime: self.now().saturating_duration_since(self.started),
            cached_results: self.checker.cache().len(),
        }
    }

    fn now(&self) -> Instant {
        self.checker.cache().clock().now()
    }
}

impl<T, C, G: RateClock> fmt::Debug for Bot<T, C, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("checker", &self.checker)
            .field("searches", &self.searches)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_TTL, ManualClock, ResultCache};
    use crate::check::Redirects;
    use crate::error::TransportError;
    use governor::clock::FakeRelativeClock;
    use std::sync::Arc;

    struct AlwaysNotFound;

    impl Transport for AlwaysNotFound {
        fn get(&self, _url: &str, _redirects: Redirects) -> Result<u16, TransportError> {
            Ok(404)
        }
    }

    type TestBot = Bot<AlwaysNotFound, Arc<ManualClock>, FakeRelativeClock>;

    /// A bot whose cache clock and cooldown clock are both driven by hand.
    fn bot() -> (TestBot, Arc<ManualClock>, FakeRelativeClock) {
        let clock = Arc::new(ManualClock::new());
        let cooldown_clock = FakeRelativeClock::default();
        let cache = ResultCache::with_clock(DEFAULT_TTL, Arc::clone(&clock));
        let checker = Checker::new(AlwaysNotFound, cache);
        let bot = Bot::with_cooldown_clock(checker, cooldown_clock.clone());
        (bot, clock, cooldown_clock)
    }

    #[test]
    fn parse_commands() {
        assert_eq!(
            Command::parse("!check alice").unwrap(),
            Command::Check {
                username: "alice".into()
            }
        );
        assert_eq!(
            Command::parse("/SEARCH  Jane Doe ").unwrap(),
            Command::Search {
                name: "Jane Doe".into()
            }
        );
        assert_eq!(Command::parse("stats").unwrap(), Command::Stats);
        assert_eq!(Command::parse("! help").unwrap(), Command::Help);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Command::parse("  "), Err(CommandError::Empty));
        assert_eq!(Command::parse("!"), Err(CommandError::Empty));
        assert_eq!(
            Command::parse("!dance"),
            Err(CommandError::UnknownCommand("dance".into()))
        );
        assert!(matches!(
            Command::parse("!check   "),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn check_cooldown_is_per_user() {
        let (bot, _clock, cooldown_clock) = bot();
        assert!(bot.handle_line("u1", "!check alice").is_ok());
        assert!(bot.handle_line("u2", "!check alice").is_ok());
        cooldown_clock.advance(Duration::from_secs(5));
        match bot.handle_line("u1", "!check bob") {
            Err(CommandError::Cooldown { retry_after }) => {
                assert_eq!(retry_after, Duration::from_secs(15));
            }
            other => panic!("expected Cooldown, got {other:?}"),
        }
        cooldown_clock.advance(Duration::from_secs(15));
        assert!(bot.handle_line("u1", "!check bob").is_ok());
    }

    #[test]
    fn search_cooldown_is_shorter() {
        let (bot, _clock, cooldown_clock) = bot();
        assert!(bot.handle_line("u1", "!search alice").is_ok());
        cooldown_clock.advance(Duration::from_secs(14));
        assert!(matches!(
            bot.handle_line("u1", "!search bob"),
            Err(CommandError::Cooldown { .. })
        ));
        cooldown_clock.advance(Duration::from_secs(1));
        assert!(bot.handle_line("u1", "!search bob").is_ok());
    }

    #[test]
    fn cooldowns_are_per_command() {
        let (bot, _clock, _cooldown_clock) = bot();
        assert!(bot.handle_line("u1", "!check alice").is_ok());
        assert!(bot.handle_line("u1", "!search alice").is_ok());
        assert!(bot.handle_line("u1", "!stats").is_ok());
        assert!(bot.handle_line("u1", "!stats").is_ok());
    }

    #[test]
    fn idle_users_are_forgotten() {
        let (bot, _clock, cooldown_clock) = bot();
        for user in ["u1", "u2", "u3"] {
            bot.handle_line(user, "!check alice").unwrap();
        }
        assert_eq!(bot.cooldowns.check.len(), 3);
        cooldown_clock.advance(CHECK_COOLDOWN * 3);
        bot.handle_line("u4", "!check alice").unwrap();
        assert_eq!(bot.cooldowns.check.len(), 1);
    }

    #[test]
    fn searches_are_counted() {
        let (bot, clock, _cooldown_clock) = bot();
        bot.handle_line("u1", "!search alice").unwrap();
        bot.handle_line("u1", "!check alice").unwrap();
        bot.handle_line("u1", "!help").unwrap();
        clock.advance(Duration::from_secs(61));
        let stats = bot.stats();
        assert_eq!(stats.searches, 2);
        assert_eq!(stats.uptime, Duration::from_secs(61));
        assert_eq!(stats.cached_results, platform::all().len());
    }

    #[test]
    fn failed_cooldown_does_not_count() {
        let (bot, _clock, _cooldown_clock) = bot();
        bot.handle_line("u1", "!search a").unwrap();
        assert!(bot.handle_line("u1", "!search b").is_err());
        assert_eq!(bot.stats().searches, 1);
    }

    #[test]
    fn check_prepends_validation_warning() {
        let (bot, _clock, _cooldown_clock) = bot();
        let msgs = bot.check("ab");
        assert_eq!(msgs.len(), 3);
        assert!(
            msgs[0]
                .description
                .as_deref()
                .is_some_and(|d| d.contains("LinkedIn"))
        );
        assert_eq!(msgs[1].title.as_deref(), Some("Username Availability: ab"));

        let msgs = bot.check("alice99");
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].title.is_some());
    }
}
