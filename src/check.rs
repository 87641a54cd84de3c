//! Core availability checking against social-media platforms.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use ureq::Agent;

use crate::cache::{CacheKey, Clock, ResultCache, SystemClock};
use crate::config::Config;
use crate::error::TransportError;
use crate::platform::{self, PlatformSpec};

/// Default deadline for a single outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum number of concurrent HTTP requests when checking every platform.
pub const MAX_CONCURRENT_REQUESTS: usize = 20;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (username availability checker)"
);

/// Whether a username is free on a platform.
///
/// `Unknown` only ever means the platform could not be reached; callers must
/// not read it as either of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[must_use]
pub enum Availability {
    /// No account with this name appears to exist.
    Available,
    /// An account with this name exists.
    Taken,
    /// The lookup failed at the transport layer.
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Taken => write!(f, "taken"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Redirect policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    /// Follow redirects and report the final status.
    Follow,
    /// Report the first response's status, including 3xx.
    Stop,
}

/// Something that can issue a GET and report the HTTP status.
///
/// Non-success statuses are `Ok`; only failures to get any response at all
/// are errors.
pub trait Transport: Send + Sync {
    /// Request `url` and return the response status code.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] on timeout, connection, or protocol failure.
    fn get(&self, url: &str, redirects: Redirects) -> Result<u16, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, redirects: Redirects) -> Result<u16, TransportError> {
        (**self).get(url, redirects)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn get(&self, url: &str, redirects: Redirects) -> Result<u16, TransportError> {
        (**self).get(url, redirects)
    }
}

/// An HTTP client configured for platform lookups.
///
/// Wraps two ureq agents, one following redirects and one not; each keeps its
/// own connection pool for the life of the client.
///
/// ```no_run
/// use handle_avail::check::Client;
///
/// let client = Client::new();
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    follow: Agent,
    no_follow: Agent,
}

impl Client {
    /// Create a client with the default timeout and user agent.
    #[must_use]
    pub fn new() -> Self {
        Self::with_timeout(REQUEST_TIMEOUT, USER_AGENT)
    }

    /// Create a client with a custom deadline and `User-Agent`.
    #[must_use]
    pub fn with_timeout(timeout: Duration, user_agent: &str) -> Self {
        let follow = Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(user_agent)
            .http_status_as_error(false)
            .build();
        let no_follow = Agent::config_builder()
            .timeout_global(Some(timeout))
            .user_agent(user_agent)
            .http_status_as_error(false)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .build();
        Self {
            follow: Agent::new_with_config(follow),
            no_follow: Agent::new_with_config(no_follow),
        }
    }

    /// Create a client from runtime configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::with_timeout(config.request_timeout, &config.user_agent)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for Client {
    fn get(&self, url: &str, redirects: Redirects) -> Result<u16, TransportError> {
        let agent = match redirects {
            Redirects::Follow => &self.follow,
            Redirects::Stop => &self.no_follow,
        };
        let response = agent.get(url).call()?;
        Ok(response.status().as_u16())
    }
}

/// One platform's verdict for a username.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformResult {
    /// The platform checked.
    #[serde(serialize_with = "serialize_platform_id")]
    pub platform: &'static PlatformSpec,
    /// The verdict.
    pub availability: Availability,
}

fn serialize_platform_id<S: serde::Serializer>(
    p: &&'static PlatformSpec,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(p.id)
}

/// Checks usernames against platforms through a transport and a result cache.
pub struct Checker<T = Client, C = SystemClock> {
    transport: T,
    cache: ResultCache<C>,
    max_concurrent: usize,
}

impl Checker<Client, SystemClock> {
    /// A checker built from runtime configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Client::from_config(config), ResultCache::new(config.cache_ttl))
            .with_max_concurrent(config.max_concurrent)
    }
}

impl<T: Transport, C: Clock> Checker<T, C> {
    /// A checker over `transport` and `cache`.
    pub fn new(transport: T, cache: ResultCache<C>) -> Self {
        Self {
            transport,
            cache,
            max_concurrent: MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Limit how many requests [`check_all`](Self::check_all) keeps in flight.
    ///
    /// Zero is treated as one.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n.max(1);
        self
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache<C> {
        &self.cache
    }

    /// Check whether `username` is available on `platform`.
    ///
    /// A fresh cached result is returned without touching the network.
    /// Otherwise exactly one request is made. Transport failures come back
    /// as [`Availability::Unknown`] and are not cached, so the next call
    /// retries.
    ///
    /// The username is not validated against the platform's pattern.
    pub fn check(&self, platform: &'static PlatformSpec, username: &str) -> Availability {
        let key = CacheKey::new(platform.id, username);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(%key, result = %hit, "cache hit");
            return hit;
        }
        tracing::debug!(%key, "cache miss");

        let url = platform.lookup_url(username);
        let redirects = if platform.rule.follows_redirects() {
            Redirects::Follow
        } else {
            Redirects::Stop
        };

        match self.transport.get(&url, redirects) {
            Ok(status) => {
                let result = platform.rule.interpret(status);
                tracing::debug!(%key, status, %result, "lookup complete");
                self.cache.insert(key, result);
                result
            }
            Err(e) => {
                tracing::warn!(platform = platform.id, error = %e, "error checking platform");
                Availability::Unknown
            }
        }
    }

    /// Check `username` on every supported platform, in table order.
    pub fn check_all(&self, username: &str) -> Vec<PlatformResult> {
        self.check_many(platform::all(), username)
    }

    /// Check `username` on each of `platforms`, preserving order.
    ///
    /// Lookups run on scoped threads, at most `max_concurrent` at a time.
    pub fn check_many(
        &self,
        platforms: &'static [PlatformSpec],
        username: &str,
    ) -> Vec<PlatformResult> {
        let mut results = Vec::with_capacity(platforms.len());
        for batch in platforms.chunks(self.max_concurrent) {
            std::thread::scope(|s| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|platform| (platform, s.spawn(move || self.check(platform, username))))
                    .collect();
                for (platform, handle) in handles {
                    // A panicking lookup is reported like any other failure.
                    let availability = handle.join().unwrap_or(Availability::Unknown);
                    results.push(PlatformResult {
                        platform,
                        availability,
                    });
                }
            });
        }
        results
    }
}

impl<T, C> fmt::Debug for Checker<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checker")
            .field("cache", &self.cache)
            .field("max_concurrent", &self.max_concurrent)
            .finish_non_exhaustive()
    }
}
