//! The static table of supported platforms.
//!
//! Each entry carries a profile URL template, a username pattern, and a
//! [`LookupRule`] telling the checker how to turn an HTTP status into an
//! [`Availability`]. Adding a platform is an edit to [`PLATFORMS`].

use std::fmt;
use std::sync::LazyLock;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;

use crate::check::Availability;
use crate::error::InvalidUsername;

const USERNAME_PLACEHOLDER: &str = "{username}";

// Bytes that may not appear raw in a URL path segment, plus `%` so a literal
// percent sign in a username is not read as an escape.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn fill_template(template: &str, username: &str) -> String {
    let segment = utf8_percent_encode(username, PATH_SEGMENT).to_string();
    template.replace(USERNAME_PLACEHOLDER, &segment)
}

/// How a platform's HTTP response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum LookupRule {
    /// Request the public profile page without following redirects.
    /// 404 means available, anything else taken.
    ProfilePage,
    /// Ask a dedicated user-lookup API, following redirects.
    /// 404 means available, anything else taken.
    IdentityApi {
        /// URL template with a `{username}` placeholder.
        endpoint: &'static str,
    },
    /// The platform answers 302 for missing profiles instead of 404.
    /// Either status means available.
    RedirectSensitive {
        /// URL template with a `{username}` placeholder.
        endpoint: &'static str,
    },
}

impl LookupRule {
    /// Whether the request for this rule should follow redirects.
    pub fn follows_redirects(self) -> bool {
        matches!(self, Self::IdentityApi { .. })
    }

    /// Map an HTTP status code to an availability verdict.
    ///
    /// ```
    /// use handle_avail::check::Availability;
    /// use handle_avail::platform::LookupRule;
    ///
    /// assert_eq!(LookupRule::ProfilePage.interpret(404), Availability::Available);
    /// assert_eq!(LookupRule::ProfilePage.interpret(200), Availability::Taken);
    /// ```
    pub fn interpret(self, status: u16) -> Availability {
        let available = match self {
            Self::ProfilePage | Self::IdentityApi { .. } => status == 404,
            Self::RedirectSensitive { .. } => matches!(status, 404 | 302),
        };
        if available {
            Availability::Available
        } else {
            Availability::Taken
        }
    }
}

/// Static metadata for one supported platform.
#[derive(Debug, Serialize)]
pub struct PlatformSpec {
    /// Lowercase identifier, e.g. `"github"`.
    pub id: &'static str,
    /// Human-readable name, e.g. `"GitHub"`.
    pub display_name: &'static str,
    /// Profile URL template with a `{username}` placeholder.
    pub profile_url_template: &'static str,
    /// Full-match regular expression for allowed usernames.
    pub pattern: &'static str,
    /// How availability is determined.
    pub rule: LookupRule,
    #[serde(skip)]
    regex: LazyLock<Regex>,
}

macro_rules! platform {
    ($id:literal, $name:literal, $url:literal, $pattern:literal, $rule:expr) => {
        PlatformSpec {
            id: $id,
            display_name: $name,
            profile_url_template: $url,
            pattern: $pattern,
            rule: $rule,
            regex: LazyLock::new(|| compile_pattern($pattern)),
        }
    };
}

/// Every supported platform, in display order.
pub static PLATFORMS: [PlatformSpec; 9] = [
    platform!(
        "facebook",
        "Facebook",
        "https://facebook.com/{username}",
        r"^[a-zA-Z0-9.]+$",
        LookupRule::ProfilePage
    ),
    platform!(
        "twitter",
        "Twitter",
        "https://twitter.com/{username}",
        r"^[A-Za-z0-9_]{1,15}$",
        LookupRule::ProfilePage
    ),
    platform!(
        "instagram",
        "Instagram",
        "https://instagram.com/{username}",
        r"^[A-Za-z0-9_.]{1,30}$",
        LookupRule::RedirectSensitive {
            endpoint: "https://www.instagram.com/{username}/"
        }
    ),
    platform!(
        "linkedin",
        "LinkedIn",
        "https://linkedin.com/in/{username}",
        r"^[a-zA-Z0-9-]{5,30}$",
        LookupRule::ProfilePage
    ),
    platform!(
        "github",
        "GitHub",
        "https://github.com/{username}",
        r"^[a-zA-Z0-9-]{1,39}$",
        LookupRule::IdentityApi {
            endpoint: "https://api.github.com/users/{username}"
        }
    ),
    platform!(
        "youtube",
        "YouTube",
        "https://youtube.com/@{username}",
        r"^[a-zA-Z0-9-]{3,30}$",
        LookupRule::ProfilePage
    ),
    platform!(
        "twitch",
        "Twitch",
        "https://twitch.tv/{username}",
        r"^[a-zA-Z0-9_]{4,25}$",
        LookupRule::ProfilePage
    ),
    platform!(
        "tiktok",
        "TikTok",
        "https://tiktok.com/@{username}",
        r"^[a-zA-Z0-9_.]{2,24}$",
        LookupRule::ProfilePage
    ),
    platform!(
        "reddit",
        "Reddit",
        "https://reddit.com/user/{username}",
        r"^[a-zA-Z0-9_-]{3,20}$",
        LookupRule::ProfilePage
    ),
];

fn compile_pattern(pattern: &str) -> Regex {
    Regex::new(pattern).expect("username patterns are valid literals")
}

/// All supported platforms, in display order.
pub fn all() -> &'static [PlatformSpec] {
    &PLATFORMS
}

/// Look up a platform by id, ignoring ASCII case.
///
/// ```
/// let gh = handle_avail::platform::find("GitHub").unwrap();
/// assert_eq!(gh.id, "github");
/// ```
pub fn find(id: &str) -> Option<&'static PlatformSpec> {
    PLATFORMS.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

/// Platforms whose username format rejects `username`, in display order.
pub fn invalid_platforms(username: &str) -> Vec<&'static PlatformSpec> {
    PLATFORMS.iter().filter(|p| !p.is_valid(username)).collect()
}

impl PlatformSpec {
    /// Whether `username` matches this platform's allowed format.
    pub fn is_valid(&self, username: &str) -> bool {
        self.regex.is_match(username)
    }

    /// Validate `username` against this platform's allowed format.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidUsername`] when the pattern does not match.
    pub fn validate(&self, username: &str) -> Result<(), InvalidUsername> {
        if self.is_valid(username) {
            Ok(())
        } else {
            Err(InvalidUsername {
                platform: self.display_name,
                username: username.to_owned(),
            })
        }
    }

    /// The public profile link shown to users.
    ///
    /// The username is percent-encoded as a single path segment.
    ///
    /// ```
    /// let yt = handle_avail::platform::find("youtube").unwrap();
    /// assert_eq!(yt.profile_url("alice"), "https://youtube.com/@alice");
    /// assert_eq!(yt.profile_url("a b"), "https://youtube.com/@a%20b");
    /// ```
    pub fn profile_url(&self, username: &str) -> String {
        fill_template(self.profile_url_template, username)
    }

    /// The URL the checker requests for `username`.
    pub fn lookup_url(&self, username: &str) -> String {
        match self.rule {
            LookupRule::ProfilePage => self.profile_url(username),
            LookupRule::IdentityApi { endpoint } | LookupRule::RedirectSensitive { endpoint } => {
                fill_template(endpoint, username)
            }
        }
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles() {
        for p in all() {
            assert!(Regex::new(p.pattern).is_ok(), "{} pattern broken", p.id);
        }
    }

    #[test]
    fn ids_are_unique_and_lowercase() {
        let mut ids: Vec<_> = all().iter().map(|p| p.id).collect();
        for id in &ids {
            assert_eq!(*id, id.to_lowercase());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PLATFORMS.len());
    }

    #[test]
    fn every_template_has_placeholder() {
        for p in all() {
            assert!(p.profile_url_template.contains(USERNAME_PLACEHOLDER));
            match p.rule {
                LookupRule::IdentityApi { endpoint }
                | LookupRule::RedirectSensitive { endpoint } => {
                    assert!(endpoint.contains(USERNAME_PLACEHOLDER));
                }
                LookupRule::ProfilePage => {}
            }
        }
    }

    #[test]
    fn exactly_one_special_rule_each() {
        let api = all()
            .iter()
            .filter(|p| matches!(p.rule, LookupRule::IdentityApi { .. }))
            .count();
        let redirect = all()
            .iter()
            .filter(|p| matches!(p.rule, LookupRule::RedirectSensitive { .. }))
            .count();
        assert_eq!((api, redirect), (1, 1));
    }

    #[test]
    fn find_is_case_insensitive() {
        assert_eq!(find("TWITCH").map(|p| p.id), Some("twitch"));
        assert!(find("myspace").is_none());
    }

    #[test]
    fn lookup_urls_follow_rule() {
        let gh = find("github").unwrap();
        assert_eq!(gh.lookup_url("octocat"), "https://api.github.com/users/octocat");
        assert_eq!(gh.profile_url("octocat"), "https://github.com/octocat");

        let ig = find("instagram").unwrap();
        assert_eq!(ig.lookup_url("alice"), "https://www.instagram.com/alice/");

        let reddit = find("reddit").unwrap();
        assert_eq!(reddit.lookup_url("alice"), "https://reddit.com/user/alice");
    }

    #[test]
    fn urls_encode_username_as_path_segment() {
        let twitter = find("twitter").unwrap();
        assert_eq!(twitter.lookup_url("john doe"), "https://twitter.com/john%20doe");
        assert_eq!(twitter.lookup_url("josé"), "https://twitter.com/jos%C3%A9");
        assert_eq!(twitter.lookup_url("a/b?c#d"), "https://twitter.com/a%2Fb%3Fc%23d");
        assert_eq!(twitter.lookup_url("50%"), "https://twitter.com/50%25");

        let ig = find("instagram").unwrap();
        assert_eq!(ig.lookup_url("john doe"), "https://www.instagram.com/john%20doe/");
    }

    #[test]
    fn valid_usernames_are_not_encoded() {
        for p in all() {
            let raw = p.profile_url_template.replace(USERNAME_PLACEHOLDER, "a.b_c-d");
            assert_eq!(p.profile_url("a.b_c-d"), raw);
        }
    }

    #[test]
    fn interpret_default_rule() {
        assert_eq!(LookupRule::ProfilePage.interpret(404), Availability::Available);
        assert_eq!(LookupRule::ProfilePage.interpret(200), Availability::Taken);
        assert_eq!(LookupRule::ProfilePage.interpret(302), Availability::Taken);
        assert_eq!(LookupRule::ProfilePage.interpret(429), Availability::Taken);
    }

    #[test]
    fn interpret_redirect_sensitive_rule() {
        let rule = find("instagram").unwrap().rule;
        assert_eq!(rule.interpret(302), Availability::Available);
        assert_eq!(rule.interpret(404), Availability::Available);
        assert_eq!(rule.interpret(200), Availability::Taken);
        assert_eq!(rule.interpret(301), Availability::Taken);
    }

    #[test]
    fn only_identity_api_follows_redirects() {
        for p in all() {
            assert_eq!(
                p.rule.follows_redirects(),
                matches!(p.rule, LookupRule::IdentityApi { .. }),
                "{}",
                p.id
            );
        }
    }

    #[test]
    fn validation_lengths() {
        let twitter = find("twitter").unwrap();
        assert!(twitter.is_valid("jack"));
        assert!(twitter.is_valid("a_b_c_d_e_f_g_h"));
        assert!(!twitter.is_valid("sixteen_chars_xx"));
        assert!(!twitter.is_valid(""));

        let linkedin = find("linkedin").unwrap();
        assert!(!linkedin.is_valid("abcd"));
        assert!(linkedin.is_valid("abcde"));
    }

    #[test]
    fn validation_rejects_bad_characters() {
        let err = find("github").unwrap().validate("no_underscores").unwrap_err();
        assert_eq!(err.platform, "GitHub");
        assert!(find("facebook").unwrap().validate("first.last").is_ok());
        assert!(find("facebook").unwrap().validate("first last").is_err());
    }

    #[test]
    fn invalid_platforms_in_table_order() {
        let rejected: Vec<_> = invalid_platforms("ab").iter().map(|p| p.id).collect();
        assert_eq!(rejected, ["linkedin", "youtube", "twitch", "reddit"]);
        assert!(invalid_platforms("alice99").is_empty());
    }

    #[test]
    fn spec_serializes_rule_tag() {
        let json = serde_json::to_value(find("github").unwrap()).unwrap();
        assert_eq!(json["rule"]["kind"], "identity_api");
        assert_eq!(json["id"], "github");
        assert!(json.get("regex").is_none());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn reddit_accepts_its_alphabet(name in "[a-zA-Z0-9_-]{3,20}") {
                prop_assert!(find("reddit").unwrap().is_valid(&name));
            }

            #[test]
            fn whitespace_is_never_valid(a in "[a-z]{2,5}", b in "[a-z]{2,5}") {
                let name = format!("{a} {b}");
                prop_assert_eq!(invalid_platforms(&name).len(), PLATFORMS.len());
            }

            #[test]
            fn profile_url_ends_with_username(name in "[a-z0-9]{1,15}") {
                for p in all() {
                    prop_assert!(p.profile_url(&name).ends_with(&name));
                }
            }
        }
    }
}
