#![warn(missing_docs, missing_debug_implementations)]

//! Check whether a username is available across social-media platforms.
//!
//! Each supported platform is an entry in a static table
//! ([`platform::PLATFORMS`]) with a profile URL, a username pattern, and a
//! rule for reading the HTTP status of a lookup. The [`check::Checker`]
//! issues at most one request per `(platform, username)` per cache lifetime
//! and never fails: network problems come back as
//! [`check::Availability::Unknown`] so a scan over every platform always
//! completes.
//!
//! The [`bot`] and [`render`] modules turn results into chat messages;
//! [`report`] formats them for the command line.
//!
//! # Example
//!
//! ```no_run
//! use handle_avail::cache::ResultCache;
//! use handle_avail::check::{Availability, Checker, Client};
//! use handle_avail::platform;
//!
//! let checker = Checker::new(Client::new(), ResultCache::default());
//! let github = platform::find("github").unwrap();
//! match checker.check(github, "octocat") {
//!     Availability::Available => println!("Name is available!"),
//!     Availability::Taken => println!("Already taken."),
//!     Availability::Unknown => eprintln!("Could not reach GitHub."),
//! }
//! ```

pub mod bot;
pub mod cache;
pub mod check;
pub mod config;
pub mod error;
pub mod platform;
pub mod render;
pub mod report;
