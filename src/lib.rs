//! Heuristic structure recovery for legal and policy pages.
//!
//! [`parser`] turns one HTML document into a [`parser::ParsedPolicy`]: a title
//! plus nested sections rebuilt from the headings the page actually uses.
//! The remaining modules feed it: [`crawler`] and [`sitemap`] find and fetch
//! pages, [`db`] stores pages and parse results.

pub mod config;
pub mod crawler;
pub mod db;
pub mod parser;
pub mod sitemap;

pub use parser::{parse_policy, ParsedPolicy, ParserOptions, PolicyParser};
