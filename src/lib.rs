//! News Timeline - a date-grouped news feed
//!
//! This crate serves stored articles as an infinite-scrolling timeline
//! grouped by publish date, and provides the client-side paging controller
//! that walks the feed API one page at a time.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod routes;
