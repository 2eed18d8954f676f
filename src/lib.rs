//! Course lookup service for the CInWiki chat bot.
//!
//! A chat front-end sends a course code to the query server over a private
//! TCP link; the server fetches the course's wiki page, scrapes the infobox for
//! the course name and instructor, and answers with `"<name> - <instructor>"`.

pub mod config;
pub mod core;
pub mod error;
pub mod model;
pub mod utils;
pub mod wire;
