pub mod bot;
pub mod fetcher;
pub mod html_parser;
