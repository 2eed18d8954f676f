pub mod activity;
pub mod course;
