// Client-side sync engine for the activity recorder
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
