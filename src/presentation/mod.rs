// Presentation layer - HTTP surface for the display client
pub mod app_state;
pub mod handlers;
