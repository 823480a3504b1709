// Domain layer - Samples, activity states and chart data
pub mod activity;
pub mod chart;
pub mod sample;
pub mod session;
