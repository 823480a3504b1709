// Application layer - Use cases, ports and the engine task
pub mod chart_reducer;
pub mod engine_service;
pub mod history_sync;
pub mod live_ingestor;
pub mod sync_engine;
pub mod transport;
