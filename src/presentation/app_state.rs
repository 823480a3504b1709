// Application state for HTTP handlers
use crate::application::engine_service::EngineHandle;
use crate::infrastructure::simulated_device::SimulatedDevice;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub device: SimulatedDevice,
    pub sync_presets: Vec<u32>,
}
