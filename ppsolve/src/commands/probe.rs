use super::EngineLib;
use crate::EngineConfig;

/// Check an engine and describe the outcome. The flag becomes the exit code.
pub fn probe(lib: EngineLib, engine: &EngineConfig) -> (bool, String) {
    let available = lib.is_available(engine);
    let name = format!("{lib:?}").to_lowercase();
    let message = if available {
        format!("{name}: available")
    } else {
        format!("{name}: unavailable")
    };
    (available, message)
}
