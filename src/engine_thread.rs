use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::engine::{BestSnapshot, Engine, EngineSummary};
use crate::error::EngineError;

/// host-side handle to an engine running on its own thread
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    snapshot: Arc<BestSnapshot>,
    thread: thread::JoinHandle<Result<EngineSummary, EngineError>>,
}

/// spawn background engine thread
pub fn spawn_engine(engine: Engine) -> Result<EngineHandle, EngineError> {
    profiling::scope!("spawn_engine");
    let running = engine.running_flag();
    let snapshot = engine.snapshot();
    let thread = thread::Builder::new().name("engine".to_owned()).spawn(move || {
        profiling::register_thread!("engine");
        engine.run()
    })?;
    Ok(EngineHandle { running, snapshot, thread })
}

impl EngineHandle {
    /// ask the engine to stop after the generation in flight
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> &Arc<BestSnapshot> {
        &self.snapshot
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// wait for the engine thread and hand back its result
    pub fn join(self) -> Result<EngineSummary, EngineError> {
        self.thread
            .join()
            .map_err(|_| EngineError::EngineThread("engine thread panicked".to_owned()))?
    }
}
