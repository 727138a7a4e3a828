//! # Audio Capture Seam
//!
//! Microphone capture is the only part of the voice pipeline that differs
//! per platform, so it is a trait: the controller consumes float frames
//! from whatever implementation the host wires in and never touches a
//! device itself.

use crate::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A source of captured audio frames.
///
/// Implementations push mono float frames at the negotiated sample rate
/// into the provided sink for as long as capture is active. `start` on an
/// already-active capture must be an idempotent no-op: two overlapping
/// capture graphs must never exist.
#[async_trait]
pub trait AudioCapture: Send {
    /// Acquire the device and begin pushing frames into `sink`.
    async fn start(
        &mut self,
        sample_rate: u32,
        sink: mpsc::UnboundedSender<Vec<f32>>,
    ) -> Result<(), AppError>;

    /// Release the device and stop pushing frames. Idempotent.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

/// Capture stub for headless deployments and tests: acquires nothing and
/// produces no frames, but tracks the active flag faithfully.
#[derive(Debug, Default)]
pub struct NullCapture {
    active: bool,
}

impl NullCapture {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioCapture for NullCapture {
    async fn start(
        &mut self,
        _sample_rate: u32,
        _sink: mpsc::UnboundedSender<Vec<f32>>,
    ) -> Result<(), AppError> {
        self.active = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
