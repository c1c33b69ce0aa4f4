//! services/api/src/adapters/delay.rs
//!
//! Real-time implementation of the `Delay` port.

use async_trait::async_trait;
use lead_tracker_core::ports::Delay;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
