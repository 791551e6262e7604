pub mod tcp;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

// held as Arc<dyn Transport> by the round engine; tests substitute one that
// fails or stalls on demand
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(
        &self,
        address: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

// stop is set by the handler on a processed CLOSE
pub struct Served {
    pub reply: Vec<u8>,
    pub stop: bool,
}

pub type RequestHandler = Box<dyn FnMut(&[u8]) -> Served + Send>;
