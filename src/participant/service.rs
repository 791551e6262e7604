use std::{future::Future, sync::Arc};

use tracing::{error, info};

use super::handler::{Handler, Outcome};
use crate::{
    codec,
    error::TransportError,
    transport::{tcp::TcpBoundEndpoint, RequestHandler, Served},
};

pub struct Participant {
    endpoint: TcpBoundEndpoint,
    handler: Arc<Handler>,
}

impl Participant {
    pub async fn bind(
        address: &str,
        handler: Handler,
    ) -> Result<Self, TransportError> {
        let endpoint = TcpBoundEndpoint::bind(address).await?;
        Ok(Self {
            endpoint,
            handler: Arc::new(handler),
        })
    }

    pub fn local_address(&self) -> &str {
        self.endpoint.local_address()
    }

    pub async fn serve(&mut self, stop: impl Future<Output = ()> + Unpin) -> Result<(), TransportError> {
        let handler = self.handler.clone();
        let request_handler: RequestHandler = Box::new(move |bytes: &[u8]| {
            match codec::decode_request(bytes) {
                Ok(request) => {
                    let (reply, outcome) = handler.handle(request);
                    Served {
                        reply: codec::encode_reply(&reply),
                        stop: matches!(outcome, Outcome::Stop),
                    }
                }
                Err(err) => Served {
                    reply: codec::encode_reply(&handler.handle_decode_failure(err)),
                    stop: false,
                },
            }
        });
        let result = self.endpoint.serve(request_handler, stop).await;
        if let Err(err) = &result {
            error!(%err, "participant service loop ended with a transport error");
        } else {
            info!("participant service loop stopped cleanly");
        }
        result
    }

    pub async fn close(&mut self) {
        self.endpoint.close().await;
    }
}
