use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout as tokio_timeout,
};

use super::{RequestHandler, Served, Transport};
use crate::error::TransportError;

const MAX_FRAME_LEN: u64 = 1 << 20;

// 8-byte big-endian length prefix so read_frame knows the exact byte count
// instead of relying on stream EOF
async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    stream.write_u64(payload.len() as u64).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

async fn read_frame(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let len = stream.read_u64().await?;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame length {len} exceeds the {MAX_FRAME_LEN} byte limit"),
        ));
    }
    let mut buf = vec![0; len as usize];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}

// connect, send, receive, drop the stream; never shared across calls
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    async fn send_request(
        &self,
        address: &str,
        request: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        let call = async {
            let mut stream =
                TcpStream::connect(address)
                    .await
                    .map_err(|source| TransportError::Connect {
                        address: address.to_owned(),
                        source,
                    })?;
            write_frame(&mut stream, request)
                .await
                .map_err(|source| TransportError::Io {
                    address: address.to_owned(),
                    source,
                })?;
            read_frame(&mut stream)
                .await
                .map_err(|source| TransportError::Io {
                    address: address.to_owned(),
                    source,
                })
        };
        match tokio_timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                address: address.to_owned(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

pub struct TcpBoundEndpoint {
    address: String,
    listener: Option<TcpListener>,
}

impl TcpBoundEndpoint {
    pub async fn bind(address: &str) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind(address)
                .await
                .map_err(|source| TransportError::Bind {
                    address: address.to_owned(),
                    source,
                })?;
        let resolved = listener
            .local_addr()
            .map_err(|source| TransportError::Bind {
                address: address.to_owned(),
                source,
            })?;
        Ok(Self {
            address: resolved.to_string(),
            listener: Some(listener),
        })
    }

    pub fn local_address(&self) -> &str {
        &self.address
    }

    pub async fn serve(
        &mut self,
        mut handler: RequestHandler,
        mut stop: impl std::future::Future<Output = ()> + Unpin,
    ) -> Result<(), TransportError> {
        let Some(listener) = self.listener.as_ref() else {
            return Ok(());
        };
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                _ = &mut stop => return Ok(()),
            };
            let (mut stream, _peer) = accepted.map_err(|source| TransportError::Io {
                address: self.address.clone(),
                source,
            })?;
            let request = match read_frame(&mut stream).await {
                Ok(bytes) => bytes,
                Err(_) => continue, // client disconnected mid-frame; keep serving
            };
            let served = handler(&request);
            if write_frame(&mut stream, &served.reply).await.is_err() {
                continue;
            }
            if served.stop {
                return Ok(());
            }
        }
    }

    pub async fn close(&mut self) {
        self.listener = None;
    }
}
