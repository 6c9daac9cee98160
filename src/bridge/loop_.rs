//! Core bridge loop: poll bytes → frame → dispatch → respond.
//!
//! The loop runs one request at a time on a single thread. Every complete
//! frame produces exactly one response, in order; the only out-of-band
//! lines are the startup `ready` event and frame-overflow notifications.

use crate::bridge::transport::ByteTransport;
use crate::codec;
use crate::dispatch::Dispatcher;
use crate::error::BridgeError;
use crate::framing::{FrameBuffer, FrameEvent};
use crate::types::Event;
use anyhow::{Context, Result};
use serde_json::json;
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Run the bridge until cancellation or end-of-stream.
pub fn run_bridge(
    transport: &mut dyn ByteTransport,
    dispatcher: &mut Dispatcher,
    cancel: CancellationToken,
) -> Result<()> {
    let max_frame = dispatcher.config().max_frame_bytes;
    let mut framer = FrameBuffer::new(max_frame);
    let mut chunk = [0u8; 512];

    announce_ready(transport, dispatcher)?;
    info!(
        "bridge serving {} tools (max frame {} bytes)",
        dispatcher.registry().len(),
        max_frame
    );

    loop {
        if cancel.is_cancelled() {
            info!("bridge loop cancelled");
            return Ok(());
        }

        let n = match transport.read_chunk(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                info!("transport closed");
                return Ok(());
            }
            Err(e) => return Err(e).context("transport read failed"),
        };
        if n == 0 {
            // No frame yet; this is not an error.
            continue;
        }

        for event in framer.push_bytes(&chunk[..n]) {
            let response = match event {
                FrameEvent::Frame(frame) => {
                    debug!("frame received ({} bytes)", frame.len());
                    dispatcher.handle_frame(&frame)
                }
                FrameEvent::TooLarge { dropped } => {
                    warn!(
                        "frame exceeded {} bytes without a delimiter ({} dropped)",
                        max_frame, dropped
                    );
                    BridgeError::FrameTooLarge { max: max_frame }.into_response(None)
                }
            };
            transport
                .write_all(&codec::encode_response(&response))
                .context("transport write failed")?;
        }
    }
}

/// Emit the one-line `ready` event before serving.
fn announce_ready(transport: &mut dyn ByteTransport, dispatcher: &Dispatcher) -> Result<()> {
    let info = dispatcher.board_info();
    let event = Event {
        event: "ready".into(),
        data: json!({
            "version": info.version,
            "board": info.board,
            "tools": dispatcher.registry().list(),
        }),
    };
    transport
        .write_all(&codec::encode_event(&event))
        .context("failed to write ready event")
}
