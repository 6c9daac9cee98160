//! Request dispatcher / execution engine.
//!
//! Stateless between calls except for the registry: each frame moves
//! through decode → validate → execute → respond, and every failure along
//! the way is converted into a structured error response. Nothing a
//! request does may terminate the loop or leave the transport without a
//! reply.

use crate::codec;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::hardware::Board;
use crate::registry::ToolRegistry;
use crate::tools::{self, ToolContext};
use crate::types::{BoardInfo, Request, RequestKind, Response};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::debug;

pub struct Dispatcher {
    registry: ToolRegistry,
    board: Box<dyn Board>,
    config: BridgeConfig,
    started: Instant,
}

impl Dispatcher {
    /// Build a dispatcher with the builtin tool set pre-registered.
    pub fn new(board: Box<dyn Board>, config: BridgeConfig) -> Result<Self, BridgeError> {
        let mut registry = ToolRegistry::new(config.duplicate_policy);
        tools::register_builtins(&mut registry)?;
        Ok(Self {
            registry,
            board,
            config,
            started: Instant::now(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn board_info(&self) -> BoardInfo {
        self.board.info()
    }

    /// Decode one frame and dispatch it. Always produces exactly one
    /// response; decode failures report without a correlation token since
    /// the envelope never materialized.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Response {
        match codec::decode_frame(frame) {
            Ok(request) => self.dispatch(request),
            Err(e) => {
                debug!("frame rejected before dispatch: {e}");
                e.into_response(None)
            }
        }
    }

    /// One full dispatch cycle for an already-decoded request.
    pub fn dispatch(&mut self, request: Request) -> Response {
        let id = request.id.clone();
        let outcome = match request.kind {
            RequestKind::Exec | RequestKind::Read => self.invoke_tool(&request),
            RequestKind::Register => self.handle_register(&request),
            RequestKind::Status => Ok(self.status_payload()),
        };
        match outcome {
            Ok(result) => Response::ok(result, id),
            Err(e) => {
                debug!(kind = %request.kind, "request failed: {}", e);
                e.into_response(id)
            }
        }
    }

    /// Resolve, validate, then invoke the handler exactly once.
    fn invoke_tool(&mut self, request: &Request) -> Result<Value, BridgeError> {
        let name = request
            .tool
            .as_deref()
            .ok_or(BridgeError::MissingField("tool"))?;
        let descriptor = self
            .registry
            .lookup(name)
            .ok_or_else(|| BridgeError::ToolNotFound(name.to_string()))?;
        let params = descriptor.validate(&request.params)?;
        let handler = descriptor.handler;

        let mut ctx = ToolContext {
            board: self.board.as_mut(),
            config: &self.config,
            started: self.started,
        };
        handler(&mut ctx, &params)
    }

    /// `register` carries the registration payload in `params`:
    /// `target` (an existing builtin) plus optional `defaults`.
    fn handle_register(&mut self, request: &Request) -> Result<Value, BridgeError> {
        let name = request
            .tool
            .as_deref()
            .ok_or(BridgeError::MissingField("tool"))?;
        for key in request.params.keys() {
            if key != "target" && key != "defaults" {
                return Err(BridgeError::InvalidSchema(format!(
                    "unexpected registration field: {key}"
                )));
            }
        }
        let target = request
            .params
            .get("target")
            .and_then(Value::as_str)
            .ok_or(BridgeError::MissingField("target"))?;
        let defaults = match request.params.get("defaults") {
            None => serde_json::Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => {
                return Err(BridgeError::InvalidSchema(
                    "'defaults' must be an object".into(),
                ))
            }
        };

        self.registry.register_alias(name, target, &defaults)?;
        debug!(tool = name, target, "registered alias");
        Ok(json!({"registered": name, "target": target}))
    }

    /// `status` bypasses tool lookup entirely.
    fn status_payload(&self) -> Value {
        let info = self.board.info();
        json!({
            "board": info.board,
            "version": info.version,
            "frequency": info.frequency,
            "mem_free": info.mem_free,
            "uptime_ms": self.started.elapsed().as_millis() as u64,
            "tools": self.registry.list(),
        })
    }
}
