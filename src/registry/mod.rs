//! Tool registry: name → descriptor (parameter schema + handler).
//!
//! Built-in tools are registered once at startup; the `register` request
//! kind can add aliases at runtime. Names are unique at every point in
//! time and `list()` preserves insertion order so introspection output is
//! deterministic.

use crate::error::BridgeError;
use crate::hardware::HardwareError;
use crate::tools::ToolContext;
use crate::types::ParamSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// What happens when `register` names an existing tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Second registration fails with `DuplicateTool` (the default —
    /// descriptors are never silently overwritten).
    #[default]
    Reject,
    /// Second registration replaces the handler, keeping the original
    /// position in the tool list.
    Replace,
}

/// Handler function backing a tool. Invoked exactly once per dispatch,
/// only after parameter validation has passed.
pub type HandlerFn = fn(&mut ToolContext<'_>, &Params) -> Result<Value, BridgeError>;

/// Where a descriptor came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOrigin {
    Builtin,
    /// Registered at runtime as an alias over a builtin.
    Alias { target: String },
}

/// One registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub params: Vec<ParamSpec>,
    pub handler: HandlerFn,
    pub origin: ToolOrigin,
}

impl ToolDescriptor {
    pub fn builtin(name: &str, params: Vec<ParamSpec>, handler: HandlerFn) -> Self {
        Self {
            name: name.into(),
            params,
            handler,
            origin: ToolOrigin::Builtin,
        }
    }

    /// Validate supplied parameters against this schema and fold in
    /// defaults. Handlers never observe invalid input.
    pub fn validate(
        &self,
        supplied: &serde_json::Map<String, Value>,
    ) -> Result<Params, BridgeError> {
        // Unknown names are rejected outright to catch silent typos.
        for name in supplied.keys() {
            if !self.params.iter().any(|p| &p.name == name) {
                return Err(BridgeError::InvalidParams(format!(
                    "unexpected parameter: {name}"
                )));
            }
        }

        let mut resolved = serde_json::Map::new();
        for spec in &self.params {
            match supplied.get(&spec.name) {
                Some(value) => {
                    if !spec.ty.matches(value) {
                        return Err(BridgeError::InvalidParams(format!(
                            "parameter '{}' expects {}",
                            spec.name, spec.ty
                        )));
                    }
                    resolved.insert(spec.name.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(BridgeError::InvalidParams(format!(
                        "missing required parameter: {}",
                        spec.name
                    )));
                }
                None => {
                    if let Some(default) = &spec.default {
                        resolved.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }
        Ok(Params(resolved))
    }
}

// ---------------------------------------------------------------------------
// Validated parameters
// ---------------------------------------------------------------------------

/// Parameter map after schema validation; the only view handlers get.
/// Typed accessors narrow JSON numbers and surface `OutOfRange` for
/// values the wire type admits but the hardware does not.
#[derive(Debug, Clone)]
pub struct Params(serde_json::Map<String, Value>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn i64_value(&self, name: &'static str) -> Result<i64, BridgeError> {
        self.get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| BridgeError::InvalidParams(format!("missing parameter: {name}")))
    }

    pub fn u8_value(&self, name: &'static str) -> Result<u8, BridgeError> {
        let v = self.i64_value(name)?;
        u8::try_from(v).map_err(|_| {
            BridgeError::Hardware(HardwareError::OutOfRange {
                what: name,
                value: v,
                max: u8::MAX as i64,
            })
        })
    }

    pub fn u32_value(&self, name: &'static str) -> Result<u32, BridgeError> {
        let v = self.i64_value(name)?;
        u32::try_from(v).map_err(|_| {
            BridgeError::Hardware(HardwareError::OutOfRange {
                what: name,
                value: v,
                max: u32::MAX as i64,
            })
        })
    }

    pub fn usize_value(&self, name: &'static str) -> Result<usize, BridgeError> {
        let v = self.i64_value(name)?;
        usize::try_from(v).map_err(|_| {
            BridgeError::Hardware(HardwareError::OutOfRange {
                what: name,
                value: v,
                max: i64::MAX,
            })
        })
    }

    pub fn f64_value(&self, name: &'static str) -> Result<f64, BridgeError> {
        self.get(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| BridgeError::InvalidParams(format!("missing parameter: {name}")))
    }

    pub fn str_value(&self, name: &'static str) -> Result<&str, BridgeError> {
        self.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| BridgeError::InvalidParams(format!("missing parameter: {name}")))
    }

    pub fn bytes_value(&self, name: &'static str) -> Result<Vec<u8>, BridgeError> {
        let items = self
            .get(name)
            .and_then(Value::as_array)
            .ok_or_else(|| BridgeError::InvalidParams(format!("missing parameter: {name}")))?;
        // Schema validation already bounded every element to 0..=255.
        Ok(items
            .iter()
            .filter_map(Value::as_u64)
            .map(|b| b as u8)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Process-wide tool table. Single-owner; mutated only at startup and by
/// explicit `register` requests on the dispatch thread.
pub struct ToolRegistry {
    tools: HashMap<String, ToolDescriptor>,
    order: Vec<String>,
    policy: DuplicatePolicy,
}

impl ToolRegistry {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
            policy,
        }
    }

    /// Insert a descriptor, honoring the duplicate policy.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), BridgeError> {
        if self.tools.contains_key(&descriptor.name) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(BridgeError::DuplicateTool(descriptor.name));
                }
                DuplicatePolicy::Replace => {
                    // Order slot stays where it was.
                    self.tools.insert(descriptor.name.clone(), descriptor);
                    return Ok(());
                }
            }
        }
        self.order.push(descriptor.name.clone());
        self.tools.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Register an alias of an existing builtin with preset defaults.
    ///
    /// The alias takes the target's schema with every preset parameter
    /// made optional. Executable code cannot cross the wire, so this is
    /// the whole extent of dynamic registration.
    pub fn register_alias(
        &mut self,
        name: &str,
        target: &str,
        defaults: &serde_json::Map<String, Value>,
    ) -> Result<(), BridgeError> {
        let target_desc = self
            .lookup(target)
            .ok_or_else(|| BridgeError::InvalidSchema(format!("unknown target tool: {target}")))?;
        if target_desc.origin != ToolOrigin::Builtin {
            return Err(BridgeError::InvalidSchema(format!(
                "target '{target}' is itself an alias"
            )));
        }

        let mut params = target_desc.params.clone();
        let handler = target_desc.handler;
        for (key, value) in defaults {
            let spec = params
                .iter_mut()
                .find(|p| &p.name == key)
                .ok_or_else(|| {
                    BridgeError::InvalidSchema(format!(
                        "default '{key}' is not a parameter of '{target}'"
                    ))
                })?;
            if !spec.ty.matches(value) {
                return Err(BridgeError::InvalidSchema(format!(
                    "default '{}' expects {}",
                    key, spec.ty
                )));
            }
            spec.required = false;
            spec.default = Some(value.clone());
        }

        self.register(ToolDescriptor {
            name: name.into(),
            params,
            handler,
            origin: ToolOrigin::Alias {
                target: target.into(),
            },
        })
    }

    /// Pure lookup; yields exactly one descriptor or nothing.
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    /// Registered names in insertion order.
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
