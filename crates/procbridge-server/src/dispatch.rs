//! Method-name-to-handler dispatch.
//!
//! A [`Dispatcher`] holds an immutable mapping from method name to handler,
//! built once at server construction. Handlers come in three shapes:
//!
//! - nullary: the payload is ignored
//! - unary: the raw payload is passed through unchanged, including null
//! - N-ary: the payload must be a JSON array of exactly N elements, which
//!   are passed positionally
//!
//! Handler failures propagate to the connection handler as a single error
//! carrying the handler's message; they are not retried.

use std::collections::HashMap;

use serde_json::Value;

use procbridge_common::{ProcBridgeError, Result};

/// What a handler produces: an optional result value, or a failure whose
/// message is reported to the client.
pub type HandlerResult = Result<Option<Value>>;

type ObserverFn = dyn Fn(Option<&str>, Option<&Value>) + Send + Sync;
type FallbackFn = dyn Fn(Option<&str>, Option<Value>) -> HandlerResult + Send + Sync;

enum Handler {
    Nullary(Box<dyn Fn() -> HandlerResult + Send + Sync>),
    Unary(Box<dyn Fn(Option<Value>) -> HandlerResult + Send + Sync>),
    Variadic {
        arity: usize,
        f: Box<dyn Fn(Vec<Value>) -> HandlerResult + Send + Sync>,
    },
}

/// The method-name-to-handler binding table used by the server.
///
/// Built with the builder methods below and treated as read-only afterwards;
/// the server shares it across connection threads without a lock.
pub struct Dispatcher {
    handlers: HashMap<String, Handler>,
    observer: Option<Box<ObserverFn>>,
    unknown_method: Box<FallbackFn>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            observer: None,
            unknown_method: Box::new(|method, _payload| {
                Err(ProcBridgeError::UnknownMethod(
                    method.unwrap_or_default().to_owned(),
                ))
            }),
        }
    }

    /// Registers a handler that takes no arguments. A payload sent along
    /// with the request is ignored.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn handle0(
        self,
        name: impl Into<String>,
        f: impl Fn() -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.insert(name.into(), Handler::Nullary(Box::new(f)))
    }

    /// Registers a handler that receives the raw payload unchanged,
    /// including an explicit null. `None` means the request carried no
    /// payload at all.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn handle1(
        self,
        name: impl Into<String>,
        f: impl Fn(Option<Value>) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.insert(name.into(), Handler::Unary(Box::new(f)))
    }

    /// Registers a handler with `arity` positional arguments. The payload
    /// must be a JSON array of exactly `arity` elements; anything else fails
    /// with [`ProcBridgeError::ArityMismatch`] before the handler runs.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already registered.
    pub fn handle_n(
        self,
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(Vec<Value>) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.insert(
            name.into(),
            Handler::Variadic {
                arity,
                f: Box::new(f),
            },
        )
    }

    /// Installs a hook observing every incoming `(method, payload)` pair
    /// before dispatch, without affecting the result.
    pub fn on_request(
        mut self,
        f: impl Fn(Option<&str>, Option<&Value>) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(f));
        self
    }

    /// Replaces the unknown-method fallback. The default fails with
    /// [`ProcBridgeError::UnknownMethod`]; a permissive server may return a
    /// default value instead.
    pub fn on_unknown_method(
        mut self,
        f: impl Fn(Option<&str>, Option<Value>) -> HandlerResult + Send + Sync + 'static,
    ) -> Self {
        self.unknown_method = Box::new(f);
        self
    }

    fn insert(mut self, name: String, handler: Handler) -> Self {
        if self.handlers.contains_key(&name) {
            panic!("duplicate handler name: {}", name);
        }
        self.handlers.insert(name, handler);
        self
    }

    /// Resolves `method` and invokes its handler against `payload`.
    pub fn invoke(&self, method: Option<&str>, payload: Option<Value>) -> HandlerResult {
        if let Some(observer) = &self.observer {
            observer(method, payload.as_ref());
        }

        tracing::debug!(?method, "dispatching request");

        let handler = method.and_then(|m| self.handlers.get(m));
        let Some(handler) = handler else {
            return (self.unknown_method)(method, payload);
        };

        match handler {
            Handler::Nullary(f) => f(),
            Handler::Unary(f) => f(payload),
            Handler::Variadic { arity, f } => match payload {
                Some(Value::Array(args)) if args.len() == *arity => f(args),
                _ => Err(ProcBridgeError::ArityMismatch { expected: *arity }),
            },
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
