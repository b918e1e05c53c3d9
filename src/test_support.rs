use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    data::datasources::native_bridge::{
        BridgeError, EventSink, NativeBridge, NativeEvent, NativeEventKind,
    },
    errors::ErrorCodeTable,
};

/// Recording bridge double: canned per-method responses, a call log for
/// asserting what reached (or never reached) the native layer, and manual
/// event emission through the installed sink.
///
/// Methods without a canned response resolve to `Value::Null`, which
/// conveniently exercises the null-normalization paths.
pub(crate) struct MockBridge {
    name: &'static str,
    installed: bool,
    error_codes: ErrorCodeTable,
    responses: HashMap<String, Result<Value, BridgeError>>,
    calls: Mutex<Vec<(String, Value)>>,
    sink: Mutex<Option<EventSink>>,
}

impl MockBridge {
    pub(crate) fn new() -> Self {
        Self::named("mock")
    }

    pub(crate) fn named(name: &'static str) -> Self {
        Self {
            name,
            installed: true,
            error_codes: ErrorCodeTable::default(),
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            sink: Mutex::new(None),
        }
    }

    pub(crate) fn not_installed(mut self) -> Self {
        self.installed = false;
        self
    }

    pub(crate) fn with_error_codes(mut self, table: ErrorCodeTable) -> Self {
        self.error_codes = table;
        self
    }

    pub(crate) fn with_response(mut self, method: &str, value: Value) -> Self {
        self.responses.insert(method.to_owned(), Ok(value));
        self
    }

    pub(crate) fn with_call_error(mut self, method: &str, error: BridgeError) -> Self {
        self.responses.insert(method.to_owned(), Err(error));
        self
    }

    pub(crate) fn install(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Pushes an event through the installed sink, as the native layer
    /// would.
    pub(crate) fn emit(&self, kind: NativeEventKind, payload: Value) {
        let sink = self
            .sink
            .lock()
            .unwrap()
            .clone()
            .expect("no event sink installed");
        sink(NativeEvent { kind, payload });
    }
}

#[async_trait]
impl NativeBridge for MockBridge {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    fn error_codes(&self) -> ErrorCodeTable {
        self.error_codes.clone()
    }

    async fn call(&self, method: &str, args: Value) -> Result<Value, BridgeError> {
        self.calls.lock().unwrap().push((method.to_owned(), args));
        match self.responses.get(method) {
            Some(response) => response.clone(),
            None => Ok(Value::Null),
        }
    }

    fn set_event_sink(&self, sink: EventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }
}
