//! Nullable node transport — scripted JSON-RPC replies.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use peerwarden_rpc::{RpcError, RpcResponse, Transport};

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Clone, Debug)]
enum Reply {
    Result(Value),
    Error { code: i64, message: String },
    Transport,
}

#[derive(Default)]
struct State {
    queued: HashMap<String, VecDeque<Reply>>,
    standing: HashMap<String, Reply>,
    calls: Vec<(String, Value)>,
}

/// A node that answers from a script.
///
/// One-shot replies queued with [`respond`](Self::respond) and friends are
/// used first, in order; after that the standing reply set with
/// [`respond_always`](Self::respond_always) applies. Unscripted methods get
/// a "method not found" error reply.
#[derive(Clone, Default)]
pub struct NullTransport {
    state: Arc<Mutex<State>>,
}

impl NullTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot successful result for `method`.
    pub fn respond(&self, method: &str, result: Value) {
        self.enqueue(method, Reply::Result(result));
    }

    /// Answer every otherwise unscripted call to `method` with `result`.
    pub fn respond_always(&self, method: &str, result: Value) {
        self.state
            .lock()
            .unwrap()
            .standing
            .insert(method.to_string(), Reply::Result(result));
    }

    /// Queue a one-shot error reply for `method`.
    pub fn fail(&self, method: &str, code: i64, message: &str) {
        self.enqueue(
            method,
            Reply::Error {
                code,
                message: message.to_string(),
            },
        );
    }

    /// Queue a one-shot broken connection for `method`.
    pub fn fail_transport(&self, method: &str) {
        self.enqueue(method, Reply::Transport);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Params of every call to `method`, in order.
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn enqueue(&self, method: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, method: &str, params: Value) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((method.to_string(), params));
        if let Some(reply) = state.queued.get_mut(method).and_then(VecDeque::pop_front) {
            return Some(reply);
        }
        state.standing.get(method).cloned()
    }
}

#[async_trait]
impl Transport for NullTransport {
    async fn call(&mut self, method: &str, params: Value) -> Result<RpcResponse, RpcError> {
        let id = self.state.lock().unwrap().calls.len() as u64;
        match self.next_reply(method, params) {
            Some(Reply::Result(result)) => Ok(RpcResponse::success(id, result)),
            Some(Reply::Error { code, message }) => Ok(RpcResponse::failure(id, code, message)),
            Some(Reply::Transport) => Err(RpcError::ConnectionClosed),
            None => Ok(RpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("the method {method} does not exist/is not available"),
            )),
        }
    }
}
