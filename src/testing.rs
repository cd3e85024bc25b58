//! Scripted in-memory gateway for tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::gateway::provider::{GatewayError, ModelGateway};
use crate::gateway::types::{
    ChatHistoryMessage, ChatResponse, ChatRole, ModelLongData, ModelShortData, ModelsResponse,
};

fn detail_key(host: &str, name: &str) -> String {
    format!("{} {}", host, name)
}

#[derive(Default)]
struct Counters {
    started: HashMap<String, usize>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// Gateway answering from scripted responses.
///
/// Unknown hosts fail with a transport error; unknown models succeed with an
/// empty detail record. A held key blocks its fetch until the returned semaphore
/// is given a permit.
#[derive(Default)]
pub struct FakeGateway {
    lists: Mutex<HashMap<String, Result<Vec<ModelShortData>, GatewayError>>>,
    details: Mutex<HashMap<String, Result<ModelLongData, GatewayError>>>,
    replies: Mutex<VecDeque<Result<ChatResponse, GatewayError>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    chat_requests: Mutex<Vec<(String, String, Vec<ChatHistoryMessage>)>>,
    counters: Mutex<Counters>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, host: &str, names: &[&str]) -> Self {
        let models = names.iter().map(|n| ModelShortData::named(*n)).collect();
        self.lists.lock().unwrap().insert(host.to_string(), Ok(models));
        self
    }

    pub fn with_list_error(self, host: &str, error: GatewayError) -> Self {
        self.lists.lock().unwrap().insert(host.to_string(), Err(error));
        self
    }

    pub fn with_detail(self, host: &str, name: &str, detail: ModelLongData) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(detail_key(host, name), Ok(detail));
        self
    }

    pub fn with_detail_error(self, host: &str, name: &str, error: GatewayError) -> Self {
        self.details
            .lock()
            .unwrap()
            .insert(detail_key(host, name), Err(error));
        self
    }

    pub fn with_reply(self, content: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(ChatResponse {
            model: "fake".to_string(),
            created_at: String::new(),
            message: Some(ChatHistoryMessage::new(ChatRole::Assistant, content)),
            done: true,
            total_duration: None,
            load_duration: None,
            prompt_eval_count: None,
            prompt_eval_duration: None,
            eval_count: None,
            eval_duration: None,
        }));
        self
    }

    pub fn with_raw_reply(self, reply: Result<ChatResponse, GatewayError>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    /// Replace a host's list after construction (simulates the server changing)
    pub fn set_list(&self, host: &str, names: &[&str]) {
        let models = names.iter().map(|n| ModelShortData::named(*n)).collect();
        self.lists.lock().unwrap().insert(host.to_string(), Ok(models));
    }

    fn hold(&self, key: String) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(key, gate.clone());
        gate
    }

    /// Block list fetches for `host` until the gate gets permits
    pub fn hold_list(&self, host: &str) -> Arc<Semaphore> {
        self.hold(host.to_string())
    }

    /// Block the detail fetch of `name` on `host` until the gate gets permits
    pub fn hold_detail(&self, host: &str, name: &str) -> Arc<Semaphore> {
        self.hold(detail_key(host, name))
    }

    pub fn list_calls(&self, host: &str) -> usize {
        self.started(host)
    }

    pub fn detail_calls(&self, host: &str, name: &str) -> usize {
        self.started(&detail_key(host, name))
    }

    pub fn total_calls(&self) -> usize {
        self.counters.lock().unwrap().started.values().sum()
    }

    /// Highest number of concurrent fetches seen for any single key
    pub fn max_concurrent_per_key(&self) -> usize {
        self.counters
            .lock()
            .unwrap()
            .max_in_flight
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    pub fn chat_requests(&self) -> Vec<(String, String, Vec<ChatHistoryMessage>)> {
        self.chat_requests.lock().unwrap().clone()
    }

    fn started(&self, key: &str) -> usize {
        self.counters
            .lock()
            .unwrap()
            .started
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    async fn enter(&self, key: &str) {
        {
            let mut counters = self.counters.lock().unwrap();
            *counters.started.entry(key.to_string()).or_default() += 1;
            let in_flight = counters.in_flight.entry(key.to_string()).or_default();
            *in_flight += 1;
            let now = *in_flight;
            let max = counters.max_in_flight.entry(key.to_string()).or_default();
            *max = (*max).max(now);
        }

        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    fn exit(&self, key: &str) {
        let mut counters = self.counters.lock().unwrap();
        if let Some(in_flight) = counters.in_flight.get_mut(key) {
            *in_flight -= 1;
        }
    }
}

#[async_trait]
impl ModelGateway for FakeGateway {
    async fn fetch_model_list(&self, host: &str) -> Result<ModelsResponse, GatewayError> {
        self.enter(host).await;
        let result = self
            .lists
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Transport("connection refused".into())))
            .map(|models| ModelsResponse { models });
        self.exit(host);
        result
    }

    async fn fetch_model_detail(
        &self,
        host: &str,
        name: &str,
    ) -> Result<ModelLongData, GatewayError> {
        let key = detail_key(host, name);
        self.enter(&key).await;
        let result = self
            .details
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Ok(ModelLongData {
                    capabilities: vec!["completion".to_string()],
                    ..Default::default()
                })
            });
        self.exit(&key);
        result
    }

    async fn fetch_chat_completion(
        &self,
        host: &str,
        model: &str,
        messages: &[ChatHistoryMessage],
    ) -> Result<ChatResponse, GatewayError> {
        self.chat_requests.lock().unwrap().push((
            host.to_string(),
            model.to_string(),
            messages.to_vec(),
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Transport("no scripted reply".into())))
    }
}
