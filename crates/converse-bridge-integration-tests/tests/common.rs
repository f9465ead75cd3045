//! Common test utilities for integration tests

use async_trait::async_trait;
use converse_bridge::{BridgeConfig, ChatAdapter};
use converse_bridge_core::{
    Error, Result,
    converse::{ConverseRequest, ConverseStreamEvent},
    transport::{ConverseEventStream, ConverseTransport, Credentials},
};
use futures::{StreamExt, stream};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLAUDE: &str = "us.anthropic.claude-3-7-sonnet-20250219-v1:0";
pub const CATALOG_PATH: &str = "/api/v1/models";

/// One scripted response from the transport
#[allow(dead_code)]
pub enum Script {
    /// Events followed by end of stream
    Events(Vec<Result<ConverseStreamEvent>>),
    /// Events, then a stream that never yields again
    Stall(Vec<ConverseStreamEvent>),
    /// `converse_stream` itself fails
    Fail(String),
}

/// Transport replaying scripted responses in order and recording every request
#[derive(Default)]
#[allow(dead_code)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    sent: Mutex<Vec<ConverseRequest>>,
}

#[allow(dead_code)]
impl ScriptedTransport {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn events(events: Vec<ConverseStreamEvent>) -> Self {
        Self::new(vec![Script::Events(events.into_iter().map(Ok).collect())])
    }

    pub fn sent(&self) -> Vec<ConverseRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConverseTransport for ScriptedTransport {
    async fn converse_stream(
        &self,
        request: ConverseRequest,
        _credentials: &Credentials,
    ) -> Result<ConverseEventStream> {
        self.sent.lock().unwrap().push(request);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted response left".to_string()))?;

        match script {
            Script::Events(events) => Ok(Box::pin(stream::iter(events))),
            Script::Stall(events) => Ok(Box::pin(
                stream::iter(events.into_iter().map(Ok)).chain(stream::pending()),
            )),
            Script::Fail(message) => Err(Error::Transport(message)),
        }
    }
}

/// Mock catalog server listing a few models, expecting `fetches` requests
#[allow(dead_code)]
pub async fn catalog_server(fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CATALOG_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "anthropic/claude-3.7-sonnet",
                    "context_length": 200000,
                    "top_provider": {"max_completion_tokens": 64000},
                    "supported_parameters": ["tools", "reasoning", "include_reasoning"]
                },
                {
                    "id": "meta-llama/llama3-2-1b",
                    "context_length": 6000,
                    "top_provider": {"max_completion_tokens": 1000},
                    "supported_parameters": ["tools"]
                }
            ]
        })))
        .expect(fetches)
        .mount(&server)
        .await;
    server
}

#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.catalog.url = format!("{}{}", server.uri(), CATALOG_PATH);
    config
}

#[allow(dead_code)]
pub fn adapter(config: BridgeConfig, transport: Arc<ScriptedTransport>) -> ChatAdapter {
    ChatAdapter::new(config, transport)
}

#[allow(dead_code)]
pub fn credentials() -> Credentials {
    Credentials::bearer("us-east-1", "test-token")
}

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
