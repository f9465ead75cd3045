//! Chat adapter facade

use crate::config::BridgeConfig;
use converse_bridge_capabilities::{
    CapabilityResolver, HttpCatalogSource, ModelProperties, TtlCache,
};
use converse_bridge_convert::{
    MessageConverter, ModelProfile, RequestValidator, build_tool_config,
    tokens::estimate_request_tokens,
};
use converse_bridge_core::{
    Error, Result,
    chat::ChatRequest,
    converse::{ConverseRequest, InferenceConfiguration},
    sink::ProgressSink,
    tool_names::ToolNameMap,
    transport::{ConverseTransport, Credentials},
};
use converse_bridge_stream::{StreamEventProcessor, StreamSummary};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Smallest thinking budget the reasoning models accept
pub const MIN_THINKING_BUDGET: u32 = 1024;

/// A request ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub request: ConverseRequest,
    /// Wire names of declared tools, for mapping tool calls back
    pub names: ToolNameMap,
    pub estimated_input_tokens: usize,
    pub input_token_limit: usize,
    pub reasoning: bool,
}

pub struct ChatAdapter {
    config: BridgeConfig,
    resolver: Arc<CapabilityResolver>,
    transport: Arc<dyn ConverseTransport>,
    validator: RequestValidator,
}

impl ChatAdapter {
    /// Create an adapter resolving capabilities from the configured HTTP catalog
    pub fn new(config: BridgeConfig, transport: Arc<dyn ConverseTransport>) -> Self {
        let source = HttpCatalogSource::new(config.catalog.url.clone(), config.catalog.timeout());
        let resolver = CapabilityResolver::new(Arc::new(source))
            .with_cache(TtlCache::with_ttl(config.catalog.ttl()))
            .with_failure_backoff(config.catalog.failure_backoff());
        Self::with_resolver(config, transport, Arc::new(resolver))
    }

    pub fn with_resolver(
        config: BridgeConfig,
        transport: Arc<dyn ConverseTransport>,
        resolver: Arc<CapabilityResolver>,
    ) -> Self {
        let validator = RequestValidator::new().with_max_tools(config.limits.max_tools);
        Self {
            config,
            resolver,
            transport,
            validator,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<CapabilityResolver> {
        &self.resolver
    }

    /// Validate and convert a request without sending it
    #[instrument(skip_all, fields(model = %request.model_id))]
    pub async fn prepare(&self, request: &ChatRequest) -> Result<PreparedRequest> {
        self.validator.validate(request)?;

        let profile = ModelProfile::for_model(&request.model_id);
        let tools = build_tool_config(&request.tools, request.tool_mode, &profile)?;
        let converted = MessageConverter::new(&profile, &tools.names).convert(&request.messages);
        if converted.messages.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation has no user or assistant content".to_string(),
            ));
        }

        let properties = self.model_properties(&request.model_id).await;
        let context_length = properties
            .context_length
            .unwrap_or(self.config.limits.default_context_length);
        let max_output = properties
            .max_output_tokens
            .unwrap_or(self.config.limits.default_max_output_tokens);
        let max_output = u32::try_from(max_output).unwrap_or(u32::MAX);

        let options = &request.options;
        let mut inference = InferenceConfiguration {
            max_tokens: Some(
                options
                    .max_tokens
                    .unwrap_or(self.config.inference.default_max_tokens)
                    .min(max_output),
            ),
            temperature: Some(
                options
                    .temperature
                    .unwrap_or(self.config.inference.default_temperature),
            ),
            top_p: options.top_p,
            stop_sequences: options.stop.clone(),
        };

        let wants_reasoning = options.reasoning.unwrap_or(self.config.reasoning.enabled);
        let mut additional_fields = None;
        if wants_reasoning
            && profile.supports_thinking_budget
            && self.model_supports_reasoning(&request.model_id).await
        {
            let max_tokens = inference.max_tokens.unwrap_or(max_output);
            match thinking_budget(self.config.reasoning.budget_tokens, max_tokens, max_output) {
                Some((budget, max_tokens)) => {
                    debug!(budget, max_tokens, "Requesting extended thinking");
                    inference.max_tokens = Some(max_tokens);
                    inference.temperature = Some(1.0);
                    inference.top_p = None;
                    additional_fields =
                        Some(json!({"thinking": {"type": "enabled", "budget_tokens": budget}}));
                }
                None => debug!(max_tokens, "Output limit too small for a thinking budget"),
            }
        }

        let reserved = u64::from(inference.max_tokens.unwrap_or_default());
        let input_token_limit =
            usize::try_from(context_length.saturating_sub(reserved)).unwrap_or(usize::MAX);

        let converse_request = ConverseRequest {
            model_id: request.model_id.clone(),
            messages: converted.messages,
            system: converted.system,
            inference_config: Some(inference),
            tool_config: tools.config,
            additional_model_request_fields: additional_fields,
        };

        let estimated = estimate_request_tokens(&converse_request);
        if estimated > input_token_limit {
            return Err(Error::TokenLimitExceeded {
                estimated,
                limit: input_token_limit,
            });
        }

        Ok(PreparedRequest {
            reasoning: converse_request.additional_model_request_fields.is_some(),
            request: converse_request,
            names: tools.names,
            estimated_input_tokens: estimated,
            input_token_limit,
        })
    }

    /// Send a request and stream the response into `sink`
    ///
    /// A fresh [`StreamEventProcessor`] is used for every call. Rejections
    /// happen before the transport is invoked.
    #[instrument(skip_all, fields(model = %request.model_id))]
    pub async fn respond(
        &self,
        request: &ChatRequest,
        credentials: &Credentials,
        sink: &mut dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<StreamSummary> {
        let prepared = self.prepare(request).await?;
        debug!(
            estimated_input_tokens = prepared.estimated_input_tokens,
            limit = prepared.input_token_limit,
            reasoning = prepared.reasoning,
            "Dispatching Converse request"
        );

        if cancel.is_cancelled() {
            return Ok(StreamSummary {
                cancelled: true,
                ..StreamSummary::default()
            });
        }

        let events = self
            .transport
            .converse_stream(prepared.request, credentials)
            .await?;

        let mut processor =
            StreamEventProcessor::new(request.model_id.clone()).with_tool_names(prepared.names);
        let summary = processor.process(events, sink, cancel).await?;

        info!(
            stop_reason = ?summary.stop_reason,
            tool_calls = summary.tool_calls,
            cancelled = summary.cancelled,
            "Converse stream finished"
        );
        Ok(summary)
    }

    async fn model_properties(&self, model_id: &str) -> ModelProperties {
        if self.config.catalog.enabled {
            self.resolver.get_properties(model_id).await
        } else {
            ModelProperties::default()
        }
    }

    async fn model_supports_reasoning(&self, model_id: &str) -> bool {
        self.config.catalog.enabled && self.resolver.supports_reasoning(model_id).await
    }
}

/// Thinking budget and the max tokens to request with it.
///
/// The budget must stay below max tokens; max tokens grow to make room, up to
/// the model's output limit. `None` when no budget of at least
/// [`MIN_THINKING_BUDGET`] fits.
fn thinking_budget(budget: u32, max_tokens: u32, max_output: u32) -> Option<(u32, u32)> {
    let budget = budget.max(MIN_THINKING_BUDGET);
    let max_tokens = if max_tokens <= budget {
        budget.saturating_add(MIN_THINKING_BUDGET).min(max_output)
    } else {
        max_tokens
    };
    let budget = budget.min(max_tokens.saturating_sub(1));
    (budget >= MIN_THINKING_BUDGET).then_some((budget, max_tokens))
}
