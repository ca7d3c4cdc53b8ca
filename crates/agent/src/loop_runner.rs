//! The tool-calling orchestration loop.

use chrono::Utc;
use medibook_config::AppConfig;
use medibook_core::agent::{AgentResponse, OrchestrationState, DEFAULT_MAX_ITERATIONS};
use medibook_core::event::{DomainEvent, EventBus};
use medibook_core::message::Message;
use medibook_core::provider::Provider;
use medibook_core::tool::{ToolCall, ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::interpreter::ResponseInterpreter;
use crate::sanitizer::sanitize;

/// Reply when the agent produced nothing usable.
pub const COULD_NOT_PROCESS: &str = "Xin lỗi, tôi không thể xử lý yêu cầu này lúc này.";

/// Reply when the round-trip bound is hit without an answer.
pub const TOO_MANY_STEPS: &str =
    "Xin lỗi, yêu cầu này cần quá nhiều bước xử lý. Bạn vui lòng hỏi cụ thể hơn nhé.";

/// The core agent loop that orchestrates agent calls and tool execution.
pub struct AgentLoop {
    /// Calls the agent service and interprets its output
    interpreter: ResponseInterpreter,

    /// Tool dispatcher
    tools: Arc<ToolRegistry>,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Maximum tool round-trips per inbound message
    max_iterations: u32,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        context: ContextBuilder,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            interpreter: ResponseInterpreter::new(provider, context, event_bus.clone()),
            tools,
            event_bus,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Wire a loop from the application config.
    ///
    /// Tools are either advertised in the request's `tools` field or, when
    /// that is off, described in the system instruction.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        event_bus: Arc<EventBus>,
        config: &AppConfig,
    ) -> Self {
        let mut context = ContextBuilder::from_config(&config.bot.display_name, &config.orchestration);
        if !config.agent.advertise_tools {
            context = context.with_tools(tools.definitions());
        }

        let mut agent = Self::new(provider, context, tools.clone(), event_bus)
            .with_max_iterations(config.orchestration.max_iterations)
            .with_model(config.agent.model.clone())
            .with_temperature(config.agent.temperature)
            .with_max_tokens(config.agent.max_tokens);
        if config.agent.advertise_tools {
            agent.interpreter = agent.interpreter.with_tools(tools.definitions());
        }
        agent
    }

    /// Set the maximum number of tool round-trips.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.interpreter = self.interpreter.with_model(model);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.interpreter = self.interpreter.with_temperature(temperature);
        self
    }

    /// Set the max tokens per agent response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.interpreter = self.interpreter.with_max_tokens(max);
        self
    }

    /// Produce the reply to the last user turn of `history`.
    ///
    /// Always returns text: service failures, unknown tools and runaway
    /// tool chains all end in a user-facing message.
    pub async fn process_message(&self, history: Vec<Message>) -> String {
        info!(messages = history.len(), "Processing message");

        let mut state = OrchestrationState::new(history, self.max_iterations);
        let mut response = self.interpreter.interpret(&state.history).await;

        loop {
            if !response.has_tool_calls() {
                return self.finish(&response.content, COULD_NOT_PROCESS);
            }

            if state.is_exhausted() {
                warn!(iterations = state.iteration, "Max tool iterations reached");
                return self.finish(&response.content, TOO_MANY_STEPS);
            }

            debug!(
                iteration = state.iteration,
                tool_count = response.tool_calls.len(),
                "Executing tool calls"
            );
            let results = self.execute_batch(&response.tool_calls).await;

            if let Some(reply) = short_circuit(&results) {
                debug!("Tool result answered the user directly");
                return self.finish(&reply, COULD_NOT_PROCESS);
            }

            let AgentResponse { content, tool_calls } = response;
            state = state.extend([
                Message::assistant_tool_calls(content, tool_calls),
                Message::user(summarize_results(&results)),
            ]);
            response = self.interpreter.interpret(&state.history).await;

            if response.has_content() {
                return self.finish(&response.content, COULD_NOT_PROCESS);
            }
            if !response.has_tool_calls() {
                return COULD_NOT_PROCESS.to_string();
            }
            state = state.next_iteration();
        }
    }

    /// Run a batch in order, one call at a time.
    async fn execute_batch(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let started = Instant::now();
            let result = self.tools.dispatch(call).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            debug!(tool = %call.name, duration_ms, success = !result.is_error(), "Tool finished");
            self.event_bus.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                success: !result.is_error(),
                duration_ms,
                timestamp: Utc::now(),
            });
            results.push(result);
        }
        results
    }

    /// Sanitize a terminal reply, reporting stripped reasoning.
    fn finish(&self, text: &str, fallback: &str) -> String {
        let sanitized = sanitize(text);
        for reasoning in sanitized.reasoning {
            debug!(reasoning = %reasoning, "Stripped reasoning from reply");
            self.event_bus.publish(DomainEvent::ReasoningCaptured {
                reasoning,
                timestamp: Utc::now(),
            });
        }
        if sanitized.text.is_empty() {
            fallback.to_string()
        } else {
            sanitized.text
        }
    }
}

/// A reply taken straight from tool output: disambiguation first, then a
/// ready-made `formattedMessage`.
pub fn short_circuit(results: &[ToolResult]) -> Option<String> {
    if let Some((message, question)) = results.iter().find_map(ToolResult::disambiguation) {
        return Some(format!("{message} {question}"));
    }
    results
        .iter()
        .find_map(ToolResult::formatted_message)
        .map(str::to_string)
}

/// The synthetic user turn reporting a batch back to the agent.
pub fn summarize_results(results: &[ToolResult]) -> String {
    results
        .iter()
        .map(|result| match result.formatted_message() {
            Some(formatted) => format!(
                "Tool: {}\nKết quả đã được định dạng sẵn. Hãy dùng nguyên văn nội dung sau, không định dạng lại:\n{}",
                result.tool, formatted
            ),
            None => format!("Tool: {}\nResult: {}", result.tool, result.output),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::AGENT_UNREACHABLE;
    use crate::test_helpers::{CountingTool, SequentialMockProvider, tool_call_response};
    use medibook_core::error::ProviderError;
    use medibook_core::message::Role;
    use medibook_core::provider::ProviderResponse;
    use medibook_core::tool::{ToolName, STATUS_DISAMBIGUATION};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn agent(provider: Arc<SequentialMockProvider>, tools: ToolRegistry) -> (AgentLoop, Arc<EventBus>) {
        let bus = Arc::new(EventBus::default());
        let agent = AgentLoop::new(
            provider,
            ContextBuilder::new("MediBook"),
            Arc::new(tools),
            bus.clone(),
        );
        (agent, bus)
    }

    fn ask(text: &str) -> Vec<Message> {
        vec![Message::user(text)]
    }

    fn disambiguation(message: &str, question: &str) -> serde_json::Value {
        json!({"status": STATUS_DISAMBIGUATION, "message": message, "question": question})
    }

    #[tokio::test]
    async fn text_reply_is_sanitized() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "<think>greet back</think>\n```\nXin chào! Tôi có thể giúp gì?\n```",
        ]));
        let (agent, bus) = agent(provider.clone(), ToolRegistry::new());
        let mut events = bus.subscribe();

        let reply = agent.process_message(ask("chào")).await;
        assert_eq!(reply, "Xin chào! Tôi có thể giúp gì?");
        assert_eq!(provider.call_count(), 1);
        match &*events.try_recv().unwrap() {
            DomainEvent::ReasoningCaptured { reasoning, .. } => assert_eq!(reasoning, "greet back"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_first_response_apologizes() {
        let provider = Arc::new(SequentialMockProvider::texts(&[""]));
        let tool = CountingTool::returning(ToolName::SearchClinics, json!({}));
        let tool_calls = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, _) = agent(provider.clone(), tools);

        let reply = agent.process_message(ask("???")).await;
        assert_eq!(reply, COULD_NOT_PROCESS);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(tool_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reasoning_only_reply_apologizes() {
        let provider = Arc::new(SequentialMockProvider::texts(&["<think>hmm</think>  "]));
        let (agent, _) = agent(provider, ToolRegistry::new());
        assert_eq!(agent.process_message(ask("?")).await, COULD_NOT_PROCESS);
    }

    #[tokio::test]
    async fn reasoning_only_follow_up_ends_the_loop() {
        let follow_up = ProviderResponse::with_tool_calls(
            "<think>search again</think>",
            json!([{"id": "c2", "name": "search_clinics", "parameters": {"location": "Quận 1"}}]),
        );
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "search_clinics", json!({"location": "Quận 3"}))),
            Ok(follow_up),
        ]));
        let tool = CountingTool::returning(ToolName::SearchClinics, json!({"count": 0, "clinics": []}));
        let tool_calls = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, bus) = agent(provider.clone(), tools);
        let mut events = bus.subscribe();

        assert_eq!(agent.process_message(ask("phòng khám")).await, COULD_NOT_PROCESS);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(tool_calls.load(Ordering::SeqCst), 1);

        let mut captured = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ReasoningCaptured { reasoning, .. } = &*event {
                captured.push(reasoning.clone());
            }
        }
        assert_eq!(captured, vec!["search again".to_string()]);
    }

    #[tokio::test]
    async fn disambiguation_returns_without_another_call() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(tool_call_response(
            "call_1",
            "search_doctors",
            json!({"doctorName": "Canh"}),
        ))]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(
            ToolName::SearchDoctors,
            disambiguation("Tôi tìm thấy BS. Canh.", "Bạn có muốn xem lịch?"),
        )));
        let (agent, _) = agent(provider.clone(), tools);

        let reply = agent.process_message(ask("Tôi muốn khám với BS Cảnh")).await;
        assert_eq!(reply, "Tôi tìm thấy BS. Canh. Bạn có muốn xem lịch?");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn disambiguation_beats_formatted_message() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(
            ProviderResponse::with_tool_calls(
                "",
                json!([
                    {"id": "c1", "name": "find_available_doctors", "parameters": {"date": "20/10/2025"}},
                    {"id": "c2", "name": "search_doctors", "parameters": {"doctorName": "Minh"}}
                ]),
            ),
        )]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(
            ToolName::FindAvailableDoctors,
            json!({"formattedMessage": "F"}),
        )));
        tools.register(Box::new(CountingTool::returning(
            ToolName::SearchDoctors,
            disambiguation("M", "Q"),
        )));
        let (agent, _) = agent(provider, tools);

        assert_eq!(agent.process_message(ask("lịch")).await, "M Q");
    }

    #[tokio::test]
    async fn formatted_message_is_returned_verbatim() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(tool_call_response(
            "c1",
            "check_doctor_schedule",
            json!({"doctorName": "Lan", "date": "22/10/2025"}),
        ))]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(
            ToolName::CheckDoctorSchedule,
            json!({"formattedMessage": "Lịch trống:\n- 08:00", "slots": ["08:00"]}),
        )));
        let (agent, _) = agent(provider.clone(), tools);

        assert_eq!(agent.process_message(ask("lịch BS Lan")).await, "Lịch trống:\n- 08:00");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_error_is_fed_back() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "foo_bar", json!({}))),
            Ok(ProviderResponse::text("Xin lỗi, tôi không tra cứu được.")),
        ]));
        let (agent, bus) = agent(provider.clone(), ToolRegistry::new());
        let mut events = bus.subscribe();

        let reply = agent.process_message(ask("foo")).await;
        assert_eq!(reply, "Xin lỗi, tôi không tra cứu được.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let second = &requests[1].messages;
        // system, user, assistant(tool calls), user(results)
        assert_eq!(second.len(), 4);
        assert_eq!(second[2].role, Role::Assistant);
        assert_eq!(second[2].tool_calls[0].name, "foo_bar");
        assert_eq!(second[3].role, Role::User);
        assert_eq!(
            second[3].content,
            r#"Tool: foo_bar
Result: {"error":"Unknown tool: foo_bar"}"#
        );

        match &*events.try_recv().unwrap() {
            DomainEvent::ToolExecuted { tool_name, success, .. } => {
                assert_eq!(tool_name, "foo_bar");
                assert!(!success);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_tool_does_not_stop_the_batch() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(ProviderResponse::with_tool_calls(
                "",
                json!([
                    {"id": "c1", "name": "search_clinics", "parameters": {}},
                    {"id": "c2", "name": "search_services", "parameters": {}}
                ]),
            )),
            Ok(ProviderResponse::text("Có 2 dịch vụ.")),
        ]));
        let services = CountingTool::returning(ToolName::SearchServices, json!({"count": 2}));
        let service_calls = services.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::failing(ToolName::SearchClinics, "directory offline")));
        tools.register(Box::new(services));
        let (agent, _) = agent(provider.clone(), tools);

        assert_eq!(agent.process_message(ask("dịch vụ")).await, "Có 2 dịch vụ.");
        assert_eq!(service_calls.load(Ordering::SeqCst), 1);

        let summary = &provider.requests()[1].messages[3].content;
        assert!(summary.contains("directory offline"));
        assert!(summary.contains(r#"Tool: search_services
Result: {"count":2}"#));
    }

    #[tokio::test]
    async fn round_trips_are_bounded() {
        let responses = (0..6)
            .map(|i| Ok(tool_call_response(&format!("c{i}"), "search_clinics", json!({}))))
            .collect();
        let provider = Arc::new(SequentialMockProvider::new(responses));
        let tool = CountingTool::returning(ToolName::SearchClinics, json!({"clinics": []}));
        let executions = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, _) = agent(provider.clone(), tools);

        let reply = agent.process_message(ask("loop")).await;
        assert_eq!(reply, TOO_MANY_STEPS);
        assert_eq!(executions.load(Ordering::SeqCst), DEFAULT_MAX_ITERATIONS as usize);
        assert_eq!(provider.call_count(), DEFAULT_MAX_ITERATIONS as usize + 1);
    }

    #[tokio::test]
    async fn custom_bound_is_respected() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "search_clinics", json!({}))),
            Ok(tool_call_response("c2", "search_clinics", json!({}))),
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(ToolName::SearchClinics, json!({}))));
        let (agent, _) = agent(provider.clone(), tools);
        let agent = agent.with_max_iterations(1);

        assert_eq!(agent.process_message(ask("x")).await, TOO_MANY_STEPS);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn exhausted_with_content_returns_content() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(
            ProviderResponse::with_tool_calls(
                "Để tôi kiểm tra.",
                json!([{"id": "c1", "name": "search_clinics", "parameters": {}}]),
            ),
        )]));
        let tool = CountingTool::returning(ToolName::SearchClinics, json!({}));
        let executions = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, _) = agent(provider, tools);
        let agent = agent.with_max_iterations(0);

        assert_eq!(agent.process_message(ask("x")).await, "Để tôi kiểm tra.");
        assert_eq!(executions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn content_wins_over_further_tool_calls() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "search_clinics", json!({"location": "Quận 1"}))),
            Ok(ProviderResponse::with_tool_calls(
                "Có 1 phòng khám ở Quận 1.",
                json!([{"id": "c2", "name": "search_services", "parameters": {}}]),
            )),
        ]));
        let tool = CountingTool::returning(ToolName::SearchClinics, json!({"count": 1}));
        let executions = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, _) = agent(provider.clone(), tools);

        assert_eq!(agent.process_message(ask("Quận 1")).await, "Có 1 phòng khám ở Quận 1.");
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn empty_after_tools_apologizes() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "search_clinics", json!({}))),
            Ok(ProviderResponse::text("   ")),
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(ToolName::SearchClinics, json!({}))));
        let (agent, _) = agent(provider, tools);

        assert_eq!(agent.process_message(ask("x")).await, COULD_NOT_PROCESS);
    }

    #[tokio::test]
    async fn service_failure_still_yields_text() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(ProviderError::Timeout(
            "60s".into(),
        ))]));
        let (agent, _) = agent(provider, ToolRegistry::new());
        assert_eq!(agent.process_message(ask("hi")).await, AGENT_UNREACHABLE);
    }

    #[tokio::test]
    async fn failure_mid_chain_yields_fallback_text() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(tool_call_response("c1", "search_clinics", json!({}))),
            Err(ProviderError::Unavailable { status_code: 502 }),
        ]));
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(CountingTool::returning(ToolName::SearchClinics, json!({}))));
        let (agent, _) = agent(provider, tools);

        assert_eq!(
            agent.process_message(ask("x")).await,
            crate::interpreter::AGENT_OVERLOADED
        );
    }

    #[tokio::test]
    async fn healed_call_is_dispatched() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"```json
{"name": "search_doctors", "parameters": {"doctorName": "Canh"}}
```"#,
        ]));
        let tool = CountingTool::returning(ToolName::SearchDoctors, disambiguation("A.", "B?"));
        let executions = tool.counter();
        let mut tools = ToolRegistry::new();
        tools.register(Box::new(tool));
        let (agent, _) = agent(provider, tools);

        assert_eq!(agent.process_message(ask("BS Cảnh")).await, "A. B?");
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_asks_to_reuse_formatted_output() {
        let call = ToolCall::new("c1", "check_doctor_schedule", Default::default());
        let results = vec![
            ToolResult::new(&call, json!({"formattedMessage": "Lịch trống: 08:00"})),
            ToolResult::new(&ToolCall::new("c2", "search_clinics", Default::default()), json!({"count": 0})),
        ];
        let summary = summarize_results(&results);
        let parts: Vec<&str> = summary.split("\n\n").collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("Tool: check_doctor_schedule\n"));
        assert!(parts[0].ends_with("\nLịch trống: 08:00"));
        assert_eq!(parts[1], "Tool: search_clinics\nResult: {\"count\":0}");
    }

    #[test]
    fn short_circuit_ignores_plain_results() {
        let call = ToolCall::new("c1", "search_clinics", Default::default());
        assert!(short_circuit(&[ToolResult::new(&call, json!({"clinics": []}))]).is_none());
        assert!(short_circuit(&[]).is_none());
    }
}
