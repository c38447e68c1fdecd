//! Turn orchestration loop.
//!
//! One call to [`TurnOrchestrator::run`] drives a conversational request
//! through as many model turns as it needs and yields events as it goes. The
//! stream always ends with exactly one terminal event; budget exhaustion and
//! loop detection are what guarantee that, never the speaker judgment.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use turnstile_config::TurnstileConfig;
use turnstile_core::{
    ChatMessage, Event, EventEnvelope, EventSink, FailureKind, LoopKind, ModelService,
    SpeakerDecision, SpeakerJudge, ToolCallRequest, ToolCallResult, ToolRegistry, Transcript,
    TurnstileError, CONTINUE_PROMPT,
};
use turnstile_executor::{ToolExecutor, DEFAULT_TOOL_TIMEOUT};
use turnstile_tools::{LoopGuard, DEFAULT_LOOP_WINDOW};

use crate::budget::{OrchestrationBudget, ABSOLUTE_TURN_CEILING, DEFAULT_MAX_TURNS};
use crate::context_window::{try_compress, CompressionSettings};
use crate::next_speaker::SpeakerArbiter;
use crate::session_limiter::{SessionLimiter, DEFAULT_MAX_SESSION_TURNS};
use crate::session_state::SessionState;
use crate::turn::Turn;

const DECLINED: &str = "declined by user";

/// Runtime knobs for a [`TurnOrchestrator`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub max_turns: u32,
    pub absolute_turn_ceiling: u32,
    /// Session-wide ceiling, used to build the shared [`SessionLimiter`].
    pub max_session_turns: u32,
    pub tool_timeout: Duration,
    pub loop_window: usize,
    /// Run tools that ask for confirmation without asking.
    pub auto_execute: bool,
    pub continue_prompt: String,
    pub compression: CompressionSettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            absolute_turn_ceiling: ABSOLUTE_TURN_CEILING,
            max_session_turns: DEFAULT_MAX_SESSION_TURNS,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            loop_window: DEFAULT_LOOP_WINDOW,
            auto_execute: false,
            continue_prompt: CONTINUE_PROMPT.to_string(),
            compression: CompressionSettings::default(),
        }
    }
}

impl From<&TurnstileConfig> for OrchestratorSettings {
    fn from(config: &TurnstileConfig) -> Self {
        let defaults = Self::default();
        let orch = config.orchestrator.clone().unwrap_or_default();
        let session = config.session.clone().unwrap_or_default();
        let tools = config.tools.clone().unwrap_or_default();
        let guard = config.loop_guard.clone().unwrap_or_default();
        let context = config.context.clone().unwrap_or_default();

        Self {
            max_turns: orch.max_turns.unwrap_or(defaults.max_turns),
            absolute_turn_ceiling: orch
                .absolute_turn_ceiling
                .unwrap_or(defaults.absolute_turn_ceiling),
            max_session_turns: session
                .max_session_turns
                .unwrap_or(defaults.max_session_turns),
            tool_timeout: tools
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.tool_timeout),
            loop_window: guard.window.unwrap_or(defaults.loop_window),
            auto_execute: orch.auto_execute.unwrap_or(defaults.auto_execute),
            continue_prompt: orch
                .continue_prompt
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(defaults.continue_prompt),
            compression: CompressionSettings {
                token_limit: context
                    .token_limit
                    .unwrap_or(defaults.compression.token_limit),
                threshold: context
                    .compression_threshold
                    .unwrap_or(defaults.compression.threshold),
                preserve_fraction: context
                    .preserve_fraction
                    .unwrap_or(defaults.compression.preserve_fraction),
            },
        }
    }
}

enum Kickoff {
    Request(ChatMessage),
    Resume { approved: bool },
}

/// Drives conversational requests for one session.
pub struct TurnOrchestrator {
    session: SessionState,
    model: Arc<dyn ModelService>,
    arbiter: SpeakerArbiter,
    executor: ToolExecutor,
    settings: OrchestratorSettings,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl TurnOrchestrator {
    pub fn new(
        session: SessionState,
        model: Arc<dyn ModelService>,
        judge: Arc<dyn SpeakerJudge>,
        tools: Arc<ToolRegistry>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            session,
            model,
            arbiter: SpeakerArbiter::new(judge),
            executor: ToolExecutor::new(tools),
            settings,
            sinks: Vec::new(),
        }
    }

    /// Register a sink that receives every event envelope.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// A fresh top-level budget for this session.
    pub fn budget(&self, limiter: Arc<SessionLimiter>) -> OrchestrationBudget {
        OrchestrationBudget::new(
            self.settings.max_turns,
            self.settings.absolute_turn_ceiling,
            limiter,
            self.session.session_id.clone(),
        )
    }

    /// Run one top-level request.
    ///
    /// Calls still awaiting confirmation from the previous run are treated as
    /// declined. The stream borrows the orchestrator, so a session can only
    /// have one run in flight.
    pub fn run(
        &mut self,
        request: ChatMessage,
        budget: OrchestrationBudget,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Event> + Send + '_ {
        self.drive(Kickoff::Request(request), budget, cancel)
    }

    /// Answer an `AwaitingConfirmation` stop: run the held calls (or decline
    /// them) and let the model carry on.
    pub fn resolve_confirmation(
        &mut self,
        approved: bool,
        budget: OrchestrationBudget,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Event> + Send + '_ {
        self.drive(Kickoff::Resume { approved }, budget, cancel)
    }

    fn drive(
        &mut self,
        kickoff: Kickoff,
        budget: OrchestrationBudget,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Event> + Send + '_ {
        let TurnOrchestrator {
            session,
            model,
            arbiter,
            executor,
            settings,
            sinks,
        } = self;
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestration_run", %run_id, session_id = %session.session_id);

        stream! {
            let session_id = session.session_id.clone();
            let mut turn_no: u32 = 0;
            let mut budget = budget;
            let mut loop_guard = LoopGuard::new(settings.loop_window);
            let mut current: Option<Turn> = None;
            let starting_model = model.active_model();
            session.turns.clear();

            macro_rules! emit {
                ($event:expr) => {{
                    let event: Event = $event;
                    let envelope = EventEnvelope::new(run_id, session_id.clone(), turn_no, event.clone());
                    for sink in sinks.iter() {
                        sink.emit(&envelope);
                    }
                    yield event;
                }};
            }

            macro_rules! terminate {
                ($event:expr) => {{
                    let event: Event = $event;
                    if let Some(mut turn) = current.take() {
                        turn.mark_terminal();
                        session.turns.push(turn);
                    }
                    info!(parent: &span, turn = turn_no, outcome = ?event.outcome(), %event, "Run finished");
                    emit!(event);
                    return;
                }};
            }

            let pending = std::mem::take(&mut session.pending_confirmation);
            let mut request = match kickoff {
                Kickoff::Request(message) => {
                    if !pending.is_empty() {
                        info!(parent: &span, count = pending.len(), "Declining unconfirmed tool calls");
                    }
                    for call in &pending {
                        let result = ToolCallResult::failure(FailureKind::Cancelled, DECLINED);
                        session.transcript.push(ChatMessage::tool_result(call, result.clone()));
                        emit!(Event::ToolCallCompleted {
                            call_id: call.call_id.clone(),
                            name: call.name.clone(),
                            result,
                        });
                    }
                    if !message.synthetic {
                        loop_guard.note_user_content();
                    }
                    message
                }
                Kickoff::Resume { approved } => {
                    if pending.is_empty() {
                        terminate!(Event::InternalSchedulingError {
                            message: "no tool calls are awaiting confirmation".to_string(),
                        });
                    }
                    info!(parent: &span, approved, count = pending.len(), "Resolving tool confirmation");
                    let results = if approved {
                        for call in &pending {
                            emit!(Event::ToolCallStarted { call: call.clone() });
                        }
                        executor.execute_all(&pending, settings.tool_timeout, &cancel).await
                    } else {
                        pending
                            .iter()
                            .map(|_| ToolCallResult::failure(FailureKind::Cancelled, DECLINED))
                            .collect()
                    };
                    let repeated_error = results
                        .iter()
                        .filter_map(|r| r.failure_message())
                        .find(|m| approved && loop_guard.check_error_loop(m))
                        .map(str::to_string);
                    for (call, result) in pending.iter().zip(results) {
                        session.transcript.push(ChatMessage::tool_result(call, result.clone()));
                        emit!(Event::ToolCallCompleted {
                            call_id: call.call_id.clone(),
                            name: call.name.clone(),
                            result,
                        });
                    }
                    if let Some(message) = repeated_error {
                        terminate!(Event::LoopDetected {
                            kind: LoopKind::RepeatedError,
                            detail: format!(
                                "the same tool error repeated {} times: {}",
                                loop_guard.window(),
                                message
                            ),
                        });
                    }
                    ChatMessage::continue_nudge(settings.continue_prompt.clone())
                }
            };

            loop {
                turn_no += 1;

                if budget.is_exhausted() {
                    warn!(parent: &span, turn = turn_no, "Turn budget exhausted");
                    terminate!(Event::TurnLimitReached { turn: turn_no });
                }
                if !budget.try_consume_session_turn().await {
                    terminate!(Event::SessionLimitReached { turn: turn_no });
                }
                if cancel.is_cancelled() {
                    terminate!(Event::Aborted);
                }

                if let Some(report) = try_compress(&mut session.transcript, &settings.compression) {
                    emit!(Event::ChatCompressed {
                        original_tokens: report.original_tokens,
                        compressed_tokens: report.compressed_tokens,
                    });
                }

                session.transcript.push(request.clone());
                current = Some(Turn::new(turn_no, request.clone()));
                info!(
                    parent: &span,
                    turn = turn_no,
                    remaining = budget.remaining(),
                    depth = budget.depth(),
                    "Turn started"
                );
                emit!(Event::TurnStarted { turn: turn_no });

                let sent = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    sent = model.send(session.transcript.messages(), cancel.clone()) => Some(sent),
                };
                let mut fragments = match sent {
                    None => terminate!(Event::Aborted),
                    Some(Err(e)) => {
                        let err = model_error(&**model, &e);
                        warn!(parent: &span, error = %err, "Model request failed");
                        terminate!(Event::ModelFailed { message: err.to_string() })
                    }
                    Some(Ok(fragments)) => fragments,
                };

                let mut text = String::new();
                let mut calls: Vec<ToolCallRequest> = Vec::new();
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        next = fragments.next() => Some(next),
                    };
                    let fragment = match next {
                        None => terminate!(Event::Aborted),
                        Some(None) => break,
                        Some(Some(Err(e))) => {
                            let err = model_error(&**model, &e);
                            warn!(parent: &span, error = %err, "Model stream failed");
                            terminate!(Event::ModelFailed { message: err.to_string() })
                        }
                        Some(Some(Ok(fragment))) => fragment,
                    };

                    if let Some(usage) = fragment.usage {
                        session.token_stats.add_usage(model.active_model(), usage);
                    }
                    if let Some(thought) = fragment.thought.filter(|t| !t.is_empty()) {
                        emit!(Event::Thought { text: thought });
                    }
                    if let Some(chunk) = fragment.text.filter(|t| !t.is_empty()) {
                        text.push_str(&chunk);
                        if let Some(turn) = current.as_mut() {
                            turn.push_text(&chunk);
                        }
                        emit!(Event::ModelChunk { text: chunk });
                    }
                    calls.extend(fragment.tool_calls);
                }
                drop(fragments);

                for call in calls.iter_mut() {
                    if call.call_id.trim().is_empty() {
                        call.call_id = format!("{}-{}", call.name, Uuid::new_v4());
                    }
                }
                if let Some(turn) = current.as_mut() {
                    turn.push_calls(calls.iter().cloned());
                }
                session.transcript.push(ChatMessage::model(text, calls.clone()));

                if !calls.is_empty() {
                    if let Some(bad) = calls.iter().find(|c| !c.has_valid_args()) {
                        let err = TurnstileError::InvalidArguments {
                            tool: bad.name.clone(),
                            message: format!("expected an object, got {}", bad.args),
                        };
                        skip_calls(&mut session.transcript, &calls, "malformed arguments");
                        terminate!(Event::InternalSchedulingError { message: err.to_string() });
                    }

                    let repeated = calls
                        .iter()
                        .find(|c| loop_guard.check_tool_loop(&c.name, &c.args))
                        .cloned();
                    if let Some(call) = repeated {
                        skip_calls(&mut session.transcript, &calls, "repeated call");
                        terminate!(Event::LoopDetected {
                            kind: LoopKind::RepeatedToolCall,
                            detail: format!(
                                "tool '{}' called {} times in a row with identical arguments",
                                call.name,
                                loop_guard.window()
                            ),
                        });
                    }

                    if !settings.auto_execute && needs_confirmation(executor.registry(), &calls) {
                        info!(parent: &span, count = calls.len(), "Holding tool calls for confirmation");
                        session.pending_confirmation = calls.clone();
                        terminate!(Event::AwaitingConfirmation { calls: calls.clone() });
                    }

                    for call in &calls {
                        emit!(Event::ToolCallStarted { call: call.clone() });
                    }
                    let results = executor.execute_all(&calls, settings.tool_timeout, &cancel).await;
                    for (call, result) in calls.iter().zip(results.iter()) {
                        session.transcript.push(ChatMessage::tool_result(call, result.clone()));
                        emit!(Event::ToolCallCompleted {
                            call_id: call.call_id.clone(),
                            name: call.name.clone(),
                            result: result.clone(),
                        });
                    }
                    let repeated_error = results
                        .iter()
                        .filter_map(|r| r.failure_message())
                        .find(|m| loop_guard.check_error_loop(m))
                        .map(str::to_string);
                    if let Some(turn) = current.as_mut() {
                        turn.attach_results(results);
                    }

                    if cancel.is_cancelled() {
                        terminate!(Event::Aborted);
                    }
                    if let Some(message) = repeated_error {
                        terminate!(Event::LoopDetected {
                            kind: LoopKind::RepeatedError,
                            detail: format!(
                                "the same tool error repeated {} times: {}",
                                loop_guard.window(),
                                message
                            ),
                        });
                    }

                    if let Some(turn) = current.take() {
                        session.turns.push(turn);
                    }
                    request = ChatMessage::continue_nudge(settings.continue_prompt.clone());
                    budget = match budget.descend() {
                        Some(next) => next,
                        None => terminate!(Event::TurnLimitReached { turn: turn_no + 1 }),
                    };
                    continue;
                }

                if let Some(turn) = current.as_mut() {
                    turn.attach_results(Vec::new());
                }
                if cancel.is_cancelled() {
                    terminate!(Event::Aborted);
                }

                let active_model = model.active_model();
                if active_model != starting_model {
                    warn!(
                        parent: &span,
                        from = %starting_model,
                        to = %active_model,
                        "Model switched during run; stopping"
                    );
                    terminate!(Event::Done { decision: SpeakerDecision::Stop });
                }

                let decision = arbiter.decide(&session.transcript, &cancel).await;
                if cancel.is_cancelled() {
                    terminate!(Event::Aborted);
                }
                debug!(parent: &span, turn = turn_no, %decision, "Next speaker decided");

                match decision {
                    SpeakerDecision::ModelContinues => {
                        if loop_guard.check_continue_loop() {
                            terminate!(Event::LoopDetected {
                                kind: LoopKind::RepeatedContinue,
                                detail: format!(
                                    "{} consecutive continuation turns without new input",
                                    loop_guard.consecutive_continues()
                                ),
                            });
                        }
                        if let Some(turn) = current.take() {
                            session.turns.push(turn);
                        }
                        request = ChatMessage::continue_nudge(settings.continue_prompt.clone());
                        budget = match budget.descend() {
                            Some(next) => next,
                            None => terminate!(Event::TurnLimitReached { turn: turn_no + 1 }),
                        };
                    }
                    decision => terminate!(Event::Done { decision }),
                }
            }
        }
    }
}

fn model_error(model: &dyn ModelService, e: &anyhow::Error) -> TurnstileError {
    TurnstileError::Model {
        model: model.active_model(),
        message: e.to_string(),
    }
}

fn needs_confirmation(registry: &ToolRegistry, calls: &[ToolCallRequest]) -> bool {
    calls.iter().any(|call| {
        registry
            .resolve(&call.name)
            .map(|tool| tool.requires_confirmation(&call.args))
            .unwrap_or(false)
    })
}

/// Answer calls that will never run, so every model call in the transcript
/// has a result.
fn skip_calls(transcript: &mut Transcript, calls: &[ToolCallRequest], reason: &str) {
    for call in calls {
        transcript.push(ChatMessage::tool_result(
            call,
            ToolCallResult::failure(FailureKind::Cancelled, format!("not executed: {reason}")),
        ));
    }
}
