//! Next-speaker arbitration.
//!
//! A few transcript shapes decide the answer locally; everything else is
//! delegated to an external [`SpeakerJudge`]. The judge's answer is advisory:
//! the orchestrator's budget and loop guard still own termination.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use turnstile_core::{Role, SpeakerDecision, SpeakerJudge, Transcript, TurnstileError};

pub struct SpeakerArbiter {
    judge: Arc<dyn SpeakerJudge>,
}

impl SpeakerArbiter {
    pub fn new(judge: Arc<dyn SpeakerJudge>) -> Self {
        Self { judge }
    }

    /// Decide who speaks next. Never fails: a judge error or a cancelled
    /// judgment hands the turn to the user.
    pub async fn decide(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> SpeakerDecision {
        if let Some(decision) = Self::local_rule(transcript) {
            debug!(%decision, "Next speaker decided locally");
            return decision;
        }

        let judged = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.judge.judge(transcript.messages(), cancel.clone()) => Some(result),
        };

        match judged {
            Some(Ok(decision)) => {
                debug!(%decision, "Next speaker judged");
                decision
            }
            Some(Err(e)) => {
                let err = TurnstileError::Judgment(e.to_string());
                warn!(error = %err, "Handing turn to user");
                SpeakerDecision::UserTurn
            }
            None => {
                debug!("Next-speaker judgment cancelled");
                SpeakerDecision::UserTurn
            }
        }
    }

    fn local_rule(transcript: &Transcript) -> Option<SpeakerDecision> {
        let last = match transcript.last() {
            Some(last) => last,
            None => return Some(SpeakerDecision::UserTurn),
        };
        if last.role == Role::Tool {
            return Some(SpeakerDecision::ModelContinues);
        }
        if last.is_empty_model_message() {
            return Some(SpeakerDecision::ModelContinues);
        }
        None
    }
}
