//! Dialogue State Machine: processes one candidate turn against a session.
//!
//! GREETING → PRIMARY(1..N) → [ELABORATION]* → PIVOT → … → SOFT_CLOSE → FINISHED.
//! Each turn makes at most two generation calls (the second only to re-ask after a warning)
//! and suspends nowhere else. Generation errors and timeouts finish the session.

use tracing::{debug, error, info, warn};

use crate::interview::pacing::{self, ActionGuide};
use crate::interview::prompts;
use crate::interview::protocol::{
    self, ReplySignal, FORCED_CLOSE_TAG, GENERATION_FAILURE_TAG, PIVOT_TAG,
    SENTINEL_END_PHRASE, SOFT_CLOSE_TAG, TERMINATION_TAG, WARNING_TAG,
};
use crate::interview::session::InterviewSession;
use crate::interview::transcript::TurnRole;
use crate::interview::InterviewError;
use crate::llm_client::{ChatMessage, TextGenerator};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub is_finished: bool,
}

/// How one generated reply resolved after protocol handling.
enum Resolution {
    Finished(String),
    Continue {
        reply: String,
        /// False for clarifications, including a clarification re-ask after a warning.
        consumes_pacing: bool,
    },
}

impl Resolution {
    fn into_outcome(self) -> TurnOutcome {
        match self {
            Resolution::Finished(reply) => TurnOutcome {
                reply,
                is_finished: true,
            },
            Resolution::Continue { reply, .. } => TurnOutcome {
                reply,
                is_finished: false,
            },
        }
    }
}

impl InterviewSession {
    /// Processes one candidate reply. Not reentrant: callers serialize turns per session.
    pub async fn process_turn(
        &mut self,
        generator: &dyn TextGenerator,
        candidate_reply: &str,
    ) -> Result<TurnOutcome, InterviewError> {
        if self.is_finished {
            return Err(InterviewError::SessionFinished(self.id));
        }

        self.touch();
        self.transcript.push(TurnRole::Human, candidate_reply);

        if self.is_in_soft_close {
            return Ok(self.continue_soft_close(generator).await);
        }

        if self.counters.topics_exhausted(&self.settings.pacing) {
            info!(
                session_id = %self.id,
                max_primary_questions = self.settings.pacing.max_primary_questions,
                "Primary topics exhausted, initiating soft close"
            );
            return Ok(self.initiate_soft_close(generator).await);
        }

        let guide = pacing::select_guide(&self.counters, &self.settings.pacing);
        let instruction = guide.instruction(&self.settings.pacing);

        let outcome = match self.respond(generator, &instruction).await {
            Resolution::Continue {
                reply,
                consumes_pacing: true,
            } => {
                self.counters.advance(guide, &self.settings.pacing);
                if matches!(guide, ActionGuide::PivotNewTopic { .. }) {
                    self.transcript.push(TurnRole::Protocol, PIVOT_TAG);
                }
                TurnOutcome {
                    reply,
                    is_finished: false,
                }
            }
            Resolution::Continue {
                reply,
                consumes_pacing: false,
            } => {
                debug!(session_id = %self.id, ?guide, "Pacing not advanced for this turn");
                TurnOutcome {
                    reply,
                    is_finished: false,
                }
            }
            finished @ Resolution::Finished(_) => finished.into_outcome(),
        };

        Ok(outcome)
    }

    /// Generates one reply for `instruction` and applies the protocol interpreter to it.
    async fn respond(&mut self, generator: &dyn TextGenerator, instruction: &str) -> Resolution {
        let text = match self.generate(generator, instruction).await {
            Ok(text) => text,
            Err(e) => return self.fail_closed(e),
        };

        match protocol::interpret(&text) {
            ReplySignal::Misconduct => self.escalate(generator).await,
            ReplySignal::SentinelEnd(visible) => self.finish_with_sentinel(visible),
            ReplySignal::Clarification(reply) => {
                self.transcript.push(TurnRole::Ai, reply.as_str());
                Resolution::Continue {
                    reply,
                    consumes_pacing: false,
                }
            }
            ReplySignal::Plain(reply) => {
                self.transcript.push(TurnRole::Ai, reply.as_str());
                Resolution::Continue {
                    reply,
                    consumes_pacing: true,
                }
            }
        }
    }

    /// Misconduct escalation: warn once and re-ask, terminate on the next offense.
    async fn escalate(&mut self, generator: &dyn TextGenerator) -> Resolution {
        self.warning_count += 1;
        self.transcript.push(TurnRole::Protocol, WARNING_TAG);
        warn!(
            session_id = %self.id,
            warning_count = self.warning_count,
            "Misconduct tag received"
        );

        if self.warning_count > self.settings.max_warnings {
            self.transcript.push(TurnRole::Protocol, TERMINATION_TAG);
            return self.finish(prompts::TERMINATION_MESSAGE.to_string());
        }

        // The re-ask sees the warning as the last interviewer message.
        let warning = [ChatMessage::assistant(prompts::WARNING_MESSAGE)];
        let restated = match self
            .generate_with(generator, prompts::REASK_GUIDE, &warning)
            .await
        {
            Ok(text) => text,
            Err(e) => return self.fail_closed(e),
        };

        let (reply, consumes_pacing) = match protocol::interpret(&restated) {
            ReplySignal::SentinelEnd(visible) => return self.finish_with_sentinel(visible),
            // The model echoed the tag instead of the question; show the warning alone.
            ReplySignal::Misconduct => (prompts::WARNING_MESSAGE.to_string(), false),
            ReplySignal::Clarification(question) => {
                (format!("{}\n\n{question}", prompts::WARNING_MESSAGE), false)
            }
            ReplySignal::Plain(question) => {
                (format!("{}\n\n{question}", prompts::WARNING_MESSAGE), true)
            }
        };

        self.transcript.push(TurnRole::Ai, reply.as_str());
        Resolution::Continue {
            reply,
            consumes_pacing,
        }
    }

    async fn initiate_soft_close(&mut self, generator: &dyn TextGenerator) -> TurnOutcome {
        self.is_in_soft_close = true;
        self.transcript.push(TurnRole::Protocol, SOFT_CLOSE_TAG);
        self.respond(generator, prompts::SOFT_CLOSE_GUIDE)
            .await
            .into_outcome()
    }

    /// Waits for the sentinel. After `max_soft_close_exchanges` replies without it,
    /// the session is closed with a fixed goodbye.
    async fn continue_soft_close(&mut self, generator: &dyn TextGenerator) -> TurnOutcome {
        let instruction = prompts::final_signal_guide();
        match self.respond(generator, &instruction).await {
            Resolution::Finished(reply) => TurnOutcome {
                reply,
                is_finished: true,
            },
            Resolution::Continue { reply, .. } => {
                self.soft_close_exchanges += 1;
                if self.soft_close_exchanges < self.settings.max_soft_close_exchanges {
                    return TurnOutcome {
                        reply,
                        is_finished: false,
                    };
                }

                warn!(
                    session_id = %self.id,
                    exchanges = self.soft_close_exchanges,
                    "No {} received during soft close, forcing close",
                    SENTINEL_END_PHRASE
                );
                self.transcript.push(TurnRole::Protocol, FORCED_CLOSE_TAG);
                self.finish(prompts::FORCED_CLOSE_MESSAGE.to_string());
                TurnOutcome {
                    reply: format!("{reply}\n\n{}", prompts::FORCED_CLOSE_MESSAGE),
                    is_finished: true,
                }
            }
        }
    }

    /// One bounded call to the text generator with the current window.
    async fn generate(
        &self,
        generator: &dyn TextGenerator,
        instruction: &str,
    ) -> Result<String, InterviewError> {
        self.generate_with(generator, instruction, &[]).await
    }

    /// Like `generate`, with `trailing` appended to the window but not to the transcript.
    async fn generate_with(
        &self,
        generator: &dyn TextGenerator,
        instruction: &str,
        trailing: &[ChatMessage],
    ) -> Result<String, InterviewError> {
        let system = prompts::system_instruction(&self.context, &self.settings);
        let mut history = self.transcript.window(self.settings.memory_window);
        history.extend_from_slice(trailing);
        let timeout = self.settings.generation_timeout;

        match tokio::time::timeout(timeout, generator.generate(&system, &history, instruction))
            .await
        {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(InterviewError::GenerationFailure(e.to_string())),
            Err(_) => Err(InterviewError::GenerationFailure(format!(
                "no reply within {}s",
                timeout.as_secs()
            ))),
        }
    }

    fn fail_closed(&mut self, cause: InterviewError) -> Resolution {
        error!(session_id = %self.id, error = %cause, "Terminating interview");
        self.transcript.push(TurnRole::Protocol, GENERATION_FAILURE_TAG);
        self.finish(prompts::GENERATION_FAILURE_MESSAGE.to_string())
    }

    fn finish_with_sentinel(&mut self, visible: String) -> Resolution {
        self.transcript.push(TurnRole::Protocol, SENTINEL_END_PHRASE);
        self.finish(visible)
    }

    fn finish(&mut self, reply: String) -> Resolution {
        self.transcript.push(TurnRole::Ai, reply.as_str());
        self.is_finished = true;
        info!(
            session_id = %self.id,
            turns = self.transcript.len(),
            warnings = self.warning_count,
            "Interview finished"
        );
        Resolution::Finished(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::InterviewSettings;
    use crate::interview::pacing::PacingLimits;
    use crate::interview::session::DialoguePhase;
    use crate::interview::testing::{
        new_session, HangingGenerator, ScriptedGenerator,
    };
    use crate::interview::transcript::TurnRecord;
    use crate::llm_client::{ChatRole, LlmError};

    fn settings(max_primary_questions: u32, max_elaborations: u32) -> InterviewSettings {
        InterviewSettings {
            pacing: PacingLimits {
                max_primary_questions,
                max_elaborations,
            },
            ..InterviewSettings::default()
        }
    }

    fn roles(records: &[TurnRecord]) -> Vec<TurnRole> {
        records.iter().map(|r| r.role).collect()
    }

    fn protocol_count(session: &InterviewSession, tag: &str) -> usize {
        session
            .transcript()
            .records()
            .iter()
            .filter(|r| r.role == TurnRole::Protocol && r.content == tag)
            .count()
    }

    #[tokio::test]
    async fn test_single_topic_scenario_reaches_finish() {
        let generator = ScriptedGenerator::new([
            "Great. Question 1: how does ownership work in Rust?",
            "Do you have any final questions for me?",
            "Thanks for your time, goodbye! <<END_INTERVIEW>>",
        ]);
        let mut session = new_session(settings(1, 0));

        let turn1 = session.process_turn(&generator, "Hi, doing well").await.unwrap();
        assert!(!turn1.is_finished);
        assert_eq!(session.counters().primary_question_count, 1);
        assert_eq!(session.phase(), DialoguePhase::Primary { topic: 1 });

        let turn2 = session.process_turn(&generator, "Ownership moves values").await.unwrap();
        assert!(!turn2.is_finished);
        assert!(session.is_in_soft_close());
        assert_eq!(turn2.reply, "Do you have any final questions for me?");

        let turn3 = session.process_turn(&generator, "No, thank you").await.unwrap();
        assert!(turn3.is_finished);
        assert_eq!(turn3.reply, "Thanks for your time, goodbye!");
        assert!(session.is_finished());
        assert_eq!(session.phase(), DialoguePhase::Finished);

        assert_eq!(generator.guides()[0], prompts::FIRST_TOPIC_GUIDE);
        assert_eq!(generator.guides()[1], prompts::SOFT_CLOSE_GUIDE);
        assert_eq!(protocol_count(&session, SOFT_CLOSE_TAG), 1);
        assert_eq!(protocol_count(&session, SENTINEL_END_PHRASE), 1);
    }

    #[tokio::test]
    async fn test_soft_close_overrides_pending_elaboration() {
        let generator = ScriptedGenerator::new(["Q1", "Any final questions?"]);
        let mut session = new_session(settings(1, 3));

        session.process_turn(&generator, "hello").await.unwrap();
        assert_eq!(session.counters().elaboration_count, 0);

        session.process_turn(&generator, "answer").await.unwrap();
        assert!(session.is_in_soft_close());
        assert_eq!(generator.guides()[1], prompts::SOFT_CLOSE_GUIDE);
    }

    /// Guides issued from the first topic through soft close. Reaching topic `n`
    /// starts the soft close, so the last topic gets no follow-ups.
    fn expected_guides(limits: &PacingLimits) -> Vec<String> {
        let mut guides = vec![ActionGuide::FirstTopic.instruction(limits)];
        for topic in 1..limits.max_primary_questions {
            for follow_up in 1..=limits.max_elaborations {
                guides.push(ActionGuide::AskFollowUp { follow_up }.instruction(limits));
            }
            guides.push(ActionGuide::PivotNewTopic { next_topic: topic + 1 }.instruction(limits));
        }
        guides.push(prompts::SOFT_CLOSE_GUIDE.to_string());
        guides
    }

    #[tokio::test]
    async fn test_full_interview_issues_n_minus_one_pivots() {
        for (n, m) in [(3u32, 2u32), (1, 0), (2, 0), (5, 1)] {
            // 1 first topic, then (n-1) rounds of m follow-ups and a pivot.
            let ordinary_turns = 1 + (n - 1) * (m + 1);
            let mut replies: Vec<String> =
                (0..ordinary_turns).map(|i| format!("Question {i}")).collect();
            replies.push("Any questions for me?".to_string());
            let generator = ScriptedGenerator::new(replies.iter().map(String::as_str));
            let mut session = new_session(settings(n, m));

            for _ in 0..ordinary_turns {
                let outcome = session.process_turn(&generator, "an answer").await.unwrap();
                assert!(!outcome.is_finished);
                assert!(!session.is_in_soft_close(), "n={n} m={m}");
                assert!(session.counters().elaboration_count <= m);
            }
            assert_eq!(session.counters().primary_question_count, n);

            session.process_turn(&generator, "an answer").await.unwrap();
            assert!(session.is_in_soft_close());
            assert_eq!(protocol_count(&session, PIVOT_TAG), (n - 1) as usize);

            let limits = PacingLimits {
                max_primary_questions: n,
                max_elaborations: m,
            };
            assert_eq!(generator.guides(), expected_guides(&limits), "n={n} m={m}");
        }
    }

    #[tokio::test]
    async fn test_clarification_does_not_advance_pacing() {
        let generator = ScriptedGenerator::new([
            "Question 1: explain lifetimes.",
            "To ensure clarity, I will repeat the question: explain lifetimes.",
            "Let me clarify that point for you: what is a lifetime?",
            "Follow-up: when do you need explicit lifetimes?",
        ]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        let before = session.counters();

        session.process_turn(&generator, "sorry, can you repeat?").await.unwrap();
        session.process_turn(&generator, "still unclear").await.unwrap();
        assert_eq!(session.counters(), before);

        session.process_turn(&generator, "a real answer").await.unwrap();
        assert_eq!(session.counters().elaboration_count, 1);
        assert_eq!(session.counters().primary_question_count, 1);
    }

    #[tokio::test]
    async fn test_transcript_ordering_with_warning() {
        let generator = ScriptedGenerator::new([
            "Nice to meet you. Question 1: what is a trait object?",
            WARNING_TAG,
            "What is a trait object?",
        ]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        let outcome = session.process_turn(&generator, "this is a stupid question").await.unwrap();

        assert!(!outcome.is_finished);
        assert!(outcome.reply.starts_with(prompts::WARNING_MESSAGE));
        assert!(outcome.reply.ends_with("What is a trait object?"));
        assert_eq!(session.warning_count(), 1);

        let records = session.transcript().records();
        assert_eq!(records.len(), 6);
        assert_eq!(
            roles(&records[1..]),
            vec![
                TurnRole::Human,
                TurnRole::Ai,
                TurnRole::Human,
                TurnRole::Protocol,
                TurnRole::Ai,
            ]
        );
        assert_eq!(records[4].content, WARNING_TAG);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.ordinal as usize, i);
        }
        assert_eq!(generator.guides()[2], prompts::REASK_GUIDE);
    }

    #[tokio::test]
    async fn test_warning_turn_consumes_pacing_once() {
        let generator = ScriptedGenerator::new(["Question 1", WARNING_TAG, "Question 1 restated"]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        session.process_turn(&generator, "rude").await.unwrap();
        assert_eq!(session.counters().primary_question_count, 1);
        assert_eq!(session.counters().elaboration_count, 1);
    }

    #[tokio::test]
    async fn test_clarification_reask_does_not_consume_pacing() {
        let generator = ScriptedGenerator::new([
            "Question 1",
            WARNING_TAG,
            "To ensure clarity, I will repeat the question: Question 1",
        ]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        let before = session.counters();
        session.process_turn(&generator, "rude").await.unwrap();
        assert_eq!(session.counters(), before);
    }

    #[tokio::test]
    async fn test_reask_history_ends_with_warning() {
        let generator = ScriptedGenerator::new(["Question 1", WARNING_TAG, "Question 1 restated"]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        session.process_turn(&generator, "rude").await.unwrap();

        let reask_history = &generator.histories()[2];
        let last = reask_history.last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, prompts::WARNING_MESSAGE);
        assert_eq!(reask_history[reask_history.len() - 2].content, "rude");

        // The warning is sent to the model but recorded once, together with the question.
        let ai_records: Vec<&str> = session
            .transcript()
            .records()
            .iter()
            .filter(|r| r.role == TurnRole::Ai)
            .map(|r| r.content.as_str())
            .collect();
        let expected = format!("{}\n\nQuestion 1 restated", prompts::WARNING_MESSAGE);
        assert_eq!(ai_records.last(), Some(&expected.as_str()));
    }

    #[tokio::test]
    async fn test_second_misconduct_terminates() {
        let generator = ScriptedGenerator::new([
            "Question 1",
            WARNING_TAG,
            "Question 1 restated",
            WARNING_TAG,
        ]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        session.process_turn(&generator, "rude").await.unwrap();
        assert_eq!(session.warning_count(), 1);

        let outcome = session.process_turn(&generator, "ruder").await.unwrap();
        assert!(outcome.is_finished);
        assert_eq!(outcome.reply, prompts::TERMINATION_MESSAGE);
        assert_eq!(session.warning_count(), 2);
        assert_eq!(protocol_count(&session, TERMINATION_TAG), 1);
        // No re-ask on the terminating turn.
        assert_eq!(generator.calls(), 4);

        let again = session.process_turn(&generator, "hello?").await;
        assert!(matches!(again, Err(InterviewError::SessionFinished(_))));
    }

    #[tokio::test]
    async fn test_reask_that_echoes_tag_never_leaks_it() {
        let generator = ScriptedGenerator::new(["Question 1", WARNING_TAG, WARNING_TAG]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        let outcome = session.process_turn(&generator, "rude").await.unwrap();
        assert_eq!(outcome.reply, prompts::WARNING_MESSAGE);
        assert_eq!(session.warning_count(), 1);
    }

    #[tokio::test]
    async fn test_sentinel_in_ordinary_turn_finishes_and_is_stripped() {
        let generator = ScriptedGenerator::new(["<<END_INTERVIEW>> That is all, thank you."]);
        let mut session = new_session(settings(5, 1));

        let outcome = session.process_turn(&generator, "hi").await.unwrap();
        assert!(outcome.is_finished);
        assert_eq!(outcome.reply, "That is all, thank you.");
        assert!(!outcome.reply.contains(SENTINEL_END_PHRASE));
        let last = session.transcript().records().last().unwrap();
        assert_eq!(last.role, TurnRole::Ai);
        assert!(!last.content.contains(SENTINEL_END_PHRASE));
    }

    #[tokio::test]
    async fn test_generation_error_fails_closed() {
        let generator = ScriptedGenerator::with_results(vec![Err(LlmError::Api {
            status: 503,
            message: "overloaded".to_string(),
        })]);
        let mut session = new_session(settings(5, 1));

        let outcome = session.process_turn(&generator, "hi").await.unwrap();
        assert!(outcome.is_finished);
        assert_eq!(outcome.reply, prompts::GENERATION_FAILURE_MESSAGE);
        assert_eq!(generator.calls(), 1);
        assert_eq!(protocol_count(&session, GENERATION_FAILURE_TAG), 1);
        assert_eq!(session.transcript().records()[1].role, TurnRole::Human);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_fails_closed() {
        let mut session = new_session(InterviewSettings {
            generation_timeout: Duration::from_secs(5),
            ..settings(5, 1)
        });

        let outcome = session.process_turn(&HangingGenerator, "hi").await.unwrap();
        assert!(outcome.is_finished);
        assert_eq!(outcome.reply, prompts::GENERATION_FAILURE_MESSAGE);
        assert!(session.is_finished());
    }

    #[tokio::test]
    async fn test_reask_failure_fails_closed() {
        let generator = ScriptedGenerator::with_results(vec![
            Ok("Question 1".to_string()),
            Ok(WARNING_TAG.to_string()),
            Err(LlmError::EmptyContent),
        ]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hi").await.unwrap();
        let outcome = session.process_turn(&generator, "rude").await.unwrap();
        assert!(outcome.is_finished);
        assert_eq!(outcome.reply, prompts::GENERATION_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_soft_close_without_sentinel_is_force_closed() {
        let generator = ScriptedGenerator::new([
            "Question 1",
            "Any final questions?",
            "Happy to answer that.",
            "Anything else?",
        ]);
        let mut session = new_session(InterviewSettings {
            max_soft_close_exchanges: 2,
            ..settings(1, 0)
        });

        session.process_turn(&generator, "hi").await.unwrap();
        session.process_turn(&generator, "answer").await.unwrap();

        let first = session.process_turn(&generator, "What is the team like?").await.unwrap();
        assert!(!first.is_finished);
        assert!(session.is_in_soft_close());

        let second = session.process_turn(&generator, "And the stack?").await.unwrap();
        assert!(second.is_finished);
        assert!(second.reply.starts_with("Anything else?"));
        assert!(second.reply.ends_with(prompts::FORCED_CLOSE_MESSAGE));
        assert_eq!(protocol_count(&session, FORCED_CLOSE_TAG), 1);
    }

    #[tokio::test]
    async fn test_human_turn_is_recorded_before_reply() {
        let generator = ScriptedGenerator::new(["Question 1"]);
        let mut session = new_session(settings(5, 1));

        session.process_turn(&generator, "hello there").await.unwrap();
        let records = session.transcript().records();
        assert_eq!(records[1].role, TurnRole::Human);
        assert_eq!(records[1].content, "hello there");
        assert_eq!(records[2].role, TurnRole::Ai);

        let history = &generator.histories()[0];
        assert_eq!(history.last().unwrap().content, "hello there");
    }
}
