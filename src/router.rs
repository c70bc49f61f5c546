//! Strict-order routing: command, then safety, then knowledge, then
//! generation.
//!
//! The pipeline is an ordered table of stage handlers. Each stage either
//! handles the turn (short-circuiting the rest) or passes; reordering the
//! pipeline is a data change, not a control-flow rewrite. Every turn in the
//! interactive loop must produce a response, so no stage returns an error:
//! failures are converted to replies where they occur.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::commands::CommandInterpreter;
use crate::config::Settings;
use crate::kb::{KnowledgeBase, KnowledgeHit};
use crate::llm::Generator;
use crate::safety;
use crate::state::SessionState;

/// The outcome of one routed turn. Metadata always carries a `type` in
/// {command, safety, kb, kb_miss, llm}.
#[derive(Debug, Clone)]
pub struct RouteReply {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// What a stage decided for the current turn.
enum StageFlow {
    /// The turn is answered; skip the remaining stages.
    Done(RouteReply),
    /// Not this stage's turn to answer.
    Continue,
}

/// Data carried between stages of one turn.
#[derive(Default)]
struct TurnContext {
    /// A pass-with-disclaimer safety message, prepended to generated text.
    advisory: Option<String>,
}

type StageFn = fn(&mut Router, &mut SessionState, &str, &mut TurnContext) -> StageFlow;

/// Composes the pipeline and talks to the generation collaborator only when
/// nothing upstream has handled the turn.
pub struct Router {
    commands: CommandInterpreter,
    kb: KnowledgeBase,
    llm: Box<dyn Generator>,
    strong_match_threshold: f32,
    search_limit: usize,
    /// Pre-lowercased precision-guard vocabulary.
    trigger_terms: Vec<String>,
}

impl Router {
    const STAGES: [(&'static str, StageFn); 4] = [
        ("command", Self::stage_command),
        ("safety", Self::stage_safety),
        ("knowledge", Self::stage_knowledge),
        ("generation", Self::stage_generation),
    ];

    pub fn new(
        settings: &Settings,
        commands: CommandInterpreter,
        kb: KnowledgeBase,
        llm: Box<dyn Generator>,
    ) -> Self {
        Self {
            commands,
            kb,
            llm,
            strong_match_threshold: settings.kb_strong_match_threshold,
            search_limit: settings.search_limit,
            trigger_terms: settings
                .kb_trigger_terms
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    /// Route one utterance to completion. Single pass, no backtracking.
    pub fn route(&mut self, state: &mut SessionState, text: &str) -> RouteReply {
        let mut ctx = TurnContext::default();
        for (name, stage) in Self::STAGES {
            if let StageFlow::Done(reply) = stage(self, state, text, &mut ctx) {
                debug!(stage = name, "turn handled");
                return reply;
            }
        }
        // The generation stage answers unconditionally; an empty stage table
        // is the only way to get here.
        RouteReply {
            text: String::new(),
            metadata: BTreeMap::from([("type".to_string(), "llm".to_string())]),
        }
    }

    fn stage_command(
        &mut self,
        state: &mut SessionState,
        text: &str,
        _ctx: &mut TurnContext,
    ) -> StageFlow {
        let outcome = self.commands.parse(text, state);
        if outcome.handled {
            StageFlow::Done(RouteReply {
                text: outcome.output,
                metadata: outcome.metadata,
            })
        } else {
            StageFlow::Continue
        }
    }

    fn stage_safety(
        &mut self,
        state: &mut SessionState,
        text: &str,
        ctx: &mut TurnContext,
    ) -> StageFlow {
        let verdict = safety::evaluate(text, state.mode);
        if !verdict.allowed {
            let mut metadata = BTreeMap::from([
                ("type".to_string(), "safety".to_string()),
                ("blocked".to_string(), "true".to_string()),
            ]);
            if let Some(reason) = verdict.reason {
                metadata.insert("reason".to_string(), reason.as_str().to_string());
            }
            return StageFlow::Done(RouteReply {
                text: verdict.message.unwrap_or_default(),
                metadata,
            });
        }
        ctx.advisory = verdict.message;
        StageFlow::Continue
    }

    fn stage_knowledge(
        &mut self,
        _state: &mut SessionState,
        text: &str,
        _ctx: &mut TurnContext,
    ) -> StageFlow {
        // A store failure must not lose the turn; treat it as zero hits.
        let hits = match self.kb.search(text, self.search_limit) {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "knowledge search failed");
                Vec::new()
            }
        };

        if let Some(top) = hits.first() {
            if top.score >= self.strong_match_threshold {
                return StageFlow::Done(knowledge_reply(top));
            }
        }

        // Precision guard: a domain query with no sourced answer is a miss,
        // not an invitation for the generation backend to invent one.
        let lowered = text.to_lowercase();
        if self.trigger_terms.iter().any(|t| lowered.contains(t.as_str())) {
            return StageFlow::Done(RouteReply {
                text: "I don't have a reliably sourced entry for that. Rather than guess \
                       on matters of religion, I'd suggest consulting a qualified scholar."
                    .to_string(),
                metadata: BTreeMap::from([("type".to_string(), "kb_miss".to_string())]),
            });
        }

        StageFlow::Continue
    }

    fn stage_generation(
        &mut self,
        state: &mut SessionState,
        text: &str,
        ctx: &mut TurnContext,
    ) -> StageFlow {
        let hints = state.mode.hints();
        let mode_hint = format!("tone={}; verbosity={}", hints.tone, hints.verbosity);
        let reply = self.llm.generate(text, &mode_hint);

        let combined = match ctx.advisory.take() {
            Some(advisory) => format!("{advisory} {}", reply.text),
            None => reply.text,
        };

        state.remember(format!("user:{text}"));
        state.remember(format!("assistant:{combined}"));

        let mut metadata = reply.metadata;
        metadata.insert("type".to_string(), "llm".to_string());
        StageFlow::Done(RouteReply {
            text: combined,
            metadata,
        })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("strong_match_threshold", &self.strong_match_threshold)
            .field("search_limit", &self.search_limit)
            .finish()
    }
}

/// Render a strong knowledge hit as a structured reply.
fn knowledge_reply(hit: &KnowledgeHit) -> RouteReply {
    let card = &hit.card;

    let mut sections = vec![card.title.clone()];
    let mut body = Vec::new();
    if let Some(arabic) = &card.arabic {
        body.push(arabic.clone());
    }
    if let Some(translation) = &card.translation_en {
        body.push(translation.clone());
    }
    if !body.is_empty() {
        sections.push(body.join("\n"));
    }
    if let Some(explanation) = &card.explanation {
        sections.push(explanation.clone());
    }
    let mut source = format!("Source: {} ({})", card.source_name, card.reference);
    if let Some(grade) = &card.auth_grade {
        source.push_str(&format!("\nGrade: {grade}"));
    }
    sections.push(source);

    RouteReply {
        text: sections.join("\n\n"),
        metadata: BTreeMap::from([
            ("type".to_string(), "kb".to_string()),
            ("match".to_string(), "strong".to_string()),
            ("card_id".to_string(), card.id.to_string()),
            ("score".to_string(), format!("{:.2}", hit.score)),
        ]),
    }
}
