//! Administrative directive grammar.
//!
//! A closed set of case-insensitive prefixes handled against session state
//! and the knowledge base. Anything else reports `handled=false` and falls
//! through the pipeline. Every failure inside a directive (bad id, missing
//! card, store error, rejected validation) becomes a handled-but-failed
//! outcome; nothing here returns an error.

use std::collections::BTreeMap;

use tracing::warn;

use crate::kb::{KnowledgeBase, NewCard};
use crate::modes::{Mode, parse_mode};
use crate::state::SessionState;

/// The result of one parse attempt.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub handled: bool,
    pub output: String,
    pub metadata: BTreeMap<String, String>,
}

impl CommandOutcome {
    fn unhandled() -> Self {
        Self {
            handled: false,
            output: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn handled(output: impl Into<String>, metadata: BTreeMap<String, String>) -> Self {
        Self {
            handled: true,
            output: output.into(),
            metadata,
        }
    }
}

fn command_meta(name: &str, success: bool) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("type".to_string(), "command".to_string()),
        ("name".to_string(), name.to_string()),
        (
            "success".to_string(),
            if success { "true" } else { "false" }.to_string(),
        ),
    ])
}

/// Capture mechanism for the multi-field `kb:add` directive.
///
/// The interpreter's contract is I/O-free: given a populated field set it
/// invokes `add_card` and echoes the result. The REPL supplies a stdin
/// implementation; tests supply a scripted one.
pub trait PromptSource {
    /// Capture a single-line field value.
    fn line(&mut self, label: &str) -> std::io::Result<String>;

    /// Capture an optional multiline field value; `None` when left empty.
    fn multiline(&mut self, label: &str) -> std::io::Result<Option<String>>;
}

/// A prompt source for non-interactive contexts: every field reads empty.
pub struct NoPrompts;

impl PromptSource for NoPrompts {
    fn line(&mut self, _label: &str) -> std::io::Result<String> {
        Ok(String::new())
    }

    fn multiline(&mut self, _label: &str) -> std::io::Result<Option<String>> {
        Ok(None)
    }
}

/// Parses administrative directives against session state and the store.
pub struct CommandInterpreter {
    kb: KnowledgeBase,
    search_limit: usize,
    prompts: Box<dyn PromptSource>,
}

impl CommandInterpreter {
    pub fn new(kb: KnowledgeBase, search_limit: usize, prompts: Box<dyn PromptSource>) -> Self {
        Self {
            kb,
            search_limit,
            prompts,
        }
    }

    /// Attempt to interpret `text` as a directive.
    pub fn parse(&mut self, text: &str, state: &mut SessionState) -> CommandOutcome {
        let cleaned = text.trim();
        if cleaned.is_empty() {
            return CommandOutcome::unhandled();
        }
        let lowered = cleaned.to_lowercase();

        if lowered.starts_with("mode:") {
            return self.switch_mode(cleaned, state);
        }
        if lowered == "status" {
            return self.status(state);
        }
        if lowered.starts_with("kb:search ") {
            return self.kb_search(arg_after(cleaned));
        }
        if lowered.starts_with("kb:show ") {
            return self.kb_show(arg_after(cleaned));
        }
        if lowered.starts_with("kb:delete ") {
            return self.kb_delete(arg_after(cleaned));
        }
        if lowered.starts_with("kb:export ") {
            return self.kb_export(arg_after(cleaned));
        }
        if lowered == "kb:add" {
            return self.kb_add();
        }
        if lowered == "memory:show" {
            return self.memory_show(state);
        }

        CommandOutcome::unhandled()
    }

    fn switch_mode(&self, cleaned: &str, state: &mut SessionState) -> CommandOutcome {
        let name = cleaned.split_once(':').map(|(_, rest)| rest).unwrap_or("");
        match parse_mode(name) {
            Some(mode) => {
                state.mode = mode;
                CommandOutcome::handled(format!("Mode set to {mode}."), command_meta("mode", true))
            }
            None => {
                let allowed: Vec<&str> = Mode::ALL.iter().map(|m| m.as_str()).collect();
                CommandOutcome::handled(
                    format!(
                        "Unknown mode '{}'. Allowed: {}",
                        name.trim(),
                        allowed.join(", ")
                    ),
                    command_meta("mode", false),
                )
            }
        }
    }

    fn status(&self, state: &SessionState) -> CommandOutcome {
        let capabilities: Vec<String> = state
            .capabilities
            .iter()
            .map(|(k, v)| format!("{k}={}", if *v { "on" } else { "off" }))
            .collect();
        CommandOutcome::handled(
            format!(
                "mode={}; capabilities: {}",
                state.mode,
                capabilities.join(", ")
            ),
            command_meta("status", true),
        )
    }

    fn kb_search(&self, query: &str) -> CommandOutcome {
        let hits = match self.kb.search(query, self.search_limit) {
            Ok(hits) => hits,
            Err(e) => return store_failure("kb_search", &e),
        };
        if hits.is_empty() {
            let mut meta = command_meta("kb_search", true);
            meta.insert("count".into(), "0".into());
            return CommandOutcome::handled("No KB hits found.", meta);
        }
        let lines: Vec<String> = hits
            .iter()
            .map(|h| {
                format!(
                    "{} | {} | {} | {:.2}",
                    h.card.id, h.card.kind, h.card.title, h.score
                )
            })
            .collect();
        let mut meta = command_meta("kb_search", true);
        meta.insert("count".into(), hits.len().to_string());
        CommandOutcome::handled(lines.join("\n"), meta)
    }

    fn kb_show(&self, arg: &str) -> CommandOutcome {
        let Some(id) = parse_id(arg) else {
            return CommandOutcome::handled("Invalid KB id.", command_meta("kb_show", false));
        };
        let card = match self.kb.get_card(id) {
            Ok(card) => card,
            Err(e) => return store_failure("kb_show", &e),
        };
        let Some(card) = card else {
            return CommandOutcome::handled("Card not found.", command_meta("kb_show", false));
        };
        let output = format!(
            "type: {}\ntitle: {}\narabic: {}\ntranslation: {}\nexplanation: {}\n\
             source_name: {}\nreference: {}\nauth_grade: {}\ntags: {}",
            card.kind,
            card.title,
            card.arabic.as_deref().unwrap_or(""),
            card.translation_en.as_deref().unwrap_or(""),
            card.explanation.as_deref().unwrap_or(""),
            card.source_name,
            card.reference,
            card.auth_grade.as_deref().unwrap_or(""),
            card.tags.as_deref().unwrap_or(""),
        );
        let mut meta = command_meta("kb_show", true);
        meta.insert("card_id".into(), card.id.to_string());
        CommandOutcome::handled(output, meta)
    }

    fn kb_delete(&self, arg: &str) -> CommandOutcome {
        let Some(id) = parse_id(arg) else {
            return CommandOutcome::handled("Invalid KB id.", command_meta("kb_delete", false));
        };
        let deleted = match self.kb.delete_card(id) {
            Ok(deleted) => deleted,
            Err(e) => return store_failure("kb_delete", &e),
        };
        let mut meta = command_meta("kb_delete", deleted);
        meta.insert("card_id".into(), id.to_string());
        CommandOutcome::handled(if deleted { "Deleted." } else { "Card not found." }, meta)
    }

    fn kb_export(&self, arg: &str) -> CommandOutcome {
        match self.kb.export_json(std::path::Path::new(arg)) {
            Ok(path) => {
                let mut meta = command_meta("kb_export", true);
                meta.insert("path".into(), path.display().to_string());
                CommandOutcome::handled(format!("Exported KB to {}", path.display()), meta)
            }
            Err(e) => store_failure("kb_export", &e),
        }
    }

    fn kb_add(&mut self) -> CommandOutcome {
        let captured = (|| -> std::io::Result<NewCard> {
            Ok(NewCard {
                kind: self.prompts.line("type")?,
                title: self.prompts.line("title")?,
                source_name: self.prompts.line("source_name")?,
                reference: self.prompts.line("reference")?,
                auth_grade: optional(self.prompts.line("auth_grade (optional)")?),
                tags: optional(self.prompts.line("tags (optional)")?),
                arabic: self.prompts.multiline("arabic (optional multiline)")?,
                translation_en: self.prompts.multiline("translation (optional multiline)")?,
                explanation: self.prompts.multiline("explanation (optional multiline)")?,
            })
        })();

        let new = match captured {
            Ok(new) => new,
            Err(e) => {
                warn!(error = %e, "field capture failed");
                return CommandOutcome::handled(
                    "Input capture failed; card not added.",
                    command_meta("kb_add", false),
                );
            }
        };

        match self.kb.add_card(new) {
            Ok(card) => {
                let mut meta = command_meta("kb_add", true);
                meta.insert("card_id".into(), card.id.to_string());
                CommandOutcome::handled(
                    format!("Added KB card #{}: {}", card.id, card.title),
                    meta,
                )
            }
            Err(e) => CommandOutcome::handled(format!("{e}"), command_meta("kb_add", false)),
        }
    }

    fn memory_show(&self, state: &SessionState) -> CommandOutcome {
        CommandOutcome::handled(
            format!("Memory view: {}", state.recent(5).join(" | ")),
            command_meta("memory_show", true),
        )
    }
}

fn arg_after(cleaned: &str) -> &str {
    cleaned
        .split_once(' ')
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

fn parse_id(arg: &str) -> Option<u64> {
    arg.parse().ok()
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn store_failure(name: &str, error: &crate::error::KbError) -> CommandOutcome {
    warn!(command = name, error = %error, "knowledge base operation failed");
    CommandOutcome::handled("Knowledge base error; see logs.", command_meta(name, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    use crate::modes::Mode;

    /// Scripted prompt source: pops queued answers in capture order.
    struct Scripted {
        lines: VecDeque<String>,
        blocks: VecDeque<Option<String>>,
    }

    impl Scripted {
        fn new(lines: &[&str], blocks: &[Option<&str>]) -> Self {
            Self {
                lines: lines.iter().map(|s| s.to_string()).collect(),
                blocks: blocks.iter().map(|b| b.map(str::to_string)).collect(),
            }
        }
    }

    impl PromptSource for Scripted {
        fn line(&mut self, _label: &str) -> std::io::Result<String> {
            Ok(self.lines.pop_front().unwrap_or_default())
        }

        fn multiline(&mut self, _label: &str) -> std::io::Result<Option<String>> {
            Ok(self.blocks.pop_front().unwrap_or(None))
        }
    }

    fn interpreter(dir: &TempDir) -> CommandInterpreter {
        let kb = KnowledgeBase::new(dir.path().join("kb.redb"));
        kb.init().unwrap();
        CommandInterpreter::new(kb, 5, Box::new(NoPrompts))
    }

    #[test]
    fn mode_switch_mutates_state() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        let outcome = interp.parse("mode:tutor", &mut state);
        assert!(outcome.handled);
        assert_eq!(state.mode, Mode::Tutor);
        assert_eq!(outcome.metadata["success"], "true");
    }

    #[test]
    fn invalid_mode_lists_allowed_without_mutating() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        let outcome = interp.parse("mode:pirate", &mut state);
        assert!(outcome.handled);
        assert_eq!(outcome.metadata["success"], "false");
        assert!(outcome.output.contains("general, tutor, focus, health, mood"));
        assert_eq!(state.mode, Mode::General);
    }

    #[test]
    fn status_renders_mode_and_capabilities() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        let outcome = interp.parse("STATUS", &mut state);
        assert!(outcome.handled);
        assert!(outcome.output.contains("mode=general"));
        assert!(outcome.output.contains("cloud_llm=on"));
    }

    #[test]
    fn kb_search_reports_count() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("kb.redb"));
        kb.seed_if_empty().unwrap();
        let mut interp = CommandInterpreter::new(kb, 5, Box::new(NoPrompts));
        let mut state = SessionState::default();

        let outcome = interp.parse("kb:search patience", &mut state);
        assert!(outcome.handled);
        assert_ne!(outcome.metadata["count"], "0");

        let miss = interp.parse("kb:search zzzzzz", &mut state);
        assert_eq!(miss.output, "No KB hits found.");
        assert_eq!(miss.metadata["count"], "0");
    }

    #[test]
    fn kb_show_rejects_non_integer_id() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        let outcome = interp.parse("kb:show abc", &mut state);
        assert!(outcome.handled);
        assert_eq!(outcome.output, "Invalid KB id.");
        assert_eq!(outcome.metadata["success"], "false");
    }

    #[test]
    fn kb_show_missing_card_is_a_handled_failure() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        let outcome = interp.parse("kb:show 99", &mut state);
        assert_eq!(outcome.output, "Card not found.");
        assert_eq!(outcome.metadata["success"], "false");
    }

    #[test]
    fn kb_delete_is_idempotent_at_the_command_level() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("kb.redb"));
        kb.init().unwrap();
        let card = kb
            .add_card(NewCard {
                kind: "dua".into(),
                title: "t".into(),
                source_name: "s".into(),
                reference: "r".into(),
                ..Default::default()
            })
            .unwrap();
        let mut interp = CommandInterpreter::new(kb, 5, Box::new(NoPrompts));
        let mut state = SessionState::default();

        let first = interp.parse(&format!("kb:delete {}", card.id), &mut state);
        assert_eq!(first.output, "Deleted.");
        let second = interp.parse(&format!("kb:delete {}", card.id), &mut state);
        assert_eq!(second.output, "Card not found.");
        assert_eq!(second.metadata["success"], "false");
    }

    #[test]
    fn kb_add_with_scripted_fields_inserts_and_echoes() {
        let dir = TempDir::new().unwrap();
        let kb = KnowledgeBase::new(dir.path().join("kb.redb"));
        kb.init().unwrap();
        let prompts = Scripted::new(
            &["dua", "Scripted Dua", "Test Source", "T9", "", "calm,test"],
            &[None, Some("A scripted dua"), None],
        );
        let mut interp = CommandInterpreter::new(kb.clone(), 5, Box::new(prompts));
        let mut state = SessionState::default();

        let outcome = interp.parse("kb:add", &mut state);
        assert!(outcome.handled);
        assert_eq!(outcome.metadata["success"], "true");
        assert!(outcome.output.contains("Scripted Dua"));

        let id: u64 = outcome.metadata["card_id"].parse().unwrap();
        let stored = kb.get_card(id).unwrap().unwrap();
        assert_eq!(stored.tags.as_deref(), Some("calm,test"));
        assert_eq!(stored.translation_en.as_deref(), Some("A scripted dua"));
    }

    #[test]
    fn kb_add_validation_failure_is_a_handled_outcome() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        // NoPrompts leaves every required field empty.
        let outcome = interp.parse("kb:add", &mut state);
        assert!(outcome.handled);
        assert_eq!(outcome.metadata["success"], "false");
        assert!(outcome.output.contains("type"));
    }

    #[test]
    fn memory_show_renders_last_five() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();
        for i in 0..7 {
            state.remember(format!("h{i}"));
        }

        let outcome = interp.parse("memory:show", &mut state);
        assert!(outcome.output.contains("h6"));
        assert!(!outcome.output.contains("h1"));
    }

    #[test]
    fn unrecognized_input_falls_through() {
        let dir = TempDir::new().unwrap();
        let mut interp = interpreter(&dir);
        let mut state = SessionState::default();

        assert!(!interp.parse("tell me about patience", &mut state).handled);
        assert!(!interp.parse("", &mut state).handled);
    }
}
