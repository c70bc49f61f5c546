//! Line-reading REPL: thin I/O glue around the router.
//!
//! One utterance per line, routed to completion before the next line is
//! read. End-of-input, an interrupt, or `quit`/`exit` end the session
//! normally; this loop has no other exit paths.

use std::io::{self, BufRead, Write};

use crate::commands::{CommandInterpreter, PromptSource};
use crate::config::Settings;
use crate::error::RafiqResult;
use crate::kb::KnowledgeBase;
use crate::llm::CloudLlm;
use crate::router::Router;
use crate::state::SessionState;

/// Interactive field capture for `kb:add`, reading from stdin.
pub struct StdinPrompts;

impl PromptSource for StdinPrompts {
    fn line(&mut self, label: &str) -> io::Result<String> {
        print!("{label}: ");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_string())
    }

    fn multiline(&mut self, label: &str) -> io::Result<Option<String>> {
        println!("{label}");
        println!("Finish with a single '.' on its own line.");
        let mut lines = Vec::new();
        loop {
            let mut buf = String::new();
            if io::stdin().read_line(&mut buf)? == 0 {
                break;
            }
            let line = buf.trim_end_matches(['\n', '\r']);
            if line.trim() == "." {
                break;
            }
            lines.push(line.to_string());
        }
        let text = lines.join("\n").trim().to_string();
        Ok((!text.is_empty()).then_some(text))
    }
}

/// Run the interactive session until end-of-input or an explicit quit.
pub fn run(settings: &Settings, kb: KnowledgeBase) -> RafiqResult<()> {
    kb.init()?;
    kb.seed_if_empty()?;

    let commands =
        CommandInterpreter::new(kb.clone(), settings.search_limit, Box::new(StdinPrompts));
    let llm = Box::new(CloudLlm::from_env(settings.llm.clone()));
    let mut router = Router::new(settings, commands, kb, llm);
    let mut state = SessionState::new(settings);

    println!("rafiq REPL. Type 'quit' to exit.");
    loop {
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                println!("\nGoodbye.");
                break;
            }
            Ok(_) => {}
        }

        let text = line.trim();
        if text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit") {
            println!("Goodbye.");
            break;
        }
        if text.is_empty() {
            continue;
        }

        let reply = router.route(&mut state, text);
        println!("response: {}", reply.text);
        println!(
            "metadata: {}",
            serde_json::to_string(&reply.metadata).unwrap_or_else(|_| "{}".to_string())
        );
    }

    Ok(())
}
