//! # rafiq
//!
//! A local conversational assistant front-end. Every utterance is routed
//! through a strict-order pipeline: internal command, then safety gate, then
//! curated knowledge lookup, then (only as a last resort) a cloud generation
//! backend with offline fallback.
//!
//! ## Architecture
//!
//! - **Modes** (`modes`): closed set of operating modes with tone/verbosity hints
//! - **Session state** (`state`): current mode, bounded history, capability flags
//! - **Knowledge base** (`kb`): curated reference cards in redb with scored free-text search
//! - **Safety gate** (`safety`): stateless block / pass / pass-with-disclaimer classifier
//! - **Commands** (`commands`): closed grammar of administrative directives
//! - **Router** (`router`): ordered short-circuiting stage pipeline
//! - **Generation** (`llm`): blocking cloud client that degrades to offline replies
//!
//! ## Library usage
//!
//! ```no_run
//! use rafiq::commands::{CommandInterpreter, NoPrompts};
//! use rafiq::config::Settings;
//! use rafiq::kb::KnowledgeBase;
//! use rafiq::llm::CloudLlm;
//! use rafiq::router::Router;
//! use rafiq::state::SessionState;
//!
//! let settings = Settings::default();
//! let kb = KnowledgeBase::new("kb.redb");
//! kb.seed_if_empty().unwrap();
//!
//! let commands = CommandInterpreter::new(kb.clone(), settings.search_limit, Box::new(NoPrompts));
//! let llm = Box::new(CloudLlm::from_env(settings.llm.clone()));
//! let mut router = Router::new(&settings, commands, kb, llm);
//! let mut state = SessionState::new(&settings);
//!
//! let reply = router.route(&mut state, "kb:search patience");
//! println!("{}", reply.text);
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod kb;
pub mod llm;
pub mod modes;
pub mod paths;
pub mod repl;
pub mod router;
pub mod safety;
pub mod state;
