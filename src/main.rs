//! rafiq CLI: local assistant with curated knowledge routing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use rafiq::commands::{CommandInterpreter, NoPrompts};
use rafiq::config::Settings;
use rafiq::kb::{KnowledgeBase, NewCard};
use rafiq::llm::CloudLlm;
use rafiq::paths::RafiqPaths;
use rafiq::repl;
use rafiq::router::Router;
use rafiq::state::SessionState;

#[derive(Parser)]
#[command(name = "rafiq", version, about = "Local assistant with curated knowledge routing")]
struct Cli {
    /// Data directory for persistent storage.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (defaults to the XDG config location).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive session (the default).
    Repl,

    /// Route a single utterance and print the reply.
    Ask {
        /// The utterance; multiple words are joined with spaces.
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Initialize the data directory and seed the knowledge base.
    Init,

    /// Inspect and maintain the knowledge base.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },
}

#[derive(Subcommand)]
enum KbAction {
    /// Scored free-text search over the card store.
    Search {
        query: String,

        /// Number of hits to return.
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Show a card by id.
    Show {
        id: u64,
    },

    /// Add a card from field flags (the non-interactive capture path).
    Add {
        /// Category tag: ayah, hadith, dua, dhikr, concept, ...
        #[arg(long = "type")]
        kind: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        source_name: String,

        #[arg(long)]
        reference: String,

        #[arg(long)]
        arabic: Option<String>,

        #[arg(long)]
        translation: Option<String>,

        #[arg(long)]
        explanation: Option<String>,

        #[arg(long)]
        auth_grade: Option<String>,

        /// Comma-separated tag string.
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a card by id.
    Delete {
        id: u64,
    },

    /// Export all cards as a pretty-printed JSON array.
    Export {
        path: PathBuf,
    },

    /// Apply the bundled catalogue to an empty store.
    Seed,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = RafiqPaths::resolve()?;
    let config_path = cli.config.unwrap_or_else(|| paths.config_file());
    let settings = Settings::load(&config_path)?;
    let data_dir = cli.data_dir.unwrap_or_else(|| paths.data_dir.clone());
    RafiqPaths::ensure_data_dir(&data_dir)?;
    let kb = KnowledgeBase::new(RafiqPaths::kb_file(&data_dir));

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => repl::run(&settings, kb)?,

        Commands::Ask { text } => {
            kb.init()?;
            kb.seed_if_empty()?;
            let commands =
                CommandInterpreter::new(kb.clone(), settings.search_limit, Box::new(NoPrompts));
            let llm = Box::new(CloudLlm::from_env(settings.llm.clone()));
            let mut router = Router::new(&settings, commands, kb, llm);
            let mut state = SessionState::new(&settings);

            let reply = router.route(&mut state, &text.join(" "));
            println!("response: {}", reply.text);
            println!(
                "metadata: {}",
                serde_json::to_string(&reply.metadata).into_diagnostic()?
            );
        }

        Commands::Init => {
            let seeded = kb.seed_if_empty()?;
            println!("Initialized rafiq at {}", data_dir.display());
            println!("Knowledge base: {} cards ({seeded} seeded)", kb.count()?);
        }

        Commands::Kb { action } => match action {
            KbAction::Search { query, limit } => {
                let hits = kb.search(&query, limit)?;
                if hits.is_empty() {
                    println!("No KB hits found.");
                } else {
                    for hit in &hits {
                        println!(
                            "{} | {} | {} | {:.2}",
                            hit.card.id, hit.card.kind, hit.card.title, hit.score
                        );
                    }
                }
            }

            KbAction::Show { id } => match kb.get_card(id)? {
                Some(card) => {
                    println!("type:        {}", card.kind);
                    println!("title:       {}", card.title);
                    println!("arabic:      {}", card.arabic.as_deref().unwrap_or(""));
                    println!(
                        "translation: {}",
                        card.translation_en.as_deref().unwrap_or("")
                    );
                    println!("explanation: {}", card.explanation.as_deref().unwrap_or(""));
                    println!("source_name: {}", card.source_name);
                    println!("reference:   {}", card.reference);
                    println!("auth_grade:  {}", card.auth_grade.as_deref().unwrap_or(""));
                    println!("tags:        {}", card.tags.as_deref().unwrap_or(""));
                    println!("created_at:  {}", card.created_at);
                }
                None => println!("Card not found."),
            },

            KbAction::Add {
                kind,
                title,
                source_name,
                reference,
                arabic,
                translation,
                explanation,
                auth_grade,
                tags,
            } => {
                let card = kb.add_card(NewCard {
                    kind,
                    title,
                    source_name,
                    reference,
                    arabic,
                    translation_en: translation,
                    explanation,
                    auth_grade,
                    tags,
                })?;
                println!("Added KB card #{}: {}", card.id, card.title);
            }

            KbAction::Delete { id } => {
                if kb.delete_card(id)? {
                    println!("Deleted.");
                } else {
                    println!("Card not found.");
                }
            }

            KbAction::Export { path } => {
                let out = kb.export_json(&path)?;
                println!("Exported KB to {}", out.display());
            }

            KbAction::Seed => {
                let seeded = kb.seed_if_empty()?;
                if seeded > 0 {
                    println!("Seeded {seeded} cards.");
                } else {
                    println!("Store is not empty; nothing seeded.");
                }
            }
        },
    }

    Ok(())
}
