//! `lexintake chat`: interactive intake REPL.
//!
//! Opens a readline loop that plays the client side of an intake
//! conversation. The transcript is kept locally and sent in full each turn,
//! the way a chat widget would.

use std::sync::Arc;

use li_domain::config::Config;
use li_domain::message::{Attachment, Message};

use crate::bootstrap;
use crate::runtime::{run_turn, TurnInput, TurnReply};
use crate::state::AppState;

use super::run::attachment_from_url;

struct ChatSession {
    team_id: String,
    session_id: String,
    transcript: Vec<Message>,
    pending_attachments: Vec<Attachment>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the interactive chat REPL.
///
/// Boots the full runtime (including background tasks for store flushing),
/// then enters a readline loop that sends each line as a client message.
pub async fn chat(config: Arc<Config>, team_id: String, session_id: String) -> anyhow::Result<()> {
    // 1. Boot the full runtime.
    let state = bootstrap::build_app_state(config).await?;
    if state.team(&team_id).is_none() {
        anyhow::bail!("unknown team '{team_id}' (add it under [teams.{team_id}] in the config)");
    }

    // 2. Spawn background tasks (chat is long-lived).
    bootstrap::spawn_background_tasks(&state);

    // 3. Initialize rustyline editor with persistent history.
    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".lexintake")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    let mut session = ChatSession {
        team_id,
        session_id,
        transcript: Vec::new(),
        pending_attachments: Vec::new(),
    };

    // 4. Print welcome message to stderr (keep stdout clean for output).
    eprintln!("LexIntake interactive chat");
    eprintln!(
        "Team: {}  |  Session: {}  |  Type /help for commands, Ctrl+D to exit",
        session.team_id, session.session_id
    );
    eprintln!();

    // 5. REPL loop.
    loop {
        match rl.readline("client> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                // ── Slash commands ────────────────────────────────
                if trimmed.starts_with('/') {
                    if handle_slash_command(&state, trimmed, &mut session).await {
                        break;
                    }
                    continue;
                }

                // ── Client message → intake turn ─────────────────
                if let Err(e) = send_message(&state, &mut session, trimmed).await {
                    eprintln!("\x1B[31merror: {e}\x1B[0m");
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    // 6. Save history.
    rl.save_history(&history_path).ok();

    // 7. Flush contexts before exit.
    state.store.flush().await.ok();

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash command handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process a slash command. Returns `true` if the REPL should exit.
async fn handle_slash_command(state: &AppState, input: &str, session: &mut ChatSession) -> bool {
    let (cmd, arg) = match input.split_once(' ') {
        Some((c, a)) => (c, Some(a.trim()).filter(|a| !a.is_empty())),
        None => (input, None),
    };

    match cmd {
        "/exit" | "/quit" => return true,

        "/session" => match arg {
            Some(id) => {
                session.session_id = id.to_owned();
                session.transcript.clear();
                eprintln!("Session switched to: {id}");
            }
            None => {
                eprintln!("Current session: {}", session.session_id);
                eprintln!("Usage: /session <id>");
            }
        },

        "/attach" => match arg {
            Some(url) => {
                let attachment = attachment_from_url(url);
                eprintln!("Attached {} (sent with your next message)", attachment.name);
                session.pending_attachments.push(attachment);
            }
            None => eprintln!("Usage: /attach <url>"),
        },

        "/context" => match state.store.get(&session.session_id, &session.team_id).await {
            Ok(Some(ctx)) => match serde_json::to_string_pretty(&ctx) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
            },
            Ok(None) => eprintln!("(no context stored for this session yet)"),
            Err(e) => eprintln!("\x1B[31merror: {e}\x1B[0m"),
        },

        "/reset" => {
            let ts = chrono::Utc::now().timestamp();
            session.session_id = format!("{}:{ts}", session.session_id);
            session.transcript.clear();
            session.pending_attachments.clear();
            eprintln!("Session reset. New session id: {}", session.session_id);
        }

        "/help" => {
            eprintln!("Commands:");
            eprintln!("  /session <id>    Switch to another session");
            eprintln!("  /attach <url>    Upload a file with the next message");
            eprintln!("  /context         Show the stored conversation context");
            eprintln!("  /reset           Start a fresh session (new id)");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }

        other => eprintln!("Unknown command: {other}  (type /help for a list)"),
    }

    false
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turns
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_message(state: &AppState, session: &mut ChatSession, text: &str) -> anyhow::Result<()> {
    session.transcript.push(Message::user(text));

    let input = TurnInput {
        session_id: session.session_id.clone(),
        team_id: session.team_id.clone(),
        messages: session.transcript.clone(),
        attachments: std::mem::take(&mut session.pending_attachments),
    };
    let output = run_turn(state, input).await?;

    for record in &output.tool_results {
        eprintln!("\x1B[2m[tool: {}]\x1B[0m", record.tool_name);
    }
    match &output.reply {
        TurnReply::AiHandle { .. } => {
            eprintln!("\x1B[2m(no stage answered and no agent is configured)\x1B[0m");
        }
        reply => {
            println!("{}", reply.text());
            println!();
            session.transcript.push(Message::assistant(reply.text()));
        }
    }
    Ok(())
}
