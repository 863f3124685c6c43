//! `lexintake run`: one-shot intake turn.
//!
//! Sends a single client message through the pipeline, prints the reply
//! and exits. Useful for scripting and for trying rule changes quickly.

use std::sync::Arc;

use li_domain::config::Config;
use li_domain::message::{Attachment, Message};

use crate::bootstrap;
use crate::runtime::{run_turn, TurnInput, TurnReply};

/// Execute a single turn and print the reply.
///
/// This is the entry point for `lexintake run --team <id> "message"`.
pub async fn run(
    config: Arc<Config>,
    message: String,
    team_id: String,
    session_id: String,
    attachment_urls: Vec<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    // 1. Boot the full runtime (without background tasks).
    let state = bootstrap::build_app_state(config).await?;

    // 2. Build the turn input.
    let input = TurnInput {
        session_id,
        team_id,
        messages: vec![Message::user(message)],
        attachments: attachment_urls.iter().map(|u| attachment_from_url(u)).collect(),
    };

    // 3. Run the turn.
    let result = run_turn(&state, input).await;

    // 4. Flush the store before reporting, so a failed turn still persists
    //    earlier writes.
    if let Err(e) = state.store.flush().await {
        tracing::warn!(error = %e, "context store flush on exit failed");
    }

    let output = result?;
    if json_output {
        let json = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("serializing turn output: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    for record in &output.tool_results {
        eprintln!("\x1b[2m[tool: {}]\x1b[0m", record.tool_name);
    }
    match &output.reply {
        TurnReply::AiHandle { sentinel } => {
            eprintln!("\x1b[2m(no stage answered; configure [capabilities.agent] to reply)\x1b[0m");
            println!("{sentinel}");
        }
        reply => println!("{}", reply.text()),
    }
    Ok(())
}

/// Treat a bare URL as an upload named after its last path segment.
pub(crate) fn attachment_from_url(url: &str) -> Attachment {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_owned();
    Attachment {
        name,
        size: 0,
        mime_type: String::new(),
        url: url.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_name_comes_from_path() {
        let a = attachment_from_url("https://files.example/uploads/lease.pdf?sig=abc");
        assert_eq!(a.name, "lease.pdf");
        assert_eq!(a.url, "https://files.example/uploads/lease.pdf?sig=abc");
    }

    #[test]
    fn attachment_without_path_gets_generic_name() {
        assert_eq!(attachment_from_url("https://files.example.com/").name, "files.example.com");
        assert_eq!(attachment_from_url("").name, "upload");
    }
}
