use std::io::Write;

use anyhow::Result;
use futures::StreamExt;
use providers::groq::GroqClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tutor_core::llm::{ChatError, Message, Role};
use tutor_core::modes::{ModeDispatcher, ModeSelection, QueryResponse, StreamSummary};
use tutor_core::session::SessionStore;

use crate::commands::{self, Input, SlashCommand};
use crate::strings;

enum Flow {
    Continue,
    Quit,
}

pub async fn run(
    client: &GroqClient,
    dispatcher: &ModeDispatcher,
    store: &SessionStore,
    mut selection: ModeSelection,
    streaming: bool,
) -> Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    store.create_session(&session_id).await;
    info!(target: "cli", "chat session={} {}", session_id, strings::describe_selection(&selection));
    println!("{}", strings::banner(&selection, streaming));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", strings::PREFIX_USER);
        std::io::stdout().flush()?;
        // A fresh listener per prompt so a Ctrl-C that stopped the last
        // reply does not also end the session.
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match commands::parse_input(&line) {
            Err(e) => println!("{}", e),
            Ok(Input::Empty) => {}
            Ok(Input::Command(cmd)) => {
                if let Flow::Quit = apply(cmd, &mut selection, store, &session_id).await {
                    break;
                }
            }
            Ok(Input::Message(text)) => {
                let history = store.get_conversation(&session_id).await;
                store.add_message(&session_id, Role::User, &text, None).await;
                store.record_mode(&session_id, selection.mode).await;

                let reply = if streaming {
                    stream_reply(client, dispatcher, &text, &selection, &history).await
                } else {
                    batch_reply(client, dispatcher, &text, &selection, &history).await
                };
                match reply {
                    Ok(Some(out)) => {
                        let meta = serde_json::to_value(&out.metadata)?;
                        store
                            .add_message(&session_id, Role::Assistant, &out.response, Some(meta))
                            .await;
                        print!("{}", strings::format_suggestions(&out.suggestions));
                        println!("{}", strings::format_metadata(&out.metadata));
                    }
                    Ok(None) => println!("\n(stopped)"),
                    Err(e) => {
                        error!(target: "cli", "reply failed: {}", e);
                        println!("\nerror: {}", e);
                    }
                }
            }
        }
    }
    Ok(())
}

async fn apply(
    cmd: SlashCommand,
    selection: &mut ModeSelection,
    store: &SessionStore,
    session_id: &str,
) -> Flow {
    match cmd {
        SlashCommand::Mode(m) => selection.mode = m,
        SlashCommand::Level(l) => selection.complexity = l,
        SlashCommand::Project(p) => selection.project_type = p,
        SlashCommand::Context(c) => selection.extra_context = c,
        SlashCommand::Session => {
            if let Some(info) = store.get_session(session_id).await {
                let modes: Vec<&str> = info.mode_history.iter().map(|m| m.as_str()).collect();
                println!(
                    "session {}: {} messages, {} tokens, modes [{}], started {}",
                    info.session_id,
                    info.message_count,
                    info.total_tokens,
                    modes.join(", "),
                    info.created_at.format("%H:%M:%S")
                );
            }
            return Flow::Continue;
        }
        SlashCommand::Help => {
            println!("{}", strings::HELP);
            return Flow::Continue;
        }
        SlashCommand::Quit => return Flow::Quit,
    }
    println!("{}", strings::describe_selection(selection));
    Flow::Continue
}

/// `Ok(None)` when the user pressed Ctrl-C; dropping the stream aborts the
/// HTTP read.
async fn stream_reply(
    client: &GroqClient,
    dispatcher: &ModeDispatcher,
    text: &str,
    selection: &ModeSelection,
    history: &[Message],
) -> Result<Option<QueryResponse>, ChatError> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stream = tokio::select! {
        s = dispatcher.stream_query(client, text, selection, history) => s?,
        _ = &mut ctrl_c => return Ok(None),
    };
    let mut summary = StreamSummary::new(selection, dispatcher.model());
    let mut out = std::io::stdout();
    print!("{}", strings::PREFIX_ASSISTANT);
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    if let Some(t) = &fragment.delta_text {
                        print!("{}", t);
                        let _ = out.flush();
                    }
                    summary.absorb(&fragment);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
            _ = &mut ctrl_c => return Ok(None),
        }
    }
    println!();
    println!();
    Ok(Some(summary.finish()))
}

async fn batch_reply(
    client: &GroqClient,
    dispatcher: &ModeDispatcher,
    text: &str,
    selection: &ModeSelection,
    history: &[Message],
) -> Result<Option<QueryResponse>, ChatError> {
    tokio::select! {
        out = dispatcher.process_query(client, text, selection, history) => {
            let out = out?;
            println!("{}{}", strings::PREFIX_ASSISTANT, out.response);
            println!();
            Ok(Some(out))
        }
        _ = tokio::signal::ctrl_c() => Ok(None),
    }
}
