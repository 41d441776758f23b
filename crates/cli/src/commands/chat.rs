//! `codewright chat`: Interactive or single-message coding session.

use codewright_agent::{AddReport, AgentStreamEvent, LoopOutcome, LoopStatus, Session};
use codewright_config::AppConfig;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::render::Renderer;

/// Skipped files listed individually after an `/add`.
const SKIPPED_SHOWN: usize = 10;

/// One line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Empty,
    Exit,
    Add(&'a str),
    ModelList,
    ModelCurrent,
    ModelSet(&'a str),
    Usage(&'static str),
    Message(&'a str),
}

impl<'a> ReplCommand<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if matches!(trimmed.to_lowercase().as_str(), "exit" | "quit") {
            return Self::Exit;
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        match head.to_lowercase().as_str() {
            "/add" if rest.is_empty() => Self::Usage("/add <file or directory>"),
            "/add" => Self::Add(rest),
            "/model" => match rest.split_once(char::is_whitespace) {
                Some(("set", name)) if !name.trim().is_empty() => Self::ModelSet(name.trim()),
                None if rest == "list" => Self::ModelList,
                None if rest == "current" || rest.is_empty() => Self::ModelCurrent,
                _ => Self::Usage("/model list | /model current | /model set <name>"),
            },
            _ => Self::Message(trimmed),
        }
    }
}

pub async fn run(message: Option<String>, model: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let root = std::env::current_dir()?;
    let mut session =
        Session::from_config(&config, root).map_err(|e| format!("Failed to start session: {e}"))?;
    if let Some(model) = model {
        session
            .set_model(&model)
            .map_err(|e| format!("Cannot use model '{model}': {e}"))?;
    }

    let busy = Arc::new(AtomicBool::new(false));
    let cancel = Arc::new(AtomicBool::new(false));
    spawn_interrupt_handler(busy.clone(), cancel.clone());

    if let Some(msg) = message {
        let outcome = run_turn(&mut session, &msg, &busy, &cancel).await;
        if !outcome.success {
            return Err(format!("Task did not complete ({:?})", outcome.status).into());
        }
        return Ok(());
    }

    print_banner(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n🔵 You> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Exit => break,
            ReplCommand::Usage(usage) => println!("Usage: {usage}"),
            ReplCommand::Add(path) => match session.add_context(path).await {
                Ok(report) => print_add_report(&report),
                Err(e) => println!("✗ {e}"),
            },
            ReplCommand::ModelList => {
                for (name, info) in session.list_models() {
                    let marker = if name == session.current_model() { "●" } else { " " };
                    println!("  {marker} {name:<40} {}", info.display_name);
                }
            }
            ReplCommand::ModelCurrent => println!("Current model: {}", session.current_model()),
            ReplCommand::ModelSet(name) => match session.set_model(name) {
                Ok(()) => println!("✓ Switched to {name}"),
                Err(e) => println!("✗ {e}"),
            },
            ReplCommand::Message(text) => {
                run_turn(&mut session, text, &busy, &cancel).await;
            }
        }
    }

    println!("\n👋 Goodbye!");
    Ok(())
}

/// Run one turn with a renderer task draining progress events.
async fn run_turn(
    session: &mut Session,
    text: &str,
    busy: &Arc<AtomicBool>,
    cancel: &Arc<AtomicBool>,
) -> LoopOutcome {
    let (tx, mut rx) = mpsc::channel::<AgentStreamEvent>(256);
    let renderer = tokio::spawn(async move {
        let mut renderer = Renderer::new();
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            if let Err(e) = renderer.handle(&event, &mut stdout) {
                debug!(error = %e, "Could not write to stdout");
            }
        }
    });

    cancel.store(false, Ordering::SeqCst);
    busy.store(true, Ordering::SeqCst);
    let outcome = session.send(text, Some(tx), cancel.clone()).await;
    busy.store(false, Ordering::SeqCst);

    if let Err(e) = renderer.await {
        debug!(error = %e, "Renderer task failed");
    }

    // The loop reports its own failures through events; this covers a model
    // that could not be resolved before the loop started.
    if outcome.iterations == 0
        && outcome.status == LoopStatus::Failed
        && let Some(error) = &outcome.error
    {
        println!("✗ {error}");
    }
    outcome
}

/// First Ctrl-C during a turn stops it after the current step; otherwise exit.
fn spawn_interrupt_handler(busy: Arc<AtomicBool>, cancel: Arc<AtomicBool>) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if busy.load(Ordering::SeqCst) && !cancel.swap(true, Ordering::SeqCst) {
                eprintln!("\n⏹  Interrupt received, stopping after the current step (Ctrl-C again to quit)");
            } else {
                println!("\n👋 Goodbye!");
                std::process::exit(130);
            }
        }
    });
}

fn print_banner(session: &Session) {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Codewright — Interactive Session      ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", session.current_model());
    println!("  Tools:     read_file, read_multiple_files, create_file,");
    println!("             create_multiple_files, edit_file");
    println!();
    println!("  /add <path>          add a file or directory to the conversation");
    println!("  /model list|current  show models");
    println!("  /model set <name>    switch model");
    println!("  exit | quit          leave");
}

fn print_add_report(report: &AddReport) {
    if !report.is_directory {
        match report.added.first() {
            Some(path) => println!("✓ Added file '{path}' to conversation."),
            None => {
                for (path, reason) in &report.skipped {
                    println!("⚠ Skipped '{path}' ({reason})");
                }
            }
        }
        return;
    }

    println!("✓ Added folder '{}' to conversation.", report.target);
    if !report.added.is_empty() {
        println!("\n📁 Added files: ({})", report.added.len());
        for path in &report.added {
            println!("  📄 {path}");
        }
    }
    if !report.skipped.is_empty() {
        println!("\n⏭ Skipped files: ({})", report.skipped.len());
        for (path, reason) in report.skipped.iter().take(SKIPPED_SHOWN) {
            println!("  ⚠ {path} ({reason})");
        }
        if report.skipped.len() > SKIPPED_SHOWN {
            println!("  ... and {} more", report.skipped.len() - SKIPPED_SHOWN);
        }
    }
    if report.limit_reached {
        println!("⚠ Reached maximum file limit; the rest of the folder was not added.");
    }
}
