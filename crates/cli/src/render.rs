//! Terminal rendering of agent progress events.

use codewright_agent::{AgentStreamEvent, LoopStatus};
use std::io::Write;

/// Longest tool-result preview shown inline.
const PREVIEW_CHARS: usize = 120;

/// Turns a stream of events into terminal output.
#[derive(Debug, Default)]
pub struct Renderer {
    in_reasoning: bool,
    in_text: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: &AgentStreamEvent, out: &mut impl Write) -> std::io::Result<()> {
        match event {
            AgentStreamEvent::Iteration { number } => {
                self.in_reasoning = false;
                self.in_text = false;
                if *number == 1 {
                    writeln!(out, "\n🤖 Codewright>")?;
                } else {
                    writeln!(out, "\n🔄 Continuing... (iteration {number})")?;
                }
            }
            AgentStreamEvent::Reasoning { content } => {
                if !self.in_reasoning {
                    writeln!(out, "💭 Reasoning:")?;
                    self.in_reasoning = true;
                }
                write!(out, "{content}")?;
            }
            AgentStreamEvent::Chunk { content } => {
                if self.in_reasoning {
                    write!(out, "\n\n🤖 Assistant> ")?;
                    self.in_reasoning = false;
                }
                self.in_text = true;
                write!(out, "{content}")?;
            }
            AgentStreamEvent::ToolCall { name, .. } => {
                self.end_stream(out)?;
                writeln!(out, "→ {name}")?;
            }
            AgentStreamEvent::ToolResult { name, output, .. } => {
                let mark = if output.starts_with("Error") || output.starts_with("Unknown function") {
                    "✗"
                } else {
                    "✓"
                };
                writeln!(out, "  {mark} {name}: {}", preview(output))?;
            }
            AgentStreamEvent::Notice { message } => {
                self.end_stream(out)?;
                writeln!(out, "⚠️  {message}")?;
            }
            AgentStreamEvent::Error { message } => {
                self.end_stream(out)?;
                writeln!(out, "✗ {message}")?;
            }
            AgentStreamEvent::Done {
                status, iterations, ..
            } => {
                self.end_stream(out)?;
                match status {
                    LoopStatus::Completed => {
                        writeln!(out, "✅ Task completed after {iterations} iteration(s)")?
                    }
                    LoopStatus::TrivialEditLimit => writeln!(
                        out,
                        "✅ Task completed with minor formatting variations after {iterations} iteration(s)"
                    )?,
                    LoopStatus::MaxIterations | LoopStatus::Cancelled | LoopStatus::Failed => {}
                }
            }
        }
        out.flush()
    }

    fn end_stream(&mut self, out: &mut impl Write) -> std::io::Result<()> {
        if self.in_reasoning || self.in_text {
            writeln!(out)?;
        }
        self.in_reasoning = false;
        self.in_text = false;
        Ok(())
    }
}

/// First line of a tool result, shortened for display.
fn preview(output: &str) -> String {
    let first = output.lines().next().unwrap_or("");
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(events: &[AgentStreamEvent]) -> String {
        let mut renderer = Renderer::new();
        let mut out = Vec::new();
        for event in events {
            renderer.handle(event, &mut out).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn reasoning_then_answer() {
        let out = render(&[
            AgentStreamEvent::Iteration { number: 1 },
            AgentStreamEvent::Reasoning {
                content: "think".into(),
            },
            AgentStreamEvent::Chunk {
                content: "Hi".into(),
            },
            AgentStreamEvent::Done {
                status: LoopStatus::Completed,
                iterations: 1,
                requests: 1,
            },
        ]);
        assert_eq!(
            out,
            "\n🤖 Codewright>\n💭 Reasoning:\nthink\n\n🤖 Assistant> Hi\n✅ Task completed after 1 iteration(s)\n"
        );
    }

    #[test]
    fn tool_results_are_previewed() {
        let out = render(&[
            AgentStreamEvent::ToolCall {
                id: "c".into(),
                name: "read_file".into(),
                arguments: "{}".into(),
            },
            AgentStreamEvent::ToolResult {
                id: "c".into(),
                name: "read_file".into(),
                output: "Content of file '/w/a.py':\n\nx = 1".into(),
            },
            AgentStreamEvent::ToolResult {
                id: "d".into(),
                name: "edit_file".into(),
                output: "Error: Could not read file 'b.py' for editing".into(),
            },
        ]);
        assert!(out.contains("→ read_file\n"));
        assert!(out.contains("  ✓ read_file: Content of file '/w/a.py':\n"));
        assert!(out.contains("  ✗ edit_file: Error: Could not read file"));
    }

    #[test]
    fn long_lines_are_cut() {
        let long = "x".repeat(300);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 1);
        assert!(shown.ends_with('…'));
    }
}
