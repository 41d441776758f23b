//! Best-effort lint diagnostics for touched source files.
//!
//! Python files go through `flake8`, JavaScript through `eslint`, and
//! TypeScript through both `tsc --noEmit` and `eslint`. A linter that is
//! missing, crashes or times out produces no diagnostics; it never turns a
//! successful tool call into a failed one.

use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Which tool step the diagnostics are attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintStage {
    Read,
    Created,
    Edited,
}

/// Render the diagnostics suffix appended to a tool result.
pub fn diagnostics_suffix(stage: LintStage, output: &str) -> String {
    let (heading, advice) = match stage {
        LintStage::Read => ("LINTER DIAGNOSTICS", "Please fix"),
        LintStage::Created => ("LINTER DIAGNOSTICS for new file", "Consider fixing"),
        LintStage::Edited => ("LINTER DIAGNOSTICS after edit", "Consider fixing"),
    };
    format!("\n\n🔍 {heading}:\n{output}\n\n⚠️  ISSUES DETECTED - {advice} these errors/warnings!")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Python,
    JavaScript,
    TypeScript,
}

impl Language {
    fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "py" => Some(Self::Python),
            "js" | "jsx" => Some(Self::JavaScript),
            "ts" | "tsx" => Some(Self::TypeScript),
            _ => None,
        }
    }
}

/// Whether `path` has a linter at all.
pub fn is_supported(path: &Path) -> bool {
    Language::detect(path).is_some()
}

/// Runs the linter matching a file's extension.
#[derive(Debug, Clone)]
pub struct Linter {
    enabled: bool,
    timeout: Duration,
}

impl Linter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            enabled: true,
            timeout,
        }
    }

    /// A linter that never runs anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            timeout: Duration::ZERO,
        }
    }

    /// Diagnostics for `path`, or `None` when the file is clean, unsupported
    /// or the linter could not run.
    pub async fn diagnostics(&self, path: &Path) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let language = Language::detect(path)?;
        let file = path.to_string_lossy().into_owned();
        // Node-based linters start slowly through npx.
        let node_timeout = self.timeout + Duration::from_secs(5);

        let output = match language {
            Language::Python => self.run("flake8", &[&file], self.timeout, false).await,
            Language::JavaScript => {
                self.run("npx", &["eslint", "--format", "compact", &file], node_timeout, false)
                    .await
            }
            Language::TypeScript => {
                let tsc = self
                    .run(
                        "npx",
                        &["tsc", "--noEmit", "--skipLibCheck", &file],
                        node_timeout,
                        true,
                    )
                    .await;
                let eslint = self
                    .run("npx", &["eslint", "--format", "compact", &file], node_timeout, false)
                    .await;
                let sections: Vec<String> = [("TypeScript Compiler", tsc), ("ESLint", eslint)]
                    .into_iter()
                    .filter_map(|(label, out)| out.map(|o| format!("{label}:\n{o}")))
                    .collect();
                (!sections.is_empty()).then(|| sections.join("\n\n"))
            }
        };

        debug!(file = %file, has_issues = output.is_some(), "Linted file");
        output
    }

    async fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
        include_stderr: bool,
    ) -> Option<String> {
        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(program, error = %e, "Linter could not be started");
                return None;
            }
            Err(_) => {
                warn!(program, timeout_secs = timeout.as_secs(), "Linter timed out");
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let combined = if include_stderr && !stderr.is_empty() {
            if stdout.is_empty() {
                stderr
            } else {
                format!("{stdout}\n{stderr}")
            }
        } else {
            if stdout.is_empty() && !stderr.is_empty() {
                debug!(program, stderr = %stderr, "Linter wrote only to stderr");
            }
            stdout
        };

        (!combined.is_empty()).then_some(combined)
    }
}
