// External tools - Blocking invocations of the synthesis engine, renderer and encoder
// A failing tool ends the run; nothing is retried

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExternalToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// File fed to the tool's standard input
    pub stdin: Option<PathBuf>,
    /// Files that must exist before the tool is started
    pub inputs: Vec<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ToolCommand {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            inputs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Path argument that must exist when the command runs
    pub fn input(mut self, path: &Path) -> Self {
        self.args.push(path.display().to_string());
        self.inputs.push(path.to_path_buf());
        self
    }

    /// Feed `path` to standard input (`tool < path`)
    pub fn stdin_from(mut self, path: &Path) -> Self {
        self.stdin = Some(path.to_path_buf());
        self.inputs.push(path.to_path_buf());
        self
    }

    /// Shell-style rendering for logs
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Some(stdin) = &self.stdin {
            line.push_str(&format!(" < {}", stdin.display()));
        }
        line
    }
}

/// Run a command to completion, failing on a missing input or a non-zero exit
pub fn run_tool(command: &ToolCommand) -> Result<(), ExternalToolError> {
    if let Some(missing) = command.inputs.iter().find(|p| !p.exists()) {
        return Err(ExternalToolError::MissingInput(missing.clone()));
    }

    log::info!("Running {}", command.display());

    let mut process = Command::new(&command.program);
    process.args(&command.args);
    if let Some(stdin) = &command.stdin {
        process.stdin(Stdio::from(File::open(stdin)?));
    }

    let output = process.output().map_err(|source| ExternalToolError::Spawn {
        program: command.program.clone(),
        source,
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn!("{} failed with {}", command.program, output.status);
        return Err(ExternalToolError::NonZeroExit {
            program: command.program.clone(),
            status: output.status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    log::info!("{} finished with {}", command.program, output.status);
    Ok(())
}
