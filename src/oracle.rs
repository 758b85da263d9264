use log::{error, info};
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Longest diagnostic prefix shown to the operator on a failed build.
const DIAGNOSTIC_LIMIT: usize = 200;

/// Bridge to the external build/validation oracle.
///
/// The oracle decides whether the candidate currently on disk is
/// well-formed. It runs as a blocking child process with no stdin; success
/// is its exit code. This bridge never raises: a crashed or unlaunchable
/// oracle reports as a failed validation.
pub struct BuildOracle {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl BuildOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir,
        }
    }

    /// Default oracle: `make build-cli` in the project root.
    pub fn make_build(project_root: PathBuf) -> Self {
        Self::new("make", vec!["build-cli".to_string()], project_root)
    }

    /// Validates the candidate at the canonical location.
    /// Returns (success, diagnostic); the diagnostic is the oracle's stderr
    /// truncated for display.
    pub fn check(&self) -> (bool, String) {
        let result = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output();
        match result {
            Ok(output) => {
                let diagnostic = truncate(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    info!("validation passed");
                    (true, diagnostic)
                } else {
                    info!("validation failed: {}", diagnostic);
                    (false, diagnostic)
                }
            }
            Err(err) => {
                error!("failed to launch validation oracle {}: {}", self.program, err);
                (false, truncate(&err.to_string()))
            }
        }
    }
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(DIAGNOSTIC_LIMIT) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Bridge to the external preview collaborator. Purely observational: by the
/// time preview runs the canonical document has already passed validation,
/// so a preview failure never triggers restore logic.
pub struct Preview {
    program: PathBuf,
    working_dir: PathBuf,
    agent: String,
    state: String,
}

impl Preview {
    const FPS: &'static str = "3";
    const LOOPS: &'static str = "2";

    pub fn new(
        program: impl Into<PathBuf>,
        working_dir: PathBuf,
        agent: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            working_dir,
            agent: agent.into(),
            state: state.into(),
        }
    }

    /// Plays the current design in the operator's terminal, blocking until
    /// playback finishes. The result is discarded.
    pub fn show(&self) {
        let result = Command::new(&self.program)
            .arg("browse")
            .arg(&self.agent)
            .arg("--state")
            .arg(&self.state)
            .arg("--fps")
            .arg(Self::FPS)
            .arg("--loops")
            .arg(Self::LOOPS)
            .current_dir(&self.working_dir)
            .status();
        if let Err(err) = result {
            error!("preview {} failed to launch: {}", self.program.display(), err);
        }
    }
}
