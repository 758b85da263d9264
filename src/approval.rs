use anyhow::Result;
use log::info;
use rand::Rng;
use std::io::{BufRead, Write};

/// Operator verdict on a previewed candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
    Quit,
}

/// Obtains approve/decline/quit decisions, either from the operator or from
/// a weighted automatic draw (demo mode, for unattended runs and tests).
pub enum ApprovalController<I: BufRead> {
    Interactive { input: I },
    Demo,
}

impl<I: BufRead> ApprovalController<I> {
    /// Prompts until one of the recognized tokens is entered. Unrecognized
    /// input re-prompts; end of input is treated as quit.
    pub fn next_decision<R: Rng>(&mut self, rng: &mut R) -> Result<Decision> {
        match self {
            ApprovalController::Interactive { input } => loop {
                print!("\n[A]pprove  [D]ecline  [Q]uit: ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                if input.read_line(&mut line)? == 0 {
                    // Input stream closed; treat as a controlled quit.
                    println!();
                    return Ok(Decision::Quit);
                }
                match line.trim().to_lowercase().as_str() {
                    "a" => return Ok(Decision::Approve),
                    "d" => return Ok(Decision::Decline),
                    "q" => return Ok(Decision::Quit),
                    other => println!("Invalid choice {:?}. Use A, D, or Q", other),
                }
            },
            ApprovalController::Demo => {
                // Approve twice as often as decline; never quit.
                let decision = if rng.gen_range(0..3) < 2 {
                    Decision::Approve
                } else {
                    Decision::Decline
                };
                let label = match decision {
                    Decision::Approve => "A",
                    _ => "D",
                };
                println!("\n[DEMO MODE] Automatically choosing: {}", label);
                info!("demo decision: {:?}", decision);
                Ok(decision)
            }
        }
    }
}
