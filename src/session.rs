use anyhow::Result;
use chrono::{Local, Utc};
use log::{info, warn};
use std::io::BufRead;
use std::path::PathBuf;

use crate::approval::{ApprovalController, Decision};
use crate::model::{ApprovedRecord, DesignDocument};
use crate::mutation::Composer;
use crate::oracle::{BuildOracle, Preview};
use crate::store::DesignStore;

const RULE: &str = "────────────────────────────────────────────────────────────";
const DOUBLE_RULE: &str = "════════════════════════════════════════════════════════════";

/// Final accounting for one discovery session.
#[derive(Debug)]
pub struct SessionSummary {
    pub rounds: usize,
    pub approved: usize,
    pub declined: usize,
    pub output: Option<PathBuf>,
}

enum LoopEnd {
    Completed(usize),
    Quit(usize),
}

/// One run of the discovery loop: backup, iterate
/// (load → mutate → persist → validate → preview → decide), then restore or
/// persist according to what was approved.
///
/// The canonical design file at the end of a session is always either the
/// pristine document (nothing approved, or quit) or the last approved
/// document; a candidate that failed validation or was declined never
/// survives its round.
pub struct DiscoverySession<I: BufRead> {
    agent: String,
    state: String,
    session_token: String,
    store: DesignStore,
    oracle: BuildOracle,
    preview: Preview,
    composer: Composer,
    controller: ApprovalController<I>,
    approved: Vec<ApprovedRecord>,
}

impl<I: BufRead> DiscoverySession<I> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent: impl Into<String>,
        state: impl Into<String>,
        store: DesignStore,
        oracle: BuildOracle,
        preview: Preview,
        composer: Composer,
        controller: ApprovalController<I>,
    ) -> Self {
        Self {
            agent: agent.into(),
            state: state.into(),
            session_token: Local::now().format("%Y%m%d_%H%M%S").to_string(),
            store,
            oracle,
            preview,
            composer,
            controller,
            approved: Vec::new(),
        }
    }

    /// Runs the full session. Per-round failures (validation, declined
    /// candidates) are absorbed here; any other fault restores the pristine
    /// document before propagating.
    pub fn run<R: rand::Rng>(&mut self, iterations: usize, rng: &mut R) -> Result<SessionSummary> {
        println!("╔{}╗", DOUBLE_RULE);
        println!("║  DESIGN DISCOVERY SESSION");
        println!("╚{}╝", DOUBLE_RULE);
        println!("Agent: {}", self.agent);
        println!("State: {}", self.state);
        println!("Iterations: {}", iterations);
        println!();

        self.store.backup()?;
        println!("Backup created: {}", self.store.backup_path().display());

        match self.iterate(iterations, rng) {
            Ok(end) => self.finish(end),
            Err(err) => {
                warn!("session failed, restoring original design: {}", err);
                match self.store.restore() {
                    Ok(()) => {
                        println!("\nError occurred; original design restored.");
                        Err(err)
                    }
                    // Unrecoverable: the canonical file may hold a broken
                    // candidate and the backup could not be copied back.
                    Err(restore_err) => Err(restore_err.context(format!(
                        "session failed ({}) and the automatic restore also failed",
                        err
                    ))),
                }
            }
        }
    }

    fn iterate<R: rand::Rng>(&mut self, iterations: usize, rng: &mut R) -> Result<LoopEnd> {
        for round in 1..=iterations {
            println!("\n{}", RULE);
            println!("ITERATION {}/{}", round, iterations);
            println!("{}", RULE);

            // Load fresh so an approved candidate from the previous round is
            // this round's base. The raw text is kept for byte-exact revert.
            let pre_round = self.store.read()?;
            let base = DesignDocument::from_json(&pre_round)?;

            println!("Generating variation...");
            let candidate = self.composer.mutate(base, rng);
            self.store.write(&candidate.to_json()?)?;

            println!("\nBuilding...");
            let (ok, diagnostic) = self.oracle.check();
            if !ok {
                println!("Build failed:");
                println!("   {}", diagnostic);
                println!("   Reverting and continuing...");
                self.store.restore()?;
                continue;
            }
            println!("Build successful");

            println!("\nPreview:");
            println!("{}", RULE);
            self.preview.show();
            println!("{}", RULE);

            match self.controller.next_decision(rng)? {
                Decision::Quit => {
                    println!("\nQuitting discovery session...");
                    self.store.restore()?;
                    return Ok(LoopEnd::Quit(round));
                }
                Decision::Approve => {
                    println!("APPROVED - keeping this design as base for next iteration");
                    info!("round {} approved ({} frames)", round, candidate.frame_count());
                    self.approved.push(ApprovedRecord {
                        iteration: round,
                        timestamp: Utc::now(),
                        frame_count: candidate.frame_count(),
                        data: candidate,
                    });
                    // The canonical file already holds the approved design.
                }
                Decision::Decline => {
                    println!("DECLINED - reverting to previous design");
                    info!("round {} declined", round);
                    self.store.write(&pre_round)?;
                }
            }
        }
        Ok(LoopEnd::Completed(iterations))
    }

    fn finish(&mut self, end: LoopEnd) -> Result<SessionSummary> {
        let (rounds, quit) = match end {
            LoopEnd::Completed(rounds) => (rounds, false),
            LoopEnd::Quit(rounds) => (rounds, true),
        };

        println!("\n{}", DOUBLE_RULE);
        println!("DISCOVERY SESSION COMPLETE");
        println!("{}", DOUBLE_RULE);
        println!("Total iterations: {}", rounds);
        println!("Approved designs: {}", self.approved.len());
        println!("Declined designs: {}", rounds - self.approved.len());

        let output = if self.approved.is_empty() {
            if !quit {
                println!("\nNo designs approved. Restoring original...");
                self.store.restore()?;
            }
            None
        } else {
            if quit {
                println!("\nThe design file was restored to the original.");
            } else {
                println!("\nThe design file holds the last approved design.");
            }
            println!("Original backup: {}", self.store.backup_path().display());
            let path =
                self.store
                    .write_approved(&self.state, &self.session_token, &self.approved)?;
            println!("Saved approved designs to: {}", path.display());
            Some(path)
        };

        Ok(SessionSummary {
            rounds,
            approved: self.approved.len(),
            declined: rounds - self.approved.len(),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::MutationKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::tempdir;

    const PRISTINE: &str = r#"{
  "name": "search",
  "frames": [
    { "lines": ["_rfffffffl_", "___________"] },
    { "lines": ["_fffffffff_", "___________"] },
    { "lines": ["_r_______l_", "___________"] },
    { "lines": ["_r__fff__l_", "___________"] }
  ]
}"#;

    struct Fixture {
        canonical: std::path::PathBuf,
        backup: std::path::PathBuf,
        output_dir: std::path::PathBuf,
    }

    impl Fixture {
        fn new(dir: &Path) -> Self {
            let canonical = dir.join("search.json");
            fs::write(&canonical, PRISTINE).unwrap();
            Self {
                canonical,
                backup: dir.join("search.backup"),
                output_dir: dir.join("discovery"),
            }
        }

        fn session(
            &self,
            oracle_program: &str,
            composer: Composer,
            input: &str,
        ) -> DiscoverySession<Cursor<String>> {
            let store = DesignStore::new(
                self.canonical.clone(),
                self.backup.clone(),
                self.output_dir.clone(),
            );
            let oracle = BuildOracle::new(oracle_program, vec![], std::path::PathBuf::from("."));
            let preview = Preview::new("true", std::path::PathBuf::from("."), "ga", "search");
            let controller = ApprovalController::Interactive {
                input: Cursor::new(input.to_string()),
            };
            DiscoverySession::new("ga", "search", store, oracle, preview, composer, controller)
        }

        fn canonical_text(&self) -> String {
            fs::read_to_string(&self.canonical).unwrap()
        }
    }

    #[test]
    fn test_all_declined_restores_pristine() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let mut session = fixture.session("true", Composer::random(), "d\nd\nd\n");
        let mut rng = StdRng::seed_from_u64(11);

        let summary = session.run(3, &mut rng).unwrap();
        assert_eq!(summary.approved, 0);
        assert_eq!(summary.declined, 3);
        assert!(summary.output.is_none());
        assert_eq!(fixture.canonical_text(), PRISTINE);
    }

    #[test]
    fn test_decline_is_byte_exact_even_for_odd_formatting() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        // Compact, unconventionally formatted, but valid.
        let odd = "{\"frames\":[{\"lines\":[\"___________\"]},{\"lines\":[\"_r_______l_\"]}]}";
        fs::write(&fixture.canonical, odd).unwrap();
        let mut session = fixture.session("true", Composer::random(), "d\n");
        let mut rng = StdRng::seed_from_u64(12);

        session.run(1, &mut rng).unwrap();
        assert_eq!(fixture.canonical_text(), odd);
    }

    #[test]
    fn test_approved_design_becomes_next_base_and_survives() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let composer = Composer::fixed(vec![MutationKind::DuplicateFrame]);
        let mut session = fixture.session("true", composer, "a\na\n");
        let mut rng = StdRng::seed_from_u64(13);

        let summary = session.run(2, &mut rng).unwrap();
        assert_eq!(summary.approved, 2);

        // Round 2 started from the round-1 approval: 4 -> 5 -> 6 frames.
        let last = DesignDocument::from_json(&fixture.canonical_text()).unwrap();
        assert_eq!(last.frame_count(), 6);
        assert_eq!(last, session.approved.last().unwrap().data);
    }

    #[test]
    fn test_forced_duplication_approval_scenario() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let composer = Composer::fixed(vec![MutationKind::DuplicateFrame]);
        let mut session = fixture.session("true", composer, "a\n");
        let mut rng = StdRng::seed_from_u64(14);

        let summary = session.run(1, &mut rng).unwrap();
        assert_eq!(summary.approved, 1);
        assert_eq!(session.approved.len(), 1);
        assert_eq!(session.approved[0].iteration, 1);
        assert_eq!(session.approved[0].frame_count, 5);

        let on_disk = DesignDocument::from_json(&fixture.canonical_text()).unwrap();
        assert_eq!(on_disk.frame_count(), 5);

        let output = summary.output.expect("approvals must be flushed");
        let flushed: Vec<ApprovedRecord> =
            serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].frame_count, 5);
    }

    #[test]
    fn test_validation_failure_restores_pristine_and_continues() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        // Oracle always fails: no round ever reaches the approval prompt, so
        // the (empty) input stream is never consulted.
        let mut session = fixture.session("false", Composer::random(), "");
        let mut rng = StdRng::seed_from_u64(15);

        let summary = session.run(3, &mut rng).unwrap();
        assert_eq!(summary.rounds, 3);
        assert_eq!(summary.approved, 0);
        assert_eq!(fixture.canonical_text(), PRISTINE);
    }

    #[test]
    fn test_quit_after_approval_restores_pristine_but_flushes_records() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let composer = Composer::fixed(vec![MutationKind::DuplicateFrame]);
        let mut session = fixture.session("true", composer, "a\nq\n");
        let mut rng = StdRng::seed_from_u64(16);

        let summary = session.run(5, &mut rng).unwrap();
        assert_eq!(summary.rounds, 2);
        assert_eq!(summary.approved, 1);

        // Quit restores the pristine backup, not the round-1 approval...
        assert_eq!(fixture.canonical_text(), PRISTINE);
        // ...but the approval is still written out.
        let output = summary.output.expect("approvals must be flushed");
        let flushed: Vec<ApprovedRecord> =
            serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].frame_count, 5);
    }

    #[test]
    fn test_quit_with_no_approvals_restores_pristine() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let mut session = fixture.session("true", Composer::random(), "q\n");
        let mut rng = StdRng::seed_from_u64(17);

        let summary = session.run(4, &mut rng).unwrap();
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.approved, 0);
        assert!(summary.output.is_none());
        assert_eq!(fixture.canonical_text(), PRISTINE);
    }

    #[test]
    fn test_malformed_document_fails_but_restores_first() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        let mut session = fixture.session("true", Composer::random(), "a\n");
        let mut rng = StdRng::seed_from_u64(18);

        // Valid at backup time, corrupted before the first load.
        session.store.backup().unwrap();
        fs::write(&fixture.canonical, "not json").unwrap();

        let result = session.iterate(1, &mut rng);
        assert!(result.is_err());

        // The driver-level cleanup contract: run() restores on any fault.
        session.store.restore().unwrap();
        assert_eq!(fixture.canonical_text(), PRISTINE);
    }

    #[test]
    fn test_run_restores_on_fault() {
        let dir = tempdir().unwrap();
        let fixture = Fixture::new(dir.path());
        fs::write(&fixture.canonical, "{\"frames\": \"corrupt\"}").unwrap();
        let mut session = fixture.session("true", Composer::random(), "a\n");
        let mut rng = StdRng::seed_from_u64(19);

        let result = session.run(1, &mut rng);
        assert!(result.is_err());
        // The malformed pristine is itself the backup; restore keeps it intact.
        assert_eq!(fixture.canonical_text(), "{\"frames\": \"corrupt\"}");
    }
}
