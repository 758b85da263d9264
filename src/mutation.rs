use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::model::DesignDocument;
use crate::patterns::random_pattern;

/// The closed set of mutation operators. Each one consumes a document and
/// returns a new, independently owned document; when its structural
/// precondition does not hold it returns the input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Drop to a random K-subset of frames, K in [2, count-1]. Requires > 3 frames.
    RemoveFrames,
    /// Replace one random line in one random frame with a palette draw.
    EditLine,
    /// Replace 2-3 random lines across frames with palette draws.
    EditLines,
    /// Append a deep copy of a random frame.
    DuplicateFrame,
    /// Randomly permute the frame order.
    ShuffleFrames,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::RemoveFrames,
        MutationKind::EditLine,
        MutationKind::EditLines,
        MutationKind::DuplicateFrame,
        MutationKind::ShuffleFrames,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MutationKind::RemoveFrames => "remove random frames",
            MutationKind::EditLine => "modify line",
            MutationKind::EditLines => "modify multiple lines",
            MutationKind::DuplicateFrame => "duplicate frame",
            MutationKind::ShuffleFrames => "shuffle frames",
        }
    }

    /// Applies this operator. Never fails; unmet preconditions are no-ops.
    pub fn apply<R: Rng>(&self, doc: DesignDocument, rng: &mut R) -> DesignDocument {
        match self {
            MutationKind::RemoveFrames => remove_frames(doc, rng),
            MutationKind::EditLine => edit_line(doc, rng),
            MutationKind::EditLines => edit_lines(doc, rng),
            MutationKind::DuplicateFrame => duplicate_frame(doc, rng),
            MutationKind::ShuffleFrames => shuffle_frames(doc, rng),
        }
    }
}

fn remove_frames<R: Rng>(mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
    if doc.frames.len() > 3 {
        let original = doc.frames.len();
        let keep = rng.gen_range(2..original);
        let mut frames = std::mem::take(&mut doc.frames);
        frames.shuffle(rng);
        frames.truncate(keep);
        doc.frames = frames;
        println!("      Frames: {} -> {}", original, keep);
    }
    doc
}

fn edit_line<R: Rng>(mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
    if !doc.frames.is_empty() {
        let frame_idx = rng.gen_range(0..doc.frames.len());
        let frame = &mut doc.frames[frame_idx];
        if !frame.lines.is_empty() {
            let line_idx = rng.gen_range(0..frame.lines.len());
            frame.lines[line_idx] = random_pattern(rng);
            println!("      Line {} in frame {}: modified", line_idx, frame_idx);
        }
    }
    doc
}

fn edit_lines<R: Rng>(mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
    if !doc.frames.is_empty() {
        let attempts = rng.gen_range(2..=3);
        for _ in 0..attempts {
            let frame_idx = rng.gen_range(0..doc.frames.len());
            let frame = &mut doc.frames[frame_idx];
            if !frame.lines.is_empty() {
                let line_idx = rng.gen_range(0..frame.lines.len());
                frame.lines[line_idx] = random_pattern(rng);
            }
        }
        println!("      Modified {} lines", attempts);
    }
    doc
}

fn duplicate_frame<R: Rng>(mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
    if !doc.frames.is_empty() {
        let idx = rng.gen_range(0..doc.frames.len());
        let copy = doc.frames[idx].clone();
        doc.frames.push(copy);
        println!("      Duplicated frame (total: {})", doc.frames.len());
    }
    doc
}

fn shuffle_frames<R: Rng>(mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
    let count = doc.frames.len();
    doc.frames.shuffle(rng);
    println!("      Shuffled {} frames", count);
    doc
}

/// Selects 1-2 distinct operators per round and applies them in sequence.
pub struct Composer {
    forced: Option<Vec<MutationKind>>,
}

impl Composer {
    /// Random operator selection (production mode).
    pub fn random() -> Self {
        Self { forced: None }
    }

    /// Applies exactly the given operators, in order. Used by tests and
    /// scripted sessions where the round must be reproducible.
    pub fn fixed(kinds: Vec<MutationKind>) -> Self {
        Self {
            forced: Some(kinds),
        }
    }

    /// Picks the operators for one round.
    pub fn select<R: Rng>(&self, rng: &mut R) -> Vec<MutationKind> {
        match &self.forced {
            Some(kinds) => kinds.clone(),
            None => {
                let count = rng.gen_range(1..=2);
                MutationKind::ALL
                    .choose_multiple(rng, count)
                    .copied()
                    .collect()
            }
        }
    }

    /// Produces one candidate: selects operators and threads the document
    /// through them. Composition never fails; every operator is a no-op when
    /// its precondition is unmet.
    pub fn mutate<R: Rng>(&self, mut doc: DesignDocument, rng: &mut R) -> DesignDocument {
        let selected = self.select(rng);
        println!("   Applying {} mutation(s):", selected.len());
        for kind in &selected {
            println!("   - {}", kind.name());
            info!("applying mutation: {}", kind.name());
            doc = kind.apply(doc, rng);
        }
        doc
    }
}
