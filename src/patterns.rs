use rand::seq::SliceRandom;
use rand::Rng;

/// The closed palette of line patterns a mutation may substitute in.
/// Alphabet: `_` ground, `r`/`l` edge caps, `f` fill, space for blank cells.
pub const PATTERNS: [&str; 10] = [
    "_rfffffffl_",
    "_fffffffff_",
    "___________",
    "_r_______l_",
    "_rrrrrrrrrl_",
    "_rf______l_",
    "_r__fff__l_",
    "_rff___ffl_",
    "           ",
    "_r_fff___l_",
];

/// Draws one pattern uniformly from the palette.
pub fn random_pattern<R: Rng>(rng: &mut R) -> String {
    PATTERNS
        .choose(rng)
        .map(|p| (*p).to_string())
        .unwrap_or_default()
}
