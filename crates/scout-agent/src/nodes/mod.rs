//! The three control-loop nodes.
//!
//! Each node reads the state and returns a [`StateUpdate`](crate::state::StateUpdate);
//! none of them mutates the state directly or lets an error escape.

pub mod planner;
pub mod researcher;
pub mod responder;

use regex::Regex;
use std::sync::LazyLock;

/// The single plan step used for creator/authorship questions
pub const CREATOR_STEP: &str = "Who is the creator?";

static CREATOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcreators?\b",
        r"(?i)\bauthors?\b",
        r"(?i)\bauthorship\b",
        r"(?i)\bauthored\b",
        r"(?i)\bwho\s+(?:created|made|built|wrote)\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Whether text asks who created or authored something
pub fn is_creator_question(text: &str) -> bool {
    CREATOR_PATTERNS.iter().any(|re| re.is_match(text))
}
