//! Verdict normalization
//!
//! Two transforms live here and must not be confused:
//!
//! - [`normalize_verdict`] only canonicalizes case and whitespace. Every
//!   equality check between two verdicts (truth accuracy, agreement) goes
//!   through it.
//! - [`resolve_verdict`] is the stricter agent-local policy that forces free
//!   model text into the binary label space, breaking ties at random.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A binary claim verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Yes,
    No,
}

impl Verdict {
    /// Canonical label
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Yes => "yes",
            Verdict::No => "no",
        }
    }

    /// Parse an already-binary label (after [`normalize_verdict`])
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_verdict(Some(raw)).as_str() {
            "yes" => Some(Verdict::Yes),
            "no" => Some(Verdict::No),
            _ => None,
        }
    }

    /// Uniform draw from `{Yes, No}`
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-case and trim a verdict; missing verdicts become the empty string.
pub fn normalize_verdict(raw: Option<&str>) -> String {
    raw.unwrap_or_default().trim().to_lowercase()
}

/// Sink for observable verdict-resolution events
pub trait VerdictEvents: Send + Sync {
    /// Called when raw model output could not be mapped to a single label
    fn ambiguous(&self, raw: Option<&str>, claim: &str, chosen: Verdict);
}

/// Default sink: reports ambiguity as a warning through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEvents;

impl VerdictEvents for TracingEvents {
    fn ambiguous(&self, raw: Option<&str>, claim: &str, chosen: Verdict) {
        tracing::warn!(
            raw = raw.unwrap_or("<none>"),
            claim,
            chosen = %chosen,
            "Ambiguous verdict, resolved at random"
        );
    }
}

/// Force free text into `{yes, no}`.
///
/// Text mentioning only "yes" resolves to [`Verdict::Yes`], only "no" to
/// [`Verdict::No`]. Anything else (both, neither, empty, missing) is ambiguous:
/// a label is drawn from `rng` and the event is reported to `events`.
///
/// Matching is by substring, so "not" or "know" count as a "no" mention.
pub fn resolve_verdict<R: Rng + ?Sized>(
    raw: Option<&str>,
    claim: &str,
    rng: &mut R,
    events: &dyn VerdictEvents,
) -> Verdict {
    let text = normalize_verdict(raw);
    let has_yes = text.contains("yes");
    let has_no = text.contains("no");

    match (has_yes, has_no) {
        (true, false) => Verdict::Yes,
        (false, true) => Verdict::No,
        _ => {
            let chosen = Verdict::random(rng);
            events.ambiguous(raw, claim, chosen);
            chosen
        }
    }
}
