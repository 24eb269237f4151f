//! Claim examples and datasets
//!
//! A [`Dataset`] is an ordered list of [`ClaimExample`]s. The labeled dev set
//! anchors evaluation to ground truth; the unlabeled train set only carries
//! claims and is used for agreement optimization.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::verdict::Verdict;

/// Errors from dataset loading and validation
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset is empty")]
    Empty,
    #[error("Example {0} has an empty claim")]
    EmptyClaim(usize),
    #[error("Example {0} missing required verdict")]
    MissingVerdict(usize),
    #[error("Example {index} has invalid verdict: {verdict}")]
    InvalidVerdict { index: usize, verdict: String },
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A single factual claim, optionally labeled with its ground-truth verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimExample {
    /// The claim text
    pub claim: String,
    /// Ground-truth verdict (`yes` / `no`), absent for unlabeled data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<String>,
}

impl ClaimExample {
    /// A labeled example
    pub fn labeled(claim: &str, verdict: &str) -> Self {
        Self {
            claim: claim.to_string(),
            verdict: Some(verdict.to_string()),
        }
    }

    /// An unlabeled example
    pub fn unlabeled(claim: &str) -> Self {
        Self {
            claim: claim.to_string(),
            verdict: None,
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.verdict.is_some()
    }
}

/// Ordered collection of claim examples
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset(Vec<ClaimExample>);

impl Dataset {
    pub fn new(examples: Vec<ClaimExample>) -> Self {
        Self(examples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClaimExample> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ClaimExample] {
        &self.0
    }

    /// The first `n` examples (or all of them if the dataset is shorter)
    pub fn prefix(&self, n: usize) -> &[ClaimExample] {
        &self.0[..n.min(self.0.len())]
    }

    /// Load a JSON array of `{"claim": ..., "verdict": ...}` objects
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let examples: Vec<ClaimExample> = serde_json::from_str(&content)?;
        Ok(Self(examples))
    }

    /// Check the dataset for consistency.
    ///
    /// Rejects empty datasets and blank claims. With `require_labels`, every
    /// example must carry a verdict. Any verdict present must be `yes` or `no`.
    pub fn validate(&self, require_labels: bool) -> Result<(), DatasetError> {
        if self.0.is_empty() {
            return Err(DatasetError::Empty);
        }

        for (i, example) in self.0.iter().enumerate() {
            if example.claim.trim().is_empty() {
                return Err(DatasetError::EmptyClaim(i));
            }

            match &example.verdict {
                None if require_labels => return Err(DatasetError::MissingVerdict(i)),
                Some(v) if Verdict::parse(v).is_none() => {
                    return Err(DatasetError::InvalidVerdict {
                        index: i,
                        verdict: v.clone(),
                    })
                }
                _ => {}
            }
        }

        tracing::info!(examples = self.0.len(), require_labels, "Validated dataset");
        Ok(())
    }
}

impl From<Vec<ClaimExample>> for Dataset {
    fn from(examples: Vec<ClaimExample>) -> Self {
        Self(examples)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a ClaimExample;
    type IntoIter = std::slice::Iter<'a, ClaimExample>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

const DEV_CLAIMS: &[(&str, &str)] = &[
    ("Water boils at 100°C at sea level.", "yes"),
    ("The capital of Australia is Sydney.", "no"),
    ("Electrons are larger than atoms.", "no"),
    ("The Great Wall is visible from space with the naked eye.", "no"),
    ("Shakespeare wrote 'Hamlet'.", "yes"),
    ("Bananas grow on trees.", "no"),
    ("The sun is a star.", "yes"),
    ("There are 7 continents on Earth.", "yes"),
    ("Lightning never strikes the same place twice.", "no"),
    ("Coffee is made from beans that are actually seeds.", "yes"),
    ("Humans have more than 5 senses.", "yes"),
    ("The speed of light in vacuum is ~3e8 m/s.", "yes"),
    ("The Nile is the longest river in the world.", "no"),
    ("Gold has chemical symbol Au.", "yes"),
    ("Bulls are enraged by the color red.", "no"),
    ("The capital of Canada is Toronto.", "no"),
    ("The Pacific is the largest ocean.", "yes"),
    ("Tomatoes are fruits (botanically).", "yes"),
    ("A koala is a bear.", "no"),
    ("Mount Everest is over 8000 meters.", "yes"),
    ("The human body has 206 bones in adulthood.", "yes"),
    ("Penguins live in the Arctic wild.", "no"),
    ("Sound travels faster than light.", "no"),
    ("Helium is lighter than air.", "yes"),
    ("The capital of Brazil is Rio de Janeiro.", "no"),
    ("Pluto is classified as a dwarf planet.", "yes"),
    ("Bamboo is a type of grass.", "yes"),
    ("An octagon has 9 sides.", "no"),
    ("Canberra is Australia's capital.", "yes"),
    ("The Mona Lisa was painted by da Vinci.", "yes"),
];

const TRAIN_CLAIMS: &[&str] = &[
    "The capital of Australia is Sydney.",
    "Bananas grow on trees.",
    "The moon has a permanent dark side.",
    "Gold's symbol is Au.",
    "There are 5 continents.",
    "Tomatoes are vegetables (botanically).",
    "Coffee beans are seeds.",
    "Electrons are bigger than atoms.",
    "The Great Wall can be seen from space unaided.",
    "Helium is heavier than air.",
    "Lightning avoids tall buildings.",
    "Shakespeare wrote Hamlet.",
    "The Pacific is the biggest ocean.",
    "Bulls hate red.",
];

/// Default number of times the base training claims are repeated
pub const DEFAULT_TRAIN_REPETITIONS: usize = 7;

/// Built-in labeled development set
pub fn dev_labeled() -> Dataset {
    DEV_CLAIMS
        .iter()
        .map(|(claim, verdict)| ClaimExample::labeled(claim, verdict))
        .collect::<Vec<_>>()
        .into()
}

/// Built-in unlabeled training set: the base claims repeated `repetitions`
/// times, optionally shuffled with `rng`.
pub fn train_unlabeled<R: Rng + ?Sized>(repetitions: usize, shuffle: bool, rng: &mut R) -> Dataset {
    let mut examples: Vec<ClaimExample> = (0..repetitions)
        .flat_map(|_| TRAIN_CLAIMS.iter().map(|c| ClaimExample::unlabeled(c)))
        .collect();

    if shuffle {
        examples.shuffle(rng);
    }

    tracing::info!(examples = examples.len(), "Created unlabeled training examples");
    Dataset(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn test_builtin_dev_set_is_valid() {
        let dev = dev_labeled();
        assert_eq!(dev.len(), 30);
        dev.validate(true).unwrap();
    }

    #[test]
    fn test_builtin_train_set() {
        let mut rng = StdRng::seed_from_u64(1);
        let train = train_unlabeled(DEFAULT_TRAIN_REPETITIONS, true, &mut rng);
        assert_eq!(train.len(), 14 * 7);
        assert!(train.iter().all(|e| !e.is_labeled()));
        train.validate(false).unwrap();

        let unshuffled = train_unlabeled(2, false, &mut rng);
        assert_eq!(unshuffled.as_slice()[0], unshuffled.as_slice()[14]);
    }

    #[test]
    fn test_validate_rejects_empty() {
        assert!(matches!(
            Dataset::default().validate(false),
            Err(DatasetError::Empty)
        ));
    }

    #[test]
    fn test_validate_rejects_missing_label() {
        let ds = Dataset::new(vec![
            ClaimExample::labeled("C1", "yes"),
            ClaimExample::unlabeled("C2"),
        ]);
        assert!(matches!(ds.validate(true), Err(DatasetError::MissingVerdict(1))));
        ds.validate(false).unwrap();
    }

    #[test]
    fn test_validate_rejects_invalid_label_and_blank_claim() {
        let ds = Dataset::new(vec![ClaimExample::labeled("C1", "maybe")]);
        assert!(matches!(
            ds.validate(false),
            Err(DatasetError::InvalidVerdict { index: 0, .. })
        ));

        let ds = Dataset::new(vec![ClaimExample::unlabeled("   ")]);
        assert!(matches!(ds.validate(false), Err(DatasetError::EmptyClaim(0))));
    }

    #[test]
    fn test_prefix_is_bounded() {
        let ds = dev_labeled();
        assert_eq!(ds.prefix(60).len(), 30);
        assert_eq!(ds.prefix(5).len(), 5);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"claim":"C1","verdict":"yes"}},{{"claim":"C2"}}]"#
        )
        .unwrap();

        let ds = Dataset::from_json_file(file.path()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.as_slice()[0].verdict.as_deref(), Some("yes"));
        assert!(!ds.as_slice()[1].is_labeled());
    }
}
