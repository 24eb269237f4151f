//! LLM-backed claim verifier
//!
//! An [`LlmVerifier`] renders its [`Genome`] into a prompt, asks the
//! provider, and forces the answer into `yes`/`no`. Provider failures never
//! surface to the caller: the verifier logs them and answers at random.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use folie_core::{
    resolve_verdict, ClaimVerifier, ExperimentConfig, Genome, Prediction, TracingEvents, Verdict,
    VerdictEvents, VerifierError, VerifierId,
};
use folie_llm::{LlmProvider, LlmRequest};

const ANSWER_FORMAT: &str = "Answer strictly 'yes' or 'no'.";

const COT_FORMAT: &str = "Think step by step before answering. Respond in exactly this format:\n\
                          Reasoning: <your reasoning>\n\
                          Verdict: <yes or no>";

const SKEPTIC_HINT: &str =
    "Many widely repeated facts are popular misconceptions. Do not accept a claim just because it sounds familiar.";

/// A claim verifier answered by an LLM provider
pub struct LlmVerifier {
    id: VerifierId,
    name: String,
    provider: Arc<dyn LlmProvider>,
    genome: Genome,
    use_cot: bool,
    base_temperature: f64,
    base_max_tokens: u32,
    rng: Mutex<StdRng>,
    events: Arc<dyn VerdictEvents>,
}

impl fmt::Debug for LlmVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmVerifier")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("use_cot", &self.use_cot)
            .field("genome", &self.genome)
            .finish()
    }
}

impl LlmVerifier {
    /// Create a verifier with the default genome and sampling settings
    pub fn new(name: &str, provider: Arc<dyn LlmProvider>) -> Self {
        let defaults = ExperimentConfig::default();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            provider,
            genome: Genome::default(),
            use_cot: false,
            base_temperature: defaults.temperature,
            base_max_tokens: defaults.max_tokens,
            rng: Mutex::new(StdRng::from_os_rng()),
            events: Arc::new(TracingEvents),
        }
    }

    /// Create a verifier using the sampling and prompting settings of `config`.
    ///
    /// `stream` separates the random streams of verifiers built from the same
    /// seeded config.
    pub fn from_config(
        name: &str,
        provider: Arc<dyn LlmProvider>,
        config: &ExperimentConfig,
        stream: u64,
    ) -> Self {
        let verifier = Self::new(name, provider)
            .with_cot(config.use_cot)
            .with_sampling(config.temperature, config.max_tokens);

        match config.seed {
            Some(seed) => verifier.with_seed(seed.wrapping_add(stream)),
            None => verifier,
        }
    }

    pub fn with_cot(mut self, use_cot: bool) -> Self {
        self.use_cot = use_cot;
        self
    }

    /// Base temperature and completion budget, scaled by genome traits
    pub fn with_sampling(mut self, temperature: f64, max_tokens: u32) -> Self {
        self.base_temperature = temperature;
        self.base_max_tokens = max_tokens;
        self
    }

    /// Seed the tie-break RNG
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn with_events(mut self, events: Arc<dyn VerdictEvents>) -> Self {
        self.events = events;
        self
    }

    /// A new verifier sharing this one's provider and settings, running `genome`.
    ///
    /// The receiver is left untouched; the child gets a fresh id and an RNG
    /// seeded from the parent's stream.
    pub fn with_genome(&self, genome: Genome) -> Self {
        let seed = self.draw(|rng| rng.random::<u64>());
        Self {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            provider: self.provider.clone(),
            genome,
            use_cot: self.use_cot,
            base_temperature: self.base_temperature,
            base_max_tokens: self.base_max_tokens,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            events: self.events.clone(),
        }
    }

    pub fn id(&self) -> VerifierId {
        self.id
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    fn draw<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Render the genome and claim into a provider request
    pub fn build_request(&self, claim: &str) -> LlmRequest {
        let mut system = format!("{}\n{}", self.genome.instruction, ANSWER_FORMAT);
        if self.genome.is_skeptical() {
            system.push('\n');
            system.push_str(SKEPTIC_HINT);
        }
        if self.use_cot {
            system.push('\n');
            system.push_str(COT_FORMAT);
        }

        let mut prompt = String::new();
        for demo in &self.genome.demos {
            prompt.push_str(&format!("Claim: {}\nVerdict: {}\n\n", demo.claim, demo.verdict));
        }
        prompt.push_str(&format!("Claim: {}", claim));

        let params = self
            .genome
            .to_llm_params(self.base_temperature, self.base_max_tokens);

        LlmRequest::with_role(&system, &prompt)
            .with_params(params.temperature as f32, params.max_tokens)
    }
}

/// Split a completion into (reasoning, verdict text).
///
/// A `Verdict:` line wins when present; otherwise the whole completion is the
/// verdict text. Reasoning is only collected in chain-of-thought mode.
fn parse_completion(content: &str, use_cot: bool) -> (Option<String>, &str) {
    let mut verdict = None;
    let mut reasoning = Vec::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(rest) = strip_label(trimmed, "verdict:") {
            verdict = Some(rest);
        } else if use_cot && verdict.is_none() {
            let text = strip_label(trimmed, "reasoning:").unwrap_or(trimmed);
            if !text.is_empty() {
                reasoning.push(text);
            }
        }
    }

    let reasoning = if use_cot && !reasoning.is_empty() {
        Some(reasoning.join(" "))
    } else {
        None
    };

    (reasoning, verdict.unwrap_or(content))
}

/// Case-insensitive prefix strip, returning the trimmed remainder
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    line.get(..label.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(label))
        .and_then(|_| line.get(label.len()..))
        .map(str::trim)
}

#[async_trait]
impl ClaimVerifier for LlmVerifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn verify(&self, claim: &str) -> Result<Prediction, VerifierError> {
        let request = self.build_request(claim);

        match self.provider.complete(request).await {
            Ok(response) => {
                let (reasoning, raw) = parse_completion(&response.content, self.use_cot);
                let verdict = self.draw(|rng| {
                    resolve_verdict(Some(raw), claim, rng, self.events.as_ref())
                });
                tracing::debug!(verifier = %self.name, claim, verdict = %verdict, "Claim verified");

                let prediction = Prediction::new(verdict.as_str());
                Ok(match reasoning {
                    Some(r) => prediction.with_reasoning(r),
                    None => prediction,
                })
            }
            Err(e) => {
                let verdict = self.draw(|rng| Verdict::random(rng));
                tracing::error!(
                    verifier = %self.name,
                    claim,
                    error = %e,
                    fallback = %verdict,
                    "Provider failed, answering at random"
                );
                Ok(Prediction::new(verdict.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folie_core::Demo;
    use folie_llm::MockProvider;

    #[test]
    fn test_parse_plain_completion() {
        assert_eq!(parse_completion(" Yes.", false), (None, " Yes."));
        assert_eq!(parse_completion("Verdict: no", false), (None, "no"));
    }

    #[test]
    fn test_parse_cot_completion() {
        let content = "Reasoning: Sydney is not the capital, Canberra is.\nVerdict: no";
        let (reasoning, verdict) = parse_completion(content, true);
        assert_eq!(verdict, "no");
        assert_eq!(
            reasoning.as_deref(),
            Some("Sydney is not the capital, Canberra is.")
        );
    }

    #[test]
    fn test_request_includes_demos_and_hint() {
        let mut genome = Genome::default()
            .with_demos(vec![Demo::new("The Moon orbits Earth.", Verdict::Yes)]);
        genome.set_trait("skepticism", 0.9);

        let verifier = LlmVerifier::new("A", Arc::new(MockProvider::constant("yes")))
            .with_genome(genome);
        let request = verifier.build_request("Bats are blind.");

        assert!(request.system.contains(SKEPTIC_HINT));
        assert!(request
            .prompt
            .starts_with("Claim: The Moon orbits Earth.\nVerdict: yes"));
        assert!(request.prompt.ends_with("Claim: Bats are blind."));
    }

    #[tokio::test]
    async fn test_verify_normalizes_answer() {
        let provider = Arc::new(MockProvider::constant("  YES, definitely "));
        let verifier = LlmVerifier::new("A", provider).with_seed(1);
        let prediction = verifier.verify("Water is wet.").await.unwrap();
        assert_eq!(prediction.verdict, "yes");
        assert!(prediction.reasoning.is_none());
    }

    #[tokio::test]
    async fn test_cot_keeps_reasoning() {
        let provider = Arc::new(MockProvider::constant(
            "Reasoning: Yes, Everest is the tallest above sea level.\nVerdict: yes",
        ));
        let verifier = LlmVerifier::new("A", provider).with_cot(true);
        let prediction = verifier.verify("Everest is tallest.").await.unwrap();
        assert_eq!(prediction.verdict, "yes");
        assert!(prediction.reasoning.unwrap().contains("Everest"));
    }

    #[tokio::test]
    async fn test_provider_failure_yields_random_verdict() {
        let verifier = LlmVerifier::new("A", Arc::new(MockProvider::failing())).with_seed(7);
        for _ in 0..10 {
            let prediction = verifier.verify("anything").await.unwrap();
            assert!(prediction.verdict == "yes" || prediction.verdict == "no");
        }
    }

    #[tokio::test]
    async fn test_with_genome_leaves_parent_untouched() {
        let parent = LlmVerifier::new("A", Arc::new(MockProvider::constant("no")));
        let child = parent.with_genome(Genome::new("Be brief."));

        assert_ne!(parent.id(), child.id());
        assert_eq!(parent.genome(), &Genome::default());
        assert_eq!(child.genome().instruction, "Be brief.");
        assert_eq!(child.verify("x").await.unwrap().verdict, "no");
    }

    #[derive(Default)]
    struct AmbiguityLog(Mutex<Vec<(Option<String>, String, Verdict)>>);

    impl VerdictEvents for AmbiguityLog {
        fn ambiguous(&self, raw: Option<&str>, claim: &str, chosen: Verdict) {
            self.0
                .lock()
                .unwrap()
                .push((raw.map(str::to_string), claim.to_string(), chosen));
        }
    }

    #[tokio::test]
    async fn test_ambiguous_answer_reaches_event_sink() {
        let log = Arc::new(AmbiguityLog::default());
        let verifier = LlmVerifier::new("A", Arc::new(MockProvider::constant("maybe")))
            .with_seed(4)
            .with_events(log.clone());

        let prediction = verifier.verify("Bats are blind.").await.unwrap();

        let events = log.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        let (raw, claim, chosen) = &events[0];
        assert_eq!(raw.as_deref(), Some("maybe"));
        assert_eq!(claim, "Bats are blind.");
        assert_eq!(prediction.verdict, chosen.as_str());
    }

    #[tokio::test]
    async fn test_clear_answer_emits_no_event() {
        let log = Arc::new(AmbiguityLog::default());
        let verifier = LlmVerifier::new("A", Arc::new(MockProvider::constant("No.")))
            .with_events(log.clone());

        assert_eq!(verifier.verify("Bats are blind.").await.unwrap().verdict, "no");
        assert!(log.0.lock().unwrap().is_empty());
    }
}
