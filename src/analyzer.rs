use std::fmt;

use clap::ValueEnum;

use crate::client::{ChatMessage, ChatRequest, CompletionBackend, CompletionError};

const ANALYST_PROMPT: &str = "You are a Time Travel Paradox Analyzer specializing in temporal mechanics, \
causal relationships, and logical consistency within time travel narratives.
Analyze the scenario carefully and identify any potential paradoxes or logical inconsistencies.";

const CLASSIFIER_PROMPT: &str = "You are a Time Travel Paradox Classifier specializing in identifying \
specific types of temporal paradoxes. Common types include:
- Grandfather Paradox (actions preventing one's existence)
- Bootstrap Paradox (information/objects with no origin)
- Predestination Paradox (attempts to change the past cause it)
- Butterfly Effect (small changes causing massive alterations)
- Novikov Self-Consistency Principle (paradoxes are impossible)
- Multiple Timelines/Parallel Universes

Identify the most likely type of paradox in the scenario.";

const TIMELINE_PROMPT: &str = "You are a Timeline Consistency Analyzer specializing in evaluating \
the logical consistency of time travel narratives. Focus on:
- Cause and effect relationships
- Timeline branches and alterations
- Internal consistency of the narrative
- Logical contradictions

Provide a detailed analysis of the timeline's consistency.";

const RESOLUTION_PROMPT: &str = "You are a Time Travel Paradox Resolution Specialist who finds logical \
and narrative solutions to temporal paradoxes. Consider:
- Multiple timeline/universe theories
- Fixed timeline approaches (Novikov Self-Consistency)
- Dynamic timeline mechanics
- Narrative devices to maintain coherence
- Scientific theories that might apply

Provide 3-5 potential resolutions that maintain logical consistency.";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParadoxType {
    Grandfather,
    Bootstrap,
    Predestination,
    ButterflyEffect,
    Novikov,
    MultipleTimelines,
    #[default]
    #[value(name = "other")]
    OtherUnknown,
}

impl fmt::Display for ParadoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParadoxType::Grandfather => "Grandfather Paradox",
            ParadoxType::Bootstrap => "Bootstrap Paradox",
            ParadoxType::Predestination => "Predestination Paradox",
            ParadoxType::ButterflyEffect => "Butterfly Effect",
            ParadoxType::Novikov => "Novikov Self-Consistency Principle",
            ParadoxType::MultipleTimelines => "Multiple Timelines",
            ParadoxType::OtherUnknown => "Other/Unknown",
        };
        f.write_str(name)
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CausalityModel {
    #[default]
    Fixed,
    Multiple,
    Dynamic,
}

impl fmt::Display for CausalityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CausalityModel::Fixed => "Fixed Timeline",
            CausalityModel::Multiple => "Multiple Timelines",
            CausalityModel::Dynamic => "Dynamic Timeline",
        };
        f.write_str(name)
    }
}

/// A time travel narrative plus the optional hints the user supplied with it.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub text: String,
    pub suspected_type: ParadoxType,
    pub timeline_details: Option<String>,
    pub causality: Option<CausalityModel>,
}

/// The four prompt-driven questions asked about a scenario. All the reasoning
/// happens on the remote model; this only assembles prompts.
pub struct Analyzer<B> {
    backend: B,
}

impl<B: CompletionBackend> Analyzer<B> {
    pub fn new(backend: B) -> Self {
        Analyzer { backend }
    }

    pub fn analyze_paradox(&self, scenario: &str) -> Result<String, CompletionError> {
        self.ask(
            ANALYST_PROMPT,
            format!("Analyze this time travel scenario for paradoxes:\n\n{scenario}"),
            0.7,
            1000,
        )
    }

    /// A suspected type other than [`ParadoxType::OtherUnknown`] is handed to
    /// the model for confirmation.
    pub fn identify_paradox_type(
        &self,
        scenario: &str,
        suspected: ParadoxType,
    ) -> Result<String, CompletionError> {
        let hint = match suspected {
            ParadoxType::OtherUnknown => String::new(),
            kind => format!(
                "\n\nThe user suspects this might be a {kind}. Evaluate if this is correct."
            ),
        };
        self.ask(
            CLASSIFIER_PROMPT,
            format!("Identify the type of time travel paradox in this scenario:{hint}\n\n{scenario}"),
            0.7,
            800,
        )
    }

    pub fn check_timeline_consistency(
        &self,
        scenario: &str,
        details: Option<&str>,
    ) -> Result<String, CompletionError> {
        let context = match details.map(str::trim) {
            Some(details) if !details.is_empty() => {
                format!("\n\nAdditional timeline details provided by the user:\n{details}")
            }
            _ => String::new(),
        };
        self.ask(
            TIMELINE_PROMPT,
            format!("Analyze the timeline consistency in this scenario:{context}\n\n{scenario}"),
            0.7,
            1000,
        )
    }

    pub fn get_paradox_resolution(
        &self,
        scenario: &str,
        causality: Option<CausalityModel>,
    ) -> Result<String, CompletionError> {
        let context = causality
            .map(|model| format!("\n\nPreferred causality model: {model}"))
            .unwrap_or_default();
        self.ask(
            RESOLUTION_PROMPT,
            format!(
                "Suggest possible resolutions for the following time travel scenario:{context}\n\n{scenario}"
            ),
            0.8,
            1200,
        )
    }

    fn ask(
        &self,
        system: &str,
        user: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CompletionError> {
        let request = ChatRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
            max_tokens,
        };
        self.backend.complete(&request)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every request and answers from a script, one reply per call.
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub(crate) requests: RefCell<Vec<ChatRequest>>,
        pub(crate) fail_on: Option<usize>,
    }

    impl CompletionBackend for ScriptedBackend {
        fn complete(&self, request: &ChatRequest) -> Result<String, CompletionError> {
            let mut requests = self.requests.borrow_mut();
            requests.push(request.clone());
            let call = requests.len();
            if self.fail_on == Some(call) {
                return Err(CompletionError::NoChoices);
            }
            Ok(format!("reply {call}"))
        }
    }

    impl<B> Analyzer<B> {
        pub(crate) fn backend(&self) -> &B {
            &self.backend
        }
    }

    fn last_request(analyzer: &Analyzer<ScriptedBackend>) -> ChatRequest {
        analyzer.backend().requests.borrow().last().cloned().unwrap()
    }

    #[test]
    fn analysis_uses_the_analyst_role() {
        let analyzer = Analyzer::new(ScriptedBackend::default());
        let reply = analyzer.analyze_paradox("I met myself.").unwrap();
        assert_eq!(reply, "reply 1");

        let request = last_request(&analyzer);
        assert_eq!(request.messages[0].role, "system");
        assert!(request.messages[0].content.starts_with("You are a Time Travel Paradox Analyzer"));
        assert_eq!(
            request.messages[1].content,
            "Analyze this time travel scenario for paradoxes:\n\nI met myself."
        );
        assert_eq!((request.temperature, request.max_tokens), (0.7, 1000));
    }

    #[test]
    fn unknown_type_adds_no_hint() {
        let analyzer = Analyzer::new(ScriptedBackend::default());
        analyzer
            .identify_paradox_type("story", ParadoxType::OtherUnknown)
            .unwrap();

        let request = last_request(&analyzer);
        assert_eq!(
            request.messages[1].content,
            "Identify the type of time travel paradox in this scenario:\n\nstory"
        );
        assert_eq!(request.max_tokens, 800);
    }

    #[test]
    fn suspected_type_is_named_in_the_prompt() {
        let analyzer = Analyzer::new(ScriptedBackend::default());
        analyzer
            .identify_paradox_type("story", ParadoxType::Bootstrap)
            .unwrap();

        assert!(last_request(&analyzer).messages[1]
            .content
            .contains("The user suspects this might be a Bootstrap Paradox."));
    }

    #[test]
    fn blank_timeline_details_are_ignored() {
        let analyzer = Analyzer::new(ScriptedBackend::default());
        analyzer.check_timeline_consistency("story", Some("   ")).unwrap();
        assert_eq!(
            last_request(&analyzer).messages[1].content,
            "Analyze the timeline consistency in this scenario:\n\nstory"
        );

        analyzer
            .check_timeline_consistency("story", Some("Leaves in 1985."))
            .unwrap();
        assert_eq!(
            last_request(&analyzer).messages[1].content,
            "Analyze the timeline consistency in this scenario:\n\n\
             Additional timeline details provided by the user:\nLeaves in 1985.\n\nstory"
        );
    }

    #[test]
    fn resolution_mentions_the_causality_model() {
        let analyzer = Analyzer::new(ScriptedBackend::default());
        analyzer
            .get_paradox_resolution("story", Some(CausalityModel::Dynamic))
            .unwrap();

        let request = last_request(&analyzer);
        assert!(request.messages[1]
            .content
            .contains("Preferred causality model: Dynamic Timeline"));
        assert_eq!((request.temperature, request.max_tokens), (0.8, 1200));

        analyzer.get_paradox_resolution("story", None).unwrap();
        assert!(!last_request(&analyzer).messages[1].content.contains("causality"));
    }

    #[test]
    fn backend_errors_are_returned_typed() {
        let analyzer = Analyzer::new(ScriptedBackend {
            fail_on: Some(1),
            ..ScriptedBackend::default()
        });
        assert!(matches!(
            analyzer.analyze_paradox("story"),
            Err(CompletionError::NoChoices)
        ));
    }

    #[test]
    fn labels_match_the_familiar_names() {
        assert_eq!(ParadoxType::Novikov.to_string(), "Novikov Self-Consistency Principle");
        assert_eq!(ParadoxType::default().to_string(), "Other/Unknown");
        assert_eq!(CausalityModel::default().to_string(), "Fixed Timeline");
    }
}
