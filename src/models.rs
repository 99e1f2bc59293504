//! Supported Perplexity models.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// A model identifier accepted by the chat-completion endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, ValueEnum)]
pub enum Model {
    /// Premier search offering with search grounding.
    #[default]
    #[serde(rename = "sonar-pro")]
    #[value(name = "sonar-pro")]
    SonarPro,
    /// Lightweight search offering, quicker and cheaper than Sonar Pro.
    #[serde(rename = "sonar")]
    #[value(name = "sonar")]
    Sonar,
    /// Premier reasoning offering with chain of thought.
    #[serde(rename = "sonar-reasoning-pro")]
    #[value(name = "sonar-reasoning-pro")]
    SonarReasoningPro,
    /// Reasoning model with chain of thought.
    #[serde(rename = "sonar-reasoning")]
    #[value(name = "sonar-reasoning")]
    SonarReasoning,
    /// Exhaustive multi-source research.
    #[serde(rename = "sonar-deep-research")]
    #[value(name = "sonar-deep-research")]
    SonarDeepResearch,
    /// R1 post-trained for unbiased answers, without search.
    #[serde(rename = "r1-1776")]
    #[value(name = "r1-1776")]
    R1,
}

impl Model {
    pub const ALL: [Model; 6] = [
        Model::SonarPro,
        Model::Sonar,
        Model::SonarReasoningPro,
        Model::SonarReasoning,
        Model::SonarDeepResearch,
        Model::R1,
    ];

    /// The identifier sent on the wire.
    pub fn id(&self) -> &'static str {
        match self {
            Model::SonarPro => "sonar-pro",
            Model::Sonar => "sonar",
            Model::SonarReasoningPro => "sonar-reasoning-pro",
            Model::SonarReasoning => "sonar-reasoning",
            Model::SonarDeepResearch => "sonar-deep-research",
            Model::R1 => "r1-1776",
        }
    }

    pub fn context_length(&self) -> &'static str {
        match self {
            Model::SonarPro => "200k",
            _ => "128k",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Model::SonarPro => {
                "Premier search offering with search grounding, supporting advanced queries and follow-ups"
            }
            Model::Sonar => {
                "Lightweight offering with search grounding, quicker and cheaper than Sonar Pro"
            }
            Model::SonarReasoningPro => {
                "Premier reasoning offering powered by DeepSeek R1 with Chain of Thought (CoT)"
            }
            Model::SonarReasoning => "Reasoning model with Chain of Thought (CoT)",
            Model::SonarDeepResearch => {
                "Performs exhaustive research across many sources with expert-level analysis"
            }
            Model::R1 => {
                "DeepSeek R1 model post-trained for uncensored, unbiased information (no search)"
            }
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
