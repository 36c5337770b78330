//! Marketing tool registry.
//!
//! Every tool the engine can run is declared here as a static descriptor:
//! a closed [`ToolId`], display keys for the presentation layer, and the
//! ordered input fields the tool expects. The descriptors are build-time
//! constants — nothing here is persisted or mutated at runtime.

pub mod prompts;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::errors::GenerationError;

/// Closed set of tool identifiers.
///
/// The string form (`seo_assistant`, ...) is the wire/storage id; adding a
/// tool means adding a variant here and a template in [`prompts`], and the
/// compiler flags every match that needs updating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    SeoAssistant,
    InfluencerDiscovery,
    SocialMediaOptimizer,
    VideoScriptAssistant,
    ShortFormFactory,
    SmmContentPlan,
    VideoGenerator,
    AdsAiAssistant,
    EmailMarketing,
    CustomerPersona,
}

impl ToolId {
    /// Parse a wire id, mapping failure to the domain error so callers never
    /// see a raw strum parse error.
    pub fn parse(id: &str) -> crate::errors::Result<Self> {
        id.parse()
            .map_err(|_| GenerationError::UnknownTool(id.to_string()))
    }

    /// Tools whose output is produced with live web-search grounding.
    pub fn is_grounded(&self) -> bool {
        matches!(
            self,
            ToolId::SeoAssistant | ToolId::InfluencerDiscovery | ToolId::SocialMediaOptimizer
        )
    }
}

/// Supported content languages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    pub fn is_arabic(&self) -> bool {
        matches!(self, Language::Ar)
    }
}

/// Kind of form input a tool field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Textarea,
    Image,
}

/// One declared input field of a tool.
#[derive(Debug, Clone, Copy)]
pub struct InputField {
    pub name: &'static str,
    pub kind: InputKind,
    pub label_key: &'static str,
    pub placeholder_key: &'static str,
}

/// Static descriptor for one marketing tool.
#[derive(Debug, Clone, Copy)]
pub struct Tool {
    pub id: ToolId,
    pub name_key: &'static str,
    pub description_key: &'static str,
    pub icon: &'static str,
    pub category_key: &'static str,
    pub inputs: &'static [InputField],
}

/// Inline image payload attached to a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A single submitted input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputValue {
    Text(String),
    Image(ImagePart),
}

impl InputValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InputValue::Text(s) => Some(s),
            InputValue::Image(_) => None,
        }
    }
}

/// User-submitted inputs keyed by field name.
///
/// A `BTreeMap` keeps iteration order stable so prompt construction is
/// deterministic for identical submissions.
pub type GenerationInputs = BTreeMap<String, InputValue>;

/// The text-only subset of inputs, as persisted to history.
pub fn text_inputs(inputs: &GenerationInputs) -> BTreeMap<String, String> {
    inputs
        .iter()
        .filter_map(|(k, v)| v.as_text().map(|s| (k.clone(), s.to_string())))
        .collect()
}

const TOOLS: &[Tool] = &[
    // Category: Audience Growth & Strategy
    Tool {
        id: ToolId::SeoAssistant,
        name_key: "seo_assistant_name",
        description_key: "seo_assistant_desc",
        icon: "fa-solid fa-magnifying-glass-chart",
        category_key: "audience_growth_strategy",
        inputs: &[InputField {
            name: "topic",
            kind: InputKind::Text,
            label_key: "topic_label",
            placeholder_key: "seo_placeholder",
        }],
    },
    Tool {
        id: ToolId::InfluencerDiscovery,
        name_key: "influencer_discovery_name",
        description_key: "influencer_discovery_desc",
        icon: "fa-solid fa-users-rays",
        category_key: "audience_growth_strategy",
        inputs: &[
            InputField {
                name: "city",
                kind: InputKind::Text,
                label_key: "city_label",
                placeholder_key: "city_placeholder",
            },
            InputField {
                name: "field",
                kind: InputKind::Text,
                label_key: "field_label",
                placeholder_key: "field_placeholder",
            },
        ],
    },
    Tool {
        id: ToolId::SocialMediaOptimizer,
        name_key: "social_media_optimizer_name",
        description_key: "social_media_optimizer_desc",
        icon: "fa-solid fa-arrow-trend-up",
        category_key: "audience_growth_strategy",
        inputs: &[InputField {
            name: "field",
            kind: InputKind::Text,
            label_key: "your_industry_label",
            placeholder_key: "industry_placeholder",
        }],
    },
    // Category: Creative Content Generation
    Tool {
        id: ToolId::VideoScriptAssistant,
        name_key: "video_script_assistant_name",
        description_key: "video_script_assistant_desc",
        icon: "fa-solid fa-clapperboard",
        category_key: "content_creation",
        inputs: &[InputField {
            name: "idea",
            kind: InputKind::Textarea,
            label_key: "video_idea_label",
            placeholder_key: "video_idea_placeholder",
        }],
    },
    Tool {
        id: ToolId::ShortFormFactory,
        name_key: "short_form_factory_name",
        description_key: "short_form_factory_desc",
        icon: "fa-solid fa-wand-magic-sparkles",
        category_key: "content_creation",
        inputs: &[
            InputField {
                name: "source_text",
                kind: InputKind::Textarea,
                label_key: "long_form_content_label",
                placeholder_key: "long_form_content_placeholder",
            },
            InputField {
                name: "image",
                kind: InputKind::Image,
                label_key: "or_upload_product_image_label",
                placeholder_key: "",
            },
        ],
    },
    Tool {
        id: ToolId::SmmContentPlan,
        name_key: "smm_content_plan_name",
        description_key: "smm_content_plan_desc",
        icon: "fa-solid fa-calendar-week",
        category_key: "content_creation",
        inputs: &[
            InputField {
                name: "platform",
                kind: InputKind::Text,
                label_key: "platform_label",
                placeholder_key: "platform_placeholder",
            },
            InputField {
                name: "topic",
                kind: InputKind::Text,
                label_key: "topic_label",
                placeholder_key: "smm_topic_placeholder",
            },
        ],
    },
    Tool {
        id: ToolId::VideoGenerator,
        name_key: "ai_video_generator_name",
        description_key: "ai_video_generator_desc",
        icon: "fa-solid fa-film",
        category_key: "content_creation",
        inputs: &[InputField {
            name: "prompt",
            kind: InputKind::Textarea,
            label_key: "video_idea_label",
            placeholder_key: "video_generator_placeholder",
        }],
    },
    // Category: Campaign & Outreach
    Tool {
        id: ToolId::AdsAiAssistant,
        name_key: "ads_ai_assistant_name",
        description_key: "ads_ai_assistant_desc",
        icon: "fa-solid fa-bullhorn",
        category_key: "campaign_management",
        inputs: &[
            InputField {
                name: "product",
                kind: InputKind::Textarea,
                label_key: "product_description_label",
                placeholder_key: "product_description_placeholder",
            },
            InputField {
                name: "audience",
                kind: InputKind::Text,
                label_key: "target_audience_label",
                placeholder_key: "target_audience_placeholder",
            },
        ],
    },
    Tool {
        id: ToolId::EmailMarketing,
        name_key: "email_marketing_name",
        description_key: "email_marketing_desc",
        icon: "fa-solid fa-envelope-open-text",
        category_key: "campaign_management",
        inputs: &[InputField {
            name: "goal",
            kind: InputKind::Textarea,
            label_key: "campaign_goal_label",
            placeholder_key: "campaign_goal_placeholder",
        }],
    },
    Tool {
        id: ToolId::CustomerPersona,
        name_key: "customer_persona_name",
        description_key: "customer_persona_desc",
        icon: "fa-solid fa-user-astronaut",
        category_key: "campaign_management",
        inputs: &[
            InputField {
                name: "product_service",
                kind: InputKind::Textarea,
                label_key: "product_service_label",
                placeholder_key: "product_service_placeholder",
            },
            InputField {
                name: "target_audience_details",
                kind: InputKind::Textarea,
                label_key: "target_audience_details_label",
                placeholder_key: "target_audience_details_placeholder",
            },
        ],
    },
];

/// All registered tools, in display order.
pub fn registry() -> &'static [Tool] {
    TOOLS
}

/// Look up a tool descriptor by id.
pub fn find(id: ToolId) -> &'static Tool {
    // The registry covers every ToolId variant; a miss is a programming
    // error caught by test_registry_is_exhaustive.
    TOOLS
        .iter()
        .find(|t| t.id == id)
        .expect("tool registry covers every ToolId variant")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tool_id_round_trips_through_wire_form() {
        for id in ToolId::iter() {
            let wire = id.to_string();
            assert_eq!(ToolId::parse(&wire).unwrap(), id);
        }
        assert_eq!(ToolId::SeoAssistant.to_string(), "seo_assistant");
        assert_eq!(ToolId::AdsAiAssistant.to_string(), "ads_ai_assistant");
    }

    #[test]
    fn test_unknown_id_is_domain_error() {
        let err = ToolId::parse("nonexistent_tool").unwrap_err();
        assert!(matches!(err, GenerationError::UnknownTool(ref id) if id == "nonexistent_tool"));
    }

    #[test]
    fn test_registry_is_exhaustive() {
        for id in ToolId::iter() {
            assert_eq!(find(id).id, id);
        }
        assert_eq!(registry().len(), ToolId::iter().count());
    }

    #[test]
    fn test_grounded_set() {
        let grounded: Vec<ToolId> = ToolId::iter().filter(|t| t.is_grounded()).collect();
        assert_eq!(
            grounded,
            vec![
                ToolId::SeoAssistant,
                ToolId::InfluencerDiscovery,
                ToolId::SocialMediaOptimizer
            ]
        );
    }

    #[test]
    fn test_text_inputs_drops_images() {
        let mut inputs = GenerationInputs::new();
        inputs.insert("source_text".into(), InputValue::Text("hello".into()));
        inputs.insert(
            "image".into(),
            InputValue::Image(ImagePart {
                mime_type: "image/png".into(),
                data: vec![1, 2, 3],
            }),
        );
        let text = text_inputs(&inputs);
        assert_eq!(text.len(), 1);
        assert_eq!(text.get("source_text").map(String::as_str), Some("hello"));
    }
}
