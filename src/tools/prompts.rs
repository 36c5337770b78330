//! Prompt construction.
//!
//! Pure functions mapping `(tool, inputs, language)` to the request sent to
//! the provider. Three prompt classes exist: grounded prose prompts (web
//! search requested by the caller), structured prompts (schema-constrained
//! JSON output, optionally with an inline image), and video prompts.
//!
//! User-supplied values are substituted into the templates verbatim: they
//! are opaque natural-language content for the model, not executable in any
//! target language, so no escaping is applied. For fixed inputs the output
//! is byte-identical on every call.

use crate::errors::{GenerationError, Result};
use crate::tools::{GenerationInputs, ImagePart, InputValue, Language, ToolId};

/// The built request for one tool run.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptSpec {
    /// Plain instruction plus the human-readable title of the eventual
    /// result. The caller requests web-search grounding for these.
    Grounded { prompt: String, title: String },
    /// Instruction for schema-constrained `{title, sections[]}` output,
    /// with an optional inline image payload.
    Structured {
        prompt: String,
        image: Option<ImagePart>,
    },
    /// Instruction for asynchronous video generation.
    Video { prompt: String },
}

/// Build the prompt for one submission.
///
/// Fails with [`GenerationError::InvalidInput`] when a tool's input
/// contract is violated (currently only `short_form_factory`, which needs
/// either source text or an image). Performs no I/O.
pub fn build_prompt(
    tool: ToolId,
    inputs: &GenerationInputs,
    language: Language,
) -> Result<PromptSpec> {
    if tool == ToolId::VideoGenerator {
        return Ok(PromptSpec::Video {
            prompt: video_prompt(text(inputs, "prompt"), language),
        });
    }
    if tool.is_grounded() {
        let (prompt, title) = grounded_prompt(tool, inputs, language);
        return Ok(PromptSpec::Grounded { prompt, title });
    }

    let image = inputs.values().find_map(|v| match v {
        InputValue::Image(part) => Some(part.clone()),
        InputValue::Text(_) => None,
    });
    let user_prompt = structured_user_prompt(tool, inputs, language, image.is_some())?;
    let prompt = format!(
        "{}\n\nUser Request: {}",
        system_instruction(language),
        user_prompt
    );
    Ok(PromptSpec::Structured { prompt, image })
}

fn text<'a>(inputs: &'a GenerationInputs, name: &str) -> &'a str {
    inputs.get(name).and_then(InputValue::as_text).unwrap_or("")
}

fn system_instruction(language: Language) -> &'static str {
    if language.is_arabic() {
        "أنت مساعد تسويق خبير. هدفك هو تقديم محتوى موجز وعملي ومبتكر بناءً على طلب المستخدم. قم دائمًا بإرجاع الاستجابة بتنسيق JSON المطلوب، باتباع المخطط المقدم. يجب أن تكون الاستجابة بالكامل باللغة العربية."
    } else {
        "You are an expert marketing assistant. Your goal is to provide concise, actionable, and creative content based on the user's request. Always return the response in the requested JSON format, following the provided schema."
    }
}

fn grounded_prompt(
    tool: ToolId,
    inputs: &GenerationInputs,
    language: Language,
) -> (String, String) {
    let ar = language.is_arabic();
    match tool {
        ToolId::SeoAssistant => {
            let topic = text(inputs, "topic");
            let prompt = if ar {
                format!("بناءً على أحدث نتائج بحث الويب لموضوع \"{topic}\"، قم بإنشاء ملخص محتوى شامل لتحسين محركات البحث. قدم تحليلاً مفصلاً يتضمن عنوانًا جذابًا، ووصفًا ميتا أقل من 160 حرفًا، وقائمة بما لا يقل عن 10 كلمات رئيسية ذات صلة، وهيكل محتوى مقترح مع عناوين H2 و H3. قم بتنظيم الاستجابة بعناوين ماركداون واضحة.")
            } else {
                format!("Based on the latest web search results for the topic \"{topic}\", generate a comprehensive SEO content brief. Provide a detailed analysis including a compelling title, a meta description under 160 characters, a list of at least 10 relevant keywords, and a suggested content structure with H2 and H3 headings. Structure the response with clear markdown headings.")
            };
            let title = if ar {
                format!("ملخص SEO: {topic}")
            } else {
                format!("SEO Brief: {topic}")
            };
            (prompt, title)
        }
        ToolId::InfluencerDiscovery => {
            let city = text(inputs, "city");
            let field = text(inputs, "field");
            let prompt = if ar {
                format!("بناءً على أحدث نتائج بحث الويب، ابحث عن أفضل 5 مؤثرين محليين في {city} في مجال {field}. لكل مؤثر، قدم اسمه/معرفه، ووصفًا موجزًا لمحتواه، ولماذا هو مناسب. قدم النتيجة بتنسيق ماركداون واضح وسهل القراءة.")
            } else {
                format!("Based on the latest web search results, find the top 5 local influencers in {city} for the {field} niche. For each influencer, provide their name/handle, a brief description of their content, and why they are a good fit. Present the result in a clear, easy-to-read markdown format.")
            };
            let title = if ar {
                format!("مؤثرون في {city} لمجال {field}")
            } else {
                format!("Influencers in {city} for {field}")
            };
            (prompt, title)
        }
        ToolId::SocialMediaOptimizer => {
            let field = text(inputs, "field");
            let prompt = if ar {
                format!("بناءً على أحدث نتائج بحث الويب للاتجاهات في صناعة {field}، أنشئ استراتيجية نمو لوسائل التواصل الاجتماعي. قم بتضمين أقسام للجمهور المستهدف، وركائز المحتوى، ونصائح خاصة بالمنصات (لإنستغرام، تيك توك، و X)، واستراتيجية دعوة لاتخاذ إجراء. قدم النتيجة بتنسيق ماركداون واضح وسهل القراءة.")
            } else {
                format!("Based on the latest web search results for trends in the {field} industry, create a social media growth strategy. Include sections for target audience, content pillars, platform-specific tips (for Instagram, TikTok, and X), and a call-to-action strategy. Present the result in a clear, easy-to-read markdown format.")
            };
            let title = if ar {
                format!("استراتيجية تواصل اجتماعي لمجال {field}")
            } else {
                format!("Social Media Strategy for {field}")
            };
            (prompt, title)
        }
        // is_grounded() and this match are kept in sync by test_grounded_tools_have_templates.
        _ => unreachable!("non-grounded tool routed to grounded_prompt"),
    }
}

fn structured_user_prompt(
    tool: ToolId,
    inputs: &GenerationInputs,
    language: Language,
    has_image: bool,
) -> Result<String> {
    let ar = language.is_arabic();
    let prompt = match tool {
        ToolId::VideoScriptAssistant => {
            let idea = text(inputs, "idea");
            if ar {
                format!("اكتب نص فيديو مفصل بناءً على الفكرة التالية: \"{idea}\". يجب أن يتضمن النص أقسامًا للمقدمة، والمحتوى الرئيسي (مقسم إلى مشاهد أو نقاط رئيسية)، والخاتمة مع دعوة لاتخاذ إجراء. قم بتضمين اقتراحات للمرئيات أو الإجراءات على الشاشة.")
            } else {
                format!("Write a detailed video script based on the following idea: \"{idea}\". The script should include sections for an introduction, the main content (broken down into scenes or key points), and an outro with a call to action. Include suggestions for visuals or on-screen actions.")
            }
        }
        ToolId::ShortFormFactory => {
            let source_text = text(inputs, "source_text");
            if !source_text.trim().is_empty() {
                if ar {
                    format!("حوّل المحتوى الطويل التالي إلى 3 أفكار لمقاطع فيديو قصيرة. لكل فكرة، قدم عنوانًا جذابًا، ومفهومًا موجزًا، ومرئيًا مقترحًا. المحتوى: \"{source_text}\"")
                } else {
                    format!("Transform the following long-form content into 3 short-form video ideas. For each idea, provide a catchy title, a brief concept, and a suggested visual. Content: \"{source_text}\"")
                }
            } else if has_image {
                if ar {
                    "حلل صورة المنتج المقدمة وأنشئ 3 أفكار لمقاطع فيديو قصيرة للترويج لها. لكل فكرة، قدم عنوانًا جذابًا، ومفهومًا موجزًا، ومرئيًا مقترحًا.".to_string()
                } else {
                    "Analyze the provided product image and generate 3 short-form video ideas to promote it. For each idea, provide a catchy title, a brief concept, and a suggested visual.".to_string()
                }
            } else {
                return Err(GenerationError::InvalidInput(
                    if ar {
                        "يرجى تقديم محتوى طويل أو تحميل صورة.".to_string()
                    } else {
                        "Please provide either long-form content or upload an image.".to_string()
                    },
                ));
            }
        }
        ToolId::SmmContentPlan => {
            let platform = text(inputs, "platform");
            let topic = text(inputs, "topic");
            if ar {
                format!("أنشئ خطة محتوى لوسائل التواصل الاجتماعي لمدة 7 أيام لمنصة {platform} حول موضوع \"{topic}\". لكل يوم، قدم فكرة للمحتوى، وتعليقًا، وهاشتاجات ذات صلة.")
            } else {
                format!("Generate a 7-day social media content plan for the platform {platform} on the topic of \"{topic}\". For each day, provide a content idea, a caption, and relevant hashtags.")
            }
        }
        ToolId::AdsAiAssistant => {
            let product = text(inputs, "product");
            let audience = text(inputs, "audience");
            if ar {
                format!("أنشئ مجموعة من النصوص الإعلانية لحملة. المنتج هو: \"{product}\". الجمهور المستهدف هو: \"{audience}\". أنشئ عنوانًا، وأقسامًا لتنويعات النصوص الإعلانية (3 على الأقل)، وقائمة بالدعوات لاتخاذ إجراء المقنعة.")
            } else {
                format!("Create a set of ad copies for a campaign. The product is: \"{product}\". The target audience is: \"{audience}\". Generate a title, sections for Ad Copy Variations (at least 3), and a list of compelling Calls to Action.")
            }
        }
        ToolId::EmailMarketing => {
            let goal = text(inputs, "goal");
            if ar {
                format!("اكتب نصًا للتسويق عبر البريد الإلكتروني للهدف التالي: \"{goal}\". يجب أن يتضمن الناتج سطر موضوع جذاب، ونصًا مقنعًا، ودعوة واضحة لاتخاذ إجراء.")
            } else {
                format!("Write an email marketing copy for the following goal: \"{goal}\". The output should include a catchy subject line, a compelling body, and a clear call to action.")
            }
        }
        ToolId::CustomerPersona => {
            let product_service = text(inputs, "product_service");
            let details = text(inputs, "target_audience_details");
            if ar {
                format!("أنشئ شخصية عميل مفصلة لشركة تبيع \"{product_service}\" إلى \"{details}\". قم بتضمين أقسام للتركيبة السكانية، والأهداف، والتحديات، وسيرة ذاتية موجزة.")
            } else {
                format!("Create a detailed customer persona for a company that sells \"{product_service}\" to \"{details}\". Include sections for Demographics, Goals, Challenges, and a brief Bio.")
            }
        }
        ToolId::SeoAssistant
        | ToolId::InfluencerDiscovery
        | ToolId::SocialMediaOptimizer
        | ToolId::VideoGenerator => {
            unreachable!("grounded/video tool routed to structured_user_prompt")
        }
    };
    Ok(prompt)
}

fn video_prompt(idea: &str, language: Language) -> String {
    if language.is_arabic() {
        format!("أنشئ فيديو عالي الجودة بناءً على الفكرة التالية: \"{idea}\"")
    } else {
        format!("Create a high-quality video based on the following idea: \"{idea}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn text_inputs(pairs: &[(&str, &str)]) -> GenerationInputs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), InputValue::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn test_build_prompt_is_deterministic() {
        let inputs = text_inputs(&[("goal", "announce launch")]);
        let a = build_prompt(ToolId::EmailMarketing, &inputs, Language::En).unwrap();
        let b = build_prompt(ToolId::EmailMarketing, &inputs, Language::En).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grounded_prompt_embeds_input_verbatim() {
        let inputs = text_inputs(&[("topic", "digital marketing")]);
        let spec = build_prompt(ToolId::SeoAssistant, &inputs, Language::En).unwrap();
        match spec {
            PromptSpec::Grounded { prompt, title } => {
                assert!(prompt.contains("digital marketing"));
                assert_eq!(title, "SEO Brief: digital marketing");
            }
            other => panic!("expected grounded spec, got {other:?}"),
        }
    }

    #[test]
    fn test_grounded_prompt_arabic_title() {
        let inputs = text_inputs(&[("topic", "التسويق")]);
        let spec = build_prompt(ToolId::SeoAssistant, &inputs, Language::Ar).unwrap();
        match spec {
            PromptSpec::Grounded { title, .. } => assert_eq!(title, "ملخص SEO: التسويق"),
            other => panic!("expected grounded spec, got {other:?}"),
        }
    }

    #[test]
    fn test_structured_prompt_includes_system_instruction() {
        let inputs = text_inputs(&[("goal", "announce launch")]);
        let spec = build_prompt(ToolId::EmailMarketing, &inputs, Language::En).unwrap();
        match spec {
            PromptSpec::Structured { prompt, image } => {
                assert!(prompt.starts_with("You are an expert marketing assistant."));
                assert!(prompt.contains("User Request:"));
                assert!(prompt.contains("announce launch"));
                assert!(image.is_none());
            }
            other => panic!("expected structured spec, got {other:?}"),
        }
    }

    #[test]
    fn test_short_form_factory_prefers_text_over_image() {
        let mut inputs = text_inputs(&[("source_text", "a long blog post")]);
        inputs.insert(
            "image".into(),
            InputValue::Image(ImagePart {
                mime_type: "image/png".into(),
                data: vec![0],
            }),
        );
        let spec = build_prompt(ToolId::ShortFormFactory, &inputs, Language::En).unwrap();
        match spec {
            PromptSpec::Structured { prompt, image } => {
                assert!(prompt.contains("a long blog post"));
                // The image still rides along as a request part.
                assert!(image.is_some());
            }
            other => panic!("expected structured spec, got {other:?}"),
        }
    }

    #[test]
    fn test_short_form_factory_image_only() {
        let mut inputs = GenerationInputs::new();
        inputs.insert(
            "image".into(),
            InputValue::Image(ImagePart {
                mime_type: "image/jpeg".into(),
                data: vec![0xff, 0xd8],
            }),
        );
        let spec = build_prompt(ToolId::ShortFormFactory, &inputs, Language::En).unwrap();
        match spec {
            PromptSpec::Structured { prompt, image } => {
                assert!(prompt.contains("Analyze the provided product image"));
                assert!(image.is_some());
            }
            other => panic!("expected structured spec, got {other:?}"),
        }
    }

    #[test]
    fn test_short_form_factory_empty_is_invalid() {
        let inputs = GenerationInputs::new();
        let err = build_prompt(ToolId::ShortFormFactory, &inputs, Language::En).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInput(_)));
    }

    #[test]
    fn test_video_prompt_wraps_idea() {
        let inputs = text_inputs(&[("prompt", "a cat surfing")]);
        let spec = build_prompt(ToolId::VideoGenerator, &inputs, Language::En).unwrap();
        match spec {
            PromptSpec::Video { prompt } => assert!(prompt.contains("a cat surfing")),
            other => panic!("expected video spec, got {other:?}"),
        }
    }

    #[test]
    fn test_grounded_tools_have_templates() {
        // Every grounded tool must route through grounded_prompt without
        // hitting the unreachable arm.
        for id in ToolId::iter().filter(|t| t.is_grounded()) {
            let inputs = text_inputs(&[
                ("topic", "x"),
                ("city", "x"),
                ("field", "x"),
            ]);
            let spec = build_prompt(id, &inputs, Language::En).unwrap();
            assert!(matches!(spec, PromptSpec::Grounded { .. }));
        }
    }
}
