//! Response normalization.
//!
//! Raw model output arrives in two shapes: schema-constrained JSON from the
//! structured path, and free prose from the grounded path. Both are folded
//! into the canonical [`GeneratedContentData`], the single shape the
//! presentation layer and the history store deal in.

use serde::{Deserialize, Serialize};

use crate::errors::{GenerationError, Result};

/// A citation attached to grounded output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

/// Section body: prose, or an ordered bullet list with markers stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionContent {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub content: SectionContent,
}

/// Canonical shape for every non-video tool result.
///
/// `sections` is always present, possibly empty. `sources` is omitted from
/// the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContentData {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

/// Parse structured-path output into the canonical shape.
///
/// Fails with [`GenerationError::MalformedResponse`] when the text is empty
/// or does not parse as the expected JSON shape. Text sections that look
/// like a markdown bullet list are converted to list content.
pub fn normalize_json(raw: &str) -> Result<GeneratedContentData> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::MalformedResponse(
            "empty response text".to_string(),
        ));
    }
    let mut data: GeneratedContentData = serde_json::from_str(trimmed)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    for section in &mut data.sections {
        if let SectionContent::Text(text) = &section.content {
            if let Some(items) = detect_list(text) {
                section.content = SectionContent::List(items);
            }
        }
    }
    Ok(data)
}

/// Wrap grounded prose as a single analysis section.
///
/// No list detection here: grounded responses are prose, not templated JSON.
pub fn normalize_grounded(text: &str, title: &str) -> GeneratedContentData {
    GeneratedContentData {
        title: title.to_string(),
        sections: vec![Section {
            heading: "AI-Generated Analysis".to_string(),
            content: SectionContent::Text(text.trim().to_string()),
        }],
        sources: None,
    }
}

/// Recognize markdown bullet lists: at least two non-empty lines, every one
/// prefixed with `"- "` or `"* "`. Returns the items with markers stripped,
/// or `None` to leave the text untouched.
fn detect_list(text: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 2 {
        return None;
    }
    if !lines
        .iter()
        .all(|l| l.starts_with("- ") || l.starts_with("* "))
    {
        return None;
    }
    Some(lines.iter().map(|l| l[2..].trim().to_string()).collect())
}
