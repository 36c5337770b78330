//! CLI command handlers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::config::{get_data_dir, Config};
use crate::history::{GenerationOutput, HistoryStore, SqliteHistoryStore};
use crate::identity::StaticIdentity;
use crate::normalize::{GeneratedContentData, SectionContent};
use crate::provider::{GeminiClient, TokioSleeper};
use crate::runner::{RunOutput, RunStatus, ToolRunner};
use crate::tools::{self, ImagePart, InputValue, Language, ToolId};

/// List the registered tools.
pub fn cmd_tools() {
    for tool in tools::registry() {
        let inputs: Vec<&str> = tool.inputs.iter().map(|f| f.name).collect();
        println!(
            "{:<24} [{}] inputs: {}",
            tool.id,
            tool.category_key,
            inputs.join(", ")
        );
    }
}

/// Run one tool and print (or write) the result.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_run(
    config: Config,
    tool: &str,
    inputs: &[String],
    image: Option<&Path>,
    lang: Option<&str>,
    stream: bool,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let tool = ToolId::parse(tool)?;
    let language = match lang {
        Some(code) => {
            Language::from_str(code).map_err(|_| anyhow::anyhow!("unknown language: {code}"))?
        }
        None => config.defaults.language,
    };

    let mut generation_inputs = tools::GenerationInputs::new();
    for pair in inputs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("input must be key=value, got: {pair}");
        };
        generation_inputs.insert(key.to_string(), InputValue::Text(value.to_string()));
    }
    if let Some(path) = image {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read image {}", path.display()))?;
        generation_inputs.insert(
            "image".to_string(),
            InputValue::Image(ImagePart {
                mime_type: image_mime(path)?,
                data,
            }),
        );
    }

    let runner = build_runner(&config)?;

    let on_status = |status: RunStatus| match status {
        RunStatus::Retrying { seconds } => {
            eprintln!("Rate limited, retrying in {seconds}s...");
        }
        RunStatus::Video(video) => {
            eprintln!("[{}]", video.key());
        }
    };

    let output = if stream && tool.is_grounded() {
        let mut print_chunk = |delta: &str| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        };
        let result = runner
            .run(
                tool,
                &generation_inputs,
                language,
                on_status,
                Some(&mut print_chunk),
            )
            .await?;
        println!();
        result
    } else {
        runner
            .run(tool, &generation_inputs, language, on_status, None)
            .await?
    };

    match output {
        RunOutput::Content(data) => {
            // When streaming, the text already went to stdout; only the
            // sources remain to print.
            if stream && tool.is_grounded() {
                print_sources(&data);
            } else {
                print_content(&data);
            }
        }
        RunOutput::Video { bytes, .. } => {
            let path = out
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("video.mp4"));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("failed to write video to {}", path.display()))?;
            println!("Saved video ({} bytes) to {}", bytes.len(), path.display());
        }
    }
    Ok(())
}

/// Show recent generations for the signed-in user.
pub fn cmd_history(config: Config, limit: usize) -> anyhow::Result<()> {
    let Some(user_id) = config.identity.user_id.clone() else {
        return Err(crate::errors::GenerationError::AuthenticationRequired.into());
    };
    let store = open_history(&config)?;
    let records = store.query_by_user(&user_id, limit)?;
    if records.is_empty() {
        println!("No history for {user_id}.");
        return Ok(());
    }
    for record in records {
        let summary = match &record.output {
            GenerationOutput::Content(data) => data.title.clone(),
            GenerationOutput::VideoPrompt(prompt) => format!("video: {prompt}"),
        };
        println!("{}  {:<24} {}", record.created_at, record.tool_id, summary);
    }
    Ok(())
}

fn build_runner(config: &Config) -> anyhow::Result<ToolRunner> {
    if config.provider.api_key.is_empty() {
        bail!("no API key configured: set provider.apiKey in ~/.copyforge/config.json");
    }
    let transport = GeminiClient::new(
        &config.provider.api_key,
        &config.provider.api_base,
        &config.provider.text_model,
        &config.provider.video_model,
    );
    let history = open_history(config)?;
    let identity = StaticIdentity::new(
        config.identity.user_id.clone(),
        config.identity.auth_token.clone(),
    );
    Ok(ToolRunner::new(
        Arc::new(transport),
        Arc::new(history),
        Arc::new(identity),
        Arc::new(TokioSleeper),
    ))
}

fn open_history(config: &Config) -> anyhow::Result<SqliteHistoryStore> {
    let db_path = config
        .history
        .db_path
        .clone()
        .unwrap_or_else(|| get_data_dir().join("history.db"));
    SqliteHistoryStore::new(&db_path)
}

fn image_mime(path: &Path) -> anyhow::Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        other => bail!("unsupported image extension: {other:?}"),
    };
    Ok(mime.to_string())
}

fn print_content(data: &GeneratedContentData) {
    println!("# {}", data.title);
    for section in &data.sections {
        println!("\n## {}", section.heading);
        match &section.content {
            SectionContent::Text(text) => println!("{text}"),
            SectionContent::List(items) => {
                for item in items {
                    println!("  - {item}");
                }
            }
        }
    }
    print_sources(data);
}

fn print_sources(data: &GeneratedContentData) {
    if let Some(sources) = &data.sources {
        println!("\nSources:");
        for source in sources {
            println!("  {} <{}>", source.title, source.uri);
        }
    }
}
