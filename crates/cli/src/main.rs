//! Scriptorium CLI.
//!
//! Usage:
//!   scriptorium "Topic to write about"
//!   scriptorium "Summarize https://example.com/post"
//!   scriptorium path/to/existing-post.mdx        # review mode
//!   scriptorium "Topic" --style technical-senior
//!
//! # Environment Variables
//!
//! - `GOOGLE_API_KEY` - Gemini API key (required)
//! - `OPENAI_COMPATIBLE_BASE_URL` - base URL for non-Gemini providers
//! - `OPENAI_COMPATIBLE_API_KEY` - API key for non-Gemini providers
//! - `RESEARCHER_MODEL` / `WRITER_MODEL` / `REFLECTOR_MODEL` -
//!   `provider:model` specs (default: `gemini:gemini-3-pro-preview`)

use regex::Regex;
use scriptorium_common::PipelineMessage;
use scriptorium_llm::ModelRoles;
use scriptorium_pipeline::{
    EngineSettings, NodeKind, PipelineInput, Termination, WorkflowEngine,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DRAFT_PREVIEW_CHARS: usize = 200;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,scriptorium_pipeline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut input: Option<String> = None;
    let mut style = "web-dev".to_string();
    let mut strict = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--style" | "-s" => {
                if i + 1 < args.len() {
                    style = args[i + 1].clone();
                    i += 1;
                }
            }
            "--strict" => {
                strict = true;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            positional => {
                if input.is_none() {
                    input = Some(positional.to_string());
                } else {
                    // second positional is the style, as in `scriptorium "topic" academic`
                    style = positional.to_string();
                }
            }
        }
        i += 1;
    }

    let Some(raw_input) = input else {
        print_usage();
        anyhow::bail!("missing input: pass a topic or a path to an existing post");
    };

    // Paths pasted from a shell sometimes keep their quotes.
    let input = raw_input.replace(['\'', '"'], "");
    let is_file = input.ends_with(".md") || input.ends_with(".mdx");
    let has_url = input.contains("http");

    let mut initial_draft = String::new();
    let mut topic = input.clone();
    if is_file {
        initial_draft = std::fs::read_to_string(&input)
            .map_err(|e| anyhow::anyhow!("could not read '{input}' for review: {e}"))?;
        topic = format!("Reviewing existing post: {input}");
        println!("--- Detected file input. Reviewing {input} ---");
    }

    println!("\nStarting request: \"{input}\" [Style: {style}]\n");

    let first_message = if initial_draft.is_empty() {
        format!(
            "Please research and write a post about: {input}.{}",
            if has_url { " Use the tool to read the link." } else { "" }
        )
    } else {
        format!("Please review this existing post: {input}")
    };

    let roles = ModelRoles::from_env()?;
    let engine = WorkflowEngine::new(&roles)?
        .settings(EngineSettings {
            exact_quality_match: strict,
            ..Default::default()
        })
        .on_step(|record| match record.node {
            NodeKind::Write => {
                if let Some(ref draft) = record.delta.draft {
                    println!("\n--- DRAFT GENERATED ---");
                    println!("{}...", preview(draft, DRAFT_PREVIEW_CHARS));
                }
            }
            NodeKind::Reflect => {
                if let Some(ref critique) = record.delta.critique {
                    println!("\n--- CRITIQUE ---");
                    println!("{critique}");
                }
            }
            _ => {}
        });

    let report = engine
        .run(PipelineInput {
            messages: vec![PipelineMessage::user(first_message)],
            topic,
            draft: initial_draft,
            writer_style: style,
        })
        .await?;

    match report.termination {
        Termination::QualityPass => println!("\n--- Finished: critique passed ---"),
        Termination::RevisionCap => println!("\n--- Finished: revision cap reached ---"),
    }

    let final_draft = &report.state.draft;
    if !final_draft.is_empty() {
        let output_path = if is_file {
            println!("\n--- Overwriting existing file: {input} ---");
            input.clone()
        } else {
            let title = extract_title(final_draft).unwrap_or_else(|| report.state.topic.clone());
            format!("{}.mdx", slugify(&title))
        };
        std::fs::write(&output_path, final_draft)?;
        println!("\n--- Result saved to {output_path} ---");
    }

    println!("\n--- Process Completed ---");
    Ok(())
}

fn print_usage() {
    println!("Scriptorium - editorial agent pipeline");
    println!();
    println!("Usage: scriptorium <topic | path/to/post.mdx> [style] [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -s, --style <KEY>   Writing style (web-dev, technical-senior, viral-social, academic)");
    println!("      --strict        Require the critique verdict to be exactly the quality token");
    println!("  -h, --help          Show this help message");
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Pull the title out of the draft's frontmatter header. Accepts quoted
/// and bare values.
fn extract_title(draft: &str) -> Option<String> {
    let re = Regex::new(r#"title:\s*(?:['"]([^'"]*)['"]|([^\n\r]*))"#).ok()?;
    let captures = re.captures(draft)?;
    let title = captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().trim().to_string())?;
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
