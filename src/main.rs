use std::env;

use resumake::ResumakeConfig;
use resumake::pipeline::run_pipeline;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::from_default_env().add_directive("resumake=info".parse()?),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut job_url: Option<String> = None;
    let mut reindex = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--reindex" | "-r" => reindex = true,
            "--help" => {
                print_help();
                return Ok(());
            }
            arg if !arg.starts_with('-') && job_url.is_none() => {
                job_url = Some(arg.to_string());
            }
            _ => {}
        }
        i += 1;
    }

    let Some(job_url) = job_url else {
        print_help();
        std::process::exit(1);
    };

    let config = ResumakeConfig::from_env();
    let report = run_pipeline(&config, &job_url, reindex).await?;

    println!();
    println!("Tailored resume for: {}", report.target_role);
    println!("PDF: {}", report.pdf_path.display());
    match report.ats {
        Some(ats) => {
            println!();
            println!("Simulated ATS score: {}%", ats.ats_score_percentage);
            if !ats.missing_critical_skills.is_empty() {
                println!("Missing critical skills:");
                for skill in &ats.missing_critical_skills {
                    println!("  - {skill}");
                }
            }
            if !ats.suggestions_for_improvement.is_empty() {
                println!("Suggestions:");
                for suggestion in &ats.suggestions_for_improvement {
                    println!("  - {suggestion}");
                }
            }
        }
        None => println!("ATS scoring was unavailable for this run."),
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"
resumake - tailor a master background into a job-specific resume

USAGE:
    resumake <JOB_URL> [OPTIONS]

OPTIONS:
    -r, --reindex           Rebuild the semantic index from the master
                            background file before retrieval
    --help                  Print this help

ENVIRONMENT:
    RESUMAKE_MASTER_FILE    Master background JSON (default: data/master_background.json)
    RESUMAKE_INDEX_DIR      Index directory (default: data/index)
    RESUMAKE_OUTPUTS_DIR    PDF output directory (default: outputs)
    RESUMAKE_LLM_PROVIDER   google | openrouter | ollama (default: ollama)
    RESUMAKE_LLM_MODEL      Chat model name
    RESUMAKE_LLM_API_KEY    Provider API key (falls back to GEMINI_API_KEY /
                            OPENROUTER_API_KEY)
    RESUMAKE_EMBEDDING_PROVIDER
                            ollama | google (default: ollama)
    RESUMAKE_MIN_RELEVANCE  Admission threshold (default: 0.50)
"#
    );
}
