use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use lexrag::cli::{Cli, Commands, ConfigAction};
use lexrag::chat::{AnswerParser, ChatPipeline, ChatRequest, PromptComposer, VoiceSupport};
use lexrag::chunker::Chunker;
use lexrag::config::Config;
use lexrag::error::{LexragError, Result};
use lexrag::extract::DocumentExtractor;
use lexrag::index::{IndexBuilder, IndexError, SharedIndex, VectorIndex};
use lexrag::llm::ChatCompletionsModel;
use lexrag::matcher::{ProfessionalCandidate, ProfessionalMatcher};
use lexrag::retrieval::Retriever;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::BuildIndex { corpus } => {
            cmd_build_index(cli.config, corpus)?;
        }
        Commands::Ask {
            question,
            k,
            professionals,
            json,
        } => {
            cmd_ask(cli.config, &question, k, professionals, json)?;
        }
        Commands::Status => {
            cmd_status(cli.config)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lexrag=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn cmd_build_index(config_path: Option<PathBuf>, corpus: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    let corpus_dir = match corpus {
        Some(dir) => dir,
        None => expand_path(&config.corpus.documents_dir)?,
    };
    let index_dir = expand_path(&config.corpus.index_dir)?;

    let provider = lexrag::embedding::create_provider(
        &config.embedding.backend,
        &config.embedding.model,
        config.embedding.dimension,
    )?;
    let chunker = Chunker::new(config.chunking.window, config.chunking.overlap)
        .map_err(|e| LexragError::Config(e.to_string()))?;

    let builder = IndexBuilder::new(
        Box::new(DocumentExtractor::new()),
        provider,
        chunker,
        config.embedding.batch_size,
    );

    println!("Building index from {}...", corpus_dir.display());

    let (index, report) = match builder.build(&corpus_dir) {
        Ok(result) => result,
        Err(lexrag::index::BuildError::Embedding { source, report }) => {
            print_report(&report);
            eprintln!("✗ Build aborted: embedding backend failed: {}", source);
            return Err(LexragError::Embedding(source));
        }
        Err(e) => return Err(LexragError::Other(e.into())),
    };

    print_report(&report);
    index.save(&index_dir)?;

    println!(
        "✓ Index built: {} chunks from {} documents at {}",
        report.total_chunks,
        report.indexed_documents(),
        index_dir.display()
    );

    Ok(())
}

fn print_report(report: &lexrag::index::BuildReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            lexrag::index::DocumentStatus::Indexed { chunks } => {
                println!("  ✓ {} ({} chunks)", outcome.path.display(), chunks);
            }
            lexrag::index::DocumentStatus::Skipped { reason } => {
                println!("  ✗ {} (skipped: {})", outcome.path.display(), reason);
            }
        }
    }
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    question: &str,
    k: Option<usize>,
    professionals: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let index_dir = expand_path(&config.corpus.index_dir)?;

    // A missing index degrades to no-knowledge-base mode; a corrupt one is
    // refused outright.
    let shared = match VectorIndex::load(&index_dir) {
        Ok(index) => SharedIndex::new(index),
        Err(IndexError::NotFound { .. }) => {
            tracing::warn!(
                "No index found at {}; answering without a knowledge base. Run 'lexrag build-index'.",
                index_dir.display()
            );
            SharedIndex::unloaded()
        }
        Err(e) => return Err(LexragError::Index(e)),
    };

    let provider = lexrag::embedding::create_provider(
        &config.embedding.backend,
        &config.embedding.model,
        config.embedding.dimension,
    )?;

    let retriever = Retriever::new(provider, Arc::new(shared), config.retrieval.clone());
    retriever.verify_dimension()?;

    let model = ChatCompletionsModel::from_env(
        config.llm.endpoint.clone(),
        config.llm.model.clone(),
        &config.llm.api_key_env,
        config.llm.temperature,
        config.llm.max_tokens,
        Duration::from_secs(config.llm.timeout_secs),
    )
    .map_err(|e| LexragError::Config(e.to_string()))?;

    let categories = Arc::new(config.category_table());
    let labels: Vec<String> = categories.entries.iter().map(|e| e.label.clone()).collect();

    let pipeline = ChatPipeline::new(
        retriever,
        Arc::clone(&categories),
        PromptComposer::new(config.chat.category_marker.clone(), labels),
        AnswerParser::new(&config.chat.category_marker)
            .map_err(|e| LexragError::Config(e.to_string()))?,
        Arc::new(model),
        ProfessionalMatcher::new(config.chat.max_suggestions),
        Duration::from_secs(config.llm.timeout_secs),
        VoiceSupport::disabled(),
    );

    let candidates = load_professionals(professionals)?;

    let request = ChatRequest {
        query: question.to_string(),
        user_id: None,
        session_id: None,
        k,
    };

    let runtime = tokio::runtime::Runtime::new().map_err(|e| LexragError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let response = runtime.block_on(pipeline.answer(&request, &candidates));

    if json {
        let payload = serde_json::to_string_pretty(&response).map_err(|e| LexragError::Json {
            source: e,
            context: "Failed to serialize chat response".to_string(),
        })?;
        println!("{}", payload);
        return Ok(());
    }

    println!("{}\n", response.answer);
    match &response.detected_category {
        Some(category) => println!("Detected category: {}", category),
        None => println!("Detected category: (none)"),
    }

    if !response.citations.is_empty() {
        println!("\nSources:");
        for citation in &response.citations {
            let preview: String = citation.excerpt.chars().take(80).collect();
            println!("  - {}: {}...", citation.document_ref, preview);
        }
    }

    if !response.professionals.is_empty() {
        println!("\nSuggested lawyers:");
        for professional in &response.professionals {
            let rating = professional
                .average_rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "unrated".to_string());
            println!(
                "  - {} ({}, {} yrs, {}) — {}",
                professional.full_name,
                professional.city,
                professional.experience_years,
                rating,
                professional.practice_area
            );
        }
    }

    Ok(())
}

fn load_professionals(path: Option<PathBuf>) -> Result<Vec<ProfessionalCandidate>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let content = std::fs::read_to_string(&path).map_err(|e| LexragError::Io {
        source: e,
        context: format!("Failed to read professionals file: {:?}", path),
    })?;
    serde_json::from_str(&content).map_err(|e| LexragError::Json {
        source: e,
        context: format!("Failed to parse professionals file: {:?}", path),
    })
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let index_dir = expand_path(&config.corpus.index_dir)?;

    println!("Lexrag Status");
    println!("=============");
    println!("\nEmbedding: {} ({})", config.embedding.backend, config.embedding.model);
    println!("Model backend: {} via {}", config.llm.model, config.llm.endpoint);
    println!("Categories: {}", config.categories.len());

    match VectorIndex::load(&index_dir) {
        Ok(index) => {
            println!(
                "\nIndex: {} chunks, {} dimensions ({})",
                index.len(),
                index.dimension(),
                index_dir.display()
            );
        }
        Err(IndexError::NotFound { .. }) => {
            println!(
                "\nIndex: not built (run 'lexrag build-index' after placing documents in {})",
                config.corpus.documents_dir.display()
            );
        }
        Err(e) => {
            println!("\nIndex: UNUSABLE — {}", e);
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| LexragError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = Config::default_path()?;

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| LexragError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'lexrag config init' to create one."
        );
        return Ok(Config::default());
    }

    Config::load(&path)
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| LexragError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| LexragError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
