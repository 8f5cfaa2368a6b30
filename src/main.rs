// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use llm_translate::app_config::{Config, ConfigOverrides, ProviderKind};
use llm_translate::errors::TranslationError;
use llm_translate::file_utils::FileManager;
use llm_translate::logging::LogContext;
use llm_translate::providers::create_provider;
use llm_translate::translation::cache::{CacheManager, NullCache, TranslationCache};
use llm_translate::translation::formatting::DocumentFormat;
use llm_translate::translation::glossary::{load_glossary, save_glossary, validate_glossary, GlossaryTerm};
use llm_translate::translation::invalidation::policies_for_preset;
use llm_translate::translation::modes::QualityMode;
use llm_translate::translation::{BatchTranslator, DocumentResult, TranslateOptions, TranslationEngine};

const CONFIG_FILE_NAME: &str = ".translaterc.json";
const DEFAULT_CACHE_DIR: &str = ".translate-cache";

/// Options shared by `file` and `dir`
#[derive(Args, Debug, Clone)]
struct TranslateFlags {
    /// Source language code (e.g., 'en')
    #[arg(short, long)]
    source_lang: Option<String>,

    /// Target language code (e.g., 'ko')
    #[arg(short, long)]
    target_lang: Option<String>,

    /// Path to glossary file
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// LLM provider (claude|openai|ollama|custom)
    #[arg(short, long)]
    provider: Option<ProviderKind>,

    /// Model name
    #[arg(short, long)]
    model: Option<String>,

    /// Quality threshold (0-100)
    #[arg(long)]
    quality: Option<f64>,

    /// Max refinement iterations
    #[arg(long)]
    max_iterations: Option<u32>,

    /// Quality preset (fast|balanced|quality)
    #[arg(long)]
    mode: Option<QualityMode>,

    /// Force document format (md|html|txt)
    #[arg(short, long)]
    format: Option<DocumentFormat>,

    /// Show what would be translated
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Max tokens per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Disable translation cache
    #[arg(long)]
    no_cache: bool,

    /// Additional context for translation
    #[arg(long)]
    context: Option<String>,

    /// Fail if quality threshold is not met
    #[arg(long)]
    strict_quality: bool,

    /// Fail if glossary terms are not applied
    #[arg(long)]
    strict_glossary: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a single file ('-' reads stdin and writes stdout)
    File {
        /// Input file path
        input: String,

        /// Output file path
        output: Option<PathBuf>,

        /// Output path (same as the positional output)
        #[arg(short = 'o', long = "output", conflicts_with = "output")]
        output_flag: Option<PathBuf>,

        #[command(flatten)]
        flags: TranslateFlags,
    },

    /// Translate all documents in a directory
    Dir {
        /// Input directory path
        input: PathBuf,

        /// Output directory path
        output: PathBuf,

        /// Files translated in parallel
        #[arg(long)]
        parallel: Option<usize>,

        #[command(flatten)]
        flags: TranslateFlags,
    },

    /// Manage glossary files
    #[command(subcommand)]
    Glossary(GlossaryCommand),

    /// Inspect or clear the translation cache
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Write a starter .translaterc.json
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions for llm-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum GlossaryCommand {
    /// List glossary terms
    List {
        path: PathBuf,
        /// Filter by target language
        #[arg(long)]
        lang: Option<String>,
    },
    /// Check a glossary file for problems
    Validate { path: PathBuf },
    /// Add a term
    Add {
        path: PathBuf,
        source: String,
        /// Target translation as lang:value, repeatable (e.g., ko:클러스터)
        #[arg(long = "target")]
        targets: Vec<String>,
        /// Usage context
        #[arg(long)]
        context: Option<String>,
        #[arg(long)]
        case_sensitive: bool,
        #[arg(long)]
        do_not_translate: bool,
    },
    /// Remove a term
    Remove { path: PathBuf, source: String },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Show entry count and size
    Stats {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Remove every entry
    Clear {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// llm-translate - Document translation with self-refining LLM agents
#[derive(Parser, Debug)]
#[command(name = "llm-translate")]
#[command(version)]
#[command(about = "Translate documents with LLMs, glossaries and quality refinement")]
#[command(long_about = "llm-translate translates Markdown, HTML and text documents with an LLM,
evaluating and refining each chunk until it reaches a quality threshold.

EXAMPLES:
    llm-translate file README.md -s en -t ko            # Writes README.ko.md
    llm-translate file guide.md -t ja --mode quality    # Analysis + MQM, 4 iterations
    cat notes.txt | llm-translate file - -t fr          # stdin to stdout
    llm-translate dir docs/ docs-ko/ -t ko --parallel 4
    llm-translate glossary validate glossary.json
    llm-translate completions bash > llm-translate.bash

CONFIGURATION:
    Settings are read from .translaterc.json in the working directory or any
    parent. Run `llm-translate init` to create one.")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker for log level
    fn marker_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "✖",
            Level::Warn => "!",
            Level::Info => "•",
            Level::Debug => "·",
            Level::Trace => "…",
        }
    }

    // @returns: ANSI colour for log level
    fn colour_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::colour_for_level(record.level()),
                now,
                Self::marker_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    if CustomLogger::init(LevelFilter::Info).is_err() {
        eprintln!("Warning: logger already initialized");
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        let code = e
            .downcast_ref::<TranslationError>()
            .map(TranslationError::exit_code)
            .unwrap_or(1);
        eprintln!("Error: {:#}", e);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::File {
            input,
            output,
            output_flag,
            flags,
        } => run_file(cli.config.as_deref(), &input, output.or(output_flag), flags).await,
        Commands::Dir {
            input,
            output,
            parallel,
            flags,
        } => run_dir(cli.config.as_deref(), &input, &output, parallel, flags).await,
        Commands::Glossary(command) => run_glossary(command),
        Commands::Cache(command) => run_cache(cli.config.as_deref(), command),
        Commands::Init { force } => run_init(force),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "llm-translate", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn apply_log_level(config: &Config, flags: &TranslateFlags) {
    let level = if flags.quiet || flags.json {
        LevelFilter::Error
    } else if flags.verbose {
        LevelFilter::Debug
    } else {
        config.log_level.to_level_filter()
    };
    log::set_max_level(level);
}

/// Config file + command line overrides, validated
fn load_config(config_path: Option<&Path>, flags: &TranslateFlags) -> Result<Config> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let base = Config::load(config_path, &cwd)?;

    let config = base.merge(&ConfigOverrides {
        source_lang: flags.source_lang.clone(),
        target_lang: flags.target_lang.clone(),
        provider: flags.provider,
        model: flags.model.clone(),
        quality: flags.quality,
        max_iterations: flags.max_iterations,
        chunk_size: flags.chunk_size,
        glossary: flags.glossary.as_ref().map(|p| p.display().to_string()),
        output: None,
        no_cache: flags.no_cache,
    });
    config.validate()?;
    Ok(config)
}

fn translate_options(config: &Config, flags: &TranslateFlags) -> Result<TranslateOptions> {
    let target_lang = config
        .languages
        .targets
        .first()
        .cloned()
        .ok_or_else(|| TranslationError::ConfigInvalid {
            path: "<command line>".to_string(),
            errors: vec!["target language is required (-t, --target-lang)".to_string()],
        })?;

    Ok(TranslateOptions {
        source_lang: config.languages.source.clone(),
        target_lang,
        format: flags.format,
        glossary_path: flags.glossary.clone(),
        quality_threshold: flags.quality,
        max_iterations: flags.max_iterations,
        mode: flags.mode,
        context: flags.context.clone(),
        style_instruction: None,
        strict_quality: flags.strict_quality,
        strict_glossary: flags.strict_glossary,
    })
}

fn build_cache(config: &Config, log: &LogContext) -> Arc<dyn TranslationCache> {
    match &config.paths.cache {
        Some(dir) => Arc::new(
            CacheManager::new(dir)
                .with_policies(policies_for_preset(config.cache.policy, config.cache.quality_floor))
                .with_log(log.scoped("cache")),
        ),
        None => Arc::new(NullCache),
    }
}

fn build_engine(config: Config, verbose: bool) -> Result<TranslationEngine> {
    let log = LogContext::facade(verbose);
    let provider = create_provider(&config)?;
    let cache = build_cache(&config, &log);
    Ok(TranslationEngine::new(config, provider).with_cache(cache).with_log(log))
}

async fn run_file(config_path: Option<&Path>, input: &str, output: Option<PathBuf>, flags: TranslateFlags) -> Result<()> {
    let from_stdin = input == "-";
    let config = load_config(config_path, &flags)?;
    if from_stdin {
        // stdout carries the translation
        log::set_max_level(LevelFilter::Error);
    } else {
        apply_log_level(&config, &flags);
    }
    let options = translate_options(&config, &flags)?;

    let (content, input_path) = if from_stdin {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        if content.trim().is_empty() {
            return Err(TranslationError::FileRead {
                path: "<stdin>".to_string(),
                message: "No input provided".to_string(),
            }
            .into());
        }
        (content, None)
    } else {
        let path = PathBuf::from(input);
        (FileManager::read_to_string(&path)?, Some(path))
    };

    let output_path = match (&input_path, output) {
        (_, Some(path)) => Some(path),
        (Some(path), None) => Some(FileManager::output_path_for(path, &options.target_lang)),
        (None, None) => None,
    };

    if flags.dry_run {
        println!("Dry run mode - no translation will be performed");
        println!("Input: {}", input_path.as_deref().map_or("<stdin>".into(), |p| p.display().to_string()));
        println!("Output: {}", output_path.as_deref().map_or("<stdout>".into(), |p| p.display().to_string()));
        println!("Source language: {}", options.source_lang);
        println!("Target language: {}", options.target_lang);
        println!("Content length: {} characters", content.chars().count());
        return Ok(());
    }

    if let Some(path) = &input_path {
        info!("Reading: {}", path.display());
        info!("Translating: {} → {}", options.source_lang, options.target_lang);
    }

    let mut options = options;
    if options.format.is_none() {
        options.format = input_path.as_deref().and_then(DocumentFormat::from_path);
    }

    let engine = build_engine(config, flags.verbose)?;
    let result = engine.translate_content(&content, &options).await?;

    let Some(output_path) = output_path else {
        print!("{}", result.content);
        return Ok(());
    };
    FileManager::write_to_file(&output_path, &result.content)?;

    if flags.json {
        let report = serde_json::json!({
            "success": true,
            "input": input_path,
            "output": output_path,
            "sourceLang": options.source_lang,
            "targetLang": options.target_lang,
            "quality": result.metadata.average_quality,
            "durationMs": result.metadata.duration.as_millis() as u64,
            "chunks": result.chunks.len(),
            "provider": result.metadata.provider,
            "model": result.metadata.model,
            "iterations": result.metadata.total_iterations,
            "tokensUsed": result.metadata.tokens_used,
            "cache": result.metadata.cache,
            "glossaryCompliance": result.glossary_compliance,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !flags.quiet {
        info!("Written to {}", output_path.display());
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &DocumentResult) {
    let meta = &result.metadata;
    println!();
    println!("  Translation Summary:");
    println!("  - Model: {}/{}", meta.provider, meta.model);
    println!("  - Quality: {:.0}/100", meta.average_quality);
    println!("  - Chunks: {}", result.chunks.len());
    println!("  - Iterations: {}", meta.total_iterations);
    println!(
        "  - Tokens: {} input / {} output",
        meta.tokens_used.input_tokens, meta.tokens_used.output_tokens
    );
    println!("  - Cache: {} hits / {} misses", meta.cache.hits, meta.cache.misses);
    if let Some(compliance) = &result.glossary_compliance {
        println!("  - Glossary: {:.0}% ({} missed)", compliance.score, compliance.missed.len());
    }
    println!("  - Duration: {:.1}s", meta.duration.as_secs_f64());
}

async fn run_dir(
    config_path: Option<&Path>,
    input: &Path,
    output: &Path,
    parallel: Option<usize>,
    flags: TranslateFlags,
) -> Result<()> {
    let config = load_config(config_path, &flags)?;
    apply_log_level(&config, &flags);
    let options = translate_options(&config, &flags)?;

    if flags.dry_run {
        let files = FileManager::find_documents(input, &config.ignore)?;
        println!("Dry run mode - no translation will be performed");
        for file in &files {
            println!(
                "{} → {}",
                file.display(),
                FileManager::mirrored_output_path(input, file, output).display()
            );
        }
        println!("{} files, {} → {}", files.len(), options.source_lang, options.target_lang);
        return Ok(());
    }

    let engine = Arc::new(build_engine(config, flags.verbose)?);
    let mut batch = BatchTranslator::new(engine).with_log(LogContext::facade(flags.verbose));
    if let Some(parallel) = parallel {
        batch = batch.with_concurrency(parallel);
    }

    let total = batch.discover(input)?.len() as u64;
    let progress_bar = if flags.quiet || flags.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(total)
    };
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress_bar.set_style(style.progress_chars("█▓▒░"));
    progress_bar.set_message("Translating");

    let summary = batch
        .translate_directory(input, output, &options, |progress| {
            progress_bar.inc(1);
            let name = progress.file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
            if progress.success {
                progress_bar.set_message(name);
            } else {
                progress_bar.set_message(format!("failed: {}", name));
            }
        })
        .await?;
    progress_bar.finish_and_clear();

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !flags.quiet {
        println!();
        println!("  Directory Summary:");
        println!("  - Succeeded: {}", summary.succeeded);
        println!("  - Failed: {}", summary.failed);
        println!("  - Quality: {:.0}/100", summary.average_quality);
        println!(
            "  - Tokens: {} input / {} output",
            summary.tokens_used.input_tokens, summary.tokens_used.output_tokens
        );
        println!("  - Duration: {:.1}s", summary.duration.as_secs_f64());
        for failed in summary.files.iter().filter(|f| !f.success) {
            warn!("{}: {}", failed.input.display(), failed.error.as_deref().unwrap_or("unknown error"));
        }
    }

    if summary.failed > 0 {
        return Err(anyhow!("{} of {} files failed", summary.failed, summary.files.len()));
    }
    Ok(())
}

fn run_glossary(command: GlossaryCommand) -> Result<()> {
    match command {
        GlossaryCommand::List { path, lang } => {
            let glossary = load_glossary(&path)?;
            println!("Glossary: {} ({} terms)", glossary.metadata.name, glossary.terms.len());
            for term in &glossary.terms {
                if term.do_not_translate.unwrap_or(false) {
                    println!("  {} [do not translate]", term.source);
                    continue;
                }
                match &lang {
                    Some(lang) => {
                        if let Some(target) = term.targets.get(lang) {
                            println!("  {} → {}", term.source, target);
                        }
                    }
                    None => {
                        let targets: Vec<String> =
                            term.targets.iter().map(|(l, t)| format!("{}: {}", l, t)).collect();
                        println!("  {} → {}", term.source, targets.join(", "));
                    }
                }
            }
            Ok(())
        }
        GlossaryCommand::Validate { path } => {
            let glossary = load_glossary(&path)?;
            let errors = validate_glossary(&glossary);
            if errors.is_empty() {
                println!("✓ Glossary is valid ({} terms)", glossary.terms.len());
                return Ok(());
            }
            for error in &errors {
                println!("  ✖ {}", error);
            }
            Err(TranslationError::GlossaryInvalid {
                path: path.display().to_string(),
                message: format!("{} problems found", errors.len()),
            }
            .into())
        }
        GlossaryCommand::Add {
            path,
            source,
            targets,
            context,
            case_sensitive,
            do_not_translate,
        } => {
            let mut glossary = load_glossary(&path)?;
            let mut term = GlossaryTerm {
                source: source.clone(),
                context,
                case_sensitive: case_sensitive.then_some(true),
                do_not_translate: do_not_translate.then_some(true),
                ..GlossaryTerm::default()
            };
            for target in &targets {
                let (lang, value) = target
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Invalid target '{}', expected lang:value", target))?;
                term.targets.insert(lang.trim().to_string(), value.trim().to_string());
            }
            glossary.add_term(term)?;
            save_glossary(&glossary, &path)?;
            println!("Added \"{}\"", source);
            Ok(())
        }
        GlossaryCommand::Remove { path, source } => {
            let mut glossary = load_glossary(&path)?;
            if !glossary.remove_term(&source) {
                return Err(anyhow!("Term \"{}\" not found", source));
            }
            save_glossary(&glossary, &path)?;
            println!("Removed \"{}\"", source);
            Ok(())
        }
    }
}

fn cache_dir(config_path: Option<&Path>, dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = dir {
        return Ok(dir);
    }
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = Config::load(config_path, &cwd)?;
    Ok(PathBuf::from(config.paths.cache.unwrap_or_else(|| DEFAULT_CACHE_DIR.to_string())))
}

fn run_cache(config_path: Option<&Path>, command: CacheCommand) -> Result<()> {
    match command {
        CacheCommand::Stats { dir } => {
            let dir = cache_dir(config_path, dir)?;
            let stats = CacheManager::new(&dir).stats();
            println!("Cache: {}", dir.display());
            println!("  - Entries: {}", stats.entries);
            println!("  - Size: {:.1} KB", stats.size_bytes as f64 / 1024.0);
            println!("  - Version: {}", stats.version);
            Ok(())
        }
        CacheCommand::Clear { dir } => {
            let dir = cache_dir(config_path, dir)?;
            let cache = CacheManager::new(&dir);
            let entries = cache.stats().entries;
            cache.clear();
            println!("Cleared {} entries from {}", entries, dir.display());
            Ok(())
        }
    }
}

fn run_init(force: bool) -> Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        return Err(anyhow!("{} already exists (use --force to overwrite)", CONFIG_FILE_NAME));
    }

    let json = serde_json::to_string_pretty(&Config::default_project())?;
    FileManager::write_to_file(&path, &json)?;
    info!("Created {}", path.display());
    Ok(())
}
