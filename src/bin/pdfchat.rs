//! CLI binary for pdfchat.
//!
//! A thin shim over the library crate: maps subcommands and flags to
//! `RankerConfig` / `ChatConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_llm::{LLMProvider, ProviderFactory};
use indicatif::{ProgressBar, ProgressStyle};
use pdfchat::citations::reference_text;
use pdfchat::prompts::format_grounding;
use pdfchat::{
    extract_citations, search_document, ChatAnswer, ChatConfig, ChatConfigBuilder,
    ChatProgressCallback, ChatSession, Document, MatchStrategy, ProgressCallback, Ranker,
    RankerConfig,
};
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner shown while a question is in flight. A fresh spinner is started
/// for every turn, so one callback serves a whole interactive session.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }
}

impl ChatProgressCallback for CliProgressCallback {
    fn on_grounding(&self, paragraphs: usize, pages: &[u32]) {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Thinking");
        let pages: Vec<String> = pages.iter().map(u32::to_string).collect();
        bar.set_message(format!(
            "{paragraphs} paragraphs from page(s) {}",
            pages.join(", ")
        ));
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(bar) {
                old.finish_and_clear();
            }
        }
    }

    fn on_retry(&self, attempt: u32, max_retries: u32, backoff_ms: u64) {
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} retry {attempt}/{max_retries} in {backoff_ms}ms",
                cyan("⚠")
            ));
        });
    }

    fn on_answer(&self, _citations: usize, _duration_ms: u64) {
        self.finish();
    }

    fn on_error(&self, _error: &str) {
        self.finish();
    }
}

const AFTER_HELP: &str = r#"DOCUMENTS:
  <DOC> is either
    * a JSON array of paragraphs: [{"text": "...", "page": 1, "index": 0}, ...]
    * a plain-text file with pages separated by form feeds, e.g. the output of
        pdftotext report.pdf report.txt

EXAMPLES:
  # Which paragraphs would be sent for this question?
  pdfchat rank report.txt "How did revenue change?"

  # Same, with scores, typo-tolerant matching and a larger budget
  pdfchat rank --explain --fuzzy --max-paragraphs 8 report.txt "revenu growth"

  # Find pages containing every word
  pdfchat search report.txt "net income"

  # Parse citations out of a saved model answer
  pdfchat cite answer.txt

  # One question
  pdfchat ask report.txt "What are the main risks?"

  # Interactive session (type /reset to clear history, /quit to leave)
  pdfchat ask --provider anthropic --model claude-sonnet-4-20250514 report.txt

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Provider (openai, anthropic, gemini, ollama, ...)
  EDGEQUAKE_MODEL         Model ID
  RUST_LOG                Log filter, overrides --verbose

  Without --provider, OpenAI is used when OPENAI_API_KEY is set; otherwise
  the first provider with a configured API key is picked.
"#;

/// Chat with a PDF: grounded answers with page citations.
#[derive(Parser, Debug)]
#[command(
    name = "pdfchat",
    version,
    about = "Ask questions about a PDF and get answers with page citations",
    long_about = "Select the paragraphs of a document most relevant to a question, send \
them to a language model as page-tagged grounding, and extract the page citations from \
the answer. Supports OpenAI, Anthropic, Google Gemini, Ollama and any OpenAI-compatible \
endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFCHAT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "PDFCHAT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the paragraphs selected as grounding for a question.
    Rank {
        /// Document (JSON paragraphs or form-feed separated text).
        doc: PathBuf,
        /// The question.
        query: String,
        #[command(flatten)]
        ranker: RankerArgs,
        /// Print JSON instead of page-tagged text.
        #[arg(long)]
        json: bool,
        /// Also print every matching paragraph with its score (stderr).
        #[arg(long)]
        explain: bool,
    },

    /// Find pages containing every word of the query.
    Search {
        /// Document (JSON paragraphs or form-feed separated text).
        doc: PathBuf,
        /// Words that must all appear on a page.
        query: String,
        /// Print JSON.
        #[arg(long)]
        json: bool,
    },

    /// Extract `page N: text` citations from model output (JSON).
    Cite {
        /// File with the model answer. Reads stdin when omitted.
        file: Option<PathBuf>,
        /// Instead, print the text following the `[P<n>]` marker for this page.
        #[arg(long, value_name = "PAGE")]
        reference: Option<u32>,
    },

    /// Ask one question, or start an interactive session when none is given.
    Ask {
        /// Document (JSON paragraphs or form-feed separated text).
        doc: PathBuf,
        /// The question. Omit to read questions from stdin, one per line.
        question: Option<String>,
        #[command(flatten)]
        chat: ChatArgs,
        #[command(flatten)]
        ranker: RankerArgs,
        /// Print each answer as JSON (content, citations, token counts).
        #[arg(long)]
        json: bool,
        /// Disable the spinner.
        #[arg(long, env = "PDFCHAT_NO_PROGRESS")]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
struct RankerArgs {
    /// Maximum paragraphs sent to the model.
    #[arg(long, env = "PDFCHAT_MAX_PARAGRAPHS", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_paragraphs: u64,

    /// Best matches whose neighbours are included.
    #[arg(long, env = "PDFCHAT_TOP_MATCHES", default_value_t = 3)]
    top_matches: usize,

    /// Neighbouring paragraphs included on each side of a match.
    #[arg(long, env = "PDFCHAT_CONTEXT_WINDOW", default_value_t = 1)]
    context_window: usize,

    /// Typo-tolerant matching (edit distance) instead of substring matching.
    #[arg(long, env = "PDFCHAT_FUZZY")]
    fuzzy: bool,
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// LLM provider: openai, anthropic, gemini, ollama, ...
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFCHAT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max tokens per answer.
    #[arg(long, env = "PDFCHAT_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Retries on LLM failure.
    #[arg(long, env = "PDFCHAT_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Previous turns replayed to the model.
    #[arg(long, env = "PDFCHAT_HISTORY", default_value_t = 3)]
    history: usize,

    /// Path to a text file with a custom system prompt containing `{grounding}`.
    #[arg(long, env = "PDFCHAT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters during `ask`; INFO
    // logs would tear through it.
    let spinner_active = matches!(
        cli.command,
        Command::Ask { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner_active {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Rank {
            doc,
            query,
            ranker,
            json,
            explain,
        } => run_rank(&doc, &query, &ranker, json, explain),
        Command::Search { doc, query, json } => run_search(&doc, &query, json, cli.quiet),
        Command::Cite { file, reference } => run_cite(file.as_deref(), reference),
        Command::Ask {
            doc,
            question,
            chat,
            ranker,
            json,
            no_progress,
        } => {
            let progress: Option<ProgressCallback> = if !cli.quiet && !json && !no_progress {
                Some(CliProgressCallback::new() as Arc<dyn ChatProgressCallback>)
            } else {
                None
            };
            let config = build_chat_config(&chat, &ranker, progress).await?;
            let document = load_document(&doc)?;
            let mut session =
                ChatSession::new(document, config).context("Failed to start chat session")?;

            match question {
                Some(q) => {
                    let answer = session.ask(&q).await.context("Question failed")?;
                    print_answer(&answer, json, cli.quiet)
                }
                None => run_interactive(&mut session, json, cli.quiet).await,
            }
        }
    }
}

// ── Subcommands ──────────────────────────────────────────────────────────────

fn run_rank(doc: &Path, query: &str, args: &RankerArgs, json: bool, explain: bool) -> Result<()> {
    let document = load_document(doc)?;
    let ranker = Ranker::new(ranker_config(args)?);

    if explain {
        let scored = ranker.score(query, document.paragraphs());
        if scored.is_empty() {
            eprintln!("{}", dim("no paragraph matched; falling back to the first paragraphs"));
        }
        for s in &scored {
            eprintln!(
                "{}  page {:>3}  #{:<5} {}",
                bold(&format!("{:>6.2}", s.score)),
                s.paragraph.page,
                s.paragraph.index,
                dim(&preview(&s.paragraph.text, 70)),
            );
        }
    }

    let selected = ranker.rank(query, document.paragraphs());
    if json {
        let out = serde_json::to_string_pretty(&selected).context("Failed to serialise paragraphs")?;
        println!("{out}");
    } else {
        println!("{}", format_grounding(&selected));
    }
    Ok(())
}

fn run_search(doc: &Path, query: &str, json: bool, quiet: bool) -> Result<()> {
    let document = load_document(doc)?;
    let hits = search_document(query, &document);

    if json {
        let out = serde_json::to_string_pretty(&hits).context("Failed to serialise results")?;
        println!("{out}");
        return Ok(());
    }

    for hit in &hits {
        println!("{} {}", bold(&format!("page {}:", hit.page)), hit.excerpt);
    }
    if !quiet {
        eprintln!(
            "{}",
            dim(&format!("{} of {} pages matched", hits.len(), document.page_count()))
        );
    }
    Ok(())
}

fn run_cite(file: Option<&Path>, reference: Option<u32>) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    if let Some(page) = reference {
        println!("{}", reference_text(&text, page));
        return Ok(());
    }

    let citations = extract_citations(&text);
    let out = serde_json::to_string_pretty(&citations).context("Failed to serialise citations")?;
    println!("{out}");
    Ok(())
}

async fn run_interactive(session: &mut ChatSession, json: bool, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!(
            "{} {} paragraphs over {} pages loaded. {}",
            cyan("◆"),
            bold(&session.document().len().to_string()),
            session.document().page_count(),
            dim("/reset clears history, /quit exits")
        );
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if !quiet {
            eprint!("{} ", bold(">"));
            io::stderr().flush().ok();
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read stdin")?;
        let question = line.trim();

        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                session.reset();
                if !quiet {
                    eprintln!("{}", dim("history cleared"));
                }
                continue;
            }
            _ => {}
        }

        // A failed turn leaves history untouched; report it and keep going.
        match session.ask(question).await {
            Ok(answer) => print_answer(&answer, json, quiet)?,
            Err(e) => eprintln!("{} {e}", red("✗")),
        }
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn print_answer(answer: &ChatAnswer, json: bool, quiet: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string(answer).context("Failed to serialise answer")?;
        println!("{out}");
        return Ok(());
    }

    println!("{}", answer.content.trim_end());
    if quiet {
        return Ok(());
    }

    let pages = answer.cited_pages();
    if pages.is_empty() {
        eprintln!("{}", dim("(no page cited)"));
    } else {
        let pages: Vec<String> = pages.iter().map(u32::to_string).collect();
        eprintln!("{} sources: page {}", green("✔"), bold(&pages.join(", ")));
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out  —  {}ms",
        dim(&answer.input_tokens.to_string()),
        dim(&answer.output_tokens.to_string()),
        answer.duration_ms,
    );
    Ok(())
}

fn load_document(path: &Path) -> Result<Document> {
    let document = Document::load(path)
        .with_context(|| format!("Failed to load document {}", path.display()))?;
    if document.is_empty() {
        anyhow::bail!("Document {} contains no text", path.display());
    }
    Ok(document)
}

fn ranker_config(args: &RankerArgs) -> Result<RankerConfig> {
    let max_paragraphs =
        usize::try_from(args.max_paragraphs).context("--max-paragraphs is too large")?;
    RankerConfig::builder()
        .max_paragraphs(max_paragraphs)
        .top_matches(args.top_matches)
        .context_window(args.context_window)
        .strategy(if args.fuzzy {
            MatchStrategy::Fuzzy
        } else {
            MatchStrategy::Exact
        })
        .build()
        .context("Invalid ranker configuration")
}

/// Map CLI args to `ChatConfig`.
async fn build_chat_config(
    chat: &ChatArgs,
    ranker: &RankerArgs,
    progress: Option<ProgressCallback>,
) -> Result<ChatConfig> {
    let mut builder = ChatConfig::builder()
        .temperature(chat.temperature)
        .max_tokens(chat.max_tokens)
        .max_retries(chat.max_retries)
        .history_window(chat.history)
        .ranker(ranker_config(ranker)?);

    if let Some(ref path) = chat.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let builder = select_provider(builder, chat)?;
    builder.build().context("Invalid configuration")
}

/// Pick the provider, from most to least specific:
///
/// 1. `--provider` / `EDGEQUAKE_LLM_PROVIDER` (with `--model` / `EDGEQUAKE_MODEL`)
/// 2. OpenAI when `OPENAI_API_KEY` is set
/// 3. whatever `ProviderFactory::from_env` finds first
fn select_provider(builder: ChatConfigBuilder, chat: &ChatArgs) -> Result<ChatConfigBuilder> {
    let with_model = |b: ChatConfigBuilder| match chat.model {
        Some(ref m) => b.model(m.clone()),
        None => b,
    };

    if let Some(ref name) = chat.provider {
        if !name.is_empty() {
            return Ok(with_model(builder.provider_name(name.clone())));
        }
    }

    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return Ok(with_model(builder.provider_name("openai")));
        }
    }

    let (llm, _embedding) = ProviderFactory::from_env().map_err(|e| {
        anyhow::anyhow!(
            "No LLM provider could be auto-detected from environment.\n\
             Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
             Error: {e}"
        )
    })?;

    if let Some(ref model) = chat.model {
        eprintln!(
            "{}",
            dim(&format!("using {} provider with model {model}", llm.name()))
        );
    }
    Ok(use_detected_provider(builder, llm, chat.model.as_deref()))
}

/// `from_env` picks its own default model, so an explicit model means
/// re-creating the detected provider by name.
fn use_detected_provider(
    builder: ChatConfigBuilder,
    llm: Arc<dyn LLMProvider>,
    model: Option<&str>,
) -> ChatConfigBuilder {
    match model {
        Some(model) => builder.provider_name(llm.name()).model(model),
        None => builder.provider(llm),
    }
}

/// First `max` chars of `text` on one line.
fn preview(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push('\u{2026}');
    }
    out.replace('\n', " ")
}
