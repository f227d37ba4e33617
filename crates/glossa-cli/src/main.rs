mod fixture;
mod http;

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use glossa_core::{
    AnnotationEngine, ContentTree, EngineConfig, FileStore, KeyCombo, LookupError, LookupOutcome,
    RunOutcome, SaveAction, SchemaResolver, SelectionSnapshot, TermService, Translation, TriggerMode,
    VocabularyLookup, extract_context,
};
use miette::{IntoDiagnostic, Result, WrapErr};

use crate::fixture::{FixtureService, MemoryVocabulary};
use crate::http::{HttpTermService, HttpVocabulary};

#[derive(Parser)]
#[command(version, about = "Glossa - annotate technical terms in a document", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Engine configuration (.json or .toml)
    #[arg(long, global = true, env = "GLOSSA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the context the engine would send for a selection
    Context {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// Run the engine over a selection and print the rewritten document
    Annotate {
        #[command(flatten)]
        selection: SelectionArgs,

        /// What to do with the selection
        #[arg(long, value_enum, default_value_t = ModeArg::Mark, conflicts_with = "key")]
        mode: ModeArg,

        /// Simulate a keydown chord instead of picking a mode, e.g. "Shift+T"
        #[arg(long)]
        key: Option<KeyCombo>,

        /// Topic sent along with mark-mode requests
        #[arg(long)]
        topic: Option<String>,

        /// Canned service answers, keyed by operation name
        #[arg(long, conflicts_with = "endpoint", required_unless_present = "endpoint")]
        fixture: Option<PathBuf>,

        /// Base URL of the term service
        #[arg(long, env = "GLOSSA_ENDPOINT")]
        endpoint: Option<String>,

        /// Base URL of the vocabulary store; in-memory when omitted
        #[arg(long, env = "GLOSSA_VOCABULARY")]
        vocabulary: Option<String>,

        /// Look up every mounted annotation after the run
        #[arg(long)]
        lookup: bool,

        /// Save looked-up words to the vocabulary store
        #[arg(long, requires = "lookup")]
        save: bool,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Document to load: a .json node tree, or plain text with blank-line paragraphs
    document: PathBuf,

    /// Text to select
    #[arg(long, short)]
    select: String,

    /// Which occurrence of the text to select, from zero
    #[arg(long, default_value_t = 0)]
    nth: usize,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Mark,
    Translate,
}

impl From<ModeArg> for TriggerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Mark => TriggerMode::Mark,
            ModeArg::Translate => TriggerMode::Translate,
        }
    }
}

/// Everything `annotate` does after the collaborators are chosen.
struct AnnotateJob {
    mode: ModeArg,
    key: Option<KeyCombo>,
    topic: Option<String>,
    lookup: bool,
    save: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(&FileStore::new(path))
            .await
            .wrap_err_with(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Context { selection } => {
            let doc = load_document(&selection.document)?;
            let snapshot = select(&doc, &selection)?;
            let extracted = extract_context(&doc, &snapshot);
            println!("selected: {}", extracted.selected_text);
            match extracted.context {
                Some(context) => {
                    println!("context:  {}", context.raw);
                    println!("marked:   {}", context.marked);
                }
                None => println!("context:  (none)"),
            }
        }
        Commands::Annotate {
            selection,
            mode,
            key,
            topic,
            fixture,
            endpoint,
            vocabulary,
            lookup,
            save,
        } => {
            let doc = RefCell::new(load_document(&selection.document)?);
            let snapshot = select(&doc.borrow(), &selection)?;
            let job = AnnotateJob {
                mode,
                key,
                topic,
                lookup,
                save,
            };

            match (fixture, endpoint) {
                (Some(path), _) => {
                    let service = FixtureService::load(&path)?;
                    match vocabulary {
                        Some(url) => annotate(config, service, HttpVocabulary::new(url), &job, snapshot, &doc).await?,
                        None => annotate(config, service, MemoryVocabulary::default(), &job, snapshot, &doc).await?,
                    }
                }
                (None, Some(url)) => {
                    let service = HttpTermService::new(url);
                    match vocabulary {
                        Some(url) => annotate(config, service, HttpVocabulary::new(url), &job, snapshot, &doc).await?,
                        None => annotate(config, service, MemoryVocabulary::default(), &job, snapshot, &doc).await?,
                    }
                }
                (None, None) => {
                    return Err(miette::miette!("either --fixture or --endpoint is required"));
                }
            }

            println!("{}", doc.borrow().render_html());
        }
    }

    Ok(())
}

async fn annotate<S: TermService, V: VocabularyLookup>(
    config: EngineConfig,
    service: S,
    vocabulary: V,
    job: &AnnotateJob,
    snapshot: SelectionSnapshot,
    doc: &RefCell<ContentTree>,
) -> Result<()> {
    let engine = AnnotationEngine::new(config, SchemaResolver::new(service), vocabulary);
    if let Some(topic) = &job.topic {
        engine.set_topic(topic);
    }

    let outcome = match &job.key {
        Some(combo) => {
            engine
                .handle_key(&combo.key, combo.modifiers, &snapshot, doc)
                .await?
        }
        None => engine.run(job.mode.into(), Some(snapshot), doc).await?,
    };

    let report = match outcome {
        RunOutcome::Annotated(report) => report,
        RunOutcome::Ignored => {
            eprintln!("⚠ Key is not bound to a trigger");
            return Ok(());
        }
        RunOutcome::NoSelection => {
            eprintln!("⚠ Nothing selected");
            return Ok(());
        }
    };

    eprintln!(
        "✓ {} run: {} target(s), {} match(es), {} widget(s) mounted",
        report.mode,
        report.targets,
        report.placeholders,
        report.anchors.len()
    );
    for failure in &report.failures {
        eprintln!("⚠ {failure}");
    }

    if !job.lookup {
        return Ok(());
    }
    for anchor in report.anchors {
        // The engine has already notified; keep going with the other widgets.
        let Ok(outcome) = engine.lookup(doc, anchor).await else {
            continue;
        };
        print_lookup(&outcome);
        if job.save && matches!(outcome.translation, Translation::Vocabulary { .. }) {
            eprintln!("{}", save_status(&engine.save(doc, anchor).await));
        }
    }
    Ok(())
}

fn save_status(result: &std::result::Result<SaveAction, LookupError>) -> String {
    match result {
        Ok(SaveAction::Created) => "✓ saved".to_string(),
        Ok(SaveAction::Updated { id }) => format!("✓ updated {id}"),
        Err(err) => format!("⚠ save failed: {err}"),
    }
}

fn print_lookup(outcome: &LookupOutcome) {
    match &outcome.translation {
        Translation::Vocabulary { lemma, record } => {
            eprintln!("→ {} ({lemma}) {}", record.vocabulary, record.pronunciation);
            eprintln!("  {}: {}", record.translated_vi, record.definition_en);
            if !record.example_sentences.is_empty() {
                eprintln!("  e.g. {}", record.example_sentences);
            }
            if !outcome.existing.is_empty() {
                eprintln!("  already saved {} time(s)", outcome.existing.len());
            }
        }
        Translation::Text(text) => {
            eprintln!("→ {}", text.text);
            eprintln!("  {}", text.translated_vi);
        }
    }
}

fn load_document(path: &Path) -> Result<ContentTree> {
    let raw = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
        ContentTree::from_json(&raw)
            .into_diagnostic()
            .wrap_err_with(|| format!("parsing {}", path.display()))
    } else {
        Ok(ContentTree::from_plain_text(&raw))
    }
}

fn select(doc: &ContentTree, args: &SelectionArgs) -> Result<SelectionSnapshot> {
    doc.select_text(&args.select, args.nth).ok_or_else(|| {
        miette::miette!(
            help = "occurrences are counted from zero across the whole document",
            "occurrence {} of {:?} not found",
            args.nth,
            args.select
        )
    })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}
