//! bibflow CLI: run one cataloging workflow from the command line.
//!
//! Connection settings come from flags or the environment (a `.env` file is
//! loaded first); the collected history is printed when the run finishes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bibflow::catalog::{CatalogConfig, HttpCatalog};
use bibflow::linked_data::HttpLinkedData;
use bibflow::llm::HttpCompletionClient;
use bibflow::sinks::{HistoryKind, MemoryDisplay, MemoryHistory};
use bibflow::workflow::{
    AssignHeadings, LinkedDataToInstance, MarcToInstance, NewResource, Workflow, WorkflowContext,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkflowChoice {
    /// Create a record from a natural-language description.
    NewResource,
    /// Convert a MARC21 record into an instance record.
    Marc,
    /// Convert a Sinopia linked-data resource into an instance record.
    Sinopia,
    /// Assign subject headings in a plain chat turn.
    Headings,
}

#[derive(Parser, Debug)]
#[command(name = "bibflow")]
#[command(about = "bibflow — run an LLM cataloging workflow")]
struct Args {
    /// Which workflow to run
    #[arg(value_enum)]
    workflow: WorkflowChoice,

    /// Initial prompt (description, MARC text, resource URL, or terms)
    #[arg(short, long, value_name = "TEXT", conflicts_with = "file")]
    prompt: Option<String>,

    /// Read the initial prompt from a file (e.g. a MARC text export)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Skip few-shot examples in the system prompt
    #[arg(long)]
    zero_shot: bool,

    /// Completion endpoint URL
    #[arg(
        long,
        value_name = "URL",
        env = "BIBFLOW_COMPLETION_URL",
        default_value = "https://api.openai.com/v1/chat/completions"
    )]
    completion_url: String,

    /// Completion endpoint API key
    #[arg(long, value_name = "KEY", env = "BIBFLOW_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Okapi gateway base URL
    #[arg(long, value_name = "URL", env = "BIBFLOW_OKAPI_URL")]
    okapi_url: String,

    /// Okapi tenant id
    #[arg(long, value_name = "TENANT", env = "BIBFLOW_OKAPI_TENANT")]
    tenant: String,

    /// Okapi auth token
    #[arg(long, value_name = "TOKEN", env = "BIBFLOW_OKAPI_TOKEN", hide_env_values = true)]
    token: String,

    /// Catalog UI base URL (viewer links)
    #[arg(long, value_name = "URL", env = "BIBFLOW_VIEW_BASE")]
    view_base: String,
}

impl Args {
    fn initial_prompt(&self) -> Result<String, Box<dyn std::error::Error>> {
        if let Some(prompt) = &self.prompt {
            return Ok(prompt.clone());
        }
        if let Some(path) = &self.file {
            return Ok(std::fs::read_to_string(path)?);
        }
        Err("provide an initial prompt with --prompt or --file".into())
    }
}

fn build_workflow(
    choice: WorkflowChoice,
    context: Arc<WorkflowContext>,
    zero_shot: bool,
) -> Result<Box<dyn Workflow>, bibflow::workflow::WorkflowBuildError> {
    Ok(match choice {
        WorkflowChoice::NewResource => Box::new(NewResource::new(context, zero_shot)?),
        WorkflowChoice::Marc => Box::new(MarcToInstance::new(context, zero_shot)?),
        WorkflowChoice::Sinopia => Box::new(LinkedDataToInstance::new(context, zero_shot)?),
        WorkflowChoice::Headings => Box::new(AssignHeadings::new(context, zero_shot)?),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let initial_prompt = args.initial_prompt()?;

    let client = Arc::new(HttpCompletionClient::new(&args.completion_url, &args.api_key));
    let catalog = Arc::new(HttpCatalog::new(CatalogConfig {
        okapi_url: args.okapi_url.clone(),
        tenant: args.tenant.clone(),
        token: args.token.clone(),
        view_base: args.view_base.clone(),
    }));
    let history = Arc::new(MemoryHistory::new());
    let display = Arc::new(MemoryDisplay::new());

    let context = Arc::new(
        WorkflowContext::new(client, catalog, Arc::new(HttpLinkedData::new())).with_sinks(
            Arc::clone(&history) as Arc<dyn bibflow::sinks::HistorySink>,
            Arc::clone(&display) as Arc<dyn bibflow::sinks::RecordDisplay>,
        ),
    );

    let workflow = build_workflow(args.workflow, Arc::clone(&context), args.zero_shot)?;
    debug!(workflow = workflow.name(), "starting run");
    let outcome = workflow.run(&initial_prompt).await?;

    for entry in history.entries() {
        let tag = match entry.kind {
            HistoryKind::Prompt => ">>",
            HistoryKind::Response => "<<",
        };
        println!("{tag} {}", entry.value);
    }
    for url in display.shown() {
        println!("viewer: {url}");
    }
    for failure in display.failures() {
        eprintln!("catalog rejected record ({}): {}", failure.status, failure.body);
    }
    println!("{outcome}");
    Ok(())
}
