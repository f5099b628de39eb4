use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "precheck",
    version,
    about = "Structural and quality precheck for task documents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Precheck(PrecheckArgs),
    Search(SearchArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum EmbeddingBackend {
    Local,
    Ollama,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LlmBackend {
    Ollama,
    Offline,
}

impl LlmBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Offline => "offline",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    #[arg(long, default_value = ".cache/precheck")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PrecheckArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    #[arg(long, conflicts_with_all = ["task_id", "content_file", "requirements"])]
    pub request: Option<PathBuf>,

    #[arg(long)]
    pub task_id: Option<String>,

    #[arg(long)]
    pub content_file: Option<PathBuf>,

    #[arg(long = "requirement")]
    pub requirements: Vec<String>,

    #[arg(long, value_enum, default_value_t = EmbeddingBackend::Local)]
    pub embedding_backend: EmbeddingBackend,

    #[arg(long)]
    pub embedding_model: Option<String>,

    #[arg(long, value_enum, default_value_t = LlmBackend::Ollama)]
    pub llm_backend: LlmBackend,

    #[arg(long, default_value = "llama2")]
    pub llm_model: String,

    #[arg(long, default_value_t = 0.2)]
    pub llm_temperature: f32,

    #[arg(long, default_value = "http://localhost:11434")]
    pub ollama_url: String,

    #[arg(long, default_value_t = 60000)]
    pub timeout_ms: u64,

    #[arg(long, default_value_t = 1)]
    pub max_retries: usize,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub text: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[arg(long)]
    pub request: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub index: IndexArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
