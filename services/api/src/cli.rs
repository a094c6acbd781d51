use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use closing_docs::error::AppError;

use crate::demo::{run_demo, run_rules_evaluate, run_template_process, DemoArgs};
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "Closing Docs",
    about = "Select and merge loan closing documents from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service and merge orchestrator (default command)
    Serve(ServeArgs),
    /// Work with loan type output rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
    /// Work with block/leaf templates
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Run a sample loan through selection, concurrent merging and aggregation
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Print the documents a loan type selects for a context
    Evaluate(RulesEvaluateArgs),
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Merge a data model into a template document
    Process(TemplateProcessArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the configured number of concurrent merges
    #[arg(long)]
    pub(crate) max_concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct RulesEvaluateArgs {
    /// JSON file holding the loan type definition
    #[arg(long)]
    pub(crate) loan_type: PathBuf,
    /// JSON file holding a flat object of context values
    #[arg(long)]
    pub(crate) context: PathBuf,
    /// Print the evaluation trace
    #[arg(long)]
    pub(crate) trace: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Args, Debug)]
pub(crate) struct TemplateProcessArgs {
    /// JSON file holding the template document
    #[arg(long)]
    pub(crate) template: PathBuf,
    /// JSON file holding the data model
    #[arg(long)]
    pub(crate) model: PathBuf,
    /// Name placeholders and conditions use for the model
    #[arg(long, default_value = "Loan")]
    pub(crate) root: String,
    /// Output format for the merged document
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
    /// Write the merged document here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rules {
            command: RulesCommand::Evaluate(args),
        } => run_rules_evaluate(args),
        Command::Template {
            command: TemplateCommand::Process(args),
        } => run_template_process(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
