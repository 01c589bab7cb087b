use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use comfyui_prompt_relay::pipeline::ImageOptions;
use comfyui_prompt_relay::prompt::PromptParts;
use comfyui_prompt_relay::workflow::{patch_workflow, PatchRequest, WorkflowType};
use comfyui_prompt_relay::{Config, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "promptctl", about = "CLI for the ComfyUI prompt relay", version)]
struct Cli {
    /// Override COMFYUI_URL
    #[arg(global = true, long)]
    comfyui_url: Option<String>,

    /// Override WORKFLOWS_DIR
    #[arg(global = true, long, value_name = "DIR")]
    workflows_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Fragments {
    /// Subject text
    #[arg(long)]
    subject: String,
    /// Pose description
    #[arg(long)]
    pose: String,
    /// Setting description
    #[arg(long)]
    setting: String,
    /// Other details
    #[arg(long)]
    other: String,
}

impl From<Fragments> for PromptParts {
    fn from(f: Fragments) -> Self {
        PromptParts { subject: f.subject, pose: f.pose, setting: f.setting, other: f.other }
    }
}

#[derive(Args, Debug)]
struct Styling {
    /// Which template to patch: smoke (smoke_test.json) or final (final_image.json)
    #[arg(long)]
    workflow_type: WorkflowType,
    /// Strength for the Realism_LORA node
    #[arg(long)]
    realism_lora: f64,
    /// Strength for the Detail_LORA node
    #[arg(long)]
    detail_lora: f64,
    /// Fixed seed; random when omitted
    #[arg(long)]
    seed: Option<u64>,
    /// Filename prefix for the SAVE node
    #[arg(long)]
    filename_prefix: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble the fragments and print the rewritten prompt
    Prompt {
        #[command(flatten)]
        fragments: Fragments,
    },
    /// Patch a workflow template without queueing it
    Patch {
        /// Prompt text for the POS node
        #[arg(long)]
        prompt: String,
        #[command(flatten)]
        styling: Styling,
        /// Explicit template path instead of the one implied by --workflow-type
        #[arg(long, value_name = "PATH")]
        workflow_path: Option<PathBuf>,
        /// Output path (defaults to <workflows-dir>/<type>_updated.json)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Full run: rewrite the prompt, patch the workflow and queue it
    Generate {
        #[command(flatten)]
        fragments: Fragments,
        #[command(flatten)]
        styling: Styling,
        /// Number of times to queue the workflow
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=100))]
        executions: u32,
    },
    /// Print the ComfyUI queue
    Queue {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load env and parse CLI
    Config::dotenv_load();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut conf = Config::new()?;
    if let Some(url) = cli.comfyui_url {
        conf.comfyui_url = url;
    }
    if let Some(dir) = cli.workflows_dir {
        conf.workflows_dir = dir;
    }
    let pipeline = Pipeline::from_config(&conf);

    match cli.command {
        Commands::Prompt { fragments } => {
            let prompt = pipeline.generate_prompt(&fragments.into()).await?;
            println!("{}", prompt);
        }
        Commands::Patch { prompt, styling, workflow_path, out } => {
            let template = workflow_path.unwrap_or_else(|| styling.workflow_type.template_path(&conf.workflows_dir));
            let output = out.unwrap_or_else(|| styling.workflow_type.output_path(&conf.workflows_dir));
            let request = PatchRequest {
                prompt,
                realism_lora: styling.realism_lora,
                detail_lora: styling.detail_lora,
                seed: styling.seed,
                filename_prefix: styling.filename_prefix,
            };
            let outcome = patch_workflow(&template, &output, &request).await?;
            println!("Saved {} (seed {}, {} sampler(s))", outcome.output_path.display(), outcome.seed, outcome.samplers);
        }
        Commands::Generate { fragments, styling, executions } => {
            let options = ImageOptions {
                realism_lora: styling.realism_lora,
                detail_lora: styling.detail_lora,
                workflow_type: styling.workflow_type,
                seed: styling.seed,
                filename_prefix: styling.filename_prefix,
                executions,
            };
            let result = pipeline.generate(&fragments.into(), &options).await?;
            println!("Prompt: {}", result.prompt);
            for submission in &result.receipt.submissions {
                println!("{}  seed={}  {}", submission.client_id, submission.seed, submission.response);
            }
        }
        Commands::Queue { pretty } => {
            let queue = pipeline.comfyui().get_queue().await?;
            if pretty {
                println!("{}", serde_json::to_string_pretty(&queue)?);
            } else {
                println!("{}", serde_json::to_string(&queue)?);
            }
        }
    }
    Ok(())
}
