use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{ArgAction, Parser, Subcommand};
use drawbridge_core::{
    BackendSession, Config, RENDER_TOOL_NAME, RenderAdapter, RenderDiagramTool, ToolRegistry,
    ToolResult, backends,
};
use serde_json::{Map, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

mod logging;

#[derive(Parser)]
#[command(name = "drawbridge")]
#[command(about = "drawbridge - render Mermaid diagrams through a tool registry", long_about = None)]
struct Cli {
    /// Config file (default: ~/.drawbridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Render backend: serve, oneshot, http or stub
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a diagram from FILE or stdin
    Render {
        file: Option<PathBuf>,
        #[arg(short, long)]
        format: Option<String>,
        #[arg(short, long)]
        engine: Option<String>,
        #[arg(short, long)]
        theme: Option<String>,
        /// Write the image here instead of printing the JSON result
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List registered tools and their schemas
    Tools,
    /// Call a tool by name with JSON arguments
    Call {
        name: String,
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let mut config = Config::load_or_init(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let backend = backends::create_backend(&config)?;
    let session = BackendSession::start(backend).context("Failed to start render backend")?;
    info!(backend = %config.backend, "Render backend started");

    let registry = build_registry(&config, &session)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let outcome = runtime.block_on(run(cli.command, &registry));
    drop(runtime);

    // Blocking clients must be released outside the runtime.
    let closed = session.close().context("Failed to close render backend");
    outcome?;
    closed?;
    Ok(())
}

fn build_registry(config: &Config, session: &BackendSession) -> Result<ToolRegistry> {
    let mut adapter = RenderAdapter::new(session.backend());
    if let Some(engine) = &config.engine {
        adapter = adapter.with_engine(engine.clone());
    }

    let registry = ToolRegistry::new();
    registry.register(Arc::new(
        RenderDiagramTool::new(Arc::new(adapter))
            .with_default_format(config.format)
            .with_default_theme(config.theme.clone()),
    ))?;
    Ok(registry)
}

async fn run(command: Commands, registry: &ToolRegistry) -> Result<()> {
    match command {
        Commands::Render {
            file,
            format,
            engine,
            theme,
            output,
        } => {
            let diagram = read_diagram(file.as_deref())?;

            let mut args = Map::new();
            args.insert("diagram".into(), Value::String(diagram));
            for (key, value) in [("format", format), ("engine", engine), ("theme", theme)] {
                if let Some(value) = value {
                    args.insert(key.into(), Value::String(value));
                }
            }

            let result = registry.execute(RENDER_TOOL_NAME, Value::Object(args)).await;
            let result = into_output(result)?;

            match output {
                Some(path) => write_image(&path, &result)?,
                None => println!("{}", result),
            }
        }
        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&registry.get_specs())?);
        }
        Commands::Call { name, args } => {
            let args: Value = serde_json::from_str(&args)
                .with_context(|| format!("Failed to parse arguments for {}", name))?;
            let result = registry.execute(&name, args).await;
            println!("{}", into_output(result)?);
        }
    }

    Ok(())
}

fn read_diagram(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read diagram from {}", path.display())),
        _ => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read diagram from stdin")?;
            Ok(source)
        }
    }
}

fn into_output(result: ToolResult) -> Result<String> {
    if !result.success {
        bail!(
            "{}",
            result.error.unwrap_or_else(|| "tool call failed".to_string())
        );
    }
    Ok(result.output)
}

fn write_image(path: &Path, output: &str) -> Result<()> {
    let value: Value = serde_json::from_str(output).context("Unexpected render tool output")?;
    let encoded = value["bytes"].as_str().context("Render result has no bytes")?;
    let bytes = STANDARD
        .decode(encoded)
        .context("Render result bytes are not valid base64")?;

    if let Some(warnings) = value["warnings"].as_array() {
        for warning in warnings.iter().filter_map(Value::as_str) {
            eprintln!("warning: {}", warning);
        }
    }

    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write image to {}", path.display()))?;
    eprintln!(
        "Wrote {} ({} bytes, {})",
        path.display(),
        bytes.len(),
        value["mime"].as_str().unwrap_or("unknown")
    );
    Ok(())
}
