use std::path::{Path, PathBuf};

use canvas::config::EditorConfig;
use canvas::engine::{Action, EngineCore};
use canvas::error::{ConfigError, ImportError};
use canvas::visibility::ViewMode;
use clap::Parser;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
    #[error("export failed: {0}")]
    Export(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "graphboard", about = "Load, check and re-export diagram graph documents")]
struct Cli {
    /// Graph document to import.
    #[arg(long, env = "GRAPHBOARD_GRAPH")]
    graph: PathBuf,

    /// Vertex type definition loaded before the graph.
    #[arg(long, env = "GRAPHBOARD_TYPES")]
    types: Option<PathBuf>,

    /// Display policy applied after import (`full` or `reduced`).
    #[arg(long)]
    view: Option<ViewMode>,

    /// Where to write the exported graph; stdout when omitted.
    #[arg(long, env = "GRAPHBOARD_OUT")]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = EditorConfig::from_env()?;
    let mut core = EngineCore::new(config);

    if let Some(path) = &cli.types {
        let text = read(path).await?;
        core.load_type_definition(&text)?;
    }

    let text = read(&cli.graph).await?;
    let report = core.import_graph(&text)?;
    tracing::info!(
        vertices = report.vertices,
        edges = report.edges,
        boundaries = report.boundaries,
        clean = report.is_clean(),
        "graph loaded"
    );

    if let Some(view) = cli.view {
        core.set_view(view);
    }
    show_warnings(&core.take_actions());

    let json = core.export_json()?;
    match &cli.out {
        Some(path) => tokio::fs::write(path, json)
            .await
            .map_err(|source| CliError::Write { path: path.clone(), source })?,
        None => println!("{json}"),
    }

    let canvas = core.canvas_size();
    tracing::info!(width = canvas.width, height = canvas.height, view = %core.session.view, "done");
    Ok(())
}

async fn read(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::Read { path: path.to_path_buf(), source })
}

fn show_warnings(actions: &[Action]) {
    for action in actions {
        if let Action::Warning(message) = action {
            for line in message.lines() {
                eprintln!("warning: {line}");
            }
        }
    }
}
