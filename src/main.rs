use entgraph::cli::{Cli, Commands, ConfigAction};
use entgraph::config::Config;
use entgraph::entities::{EntityId, EntityKind, EntityStore, Instantiated, ProcessRole};
use entgraph::error::{EntityError, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Load { file, kind } => {
            cmd_load(cli.config, &file, kind.as_deref())?;
        }
        Commands::Graph { file, kind } => {
            cmd_graph(cli.config, &file, kind.as_deref())?;
        }
        Commands::Merge {
            first,
            second,
            kind,
        } => {
            cmd_merge(cli.config, &first, &second, kind.as_deref())?;
        }
        Commands::Event { file } => {
            cmd_event(cli.config, &file)?;
        }
        Commands::Kinds => {
            cmd_kinds();
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "entgraph=debug" } else { "entgraph=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_load(config_path: Option<PathBuf>, file: &Path, kind: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = EntityStore::from_config(&config.extraction);

    for record in read_records(file)? {
        match store.instantiate_named(&record, kind)? {
            Instantiated::Entity(id) => {
                println!("{}", store.to_json_string(id, config.output.pretty)?);
            }
            Instantiated::Raw(raw) => {
                tracing::info!("Record has no entity type, printing it unchanged");
                println!("{}", render_json(&raw, config.output.pretty)?);
            }
        }
    }

    tracing::info!("Built {} entities from {}", store.len(), file.display());
    Ok(())
}

fn cmd_graph(config_path: Option<PathBuf>, file: &Path, kind: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = EntityStore::from_config(&config.extraction);

    let mut graph = None;
    for record in read_records(file)? {
        if let Some(root) = store.instantiate_named(&record, kind)?.entity() {
            graph = Some(store.materialize_graph(root, graph)?);
        }
    }

    let Some(graph) = graph else {
        println!("No entities found in {}", file.display());
        return Ok(());
    };

    println!(
        "Graph: {} nodes, {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    println!();
    println!("Nodes:");
    for node in graph.nodes() {
        if config.graph.include_descriptions {
            println!("  {} {:<20} {}", node.entity, node.kind, node.description);
        } else {
            println!("  {} {}", node.entity, node.kind);
        }
    }
    println!();
    println!("Edges:");
    for (a, b, attrs) in graph.edges() {
        let attrs: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("  {} -- {}  [{}]", a, b, attrs.join(", "));
    }

    Ok(())
}

fn cmd_merge(
    config_path: Option<PathBuf>,
    first: &Path,
    second: &Path,
    kind: Option<&str>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = EntityStore::from_config(&config.extraction);

    let a = single_entity(&mut store, first, kind)?;
    let b = single_entity(&mut store, second, kind)?;

    println!("Equal:      {}", store.equals(a, b)?);
    println!("Equivalent: {}", store.is_equivalent(a, b)?);

    match store.merge(a, b) {
        Ok(merged) => {
            println!("{}", store.to_json_string(merged, config.output.pretty)?);
            Ok(())
        }
        Err(EntityError::EntityMergeConflict { kind, properties }) => {
            println!("✗ Cannot merge {} entities", kind);
            println!("  Conflicting properties: {}", properties.join(", "));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn cmd_event(config_path: Option<PathBuf>, file: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = EntityStore::from_config(&config.extraction);

    for record in read_records(file)? {
        let process = store.process_from_event(&record, ProcessRole::New)?;
        println!("{}", store.to_json_string(process, config.output.pretty)?);
    }
    Ok(())
}

fn cmd_kinds() {
    for kind in EntityKind::all() {
        println!("{}", kind);
        for (name, descriptor) in kind.schema() {
            let marker = if kind.id_properties().contains(name) {
                "*"
            } else {
                " "
            };
            println!("  {} {:<24} {:?}", marker, name, descriptor);
        }
    }
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let toml = toml::to_string_pretty(&config)?;
            println!("{}", toml);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
            println!("  Max depth: {}", config.extraction.max_depth);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
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
    Config::load_or_default(&path)
}

/// Records of a JSON file holding either one object or an array of them
fn read_records(file: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(file).map_err(|e| EntityError::Io {
        source: e,
        context: format!("Failed to read {:?}", file),
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| EntityError::Json {
        source: e,
        context: format!("Failed to parse {:?}", file),
    })?;

    Ok(match value {
        Value::Array(records) => records,
        other => vec![other],
    })
}

fn single_entity(store: &mut EntityStore, file: &Path, kind: Option<&str>) -> Result<EntityId> {
    let record = read_records(file)?.into_iter().next().unwrap_or(Value::Null);
    match store.instantiate_named(&record, kind)? {
        Instantiated::Entity(id) => Ok(id),
        Instantiated::Raw(raw) => Err(anyhow::anyhow!(
            "{} does not describe an entity (no Type tag and no --kind): {}",
            file.display(),
            render_json(&raw, false)?
        )
        .into()),
    }
}

fn render_json(value: &Value, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    rendered.map_err(|e| EntityError::Json {
        source: e,
        context: "Failed to render record".to_string(),
    })
}
