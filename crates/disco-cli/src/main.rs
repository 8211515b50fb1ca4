use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use disco_client::{CallOptions, ClientError, DiscoveryClient, Executor};
use disco_core::config::{self, CONFIG_FILE_NAME, DiscoConfig};
use disco_core::transform::SchemaConverter;

#[derive(Parser)]
#[command(name = "disco", about = "Browse and call APIs described by discovery documents", version)]
struct Cli {
    /// Config file to load instead of ./.disco.yaml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the directory endpoint
    #[arg(long, global = true, env = "DISCO_DIRECTORY_URL")]
    directory_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available services
    Services {
        /// Include non-preferred versions
        #[arg(long)]
        all: bool,

        /// Output format
        #[arg(long, default_value = "table")]
        format: ListFormat,
    },

    /// List the methods of a service
    Methods {
        /// Service id, e.g. sheets:v4
        #[arg(short, long)]
        service: String,
    },

    /// Show the request and response schemas of a method
    Schema {
        #[arg(short, long)]
        service: String,

        /// Method name, e.g. spreadsheets.values.get
        #[arg(short, long)]
        method: String,

        #[arg(long, default_value = "yaml")]
        format: SchemaFormat,
    },

    /// Call a method and print the response
    Call {
        #[arg(short, long)]
        service: String,

        #[arg(short, long)]
        method: String,

        /// Parameter as key=value; the value is parsed as JSON when possible
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// JSON file with an object of parameters; --param entries win
        #[arg(long = "params")]
        params_file: Option<PathBuf>,

        /// OAuth2 access token
        #[arg(long, env = "DISCO_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Initialize a new disco configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum ListFormat {
    Table,
    Json,
}

#[derive(Clone, ValueEnum)]
enum SchemaFormat {
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Services { all, format } => {
            let cfg = load_config(cli.config, cli.directory_url)?;
            cmd_services(&cfg, all, format).await
        }

        Commands::Methods { service } => {
            let cfg = load_config(cli.config, cli.directory_url)?;
            cmd_methods(&cfg, &service).await
        }

        Commands::Schema {
            service,
            method,
            format,
        } => {
            let cfg = load_config(cli.config, cli.directory_url)?;
            cmd_schema(&cfg, &service, &method, format).await
        }

        Commands::Call {
            service,
            method,
            params,
            params_file,
            token,
            timeout,
        } => {
            let cfg = load_config(cli.config, cli.directory_url)?;
            let values = collect_params(params_file.as_deref(), &params)?;
            let token = token.unwrap_or_default();
            cmd_call(&cfg, &service, &method, &values, &token, timeout).await
        }

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "disco", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Load the config file (when present) and apply command-line overrides.
fn load_config(path: Option<PathBuf>, directory_url: Option<String>) -> Result<DiscoConfig> {
    let config_path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    let mut cfg = config::load_config(&config_path)
        .map_err(|e| anyhow::anyhow!(e))?
        .unwrap_or_default();
    if let Some(url) = directory_url {
        cfg.directory_url = url;
    }
    log::debug!("using directory {}", cfg.directory_url);
    Ok(cfg)
}

async fn cmd_services(cfg: &DiscoConfig, all: bool, format: ListFormat) -> Result<()> {
    let client = DiscoveryClient::new(cfg)?;
    let services = if all {
        client.list_services().await?
    } else {
        client.list_preferred_services().await?
    };

    match format {
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&services)?),
        ListFormat::Table => {
            let width = services.iter().map(|s| s.id.len()).max().unwrap_or(0);
            for service in &services {
                println!("{:width$}  {}", service.id, service.title, width = width);
            }
            eprintln!("{} services", services.len());
        }
    }
    Ok(())
}

async fn cmd_methods(cfg: &DiscoConfig, service: &str) -> Result<()> {
    let client = DiscoveryClient::new(cfg)?;
    let methods = client.methods(service).await?;
    let width = methods.iter().map(|m| m.full_name.len()).max().unwrap_or(0);
    for method in &methods {
        println!(
            "{:6}  {:width$}  {}",
            method.http_method.as_str(),
            method.full_name,
            method.template(),
            width = width
        );
    }
    eprintln!("{} methods in {}", methods.len(), service);
    Ok(())
}

async fn cmd_schema(
    cfg: &DiscoConfig,
    service: &str,
    method: &str,
    format: SchemaFormat,
) -> Result<()> {
    let client = DiscoveryClient::new(cfg)?;
    let spec = client.specification(service).await?;
    let descriptor = client.method(service, method).await?;

    let mut converter = SchemaConverter::new(&spec);
    let summary = serde_json::json!({
        "method": descriptor.full_name,
        "httpMethod": descriptor.http_method.as_str(),
        "path": descriptor.template(),
        "description": descriptor.description,
        "scopes": descriptor.scopes,
        "request": converter.request_schema(&descriptor),
        "response": converter.response_schema(&descriptor),
    });

    match format {
        SchemaFormat::Yaml => print!("{}", serde_yaml_ng::to_string(&summary)?),
        SchemaFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

async fn cmd_call(
    cfg: &DiscoConfig,
    service: &str,
    method: &str,
    values: &Map<String, Value>,
    token: &str,
    timeout: Option<u64>,
) -> Result<()> {
    if token.is_empty() {
        log::warn!("no access token given; sending the request unauthenticated");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let options = CallOptions {
        deadline: timeout.map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs)),
        cancel: Some(cancel),
    };

    let client = DiscoveryClient::new(cfg)?;
    let spec = options.bound(client.specification(service)).await?;
    let descriptor = options.bound(client.method(service, method)).await?;
    let executor = Executor::new(cfg)?;

    match executor
        .execute(&descriptor, &spec.base_url(), token, values, &options)
        .await
    {
        Ok(response) => {
            eprintln!("HTTP {}", response.status_code);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            Ok(())
        }
        Err(ClientError::ApiStatus { status, body }) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            anyhow::bail!("{} returned HTTP {}", descriptor.full_name, status)
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge the parameter file (if any) with `key=value` flags.
fn collect_params(file: Option<&Path>, pairs: &[String]) -> Result<Map<String, Value>> {
    let mut values = match file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str::<Value>(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
            {
                Value::Object(map) => map,
                _ => anyhow::bail!("{} must contain a JSON object", path.display()),
            }
        }
        None => Map::new(),
    };

    for pair in pairs {
        let (key, value) = parse_param(pair)?;
        values.insert(key, value);
    }
    Ok(values)
}

fn parse_param(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got `{}`", pair))?;
    if key.is_empty() {
        anyhow::bail!("empty parameter name in `{}`", pair);
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
