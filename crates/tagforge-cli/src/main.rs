//! TagForge operator command line.
//!
//! Thin wrapper over the library crates for plant-floor use: provision the
//! client identity, render the collector configuration from a model export,
//! and poke live endpoints (test/browse/scan) while commissioning devices.
//! The HTTP admin portal is a separate deployment; this binary only needs a
//! shell.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use tagforge_core::config::{defaults, env_vars};
use tagforge_core::{validate_model, ClientIdentity, ModelDocument, SecurityPolicy};
use tagforge_opcua::{browse, ensure_client_identity, scan, test_connection, EndpointTarget};
use tagforge_telegraf::{render_config, RenderContext};

#[derive(Parser, Debug)]
#[command(name = "tagforge", about = "OPC UA to Telegraf pipeline admin", version)]
struct Cli {
    /// Directory holding the client identity artifacts.
    /// Defaults to $TAGFORGE_DATA_DIR, then ./data.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the client certificate and key unless both exist.
    Provision,

    /// Render the collector configuration from a model export.
    Render {
        /// JSON model export: devices, tags, scan classes, targets, system.
        #[arg(long)]
        model: PathBuf,
        /// Output path; `-` prints to stdout. Defaults to the model's
        /// telegraf_config_path.
        #[arg(long)]
        output: Option<String>,
    },

    /// Open a session and report the server's display name.
    TestConnection {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },

    /// List the immediate children of one node.
    Browse {
        #[command(flatten)]
        endpoint: EndpointArgs,
        /// Node to browse; the objects container when omitted.
        #[arg(long)]
        node: Option<String>,
    },

    /// Recursively collect every variable under the objects container.
    Scan {
        #[command(flatten)]
        endpoint: EndpointArgs,
        #[arg(long, default_value_t = defaults::SCAN_MAX_DEPTH)]
        max_depth: u32,
    },
}

#[derive(Args, Debug)]
struct EndpointArgs {
    /// e.g. opc.tcp://10.0.0.5:4840
    #[arg(long)]
    endpoint: String,
    #[arg(long, default_value = "")]
    username: String,
    #[arg(long, default_value = "")]
    password: String,
    /// None, Basic256Sha256, Aes128_Sha256_RsaOaep or Aes256_Sha256_RsaPss.
    #[arg(long, default_value = "None")]
    policy: String,
}

impl EndpointArgs {
    fn target(&self) -> EndpointTarget {
        EndpointTarget::new(&self.endpoint)
            .with_credentials(&self.username, &self.password)
            .with_policy(SecurityPolicy::from_name(&self.policy))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.clone().unwrap_or_else(env_vars::data_dir);

    match cli.command {
        Command::Provision => {
            let identity = ensure_client_identity(&data_dir)?;
            println!("client identity at {}", identity.cert_path.display());
            Ok(())
        }
        Command::Render { model, output } => render(&data_dir, &model, output.as_deref()),
        Command::TestConnection { endpoint } => {
            let target = endpoint.target();
            let identity = identity_for(&data_dir, &target)?;
            let result = test_connection(&target, &identity);
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.success {
                Ok(())
            } else {
                bail!("connection test failed")
            }
        }
        Command::Browse { endpoint, node } => {
            let target = endpoint.target();
            let identity = identity_for(&data_dir, &target)?;
            let nodes = browse(&target, &identity, node.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&nodes)?);
            Ok(())
        }
        Command::Scan { endpoint, max_depth } => {
            let target = endpoint.target();
            let identity = identity_for(&data_dir, &target)?;
            let nodes = scan(&target, &identity, max_depth)?;
            println!("{}", serde_json::to_string_pretty(&nodes)?);
            Ok(())
        }
    }
}

/// Provision the identity only when the session will actually present it.
fn identity_for(data_dir: &Path, target: &EndpointTarget) -> Result<ClientIdentity> {
    if target.security_policy.requires_encryption() {
        Ok(ensure_client_identity(data_dir)?)
    } else {
        Ok(ClientIdentity::in_dir(data_dir))
    }
}

fn render(data_dir: &Path, model_path: &Path, output: Option<&str>) -> Result<()> {
    let raw = fs::read_to_string(model_path)
        .with_context(|| format!("cannot read model export {}", model_path.display()))?;
    let model: ModelDocument = serde_json::from_str(&raw)
        .with_context(|| format!("malformed model export {}", model_path.display()))?;

    let issues = validate_model(&model);
    if !issues.is_empty() {
        for issue in &issues {
            tracing::error!("model validation: {}", issue);
        }
        bail!("model export has {} validation issue(s)", issues.len());
    }

    let encrypted_device = model
        .devices
        .iter()
        .any(|d| d.enabled && d.security_policy.requires_encryption());
    let identity = if encrypted_device {
        ensure_client_identity(data_dir)?
    } else {
        ClientIdentity::in_dir(data_dir)
    };

    let snapshots = model.snapshots();
    let ctx = RenderContext {
        defaults: &model.system,
        default_target: model.default_target(),
        default_scan_class: model.default_scan_class(),
        identity: &identity,
    };
    let document = render_config(&snapshots, &ctx);

    match output {
        Some("-") => {
            print!("{document}");
        }
        Some(path) => {
            fs::write(path, &document)
                .with_context(|| format!("cannot write configuration to {path}"))?;
            println!("wrote {path}");
        }
        None => {
            let path = &model.system.telegraf_config_path;
            fs::write(path, &document)
                .with_context(|| format!("cannot write configuration to {path}"))?;
            println!("wrote {path}");
        }
    }
    Ok(())
}
