//! vc-auditor CLI — `vca` command.
//!
//! Verifies credentials and presentations against the built-in policies and
//! lists the policies available.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use vc_auditor::{
    Artifact, AuditorConfig, AuditorService, PolicyContext, PolicyRegistry, PolicyRequest,
    Services,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// vc-auditor CLI — verify W3C Verifiable Credentials and Presentations.
#[derive(Parser, Debug)]
#[command(
    name = "vca",
    about = "Verifiable credential auditor",
    version,
    long_about = "vca — verifiable credential auditor\n\nRun signature, validity, schema, revocation and EBSI trust-chain\npolicies against a credential or presentation (JSON-LD or JWT)."
)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify a credential or presentation
    Verify {
        /// File holding the credential (JSON-LD document or JWT)
        file: PathBuf,

        /// Policy to apply, as `Id` or `Id=<json argument>` (repeatable; default: SignaturePolicy)
        #[arg(short, long = "policy")]
        policies: Vec<PolicyRequest>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Do not use the network (only did:key and inline/file schemas resolve)
        #[arg(long)]
        offline: bool,
    },

    /// List available policies
    Policies {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Verify {
            file,
            policies,
            json,
            offline,
        } => cmd_verify(config, &file, &policies, json, offline, cli.verbose),
        Commands::Policies { json } => cmd_policies(config, json),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> Result<AuditorConfig> {
    match path {
        Some(path) => AuditorConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(AuditorConfig::default()),
    }
}

fn registry(config: AuditorConfig, offline: bool) -> Result<PolicyRegistry> {
    let services = if offline {
        Services::offline(&config)
    } else {
        Services::online(&config).context("failed to set up HTTP client")?
    };
    Ok(PolicyRegistry::with_defaults(PolicyContext::new(
        services, config,
    )))
}

// ── Command implementations ───────────────────────────────────────────────────

/// `vca verify FILE [--policy ID[=JSON]]... [--json] [--offline]`
fn cmd_verify(
    config: AuditorConfig,
    file: &Path,
    policies: &[PolicyRequest],
    json: bool,
    offline: bool,
    verbose: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let auditor = AuditorService::new(Arc::new(registry(config, offline)?));

    // resolve before parsing so that a bad policy list is reported first
    let requests = if policies.is_empty() {
        vec![PolicyRequest::new(auditor.registry().default_policy_id())]
    } else {
        policies.to_vec()
    };
    let resolved = auditor.registry().resolve(&requests)?;

    let artifact = Artifact::parse(&text)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    if verbose {
        eprintln!(
            "Verifying {} {:?} with {} policies",
            artifact.kind_name(),
            artifact.common().types,
            resolved.len()
        );
    }

    let report = auditor.verify_with(&artifact, &resolved);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(anyhow!("verification failed"))
    }
}

/// `vca policies [--json]`
fn cmd_policies(config: AuditorConfig, json: bool) -> Result<()> {
    let registry = registry(config, true)?;
    let policies = registry.list_policies();

    if json {
        println!("{}", serde_json::to_string_pretty(&policies)?);
        return Ok(());
    }

    for info in &policies {
        let default_marker = if info.id == registry.default_policy_id() {
            " (default)"
        } else {
            ""
        };
        match info.argument_type {
            Some(arg) => println!(
                "{:<40} {}{} [{} argument: {}]",
                info.id, info.description, default_marker, info.kind, arg
            ),
            None => println!("{:<40} {}{}", info.id, info.description, default_marker),
        }
    }
    Ok(())
}
