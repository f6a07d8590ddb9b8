// This is the entry point of the coaching backend tooling.
//
// **Architecture Overview:**
// - `core/` = Business logic (entitlement cache, moderation gate, dataset lint)
// - `infra/` = Implementations of core traits (RevenueCat, OpenAI, Supabase, files)
// - `api/` = Request glue that the HTTP front end calls into
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the requested command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
mod config;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::api::{ApiError, ApiResponse, CoachRequest, Credentials};
use crate::config::AppConfig;
use crate::core::entitlements::{EntitlementService, SubscriptionProvider};
use crate::core::micro_actions::{lint, MicroActionSource};
use crate::core::moderation::{Classifier, LocalBlocklist, ModerationGate};
use crate::infra::micro_actions::MicroActionFiles;
use crate::infra::openai::OpenAiModerationClient;
use crate::infra::revenuecat::RevenueCatClient;
use crate::infra::supabase::SupabaseAuthClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;

/// Entitlement, moderation and dataset tooling for the coaching backend.
#[derive(Parser, Debug)]
#[command(name = "coach_backend")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and print the health payload
    Health,

    /// Create an account; the password is read from stdin
    Signup {
        #[arg(long)]
        email: String,
    },

    /// Sign in and print an access token; the password is read from stdin
    Login {
        #[arg(long)]
        email: String,
    },

    /// Check an entitlement for the user behind a Supabase access token
    Entitlement {
        /// Supabase user access token
        #[arg(long)]
        token: String,

        /// Entitlement to check (defaults to "premium")
        #[arg(long)]
        key: Option<String>,
    },

    /// Relay the RevenueCat offerings for the user behind a Supabase access token
    Offerings {
        /// Supabase user access token
        #[arg(long)]
        token: String,
    },

    /// Moderate text read from stdin and print the decision
    Moderate,

    /// Run a coach request with the prompt read from stdin
    Coach {
        /// Bearer token forwarded as the Authorization header
        #[arg(long)]
        token: String,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        session_id: Option<String>,

        #[arg(long)]
        prompt_id: Option<String>,
    },

    /// Validate the micro-actions dataset against its baseline
    LintMicroActions {
        /// Directory holding the dataset, sample row and baseline files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Command::Health => Ok(print_response(api::health())),
        Command::Signup { email } => {
            let accounts = identity_provider(&config)?;
            let credentials = read_credentials(email).await?;

            Ok(print_result(api::signup(&accounts, credentials).await))
        }
        Command::Login { email } => {
            let accounts = identity_provider(&config)?;
            let credentials = read_credentials(email).await?;

            Ok(print_result(api::login(&accounts, credentials).await))
        }
        Command::Entitlement { token, key } => {
            let identity = identity_provider(&config)?;
            let entitlements = entitlement_service(&config)?;
            let authorization = format!("Bearer {}", token);

            let result = api::check_entitlement(
                &identity,
                &entitlements,
                Some(&authorization),
                key.as_deref(),
            )
            .await;
            Ok(print_result(result))
        }
        Command::Offerings { token } => {
            let identity = identity_provider(&config)?;
            let entitlements = entitlement_service(&config)?;
            let authorization = format!("Bearer {}", token);

            let result = api::offerings(&identity, &entitlements, Some(&authorization)).await;
            Ok(print_result(result))
        }
        Command::Moderate => {
            let gate = moderation_gate(&config)?;
            let text = read_stdin().await?;

            let decision = gate.decide(&text).await;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(if decision.allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Coach {
            token,
            user_id,
            session_id,
            prompt_id,
        } => {
            let gate = moderation_gate(&config)?;
            let request = CoachRequest {
                prompt: Some(read_stdin().await?),
                user_id,
                session_id,
                prompt_id,
            };
            let authorization = format!("Bearer {}", token);

            let result = api::coach(
                &gate,
                config.expose_moderation_categories,
                Some(&authorization),
                request,
            )
            .await;
            Ok(print_result(result))
        }
        Command::LintMicroActions { data_dir } => Ok(lint_micro_actions(data_dir)),
    }
}

// ============================================================================
// DEPENDENCY INJECTION
// ============================================================================
// Each command only builds the services it needs, so e.g. moderation works
// without any RevenueCat credentials.

fn entitlement_service(
    config: &AppConfig,
) -> Result<EntitlementService<Box<dyn SubscriptionProvider>>> {
    let api_key = config
        .revenuecat_api_key
        .as_deref()
        .context("Missing REVENUECAT_SECRET_API_KEY environment variable!")?;

    let client = RevenueCatClient::new(api_key, &config.revenuecat_base_url, config.remote_timeout)
        .context("Failed to create RevenueCat client")?;
    let provider: Box<dyn SubscriptionProvider> = Box::new(client);

    Ok(EntitlementService::new(
        provider,
        config.entitlement_cache_ttl,
        config.remote_timeout,
    ))
}

fn identity_provider(config: &AppConfig) -> Result<SupabaseAuthClient> {
    let url = config
        .supabase_url
        .as_deref()
        .context("Missing SUPABASE_URL environment variable!")?;
    let anon_key = config
        .supabase_anon_key
        .as_deref()
        .context("Missing SUPABASE_ANON_KEY environment variable!")?;

    let client = SupabaseAuthClient::new(url, anon_key, config.remote_timeout)
        .context("Failed to create Supabase auth client")?;
    Ok(client.with_email_redirect(config.email_redirect_url.clone()))
}

fn moderation_gate(config: &AppConfig) -> Result<ModerationGate<Box<dyn Classifier>>> {
    if config.openai_api_key.is_none() {
        tracing::info!("OPENAI_API_KEY not set, moderation uses the local blocklist only");
    }

    let client = OpenAiModerationClient::new(
        config.openai_api_key.clone(),
        &config.openai_base_url,
        config.moderation_model.clone(),
        config.remote_timeout,
    )
    .context("Failed to create OpenAI moderation client")?;
    let remote: Box<dyn Classifier> = Box::new(client);

    Ok(ModerationGate::new(
        remote,
        LocalBlocklist::new(config.extra_blocklist_terms.clone()),
        config.remote_timeout,
    ))
}

// ============================================================================
// OUTPUT
// ============================================================================

async fn read_stdin() -> Result<String> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read stdin")?;
    Ok(text)
}

/// Password comes from stdin so it stays out of shell history.
async fn read_credentials(email: String) -> Result<Credentials> {
    let password = read_stdin().await?;
    Ok(Credentials {
        email: Some(email),
        password: Some(password.trim_end_matches(&['\r', '\n'][..]).to_string()),
    })
}

fn print_response(response: ApiResponse) -> ExitCode {
    println!("{} {}", response.status.as_u16(), response.body);
    if response.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_result(result: Result<ApiResponse, ApiError>) -> ExitCode {
    print_response(result.unwrap_or_else(ApiError::into_response))
}

fn lint_micro_actions(data_dir: PathBuf) -> ExitCode {
    let dataset = match MicroActionFiles::new(data_dir).load() {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("{}", e);
            println!("Overall: FAIL");
            return ExitCode::FAILURE;
        }
    };

    let report = lint(&dataset);
    for line in report.summary_lines() {
        println!("{}", line);
    }

    if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
