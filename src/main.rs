use anyhow::Context;
use clap::Parser;
use family_portal::{
    config::database::DatabaseConfig,
    db,
    error::ProvisioningError,
    repositories::user_repository::SqliteUserRepository,
    services::provisioning_service::{
        CreateSuperadminRequest, ProvisioningOutcome, ProvisioningService,
        DEFAULT_SUPERADMIN_EMAIL, DEFAULT_SUPERADMIN_FULL_NAME,
    },
};
use std::{process::ExitCode, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "create-superadmin")]
#[command(about = "Create the family portal super-admin account", long_about = None)]
struct Cli {
    /// Email address
    #[arg(short, long, env = "SUPERADMIN_EMAIL", default_value = DEFAULT_SUPERADMIN_EMAIL)]
    email: String,

    /// Display name
    #[arg(
        short = 'n',
        long,
        env = "SUPERADMIN_FULL_NAME",
        default_value = DEFAULT_SUPERADMIN_FULL_NAME
    )]
    full_name: String,

    /// Password (will prompt if not provided)
    #[arg(short, long, env = "SUPERADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Exit successfully if the email is already registered
    #[arg(long)]
    skip_existing: bool,

    /// Apply database migrations first
    #[arg(long)]
    migrate: bool,

    /// Print the user as JSON
    #[arg(long)]
    json: bool,
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    eprint!("{}: ", prompt);
    io::stderr().flush()?;

    Ok(rpassword::read_password()?)
}

/// Text printed on stdout for a successful run.
fn success_message(outcome: &ProvisioningOutcome, json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(outcome.user());
    }

    let message = match outcome {
        ProvisioningOutcome::Created(user) => format!(
            "Superadmin created with ID: {}\n  Email: {}\n  Name: {}\n  Role: {}",
            user.id, user.email, user.full_name, user.role
        ),
        ProvisioningOutcome::AlreadyExists(user) => format!(
            "User '{}' already exists with ID: {} (role: {})",
            user.email, user.id, user.role
        ),
    };
    Ok(message)
}

fn failure_message(err: &ProvisioningError) -> String {
    format!("Error creating superadmin: {}", err)
}

fn exit_status(result: &Result<ProvisioningOutcome, ProvisioningError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let (password, password_confirm) = match cli.password {
        Some(pw) => (pw, None),
        None => {
            let password = get_password("Password")?;
            let confirm = get_password("Confirm password")?;
            (password, Some(confirm))
        }
    };

    let config = DatabaseConfig::from_env()?;
    let pool = db::create_pool(&config)
        .await
        .context("failed to connect to database")?;

    if cli.migrate {
        db::run_migrations(&pool)
            .await
            .context("failed to run migrations")?;
    }

    let service = ProvisioningService::new(Arc::new(SqliteUserRepository::new(pool.clone())));

    let request = CreateSuperadminRequest {
        email: cli.email,
        password,
        password_confirm,
        full_name: cli.full_name,
        skip_existing: cli.skip_existing,
    };

    let result = service.create_superadmin(request).await;
    match &result {
        Ok(outcome) => println!("{}", success_message(outcome, cli.json)?),
        Err(err) => eprintln!("{}", failure_message(err)),
    }
    let code = ExitCode::from(exit_status(&result));

    pool.close().await;
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "family_portal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error creating superadmin: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
