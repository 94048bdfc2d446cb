use erp_backend::{
    config::{database, mail, roles},
    core::{sequence, user},
    errors::Result,
    notify::SmtpMailer,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load role configuration
    let config = roles::load_default_config()
        .inspect(|c| info!("Loaded {} role definitions.", c.roles.len()))
        .inspect_err(|e| error!("Failed to load role configuration: {}", e))?;

    // 4. Connect and ensure the schema
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed roles and bring identifier series in line with stored records
    user::seed_roles(&db, &config)
        .await
        .inspect(|n| info!("Seeded {} new roles.", n))
        .inspect_err(|e| error!("Failed to seed roles: {}", e))?;
    sequence::reconcile_all(&db)
        .await
        .inspect(|_| info!("Identifier series reconciled."))
        .inspect_err(|e| error!("Failed to reconcile identifier series: {}", e))?;

    // 6. Outgoing mail is optional, a configured transport must build
    let mail_enabled = match mail::load_mail_config()? {
        Some(mail_config) => {
            SmtpMailer::new(&mail_config)
                .inspect_err(|e| error!("Invalid SMTP configuration: {}", e))?;
            true
        }
        None => {
            warn!("SMTP_HOST not set, document emails are disabled.");
            false
        }
    };

    info!(mail_enabled, "ERP core ready.");
    Ok(())
}
