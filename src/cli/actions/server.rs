use crate::{
    accounts::{
        AccountConfig, AccountService, HttpEmailSender, LogEmailSender, NotificationSender,
        PgCredentialStore, TokenCodec,
    },
    api,
    cli::{globals::GlobalArgs, telemetry},
};
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub accounts: AccountConfig,
    pub mail_url: Option<Url>,
    pub mail_from: String,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the mail client cannot be built, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let Args {
        port,
        dsn,
        accounts,
        mail_url,
        mail_from,
        globals,
    } = args;

    let store = PgCredentialStore::connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    debug!("database ready");

    let sender: Arc<dyn NotificationSender> = match mail_url {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "activation mails go through the mail API");
            // must outlive the service-level mail timeout
            let client_timeout = accounts.mail_timeout() + Duration::from_secs(1);
            Arc::new(HttpEmailSender::new(
                endpoint,
                globals.mail_api_key.clone(),
                mail_from,
                client_timeout,
            )?)
        }
        None => {
            info!("no mail API configured, activation mails are only logged");
            Arc::new(LogEmailSender)
        }
    };

    if globals.secret.expose_secret().len() < 32 {
        warn!("token secret is shorter than 32 bytes");
    }

    let codec = TokenCodec::new(&globals.secret);
    let service = AccountService::new(Arc::new(store), sender, codec, accounts);

    let result = api::serve(port, service).await;

    telemetry::shutdown_tracer();

    result
}
