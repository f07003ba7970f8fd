//! Maps validated CLI matches to the server action.

use crate::{
    accounts::AccountConfig,
    cli::{
        actions::{server::Args, Action},
        globals::GlobalArgs,
    },
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Build the server action from parsed arguments.
///
/// # Errors
/// Returns an error if a required argument is missing or a value does not parse.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;
    Url::parse(&dsn).context("invalid --dsn")?;

    let secret = matches
        .get_one::<String>("secret")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("--secret must not be empty"))?;
    let mut globals = GlobalArgs::new(SecretString::from(secret.clone()));
    if let Some(key) = matches
        .get_one::<String>("mail-api-key")
        .filter(|k| !k.is_empty())
    {
        globals.set_mail_api_key(SecretString::from(key.clone()));
    }

    let base_url = matches
        .get_one::<String>("base-url")
        .context("missing required argument: --base-url")?;
    let base_url = Url::parse(base_url).context("invalid --base-url")?;

    let mail_url = matches
        .get_one::<String>("mail-url")
        .filter(|u| !u.is_empty())
        .map(|u| Url::parse(u).context("invalid --mail-url"))
        .transpose()?;

    let activation_ttl_days = matches
        .get_one::<i64>("activation-ttl-days")
        .copied()
        .unwrap_or(3);
    let session_ttl_hours = matches
        .get_one::<i64>("session-ttl-hours")
        .copied()
        .unwrap_or(12);
    let mail_timeout = matches
        .get_one::<u64>("mail-timeout")
        .copied()
        .unwrap_or(10);

    let accounts = AccountConfig::new(base_url)
        .with_activation_ttl_days(activation_ttl_days)
        .with_session_ttl_hours(session_ttl_hours)
        .with_mail_timeout(Duration::from_secs(mail_timeout));

    Ok(Action::Server(Args {
        port,
        dsn,
        accounts,
        mail_url,
        mail_from: matches
            .get_one::<String>("mail-from")
            .cloned()
            .unwrap_or_else(|| "noreply@localhost".to_string()),
        globals,
    }))
}
