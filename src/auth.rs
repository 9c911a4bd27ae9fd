use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::browser::Browser;
use crate::config::Credentials;

/// Selectors and URL of an email/password login form.
pub struct LoginForm {
    pub url: &'static str,
    pub email_input: &'static str,
    pub password_input: &'static str,
    pub submit: &'static str,
    /// Appears once the session is authenticated.
    pub signed_in: &'static str,
}

/// Submit `form` and wait for the signed-in marker. Any failure is fatal for
/// the run.
pub async fn login<B: Browser + ?Sized>(
    browser: &B,
    form: &LoginForm,
    creds: &Credentials,
    goto_timeout: Duration,
    timeout: Duration,
) -> Result<()> {
    info!("Logging in as {}...", creds.email);
    browser
        .goto(form.url, goto_timeout)
        .await
        .context("Failed to open login page")?;
    browser
        .fill(form.email_input, &creds.email)
        .await
        .context("Email field not found")?;
    browser
        .fill(form.password_input, &creds.password)
        .await
        .context("Password field not found")?;
    browser
        .click(form.submit)
        .await
        .context("Submit button not found")?;
    browser
        .wait_for_selector(form.signed_in, timeout)
        .await
        .context("Login did not complete")?;
    info!("Login successful");
    Ok(())
}
