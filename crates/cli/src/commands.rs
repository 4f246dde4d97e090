//! Command handlers for the massmail CLI

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use massmail_core::csv::CsvPreview;
use massmail_core::types::{LogStatus, Template, UserSnapshot};
use massmail_core::{ClientConfig, SessionStore};
use massmail_http::client::AuthenticatedClient;
use massmail_http::types::{
    AuthResponse, GoogleAuthRequest, LogQuery, LoginRequest, ResendVerificationRequest,
    SendMassRequest, SignupRequest, TemplateDraft,
};
use tracing::debug;

use crate::session_file::SessionFile;

pub struct App {
    pub config: ClientConfig,
    pub store: Arc<SessionStore>,
    pub client: AuthenticatedClient,
    pub session: SessionFile,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with a Google OAuth credential token
    Google {
        /// Credential token issued to the configured client id
        token: String,
    },
    /// End the current session
    Logout,
    /// Show the current session snapshot
    Whoami,
    /// Confirm an email address with a verification token
    VerifyEmail { token: String },
    /// Ask for another verification mail
    ResendVerification {
        #[arg(long)]
        email: String,
    },
    /// Change the display name
    UpdateName {
        #[arg(long)]
        name: String,
    },
    /// Change the password
    ChangePassword {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Manage mail templates
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },
    /// Manage uploaded recipient CSV files
    Csv {
        #[command(subcommand)]
        command: CsvCommand,
    },
    /// Dispatch mail to every row of an uploaded CSV
    Send {
        /// Uploaded CSV file id
        #[arg(long = "csv")]
        csv_file_id: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Take subject and body from a saved template
        #[arg(long)]
        template: Option<String>,
        /// Render the mail against one CSV row instead of sending
        #[arg(long)]
        dry_run: bool,
        /// Row to render in a dry run
        #[arg(long, default_value_t = 0)]
        row: usize,
    },
    /// View the dispatch log
    Logs {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Inclusive lower bound, YYYY-MM-DD
        #[arg(long)]
        from: Option<String>,
        /// Inclusive upper bound, YYYY-MM-DD
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// List saved templates
    List,
    /// Save a new template
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Replace an existing template
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
    },
    /// Delete a template
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum CsvCommand {
    /// Upload a recipient CSV
    Upload { path: String },
    /// Delete an uploaded CSV
    Delete { file_id: String },
    /// Preview a CSV: a local path or an uploaded file id
    View { target: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    All,
    Success,
    Failed,
}

impl From<StatusFilter> for Option<LogStatus> {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::All => None,
            StatusFilter::Success => Some(LogStatus::Success),
            StatusFilter::Failed => Some(LogStatus::Failed),
        }
    }
}

pub async fn dispatch(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => login(app, email, password).await,
        Command::Signup {
            name,
            email,
            password,
        } => signup(app, name, email, password).await,
        Command::Google { token } => google(app, token).await,
        Command::Logout => logout(app).await,
        Command::Whoami => whoami(app).await,
        Command::VerifyEmail { token } => verify_email(app, token).await,
        Command::ResendVerification { email } => resend_verification(app, email).await,
        Command::UpdateName { name } => update_name(app, name).await,
        Command::ChangePassword { old, new } => change_password(app, old, new).await,
        Command::Template { command } => match command {
            TemplateCommand::List => template_list(app).await,
            TemplateCommand::Add {
                name,
                subject,
                body,
            } => template_add(app, name, subject, body).await,
            TemplateCommand::Update {
                id,
                name,
                subject,
                body,
            } => template_update(app, id, name, subject, body).await,
            TemplateCommand::Delete { id } => template_delete(app, id).await,
        },
        Command::Csv { command } => match command {
            CsvCommand::Upload { path } => csv_upload(app, path).await,
            CsvCommand::Delete { file_id } => csv_delete(app, file_id).await,
            CsvCommand::View { target } => csv_view(app, target).await,
        },
        Command::Send {
            csv_file_id,
            subject,
            body,
            template,
            dry_run,
            row,
        } => send(app, csv_file_id, subject, body, template, dry_run, row).await,
        Command::Logs {
            page,
            limit,
            status,
            from,
            to,
        } => logs(app, page, limit, status, from, to).await,
    }
}

/// Reject empty required fields before anything goes over the wire
fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{what} is required");
    }
    Ok(())
}

/// Session probe run at the start of signed-in commands: a failure just
/// means "no user"
async fn refresh_snapshot(app: &App) -> Option<UserSnapshot> {
    match app.client.current_user().await {
        Ok(user) => {
            app.store.set_user(user.clone());
            Some(user)
        }
        Err(error) => {
            debug!(%error, "session probe failed");
            app.store.clear();
            None
        }
    }
}

async fn require_user(app: &App) -> Result<UserSnapshot> {
    refresh_snapshot(app)
        .await
        .context("Not signed in. Run `massmail login` first.")
}

fn finish_login(app: &mut App, response: AuthResponse) -> Result<()> {
    if let Some(token) = response.access_token {
        app.client.set_access_token(Some(token.clone()));
        app.session.remember(&token)?;
    }
    if let Some(user) = response.user {
        app.store.set_user(user);
    }
    Ok(())
}

async fn login(app: &mut App, email: String, password: String) -> Result<()> {
    require(&email, "email")?;
    require(&password, "password")?;

    let public = app.client.to_public();
    let response = match public.login(&LoginRequest { email, password }).await {
        Ok(response) => response,
        Err(error) if error.is_unverified_account() => {
            bail!(
                "{error}\nYour account is not verified yet. Check your inbox, \
                 or run `massmail resend-verification`."
            );
        }
        Err(error) => return Err(error.into()),
    };

    finish_login(app, response)?;
    if app.store.user().is_none() {
        refresh_snapshot(app).await;
    }
    println!("Login successful");
    Ok(())
}

async fn signup(app: &mut App, name: String, email: String, password: String) -> Result<()> {
    require(&name, "name")?;
    require(&email, "email")?;
    require(&password, "password")?;

    let public = app.client.to_public();
    let response = public
        .signup(&SignupRequest {
            name,
            email,
            password,
        })
        .await?;

    finish_login(app, response)?;
    println!("Signup successful. Check your inbox to verify your email.");
    Ok(())
}

async fn google(app: &mut App, token: String) -> Result<()> {
    require(&token, "token")?;
    if let Some(client_id) = &app.config.google_client_id {
        debug!(%client_id, "expecting a credential for the configured client id");
    }

    let public = app.client.to_public();
    let response = public.google_login(&GoogleAuthRequest { token }).await?;

    finish_login(app, response)?;
    if app.store.user().is_none() {
        refresh_snapshot(app).await;
    }
    println!("Login successful");
    Ok(())
}

async fn logout(app: &mut App) -> Result<()> {
    let public = app.client.to_public();
    public.logout().await?;
    app.client.set_access_token(None);
    app.store.clear();
    app.session.forget()?;
    println!("Logged out");
    Ok(())
}

async fn whoami(app: &App) -> Result<()> {
    let Some(user) = refresh_snapshot(app).await else {
        println!("Not signed in.");
        return Ok(());
    };

    let verified = if user.is_verified { "" } else { " (unverified)" };
    println!("{} <{}>{verified}", user.name, user.email);
    println!("Templates: {}", user.templates.len());
    for template in &user.templates {
        println!("  {}  {}", template.id, template.name);
    }
    println!("Files: {}", user.files.len());
    for file in &user.files {
        println!("  {}  {}", file.file_id, file.file_name);
    }
    Ok(())
}

async fn verify_email(app: &App, token: String) -> Result<()> {
    require(&token, "token")?;
    let response = app.client.to_public().verify_email(&token).await?;
    println!(
        "{}",
        response.message.unwrap_or_else(|| "Email verified".into())
    );
    Ok(())
}

async fn resend_verification(app: &App, email: String) -> Result<()> {
    require(&email, "email")?;
    let response = app
        .client
        .to_public()
        .resend_verification(&ResendVerificationRequest { email })
        .await?;
    println!(
        "{}",
        response
            .message
            .unwrap_or_else(|| "Verification mail sent".into())
    );
    Ok(())
}

async fn update_name(app: &App, name: String) -> Result<()> {
    require(&name, "name")?;
    let response = app.client.update_name(&name).await?;
    println!(
        "{}",
        response.message.unwrap_or_else(|| "Name updated".into())
    );
    Ok(())
}

async fn change_password(app: &App, old: String, new: String) -> Result<()> {
    require(&old, "old password")?;
    require(&new, "new password")?;
    let response = app.client.change_password(&old, &new).await?;
    println!(
        "{}",
        response.message.unwrap_or_else(|| "Password changed".into())
    );
    Ok(())
}

async fn template_list(app: &App) -> Result<()> {
    let user = require_user(app).await?;
    if user.templates.is_empty() {
        println!("No templates");
        return Ok(());
    }
    for template in &user.templates {
        println!(
            "{}  {}  subject: {}",
            template.id, template.name, template.subject
        );
    }
    Ok(())
}

async fn template_add(app: &App, name: String, subject: String, body: String) -> Result<()> {
    require(&name, "name")?;
    require(&subject, "subject")?;
    require(&body, "body")?;

    let template = app
        .client
        .add_template(&TemplateDraft {
            name,
            subject,
            body,
        })
        .await?;
    app.store.upsert_template(template.clone());
    println!("Template saved: {}", template.id);
    Ok(())
}

async fn template_update(
    app: &App,
    id: String,
    name: String,
    subject: String,
    body: String,
) -> Result<()> {
    require(&name, "name")?;
    require(&subject, "subject")?;
    require(&body, "body")?;

    app.client
        .update_template(
            &id,
            &TemplateDraft {
                name: name.clone(),
                subject: subject.clone(),
                body: body.clone(),
            },
        )
        .await?;
    app.store.upsert_template(Template {
        id,
        name,
        subject,
        body,
    });
    println!("Template updated");
    Ok(())
}

async fn template_delete(app: &App, id: String) -> Result<()> {
    app.client.delete_template(&id).await?;
    app.store.remove_template(&id);
    println!("Template deleted");
    Ok(())
}

async fn csv_upload(app: &App, path: String) -> Result<()> {
    let bytes =
        std::fs::read(&path).with_context(|| format!("failed to read {path}"))?;
    let file_name = Path::new(&path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload.csv")
        .to_string();

    // Parse locally first so a malformed file never reaches the server
    let preview = CsvPreview::parse(&String::from_utf8_lossy(&bytes))
        .with_context(|| format!("{path} is not a valid CSV file"))?;
    if preview.is_empty() {
        bail!("{path} has no data rows");
    }

    let file = app.client.upload_csv(&file_name, bytes).await?;
    app.store.add_file(file.clone());
    println!(
        "Uploaded {} ({} rows) as {}",
        file.file_name,
        preview.len(),
        file.file_id
    );
    Ok(())
}

async fn csv_delete(app: &App, file_id: String) -> Result<()> {
    app.client.delete_csv(&file_id).await?;
    app.store.remove_file(&file_id);
    println!("File deleted");
    Ok(())
}

async fn csv_view(app: &App, target: String) -> Result<()> {
    let text = if Path::new(&target).exists() {
        std::fs::read_to_string(&target).with_context(|| format!("failed to read {target}"))?
    } else {
        let user = require_user(app).await?;
        let file = user
            .files
            .iter()
            .find(|f| f.file_id == target)
            .with_context(|| format!("no uploaded CSV with id {target}"))?;
        app.client.to_public().fetch_text(&file.file_url).await?
    };

    let preview = CsvPreview::parse(&text)?;
    println!("{}", preview.fields().join(" | "));
    for row in preview.rows() {
        println!("{}", row.join(" | "));
    }
    println!("{} rows", preview.len());
    println!("Placeholders: {}", preview.placeholders().join(" "));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn send(
    app: &App,
    csv_file_id: String,
    subject: Option<String>,
    body: Option<String>,
    template: Option<String>,
    dry_run: bool,
    row: usize,
) -> Result<()> {
    require(&csv_file_id, "CSV file id")?;

    let mut subject = subject.unwrap_or_default();
    let mut body = body.unwrap_or_default();
    if let Some(template_id) = template {
        let user = require_user(app).await?;
        let template = user
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .with_context(|| format!("no template with id {template_id}"))?;
        if subject.is_empty() {
            subject = template.subject.clone();
        }
        if body.is_empty() {
            body = template.body.clone();
        }
    }
    require(&subject, "subject")?;
    require(&body, "body")?;

    if dry_run {
        let user = require_user(app).await?;
        let file = user
            .files
            .iter()
            .find(|f| f.file_id == csv_file_id)
            .with_context(|| format!("no uploaded CSV with id {csv_file_id}"))?;
        let text = app.client.to_public().fetch_text(&file.file_url).await?;
        let preview = CsvPreview::parse(&text)?;

        let out_of_range = || format!("row {row} is out of range ({} rows)", preview.len());
        let rendered_subject = preview.render(&subject, row).with_context(out_of_range)?;
        let rendered_body = preview.render(&body, row).with_context(out_of_range)?;

        println!("Recipients: {}", preview.len());
        println!("Placeholders: {}", preview.placeholders().join(" "));
        println!("--- subject ---");
        println!("{rendered_subject}");
        println!("--- body ---");
        println!("{rendered_body}");
        return Ok(());
    }

    let response = app
        .client
        .send_mass(&SendMassRequest {
            csv_file_id,
            subject,
            body,
        })
        .await?;

    if !response.success {
        bail!(response
            .message
            .unwrap_or_else(|| "Failed to send emails".to_string()));
    }
    match response.results {
        Some(results) => println!("Emails sent: {}/{}", results.successful, results.total),
        None => println!("Emails sent"),
    }
    Ok(())
}

fn parse_log_date(value: &str) -> Result<String> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date {value:?}, expected YYYY-MM-DD"))?;
    Ok(value.to_string())
}

async fn logs(
    app: &App,
    page: u32,
    limit: u32,
    status: StatusFilter,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let query = LogQuery {
        page,
        limit,
        status: status.into(),
        from: from.as_deref().map(parse_log_date).transpose()?,
        to: to.as_deref().map(parse_log_date).transpose()?,
    };

    let logs_page = app.client.logs(&query).await?;
    if logs_page.logs.is_empty() {
        println!("No logs");
        return Ok(());
    }

    for log in &logs_page.logs {
        let sent_at = log
            .sent_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        match &log.error {
            Some(error) => println!(
                "{sent_at}  {:<7}  {}  {}  ({error})",
                log.status.to_string(),
                log.recipient,
                log.subject
            ),
            None => println!(
                "{sent_at}  {:<7}  {}  {}",
                log.status.to_string(),
                log.recipient,
                log.subject
            ),
        }
    }
    println!(
        "Page {} of {} ({} total)",
        query.page, logs_page.total_pages, logs_page.total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_blank_values() {
        assert!(require("", "subject").is_err());
        assert!(require("   ", "subject").is_err());
        assert!(require("hello", "subject").is_ok());
    }

    #[test]
    fn log_dates_must_be_iso() {
        assert!(parse_log_date("2026-08-23").is_ok());
        assert!(parse_log_date("23/08/2026").is_err());
        assert!(parse_log_date("2026-13-01").is_err());
    }

    #[test]
    fn status_filter_maps_to_query_values() {
        assert_eq!(Option::<LogStatus>::from(StatusFilter::All), None);
        assert_eq!(
            Option::<LogStatus>::from(StatusFilter::Success),
            Some(LogStatus::Success)
        );
        assert_eq!(
            Option::<LogStatus>::from(StatusFilter::Failed),
            Some(LogStatus::Failed)
        );
    }
}
