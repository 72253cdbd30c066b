//! Command execution
//!
//! [`Console`] owns everything one invocation needs: configuration, the
//! API client, the operator session, the confirmation dialog and the
//! search cache. Each command returns the text to print.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use common::{ApiClient, ApiConfig, ApiError, SessionContext};
use password::PasswordGenerator;
use search::{HttpSearchBackend, QueryCache, SearchError, SearchFilters, SearchSession};
use tracing::{debug, info};

use crate::cli::{Command, DeviceCommand, PasswordCommand, SearchCommand, UserCommand};
use crate::devices::DeviceService;
use crate::dialog::ConfirmDialog;
use crate::render::{self, TableRow};
use crate::users::{UserDraft, UserService};

/// Who answers confirmation prompts
#[derive(Debug, Clone, Copy)]
pub enum Responder {
    /// `--yes` was given
    AssumeYes,
    /// Ask on the terminal; end of input dismisses the prompt
    Terminal,
    /// Fixed answer, `None` dismissing the prompt
    #[cfg(test)]
    Fixed(Option<bool>),
}

impl Responder {
    async fn answer(self, message: &str) -> Result<Option<bool>> {
        match self {
            Responder::AssumeYes => Ok(Some(true)),
            Responder::Terminal => {
                let line = read_line(format!("{} [y/N] ", message)).await?;
                Ok(line.map(|answer| {
                    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
                }))
            }
            #[cfg(test)]
            Responder::Fixed(answer) => Ok(answer),
        }
    }
}

/// Prompt on stderr and read one line from stdin; `None` at end of input
async fn read_line(prompt: String) -> Result<Option<String>> {
    tokio::task::spawn_blocking(move || -> io::Result<Option<String>> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok((read > 0).then(|| line.trim_end_matches(['\r', '\n']).to_string()))
    })
    .await
    .context("Terminal input task failed")?
    .context("Failed to read from terminal")
}

/// One console invocation
pub struct Console {
    config: ApiConfig,
    client: ApiClient,
    session: SessionContext,
    dialog: ConfirmDialog,
    cache: QueryCache,
    responder: Responder,
}

impl Console {
    /// Build the client and restore the persisted session
    pub async fn connect(config: ApiConfig, responder: Responder) -> Result<Self> {
        let client = ApiClient::new(&config).context("Failed to build API client")?;
        let mut session = SessionContext::new(&config.token_path);
        let state = session
            .init()
            .await
            .context("Failed to restore session")?;
        debug!("Session restored as {:?}", state);

        Ok(Self::new(config, client, session, responder))
    }

    pub fn new(
        config: ApiConfig,
        client: ApiClient,
        session: SessionContext,
        responder: Responder,
    ) -> Self {
        Self {
            config,
            client,
            session,
            dialog: ConfirmDialog::new(),
            cache: QueryCache::new(),
            responder,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Run one command and return its output
    pub async fn run(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Login { username, password } => self.login(&username, password).await,
            Command::Logout => self.logout().await,
            Command::Whoami => Ok(self.whoami()),
            Command::Password { command } => Ok(password_command(command)),
            Command::Users { command } => self.users(command).await,
            Command::Devices { command } => self.devices(command).await,
            Command::Search { command } => self.search_command(command).await,
        }
    }

    async fn login(&mut self, username: &str, password: Option<String>) -> Result<String> {
        let password = match password {
            Some(password) => password,
            None => match read_line("Password: ".to_string()).await? {
                Some(password) => password,
                None => bail!("No password given"),
            },
        };

        let user = self
            .session
            .login(&self.client, username, &password)
            .await
            .context("Login failed")?;
        Ok(format!("Signed in as {} ({})", user.username, user.role.as_str()))
    }

    async fn logout(&mut self) -> Result<String> {
        self.session
            .logout(&self.client)
            .await
            .context("Logout failed")?;
        Ok("Signed out".to_string())
    }

    fn whoami(&self) -> String {
        match self.session.current_user() {
            Some(user) => format!(
                "{} <{}> ({}){}",
                user.username,
                user.email,
                user.role.as_str(),
                user.full_name
                    .as_deref()
                    .map(|name| format!(", {}", name))
                    .unwrap_or_default()
            ),
            None => "Not signed in".to_string(),
        }
    }

    /// API client carrying the session token
    fn authorized(&self) -> Result<ApiClient> {
        self.session.authorize(&self.client).map_err(|e| match e {
            ApiError::Unauthorized => {
                anyhow::anyhow!("Not signed in; run `clinic-admin login` first")
            }
            other => other.into(),
        })
    }

    /// Ask the operator through the confirmation dialog
    async fn confirm(&mut self, message: String) -> Result<bool> {
        let choice = self.dialog.open(message.clone());
        match self.responder.answer(&message).await? {
            Some(true) => {
                self.dialog.confirm();
            }
            Some(false) => {
                self.dialog.cancel();
            }
            None => self.dialog.dismiss(),
        }
        Ok(choice.wait().await)
    }

    async fn users(&mut self, command: UserCommand) -> Result<String> {
        let service = UserService::new(self.authorized()?);
        let mut generator = PasswordGenerator::new();

        match command {
            UserCommand::List => Ok(render::table(&service.list().await?)),
            UserCommand::Create {
                username,
                email,
                full_name,
                role,
                password,
            } => {
                let draft = UserDraft {
                    username,
                    email,
                    full_name,
                    role,
                    password,
                };
                let created = service.create(draft, &mut generator).await?;
                let mut out = render::table(std::slice::from_ref(&created.user));
                if let Some(password) = created.generated_password {
                    out.push_str(&format!("Generated password: {}\n", password));
                }
                Ok(out)
            }
            UserCommand::Activate { id } => {
                let user = service.set_active(id, true).await?;
                Ok(format!("Activated {}", user.username))
            }
            UserCommand::Deactivate { id } => {
                if !self.confirm(format!("Deactivate user {}?", id)).await? {
                    return Ok(cancelled());
                }
                let user = service.set_active(id, false).await?;
                Ok(format!("Deactivated {}", user.username))
            }
            UserCommand::Delete { id } => {
                if !self
                    .confirm(format!("Delete user {}? This cannot be undone.", id))
                    .await?
                {
                    return Ok(cancelled());
                }
                service.delete(id).await?;
                Ok(format!("Deleted user {}", id))
            }
            UserCommand::ResetPassword { id, password } => {
                if !self
                    .confirm(format!("Reset the password of user {}?", id))
                    .await?
                {
                    return Ok(cancelled());
                }
                let password = service.reset_password(id, password, &mut generator).await?;
                Ok(format!("New password for user {}: {}", id, password))
            }
        }
    }

    async fn devices(&mut self, command: DeviceCommand) -> Result<String> {
        let service = DeviceService::new(self.authorized()?);

        match command {
            DeviceCommand::List { status } => Ok(render::table(&service.list(status).await?)),
            DeviceCommand::Approve { id } => {
                let device = service.approve(id).await?;
                Ok(format!("Approved {} for {}", device.device_name, device.username))
            }
            DeviceCommand::Reject { id } => {
                if !self.confirm(format!("Reject device {}?", id)).await? {
                    return Ok(cancelled());
                }
                let device = service.reject(id).await?;
                Ok(format!("Rejected {} for {}", device.device_name, device.username))
            }
        }
    }

    async fn search_command(&mut self, command: SearchCommand) -> Result<String> {
        let page_size = self.config.default_page_size;
        match command {
            SearchCommand::Patients(args) => self.search(args.into_filters(page_size)).await,
            SearchCommand::Vaccinations(args) => self.search(args.into_filters(page_size)).await,
            SearchCommand::Payments(args) => self.search(args.into_filters(page_size)).await,
        }
    }

    /// Run one search through a session scoped to the configured facility
    pub async fn search<F>(&mut self, mut filters: F) -> Result<String>
    where
        F: SearchFilters,
        F::Item: TableRow,
    {
        let backend = HttpSearchBackend::new(self.authorized()?);
        filters.set_facility(self.config.facility_id);
        if !filters.has_constraints() {
            debug!("No {} filters set; listing every record", F::ENTITY);
        }

        let mut session = SearchSession::new(filters, self.cache.clone())
            .with_stale_after(self.config.cache_stale_after());
        let page = session
            .search(&backend)
            .await
            .with_context(|| format!("{} search failed", F::ENTITY))?;

        info!("Rendering {} {} results", page.len(), F::ENTITY);
        Ok(render::search_page(page))
    }
}

/// Hint shown after a failure that retrying could fix
pub fn retry_hint(error: &anyhow::Error) -> Option<&'static str> {
    let transient = error.chain().any(|cause| {
        cause
            .downcast_ref::<ApiError>()
            .or_else(|| {
                cause
                    .downcast_ref::<SearchError>()
                    .and_then(|e| e.api_error())
            })
            .is_some_and(ApiError::is_transient)
    });
    transient.then_some("The clinic API may be temporarily unavailable; try again shortly")
}

fn cancelled() -> String {
    "Cancelled".to_string()
}

fn password_command(command: PasswordCommand) -> String {
    match command {
        PasswordCommand::Generate { count } => {
            let mut options = password::generate_password_options(count).join("\n");
            options.push('\n');
            options
        }
        PasswordCommand::Check { password } => {
            let report = password::validate(&password);
            if report.valid {
                "Password meets the policy\n".to_string()
            } else {
                let mut out = String::from("Password does not meet the policy:\n");
                for error in &report.errors {
                    out.push_str(&format!("  - {}\n", error));
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PatientArgs;
    use crate::test_support::spawn_api;
    use axum::{
        Json, Router,
        extract::{Path, Query},
        routing::{delete, get, post},
    };
    use clap::Parser;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tempfile::TempDir;

    fn routes(deletes: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/auth/login",
                post(|| async {
                    Json(json!({
                        "access_token": "test-token",
                        "token_type": "bearer",
                        "user": {
                            "id": 1,
                            "username": "admin",
                            "email": "admin@clinic.test",
                            "full_name": "Clinic Admin",
                            "role": "admin"
                        }
                    }))
                }),
            )
            .route(
                "/search/patients",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({
                        "items": [{
                            "id": 3,
                            "name": params.get("name").cloned().unwrap_or_default(),
                            "phone": "0803555123",
                            "age": 27,
                            "sex": "female",
                            "patient_type": "regular",
                            "status": "active",
                            "facility_id": params.get("facility_id").and_then(|f| f.parse::<i64>().ok()).unwrap_or(0),
                            "created_at": "2024-03-01T09:15:00Z"
                        }],
                        "total_count": 1,
                        "page": 1,
                        "page_size": 20,
                        "total_pages": 1,
                        "has_next": false,
                        "has_previous": false
                    }))
                }),
            )
            .route(
                "/users/:id",
                delete(move |Path(_id): Path<i64>| {
                    let deletes = deletes.clone();
                    async move {
                        deletes.fetch_add(1, Ordering::SeqCst);
                        Json(json!({ "message": "deleted" }))
                    }
                }),
            )
    }

    async fn console(dir: &TempDir, responder: Responder, deletes: Arc<AtomicUsize>) -> Console {
        let client = spawn_api(routes(deletes)).await;
        let config = ApiConfig {
            facility_id: Some(2),
            token_path: dir.path().join("session.json"),
            ..ApiConfig::default()
        };
        let mut session = SessionContext::new(&config.token_path);
        session.init().await.expect("init");
        Console::new(config, client, session, responder)
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["clinic-admin"];
        argv.extend_from_slice(args);
        crate::cli::Cli::try_parse_from(argv).expect("parse").command
    }

    #[tokio::test]
    async fn test_search_requires_login() {
        let dir = TempDir::new().expect("tempdir");
        let mut console = console(&dir, Responder::AssumeYes, Arc::default()).await;

        let err = console
            .search(patient_args("Ada").into_filters(20))
            .await
            .expect_err("signed out");
        assert!(err.to_string().contains("Not signed in"));
    }

    fn patient_args(name: &str) -> PatientArgs {
        match parse(&["search", "patients", "--name", name]) {
            Command::Search {
                command: SearchCommand::Patients(args),
            } => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_then_search_scoped_to_facility() {
        let dir = TempDir::new().expect("tempdir");
        let mut console = console(&dir, Responder::AssumeYes, Arc::default()).await;

        let out = console
            .run(parse(&["login", "-u", "admin", "-p", "Passw0rd!"]))
            .await
            .expect("login");
        assert_eq!(out, "Signed in as admin (admin)");
        assert!(console.session().is_active());
        assert!(console.whoami().starts_with("admin <admin@clinic.test>"));

        let out = console
            .run(parse(&["search", "patients", "--name", "Ada"]))
            .await
            .expect("search");
        assert!(out.contains("Ada"));
        assert!(out.contains("page 1 of 1, 1 result"));
    }

    async fn signed_in(dir: &TempDir, responder: Responder, deletes: Arc<AtomicUsize>) -> Console {
        let mut console = console(dir, responder, deletes).await;
        console
            .run(parse(&["login", "-u", "admin", "-p", "Passw0rd!"]))
            .await
            .expect("login");
        console
    }

    #[tokio::test]
    async fn test_destructive_commands_wait_for_confirmation() {
        let dir = TempDir::new().expect("tempdir");
        let deletes = Arc::new(AtomicUsize::new(0));

        let mut declined = signed_in(&dir, Responder::Fixed(Some(false)), deletes.clone()).await;
        let out = declined.run(parse(&["users", "delete", "5"])).await.expect("run");
        assert_eq!(out, "Cancelled");

        let mut dismissed = signed_in(&dir, Responder::Fixed(None), deletes.clone()).await;
        let out = dismissed.run(parse(&["users", "delete", "5"])).await.expect("run");
        assert_eq!(out, "Cancelled");
        assert_eq!(deletes.load(Ordering::SeqCst), 0);

        let mut confirmed = signed_in(&dir, Responder::AssumeYes, deletes.clone()).await;
        let out = confirmed.run(parse(&["users", "delete", "5"])).await.expect("run");
        assert_eq!(out, "Deleted user 5");
        assert_eq!(deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_without_filters_lists_records() {
        let dir = TempDir::new().expect("tempdir");
        let mut console = signed_in(&dir, Responder::AssumeYes, Arc::default()).await;

        let out = console
            .run(parse(&["search", "patients"]))
            .await
            .expect("search");
        assert!(out.contains("page 1 of 1, 1 result"));
    }

    #[test]
    fn test_retry_hint_only_for_transient_failures() {
        let server_error = ApiError::Status {
            status: common::error::StatusCode::BAD_GATEWAY,
            message: "upstream down".to_string(),
        };
        let err = anyhow::Error::new(SearchError::from(server_error)).context("patient search failed");
        assert!(retry_hint(&err).is_some());

        let err = anyhow::Error::new(ApiError::Unauthorized).context("Login failed");
        assert_eq!(retry_hint(&err), None);

        let err = anyhow::Error::new(SearchError::Validation("page must be 1 or greater".to_string()));
        assert_eq!(retry_hint(&err), None);
    }

    #[test]
    fn test_password_commands() {
        let out = password_command(PasswordCommand::Generate { count: 4 });
        let options: Vec<&str> = out.lines().collect();
        assert_eq!(options.len(), 4);
        assert!(options.iter().all(|p| password::validate(p).valid));

        let out = password_command(PasswordCommand::Check {
            password: "password".to_string(),
        });
        assert!(out.contains(password::policy::MISSING_DIGIT));
    }
}
