use std::io::{self, Write};

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError, AuthResponse};
use crate::cli::Invocation;
use crate::config::Config;
use crate::hooks::HookRunner;
use crate::matrix;
use crate::render::Renderer;
use crate::session::{Session, StateDir};
use crate::task::Task;
use crate::validate;
use crate::view::{self, ViewMode, ViewState};

pub const COMMANDS: [&str; 16] = [
    "add", "clear", "config", "delete", "done", "help", "list", "login", "logout", "matrix",
    "modify", "register", "reopen", "show", "version", "whoami",
];

/// Expand a (possibly abbreviated) command token to its full name. Exact
/// names always win; a prefix expands only when it is unambiguous.
pub fn expand_command_abbrev(token: &str) -> Option<&'static str> {
    let mut hits = COMMANDS.iter().copied().filter(|name| name.starts_with(token));
    match (hits.next(), hits.next()) {
        (Some(name), None) => Some(name),
        (Some(_), Some(_)) => COMMANDS.iter().copied().find(|name| *name == token),
        (None, _) => None,
    }
}

#[instrument(skip(store, cfg, renderer, api, inv))]
pub fn dispatch(
    store: &mut StateDir,
    cfg: &Config,
    renderer: &mut Renderer,
    api: &ApiClient,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let hooks = HookRunner::new(cfg, &store.data_dir);
    let command = inv.command.as_str();

    debug!(
        command,
        view_tokens = ?inv.view_tokens,
        args = ?inv.command_args,
        "dispatching command"
    );

    // list/matrix accept view tokens on either side of the command word.
    let mut view_tokens = inv.view_tokens.clone();
    view_tokens.extend(inv.command_args.iter().cloned());

    match command {
        "login" => cmd_login(store, &hooks, api, &inv.command_args),
        "register" => cmd_register(store, &hooks, api, &inv.command_args),
        "logout" => cmd_logout(store, &hooks),
        "whoami" => cmd_whoami(store),
        "list" => cmd_list(store, cfg, renderer, api, &hooks, &view_tokens, now),
        "matrix" => cmd_matrix(store, cfg, renderer, api, &hooks, &view_tokens, now),
        "add" => cmd_add(store, api, &hooks, &inv.command_args, now),
        "modify" => cmd_modify(store, api, &hooks, &inv.command_args, now),
        "done" => cmd_set_completion(store, api, &hooks, &inv.command_args, now, true),
        "reopen" => cmd_set_completion(store, api, &hooks, &inv.command_args, now, false),
        "delete" => cmd_delete(store, api, &hooks, &inv.command_args),
        "show" => cmd_show(store, renderer, api, &hooks, &inv.command_args),
        "clear" => cmd_clear(store, cfg),
        "config" => cmd_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn require_session(store: &StateDir) -> anyhow::Result<Session> {
    store
        .load_session()?
        .ok_or_else(|| anyhow!("not logged in; run `zm login <email>` first"))
}

/// Unauthorized responses force a logout: the stored session is removed,
/// teardown hooks run, and the in-flight operation is abandoned. Any
/// other API error is passed through for the user to retry.
fn map_api_error(store: &StateDir, hooks: &HookRunner, err: ApiError) -> anyhow::Error {
    if matches!(err, ApiError::Unauthorized) {
        if let Err(clear_err) = store.clear_session() {
            warn!(error = %clear_err, "failed to clear session after unauthorized response");
        }
        if let Err(hook_err) = hooks.run_on_logout() {
            warn!(error = %hook_err, "on-logout hook failed during forced logout");
        }
        return anyhow!("session expired or unauthorized; please log in again");
    }
    anyhow::Error::new(err)
}

#[instrument(skip(store, hooks, api, args))]
fn cmd_login(
    store: &mut StateDir,
    hooks: &HookRunner,
    api: &ApiClient,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command login");

    let (email, password) = credentials(args)?;
    let auth = api.login(&email, &password).map_err(auth_error)?;
    finish_auth(store, hooks, auth, format!("Logged in as {email}."))
}

#[instrument(skip(store, hooks, api, args))]
fn cmd_register(
    store: &mut StateDir,
    hooks: &HookRunner,
    api: &ApiClient,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command register");

    let (email, password) = credentials(args)?;
    let auth = api.register(&email, &password).map_err(auth_error)?;
    finish_auth(store, hooks, auth, format!("Registered as {email}."))
}

/// Shared tail of login and register: persist the session, run the
/// on-login hooks, echo the server's message if it sent one.
fn finish_auth(
    store: &mut StateDir,
    hooks: &HookRunner,
    auth: AuthResponse,
    fallback: String,
) -> anyhow::Result<()> {
    let AuthResponse {
        token,
        user,
        message,
    } = auth;

    store.save_session(&Session { token, user })?;
    hooks.run_on_login()?;

    println!("{}", message.unwrap_or(fallback));
    Ok(())
}

fn auth_error(err: ApiError) -> anyhow::Error {
    match err {
        ApiError::Unauthorized => anyhow!("invalid credentials"),
        other => anyhow::Error::new(other),
    }
}

fn credentials(args: &[String]) -> anyhow::Result<(String, String)> {
    let email = match args.first().map(|raw| raw.trim()) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => bail!("an email address is required"),
    };

    let password = match args.get(1) {
        Some(password) => password.clone(),
        None => prompt_password()?,
    };
    if password.is_empty() {
        bail!("a password is required");
    }

    Ok((email, password))
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed reading password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[instrument(skip(store, hooks))]
fn cmd_logout(store: &mut StateDir, hooks: &HookRunner) -> anyhow::Result<()> {
    info!("command logout");

    if store.load_session()?.is_none() {
        println!("No active session.");
        return Ok(());
    }

    store.clear_session()?;
    hooks.run_on_logout()?;
    println!("Logged out.");
    Ok(())
}

#[instrument(skip(store))]
fn cmd_whoami(store: &mut StateDir) -> anyhow::Result<()> {
    match store.load_session()? {
        Some(session) => println!("{}", session.user.email),
        None => println!("not logged in"),
    }
    Ok(())
}

#[instrument(skip(store, cfg, renderer, api, hooks, tokens, now))]
fn cmd_list(
    store: &mut StateDir,
    cfg: &Config,
    renderer: &mut Renderer,
    api: &ApiClient,
    hooks: &HookRunner,
    tokens: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let session = require_session(store)?;
    let mut view = load_view(store, cfg)?;
    view.mode = ViewMode::List;
    view::apply_tokens(&mut view, tokens)?;
    store.save_view(&view)?;

    let page = api
        .list_tasks(&session.token, &view)
        .map_err(|err| map_api_error(store, hooks, err))?;
    renderer.print_task_table(&page.tasks, page.total_count, &view, now)?;
    Ok(())
}

#[instrument(skip(store, cfg, renderer, api, hooks, tokens, now))]
fn cmd_matrix(
    store: &mut StateDir,
    cfg: &Config,
    renderer: &mut Renderer,
    api: &ApiClient,
    hooks: &HookRunner,
    tokens: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command matrix");

    let session = require_session(store)?;
    let mut view = load_view(store, cfg)?;
    view.mode = ViewMode::Matrix;
    view.page = 1;
    view::apply_tokens(&mut view, tokens)?;
    store.save_view(&view)?;

    let page = api
        .list_tasks(&session.token, &view)
        .map_err(|err| map_api_error(store, hooks, err))?;
    let buckets = matrix::categorize(&page.tasks);
    renderer.print_matrix(&buckets, now)?;
    Ok(())
}

#[instrument(skip(store, api, hooks, args, now))]
fn cmd_add(
    store: &mut StateDir,
    api: &ApiClient,
    hooks: &HookRunner,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command add");

    let session = require_session(store)?;
    let (titulo, mods) = parse_title_and_mods(args, now)?;

    let mut task = Task::new_draft(titulo);
    apply_mods(&mut task, &mods);
    task.sync_completion(now);
    ensure_valid(&task)?;

    api.create_task(&session.token, &task)
        .map_err(|err| map_api_error(store, hooks, err))?;

    println!("Created task \"{}\".", task.titulo);
    Ok(())
}

#[instrument(skip(store, api, hooks, args, now))]
fn cmd_modify(
    store: &mut StateDir,
    api: &ApiClient,
    hooks: &HookRunner,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command modify");

    let session = require_session(store)?;
    let (id, rest) = split_id_args(args, "modify")?;
    let mods = parse_mods(&rest, now)?;
    if mods.is_empty() {
        bail!("modify requires at least one field change");
    }

    let mut task = fetch_task(store, api, hooks, &session, &id)?;
    apply_mods(&mut task, &mods);
    task.sync_completion(now);
    ensure_valid(&task)?;

    api.update_task(&session.token, &id, &task)
        .map_err(|err| map_api_error(store, hooks, err))?;

    println!("Modified task {id}.");
    Ok(())
}

#[instrument(skip(store, api, hooks, args, now))]
fn cmd_set_completion(
    store: &mut StateDir,
    api: &ApiClient,
    hooks: &HookRunner,
    args: &[String],
    now: DateTime<Utc>,
    completed: bool,
) -> anyhow::Result<()> {
    info!(completed, "command done/reopen");

    let session = require_session(store)?;
    let (id, rest) = split_id_args(args, if completed { "done" } else { "reopen" })?;
    if !rest.is_empty() {
        warn!(extra = ?rest, "ignoring extra arguments");
    }

    let mut task = fetch_task(store, api, hooks, &session, &id)?;
    task.is_completed = completed;
    task.sync_completion(now);

    api.update_task(&session.token, &id, &task)
        .map_err(|err| map_api_error(store, hooks, err))?;

    if completed {
        println!("Completed task {id}.");
    } else {
        println!("Reopened task {id}.");
    }
    Ok(())
}

#[instrument(skip(store, api, hooks, args))]
fn cmd_delete(
    store: &mut StateDir,
    api: &ApiClient,
    hooks: &HookRunner,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let session = require_session(store)?;
    let (id, _) = split_id_args(args, "delete")?;

    api.delete_task(&session.token, &id)
        .map_err(|err| map_api_error(store, hooks, err))?;

    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(store, renderer, api, hooks, args))]
fn cmd_show(
    store: &mut StateDir,
    renderer: &mut Renderer,
    api: &ApiClient,
    hooks: &HookRunner,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command show");

    let session = require_session(store)?;
    let (id, _) = split_id_args(args, "show")?;
    let task = fetch_task(store, api, hooks, &session, &id)?;
    renderer.print_task_info(&task)?;
    Ok(())
}

#[instrument(skip(store, cfg))]
fn cmd_clear(store: &mut StateDir, cfg: &Config) -> anyhow::Result<()> {
    info!("command clear");

    let mut view = load_view(store, cfg)?;
    view.clear_filters();
    store.save_view(&view)?;
    println!("Filters and sorting cleared.");
    Ok(())
}

fn cmd_config(cfg: &Config) -> anyhow::Result<()> {
    let mut entries: Vec<(&String, &String)> = cfg.iter().collect();
    entries.sort();
    for (key, value) in entries {
        println!("{key}={value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: zm [view tokens] <command> [args]");
    println!();
    println!("commands: {}", COMMANDS.join(", "));
    Ok(())
}

fn load_view(store: &StateDir, cfg: &Config) -> anyhow::Result<ViewState> {
    if let Some(view) = store.load_view()? {
        return Ok(view);
    }

    let mut view = ViewState::default();
    if let Some(limit) = cfg
        .get("page.limit")
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
    {
        view.limit = limit;
    }
    Ok(view)
}

/// The API has no by-id GET, so single-task commands fetch the unfiltered
/// set and select client-side.
fn fetch_task(
    store: &StateDir,
    api: &ApiClient,
    hooks: &HookRunner,
    session: &Session,
    id: &str,
) -> anyhow::Result<Task> {
    let page = api
        .list_tasks(&session.token, &ViewState::unpaginated())
        .map_err(|err| map_api_error(store, hooks, err))?;

    page.tasks
        .into_iter()
        .find(|task| task.id.as_deref() == Some(id))
        .ok_or_else(|| anyhow!("no task with id {id}"))
}

fn split_id_args(args: &[String], command: &str) -> anyhow::Result<(String, Vec<String>)> {
    let Some(id) = args.first() else {
        bail!("{command} requires a task id");
    };
    Ok((id.clone(), args[1..].to_vec()))
}

fn ensure_valid(task: &Task) -> anyhow::Result<()> {
    if let Err(errors) = validate::validate_task(task) {
        for error in &errors {
            eprintln!("  {}: {}", error.field, error.message);
        }
        bail!("task rejected by validation ({} problem(s))", errors.len());
    }

    if !task.prioridad.is_empty() && !Task::is_known_priority(&task.prioridad) {
        warn!(prioridad = %task.prioridad, "priority is not one of the four quadrant labels");
    }

    Ok(())
}

#[derive(Debug, Clone)]
enum Mod {
    Title(String),
    Note(Option<String>),
    Project(String),
    Owner(String),
    Priority(String),
    Due(Option<DateTime<Utc>>),
    Completed(bool),
}

/// Split `add` arguments into title words and field modifiers. Everything
/// after a literal `--` is title text, `key:value` lookalikes included.
#[instrument(skip(args, now))]
fn parse_title_and_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<(String, Vec<Mod>)> {
    let (field_args, literal_args) = match args.iter().position(|arg| arg == "--") {
        Some(marker) => (&args[..marker], &args[marker + 1..]),
        None => (args, &args[args.len()..]),
    };

    let mut title_parts: Vec<&str> = Vec::new();
    let mut mods = Vec::new();
    for arg in field_args {
        match parse_one_mod(arg, now)? {
            Some(one_mod) => mods.push(one_mod),
            None => title_parts.push(arg),
        }
    }
    title_parts.extend(literal_args.iter().map(String::as_str));

    if title_parts.is_empty() {
        bail!("add: a task title is required");
    }

    Ok((title_parts.join(" "), mods))
}

#[instrument(skip(args, now))]
fn parse_mods(args: &[String], now: DateTime<Utc>) -> anyhow::Result<Vec<Mod>> {
    let mut mods = Vec::new();
    for arg in args {
        match parse_one_mod(arg, now)? {
            Some(one_mod) => mods.push(one_mod),
            None => warn!(arg = %arg, "unrecognized modifier token ignored"),
        }
    }
    Ok(mods)
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    let Some((key, value)) = tok.split_once([':', '=']) else {
        return Ok(None);
    };

    let parsed = match key.to_ascii_lowercase().as_str() {
        "title" | "titulo" => Mod::Title(value.to_string()),
        "desc" | "descripcion" | "note" => {
            let trimmed = value.trim();
            Mod::Note((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        "project" | "proyecto" => Mod::Project(value.to_string()),
        "owner" | "responsable" => Mod::Owner(value.to_string()),
        "pri" | "priority" | "prioridad" => Mod::Priority(value.to_string()),
        "due" | "vencimiento" => {
            if value.trim().is_empty() {
                Mod::Due(None)
            } else {
                Mod::Due(Some(crate::datetime::parse_date_expr(value, now)?))
            }
        }
        "completed" => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Mod::Completed(true),
            "false" | "no" => Mod::Completed(false),
            other => bail!("completed must be true or false, got: {other}"),
        },
        _ => return Ok(None),
    };

    Ok(Some(parsed))
}

fn apply_mods(task: &mut Task, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::Title(titulo) => task.titulo = titulo.clone(),
            Mod::Note(descripcion) => task.descripcion = descripcion.clone(),
            Mod::Project(proyecto) => task.proyecto = proyecto.clone(),
            Mod::Owner(responsable) => task.responsable = responsable.clone(),
            Mod::Priority(prioridad) => task.prioridad = prioridad.clone(),
            Mod::Due(due) => task.fecha_vencimiento = *due,
            Mod::Completed(completed) => task.is_completed = *completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{apply_mods, expand_command_abbrev, parse_title_and_mods};
    use crate::task::Task;

    #[test]
    fn abbreviations_expand_when_unambiguous() {
        assert_eq!(expand_command_abbrev("mat"), Some("matrix"));
        assert_eq!(expand_command_abbrev("li"), Some("list"));
        assert_eq!(expand_command_abbrev("lo"), None, "login vs logout");
        assert_eq!(expand_command_abbrev("nope"), None);
        assert_eq!(expand_command_abbrev("done"), Some("done"));
    }

    #[test]
    fn add_arguments_split_into_title_and_field_mods() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let args: Vec<String> = [
            "Pay",
            "rent",
            "project:Home",
            "owner:Ana",
            "priority:Urgente-Importante",
            "due:2026-04-01",
        ]
        .iter()
        .map(ToString::to_string)
        .collect();

        let (titulo, mods) = parse_title_and_mods(&args, now).expect("parse");
        assert_eq!(titulo, "Pay rent");

        let mut task = Task::new_draft(titulo);
        apply_mods(&mut task, &mods);
        assert_eq!(task.proyecto, "Home");
        assert_eq!(task.responsable, "Ana");
        assert_eq!(task.prioridad, "Urgente-Importante");
        assert_eq!(
            task.fecha_vencimiento,
            Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn double_dash_forces_literal_title_words() {
        let now = Utc::now();
        let args: Vec<String> = ["--", "project:everything"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let (titulo, mods) = parse_title_and_mods(&args, now).expect("parse");
        assert_eq!(titulo, "project:everything");
        assert!(mods.is_empty());
    }
}
