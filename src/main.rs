mod cli;

use crate::cli::{Command, LightAction, RuleCommand, RuleFields, ShortcutCommand};
use chrono::Local;
use homiease_panel::client::HomieClient;
use homiease_panel::clock;
use homiease_panel::config::Config;
use homiease_panel::models::homiease::{DeviceId, Shortcut};
use homiease_panel::nav::{self, Route};
use homiease_panel::notify::Notices;
use homiease_panel::screens::all_devices::AllDevicesScreen;
use homiease_panel::screens::auth::{self, LoginForm, SignupForm};
use homiease_panel::screens::automation_form::AutomationForm;
use homiease_panel::screens::automations::AutomationsScreen;
use homiease_panel::screens::form::Confirm;
use homiease_panel::screens::home::HomeScreen;
use homiease_panel::screens::lighting::{render_light, LightingScreen};
use homiease_panel::session::{self, SessionStore, SharedSession};
use homiease_panel::weather;
use log::{error, info, warn};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
    applied: usize,
}

/// Yes/no prompt on the terminal. Anything but `y`/`yes` declines.
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        ask(&format!("{} [y/N] ", prompt))
            .map(|answer| matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }
}

fn ask(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string())
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes { Box::new(|_: &str| true) } else { Box::new(StdinConfirm) }
}

fn print_notices(notices: &mut Notices) {
    for notice in notices.drain() {
        println!("{}", notice);
    }
}

pub fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (api={}, session_file={}, http_timeout={}, weather_enabled={})",
        cfg.api_base_url,
        cfg.session_file.display(),
        cfg.http_timeout
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "-".to_string()),
        cfg.weather_enabled
    );

    // 2) Restore session
    let session = SessionStore::open(&cfg.session_file)
        .map_err(|e| format!("Loading session failed: {}", e))?
        .into_shared();
    let client = HomieClient::new(&cfg, session.clone());

    // 3) Route guard
    if let Some(requested) = command.route() {
        let authenticated = session::lock(&session).is_authenticated();
        match requested.guard(authenticated) {
            Route::Login if requested != Route::Login => {
                return Err(format!(
                    "{} needs a session; run `login <username>` first",
                    requested
                ));
            }
            Route::Home if requested.is_public() => {
                let who = session::lock(&session).username().unwrap_or("User").to_string();
                println!("Already logged in as {}; run `logout` to switch accounts", who);
                return Ok(());
            }
            _ => {}
        }
    }

    // 4) Dispatch and show whatever the screen raised
    let mut notices = Notices::new();
    let outcome = dispatch(command, &cfg, &client, &session, &mut notices);
    print_notices(&mut notices);
    outcome
}

fn dispatch(
    command: Command,
    cfg: &Config,
    client: &HomieClient,
    session: &SharedSession,
    notices: &mut Notices,
) -> Result<(), String> {
    match command {
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => ask("Password: ").unwrap_or_default(),
            };
            let route = LoginForm::new(username, password)
                .submit(client, session, notices)
                .map_err(|e| e.to_string())?;
            match route {
                Route::Home => Ok(()),
                _ => Err("login failed".to_string()),
            }
        }
        Command::Signup { username, email, password } => {
            let password = match password {
                Some(p) => p,
                None => ask("Password: ").unwrap_or_default(),
            };
            let form = SignupForm { username, email, password };
            match form.submit(client, notices).map_err(|e| e.to_string())? {
                Route::Login => Ok(()),
                _ => Err("signup failed".to_string()),
            }
        }
        Command::Logout => {
            let route = auth::logout(session);
            info!("Logged out; next stop {}", route);
            println!("Logged out");
            Ok(())
        }
        Command::Menu => {
            for item in nav::side_menu().iter().chain(nav::bottom_nav().iter()) {
                let state = if item.enabled { item.route.path() } else { "(coming soon)" };
                println!("{:<12} {}", item.label, state);
            }
            Ok(())
        }
        Command::Go(label) => match nav::select(&label) {
            Some(route) => {
                println!("{}", route);
                Ok(())
            }
            None => Err(format!("{:?} is not available", label)),
        },
        Command::Home { follow } => {
            let mut screen = HomeScreen::open(client, session);
            screen.weather = weather::current(cfg);
            if !follow {
                print!("{}", screen.render(&Local::now()));
                return Ok(());
            }
            clock::run_ticker(cfg.clock_refresh, || {
                print!("\x1b[2J\x1b[H{}", screen.render(&Local::now()));
                io::stdout().flush().is_ok()
            });
            Ok(())
        }
        Command::Devices { room, search } => {
            let mut screen = AllDevicesScreen::open(client, notices);
            if room.is_some() {
                screen.select_room(room.as_deref());
                if screen.room.is_none() {
                    warn!("Unknown room {:?}; showing every room", room);
                }
            }
            screen.search = search.unwrap_or_default();
            print!("{}", screen.render());
            Ok(())
        }
        Command::AddDevice { name, category, room } => {
            let mut screen = AllDevicesScreen::open(client, notices);
            screen.select_room(room.as_deref());
            let mut form = screen.add_form();
            form.name = name;
            form.set_category(category);
            screen.add(client, &form, notices).map_err(|e| e.to_string())
        }
        Command::Lights { room, search } => {
            let mut screen = LightingScreen::open(client, room.as_deref(), notices);
            screen.search = search.unwrap_or_default();
            print!("{}", screen.render());
            Ok(())
        }
        Command::Light(action) => run_light(action, client, notices),
        Command::AddLight { name, room } => {
            let mut screen = LightingScreen::open(client, room.as_deref(), notices);
            let mut form = screen.add_form();
            form.name = name;
            screen.add(client, &form, notices).map_err(|e| e.to_string())
        }
        Command::MasterOff => {
            let mut screen = HomeScreen::open(client, session);
            match screen.master_off(client, notices) {
                Some(report) if !report.is_complete() => Err(format!(
                    "{} of {} lights did not turn off",
                    report.failed.len(),
                    report.total()
                )),
                _ => Ok(()),
            }
        }
        Command::Automations => {
            let screen = AutomationsScreen::open(client, notices);
            let devices = client.list_devices().unwrap_or_else(|e| {
                warn!("Error loading devices: {}", e);
                Vec::new()
            });
            print!("{}", screen.render(&devices));
            Ok(())
        }
        Command::Automation(rule) => run_automation(rule, client, notices),
        Command::Shortcuts => {
            let mut screen = HomeScreen::open(client, session);
            screen.start_editing();
            for (shortcut, name, pinned) in screen.shortcut_candidates() {
                let key = match shortcut {
                    Shortcut::Device { id } => format!("device:{}", id),
                    Shortcut::Automation { id } => format!("automation:{}", id),
                };
                println!("[{}] {:<24} {}", if pinned { "x" } else { " " }, key, name);
            }
            Ok(())
        }
        Command::Shortcut(action) => {
            let mut screen = HomeScreen::open(client, session);
            screen.start_editing();
            match action {
                ShortcutCommand::Toggle(list) => {
                    for shortcut in list {
                        if screen.toggle_shortcut(shortcut, notices).is_none() {
                            return Err("saved shortcuts could not be loaded; nothing changed".to_string());
                        }
                    }
                }
                ShortcutCommand::Save(list) => screen.shortcuts = list,
            }
            screen.save_shortcuts(client, notices).map_err(|e| e.to_string())
        }
    }
}

fn run_light(action: LightAction, client: &HomieClient, notices: &mut Notices) -> Result<(), String> {
    let mut screen = LightingScreen::open(client, None, notices);
    let show = |screen: &LightingScreen, id: &DeviceId| {
        if let Some(light) = screen.lights.iter().find(|d| d.id == *id) {
            println!("{}", render_light(light, true));
        }
    };
    match action {
        LightAction::Switch { id, on } => {
            screen.toggle(client, &id, on, notices).map_err(|e| e.to_string())?;
            show(&screen, &id);
        }
        LightAction::Brightness { id, level } => {
            if !screen.drag_brightness(&id, level) {
                return Err(format!("light {} is off or unknown; switch it on first", id));
            }
            screen.release_brightness(client, &id, notices).map_err(|e| e.to_string())?;
            show(&screen, &id);
        }
        LightAction::Delete { id, yes } => {
            let deleted = screen
                .delete(client, &id, confirmer(yes).as_ref(), notices)
                .map_err(|e| e.to_string())?;
            if !deleted {
                println!("Cancelled");
            }
        }
    }
    Ok(())
}

fn apply_fields(form: &mut AutomationForm, fields: RuleFields) {
    if let Some(name) = fields.name {
        form.name = name;
    }
    if let Some(time) = fields.time {
        form.time = time;
    }
    if let Some(action) = fields.action {
        form.action = action;
    }
    for id in &fields.devices {
        form.toggle_device(id);
    }
}

fn run_automation(command: RuleCommand, client: &HomieClient, notices: &mut Notices) -> Result<(), String> {
    let mut screen = AutomationsScreen::open(client, notices);
    match command {
        RuleCommand::Add(fields) => {
            let mut form = AutomationForm::new_rule();
            apply_fields(&mut form, fields);
            screen.submit_form(client, &form, notices).map_err(|e| e.to_string())
        }
        RuleCommand::Edit { id, fields } => {
            let mut form = screen.edit_form(&id).ok_or_else(|| format!("no automation with id {}", id))?;
            apply_fields(&mut form, fields);
            screen.submit_form(client, &form, notices).map_err(|e| e.to_string())
        }
        RuleCommand::Toggle { id, active } => screen.toggle(client, &id, active, notices).map_err(|e| e.to_string()),
        RuleCommand::Delete { id, yes } => {
            let deleted = screen
                .delete(client, &id, confirmer(yes).as_ref(), notices)
                .map_err(|e| e.to_string())?;
            if !deleted {
                println!("Cancelled");
            }
            Ok(())
        }
    }
}

/// Split off `--env-file` and load it (or `./.env`); the remaining arguments form the command.
fn configure_env_from_cli() -> Result<(Option<LoadedEnvFile>, Vec<String>), String> {
    let mut args = std::env::args_os();
    args.next(); // skip program name

    let mut env_file: Option<PathBuf> = None;
    let mut rest = Vec::new();

    while let Some(arg) = args.next() {
        match arg.to_str() {
            Some("--env-file") => {
                if env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                let value = args
                    .next()
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?;
                env_file = Some(PathBuf::from(value));
            }
            Some(s) if s.starts_with("--env-file=") => {
                if env_file.is_some() {
                    return Err("`--env-file` provided more than once".to_string());
                }
                let path_str = &s["--env-file=".len()..];
                if path_str.is_empty() {
                    return Err("`--env-file` requires a path argument".to_string());
                }
                env_file = Some(PathBuf::from(path_str));
            }
            Some("--") => {
                for arg in args.by_ref() {
                    rest.push(arg.into_string().map_err(|_| "argument contains invalid UTF-8".to_string())?);
                }
            }
            Some(other) => rest.push(other.to_string()),
            None => return Err("argument contains invalid UTF-8".to_string()),
        }
    }

    let loaded = if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        let applied = load_env_file(&path)?;
        Some(LoadedEnvFile {
            path,
            explicit: true,
            applied,
        })
    } else {
        let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
        let default_path = cwd.join(".env");
        if default_path.is_file() {
            let applied = load_env_file(&default_path)?;
            Some(LoadedEnvFile {
                path: default_path,
                explicit: false,
                applied,
            })
        } else {
            None
        }
    };
    Ok((loaded, rest))
}

/// Parse the whole file first so a bad line leaves the environment untouched.
fn load_env_file(path: &Path) -> Result<usize, String> {
    let text = std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    let mut assignments = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if let Some(pair) = parse_env_assignment(line).map_err(|e| format!("{}:{}: {}", path.display(), number + 1, e))? {
            assignments.push(pair);
        }
    }

    let mut applied = 0;
    for (key, value) in assignments {
        // The process environment wins over the file.
        if std::env::var_os(&key).is_some() {
            continue;
        }
        // SAFETY: runs during startup, before any other thread exists.
        unsafe {
            std::env::set_var(key, value);
        }
        applied += 1;
    }
    Ok(applied)
}

fn parse_env_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let without_export = trimmed
        .strip_prefix("export ")
        .map(|s| s.trim_start())
        .unwrap_or(trimmed);

    let (key, value_part) = without_export
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("variable name is empty".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err(format!("variable name {:?} contains whitespace", key));
    }

    Ok(Some((key.to_string(), parse_env_value(value_part)?)))
}

fn parse_env_value(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix('"') {
        parse_quoted(rest, '"', true)
    } else if let Some(rest) = trimmed.strip_prefix('\'') {
        parse_quoted(rest, '\'', false)
    } else {
        let value = trimmed.split('#').next().unwrap_or_default().trim_end();
        Ok(value.to_string())
    }
}

/// Quoted value up to the closing `quote`; only a comment may follow it.
fn parse_quoted(input: &str, quote: char, escapes: bool) -> Result<String, String> {
    let mut result = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if escapes && ch == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| "unterminated escape sequence in quoted value".to_string())?;
            result.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
        } else if ch == quote {
            let remainder = chars.as_str().trim();
            return if remainder.is_empty() || remainder.starts_with('#') {
                Ok(result)
            } else {
                Err(format!("unexpected characters after closing {} quote", quote))
            };
        } else {
            result.push(ch);
        }
    }

    Err(format!("unterminated {}-quoted value", quote))
}

fn main() {
    let (loaded_env, args) = match configure_env_from_cli() {
        Ok(v) => v,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Logging starts after the env file so its RUST_LOG applies.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "--env-file" } else { "./.env" };
        info!("{} variables taken from {} ({})", info.applied, info.path.display(), origin);
    }

    let command = match cli::parse(args) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{}", usage);
            std::process::exit(2);
        }
    };

    info!(
        "homiease-panel {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_assignments() {
        assert_eq!(parse_env_assignment("# comment").unwrap(), None);
        assert_eq!(
            parse_env_assignment("export HOMIEASE_API_URL=http://hub.local:5050/api # lan").unwrap(),
            Some(("HOMIEASE_API_URL".to_string(), "http://hub.local:5050/api".to_string()))
        );
        assert_eq!(
            parse_env_assignment(r#"RUST_LOG="homiease_panel=debug\tx""#).unwrap(),
            Some(("RUST_LOG".to_string(), "homiease_panel=debug\tx".to_string()))
        );
        assert_eq!(
            parse_env_assignment("WEATHER_ENABLED='false' # off").unwrap(),
            Some(("WEATHER_ENABLED".to_string(), "false".to_string()))
        );
        assert_eq!(parse_env_assignment("EMPTY=").unwrap(), Some(("EMPTY".to_string(), String::new())));
    }

    #[test]
    fn env_assignment_errors() {
        assert!(parse_env_assignment("NO_EQUALS").is_err());
        assert!(parse_env_assignment("=value").is_err());
        assert!(parse_env_assignment("BAD KEY=1").is_err());
        assert!(parse_env_assignment("OPEN=\"unterminated").is_err());
        assert!(parse_env_assignment("TRAILING='x' y").is_err());
    }

    #[test]
    fn env_file_with_bad_line_applies_nothing() {
        let path = std::env::temp_dir().join(format!("homiease-panel-{}.env", std::process::id()));
        std::fs::write(&path, "HOMIEASE_PANEL_TEST_FIRST=1\nBROKEN\n").unwrap();

        let err = load_env_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(err.ends_with(":2: missing '=' in assignment"), "{}", err);
        assert!(std::env::var_os("HOMIEASE_PANEL_TEST_FIRST").is_none());
    }
}
