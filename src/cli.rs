//! Hand-parsed subcommands.

use homiease_panel::models::homiease::{Brightness, DeviceCategory, DeviceId, RuleAction, RuleId, Shortcut};
use homiease_panel::nav::Route;

pub const USAGE: &str = "\
usage: homiease-panel [--env-file <path>] <command>

commands:
  login <username> [<password>]
  signup <username> <email> [<password>]
  logout
  menu
  go <menu entry>
  home [--follow]
  devices [--room <room>] [--search <text>]
  add-device <name> --category <lamps|thermostats|acs|cameras> [--room <room>]
  lights [--room <room>] [--search <text>]
  light on|off <id>
  light brightness <id> <0-100>
  light delete <id> [--yes]
  add-light <name> [--room <room>]
  master-off
  automations
  automation add <name> [--time HH:MM] [--action turn_on|turn_off] [--device <id>]...
  automation edit <id> [--name <name>] [--time HH:MM] [--action turn_on|turn_off] [--device <id>]...
  automation toggle <id> on|off
  automation delete <id> [--yes]
  shortcuts
  shortcut toggle <device|automation>:<id>...
  shortcut save [<device|automation>:<id>...]";

#[derive(Debug, Clone, PartialEq)]
pub enum LightAction {
    Switch { id: DeviceId, on: bool },
    Brightness { id: DeviceId, level: Brightness },
    Delete { id: DeviceId, yes: bool },
}

/// Optional rule fields. `devices` are toggled in the form's selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleFields {
    pub name: Option<String>,
    pub time: Option<String>,
    pub action: Option<RuleAction>,
    pub devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleCommand {
    Add(RuleFields),
    Edit { id: RuleId, fields: RuleFields },
    Toggle { id: RuleId, active: bool },
    Delete { id: RuleId, yes: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShortcutCommand {
    Toggle(Vec<Shortcut>),
    Save(Vec<Shortcut>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { username: String, password: Option<String> },
    Signup { username: String, email: String, password: Option<String> },
    Logout,
    Menu,
    Go(String),
    Home { follow: bool },
    Devices { room: Option<String>, search: Option<String> },
    AddDevice { name: String, category: DeviceCategory, room: Option<String> },
    Lights { room: Option<String>, search: Option<String> },
    Light(LightAction),
    AddLight { name: String, room: Option<String> },
    MasterOff,
    Automations,
    Automation(RuleCommand),
    Shortcuts,
    Shortcut(ShortcutCommand),
}

impl Command {
    /// Screen the command acts on, for the session guard. `None` runs unguarded.
    pub fn route(&self) -> Option<Route> {
        match self {
            Command::Login { .. } => Some(Route::Login),
            Command::Signup { .. } => Some(Route::Signup),
            Command::Logout | Command::Menu | Command::Go(_) => None,
            Command::Home { .. } | Command::MasterOff | Command::Shortcuts | Command::Shortcut(_) => Some(Route::Home),
            Command::Devices { .. } | Command::AddDevice { .. } => Some(Route::AllDevices),
            Command::Lights { .. } | Command::Light(_) | Command::AddLight { .. } => Some(Route::Lighting),
            Command::Automations | Command::Automation(_) => Some(Route::Automations),
        }
    }
}

/// Remove `--flag <value>` (or `--flag=value`) from `args`.
fn take_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>, String> {
    let prefix = format!("{}=", flag);
    let Some(idx) = args.iter().position(|a| a == flag || a.starts_with(&prefix)) else {
        return Ok(None);
    };
    let arg = args.remove(idx);
    let value = match arg.strip_prefix(&prefix) {
        Some(v) => v.to_string(),
        None if idx < args.len() => args.remove(idx),
        None => return Err(format!("`{}` requires a value", flag)),
    };
    if value.is_empty() {
        return Err(format!("`{}` requires a value", flag));
    }
    if args.iter().any(|a| a == flag || a.starts_with(&prefix)) {
        return Err(format!("`{}` provided more than once", flag));
    }
    Ok(Some(value))
}

fn take_values(args: &mut Vec<String>, flag: &str) -> Result<Vec<String>, String> {
    let mut values = Vec::new();
    while let Some(idx) = args.iter().position(|a| a == flag) {
        args.remove(idx);
        if idx >= args.len() {
            return Err(format!("`{}` requires a value", flag));
        }
        values.push(args.remove(idx));
    }
    Ok(values)
}

fn take_switch(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

/// Exactly `min..=max` positionals, with no leftover flags.
fn positionals(args: Vec<String>, min: usize, max: usize, usage: &str) -> Result<Vec<String>, String> {
    if let Some(flag) = args.iter().find(|a| a.starts_with("--")) {
        return Err(format!("unrecognised argument: {}", flag));
    }
    if args.len() < min || args.len() > max {
        return Err(format!("usage: {}", usage));
    }
    Ok(args)
}

fn parse_on_off(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on or off, got {:?}", other)),
    }
}

pub fn parse_shortcut(s: &str) -> Result<Shortcut, String> {
    match s.split_once(':') {
        Some(("device", id)) if !id.is_empty() => Ok(Shortcut::device(id)),
        Some(("automation", id)) if !id.is_empty() => Ok(Shortcut::automation(id)),
        _ => Err(format!("shortcut must look like device:<id> or automation:<id>, got {:?}", s)),
    }
}

fn parse_rule_fields(args: &mut Vec<String>) -> Result<RuleFields, String> {
    let action = take_value(args, "--action")?.map(|a| a.parse::<RuleAction>()).transpose()?;
    Ok(RuleFields {
        name: take_value(args, "--name")?,
        time: take_value(args, "--time")?,
        action,
        devices: take_values(args, "--device")?.iter().map(|d| DeviceId::from(d.as_str())).collect(),
    })
}

pub fn parse(mut args: Vec<String>) -> Result<Command, String> {
    if args.is_empty() {
        return Err(USAGE.to_string());
    }
    let name = args.remove(0);
    let command = match name.as_str() {
        "login" => {
            let mut p = positionals(args, 1, 2, "login <username> [<password>]")?.into_iter();
            Command::Login {
                username: p.next().unwrap_or_default(),
                password: p.next(),
            }
        }
        "signup" => {
            let mut p = positionals(args, 2, 3, "signup <username> <email> [<password>]")?.into_iter();
            Command::Signup {
                username: p.next().unwrap_or_default(),
                email: p.next().unwrap_or_default(),
                password: p.next(),
            }
        }
        "logout" => {
            positionals(args, 0, 0, "logout")?;
            Command::Logout
        }
        "menu" => {
            positionals(args, 0, 0, "menu")?;
            Command::Menu
        }
        "go" => Command::Go(positionals(args, 1, usize::MAX, "go <menu entry>")?.join(" ")),
        "home" => {
            let follow = take_switch(&mut args, "--follow");
            positionals(args, 0, 0, "home [--follow]")?;
            Command::Home { follow }
        }
        "devices" => {
            let room = take_value(&mut args, "--room")?;
            let search = take_value(&mut args, "--search")?;
            positionals(args, 0, 0, "devices [--room <room>] [--search <text>]")?;
            Command::Devices { room, search }
        }
        "add-device" => {
            let category = take_value(&mut args, "--category")?
                .ok_or_else(|| "`--category` is required".to_string())?
                .parse::<DeviceCategory>()?;
            let room = take_value(&mut args, "--room")?;
            let name = positionals(args, 1, usize::MAX, "add-device <name> --category <category>")?.join(" ");
            Command::AddDevice { name, category, room }
        }
        "lights" => {
            let room = take_value(&mut args, "--room")?;
            let search = take_value(&mut args, "--search")?;
            positionals(args, 0, 0, "lights [--room <room>] [--search <text>]")?;
            Command::Lights { room, search }
        }
        "light" => Command::Light(parse_light(args)?),
        "add-light" => {
            let room = take_value(&mut args, "--room")?;
            let name = positionals(args, 1, usize::MAX, "add-light <name> [--room <room>]")?.join(" ");
            Command::AddLight { name, room }
        }
        "master-off" => {
            positionals(args, 0, 0, "master-off")?;
            Command::MasterOff
        }
        "automations" => {
            positionals(args, 0, 0, "automations")?;
            Command::Automations
        }
        "automation" => Command::Automation(parse_automation(args)?),
        "shortcuts" => {
            positionals(args, 0, 0, "shortcuts")?;
            Command::Shortcuts
        }
        "shortcut" => Command::Shortcut(parse_shortcut_command(args)?),
        "help" | "--help" | "-h" => return Err(USAGE.to_string()),
        other => return Err(format!("unknown command: {}\n{}", other, USAGE)),
    };
    Ok(command)
}

fn parse_light(mut args: Vec<String>) -> Result<LightAction, String> {
    let yes = take_switch(&mut args, "--yes");
    let p = positionals(args, 2, 3, "light on|off|brightness|delete <id> ...")?;
    let id = DeviceId::from(p[1].as_str());
    match (p[0].as_str(), p.get(2)) {
        ("on", None) => Ok(LightAction::Switch { id, on: true }),
        ("off", None) => Ok(LightAction::Switch { id, on: false }),
        ("brightness", Some(level)) => Ok(LightAction::Brightness {
            id,
            level: level.parse::<Brightness>()?,
        }),
        ("delete", None) => Ok(LightAction::Delete { id, yes }),
        _ => Err("usage: light on|off <id> | light brightness <id> <0-100> | light delete <id> [--yes]".to_string()),
    }
}

fn parse_automation(mut args: Vec<String>) -> Result<RuleCommand, String> {
    let yes = take_switch(&mut args, "--yes");
    let mut fields = parse_rule_fields(&mut args)?;
    let p = positionals(args, 2, usize::MAX, "automation add|edit|toggle|delete ...")?;
    let (sub, rest) = (p[0].as_str(), &p[1..]);
    match (sub, rest) {
        ("add", name) => {
            fields.name = Some(name.join(" "));
            Ok(RuleCommand::Add(fields))
        }
        ("edit", [id]) => Ok(RuleCommand::Edit {
            id: RuleId::from(id.as_str()),
            fields,
        }),
        ("toggle", [id, state]) => Ok(RuleCommand::Toggle {
            id: RuleId::from(id.as_str()),
            active: parse_on_off(state)?,
        }),
        ("delete", [id]) => Ok(RuleCommand::Delete {
            id: RuleId::from(id.as_str()),
            yes,
        }),
        _ => Err("usage: automation add <name> | edit <id> | toggle <id> on|off | delete <id>".to_string()),
    }
}

fn parse_shortcut_command(args: Vec<String>) -> Result<ShortcutCommand, String> {
    let p = positionals(args, 1, usize::MAX, "shortcut toggle|save <kind>:<id>...")?;
    let list = p[1..].iter().map(|s| parse_shortcut(s)).collect::<Result<Vec<_>, _>>()?;
    match p[0].as_str() {
        "toggle" if !list.is_empty() => Ok(ShortcutCommand::Toggle(list)),
        "save" => Ok(ShortcutCommand::Save(list)),
        _ => Err("usage: shortcut toggle <kind>:<id>... | shortcut save [<kind>:<id>...]".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn parses_light_commands() {
        assert_eq!(
            parse(args("light brightness 2 75")).unwrap(),
            Command::Light(LightAction::Brightness {
                id: DeviceId::from("2"),
                level: Brightness::new(75).unwrap()
            })
        );
        assert_eq!(
            parse(args("light delete 2 --yes")).unwrap(),
            Command::Light(LightAction::Delete { id: DeviceId::from("2"), yes: true })
        );
        assert!(parse(args("light brightness 2 150")).is_err());
        assert!(parse(args("light dim 2")).is_err());
    }

    #[test]
    fn parses_flags_in_any_position() {
        assert_eq!(
            parse(args("lights --search lamp --room=Office")).unwrap(),
            Command::Lights {
                room: Some("Office".into()),
                search: Some("lamp".into())
            }
        );
        assert_eq!(
            parse(args("add-light --room Office Reading Lamp")).unwrap(),
            Command::AddLight {
                name: "Reading Lamp".into(),
                room: Some("Office".into())
            }
        );
        assert!(parse(args("lights --room")).is_err());
        assert!(parse(args("lights --colour red")).is_err());
    }

    #[test]
    fn parses_automation_commands() {
        let cmd = parse(args("automation add Evening Lights --time 19:30 --action turn_off --device 1 --device 2")).unwrap();
        let Command::Automation(RuleCommand::Add(fields)) = cmd else {
            panic!("unexpected {:?}", cmd);
        };
        assert_eq!(fields.name.as_deref(), Some("Evening Lights"));
        assert_eq!(fields.time.as_deref(), Some("19:30"));
        assert_eq!(fields.action, Some(RuleAction::TurnOff));
        assert_eq!(fields.devices, vec![DeviceId::from("1"), DeviceId::from("2")]);

        assert_eq!(
            parse(args("automation toggle r1 off")).unwrap(),
            Command::Automation(RuleCommand::Toggle {
                id: RuleId::from("r1"),
                active: false
            })
        );
    }

    #[test]
    fn parses_shortcuts() {
        assert_eq!(
            parse(args("shortcut toggle device:1 automation:r1")).unwrap(),
            Command::Shortcut(ShortcutCommand::Toggle(vec![Shortcut::device("1"), Shortcut::automation("r1")]))
        );
        assert_eq!(parse(args("shortcut save")).unwrap(), Command::Shortcut(ShortcutCommand::Save(vec![])));
        assert!(parse(args("shortcut toggle")).is_err());
        assert!(parse(args("shortcut toggle scene:1")).is_err());
    }

    #[test]
    fn routes_for_guard() {
        assert_eq!(parse(args("login u p")).unwrap().route(), Some(Route::Login));
        assert_eq!(parse(args("master-off")).unwrap().route(), Some(Route::Home));
        assert_eq!(parse(args("logout")).unwrap().route(), None);
    }
}
