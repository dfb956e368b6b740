//! Load command handlers.

use tabled::Tabled;
use wiser_core::{CtrlButton, CtrlEvent, DeviceId, Hub, Load, LoadCommand, LoadState};

use crate::cli::{CtrlButtonArg, CtrlEventArg, GlobalOpts, LoadsArgs, LoadsCommand};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    load_type: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Channel")]
    channel: u32,
    #[tabled(rename = "Room")]
    room: u32,
}

impl From<&Load> for LoadRow {
    fn from(l: &Load) -> Self {
        Self {
            id: l.id.0,
            name: l.display_name(),
            load_type: l.load_type.to_string(),
            device: l.device.clone(),
            channel: l.channel,
            room: l.room,
        }
    }
}

fn state_detail(id: DeviceId, state: &LoadState) -> String {
    let mut lines = vec![format!("ID:       {id}")];
    if let Some(bri) = state.bri() {
        lines.push(format!("Bri:      {bri}"));
    }
    if let Some(level) = state.level() {
        lines.push(format!("Level:    {level}"));
    }
    if let Some(tilt) = state.tilt() {
        lines.push(format!("Tilt:     {tilt}"));
    }
    if let Some(moving) = state.moving() {
        lines.push(format!("Moving:   {moving}"));
    }
    lines.push(format!("State:    {}", output::state_summary(state)));
    lines.join("\n")
}

impl From<CtrlButtonArg> for CtrlButton {
    fn from(b: CtrlButtonArg) -> Self {
        match b {
            CtrlButtonArg::On => Self::On,
            CtrlButtonArg::Off => Self::Off,
            CtrlButtonArg::Up => Self::Up,
            CtrlButtonArg::Down => Self::Down,
            CtrlButtonArg::Toggle => Self::Toggle,
            CtrlButtonArg::Stop => Self::Stop,
        }
    }
}

impl From<CtrlEventArg> for CtrlEvent {
    fn from(e: CtrlEventArg) -> Self {
        match e {
            CtrlEventArg::Click => Self::Click,
            CtrlEventArg::Press => Self::Press,
            CtrlEventArg::Release => Self::Release,
        }
    }
}

/// Parse a `loads set` payload. Only JSON objects are valid states.
fn parse_state(raw: &str) -> Result<LoadState, CliError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    match value {
        serde_json::Value::Object(map) => Ok(LoadState::from(map)),
        other => Err(CliError::Validation {
            field: "state".into(),
            reason: format!("expected a JSON object, got {other}"),
        }),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(hub: &Hub, args: LoadsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        LoadsCommand::List => {
            let loads = hub.list_loads().await?;
            let out = output::render_list(
                &global.output,
                &loads,
                |l| LoadRow::from(l),
                |l| l.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LoadsCommand::State { id } => {
            let id = DeviceId(id);
            let state = hub.get_load_state(id).await?;
            let out = output::render_single(
                &global.output,
                &state,
                |s| state_detail(id, s),
                output::state_summary,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LoadsCommand::Set { id, state } => {
            let id = DeviceId(id);
            let target = parse_state(&state)?;
            let echo = hub.set_load_state(id, &target).await?;
            let out = output::render_single(
                &global.output,
                &echo,
                |s| state_detail(id, s),
                output::state_summary,
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LoadsCommand::Ctrl { id, button, event } => {
            let command = LoadCommand {
                button: button.into(),
                event: event.into(),
            };
            hub.control_load(DeviceId(id), command).await?;
            if !global.quiet {
                eprintln!("Sent {} {} to load {id}", command.button, command.event);
            }
            Ok(())
        }
    }
}
