//! Smart button command handlers.

use tabled::Tabled;
use wiser_core::{Hub, SmartButton};

use crate::cli::{ButtonsArgs, ButtonsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ButtonRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Input")]
    input: u32,
    #[tabled(rename = "Job")]
    job: u32,
}

impl From<&SmartButton> for ButtonRow {
    fn from(b: &SmartButton) -> Self {
        Self {
            id: b.id.0,
            label: b.label(),
            address: format!("{:#x}", b.device_addr),
            input: b.input_channel,
            job: b.job,
        }
    }
}

pub async fn handle(hub: &Hub, args: ButtonsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ButtonsCommand::List => {
            let buttons = hub.list_smart_buttons().await?;
            let out = output::render_list(
                &global.output,
                &buttons,
                |b| ButtonRow::from(b),
                |b| b.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
