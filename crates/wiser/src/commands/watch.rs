//! `wiser watch`: follow push events until Ctrl-C.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use tokio::sync::mpsc;
use wiser_core::{DeviceEvent, DeviceId, Hub};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

/// Every load and smart button the hub knows about.
async fn discover_ids(hub: &Hub) -> Result<Vec<DeviceId>, CliError> {
    let mut ids: Vec<DeviceId> = hub.list_loads().await?.iter().map(|l| l.id).collect();
    ids.extend(hub.list_smart_buttons().await?.iter().map(|b| b.id));
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

fn render_event(format: &OutputFormat, id: DeviceId, event: &DeviceEvent) -> String {
    let now = Utc::now();
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            let value = match event {
                DeviceEvent::Load(state) => serde_json::json!({
                    "time": now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "id": id,
                    "kind": "load",
                    "state": state,
                }),
                DeviceEvent::Button(press) => serde_json::json!({
                    "time": now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "id": id,
                    "kind": "button",
                    "action": press.action,
                }),
            };
            // One event per line, whatever the structured format.
            value.to_string()
        }
        OutputFormat::Table | OutputFormat::Plain => {
            let time = now.format("%H:%M:%S%.3f");
            match event {
                DeviceEvent::Load(state) => {
                    format!("{time}  {id:>5}  load    {}", output::state_summary(state))
                }
                DeviceEvent::Button(press) => format!("{time}  {id:>5}  button  {}", press.action),
            }
        }
    }
}

pub async fn handle(hub: &Hub, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let ids = if args.ids.is_empty() {
        discover_ids(hub).await?
    } else {
        args.ids.into_iter().map(DeviceId).collect()
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<(DeviceId, DeviceEvent)>();
    let subscriptions: Vec<_> = ids
        .iter()
        .map(|&id| {
            let tx = tx.clone();
            hub.subscribe(id, move |event| {
                let _ = tx.send((id, event.clone()));
            })
        })
        .collect();
    drop(tx);

    hub.connect().await?;
    if let Err(err) = hub
        .wait_until_open(Duration::from_secs(args.connect_timeout))
        .await
    {
        hub.shutdown().await;
        return Err(err.into());
    }

    if !global.quiet {
        eprintln!(
            "Watching {} device(s) on {}. Press Ctrl-C to stop.",
            ids.len(),
            hub.config().host
        );
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = rx.recv() => {
                let Some((id, event)) = received else { break };
                output::print_output(&render_event(&global.output, id, &event), global.quiet);
            }
        }
    }

    for sub in subscriptions {
        hub.unsubscribe(sub);
    }
    hub.shutdown().await;
    Ok(())
}
