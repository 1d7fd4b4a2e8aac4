//! Command-line interface for gedder-alarm.
//!
//! This binary manages alarms on a running daemon via the HTTP API.

use std::env;

use anyhow::{Result, bail};
use time::OffsetDateTime;

use gedder_alarm::api_client::{
    self,
    types::{AlarmPatchRequest, AlarmState, PlaceState},
};

fn usage() -> ! {
    eprintln!("Usage: gedder-cli <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  health                          Check that the daemon is up");
    eprintln!("  list                            List alarms");
    eprintln!("  show <id>                       Show one alarm");
    eprintln!("  create <alarm HH:MM> <arrival HH:MM>");
    eprintln!("                                  Create a disarmed alarm");
    eprintln!("  route <id> <from-place-id> <from-address> <to-place-id> <to-address>");
    eprintln!("                                  Set the route smart mode polls");
    eprintln!("  mode <id> <travel> [transit]    Set travel (and transit) mode");
    eprintln!("  repeat <id> <mask>              Set repeat days, Monday = 1");
    eprintln!("  prep <id> <minutes>             Set prep time");
    eprintln!("  arm <id> | disarm <id>          Turn the alarm on or off");
    eprintln!("  smart <id> on|off               Turn smart mode on or off");
    eprintln!("  snooze <id>                     Ring again in ten minutes");
    eprintln!("  delete <id>                     Delete an alarm");
    eprintln!("  schedule                        Show armed callbacks");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GEDDER_API_URL    API base URL (default: {})", api_client::DEFAULT_API_URL);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
    }

    let command = &args[1];
    let rest: Vec<&str> = args[2..].iter().map(String::as_str).collect();

    match (command.as_str(), rest.as_slice()) {
        ("health", []) => cmd_health().await?,
        ("list", []) => cmd_list().await?,
        ("show", [id]) => cmd_show(id).await?,
        ("create", [alarm, arrival]) => cmd_create(alarm, arrival).await?,
        ("route", [id, from_id, from_address, to_id, to_address]) => {
            let req = AlarmPatchRequest {
                origin: Some(PlaceState {
                    id: from_id.to_string(),
                    address: from_address.to_string(),
                }),
                destination: Some(PlaceState {
                    id: to_id.to_string(),
                    address: to_address.to_string(),
                }),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("mode", [id, travel, transit @ ..]) if transit.len() <= 1 => {
            let req = AlarmPatchRequest {
                travel_mode: Some(travel.to_string()),
                transit_mode: transit.first().map(|t| t.to_string()),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("repeat", [id, mask]) => {
            let req = AlarmPatchRequest {
                repeat_days: Some(mask.parse()?),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("prep", [id, minutes]) => {
            let req = AlarmPatchRequest {
                prep_minutes: Some(minutes.parse()?),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("arm" | "disarm", [id]) => {
            let req = AlarmPatchRequest {
                alarm_armed: Some(command == "arm"),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("smart", [id, onoff]) => {
            let on = match *onoff {
                "on" => true,
                "off" => false,
                other => bail!("expected on or off, got {other}"),
            };
            let req = AlarmPatchRequest {
                smart_armed: Some(on),
                ..AlarmPatchRequest::default()
            };
            cmd_patch(id, req).await?
        }
        ("snooze", [id]) => cmd_snooze(id).await?,
        ("delete", [id]) => cmd_delete(id).await?,
        ("schedule", []) => cmd_schedule().await?,
        _ => {
            eprintln!("Unknown command or wrong arguments: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build an API client, honoring GEDDER_API_URL if set.
fn make_client() -> api_client::Client {
    match env::var("GEDDER_API_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

fn format_instant(millis: i64) -> String {
    match OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000) {
        Ok(at) => {
            let at = at.to_offset(time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC));
            format!(
                "{}-{:02}-{:02} {:02}:{:02}",
                at.year(),
                u8::from(at.month()),
                at.day(),
                at.hour(),
                at.minute()
            )
        }
        Err(_) => format!("{millis} ms"),
    }
}

fn print_alarm(alarm: &AlarmState) {
    let flags = match (alarm.alarm_armed, alarm.smart_armed) {
        (true, true) => "armed, smart",
        (true, false) => "armed",
        _ => "off",
    };
    println!("{}  [{}]", alarm.id, flags);
    println!("  Alarm:   {} ({})", alarm.alarm_time, format_instant(alarm.alarm_at));
    println!("  Arrive:  {} ({})", alarm.arrival_time, format_instant(alarm.arrival_at));
    println!("  Repeats: {}", alarm.repeats);
    println!("  Prep:    {} min", alarm.prep_minutes);
    if alarm.travel_mode == "transit" {
        println!("  Mode:    transit ({})", alarm.transit_mode);
    } else {
        println!("  Mode:    {}", alarm.travel_mode);
    }
    if !alarm.origin.address.is_empty() || !alarm.destination.address.is_empty() {
        println!(
            "  Route:   {} -> {}",
            alarm.origin.address, alarm.destination.address
        );
    }
}

async fn cmd_health() -> Result<()> {
    let client = make_client();
    println!("{}", client.health().await?);
    Ok(())
}

async fn cmd_list() -> Result<()> {
    let client = make_client();
    let alarms = client.list_alarms().await?;
    if alarms.is_empty() {
        println!("No alarms");
    }
    for alarm in &alarms {
        print_alarm(alarm);
    }
    Ok(())
}

async fn cmd_show(id: &str) -> Result<()> {
    let client = make_client();
    print_alarm(&client.get_alarm(id).await?);
    Ok(())
}

async fn cmd_create(alarm: &str, arrival: &str) -> Result<()> {
    let client = make_client();
    let req = AlarmPatchRequest {
        alarm_time: Some(alarm.to_string()),
        arrival_time: Some(arrival.to_string()),
        ..AlarmPatchRequest::default()
    };
    print_alarm(&client.create_alarm(&req).await?);
    Ok(())
}

async fn cmd_patch(id: &str, req: AlarmPatchRequest) -> Result<()> {
    let client = make_client();
    print_alarm(&client.patch_alarm(id, &req).await?);
    Ok(())
}

async fn cmd_snooze(id: &str) -> Result<()> {
    let client = make_client();
    let snoozed = client.snooze(id).await?;
    println!("Snoozed until {}", format_instant(snoozed.until));
    Ok(())
}

async fn cmd_delete(id: &str) -> Result<()> {
    let client = make_client();
    client.delete_alarm(id).await?;
    println!("Deleted {}", id);
    Ok(())
}

async fn cmd_schedule() -> Result<()> {
    let client = make_client();
    let schedule = client.schedule().await?;
    if schedule.is_empty() {
        println!("Nothing armed");
    }
    for callback in &schedule {
        println!(
            "  {:>10}/{:<5}  {}",
            callback.request_code,
            callback.kind,
            format_instant(callback.at)
        );
    }
    Ok(())
}
