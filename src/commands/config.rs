//! Config command handlers: show and update settings.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use cookie_backup::schedule::next_backup_date_from;
use cookie_backup::settings::{load_settings, normalize_location, parse_site_list};
use cookie_backup::{
    BackgroundMessage, Clock, DispatchResult, Interval, ScheduleOutcome, Settings, SettingsStore,
    SystemClock,
};
use tracing::info;

use crate::app::context::{AppContext, COOKIES_FILE_ENV};
use crate::cli::{ConfigSetArgs, IntervalArg};

pub async fn run_config_show_command(ctx: &AppContext) -> Result<()> {
    let settings = load_settings(ctx.settings_store().as_ref()).await?;

    println!("config_path = {}", ctx.settings_path().display());
    println!("downloads_dir = {}", ctx.downloads_dir.display());
    println!(
        "cookies_file = {}",
        ctx.cookies_file.as_ref().map_or_else(
            || format!("<unset> (use --cookies or {COOKIES_FILE_ENV})"),
            |path| path.display().to_string()
        )
    );
    println!("interval = {}", settings.interval.selector());
    if let Some(days) = settings.interval.custom_days() {
        println!("custom_days = {days}");
    }
    println!("sites = {}", settings.sites.join(","));
    println!("location = {}", settings.location);
    println!("encrypt = {}", settings.encrypt);
    println!(
        "password = {}",
        if settings.password.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        }
    );
    Ok(())
}

pub async fn run_config_set_command(ctx: &AppContext, args: &ConfigSetArgs) -> Result<()> {
    if args.is_empty() {
        println!("No changes detected to save.");
        return Ok(());
    }

    let store = ctx.settings_store();
    let current = load_settings(store.as_ref()).await?;
    let updated = apply_changes(&current, args, SystemClock.today())?;
    if updated == current {
        println!("No changes detected to save.");
        return Ok(());
    }
    store.set(updated.to_patch()).await?;
    info!("Settings saved");

    let (service, _fires) = ctx.build_service();
    match service.dispatch(BackgroundMessage::UpdateSchedule).await? {
        DispatchResult::Scheduled(ScheduleOutcome::Armed {
            interval,
            next_backup,
            ..
        }) => println!("Settings saved. Exports run every {interval}; next backup {next_backup}."),
        DispatchResult::Scheduled(ScheduleOutcome::Disabled) => {
            println!("Settings saved. Scheduled exports are off.");
        }
        DispatchResult::Exported(_) => {}
    }
    Ok(())
}

/// Merges CLI changes into the current settings, validating the result.
fn apply_changes(current: &Settings, args: &ConfigSetArgs, today: NaiveDate) -> Result<Settings> {
    let mut updated = current.clone();

    let selector = args
        .interval
        .map_or(current.interval.selector(), IntervalArg::selector);
    updated.interval = if selector == "custom" {
        let days = args
            .custom_days
            .or_else(|| current.interval.custom_days().map(i64::from));
        let Some(days) = days.filter(|days| *days >= 1) else {
            bail!("Please enter a valid number of days (--custom-days) for a custom interval.");
        };
        let interval = Interval::custom(days);
        if next_backup_date_from(interval, today).is_none() {
            bail!("--custom-days {days} puts the next backup beyond the supported calendar range.");
        }
        interval
    } else {
        if args.custom_days.is_some() {
            bail!("--custom-days only applies with --interval custom");
        }
        Interval::parse(selector, None)?
    };

    if let Some(sites) = &args.sites {
        updated.sites = parse_site_list(sites);
    }
    if let Some(location) = &args.location {
        updated.location = normalize_location(location);
    }
    if let Some(encrypt) = args.encrypt {
        updated.encrypt = encrypt;
    }
    if let Some(password) = &args.password {
        updated.password.clone_from(password);
    }
    if !updated.encrypt {
        updated.password.clear();
    }
    if updated.validate().is_err() {
        bail!("Please provide a password for encryption (--password).");
    }
    Ok(updated)
}
