//! Status command: the backup dashboard.

use anyhow::Result;
use cookie_backup::settings::{load_settings, load_status};

use crate::app::context::AppContext;

const SITES_PREVIEW_CHARS: usize = 50;

pub async fn run_status_command(ctx: &AppContext) -> Result<()> {
    let store = ctx.settings_store();
    let settings = load_settings(store.as_ref()).await?;
    let status = load_status(store.as_ref()).await?;

    let location = if settings.location.is_empty() {
        "Default Downloads Folder".to_string()
    } else {
        settings.location.clone()
    };
    println!("Location:    {location}");
    println!("Sites:       {}", sites_preview(&settings.sites));
    println!(
        "Encryption:  {}",
        if settings.encrypt { "Yes" } else { "No" }
    );
    println!("Interval:    {}", settings.interval);
    println!("Last backup: {}", status.last_backup);
    println!("Next backup: {}", status.next_backup);
    Ok(())
}

fn sites_preview(sites: &[String]) -> String {
    if sites.is_empty() {
        return "None".to_string();
    }
    let joined = sites.join(",");
    if joined.chars().count() > SITES_PREVIEW_CHARS {
        let preview: String = joined.chars().take(SITES_PREVIEW_CHARS).collect();
        format!("{preview}...")
    } else {
        joined
    }
}
