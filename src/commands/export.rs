//! Export command: on-demand cookie export.

use anyhow::Result;
use cookie_backup::settings::load_settings;
use cookie_backup::{
    BackgroundMessage, DispatchResult, ExportOutcome, Settings, SkipReason, WILDCARD_SITE,
};
use tracing::debug;

use crate::ProcessExit;
use crate::app::context::{AppContext, PASSWORD_ENV, env_string};
use crate::cli::ExportArgs;

pub async fn run_export_command(ctx: &AppContext, args: &ExportArgs) -> Result<ProcessExit> {
    let settings = load_settings(ctx.settings_store().as_ref()).await?;
    let message = build_instant_export(args, &settings, env_string(PASSWORD_ENV));
    debug!(?message, "Dispatching instant export");

    let (service, _fires) = ctx.build_service();
    let DispatchResult::Exported(outcome) = service.dispatch(message).await? else {
        return Ok(ProcessExit::Success);
    };

    match outcome {
        ExportOutcome::Delivered {
            filename,
            encrypted,
        } => {
            let kind = if encrypted { "Encrypted export" } else { "Export" };
            println!(
                "{kind} saved to {}",
                ctx.downloads_dir.join(filename).display()
            );
            Ok(ProcessExit::Success)
        }
        ExportOutcome::Skipped(reason) => {
            println!("Export skipped: {}", skip_text(reason));
            Ok(ProcessExit::Success)
        }
        ExportOutcome::Failed { message } => {
            eprintln!("Export failed: {message}");
            Ok(ProcessExit::Failure)
        }
    }
}

/// Builds the instant export message from flags, environment, and settings.
///
/// Sites: `--all`, else `--site` values, else the configured list.
/// Encryption: on with `--encrypt`, a password flag, or the stored setting.
fn build_instant_export(
    args: &ExportArgs,
    settings: &Settings,
    env_password: Option<String>,
) -> BackgroundMessage {
    let sites = if args.all {
        vec![WILDCARD_SITE.to_string()]
    } else if args.sites.is_empty() {
        settings.sites.clone()
    } else {
        args.sites.clone()
    };

    let encrypt = args.encrypt || args.password.is_some() || settings.encrypt;
    let password = if encrypt {
        args.password
            .clone()
            .or(env_password)
            .or_else(|| Some(settings.password.clone()).filter(|pw| !pw.is_empty()))
    } else {
        None
    };

    BackgroundMessage::InstantExport {
        sites,
        password,
        encrypt: Some(encrypt),
    }
}

fn skip_text(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoSites => "no sites selected or configured",
        SkipReason::MissingPassword => "encryption is enabled but no password was given",
        SkipReason::NoCookies => "no cookies found for the selected sites",
    }
}
