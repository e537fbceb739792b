//! Decrypt command: recover the JSON from an encrypted export.

use anyhow::{Context, Result, anyhow};
use cookie_backup::decrypt_data;
use tracing::info;

use crate::app::context::{PASSWORD_ENV, env_string, read_to_string};
use crate::cli::DecryptArgs;

pub async fn run_decrypt_command(args: &DecryptArgs) -> Result<()> {
    let password = args
        .password
        .clone()
        .or_else(|| env_string(PASSWORD_ENV))
        .ok_or_else(|| anyhow!("a password is required (--password or {PASSWORD_ENV})"))?;
    let envelope = read_to_string(&args.input)?;

    let plaintext =
        tokio::task::spawn_blocking(move || decrypt_data(&envelope, &password)).await??;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, plaintext.as_bytes())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "Decrypted export written");
        }
        None => println!("{plaintext}"),
    }
    Ok(())
}
