//! Integration tests for the export pipeline: resolve, collect, encrypt,
//! deliver, and notify.

mod support;

use cookie_backup::delivery::{BACKUP_TAG, INSTANT_EXPORT_TAG};
use cookie_backup::{
    BackgroundMessage, BackupStatus, CookieGroup, DispatchResult, ExportOutcome, ExportRequest,
    MemorySettingsStore, NOT_SET, SettingKey, SettingsPatch, SkipReason, TimerFire, decrypt_data,
};
use support::{Harness, ScriptedCookieStore, sample_cookies};

fn scheduled_settings(sites: &str, location: &str) -> MemorySettingsStore {
    MemorySettingsStore::with_values(
        SettingsPatch::new()
            .with(SettingKey::Interval, "week")
            .with(SettingKey::Sites, sites)
            .with(SettingKey::Location, location)
            .with(SettingKey::LastBackup, "2024-02-01")
            .with(SettingKey::NextBackup, "2024-02-08"),
    )
}

fn instant(sites: &[&str]) -> BackgroundMessage {
    BackgroundMessage::InstantExport {
        sites: sites.iter().map(ToString::to_string).collect(),
        password: None,
        encrypt: None,
    }
}

async fn export_outcome(harness: &Harness, message: BackgroundMessage) -> ExportOutcome {
    match harness.service.dispatch(message).await.unwrap() {
        DispatchResult::Exported(outcome) => outcome,
        other => panic!("expected export, got {other:?}"),
    }
}

#[tokio::test]
async fn test_scheduled_run_delivers_and_updates_status() {
    let harness = Harness::new(
        scheduled_settings("a.com, b.com", "/exports/"),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = harness
        .service
        .handle_alarm(&TimerFire {
            name: "cookieExport".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ExportOutcome::Delivered {
            filename: format!("exports/cookies_{BACKUP_TAG}_2024-03-01.json"),
            encrypted: false,
        }
    );
    let downloads = harness.downloads.recorded();
    assert_eq!(downloads.len(), 1);
    assert!(!downloads[0].save_as);

    let groups: Vec<CookieGroup> = serde_json::from_str(&downloads[0].body).unwrap();
    let domains: Vec<&str> = groups.iter().map(|group| group.domain.as_str()).collect();
    assert_eq!(domains, vec!["a.com", "b.com"]);
    assert!(downloads[0].body.contains("\n  {"), "payload is pretty-printed");

    let status = BackupStatus::from_values(&harness.settings.snapshot());
    assert_eq!(status.last_backup, "2024-03-01");
    assert_eq!(status.next_backup, "2024-03-08");
    assert!(harness.blobs.is_empty());
    assert_eq!(
        harness.notifier.last(),
        Some((
            "Backup Complete".to_string(),
            "Cookies exported successfully to exports".to_string()
        ))
    );
}

#[tokio::test]
async fn test_unrelated_alarm_is_ignored() {
    let harness = Harness::new(
        scheduled_settings("a.com", ""),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = harness
        .service
        .handle_alarm(&TimerFire {
            name: "somethingElse".to_string(),
        })
        .await;

    assert!(outcome.is_none());
    assert_eq!(harness.cookies.query_count(), 0);
    assert!(harness.notifier.titles().is_empty());
}

#[tokio::test]
async fn test_empty_site_list_notifies_once_and_skips_everything() {
    let harness = Harness::new(
        scheduled_settings(" , ", ""),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = harness
        .service
        .orchestrator()
        .run_export(ExportRequest::scheduled())
        .await;

    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::NoSites));
    assert_eq!(harness.cookies.query_count(), 0);
    assert!(harness.downloads.recorded().is_empty());
    assert_eq!(harness.notifier.titles(), vec!["No Sites Specified".to_string()]);
}

#[tokio::test]
async fn test_instant_export_with_only_blank_sites_is_skipped() {
    let harness = Harness::new(
        MemorySettingsStore::new(),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = export_outcome(&harness, instant(&["", "  "])).await;

    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::NoSites));
    assert_eq!(harness.cookies.query_count(), 0);
}

#[tokio::test]
async fn test_instant_single_site_export_prompts_and_keeps_status() {
    let harness = Harness::new(
        scheduled_settings("a.com", "exports"),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = export_outcome(&harness, instant(&["shop.example.com"])).await;

    assert_eq!(
        outcome,
        ExportOutcome::Delivered {
            filename: "cookies_shop_example_com_2024-03-01.json".to_string(),
            encrypted: false,
        }
    );
    assert!(harness.downloads.recorded()[0].save_as);
    let status = BackupStatus::from_values(&harness.settings.snapshot());
    assert_eq!(status.last_backup, "2024-02-01");
    assert_eq!(status.next_backup, "2024-02-08");
    assert_eq!(
        harness.notifier.last().unwrap().1,
        "Cookies exported successfully to shop.example.com"
    );
}

#[tokio::test]
async fn test_instant_wildcard_groups_every_domain_in_first_seen_order() {
    let harness = Harness::new(
        MemorySettingsStore::new(),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = export_outcome(&harness, instant(&["<all>"])).await;

    assert_eq!(
        outcome,
        ExportOutcome::Delivered {
            filename: format!("cookies_{INSTANT_EXPORT_TAG}_2024-03-01.json"),
            encrypted: false,
        }
    );
    assert_eq!(*harness.cookies.queries.lock().unwrap(), vec![None]);
    let groups: Vec<CookieGroup> =
        serde_json::from_str(&harness.downloads.recorded()[0].body).unwrap();
    let domains: Vec<&str> = groups.iter().map(|group| group.domain.as_str()).collect();
    assert_eq!(domains, vec!["a.com", "shop.example.com", "b.com"]);
    assert_eq!(groups[0].cookies.len(), 2);
}

#[tokio::test]
async fn test_failing_domain_is_dropped_and_export_continues() {
    let cookies = ScriptedCookieStore {
        failing_domains: vec!["b.com".to_string()],
        ..ScriptedCookieStore::with_cookies(sample_cookies())
    };
    let harness = Harness::new(MemorySettingsStore::new(), cookies);

    let outcome = export_outcome(&harness, instant(&["a.com", "", "b.com"])).await;

    assert!(matches!(outcome, ExportOutcome::Delivered { .. }));
    assert_eq!(
        *harness.cookies.queries.lock().unwrap(),
        vec![Some("a.com".to_string()), Some("b.com".to_string())]
    );
    let groups: Vec<CookieGroup> =
        serde_json::from_str(&harness.downloads.recorded()[0].body).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].domain, "a.com");
}

#[tokio::test]
async fn test_no_cookies_found_skips_delivery() {
    let harness = Harness::new(
        MemorySettingsStore::new(),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = export_outcome(&harness, instant(&["nothing.test"])).await;

    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::NoCookies));
    assert!(harness.downloads.recorded().is_empty());
    assert_eq!(harness.notifier.titles(), vec!["No Cookies Found".to_string()]);
}

#[tokio::test]
async fn test_encrypted_instant_export_decrypts_to_cookie_json() {
    let harness = Harness::new(
        MemorySettingsStore::new(),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = export_outcome(
        &harness,
        BackgroundMessage::InstantExport {
            sites: vec!["a.com".to_string()],
            password: Some("correct horse".to_string()),
            encrypt: Some(true),
        },
    )
    .await;

    assert!(matches!(
        outcome,
        ExportOutcome::Delivered {
            encrypted: true,
            ..
        }
    ));
    let body = harness.downloads.recorded()[0].body.clone();
    assert!(!body.contains("sid"));
    let plaintext = decrypt_data(&body, "correct horse").unwrap();
    let groups: Vec<CookieGroup> = serde_json::from_str(&plaintext).unwrap();
    assert_eq!(groups[0].domain, "a.com");
    assert!(decrypt_data(&body, "wrong").is_err());
}

#[tokio::test]
async fn test_encryption_without_password_is_skipped() {
    let harness = Harness::new(
        MemorySettingsStore::with_values(
            SettingsPatch::new()
                .with(SettingKey::Sites, "a.com")
                .with(SettingKey::Encrypt, true),
        ),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = harness
        .service
        .orchestrator()
        .run_export(ExportRequest::scheduled())
        .await;

    assert_eq!(outcome, ExportOutcome::Skipped(SkipReason::MissingPassword));
    assert_eq!(harness.cookies.query_count(), 0);
    assert!(harness.downloads.recorded().is_empty());
    assert_eq!(harness.notifier.titles(), vec!["Password Required".to_string()]);
}

#[tokio::test]
async fn test_scheduled_failure_during_collection_leaves_status_untouched() {
    let cookies = ScriptedCookieStore {
        fail_all: true,
        ..ScriptedCookieStore::with_cookies(sample_cookies())
    };
    let harness = Harness::new(scheduled_settings("<all>", ""), cookies);

    let outcome = harness
        .service
        .orchestrator()
        .run_export(ExportRequest::scheduled())
        .await;

    let ExportOutcome::Failed { message } = outcome else {
        panic!("expected failure");
    };
    assert!(message.contains("cookie permission revoked"));
    assert_eq!(
        harness.notifier.sent.lock().unwrap().clone(),
        vec![("Export Failed".to_string(), message)]
    );
    assert!(harness.downloads.recorded().is_empty());
    let status = BackupStatus::from_values(&harness.settings.snapshot());
    assert_eq!(status.last_backup, "2024-02-01");
    assert_eq!(status.next_backup, "2024-02-08");
}

#[tokio::test]
async fn test_failed_download_reports_and_keeps_status() {
    let harness = Harness::new(
        scheduled_settings("a.com", ""),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );
    harness.downloads.fail_next("quota exceeded");

    let outcome = harness
        .service
        .orchestrator()
        .run_export(ExportRequest::scheduled())
        .await;

    assert!(outcome.is_failure());
    assert!(harness.blobs.is_empty());
    assert_eq!(harness.notifier.titles(), vec!["Export Failed".to_string()]);
    let status = BackupStatus::from_values(&harness.settings.snapshot());
    assert_eq!(status.last_backup, "2024-02-01");
}

#[tokio::test]
async fn test_scheduled_run_with_interval_off_records_disabled_next_backup() {
    let harness = Harness::new(
        MemorySettingsStore::with_values(
            SettingsPatch::new()
                .with(SettingKey::Interval, "off")
                .with(SettingKey::Sites, "a.com"),
        ),
        ScriptedCookieStore::with_cookies(sample_cookies()),
    );

    let outcome = harness
        .service
        .orchestrator()
        .run_export(ExportRequest::scheduled())
        .await;

    assert!(matches!(outcome, ExportOutcome::Delivered { .. }));
    let status = BackupStatus::from_values(&harness.settings.snapshot());
    assert_eq!(status.last_backup, "2024-03-01");
    assert_eq!(status.next_backup, NOT_SET);
    assert_eq!(
        harness.notifier.last().unwrap().1,
        "Cookies exported successfully to default location"
    );
}
