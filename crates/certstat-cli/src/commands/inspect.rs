//! `certstat inspect`: offline provisioning profile details.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use certstat_core::folders::{CertificateBundle, DEFAULT_P12_PASSWORD};
use certstat_core::signing::read_provisioning_profile;

use crate::output::{print_key_value, print_section, print_warning};

pub async fn run(folder: &Path, json: bool) -> Result<()> {
    // The password is not needed offline
    let Some(bundle) = CertificateBundle::load(folder, DEFAULT_P12_PASSWORD).await? else {
        bail!(
            "{} needs a .p12 and a .mobileprovision file",
            folder.display()
        );
    };

    let profile = read_provisioning_profile(&bundle.profile_path)
        .await
        .with_context(|| format!("Failed to read {}", bundle.profile_path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let date = |d: Option<chrono::DateTime<Utc>>| d.map_or_else(|| "-".to_string(), |d| d.to_rfc3339());

    print_section(&bundle.name);
    print_key_value("Profile", &profile.name);
    print_key_value("UUID", &profile.uuid);
    print_key_value("Type", profile.profile_type.as_str());
    print_key_value("App ID name", profile.app_id_name.as_deref().unwrap_or("-"));
    print_key_value("Team", profile.team_name.as_deref().unwrap_or("-"));
    print_key_value("Team ID", profile.team_id.as_deref().unwrap_or("-"));
    print_key_value("Bundle ID", profile.bundle_identifier.as_deref().unwrap_or("-"));
    print_key_value("Created", &date(profile.created_at));
    print_key_value("Expires", &date(profile.expires_at));
    print_key_value("Devices", &profile.device_count.to_string());
    print_key_value("p12", &bundle.p12_path.display().to_string());

    if profile.is_expired(Utc::now()) {
        print_warning("Profile has expired");
    }

    Ok(())
}
