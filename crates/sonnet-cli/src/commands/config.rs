use std::env;

use sonnet_core::util::{is_http_url, normalize_text_option};
use sonnet_core::{HousekeepingConfig, RemoteConfig};

use crate::cli::ConfigCommands;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Values passed to `config init`; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub table: Option<String>,
    pub owner_id: Option<String>,
    pub log_retention_days: Option<u64>,
    pub housekeeping_interval_secs: Option<u64>,
}

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            table,
            owner_id,
            log_retention_days,
            housekeeping_interval_secs,
            no_activate,
        } => run_config_init(
            global_profile,
            ProfileUpdate {
                supabase_url,
                supabase_anon_key,
                table,
                owner_id,
                log_retention_days,
                housekeeping_interval_secs,
            },
            no_activate,
        ),
        ConfigCommands::Show => run_config_show(global_profile),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let profile = config.profile_mut_or_default(&profile_name);
    apply_profile_update(profile, update)?;
    let missing = missing_fields(profile);

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    if missing.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Set SONNET_ACCESS_TOKEN and run `sonnet sync`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing.join(", ")
        );
    }

    Ok(())
}

fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let settings = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .resolve_with(|key| env::var(key).ok());

    let show = |value: Option<&str>| value.unwrap_or("(unset)").to_string();
    println!("profile           {profile_name}");
    println!("supabase_url      {}", show(settings.supabase_url.as_deref()));
    println!(
        "supabase_anon_key {}",
        show(settings.supabase_anon_key.as_deref().map(redact).as_deref())
    );
    println!("table             {}", show(settings.table.as_deref()));
    println!("owner_id          {}", show(settings.owner_id.as_deref()));
    println!(
        "log_retention     {} day(s), pruned every {}s",
        settings.housekeeping.retention_days, settings.housekeeping.interval_secs
    );
    println!(
        "access_token      {}",
        if settings.access_token.is_some() {
            "(set)"
        } else {
            "(unset)"
        }
    );
    Ok(())
}

/// Merge explicit values into `profile` and validate the result
pub fn apply_profile_update(
    profile: &mut CliProfile,
    update: ProfileUpdate,
) -> Result<(), CliError> {
    if let Some(value) = normalize_text_option(update.supabase_url) {
        profile.supabase_url = Some(value);
    }
    if let Some(value) = normalize_text_option(update.supabase_anon_key) {
        profile.supabase_anon_key = Some(value);
    }
    if let Some(value) = normalize_text_option(update.table) {
        profile.table = Some(value);
    }
    if let Some(value) = normalize_text_option(update.owner_id) {
        profile.owner_id = Some(value);
    }
    if update.log_retention_days.is_some() || update.housekeeping_interval_secs.is_some() {
        let stored = profile.housekeeping.unwrap_or_default();
        let housekeeping = HousekeepingConfig {
            retention_days: update.log_retention_days.unwrap_or(stored.retention_days),
            interval_secs: update
                .housekeeping_interval_secs
                .unwrap_or(stored.interval_secs),
        }
        .validate()
        .map_err(|error| CliError::Config(error.to_string()))?;
        profile.housekeeping = Some(housekeeping);
    }

    if let Some(url) = normalize_text_option(profile.supabase_url.clone()) {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    if let (Some(url), Some(anon_key)) = (&profile.supabase_url, &profile.supabase_anon_key) {
        let mut remote = RemoteConfig::new(url.clone(), anon_key.clone());
        if let Some(table) = &profile.table {
            remote.table.clone_from(table);
        }
        let remote = remote
            .validate()
            .map_err(|error| CliError::Config(error.to_string()))?;
        profile.supabase_url = Some(remote.url);
    }
    Ok(())
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if normalize_text_option(profile.supabase_url.clone()).is_none() {
        missing.push("supabase_url");
    }
    if normalize_text_option(profile.supabase_anon_key.clone()).is_none() {
        missing.push("supabase_anon_key");
    }
    if normalize_text_option(profile.owner_id.clone()).is_none() {
        missing.push("owner_id");
    }
    missing
}

fn redact(value: &str) -> String {
    let prefix = value.chars().take(6).collect::<String>();
    format!("{prefix}...")
}
