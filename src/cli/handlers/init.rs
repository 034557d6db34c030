use std::fs;

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CONFIG_FILE_NAME, DATA_DIR_NAME};
use crate::io::file_store::FileStore;

const CONFIG_TOML_TEMPLATE: &str = r##"[profile]
# Every task read or written through this directory belongs to this owner.
owner = "{owner}"

[store]
# Store file, relative to .padd/
file = "tasks.json"

[autosave]
# Quiet period before dossier edits are written
debounce_ms = 800

[log]
# tracing filter used when PADD_LOG is unset, e.g. "padd=debug"
level = "warn"
"##;

/// Owners end up in a quoted TOML string and in every row; keep them plain.
fn validate_owner(owner: &str) -> Result<(), String> {
    if owner.is_empty() {
        return Err("owner cannot be empty".to_string());
    }
    if !owner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    {
        return Err(format!(
            "invalid owner \"{}\": use letters, digits, and - _ . @",
            owner
        ));
    }
    Ok(())
}

fn default_owner() -> String {
    std::env::var("USER")
        .ok()
        .filter(|u| validate_owner(u).is_ok())
        .unwrap_or_else(|| "local".to_string())
}

fn render_config_toml(owner: &str) -> String {
    CONFIG_TOML_TEMPLATE.replace("{owner}", owner)
}

pub fn cmd_init(args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let root = super::start_dir()?;
    let data_dir = root.join(DATA_DIR_NAME);
    let config_path = data_dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !args.force {
        return Err("padd already initialized in ./.padd/ (use --force to overwrite the config)".into());
    }

    // Nested data dirs shadow the outer one
    if let Some(parent) = root.parent()
        && let Ok(outer) = config_io::discover_data_dir(parent)
    {
        eprintln!("Note: enclosing data dir found at {}/", outer.display());
        eprintln!("Creating a new one in ./.padd/");
    }

    let owner = args.owner.unwrap_or_else(default_owner);
    validate_owner(&owner)?;

    fs::create_dir_all(&data_dir)?;
    fs::write(&config_path, render_config_toml(&owner))?;

    let config = config_io::load_config(&data_dir)?;
    let store = FileStore::open(&data_dir, &config_io::store_path(&data_dir, &config));
    if !store.path().exists() {
        store.create_empty()?;
    }

    println!("Initialized padd for owner: {}", owner);
    Ok(())
}
