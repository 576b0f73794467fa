use ytripper_core::models::settings::AppSettings;

use crate::cli::SettingsAction;
use crate::storage::config;
use crate::AppState;

pub fn handle(state: &AppState, action: SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => {
            let settings = config::load_settings(&state.config_path);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Reset => {
            let defaults = AppSettings::default();
            config::save_settings(&state.config_path, &defaults)?;
            tracing::info!("Settings reset at {}", state.config_path.display());
            println!("{}", serde_json::to_string_pretty(&defaults)?);
        }
        SettingsAction::Path => {
            println!("{}", state.config_path.display());
        }
    }
    Ok(())
}
