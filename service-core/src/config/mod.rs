use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Resolve the `config/` directory of a service.
///
/// Works both when started from the workspace root and from the service
/// directory itself.
pub fn configuration_directory(base_path: &Path, service_dir: &str) -> PathBuf {
    if base_path.ends_with(service_dir) {
        base_path.join("config")
    } else {
        base_path.join(service_dir).join("config")
    }
}

/// Load `config/base.yaml` for a service, overlaid with `APP_` prefixed
/// environment variables (`APP_BACKEND__URL=...`).
pub fn load_layered<T: DeserializeOwned>(service_dir: &str) -> Result<T, config::ConfigError> {
    dotenvy::dotenv().ok();

    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("cannot read current dir: {}", e)))?;
    let directory = configuration_directory(&base_path, service_dir);

    let settings = Config::builder()
        .add_source(File::from(directory.join("base.yaml")).required(true))
        .add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_from_workspace_root() {
        let dir = configuration_directory(Path::new("/srv/app"), "warehouse-frontend");
        assert_eq!(dir, PathBuf::from("/srv/app/warehouse-frontend/config"));
    }

    #[test]
    fn resolves_from_service_dir() {
        let dir = configuration_directory(Path::new("/srv/app/warehouse-frontend"), "warehouse-frontend");
        assert_eq!(dir, PathBuf::from("/srv/app/warehouse-frontend/config"));
    }
}
