use crate::{AppConfig, RDataCmpError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "rdatacmp.toml";
const PLUGIN_DIR_NAME: &str = "plugins";

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AppConfig,
    pub path: PathBuf,
    pub exists: bool,
    pub portable: bool,
}

pub fn load_config(prefer_portable: bool) -> crate::Result<LoadedConfig> {
    let (path, portable) = resolve_config_path(prefer_portable)?;
    load_config_from(path, portable)
}

pub fn load_config_from(path: PathBuf, portable: bool) -> crate::Result<LoadedConfig> {
    let exists = path.exists();

    let mut config = if exists {
        let data = fs::read_to_string(&path)?;
        toml::from_str(&data).map_err(|e| RDataCmpError::Serialization(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.portable_mode = portable;

    Ok(LoadedConfig {
        config,
        path,
        exists,
        portable,
    })
}

pub fn save_config(path: &Path, config: &AppConfig) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| RDataCmpError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

/// Directory scanned for plugin manifests when the config does not name one
pub fn default_plugin_dir(portable: bool, config_path: &Path) -> crate::Result<PathBuf> {
    if portable {
        let base = config_path
            .parent()
            .map(|path| path.to_path_buf())
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        return Ok(base.join(PLUGIN_DIR_NAME));
    }

    let dirs = ProjectDirs::from("", "aecs4u", "rdatacmp")
        .ok_or_else(|| RDataCmpError::Config("Unable to determine config directory".to_string()))?;
    Ok(dirs.data_dir().join(PLUGIN_DIR_NAME))
}

fn resolve_config_path(prefer_portable: bool) -> crate::Result<(PathBuf, bool)> {
    if let Some(portable_path) = portable_config_path() {
        if prefer_portable || portable_path.exists() {
            return Ok((portable_path, true));
        }
    }

    let dirs = ProjectDirs::from("", "aecs4u", "rdatacmp")
        .ok_or_else(|| RDataCmpError::Config("Unable to determine config directory".to_string()))?;
    Ok((dirs.config_dir().join(CONFIG_FILE_NAME), false))
}

fn portable_config_path() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
}
