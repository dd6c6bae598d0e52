use anyhow::Result;
use std::fs;
use std::path::PathBuf;

/// Get the system-wide storage directory for Ragdesk
/// Following XDG Base Directory specification on Unix-like systems
/// and proper conventions on other systems
pub fn get_system_storage_dir() -> Result<PathBuf> {
    let base_dir = if cfg!(target_os = "macos") {
        // macOS: ~/.local/share/ragdesk
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".local")
            .join("share")
            .join("ragdesk")
    } else if cfg!(target_os = "windows") {
        // Windows: %APPDATA%/ragdesk
        dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine data directory"))?
            .join("ragdesk")
    } else {
        // Linux and other Unix-like: ~/.local/share/ragdesk or $XDG_DATA_HOME/ragdesk
        if let Ok(xdg_data_home) = std::env::var("XDG_DATA_HOME") {
            PathBuf::from(xdg_data_home).join("ragdesk")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".local")
                .join("share")
                .join("ragdesk")
        }
    };

    // Create directory if it doesn't exist
    if !base_dir.exists() {
        fs::create_dir_all(&base_dir)?;
    }

    Ok(base_dir)
}

/// Get the system config file path
/// Stored directly under ~/.local/share/ragdesk/ on all systems
pub fn get_system_config_path() -> Result<PathBuf> {
    let system_dir = get_system_storage_dir()?;
    Ok(system_dir.join("config.toml"))
}

/// Database directory for the LanceDB chunk store
pub fn get_database_path() -> Result<PathBuf> {
    let system_dir = get_system_storage_dir()?;
    Ok(system_dir.join("chunks"))
}

/// Directory where uploaded corpus documents are kept before indexing
pub fn get_documents_dir() -> Result<PathBuf> {
    let dir = get_system_storage_dir()?.join("docs");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Directory holding the per-category internal documents searched by specialists
pub fn get_internal_docs_dir() -> Result<PathBuf> {
    let dir = get_system_storage_dir()?.join("internal-docs");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Directory for server log files
pub fn get_logs_dir() -> Result<PathBuf> {
    let dir = get_system_storage_dir()?.join("logs");
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}
