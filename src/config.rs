use std::path::PathBuf;

const APP_DIR: &str = "promptbox";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn resolve(data_dir: Option<PathBuf>, export_dir: Option<PathBuf>) -> Self {
        Config {
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            export_dir: export_dir.unwrap_or_else(default_export_dir),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("promptbox.log")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
}

fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
