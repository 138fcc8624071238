use std::env;
use std::path::PathBuf;

use crate::persist;

pub const DEFAULT_API_URL: &str = "http://localhost:5002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONTACT_PHONE: &str = "(01) 410-1010 anexo 2245";
pub const DEFAULT_WHATSAPP: &str = "943 189 536";
const LOG_FILE: &str = "judstat.log";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub session_dir: PathBuf,
    pub demo: bool,
    pub log_filter: String,
    pub log_file: PathBuf,
    pub survey_url: String,
    pub contact_phone: String,
    pub whatsapp: String,
}

impl AppConfig {
    /// Reads the process environment. `.env` files are loaded by the binaries beforehand.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("JUDSTAT_API_URL")
            .or_else(|| get("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = get("JUDSTAT_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, 120);
        let session_dir = get("JUDSTAT_SESSION_DIR")
            .map(PathBuf::from)
            .or_else(persist::default_session_dir)
            .unwrap_or_else(|| PathBuf::from(".judstat"));
        let demo = get("JUDSTAT_DEMO").is_some_and(|val| {
            matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes")
        });
        let log_filter = get("JUDSTAT_LOG").unwrap_or_else(|| "info".to_string());
        let log_file = get("JUDSTAT_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| session_dir.join(LOG_FILE));

        Self {
            api_url,
            timeout_secs,
            session_dir,
            demo,
            log_filter,
            log_file,
            survey_url: get("JUDSTAT_SURVEY_URL").unwrap_or_default(),
            contact_phone: get("JUDSTAT_CONTACT_PHONE")
                .unwrap_or_else(|| DEFAULT_CONTACT_PHONE.to_string()),
            whatsapp: get("JUDSTAT_WHATSAPP").unwrap_or_else(|| DEFAULT_WHATSAPP.to_string()),
        }
    }

    pub fn session_file(&self) -> PathBuf {
        persist::session_file_in(&self.session_dir)
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
