use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Bell,
    Telus,
    Rogers,
    Att,
    Tmobile,
    Verizon,
}

impl Carrier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Carrier::Bell => "bell",
            Carrier::Telus => "telus",
            Carrier::Rogers => "rogers",
            Carrier::Att => "att",
            Carrier::Tmobile => "tmobile",
            Carrier::Verizon => "verizon",
        }
    }

    pub fn all() -> &'static [Carrier] {
        &[
            Carrier::Bell,
            Carrier::Telus,
            Carrier::Rogers,
            Carrier::Att,
            Carrier::Tmobile,
            Carrier::Verizon,
        ]
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Carrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bell" => Ok(Carrier::Bell),
            "telus" => Ok(Carrier::Telus),
            "rogers" => Ok(Carrier::Rogers),
            "att" | "at&t" => Ok(Carrier::Att),
            "tmobile" | "t-mobile" => Ok(Carrier::Tmobile),
            "verizon" => Ok(Carrier::Verizon),
            other => Err(format!("Unknown carrier: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperType {
    DailyUsage,
    MonthlyReports,
    PdfInvoice,
}

impl ScraperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScraperType::DailyUsage => "daily_usage",
            ScraperType::MonthlyReports => "monthly_reports",
            ScraperType::PdfInvoice => "pdf_invoice",
        }
    }
}

impl fmt::Display for ScraperType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub carrier: Carrier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    LoggedOut,
    LoggedIn,
    Error,
}

/// Snapshot of the session manager's state machine. `carrier` and
/// `credentials` are `Some` exactly when `status` is `LoggedIn`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub carrier: Option<Carrier>,
    pub credentials: Option<Credentials>,
    pub error_message: Option<String>,
}

impl SessionState {
    pub fn logged_out() -> Self {
        Self {
            status: SessionStatus::LoggedOut,
            carrier: None,
            credentials: None,
            error_message: None,
        }
    }
}

/// Caller-supplied billing cycle record. `slug_map` is the slug ->
/// artifact id table the download mapper keys against; persistence of the
/// artifacts themselves lives outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingCycle {
    pub id: i64,
    pub carrier: Carrier,
    pub label: String,
    #[serde(default)]
    pub slug_map: HashMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub download_dir: PathBuf,
    pub download_timeout_ms: u64,
    pub page_settle_ms: u64,
}

impl ScraperConfig {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            download_dir: PathBuf::from(&config.download_dir),
            download_timeout_ms: config.download_timeout_ms,
            page_settle_ms: config.page_settle_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDownloadInfo {
    pub source_file_name: String,
    pub local_path: PathBuf,
    pub mapped_billing_artifact_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScraperResult {
    pub request_id: String,
    pub success: bool,
    pub files: Vec<FileDownloadInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub scrape_ms: u64,
}

impl ScraperResult {
    pub fn failed(request_id: String, error: String, scrape_ms: u64) -> Self {
        Self {
            request_id,
            success: false,
            files: Vec::new(),
            error: Some(error),
            scrape_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carrier_roundtrip() {
        for carrier in Carrier::all() {
            assert_eq!(carrier.as_str().parse::<Carrier>().unwrap(), *carrier);
        }
        assert_eq!("AT&T".parse::<Carrier>().unwrap(), Carrier::Att);
        assert_eq!("T-Mobile".parse::<Carrier>().unwrap(), Carrier::Tmobile);
        assert!("acme".parse::<Carrier>().is_err());
    }

    #[test]
    fn test_password_not_serialized() {
        let creds = Credentials {
            id: 1,
            username: "billing@example.com".to_string(),
            password: "hunter2".to_string(),
            carrier: Carrier::Bell,
        };
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
