use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    pub log_level: String,

    // Browser
    pub webdriver_url: String,
    pub headless: bool,
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub accept_language: String,

    // Download handling
    pub download_dir: String,
    pub download_timeout_ms: u64,

    // 2FA relay
    pub relay_base_url: String,
    pub code_ttl_secs: u64,
    pub twofa_poll_interval_ms: u64,
    pub twofa_wait_timeout_ms: u64,

    // Mailbox poller (email-based 2FA variant)
    pub mailbox_api_url: Option<String>,
    pub mailbox_api_token: Option<String>,
    pub mailbox_poll_interval_ms: u64,

    // Timeouts / retries
    pub page_settle_ms: u64,
    pub login_timeout_ms: u64,
    pub retry_max: u32,
    pub retry_backoff_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        Ok(Config {
            http_addr: env::var("HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8090".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            headless: env::var("HEADLESS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            proxy_url: env::var("PROXY_URL").ok().filter(|s| !s.is_empty()),
            user_agent: env::var("USER_AGENT").unwrap_or_else(|_| {
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36".to_string()
            }),
            accept_language: env::var("ACCEPT_LANGUAGE")
                .unwrap_or_else(|_| "en-CA,en;q=0.9".to_string()),

            download_dir: env::var("DOWNLOAD_DIR")
                .unwrap_or_else(|_| "/data/downloads".to_string()),
            download_timeout_ms: env::var("DOWNLOAD_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60000),

            relay_base_url: env::var("RELAY_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            code_ttl_secs: env::var("CODE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
            twofa_poll_interval_ms: env::var("TWOFA_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4000),
            twofa_wait_timeout_ms: env::var("TWOFA_WAIT_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(180000),

            mailbox_api_url: env::var("MAILBOX_API_URL").ok().filter(|s| !s.is_empty()),
            mailbox_api_token: env::var("MAILBOX_API_TOKEN").ok().filter(|s| !s.is_empty()),
            mailbox_poll_interval_ms: env::var("MAILBOX_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),

            page_settle_ms: env::var("PAGE_SETTLE_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
            login_timeout_ms: env::var("LOGIN_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(45000),
            retry_max: env::var("RETRY_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_backoff_ms: env::var("RETRY_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1500),
        })
    }
}
