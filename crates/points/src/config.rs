use serde::Deserialize;

/// Rule ids used by the built-in triggers.
#[derive(Debug, Deserialize, Clone)]
pub struct TriggerRules {
    #[serde(default = "default_daily_login")]
    pub daily_login: String,
    #[serde(default = "default_tool_use")]
    pub tool_use: String,
    #[serde(default = "default_first_client")]
    pub first_client: String,
    #[serde(default = "default_referral")]
    pub referral: String,
}

impl Default for TriggerRules {
    fn default() -> Self {
        Self {
            daily_login: default_daily_login(),
            tool_use: default_tool_use(),
            first_client: default_first_client(),
            referral: default_referral(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PointsConfig {
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// 0 disables expiry of earned points.
    #[serde(default = "default_expiry_months")]
    pub earn_expiry_months: u32,
    /// 0 disables expiry of manual credits.
    #[serde(default = "default_expiry_months")]
    pub adjust_credit_expiry_months: u32,
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
    #[serde(default = "default_max_read_retries")]
    pub max_read_retries: u32,
    #[serde(default = "default_read_retry_backoff_ms")]
    pub read_retry_backoff_ms: u64,
    #[serde(default = "default_recent_entries")]
    pub recent_entries: u64,
    #[serde(default = "default_sweep_cron")]
    pub sweep_cron: String,
    #[serde(default)]
    pub rules: TriggerRules,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            default_timezone: default_timezone(),
            earn_expiry_months: default_expiry_months(),
            adjust_credit_expiry_months: default_expiry_months(),
            max_commit_attempts: default_max_commit_attempts(),
            max_read_retries: default_max_read_retries(),
            read_retry_backoff_ms: default_read_retry_backoff_ms(),
            recent_entries: default_recent_entries(),
            sweep_cron: default_sweep_cron(),
            rules: TriggerRules::default(),
        }
    }
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

fn default_expiry_months() -> u32 {
    12
}

fn default_max_commit_attempts() -> u32 {
    3
}

fn default_max_read_retries() -> u32 {
    2
}

fn default_read_retry_backoff_ms() -> u64 {
    50
}

fn default_recent_entries() -> u64 {
    10
}

fn default_sweep_cron() -> String {
    "0 15 3 * * *".to_owned()
}

fn default_daily_login() -> String {
    "daily_login".to_owned()
}

fn default_tool_use() -> String {
    "tool_use".to_owned()
}

fn default_first_client() -> String {
    "first_client".to_owned()
}

fn default_referral() -> String {
    "referral".to_owned()
}
