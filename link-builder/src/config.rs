use envconfig::Envconfig;
use std::{net::SocketAddr, str::FromStr};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3002")]
    pub address: SocketAddr,

    // http(s) export link or a local path
    #[envconfig(default = "campaigns.csv")]
    pub campaign_sheet_csv: String,

    #[envconfig(default = "publishers.csv")]
    pub publisher_sheet_csv: String,

    // empty disables the creative overlay
    #[envconfig(default = "")]
    pub creative_sheet_csv: String,

    // empty keeps stats in memory only
    #[envconfig(default = "link_stats.csv")]
    pub stats_file: String,

    #[envconfig(default = "5000")]
    pub max_pids_per_request: usize,

    #[envconfig(default = "false")]
    pub enable_metrics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::init_from_env().expect("Failed to load config from env or defaults")
    }
}

impl Config {
    pub fn default_for_test() -> Self {
        Config {
            address: SocketAddr::from_str("127.0.0.1:0").unwrap(),
            campaign_sheet_csv: "campaigns.csv".to_string(),
            publisher_sheet_csv: "publishers.csv".to_string(),
            creative_sheet_csv: "".to_string(),
            stats_file: "".to_string(),
            max_pids_per_request: 5000,
            enable_metrics: false,
        }
    }
}
