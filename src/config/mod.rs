mod config;

pub use config::{
    AnalyticsSettings, OracleSettings, PostgresSettings, Settings, StrategySettings,
};
