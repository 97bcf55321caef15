//! Configuration structs

mod bus_config;

pub use bus_config::{
    parse_duration, BusBackend, BusConfig, ConfigError, OverflowStrategy, ReplayLimitSetting,
};
