//! IO module - run configuration files.

mod config;

pub use config::{
    read_config, SimulationConfig, SystemConfig, ModelConfig, SamplerConfig, TdvpConfig,
    IntegratorConfig, ObservableConfig, OperatorSpec, TermSpec,
};
