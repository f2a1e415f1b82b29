use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    #[error("Target already exists: {0}")]
    TargetAlreadyExists(String),

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Target {target_id} already has a live package: {package_id}")]
    LivePackageExists {
        target_id: String,
        package_id: String,
    },

    #[error("Invalid state transition: {from} -> {to} (allowed: {allowed})")]
    InvalidStateTransition {
        from: String,
        to: String,
        allowed: String,
    },

    #[error("Package {package_id} has no handoff record")]
    NoHandoffRecord { package_id: String },

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Artifact store error: {0}")]
    Artifact(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Project not initialized. Run 'targetdeck init' first.")]
    NotInitialized,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DeckError>;
