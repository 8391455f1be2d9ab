use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Menu fetch failed: {url} returned status {status}")]
    FetchStatusError { url: String, status: u16 },

    #[error("Menu page parse error: {message}")]
    MenuParseError { message: String },

    #[error("Authorization error: {message}")]
    AuthError { message: String },

    #[error("Authorization required: {message}")]
    AuthorizationRequired { message: String },

    #[error("Mail delivery failed (status {status}): {message}")]
    MailError { status: u16, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Parsing,
    Authentication,
    Delivery,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl WatchError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn menu_parse(message: impl Into<String>) -> Self {
        Self::MenuParseError {
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::AuthError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::HttpError(_) | Self::FetchStatusError { .. } | Self::UrlError(_) => {
                ErrorCategory::Network
            }
            Self::MenuParseError { .. } | Self::SerializationError(_) => ErrorCategory::Parsing,
            Self::AuthError { .. } | Self::AuthorizationRequired { .. } => {
                ErrorCategory::Authentication
            }
            Self::MailError { .. } => ErrorCategory::Delivery,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Delivery => ErrorSeverity::Medium,
            ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Network | ErrorCategory::Parsing | ErrorCategory::System => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check settings.json: the checklist must be non-empty and the recipient a valid address"
            }
            ErrorCategory::Network => "Check the menu URL and the network connection",
            ErrorCategory::Parsing => {
                "The menu page layout may have changed; inspect the __NEXT_DATA__ script block"
            }
            ErrorCategory::Authentication => {
                "Run again with --authorize to refresh the stored OAuth token"
            }
            ErrorCategory::Delivery => "Check the Gmail API quota and the recipient address",
            ErrorCategory::System => "Check file permissions in the data directory",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::MissingConfigError { field } => format!("設定缺少必要欄位: {}", field),
            Self::InvalidConfigValueError { field, reason, .. } => {
                format!("設定值錯誤 ({}): {}", field, reason)
            }
            Self::ConfigError { message } => format!("設定錯誤: {}", message),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
