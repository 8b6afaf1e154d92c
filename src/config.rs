use crate::calibre::TitleTimeSort;
use crate::error::{AppError, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest accepted page size.
pub const MIN_PAGE_SIZE: u32 = 1;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Browse a Calibre library scoped by language and tag.
#[derive(Parser, Debug, Clone)]
#[command(name = "calibre-filter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "CALIBRE_FILTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Calibre library directory (overrides `calibre.dir`).
    #[arg(long, global = true)]
    pub library: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Write a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },

    /// Print the books source for the given selector IDs.
    Filter {
        /// Language ID.
        #[arg(long)]
        lang: Option<i64>,
        /// Tag ID.
        #[arg(long)]
        tag: Option<i64>,
    },

    /// List books ordered by title.
    Books {
        /// Language and tag scope.
        #[command(flatten)]
        scope: ScopeArgs,
        /// Zero-based page index.
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List the most recent books.
    Recent {
        /// Language and tag scope.
        #[command(flatten)]
        scope: ScopeArgs,
        /// Number of books (defaults to the page size).
        #[arg(short = 'n', long)]
        limit: Option<u32>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Search book titles.
    Search {
        /// Search term.
        term: String,
        /// Language and tag scope.
        #[command(flatten)]
        scope: ScopeArgs,
        /// Zero-based page index.
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show a single book.
    Show {
        /// Book ID.
        id: i64,
        /// Language and tag scope.
        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// List languages.
    Languages {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// List tags.
    Tags {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

impl Command {
    /// Whether the command needs the config file and the library.
    pub fn reads_config(&self) -> bool {
        !matches!(self, Command::Init { .. } | Command::Filter { .. })
    }
}

/// Language and tag scope of a listing.
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Only books in this language (code, e.g. "eng").
    #[arg(long)]
    pub lang: Option<String>,

    /// Hide books carrying this tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Ignore the default scope from the config file.
    #[arg(long, conflicts_with_all = ["lang", "tag"])]
    pub all: bool,
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Calibre library location.
    #[serde(default)]
    pub calibre: CalibreConfig,

    /// Catalog presentation settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Send-To-Kindle settings.
    #[serde(default)]
    pub kindle: KindleConfig,

    /// Mail delivery settings.
    #[serde(default)]
    pub mailer: MailerConfig,
}

/// Calibre library configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalibreConfig {
    /// Directory containing `metadata.db`.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Number of entries per list page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Application name shown in page titles.
    #[serde(default = "default_app_name")]
    pub display_app_name: String,

    /// Field used to order recent books.
    #[serde(default)]
    pub title_time_sort: TitleTimeSort,

    /// Generate relative URLs.
    #[serde(default = "default_true")]
    pub relative_urls: bool,

    /// Require login.
    #[serde(default)]
    pub must_login: bool,

    /// Clip thumbnails instead of scaling them.
    #[serde(default)]
    pub thumb_gen_clipped: bool,

    /// Update book metadata before download.
    #[serde(default)]
    pub metadata_update: bool,

    /// Default language scope (language code).
    #[serde(default)]
    pub language: Option<String>,

    /// Default hidden tag (tag name).
    #[serde(default)]
    pub tag: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            display_app_name: default_app_name(),
            title_time_sort: TitleTimeSort::default(),
            relative_urls: true,
            must_login: false,
            thumb_gen_clipped: false,
            metadata_update: false,
            language: None,
            tag: None,
        }
    }
}

fn default_page_size() -> u32 {
    30
}

fn default_app_name() -> String {
    "BicBucStriim".to_string()
}

fn default_true() -> bool {
    true
}

/// Send-To-Kindle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindleConfig {
    /// Whether Send-To-Kindle is offered.
    #[serde(default)]
    pub enabled: bool,

    /// Sender address for Kindle mails.
    #[serde(default)]
    pub from_email: Option<String>,

    /// Cookie storing the reader's Kindle address.
    #[serde(default = "default_kindle_cookie")]
    pub cookie: String,
}

impl Default for KindleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            from_email: None,
            cookie: default_kindle_cookie(),
        }
    }
}

fn default_kindle_cookie() -> String {
    "kindle_email".to_string()
}

/// Mail transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailerKind {
    /// Local mail() delivery.
    #[default]
    Mail,
    /// Sendmail binary.
    Sendmail,
    /// SMTP server.
    Smtp,
}

/// SMTP transport encryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpEncryption {
    /// Plain connection.
    #[default]
    None,
    /// Implicit TLS.
    Ssl,
    /// STARTTLS.
    Tls,
}

/// Mailer configuration. Only read when `kind` is `smtp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailerConfig {
    /// Mail transport.
    #[serde(default)]
    pub kind: MailerKind,

    /// SMTP server host name.
    #[serde(default)]
    pub smtp_server: Option<String>,

    /// SMTP server port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP user name.
    #[serde(default)]
    pub smtp_user: Option<String>,

    /// SMTP password.
    #[serde(default, skip_serializing)]
    pub smtp_password: Option<String>,

    /// SMTP encryption.
    #[serde(default)]
    pub smtp_encryption: SmtpEncryption,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            kind: MailerKind::default(),
            smtp_server: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            smtp_encryption: SmtpEncryption::default(),
        }
    }
}

fn default_smtp_port() -> u16 {
    25
}

impl Config {
    /// Load configuration from a TOML file, or JSON if the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    /// Parse TOML configuration.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            let message = e.to_string();
            if message.contains("unknown field") {
                AppError::UnknownConfig(message)
            } else {
                AppError::Config(format!("Failed to parse config file: {}", message))
            }
        })
    }

    /// Parse JSON configuration.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            if e.to_string().contains("unknown field") {
                AppError::UnknownConfig(e.to_string())
            } else {
                AppError::Json(e)
            }
        })
    }

    /// Check value ranges and cross-field requirements.
    pub fn validate(&self) -> Result<()> {
        let page_size = self.catalog.page_size;
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::BadPageSize(page_size));
        }

        if self.kindle.enabled {
            match self.kindle.from_email.as_deref() {
                Some(addr) if is_plausible_email(addr) => {}
                other => return Err(AppError::BadKindleFrom(other.map(str::to_string))),
            }
        }

        if self.mailer.kind == MailerKind::Smtp
            && self.mailer.smtp_server.as_deref().is_none_or(str::is_empty)
        {
            return Err(AppError::Config(
                "SMTP mailer requires smtp_server".to_string(),
            ));
        }

        Ok(())
    }

    /// Configured Calibre library directory.
    pub fn calibre_dir(&self) -> Result<&Path> {
        match self.calibre.dir.as_deref() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
            _ => Err(AppError::NoCalibrePath),
        }
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("config.toml"),
            PathBuf::from("calibre-filter.toml"),
            dirs::config_dir()
                .map(|p| p.join("calibre-filter").join("config.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/calibre-filter/config.toml"),
        ];

        candidates
            .into_iter()
            .find(|p| !p.as_os_str().is_empty() && p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# calibre-filter configuration

[calibre]
# dir = "/srv/calibre/Library"

[catalog]
page_size = 30
display_app_name = "BicBucStriim"
# Field for recent books: "timestamp", "pubdate" or "lastmodified"
title_time_sort = "timestamp"
relative_urls = true
must_login = false
thumb_gen_clipped = false
metadata_update = false
# Default scope: only this language, hide this tag
# language = "eng"
# tag = "Adult"

[kindle]
enabled = false
# from_email = "library@example.org"

[mailer]
# "mail", "sendmail" or "smtp"
kind = "mail"
# smtp_server = "smtp.example.org"
smtp_port = 25
# smtp_user = ""
# smtp_password = ""
# "none", "ssl" or "tls"
smtp_encryption = "none"
"#
        .to_string()
    }
}

fn is_plausible_email(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !addr.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}
