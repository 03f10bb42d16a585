use std::path::Path;

use crate::errors::{Result, SoplinkError};

use super::{IdentityMode, SinkKind, StaticConfig};

/// 环境变量前缀，示例：SOPLINK__SINK__API_KEY
pub const ENV_PREFIX: &str = "SOPLINK";

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：SOPLINK，分隔符：__
    /// 示例：SOPLINK__SERVER__PORT=9999
    ///
    /// `tracking.bot_signatures` may be given as a comma separated env value.
    pub fn load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("tracking.bot_signatures")
                    .try_parsing(true),
            );

        let config: StaticConfig = builder.build()?.try_deserialize()?;

        if Path::new(path).exists() {
            eprintln!("[INFO] Configuration loaded from: {}", path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would only fail at request time.
    pub fn validate(&self) -> Result<()> {
        if self.tracking.effective_window_secs() == 0 {
            return Err(SoplinkError::config("tracking.window_secs must be > 0"));
        }

        if !(-12..=14).contains(&self.tracking.reporting_utc_offset_hours) {
            return Err(SoplinkError::config(format!(
                "tracking.reporting_utc_offset_hours out of range: {}",
                self.tracking.reporting_utc_offset_hours
            )));
        }

        if self.tracking.sink_timeout_secs == 0 {
            return Err(SoplinkError::config("tracking.sink_timeout_secs must be > 0"));
        }

        if self.sink.kind == SinkKind::Coda {
            if self.sink.api_key.is_empty() {
                return Err(SoplinkError::config(
                    "sink.api_key is required for the coda sink",
                ));
            }
            if self.sink.doc_id.is_empty() || self.sink.table_id.is_empty() {
                return Err(SoplinkError::config(
                    "sink.doc_id and sink.table_id are required for the coda sink",
                ));
            }
        }

        if self.lookup.enabled
            && (self.lookup.key_column.is_empty() || self.lookup.target_column.is_empty())
        {
            return Err(SoplinkError::config(
                "lookup.key_column and lookup.target_column are required when lookup is enabled",
            ));
        }

        if self.identity.mode == IdentityMode::Oauth {
            let google = &self.identity.google;
            if google.client_id.is_empty()
                || google.client_secret.is_empty()
                || google.redirect_uri.is_empty()
            {
                return Err(SoplinkError::config(
                    "identity.google.client_id, client_secret and redirect_uri are required in oauth mode",
                ));
            }
            if url::Url::parse(&google.redirect_uri).is_err() {
                return Err(SoplinkError::config(format!(
                    "identity.google.redirect_uri is not a valid URL: {}",
                    google.redirect_uri
                )));
            }
        }

        Ok(())
    }

    /// Doc/table used for lookups, falling back to the sink table.
    pub fn lookup_table(&self) -> (&str, &str) {
        let doc = if self.lookup.doc_id.is_empty() {
            &self.sink.doc_id
        } else {
            &self.lookup.doc_id
        };
        let table = if self.lookup.table_id.is_empty() {
            &self.sink.table_id
        } else {
            &self.lookup.table_id
        };
        (doc, table)
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SoplinkError::Serialization(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}
