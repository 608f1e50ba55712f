use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 默认配置文件名（存在时自动加载）
pub const DEFAULT_CONFIG_FILE: &str = "gap_finder.toml";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件 → 环境变量（命令行参数由 main 最后覆盖）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    /// 单次调用最多尝试次数
    pub retry_max_attempts: u32,
    /// 两次尝试之间的等待秒数
    pub retry_backoff_secs: u64,
    // --- PubMed 配置 ---
    pub pubmed_api_key: String,
    /// E-utilities 基础地址（以 / 结尾）
    pub pubmed_api_url: String,
    /// 网页版 PubMed 地址，抓取兜底使用
    pub pubmed_web_url: String,
    /// 每轮检索返回的文献数量
    pub results_per_search: usize,
    pub scrape_delay_min_secs: f64,
    pub scrape_delay_max_secs: f64,
    // --- 迭代与输出 ---
    pub max_iterations: usize,
    /// 结果表路径
    pub csv_path: String,
    /// 导出文件目录
    pub export_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://openrouter.ai/api/v1".to_string(),
            llm_model_name: "deepseek/deepseek-chat-v3.1:free".to_string(),
            llm_max_tokens: 2000,
            llm_temperature: 0.7,
            retry_max_attempts: 3,
            retry_backoff_secs: 2,
            pubmed_api_key: String::new(),
            pubmed_api_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/".to_string(),
            pubmed_web_url: "https://pubmed.ncbi.nlm.nih.gov/".to_string(),
            results_per_search: 10,
            scrape_delay_min_secs: 3.0,
            scrape_delay_max_secs: 6.0,
            max_iterations: 20,
            csv_path: "knowledge_gaps.csv".to_string(),
            export_dir: ".".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 按 默认值 → 配置文件 → 环境变量 的顺序加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("GAP_FINDER_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let base = if explicit.is_some() || Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        base.with_env()
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::TomlParseFailed { source, .. } => ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: String::new(),
            source,
        })
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env(self) -> Result<Self, ConfigError> {
        Ok(Self {
            llm_api_key: env_string("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME", self.llm_model_name),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", self.llm_max_tokens)?,
            llm_temperature: env_parse("LLM_TEMPERATURE", self.llm_temperature)?,
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", self.retry_max_attempts)?,
            retry_backoff_secs: env_parse("RETRY_BACKOFF_SECS", self.retry_backoff_secs)?,
            pubmed_api_key: env_string("PUBMED_API_KEY", self.pubmed_api_key),
            pubmed_api_url: env_string("PUBMED_API_URL", self.pubmed_api_url),
            pubmed_web_url: env_string("PUBMED_WEB_URL", self.pubmed_web_url),
            results_per_search: env_parse("RESULTS_PER_SEARCH", self.results_per_search)?,
            scrape_delay_min_secs: env_parse("SCRAPE_DELAY_MIN_SECS", self.scrape_delay_min_secs)?,
            scrape_delay_max_secs: env_parse("SCRAPE_DELAY_MAX_SECS", self.scrape_delay_max_secs)?,
            max_iterations: env_parse("MAX_ITERATIONS", self.max_iterations)?,
            csv_path: env_string("CSV_PATH", self.csv_path),
            export_dir: env_string("EXPORT_DIR", self.export_dir),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
        })
    }

    /// 检查配置取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(5..=100).contains(&self.max_iterations) {
            return Err(ConfigError::InvalidValue {
                field: "max_iterations",
                reason: format!("{} 不在 5..=100 范围内", self.max_iterations),
            });
        }
        if self.results_per_search == 0 {
            return Err(ConfigError::InvalidValue {
                field: "results_per_search",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.retry_max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_max_attempts",
                reason: "必须大于 0".to_string(),
            });
        }
        if self.scrape_delay_min_secs < 0.0 || self.scrape_delay_min_secs > self.scrape_delay_max_secs {
            return Err(ConfigError::InvalidValue {
                field: "scrape_delay_min_secs",
                reason: format!(
                    "延迟区间 [{}, {}] 不合法",
                    self.scrape_delay_min_secs, self.scrape_delay_max_secs
                ),
            });
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

fn env_string(var_name: &str, current: String) -> String {
    std::env::var(var_name).unwrap_or(current)
}

fn env_parse<T: FromStr>(var_name: &str, current: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value,
            expected_type: std::any::type_name::<T>().to_string(),
        }),
        Err(_) => Ok(current),
    }
}
