use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文献检索错误
    #[error("检索错误: {0}")]
    Search(#[from] SearchError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] GenerationError),
    /// 结果表读写错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 配置值不合法
    #[error("配置项 {field} 不合法: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// 文献检索错误
///
/// 只在单个检索层内部使用，`SearchProvider` 会把它吞掉并降级到下一层
#[derive(Debug, Error)]
pub enum SearchError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 返回非 2xx 状态码
    #[error("返回错误状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 响应内容无法解析
    #[error("响应解析失败 ({endpoint}): {message}")]
    MalformedResponse { endpoint: String, message: String },
}

/// 文本生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 重试次数耗尽
    #[error("LLM 调用在 {attempts} 次尝试后仍失败: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// 结果表读写错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 文件读写失败
    #[error("文件操作失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// CSV 编解码失败
    #[error("CSV处理失败 ({path}): {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    /// JSON 导出失败
    #[error("JSON导出失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 研究主题为空
    #[error("研究主题不能为空")]
    EmptyTopic,
    /// 已有一次检索正在运行
    #[error("已有检索任务正在运行")]
    AlreadyRunning,
    /// 迭代次数不合法
    #[error("最大迭代次数必须大于 0")]
    ZeroIterations,
}

// ========== 从常见错误类型转换 ==========

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Store(StoreError::Io {
            path: String::new(),
            source: err,
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Store(StoreError::Json(err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Store(StoreError::Csv {
            path: String::new(),
            source: err,
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::TomlParseFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl StoreError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.into(),
            source,
        }
    }
}

impl SearchError {
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        SearchError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        SearchError::MalformedResponse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
