use std::time::Duration;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 登录相关错误（整个流程无法继续）
    #[error("登录错误: {0}")]
    Auth(#[from] AuthError),
    /// 账户卡片提取错误
    #[error("提取错误: {0}")]
    Extraction(#[from] ExtractionError),
    /// 文件下载错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),
    /// 结果写入错误
    #[error("写入错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
}

/// 登录状态机的失败原因
#[derive(Debug, Error)]
pub enum AuthError {
    /// 启动浏览器失败
    #[error("启动浏览器失败: {source}")]
    Launch {
        #[source]
        source: anyhow::Error,
    },
    /// 打开入口页面失败
    #[error("导航到 {url} 失败: {source}")]
    Navigation {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    /// 某一步骤等待的页面元素超时未出现
    #[error("步骤 [{step}] 在 {timeout:?} 内未完成: {source}")]
    StepTimedOut {
        step: &'static str,
        timeout: Duration,
        #[source]
        source: anyhow::Error,
    },
    /// 某一步骤操作元素失败
    #[error("步骤 [{step}] 操作失败: {source}")]
    MissingElement {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// 提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 卡片容器未出现，整次提取失败
    #[error("账户卡片容器在 {timeout:?} 内未加载: {source}")]
    ContainerMissing {
        timeout: Duration,
        #[source]
        source: anyhow::Error,
    },
    /// 卡片字段缺失（单条记录级别，跳过该卡片）
    #[error("卡片 {card_index} 缺少字段 {field}: {reason}")]
    RecordFieldMissing {
        card_index: usize,
        field: &'static str,
        reason: String,
    },
    /// 枚举卡片失败
    #[error("无法枚举账户卡片: {source}")]
    CardEnumeration {
        #[source]
        source: anyhow::Error,
    },
}

/// 下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    /// 单个文件下载失败（跳过该文件）
    #[error("下载 {target} 失败: {source}")]
    ItemFailed {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    /// 页面上找不到对应地址的卡片
    #[error("页面上找不到地址为 '{address}' 的卡片")]
    CardNotFound { address: String },
    /// 翻页失败，不再访问后续页面
    #[error("第 {page} 页翻页失败（已下载 {written} 个文件）: {source}")]
    PaginationAborted {
        page: usize,
        written: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// 结果写入错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 序列化失败
    #[error("序列化账户记录失败: {0}")]
    Serialize(#[from] serde_json::Error),
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: anyhow::Error,
    },
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
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
    /// 页面布局文件解析失败
    #[error("布局文件解析失败 ({path}): {source}")]
    LayoutParseFailed {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 浏览器配置失败
    #[error("浏览器配置失败: {0}")]
    ConfigurationFailed(String),
    /// 关闭浏览器失败
    #[error("关闭浏览器失败: {source}")]
    CloseFailed {
        #[source]
        source: anyhow::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AuthError {
    /// 等待超时
    pub fn timed_out(step: &'static str, timeout: Duration, source: anyhow::Error) -> Self {
        AuthError::StepTimedOut {
            step,
            timeout,
            source,
        }
    }

    /// 元素操作失败
    pub fn missing(step: &'static str, source: anyhow::Error) -> Self {
        AuthError::MissingElement { step, source }
    }
}

impl DownloadError {
    /// 单个文件下载失败
    pub fn item(target: impl Into<String>, source: anyhow::Error) -> Self {
        DownloadError::ItemFailed {
            target: target.into(),
            source,
        }
    }
}

impl PersistenceError {
    /// 写入文件失败
    pub fn write(path: impl Into<String>, source: std::io::Error) -> Self {
        PersistenceError::Write {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
