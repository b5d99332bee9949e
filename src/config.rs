use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 门户入口 URL
    pub base_url: String,
    // --- 登录凭据 ---
    pub username: String,
    pub password: String,
    /// 二次验证码
    pub mfa_code: String,
    /// 导航与表单操作的全局超时
    pub timeout: Duration,
    /// 提交二次验证码后等待仪表盘出现的超时（比全局超时更长）
    pub mfa_timeout: Duration,
    /// 可选步骤（入口链接、Cookie 按钮）的等待时间，超时即跳过该步骤
    pub optional_step_timeout: Duration,
    /// 是否无头模式运行
    pub headless: bool,
    /// 下载文件存放目录
    pub download_dir: PathBuf,
    /// 账户记录输出文件
    pub output_file: PathBuf,
    /// 失败诊断日志文件
    pub diagnostics_file: PathBuf,
    /// 页面布局覆盖文件（TOML）
    pub layout_file: Option<PathBuf>,
    /// 浏览器可执行文件路径
    pub chrome_path: Option<PathBuf>,
}

impl Config {
    /// 默认全局超时（秒）
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// 默认二次验证后等待超时（秒）
    pub const DEFAULT_MFA_TIMEOUT_SECS: u64 = 60;
    /// 默认可选步骤等待时间（秒）
    pub const DEFAULT_OPTIONAL_STEP_TIMEOUT_SECS: u64 = 3;

    /// 从进程环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::EnvVarNotFound {
                    var_name: name.to_string(),
                })
        };

        let timeout_secs: u64 = parse_or(&lookup, "TIMEOUT", Self::DEFAULT_TIMEOUT_SECS)?;
        let mfa_timeout_secs: u64 =
            parse_or(&lookup, "MFA_TIMEOUT", Self::DEFAULT_MFA_TIMEOUT_SECS)?;
        let optional_step_secs: u64 = parse_or(
            &lookup,
            "OPTIONAL_STEP_TIMEOUT",
            Self::DEFAULT_OPTIONAL_STEP_TIMEOUT_SECS,
        )?;

        Ok(Self {
            base_url: required("BASE_URL")?,
            username: required("USERNAME")?,
            password: required("PASSWORD")?,
            mfa_code: required("MFA_CODE")?,
            timeout: Duration::from_secs(timeout_secs),
            mfa_timeout: Duration::from_secs(mfa_timeout_secs),
            optional_step_timeout: Duration::from_secs(optional_step_secs),
            headless: parse_or(&lookup, "HEADLESS", true)?,
            download_dir: lookup("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            output_file: lookup("OUTPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("extracted_accounts.json")),
            diagnostics_file: lookup("DIAGNOSTICS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("failures.txt")),
            layout_file: lookup("LAYOUT_FILE").map(PathBuf::from),
            chrome_path: lookup("CHROME_PATH").map(PathBuf::from),
        })
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value: raw.clone(),
                expected_type: std::any::type_name::<T>().to_string(),
            }),
    }
}
