//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `BEE_CHAT__*` 覆盖（双下划线表示嵌套，如 `BEE_CHAT__API__ENDPOINT=...`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub ui: UiSection,
}

/// [app] 段：日志文件
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    /// TUI 占用终端，日志默认写文件；显式设为空字符串时写 stderr
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("bee-chat.log"))
}

/// [api] 段：传输选择、对话端点、可选超时
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSection {
    /// 传输：http / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// 请求超时（秒）；不设置时沿用传输层默认
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: default_endpoint(),
            request_timeout_secs: None,
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8000/api/v1/chat".to_string()
}

/// [ui] 段
#[derive(Debug, Clone, Deserialize)]
pub struct UiSection {
    /// 错误提示的显示时长（秒）
    #[serde(default = "default_notice_secs")]
    pub notice_secs: u64,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            notice_secs: default_notice_secs(),
        }
    }
}

fn default_notice_secs() -> u64 {
    4
}

/// 从 config 目录加载配置，环境变量 BEE_CHAT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 BEE_CHAT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("BEE_CHAT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let mut cfg: AppConfig = c.try_deserialize()?;
    if cfg
        .app
        .log_file
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        cfg.app.log_file = None;
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.provider, "http");
        assert_eq!(cfg.api.endpoint, "http://localhost:8000/api/v1/chat");
        assert_eq!(cfg.api.request_timeout_secs, None);
        assert_eq!(cfg.ui.notice_secs, 4);
        assert_eq!(cfg.app.log_file, Some(PathBuf::from("bee-chat.log")));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
provider = "mock"
endpoint = "http://example.test/chat"
request_timeout_secs = 30

[ui]
notice_secs = 9
"#
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.api.provider, "mock");
        assert_eq!(cfg.api.endpoint, "http://example.test/chat");
        assert_eq!(cfg.api.request_timeout_secs, Some(30));
        assert_eq!(cfg.ui.notice_secs, 9);
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[app]\nlog_file = \"demo.log\"").unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.app.log_file, Some(PathBuf::from("demo.log")));
        assert_eq!(cfg.api.provider, "http");
        assert_eq!(cfg.ui.notice_secs, 4);
    }
}
