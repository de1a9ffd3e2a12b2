/// 应用配置管理
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::attachment::{self, CodecOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 任务数据文件（默认 ~/.taskdeck/tasks.json）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
    /// 图片最大宽度，超出后等比缩放
    pub image_max_width: u32,
    /// JPEG 压缩质量（0..1）
    pub image_quality: f32,
    /// 图片处理超时（秒）
    pub image_timeout_secs: u64,
    /// 通知显示时长（秒）
    pub notification_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: None,
            image_max_width: attachment::DEFAULT_MAX_WIDTH,
            image_quality: attachment::DEFAULT_QUALITY,
            image_timeout_secs: attachment::DEFAULT_TIMEOUT.as_secs(),
            notification_secs: 3,
        }
    }
}

impl Config {
    /// 任务数据文件路径
    pub fn data_file(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| get_data_dir().join("tasks.json"))
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            max_width: self.image_max_width.max(1),
            quality: self.image_quality,
            timeout: Duration::from_secs(self.image_timeout_secs.max(1)),
        }
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_secs(self.notification_secs)
    }
}

/// 获取数据目录
/// All platforms: ~/.taskdeck
pub fn get_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".taskdeck")
}

/// 获取配置文件路径
/// Windows: %APPDATA%\taskdeck\config.toml
/// macOS: ~/Library/Application Support/taskdeck/config.toml
/// Linux: ~/.config/taskdeck/config.toml
pub fn get_config_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(get_data_dir)
        .join("taskdeck")
        .join("config.toml")
}

/// 加载配置（文件不存在时返回默认配置）
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("invalid config {}", path.display()))?;

    Ok(config)
}

/// 保存配置
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;

    Ok(())
}

/// 显示当前配置
pub fn show_config(config: &Config, out: &mut impl Write) -> Result<()> {
    writeln!(out, "Current configuration:")?;
    writeln!(out, "  data file:          {}", config.data_file().display())?;
    writeln!(out, "  image max width:    {}", config.image_max_width)?;
    writeln!(out, "  image quality:      {}", config.image_quality)?;
    writeln!(out, "  image timeout:      {}s", config.image_timeout_secs)?;
    writeln!(out, "  notification time:  {}s", config.notification_secs)?;
    writeln!(out)?;
    writeln!(out, "Config file: {}", get_config_path().display())?;
    Ok(())
}
