//! 应用安装程序
//!
//! 提供首次部署所需的数据库初始化，包括：
//! - 建立 `default` 与 `logserver` 数据库连接
//! - 按模型迁移实体表
//! - 初始化枚举表
//! - 创建管理员账户与角色

mod admin_seeder;
mod dialect;
mod enum_seeder;
mod mapper;
mod migration;
mod registry;
mod service;
mod users;

#[cfg(test)]
mod test_support;

use admin_seeder::AdminSeedOutcome;
use anyhow::Context;
use common::config::AppConfig;
use service::{Installer, InstallerTrait};
use tracing::{info, Instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const USAGE: &str = "usage: installer [install|migrate]";

/// 子命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Install,
    Migrate,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg {
            None | Some("install") => Some(Self::Install),
            Some("migrate") => Some(Self::Migrate),
            Some(_) => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 最先加载 .env，日志初始化之后再记录结果
    let env_vars = load_dotenv();

    // 初始化日志追踪
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    if env_vars > 0 {
        info!(count = env_vars, "Loaded variables from .env");
    }

    let arg = std::env::args().nth(1);
    let Some(command) = Command::parse(arg.as_deref()) else {
        anyhow::bail!("unknown command {:?}; {}", arg.unwrap_or_default(), USAGE);
    };

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("installer", run_id = %run_id, command = ?command);
    run(command).instrument(span).await
}

async fn run(command: Command) -> anyhow::Result<()> {
    // 加载配置
    let config = AppConfig::load().context("Failed to load installer configuration")?;

    // 建立连接；配置不完整时不会写入任何数据
    let installer = Installer::new(config)
        .await
        .context("Failed to initialize installer")?;

    match command {
        Command::Install => {
            let report = installer.install().await.context("Installation failed")?;
            match report.admin {
                AdminSeedOutcome::Created {
                    user_id,
                    role_id,
                    permissions,
                } => info!(user_id, role_id, permissions, "管理员账户已创建"),
                AdminSeedOutcome::AlreadyPresent { user_id } => {
                    info!(user_id = ?user_id, "管理员账户已存在")
                }
            }
            info!(
                created = report.migration.created.len(),
                altered = report.migration.altered.len(),
                enum_rows = report.enum_rows,
                "安装完成"
            );
        }
        Command::Migrate => {
            let report = installer.migrate().await.context("Migration failed")?;
            info!(
                created = report.created.len(),
                altered = report.altered.len(),
                unchanged = report.unchanged.len(),
                "迁移完成"
            );
        }
    }
    Ok(())
}

/// 加载工作目录下的 `.env`；已存在的环境变量不会被覆盖，返回实际写入的变量数
fn load_dotenv() -> usize {
    let Ok(content) = std::fs::read_to_string(".env") else {
        return 0;
    };
    let mut applied = 0;
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
            applied += 1;
        }
    }
    applied
}

/// Parses `KEY=value`, `export KEY=value` and quoted values; comments and
/// blank lines yield `None`.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let value = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value);
    Some((key, value))
}
