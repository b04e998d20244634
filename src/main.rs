//! Lambda Gateway 命令行入口
//!
//! # 命令概览
//!
//! - `start` - 启动网关（默认）
//! - `version` - 显示版本信息
//! - `check-config` - 验证配置文件
//! - `routes` - 查看路由表
//!
//! # 使用示例
//!
//! ```bash
//! # 启动网关
//! lambda-gateway start
//!
//! # 使用自定义配置文件并覆盖端口
//! lambda-gateway -c gateway.yaml --port 8080 start
//!
//! # 开发模式启动
//! lambda-gateway --dev
//!
//! # 检查配置文件
//! lambda-gateway check-config -c gateway.yaml
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::signal;
use tracing::{error, info, warn};

use lambda_gateway::{Gateway, GatewayConfig, GatewayError, LogGuard, Logger, LoggerConfig};

/// Lambda Gateway - 请求校验动作分发网关
#[derive(Parser)]
#[command(name = "lambda-gateway")]
#[command(version, about = "请求校验动作分发网关", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "gateway.yaml", global = true)]
    config: PathBuf,

    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// 开发模式（更详细的日志）
    #[arg(long, global = true)]
    dev: bool,

    /// 监听地址，覆盖配置文件
    #[arg(long, global = true)]
    host: Option<String>,

    /// 监听端口，覆盖配置文件
    #[arg(long, global = true)]
    port: Option<u16>,

    /// 子命令
    #[command(subcommand)]
    command: Option<Commands>,
}

/// 可用的子命令
#[derive(Subcommand)]
enum Commands {
    /// 启动网关
    ///
    /// 按 Ctrl+C 可优雅关闭。
    Start,

    /// 查看版本信息
    Version,

    /// 验证配置文件
    ///
    /// 检查配置文件是否有效，并显示解析后的配置内容。
    CheckConfig {
        /// 配置文件路径（不指定则使用全局 -c 选项）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 查看路由表
    Routes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Start) | None => {
            let config = load_config(&cli).await?;
            let _guard = init_logging(&config)?;
            run_start(config).await?;
        }

        Some(Commands::Version) => {
            print_version();
        }

        Some(Commands::CheckConfig { config }) => {
            let path = config.clone().unwrap_or_else(|| cli.config.clone());
            check_config(&path).await?;
        }

        Some(Commands::Routes) => {
            let config = load_config(&cli).await?;
            show_routes(&config)?;
        }
    }

    Ok(())
}

/// 加载配置：默认值 → 配置文件 → 环境变量 → 命令行参数
async fn load_config(cli: &Cli) -> Result<GatewayConfig, GatewayError> {
    let mut config = if cli.config.exists() {
        GatewayConfig::from_file(&cli.config).await?
    } else {
        GatewayConfig::default()
    };

    config.apply_env_overrides()?;

    if let Some(ref host) = cli.host {
        config.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.dev {
        config.dev_mode = true;
    }

    config.validate()?;
    Ok(config)
}

/// 初始化日志系统
fn init_logging(config: &GatewayConfig) -> Result<LogGuard, GatewayError> {
    let logger_config = LoggerConfig::from_log_config(&config.logging, config.dev_mode);
    let guard = Logger::init(logger_config)?;

    match config.config_path {
        Some(ref path) => info!("已加载配置文件: {}", path.display()),
        None => info!("未找到配置文件，使用默认配置"),
    }
    Ok(guard)
}

/// 启动网关
async fn run_start(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(version = lambda_gateway::VERSION, "启动 Lambda Gateway...");

    let server = Gateway::from_config(&config)?.into_server();
    let bound = match server.bind().await {
        Ok(bound) => bound,
        Err(e) => {
            error!(error = %e, "监听绑定失败，进程退出");
            return Err(Box::new(e));
        }
    };

    println!();
    println!("Lambda Gateway 已启动");
    println!("═══════════════════════════════════════");
    println!("  版本:     {}", lambda_gateway::VERSION);
    println!("  监听地址: http://{}", bound.local_addr());
    println!("  路由:     GET|POST /run/:lambda_name");
    println!();
    println!("  按 Ctrl+C 优雅关闭");
    println!("═══════════════════════════════════════");
    println!();

    bound
        .serve(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "无法监听 Ctrl+C，立即关闭");
            }
        })
        .await?;

    info!("Lambda Gateway 已关闭");
    Ok(())
}

/// 检查配置文件
async fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("检查配置文件: {}", path.display());
    println!();

    if !path.exists() {
        println!("⚠️  警告: 配置文件不存在，将使用默认配置");
        println!();
        print_config(&GatewayConfig::default());
        return Ok(());
    }

    let config = GatewayConfig::from_file(path).await.and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    match config {
        Ok(config) => {
            println!("✅ 配置文件有效！");
            println!();
            print_config(&config);
            Ok(())
        }
        Err(e) => {
            println!("❌ 配置文件无效: {}", e);
            Err(Box::new(e))
        }
    }
}

/// 打印配置内容
fn print_config(config: &GatewayConfig) {
    println!("配置内容:");
    println!("────────────────────────────────────────");
    println!("  [监听配置]");
    println!("    地址:           {}", config.server.host);
    println!("    端口:           {}", config.server.port);
    println!("    关闭宽限期:     {} ms", config.server.shutdown_grace_ms);
    println!();
    println!("  [日志配置]");
    println!("    日志级别:       {}", config.logging.level);
    println!("    文件输出:       {}", if config.logging.file_output { "是" } else { "否" });
    println!("    JSON 格式:      {}", if config.logging.json_format { "是" } else { "否" });
    println!("    轮转策略:       {}", config.logging.rotation);
    println!();
    println!("  [Schema 配置]");
    println!("    严格模式:       {}", if config.schema.strict { "是" } else { "否" });
    println!();
    println!("  [其他]");
    println!("    开发模式:       {}", if config.dev_mode { "是" } else { "否" });
    println!("────────────────────────────────────────");
}

/// 打印版本信息
fn print_version() {
    println!();
    println!("Lambda Gateway - 请求校验动作分发网关");
    println!("═══════════════════════════════════════");
    println!("  版本:             {}", lambda_gateway::VERSION);
    println!();
    println!("构建信息:");
    println!("  目标平台:         {}", std::env::consts::ARCH);
    println!("  操作系统:         {}", std::env::consts::OS);
    println!("═══════════════════════════════════════");
    println!();
}

/// 显示路由表
fn show_routes(config: &GatewayConfig) -> Result<(), GatewayError> {
    let gateway = Gateway::from_config(config)?;
    let dispatcher = gateway.dispatcher();

    println!();
    println!("路由表");
    println!("═══════════════════════════════════════");
    for route in dispatcher.routes().list() {
        let body = if route.has_body { "  (body: lambda.body)" } else { "" };
        println!("  {:<7} {}{}", route.method.as_str(), route.pattern, body);
    }
    println!();
    println!("  Schema 严格模式: {}", if dispatcher.schemas().is_strict() { "是" } else { "否" });
    println!("═══════════════════════════════════════");
    println!();
    Ok(())
}
