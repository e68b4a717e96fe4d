//! # dxl-cli
//!
//! Dynamixel/AX-12 舵机总线命令行工具。
//!
//! ```bash
//! # 本机串口
//! dxl-cli --port /dev/ttyUSB0 scan --to 18
//! dxl-cli --port /dev/ttyUSB0 write 5 torque_enable 1
//! dxl-cli --port /dev/ttyUSB0 read 5 present_position
//!
//! # 远端总线进程
//! dxl-cli --proxy tcp://127.0.0.1:5000 sync-write goal_position -e 1:512 -e 2:300
//!
//! # 配置文件
//! dxl-cli --config dxl.toml relax 1 2 3
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod connection;

use commands::{
    PingCommand, ReadCommand, RelaxCommand, ResetCommand, ScanCommand, SyncWriteCommand,
    WriteCommand,
};
use connection::ConnectionArgs;

/// dxl-cli - 舵机总线命令行工具
#[derive(Parser, Debug)]
#[command(name = "dxl-cli")]
#[command(about = "Command-line interface for Dynamixel/AX-12 servo buses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 列出可用串口
    Ports,

    /// PING 单个舵机
    Ping {
        #[command(flatten)]
        args: PingCommand,
    },

    /// 扫描在线舵机
    Scan {
        #[command(flatten)]
        args: ScanCommand,
    },

    /// 读取寄存器
    Read {
        #[command(flatten)]
        args: ReadCommand,
    },

    /// 写入寄存器
    Write {
        #[command(flatten)]
        args: WriteCommand,
    },

    /// 一次事务写多个舵机
    SyncWrite {
        #[command(flatten)]
        args: SyncWriteCommand,
    },

    /// 关闭扭矩
    Relax {
        #[command(flatten)]
        args: RelaxCommand,
    },

    /// 恢复出厂控制表
    Reset {
        #[command(flatten)]
        args: ResetCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dxl_cli=info,dxl_driver=info")),
        )
        .init();

    let cli = Cli::parse();
    let connection = &cli.connection;

    match cli.command {
        Commands::Ports => commands::list_ports(),
        Commands::Ping { args } => args.execute(connection),
        Commands::Scan { args } => args.execute(connection),
        Commands::Read { args } => args.execute(connection),
        Commands::Write { args } => args.execute(connection),
        Commands::SyncWrite { args } => args.execute(connection),
        Commands::Relax { args } => args.execute(connection),
        Commands::Reset { args } => args.execute(connection),
    }
}
