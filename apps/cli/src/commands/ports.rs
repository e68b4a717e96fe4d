//! 串口枚举

use anyhow::Result;

/// 列出本机可用串口
pub fn list_ports() -> Result<()> {
    let ports = dxl_transport::serial::available_ports()?;
    if ports.is_empty() {
        println!("未发现串口设备");
        return Ok(());
    }
    println!("📋 可用串口:");
    for port in ports {
        println!("  {}", port);
    }
    Ok(())
}
