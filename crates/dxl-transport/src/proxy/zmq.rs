//! ZeroMQ REQ 通道
//!
//! 使用私有的 current-thread tokio 运行时驱动 `zeromq` 的异步 REQ socket，
//! 对外提供同步阻塞接口。运行时只在调用期间执行，没有后台线程。

use super::RequestChannel;
use crate::TransportError;
use std::io;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{info, warn};
use zeromq::{ReqSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// ZeroMQ REQ 通道
pub struct ZmqChannel {
    // socket 必须先于 runtime 释放
    socket: Option<ReqSocket>,
    runtime: Runtime,
    endpoint: String,
    timeout: Duration,
}

/// 私有运行时不能在另一个 tokio 运行时内部 `block_on`
fn ensure_blocking_context(endpoint: &str) -> Result<(), TransportError> {
    if Handle::try_current().is_ok() {
        return Err(TransportError::Connection(format!(
            "{}: blocking channel used from inside an async runtime",
            endpoint
        )));
    }
    Ok(())
}

async fn connect_socket(endpoint: &str, timeout: Duration) -> Result<ReqSocket, TransportError> {
    let mut socket = ReqSocket::new();
    match tokio::time::timeout(timeout, socket.connect(endpoint)).await {
        Ok(Ok(())) => Ok(socket),
        Ok(Err(e)) => Err(TransportError::Connection(format!(
            "failed to connect {}: {}",
            endpoint, e
        ))),
        Err(_) => Err(TransportError::Connection(format!(
            "{} unreachable after {:?}",
            endpoint, timeout
        ))),
    }
}

impl ZmqChannel {
    /// 连接代理端点
    ///
    /// 连接过程受 `timeout` 约束，端点不可达时在构造期返回
    /// `TransportError::Connection`。在 tokio 运行时内部调用同样返回
    /// `Connection`，此时应改用 `spawn_blocking`。
    pub fn connect(endpoint: &str, timeout: Duration) -> Result<Self, TransportError> {
        ensure_blocking_context(endpoint)?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let socket = runtime.block_on(connect_socket(endpoint, timeout))?;
        info!("Queue proxy connected: {}", endpoint);

        Ok(Self {
            socket: Some(socket),
            runtime,
            endpoint: endpoint.to_string(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RequestChannel for ZmqChannel {
    fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        ensure_blocking_context(&self.endpoint)?;

        // 超时后 REQ 状态机停在"等待应答"，只能丢弃 socket 重新连接。
        // 失败的请求不会重发。
        if self.socket.is_none() {
            let socket = self
                .runtime
                .block_on(connect_socket(&self.endpoint, self.timeout))?;
            self.socket = Some(socket);
        }
        let socket = self.socket.as_mut().ok_or(TransportError::Closed)?;

        let timeout = self.timeout;
        let message = ZmqMessage::from(payload.to_vec());
        let result = self.runtime.block_on(async {
            tokio::time::timeout(timeout, async {
                match socket.send(message).await {
                    Ok(()) => socket.recv().await,
                    Err(e) => Err(e),
                }
            })
            .await
        });

        match result {
            Ok(Ok(reply)) => Ok(reply
                .into_vec()
                .into_iter()
                .flat_map(|frame| frame.to_vec())
                .collect()),
            Ok(Err(e)) => {
                warn!("Queue proxy exchange failed on {}: {}", self.endpoint, e);
                self.drop_socket();
                Err(TransportError::Io(io::Error::other(e.to_string())))
            },
            Err(_) => {
                warn!("Queue proxy reply timed out after {:?}", timeout);
                self.drop_socket();
                Err(TransportError::Timeout)
            },
        }
    }

    fn close(&mut self) {
        self.drop_socket();
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

impl ZmqChannel {
    fn drop_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _guard = self.runtime.enter();
            drop(socket);
        }
    }
}

impl Drop for ZmqChannel {
    fn drop(&mut self) {
        self.drop_socket();
    }
}
