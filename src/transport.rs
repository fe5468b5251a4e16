//! Agent transport (§4.2, §6).
//!
//! Opens one fresh connection per call — unix or tcp, per
//! [`crate::config::Network`] — writes one length-prefixed MessagePack
//! frame, reads one back, and closes the connection. No pooling, no
//! retries: "each RPC uses a fresh connection" per §1's Non-goals.
//!
//! The `Stream` trait-object alias is lifted straight from `hreq`'s own
//! `pub(crate) trait Stream: AsyncRead + AsyncWrite + Unpin + Send +
//! 'static {}` in `src/lib.rs`, which exists for exactly this reason: to
//! talk to either a TLS or plain socket through one boxed type. Here the
//! two concrete kinds are `UnixStream` and `TcpStream` rather than TLS vs.
//! plain, but the shape is identical.

use crate::config::{ModuleConfig, Network};
use crate::deadline::Deadline;
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UnixStream};

const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

pub(crate) trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// The four named operations (§2, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum RpcOp {
    ModuleInit,
    PreRequest,
    PostRequest,
    UpdateRequest,
}

#[derive(Serialize)]
struct CallFrame<'a, A> {
    seq: u64,
    op: RpcOp,
    arg: &'a A,
}

#[derive(Deserialize)]
struct ResponseFrame<R> {
    #[allow(dead_code)]
    seq: u64,
    error: Option<String>,
    result: R,
}

async fn dial(cfg: &ModuleConfig) -> Result<Box<dyn Stream>, Error> {
    match cfg.socket.network {
        Network::Unix => {
            let stream = UnixStream::connect(&cfg.socket.address).await?;
            Ok(Box::new(stream))
        }
        Network::Tcp => {
            let stream = TcpStream::connect(&cfg.socket.address).await?;
            Ok(Box::new(stream))
        }
    }
}

async fn write_frame<A: Serialize>(stream: &mut (dyn Stream), seq: u64, op: RpcOp, arg: &A) -> Result<(), Error> {
    let frame = CallFrame { seq, op, arg };
    let body = rmp_serde::to_vec_named(&frame)?;
    let len = body.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_frame<R: DeserializeOwned>(stream: &mut (dyn Stream)) -> Result<R, Error> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(Error::Message(format!(
            "agent response frame too large: {} bytes",
            len
        )));
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await?;
    let frame: ResponseFrame<R> = rmp_serde::from_slice(&body)?;
    if let Some(msg) = frame.error {
        return Err(Error::Agent(msg));
    }
    Ok(frame.result)
}

/// Perform one request/response exchange against the agent, bounded by
/// `cfg.timeout` for connect + send + receive combined (§4.2).
pub(crate) async fn call<A, R>(cfg: &ModuleConfig, seq: u64, op: RpcOp, arg: &A) -> Result<R, Error>
where
    A: Serialize,
    R: DeserializeOwned,
{
    let deadline = Deadline::new(cfg.timeout);
    deadline
        .race(async {
            let mut stream = dial(cfg).await?;
            write_frame(&mut *stream, seq, op, arg).await?;
            read_frame(&mut *stream).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModuleConfig;
    use serde::Deserialize;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::UnixListener;

    #[derive(Serialize, Deserialize)]
    struct Ping {
        n: u32,
    }

    #[tokio::test]
    async fn round_trips_over_unix_socket() {
        let dir = tempdir();
        let path = dir.join("agent.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).await.unwrap();
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut body = vec![0u8; len];
            stream.read_exact(&mut body).await.unwrap();

            let resp = ResponseFrameOwned {
                seq: 1,
                error: None,
                result: Ping { n: 42 },
            };
            let out = rmp_serde::to_vec_named(&resp).unwrap();
            stream.write_all(&(out.len() as u32).to_be_bytes()).await.unwrap();
            stream.write_all(&out).await.unwrap();
            stream.flush().await.unwrap();
        });

        let cfg = ModuleConfig::builder()
            .socket(crate::config::Network::Unix, path.to_str().unwrap())
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();

        let result: Ping = call(&cfg, 1, RpcOp::ModuleInit, &Ping { n: 7 }).await.unwrap();
        assert_eq!(result.n, 42);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fails_fast_when_agent_unreachable() {
        let cfg = ModuleConfig::builder()
            .socket(crate::config::Network::Unix, "/tmp/no-such-sigsci-agent.sock")
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();

        let result: Result<Ping, Error> = call(&cfg, 1, RpcOp::PreRequest, &Ping { n: 1 }).await;
        assert!(result.is_err());
    }

    #[derive(Serialize)]
    struct ResponseFrameOwned<R> {
        seq: u64,
        error: Option<String>,
        result: R,
    }

    fn tempdir() -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("sigsci-test-{}", std::process::id()));
        std::fs::create_dir_all(&p).unwrap();
        p
    }
}
