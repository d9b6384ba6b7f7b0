use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

use crate::client::Client;
use crate::config::NetworkConfig;
use crate::engine::FilesystemEngine;
use crate::middleware::logging::{log_command, log_upload};
use crate::protocol::responses;
use crate::protocol::{
    CommandStatus, PendingUpload, complete_upload, handle_command, parse_command,
};

/// Outcome of reading one line with a length cap
#[derive(Debug, PartialEq)]
enum LineRead {
    Closed,
    Line,
    TooLong,
}

/// Reads one line of raw bytes into `line` without ever buffering more
/// than `max` bytes of it. An over-long line is drained up to its newline
/// and reported as `TooLong`.
async fn read_bounded_line<R>(
    reader: &mut R,
    line: &mut Vec<u8>,
    max: usize,
) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = (&mut *reader)
        .take(max as u64 + 2)
        .read_until(b'\n', line)
        .await?;
    if n == 0 {
        return Ok(LineRead::Closed);
    }

    let content_len = trim_line_end(line).len();
    if line.ends_with(b"\n") || content_len <= max {
        return Ok(if content_len > max {
            LineRead::TooLong
        } else {
            LineRead::Line
        });
    }

    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        match buf.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                break;
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
    line.clear();
    Ok(LineRead::TooLong)
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// What arrived after a SEND_DATA prompt
#[derive(Debug, PartialEq)]
enum Upload {
    Complete(Vec<u8>),
    TooLarge,
    Disconnected,
}

/// Collects upload lines until the end marker. Each line is kept with a
/// trailing `\n`; past `max_bytes` the rest is read and discarded.
async fn collect_upload<R>(reader: &mut R, max_bytes: usize) -> io::Result<Upload>
where
    R: AsyncBufRead + Unpin,
{
    let line_cap = max_bytes.max(responses::END_OF_DATA.len());
    let mut data = Vec::new();
    let mut line = Vec::new();
    let mut overflow = false;

    loop {
        match read_bounded_line(reader, &mut line, line_cap).await? {
            LineRead::Closed => return Ok(Upload::Disconnected),
            LineRead::TooLong => overflow = true,
            LineRead::Line => {
                let content = trim_line_end(&line);
                if content == responses::END_OF_DATA.as_bytes() {
                    break;
                }
                if data.len() + content.len() + 1 > max_bytes {
                    overflow = true;
                }
                if !overflow {
                    data.extend_from_slice(content);
                    data.push(b'\n');
                }
            }
        }
    }

    Ok(if overflow {
        Upload::TooLarge
    } else {
        Upload::Complete(data)
    })
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, message: &str) -> io::Result<()> {
    writer.write_all(message.as_bytes()).await?;
    writer.flush().await
}

/// Drives one client connection: reads command lines, dispatches them, and
/// writes replies until QUIT or disconnect. Any session still open when the
/// loop ends is closed.
pub async fn handle_client<S>(
    stream: S,
    client_addr: SocketAddr,
    engine: Arc<FilesystemEngine>,
    config: Arc<NetworkConfig>,
) where
    S: tokio::io::AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut line = Vec::new();
    let mut client = Client::new(client_addr);

    if let Err(e) = send(&mut write_half, responses::GREETING).await {
        error!("Failed to greet {}: {}", client_addr, e);
        return;
    }

    if let Err(e) = command_loop(
        &mut reader,
        &mut write_half,
        &mut line,
        &mut client,
        &engine,
        &config,
    )
    .await
    {
        error!("Connection with {} failed: {}", client.label(), e);
    }

    if let Some(handle) = client.logout() {
        if engine.logout(handle).is_ok() {
            info!("Closed session left open by {}", client_addr);
        }
    }
}

async fn command_loop<R, W>(
    reader: &mut R,
    writer: &mut W,
    line: &mut Vec<u8>,
    client: &mut Client,
    engine: &FilesystemEngine,
    config: &NetworkConfig,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let max = config.max_command_length;
    loop {
        match read_bounded_line(reader, line, max).await? {
            LineRead::Closed => {
                info!("Connection closed by client {}", client.client_addr());
                return Ok(());
            }
            LineRead::TooLong => {
                warn!("Client {} sent an over-long command", client.label());
                let reply = responses::err(responses::COMMAND_TOO_LONG);
                send(writer, &reply).await?;
                continue;
            }
            LineRead::Line => {}
        }

        let Ok(text) = std::str::from_utf8(line) else {
            warn!("Client {} sent a command that is not UTF-8", client.label());
            let reply = responses::err(responses::INVALID_ENCODING);
            send(writer, &reply).await?;
            continue;
        };
        let command = parse_command(text);
        log_command(&client.label(), &command);

        let result = handle_command(client, &command, engine, config);
        if let Some(msg) = &result.message {
            send(writer, msg).await?;
        }

        match result.status {
            CommandStatus::CloseConnection => {
                info!("Client {} requested to quit", client.client_addr());
                return Ok(());
            }
            CommandStatus::AwaitData(upload) => {
                let stayed = receive_upload(reader, writer, client, engine, config, &upload)
                    .await?;
                if !stayed {
                    return Ok(());
                }
            }
            CommandStatus::Success | CommandStatus::Failure(_) => {}
        }
    }
}

/// Returns `false` if the peer went away mid-upload.
async fn receive_upload<R, W>(
    reader: &mut R,
    writer: &mut W,
    client: &mut Client,
    engine: &FilesystemEngine,
    config: &NetworkConfig,
    upload: &PendingUpload,
) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let reply = match collect_upload(reader, config.max_upload_bytes).await? {
        Upload::Disconnected => {
            warn!("Client {} disconnected during upload", client.label());
            return Ok(false);
        }
        Upload::TooLarge => {
            warn!(
                "Client {} upload exceeded {} bytes",
                client.label(),
                config.max_upload_bytes
            );
            responses::err(responses::UPLOAD_TOO_LARGE)
        }
        Upload::Complete(data) => {
            log_upload(&client.label(), data.len());
            complete_upload(client, upload, &data, engine)
                .message
                .unwrap_or_default()
        }
    };

    send(writer, &reply).await?;
    Ok(true)
}
