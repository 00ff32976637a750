//! The line protocol and command tokenizer (spec §6): a thin boundary,
//! not part of the scheduler core. A request is a single line
//! terminated by CR, LF or CRLF; fields are separated by one or more
//! spaces.

use printd::constants::MAX_CANON;
use tokio::io::AsyncReadExt;

/// Read one request line off `stream`. Returns `Ok(None)` on EOF (spec
/// §4.8: "0 bytes indicates EOF").
pub async fn read_request(
    stream: &mut (impl AsyncReadExt + Unpin),
) -> std::io::Result<Option<Vec<String>>> {
    let mut buf = vec![0u8; MAX_CANON];
    let n = stream.read(&mut buf).await?;

    if n == 0 {
        return Ok(None);
    }

    buf.truncate(n);
    while matches!(buf.last(), Some(b'\r') | Some(b'\n')) {
        buf.pop();
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.split_whitespace().map(str::to_owned).collect()))
}
