use hyper::StatusCode;
use std::{io::ErrorKind, path::Path};

fn content_type(path: &str) -> &'static str {
    let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext);
    match ext {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

/// Reads a file relative to the static directory. Returns the bytes with their content type.
pub async fn read(dir: &Path, path: &str) -> Result<(Vec<u8>, &'static str), StatusCode> {
    if path.is_empty() || path.contains('\\') || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return Err(StatusCode::NOT_FOUND);
    }

    match tokio::fs::read(dir.join(path)).await {
        Ok(bytes) => Ok((bytes, content_type(path))),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(StatusCode::NOT_FOUND),
        Err(err) => {
            log::error!("Cannot read static file {path}: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
