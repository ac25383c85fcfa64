use base64::{engine::general_purpose::STANDARD, Engine as _};
use hyper::StatusCode;
use image::ImageFormat;
use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

/// Public path of the most recent screenshot.
pub const IMAGE_URL: &str = "/static/question.png";
const IMAGE_FILE: &str = "question.png";

/// Decodes the payload of a `data:<media-type>;base64,<payload>` URL.
fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let (_, payload) = url.split_once(',')?;
    STANDARD.decode(payload.trim()).ok()
}

/// Decodes a PNG, JPEG, GIF, or WebP upload and re-encodes it as PNG.
fn reencode_as_png(bytes: &[u8]) -> Result<Vec<u8>, StatusCode> {
    let decoded = image::load_from_memory(bytes).map_err(|err| {
        log::warn!("Screenshot payload of {} bytes is not a decodable image: {err}", bytes.len());
        StatusCode::BAD_REQUEST
    })?;

    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).map_err(|err| {
        log::error!("Cannot encode screenshot as PNG: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(png)
}

/// Writes screenshots to a single well-known PNG file. Every upload overwrites the previous one.
pub struct ImageSink(PathBuf);

impl ImageSink {
    pub fn new(dir: &Path) -> Self {
        Self(dir.join(IMAGE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Decodes the data URL and stores the image as PNG. Returns the public path of the file.
    pub async fn save(&self, data_url: &str) -> Result<&'static str, StatusCode> {
        let Some(bytes) = decode_data_url(data_url) else {
            log::warn!("Screenshot payload is not a valid base64 data URL.");
            return Err(StatusCode::BAD_REQUEST);
        };

        let png = tokio::task::spawn_blocking(move || reencode_as_png(&bytes)).await.map_err(|err| {
            log::error!("Screenshot encoder panicked: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })??;

        tokio::fs::write(&self.0, &png).await.map_err(|err| {
            log::error!("Cannot write screenshot to {}: {err}", self.0.display());
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        log::info!("Saved {} byte screenshot to {}.", png.len(), self.0.display());
        Ok(IMAGE_URL)
    }
}

#[cfg(test)]
pub(crate) fn encoded(color: [u8; 3], format: ImageFormat) -> Vec<u8> {
    use image::{DynamicImage, Rgb, RgbImage};
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb(color)));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format).unwrap();
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_data_url, encoded, ImageSink, IMAGE_URL, STANDARD};
    use base64::Engine as _;
    use hyper::StatusCode;
    use image::{GenericImageView, ImageFormat, Rgb};

    fn data_url(bytes: &[u8]) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    }

    fn stored_pixel(sink: &ImageSink) -> Rgb<u8> {
        let stored = std::fs::read(sink.path()).unwrap();
        assert_eq!(image::guess_format(&stored).unwrap(), ImageFormat::Png);
        let img = image::load_from_memory(&stored).unwrap();
        assert_eq!(img.dimensions(), (4, 3));
        *img.to_rgb8().get_pixel(0, 0)
    }

    #[test]
    fn data_url_decoding() {
        assert_eq!(decode_data_url(&data_url(b"hello")).unwrap(), b"hello");
        assert!(decode_data_url("no separator").is_none());
        assert!(decode_data_url("data:image/png;base64,@@@").is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn overwrites_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ImageSink::new(dir.path());

        assert_eq!(sink.save(&data_url(&encoded([255, 0, 0], ImageFormat::Png))).await.unwrap(), IMAGE_URL);
        assert_eq!(stored_pixel(&sink), Rgb([255, 0, 0]));

        assert_eq!(sink.save(&data_url(&encoded([0, 0, 255], ImageFormat::Png))).await.unwrap(), IMAGE_URL);
        assert_eq!(stored_pixel(&sink), Rgb([0, 0, 255]));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn other_formats_are_stored_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ImageSink::new(dir.path());

        let jpeg = encoded([0, 128, 0], ImageFormat::Jpeg);
        assert!(jpeg.starts_with(&[0xFF, 0xD8, 0xFF]));
        assert_eq!(sink.save(&format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg))).await.unwrap(), IMAGE_URL);
        stored_pixel(&sink);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rejects_undecodable_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ImageSink::new(dir.path());
        assert_eq!(sink.save("data:image/png;base64,!!!").await, Err(StatusCode::BAD_REQUEST));
        assert_eq!(sink.save(&data_url(b"not an image")).await, Err(StatusCode::BAD_REQUEST));
        assert_eq!(sink.save(&data_url(b"\x89PNG\r\n\x1a\nTHIS IS NOT AN IMAGE AT ALL")).await, Err(StatusCode::BAD_REQUEST));
        assert_eq!(sink.save(&data_url(&[0xFF, 0xD8, 0xFF, 0x00, 0x01])).await, Err(StatusCode::BAD_REQUEST));
        assert!(!sink.path().exists());
    }
}
