use alloc::boxed::Box;
use serde::{Deserialize, Serialize};

/// Request body of a screenshot upload.
#[derive(Deserialize)]
pub struct SaveImage {
    /// Data URL of the form `data:image/png;base64,<payload>`.
    #[serde(default)]
    pub image: Option<Box<str>>,
}

/// Response body pointing to the stored screenshot.
#[derive(Serialize)]
pub struct SavedImage<'a> {
    pub url: &'a str,
}
