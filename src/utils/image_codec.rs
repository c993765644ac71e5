//! PNG + base64 encoding for response payloads.
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};

use crate::error::AppResult;

pub fn encode_png(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn encode_png_base64(image: &DynamicImage) -> AppResult<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

pub fn decode_base64_image(data: &str) -> AppResult<DynamicImage> {
    let bytes = STANDARD.decode(data.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}
