//! QR code rendering.
//!
//! Encoding is CPU-bound, so [`QrRenderer::write_png`] runs it on the
//! blocking pool and only then touches the filesystem through `tokio::fs`.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy)]
pub struct QrRenderer {
    min_size: u32,
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self { min_size: 256 }
    }
}

impl QrRenderer {
    pub fn new(min_size: u32) -> Self {
        Self { min_size }
    }

    /// Encode `data` as a black-on-white PNG with a quiet zone.
    pub fn render_png(&self, data: &str) -> Result<Vec<u8>, AppError> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)?;
        let img = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .min_dimensions(self.min_size, self.min_size)
            .build();

        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Render `data` and write it to `path`, replacing any existing file.
    pub async fn write_png(&self, path: &Path, data: &str) -> Result<(), AppError> {
        let renderer = *self;
        let data = data.to_owned();
        let png = tokio::task::spawn_blocking(move || renderer.render_png(&data))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("qr render task failed: {e}")))??;

        tokio::fs::write(path, png).await?;
        Ok(())
    }
}
