//! Verification code minting and QR rendering.
//!
//! Codes are 128-bit random hex tokens; collision probability is negligible,
//! so uniqueness is not checked against the ledger. The QR payload is the
//! configured validation base URL with the code appended.

use image::{GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Pixels per QR module in the rendered PNG.
const MODULE_PX: u32 = 8;
/// Quiet zone width in modules on each side.
const QUIET_ZONE: u32 = 4;

/// Mints a fresh opaque verification code (32 hex chars, 128 bits).
pub fn new_code() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Renders `url` as a PNG QR code at error-correction level Q (~25%
/// recoverable). The symbol version is chosen automatically for the payload.
pub fn qr_png(url: &str) -> Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(url, EcLevel::Q)
        .map_err(|e| Error::Qr(e.to_string()))?;

    let modules = code.width() as u32;
    let side = (modules + QUIET_ZONE * 2) * MODULE_PX;
    let mut img = GrayImage::from_pixel(side, side, Luma([255u8]));

    for (i, module) in code.to_colors().iter().enumerate() {
        if *module != Color::Dark {
            continue;
        }
        let mx = (i as u32 % modules + QUIET_ZONE) * MODULE_PX;
        let my = (i as u32 / modules + QUIET_ZONE) * MODULE_PX;
        for dy in 0..MODULE_PX {
            for dx in 0..MODULE_PX {
                img.put_pixel(mx + dx, my + dy, Luma([0u8]));
            }
        }
    }

    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}
