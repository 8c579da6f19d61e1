use qrcode::{render::svg, QrCode};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Payload scanned at the booth.
pub fn qr_payload(request_id: Uuid, signature: &str) -> String {
    format!("orgpay:{}:{}", request_id, signature)
}

/// Renders the ticket QR code as an SVG document.
pub fn render_payment_qr(request_id: Uuid, signature: &str, size: u32) -> Result<String> {
    let code = QrCode::new(qr_payload(request_id, signature).as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(size, size)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_format() {
        let id = Uuid::nil();
        assert_eq!(
            qr_payload(id, "abc"),
            "orgpay:00000000-0000-0000-0000-000000000000:abc"
        );
    }

    #[test]
    fn test_renders_svg() {
        let svg = render_payment_qr(Uuid::new_v4(), &"a".repeat(64), 240).unwrap();
        assert!(svg.contains("<svg"));
    }
}
