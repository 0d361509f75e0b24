// 二维码生成工具
// 为推广链接生成二维码

use qrcode::QrCode;
use qrcode::render::svg;
use base64::Engine;
use anyhow::{Result, Context};

/// 生成推广链接二维码
///
/// # Arguments
/// * `promotion_link` - 推广链接 (如 https://example.com?ref=REFABC123)
///
/// # Returns
/// * Base64编码的SVG data URL
pub fn generate_promotion_qr_code(promotion_link: &str) -> Result<String> {
    let qr_code = QrCode::new(promotion_link.as_bytes())
        .context("Failed to create QR code")?;

    let svg_data = qr_code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    let encoded = base64::engine::general_purpose::STANDARD.encode(svg_data.as_bytes());
    Ok(format!("data:image/svg+xml;base64,{}", encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_promotion_qr_code() {
        let data_url = generate_promotion_qr_code("http://localhost:3000?ref=REFABC123").unwrap();
        assert!(data_url.starts_with("data:image/svg+xml;base64,"));

        let payload = data_url.trim_start_matches("data:image/svg+xml;base64,");
        let svg = base64::engine::general_purpose::STANDARD.decode(payload).unwrap();
        assert!(String::from_utf8(svg).unwrap().contains("<svg"));
    }
}
