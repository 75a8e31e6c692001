//! 图片压缩服务 - 业务能力层
//!
//! 只负责"把单页图片压到阈值以下"能力，不关心流程

use crate::error::ImageError;
use crate::models::{CompressionInfo, PageImage};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info, warn};

/// 一档压缩参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionPreset {
    /// JPEG 质量（0.0 - 1.0）
    pub quality: f32,
    /// 最大宽度（像素），超出时等比缩小
    pub max_width: u32,
}

/// 逐级加大的三档预设
pub const DEFAULT_PRESETS: [CompressionPreset; 3] = [
    CompressionPreset { quality: 0.8, max_width: 1920 },
    CompressionPreset { quality: 0.6, max_width: 1600 },
    CompressionPreset { quality: 0.4, max_width: 1200 },
];

/// 根据 base64 长度估算解码后的字节数（`len × 3 / 4`，不做真正解码）
pub fn estimate_decoded_size(data: &str) -> usize {
    base64_payload(data).len() * 3 / 4
}

/// 去掉 `data:image/...;base64,` 前缀
fn base64_payload(data: &str) -> &str {
    if data.starts_with("data:") {
        if let Some((_, payload)) = data.split_once(',') {
            return payload;
        }
    }
    data
}

/// 图片压缩服务
///
/// 职责：
/// - 估算单页图片大小
/// - 超过阈值时按预设逐级重新编码
/// - 永远不失败：解码/编码出错时原样返回
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    threshold: usize,
    presets: Vec<CompressionPreset>,
}

impl ImageCompressor {
    pub fn new(threshold: usize) -> Self {
        Self::with_presets(threshold, DEFAULT_PRESETS.to_vec())
    }

    pub fn with_presets(threshold: usize, presets: Vec<CompressionPreset>) -> Self {
        Self { threshold, presets }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn needs_compression(&self, page: &PageImage) -> bool {
        estimate_decoded_size(&page.data) > self.threshold
    }

    /// 压缩单页
    pub fn compress_page(&self, page: PageImage) -> PageImage {
        let original_size = estimate_decoded_size(&page.data);
        if original_size <= self.threshold {
            debug!("第 {} 页大小 {} 字节，无需压缩", page.page_number, original_size);
            return page;
        }

        info!(
            "🗜️ 第 {} 页约 {:.2} MB，超过阈值 {:.2} MB，开始压缩",
            page.page_number,
            to_mb(original_size),
            to_mb(self.threshold)
        );

        match self.reencode(&page, original_size) {
            Ok(compressed) => compressed,
            Err(e) => {
                warn!("⚠️ 第 {} 页压缩失败，使用原图: {}", page.page_number, e);
                page
            }
        }
    }

    fn reencode(&self, page: &PageImage, original_size: usize) -> Result<PageImage, ImageError> {
        let bytes = BASE64.decode(base64_payload(&page.data).trim())?;
        let source = image::load_from_memory(&bytes)?;

        let mut last: Option<(String, CompressionInfo)> = None;

        // 每一档都从原图重新编码，避免多次有损叠加
        for (index, preset) in self.presets.iter().enumerate() {
            let encoded = encode_jpeg(&source, preset)?;
            let data = BASE64.encode(&encoded);
            let compressed_size = estimate_decoded_size(&data);

            debug!(
                "第 {} 页 预设 {}/{} (质量 {:.1}, 最大宽度 {}): {} 字节",
                page.page_number,
                index + 1,
                self.presets.len(),
                preset.quality,
                preset.max_width,
                compressed_size
            );

            let info = CompressionInfo {
                original_size,
                compressed_size,
                quality: preset.quality,
                max_width: preset.max_width,
                presets_applied: index + 1,
            };
            last = Some((data, info));

            if compressed_size <= self.threshold {
                break;
            }
        }

        let Some((data, info)) = last else {
            return Ok(page.clone());
        };

        if info.compressed_size > self.threshold {
            warn!(
                "⚠️ 第 {} 页已用尽压缩预设，仍有 {:.2} MB",
                page.page_number,
                to_mb(info.compressed_size)
            );
        } else {
            info!(
                "✓ 第 {} 页压缩完成: {:.2} MB → {:.2} MB",
                page.page_number,
                to_mb(info.original_size),
                to_mb(info.compressed_size)
            );
        }

        Ok(PageImage {
            data,
            filename: jpeg_filename(&page.filename),
            path: page.path.as_deref().map(jpeg_filename),
            compression: Some(info),
            ..page.clone()
        })
    }
}

fn encode_jpeg(source: &DynamicImage, preset: &CompressionPreset) -> Result<Vec<u8>, image::ImageError> {
    let resized = if source.width() > preset.max_width {
        let height = (u64::from(source.height()) * u64::from(preset.max_width) / u64::from(source.width())).max(1);
        source.resize_exact(preset.max_width, height as u32, FilterType::Triangle)
    } else {
        source.clone()
    };

    // JPEG 不支持透明通道
    let rgb = resized.to_rgb8();
    let quality = (preset.quality * 100.0).round().clamp(1.0, 100.0) as u8;

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
    Ok(out)
}

fn jpeg_filename(filename: &str) -> String {
    Path::new(filename).with_extension("jpg").to_string_lossy().to_string()
}

fn to_mb(bytes: usize) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
