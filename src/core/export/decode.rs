//! Direct color lookup

use crate::core::color::Color;
use crate::core::registry::{SpanRecord, SpanRegistry};
use crate::model::{decompose_font_flags, ExtractedShape, ExtractedToken, OutputRecord};

/// Decode a word by its fill color.
pub fn decode_token(token: &ExtractedToken, registry: &SpanRegistry) -> OutputRecord {
    let span = match Color::from_hex(&token.color) {
        Ok(color) => registry.get(&color),
        Err(e) => {
            log::debug!("word '{}': {}", token.text, e);
            None
        }
    };
    let mut record = placeholder(token.page, span);
    record.text = Some(token.text.clone());
    record.x0 = token.bbox.x0;
    record.y0 = token.bbox.y0;
    record.x1 = token.bbox.x1;
    record.y1 = token.bbox.y1;
    record.font = Some(token.font.clone());
    record.font_size = Some(token.font_size);
    record.flags = decompose_font_flags(token.flags).join(",");
    record
}

/// Decode a rectangle by its stroking color, quantized to tenths.
pub fn decode_shape(shape: &ExtractedShape, registry: &SpanRegistry) -> OutputRecord {
    let span = match shape.stroking_color.as_slice() {
        &[r, g, b] => Color::from_unit_rgb(r, g, b).and_then(|c| registry.get(&c)),
        _ => None,
    };
    let mut record = placeholder(shape.page, span);
    record.x0 = shape.bbox.x0;
    record.y0 = shape.bbox.y0;
    record.x1 = shape.bbox.x1;
    record.y1 = shape.bbox.y1;
    record
}

fn placeholder(page: u32, span: Option<&SpanRecord>) -> OutputRecord {
    let mut record = OutputRecord {
        reading_order: -1,
        order_offset: 0,
        label: None,
        block_id: -1,
        section_id: -1,
        text: None,
        page,
        x0: 0.0,
        y0: 0.0,
        x1: 0.0,
        y1: 0.0,
        font: None,
        font_size: None,
        flags: String::new(),
        source_text: None,
    };
    if let Some(span) = span {
        record.reading_order = span.reading_order as i64;
        record.label = Some(span.label);
        record.block_id = span.block_id as i64;
        record.section_id = span.section_id as i64;
        record.source_text = Some(span.source_text.clone());
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BBox, Label};

    fn registry() -> SpanRegistry {
        let mut registry = SpanRegistry::new();
        registry.insert(
            Color::Rgb([255, 0, 3]),
            SpanRecord {
                label: Label::Caption,
                reading_order: 4,
                section_id: 2,
                block_id: 9,
                source_text: "cat.".to_string(),
            },
        );
        registry.insert(
            Color::Tenths([0, 3, 10]),
            SpanRecord {
                label: Label::Figure,
                reading_order: 3,
                section_id: 2,
                block_id: 8,
                source_text: r"\includegraphics{a}".to_string(),
            },
        );
        registry
    }

    #[test]
    fn test_decode_known_token() {
        let token = ExtractedToken {
            text: "cat.".to_string(),
            page: 2,
            bbox: BBox {
                x0: 1.0,
                y0: 2.0,
                x1: 3.0,
                y1: 4.0,
            },
            color: "#ff0003".to_string(),
            font: "CMR10".to_string(),
            font_size: 9.5,
            flags: 0b10100,
            line_no: 0,
        };
        let record = decode_token(&token, &registry());
        assert_eq!(record.reading_order, 4);
        assert_eq!(record.label, Some(Label::Caption));
        assert_eq!(record.block_id, 9);
        assert_eq!(record.flags, "serifed,proportional,bold");
        assert_eq!(record.source_text.as_deref(), Some("cat."));
        assert_eq!(record.x1, 3.0);
    }

    #[test]
    fn test_unknown_and_malformed_colors_are_placeholders() {
        let mut token = ExtractedToken {
            text: "x".to_string(),
            page: 1,
            bbox: BBox::default(),
            color: "#000000".to_string(),
            font: String::new(),
            font_size: 0.0,
            flags: 0,
            line_no: 0,
        };
        let record = decode_token(&token, &registry());
        assert!(!record.is_resolved());
        assert_eq!(record.section_id, -1);
        token.color = "black".to_string();
        assert_eq!(decode_token(&token, &registry()).label, None);
    }

    #[test]
    fn test_decode_shape_rounds_channels() {
        let shape = ExtractedShape {
            page: 1,
            bbox: BBox::default(),
            stroking_color: vec![0.0, 0.2999, 1.0],
        };
        let record = decode_shape(&shape, &registry());
        assert_eq!(record.label, Some(Label::Figure));
        assert_eq!(record.text, None);

        let grey = ExtractedShape {
            stroking_color: vec![0.5],
            ..shape
        };
        assert!(!decode_shape(&grey, &registry()).is_resolved());
    }
}
