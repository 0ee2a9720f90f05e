//! SVG writer.

use super::{fmt_num, label, raster, Canvas, Renderer};
use crate::config::Color;
use crate::error::EncodeError;
use crate::escape;
use crate::writer::{WriterFormat, WriterOptions};
use base64::Engine;
use image::codecs::png::CompressionType;

/// Writes SVG documents.
///
/// Options: `block_id`, `exclude_xml_declaration`, `exclude_svg_width_and_height`,
/// `force_xlink_href` and `compact` (one `<path>` for all modules instead of a
/// `<use>` per module).
#[derive(Clone, Copy, Debug, Default)]
pub struct SvgRenderer;

fn paint(attribute: &str, color: Color) -> String {
    let mut out = format!(" {attribute}=\"{}\"", color.to_hex());
    if color.a < 255 {
        out += &format!(" {attribute}-opacity=\"{}\"", fmt_num(color.opacity()));
    }
    out
}

impl Renderer for SvgRenderer {
    fn format(&self) -> WriterFormat {
        WriterFormat::Svg
    }

    // The string always uses Unix newlines (\n), regardless of the platform.
    fn render(&self, canvas: &Canvas<'_>, options: &WriterOptions) -> Result<Vec<u8>, EncodeError> {
        let block_id = options.str("block_id").unwrap_or("block");
        let exclude_xml_declaration = options.bool("exclude_xml_declaration").unwrap_or(false);
        let exclude_size = options.bool("exclude_svg_width_and_height").unwrap_or(false);
        let xlink = options.bool("force_xlink_href").unwrap_or(false);
        let compact = options.bool("compact").unwrap_or(true);
        let href = if xlink { "xlink:href" } else { "href" };

        let layout = canvas.layout();
        let (width, height) = (canvas.width(), canvas.height());
        let block = fmt_num(layout.block_size());

        let mut result = String::new();
        if !exclude_xml_declaration {
            result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        }
        result += "<svg xmlns=\"http://www.w3.org/2000/svg\"";
        if xlink {
            result += " xmlns:xlink=\"http://www.w3.org/1999/xlink\"";
        }
        result += " version=\"1.1\"";
        if !exclude_size {
            result += &format!(" width=\"{width}px\" height=\"{height}px\"");
        }
        result += &format!(" viewBox=\"0 0 {width} {height}\">\n");

        if !compact {
            result += &format!(
                "\t<defs>\n\t\t<rect id=\"{}\" width=\"{block}\" height=\"{block}\"{}/>\n\t</defs>\n",
                escape::html(block_id),
                paint("fill", canvas.foreground()),
            );
        }
        result += &format!(
            "\t<rect x=\"0\" y=\"0\" width=\"{width}\" height=\"{height}\"{}/>\n",
            paint("fill", canvas.background()),
        );

        let matrix = canvas.matrix();
        if compact {
            result += "\t<path d=\"";
            for (i, (x, y)) in matrix.dark_modules().enumerate() {
                if i != 0 {
                    result += " ";
                }
                result += &format!(
                    "M{},{}h{block}v{block}h-{block}z",
                    fmt_num(layout.module_offset(x)),
                    fmt_num(layout.module_offset(y)),
                );
            }
            result += &format!("\"{}/>\n", paint("fill", canvas.foreground()));
        } else {
            let target = escape::html(block_id);
            for (x, y) in matrix.dark_modules() {
                result += &format!(
                    "\t<use x=\"{}\" y=\"{}\" {href}=\"#{target}\"/>\n",
                    fmt_num(layout.module_offset(x)),
                    fmt_num(layout.module_offset(y)),
                );
            }
        }

        if let (Some(logo), Some((left, top))) = (canvas.logo(), canvas.logo_origin()) {
            let (w, h) = logo.image().dimensions();
            if logo.punchout() {
                result += &format!(
                    "\t<rect x=\"{left}\" y=\"{top}\" width=\"{w}\" height=\"{h}\"{}/>\n",
                    paint("fill", canvas.background()),
                );
            }
            let png = raster::encode_png(logo.image(), CompressionType::Default)?;
            let data = base64::engine::general_purpose::STANDARD.encode(&png);
            result += &format!(
                "\t<image x=\"{left}\" y=\"{top}\" width=\"{w}\" height=\"{h}\" {href}=\"data:image/png;base64,{data}\"/>\n"
            );
        }

        if let Some(spec) = canvas.label() {
            let text = label::svg_text(
                spec,
                spec.font().family(),
                width,
                f64::from(layout.outer_size()),
                canvas.foreground(),
            );
            result += &format!("\t{text}\n");
        }

        result += "</svg>\n";
        Ok(result.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoundBlockSizeMode;
    use crate::render::tests::config_with;
    use crate::render::{Layout, ModuleMatrix};
    use crate::writer::OptionValue;

    fn render(options: &WriterOptions) -> String {
        let config = config_with(|_| {});
        let matrix = ModuleMatrix::from_fn(21, |x, y| x == 0 && y < 2);
        let layout = Layout::compute(21, 210, 10, RoundBlockSizeMode::Margin).unwrap();
        let canvas = Canvas::new(&matrix, layout, &config, None).unwrap();
        String::from_utf8(SvgRenderer.render(&canvas, options).unwrap()).unwrap()
    }

    #[test]
    fn compact_output_uses_a_single_path() {
        let svg = render(&WriterOptions::defaults_for(WriterFormat::Svg));

        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("width=\"230px\" height=\"230px\" viewBox=\"0 0 230 230\""));
        assert!(svg.contains("<path d=\"M10,10h10v10h-10z M10,20h10v10h-10z\" fill=\"#000000\"/>"));
        assert!(!svg.contains("<use"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[test]
    fn expanded_output_references_the_block() {
        let options = WriterOptions::defaults_for(WriterFormat::Svg)
            .with_override(WriterFormat::Svg, "compact", OptionValue::Bool(false))
            .and_then(|o| o.with_override(WriterFormat::Svg, "force_xlink_href", true.into()))
            .and_then(|o| o.with_override(WriterFormat::Svg, "exclude_xml_declaration", true.into()))
            .and_then(|o| o.with_override(WriterFormat::Svg, "block_id", "px".into()))
            .unwrap();
        let svg = render(&options);

        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink="));
        assert!(svg.contains("<rect id=\"px\" width=\"10\" height=\"10\" fill=\"#000000\"/>"));
        assert_eq!(svg.matches("xlink:href=\"#px\"").count(), 2);
    }

    #[test]
    fn size_attributes_can_be_dropped() {
        let options = WriterOptions::defaults_for(WriterFormat::Svg)
            .with_override(WriterFormat::Svg, "exclude_svg_width_and_height", true.into())
            .unwrap();
        let svg = render(&options);
        assert!(!svg.contains("width=\"230px\""));
        assert!(svg.contains("viewBox=\"0 0 230 230\""));
    }
}
