//! PDF writer.
//!
//! Produces a single-page PDF 1.4 document whose page is exactly the symbol
//! (plus the label strip), measured in the configured unit. Modules are filled
//! rectangles, the logo is an RGB image XObject and the label uses the
//! built-in Helvetica font. Output is deterministic: no dates or IDs.

use super::{fmt_num, label, Canvas, Renderer};
use crate::config::{Color, LabelAlignment};
use crate::error::EncodeError;
use crate::writer::{WriterFormat, WriterOptions};
use std::fmt::Write as _;

/// Writes PDF documents.
///
/// Options: `unit` (`pt`, `mm`, `cm`, `in`), `x` and `y` (offset of the symbol
/// on the page, in units) and `link` (URI the symbol links to, or null).
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfRenderer;

/// Average Helvetica glyph width as a fraction of the font size.
const HELVETICA_AVG_WIDTH: f64 = 0.5;

fn points_per_unit(unit: &str) -> Result<f64, EncodeError> {
    match unit {
        "pt" => Ok(1.0),
        "mm" => Ok(72.0 / 25.4),
        "cm" => Ok(72.0 / 2.54),
        "in" => Ok(72.0),
        other => Err(format!("unsupported pdf unit `{other}`; expected pt, mm, cm or in").into()),
    }
}

fn rgb(color: Color) -> String {
    format!(
        "{} {} {}",
        fmt_num(f64::from(color.r) / 255.0),
        fmt_num(f64::from(color.g) / 255.0),
        fmt_num(f64::from(color.b) / 255.0)
    )
}

/// Escapes a string literal; characters outside Latin-1 become `?`.
fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            c if (c as u32) < 0x100 => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}

struct Page {
    /// Points per unit.
    k: f64,
    height: f64,
}

impl Page {
    /// Converts a top-left based coordinate in units to PDF points.
    fn y(&self, top: f64, extent: f64) -> f64 {
        (self.height - top - extent) * self.k
    }
}

impl Renderer for PdfRenderer {
    fn format(&self) -> WriterFormat {
        WriterFormat::Pdf
    }

    fn render(&self, canvas: &Canvas<'_>, options: &WriterOptions) -> Result<Vec<u8>, EncodeError> {
        let k = points_per_unit(options.str("unit").unwrap_or("mm"))?;
        let offset_x = options.int("x").unwrap_or(0) as f64;
        let offset_y = options.int("y").unwrap_or(0) as f64;
        let link = options.str("link");

        let layout = canvas.layout();
        let width = f64::from(canvas.width());
        let page = Page {
            k,
            height: f64::from(canvas.height()),
        };
        let block = layout.block_size();

        let mut content = String::new();
        let _ = writeln!(content, "{} rg", rgb(canvas.background()));
        let _ = writeln!(content, "0 0 {} {} re f", fmt_num(width * k), fmt_num(page.height * k));

        let _ = writeln!(content, "{} rg", rgb(canvas.foreground()));
        for (x, y) in canvas.matrix().dark_modules() {
            let left = offset_x + layout.module_offset(x);
            let top = offset_y + layout.module_offset(y);
            let _ = writeln!(
                content,
                "{} {} {} {} re",
                fmt_num(left * k),
                fmt_num(page.y(top, block)),
                fmt_num(block * k),
                fmt_num(block * k)
            );
        }
        content += "f\n";

        let mut image = None;
        if let (Some(logo), Some((left, top))) = (canvas.logo(), canvas.logo_origin()) {
            let (w, h) = logo.image().dimensions();
            let (left, top) = (offset_x + f64::from(left), offset_y + f64::from(top));
            let (w, h) = (f64::from(w), f64::from(h));
            if logo.punchout() {
                let _ = writeln!(content, "{} rg", rgb(canvas.background()));
                let _ = writeln!(
                    content,
                    "{} {} {} {} re f",
                    fmt_num(left * k),
                    fmt_num(page.y(top, h)),
                    fmt_num(w * k),
                    fmt_num(h * k)
                );
            }
            let _ = writeln!(
                content,
                "q {} 0 0 {} {} {} cm /Im1 Do Q",
                fmt_num(w * k),
                fmt_num(h * k),
                fmt_num(left * k),
                fmt_num(page.y(top, h))
            );
            image = Some(logo_xobject(logo.image(), canvas.background()));
        }

        if let Some(spec) = canvas.label() {
            let size = f64::from(spec.font().size());
            let text_width = size * HELVETICA_AVG_WIDTH * spec.text().chars().count() as f64;
            let (anchor, _) = label::anchor(spec.alignment(), canvas.width());
            let left = match spec.alignment() {
                LabelAlignment::Left => anchor,
                LabelAlignment::Center => anchor - text_width / 2.0,
                LabelAlignment::Right => anchor - text_width,
            };
            let baseline = f64::from(layout.outer_size()) + label::baseline(spec.font());
            let _ = writeln!(content, "{} rg", rgb(canvas.foreground()));
            let _ = writeln!(
                content,
                "BT /F1 {} Tf {} {} Td {} Tj ET",
                fmt_num(size * k),
                fmt_num(left.max(0.0) * k),
                fmt_num(page.y(baseline, 0.0)),
                pdf_string(spec.text())
            );
        }

        let annotation = link.map(|uri| {
            let left = offset_x + layout.margin_left();
            let top = offset_y + layout.margin_left();
            let inner = layout.inner_size();
            format!(
                "<< /Type /Annot /Subtype /Link /Rect [{} {} {} {}] /Border [0 0 0] /A << /S /URI /URI {} >> >>",
                fmt_num(left * k),
                fmt_num(page.y(top, inner)),
                fmt_num((left + inner) * k),
                fmt_num(page.y(top, 0.0)),
                pdf_string(uri)
            )
        });

        Ok(assemble(
            width * k,
            page.height * k,
            content.into_bytes(),
            image,
            annotation,
        ))
    }
}

/// Image XObject body for the logo, alpha composited onto `background`.
fn logo_xobject(img: &image::RgbaImage, background: Color) -> Vec<u8> {
    let mut samples = Vec::with_capacity((img.width() * img.height() * 3) as usize);
    for px in img.pixels() {
        let [r, g, b, a] = px.0;
        let alpha = u32::from(a);
        for (channel, bg) in [(r, background.r), (g, background.g), (b, background.b)] {
            let mixed = (u32::from(channel) * alpha + u32::from(bg) * (255 - alpha)) / 255;
            samples.push(mixed as u8);
        }
    }

    let mut body = format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB /BitsPerComponent 8 /Length {} >>\nstream\n",
        img.width(),
        img.height(),
        samples.len()
    )
    .into_bytes();
    body.extend_from_slice(&samples);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Lays out the objects, cross-reference table and trailer.
fn assemble(
    width: f64,
    height: f64,
    content: Vec<u8>,
    image: Option<Vec<u8>>,
    annotation: Option<String>,
) -> Vec<u8> {
    // 1 catalog, 2 pages, 3 page, 4 content, 5 font, then the optional objects
    let image_id = image.as_ref().map(|_| 6);
    let annot_id = annotation.as_ref().map(|_| 6 + usize::from(image.is_some()));

    let mut resources = String::from("/Font << /F1 5 0 R >>");
    if let Some(id) = image_id {
        let _ = write!(resources, " /XObject << /Im1 {id} 0 R >>");
    }
    let annots = annot_id
        .map(|id| format!(" /Annots [{id} 0 R]"))
        .unwrap_or_default();

    let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    stream.extend_from_slice(&content);
    stream.extend_from_slice(b"endstream");

    let mut objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Contents 4 0 R /Resources << {resources} >>{annots} >>",
            fmt_num(width),
            fmt_num(height)
        )
        .into_bytes(),
        stream,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
    ];
    objects.extend(image);
    objects.extend(annotation.map(String::into_bytes));

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref = out.len();
    let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(table, "{offset:010} 00000 n \n");
    }
    let _ = write!(
        table,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
        objects.len() + 1
    );
    out.extend_from_slice(table.as_bytes());
    out
}
