//! Artifact delivery: inline embed strings, markup tags and saved files.

use crate::artifact::Artifact;
use crate::error::QrError;
use crate::escape;
use base64::Engine;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Returned instead of an embed string or tag when the artifact has no content.
pub const INVALID_FILE_DATA: &str = "Invalid file data.";

/// Returned by [`embed_tag`] for MIME types without a markup representation.
pub const UNSUPPORTED_FILE_TYPE: &str = "Unsupported file type.";

/// Returns the artifact as a `data:<mime>;base64,<content>` URI.
///
/// Empty content yields [`INVALID_FILE_DATA`]; this never fails.
///
/// # Example
/// ```
/// use qrpress::{deliver, Artifact, WriterFormat};
///
/// let artifact = Artifact::new(WriterFormat::Svg, b"<svg/>".to_vec());
/// assert_eq!(deliver::embed_string(&artifact), "data:image/svg+xml;base64,PHN2Zy8+");
/// ```
pub fn embed_string(artifact: &Artifact) -> String {
    if artifact.is_empty() {
        return INVALID_FILE_DATA.to_string();
    }
    let data = base64::engine::general_purpose::STANDARD.encode(artifact.content());
    format!("data:{};base64,{data}", artifact.mime_type())
}

/// Returns a ready-to-insert HTML snippet showing the artifact.
///
/// Raster images become `<img>`, SVG documents `<object>` and PDF documents
/// `<embed>`. Attribute values are HTML-escaped.
pub fn embed_tag(artifact: &Artifact) -> String {
    if artifact.is_empty() {
        return INVALID_FILE_DATA.to_string();
    }
    markup(artifact.mime_type(), &embed_string(artifact))
}

fn markup(mime_type: &str, src: &str) -> String {
    let src = escape::html(src);
    match mime_type {
        "image/png" => format!("<img src=\"{src}\" alt=\"PNG Image\" />"),
        "image/webp" => format!("<img src=\"{src}\" alt=\"WebP Image\" />"),
        "image/svg+xml" => format!(
            "<object type=\"image/svg+xml\" data=\"{src}\" width=\"300\" height=\"300\">SVG Image</object>"
        ),
        "application/pdf" => format!(
            "<embed src=\"{src}\" type=\"application/pdf\" width=\"600\" height=\"800\" title=\"PDF Document\">"
        ),
        _ => UNSUPPORTED_FILE_TYPE.to_string(),
    }
}

/// Checks a base name against `[A-Za-z0-9 _-]+`.
fn valid_base_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
}

/// Rejects a base name outside `[A-Za-z0-9 _-]+` or a directory that does not exist.
pub(crate) fn check_target(dir: &Path, base_name: &str) -> Result<(), QrError> {
    if !valid_base_name(base_name) {
        return Err(QrError::InvalidFilename {
            name: base_name.to_string(),
        });
    }
    if !dir.is_dir() {
        return Err(QrError::InvalidPath {
            path: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Writes the artifact to `{dir}/{base_name}.{extension}` and returns it.
///
/// The content goes to a temporary sibling first and is renamed into place, so
/// readers never observe a partial file. An existing file is replaced.
///
/// # Errors
///
/// - [`QrError::InvalidFilename`] when `base_name` is not `[A-Za-z0-9 _-]+`
/// - [`QrError::InvalidPath`] when `dir` is not an existing directory
/// - [`QrError::PersistFailed`] when writing or renaming fails
pub fn save_to_file(
    artifact: Artifact,
    dir: impl AsRef<Path>,
    base_name: &str,
) -> Result<Artifact, QrError> {
    let dir = dir.as_ref();
    check_target(dir, base_name)?;

    let target = dir.join(format!("{base_name}.{}", artifact.format().extension()));
    let staging = dir.join(format!(
        ".{base_name}.{}.{}.tmp",
        artifact.format().extension(),
        std::process::id()
    ));

    if let Err(source) = write_staged(&staging, &target, artifact.content()) {
        if staging.exists() {
            if let Err(err) = fs::remove_file(&staging) {
                tracing::warn!(path = %staging.display(), error = %err, "failed to remove staging file");
            }
        }
        return Err(QrError::PersistFailed {
            path: target,
            source,
        });
    }

    tracing::debug!(path = %target.display(), bytes = artifact.len(), "saved QR code");
    Ok(artifact)
}

fn write_staged(staging: &Path, target: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(staging)?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);
    fs::rename(staging, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::writer::WriterFormat;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qrpress-deliver-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn tag_attributes_are_escaped() {
        let tag = markup("image/png", "x\" onerror=\"alert('1')");
        assert_eq!(
            tag,
            "<img src=\"x&quot; onerror=&quot;alert(&#39;1&#39;)\" alt=\"PNG Image\" />"
        );

        let tag = markup("application/pdf", "a&b<c>");
        assert!(tag.contains("src=\"a&amp;b&lt;c&gt;\""));
        assert_eq!(markup("image/gif", "x"), UNSUPPORTED_FILE_TYPE);
    }

    #[test]
    fn empty_artifacts_yield_the_sentinel() {
        let empty = Artifact::new(WriterFormat::Png, Vec::new());
        assert_eq!(embed_string(&empty), INVALID_FILE_DATA);
        assert_eq!(embed_tag(&empty), INVALID_FILE_DATA);
    }

    #[test]
    fn tags_follow_the_mime_type() {
        let png = Artifact::new(WriterFormat::Png, vec![1, 2, 3]);
        assert_eq!(embed_tag(&png), "<img src=\"data:image/png;base64,AQID\" alt=\"PNG Image\" />");

        let svg = Artifact::new(WriterFormat::Svg, b"<svg/>".to_vec());
        assert!(embed_tag(&svg).starts_with("<object type=\"image/svg+xml\" data=\"data:image/svg+xml;base64,"));

        let pdf = Artifact::new(WriterFormat::Pdf, b"%PDF".to_vec());
        assert!(embed_tag(&pdf).contains("type=\"application/pdf\""));

        let other = Artifact::with_mime_type(WriterFormat::Png, "image/gif", vec![1]);
        assert_eq!(embed_tag(&other), UNSUPPORTED_FILE_TYPE);
    }

    #[test]
    fn base_names_are_restricted() {
        assert!(valid_base_name("qr code_01-final"));
        assert!(!valid_base_name("bad name!"));
        assert!(!valid_base_name("../escape"));
        assert!(!valid_base_name(""));
    }

    #[test]
    fn saving_replaces_the_file_atomically() {
        let dir = scratch_dir("save");
        let first = Artifact::new(WriterFormat::Svg, b"<svg>1</svg>".to_vec());
        let second = Artifact::new(WriterFormat::Svg, b"<svg>2</svg>".to_vec());

        save_to_file(first, &dir, "code").unwrap();
        let saved = save_to_file(second.clone(), &dir, "code").unwrap();

        assert_eq!(saved, second);
        assert_eq!(fs::read(dir.join("code.svg")).unwrap(), b"<svg>2</svg>");
        let leftovers = fs::read_dir(&dir)
            .unwrap()
            .filter(|entry| entry.as_ref().unwrap().file_name() != "code.svg")
            .count();
        assert_eq!(leftovers, 0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_targets_are_rejected() {
        let artifact = Artifact::new(WriterFormat::Png, vec![1]);
        let err = save_to_file(artifact.clone(), "/tmp", "bad name!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFilename);

        let err = save_to_file(artifact, "/nonexistent", "ok_name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }
}
