use qrpress::config::ValidatedConfig;
use qrpress::render::Logo;
use qrpress::{deliver, Artifact, EncodeError, ErrorKind, QrBuilder, QrError, WriterFormat};
use std::error::Error as _;
use std::fs;

#[test]
fn png_build_end_to_end() {
    let mut builder = QrBuilder::new();
    builder.payload("Test QR Code").writer_format("png").unwrap();

    let artifact = builder.build().unwrap();
    assert!(!artifact.is_empty());
    assert_eq!(artifact.mime_type(), "image/png");
    assert_eq!(artifact.format(), WriterFormat::Png);

    let decoded = image::load_from_memory(artifact.content()).unwrap();
    // 300px symbol plus a 10px margin on each side
    assert_eq!(decoded.width(), 320);
}

#[test]
fn every_format_builds_with_its_mime_family() {
    for format in WriterFormat::ALL {
        let mut builder = QrBuilder::new();
        builder.payload("https://example.com/a?b=c").writer(format);
        let artifact = builder.build().unwrap();

        assert!(!artifact.is_empty(), "{format} produced no content");
        let family = match format {
            WriterFormat::Pdf => "application/",
            _ => "image/",
        };
        assert!(artifact.mime_type().starts_with(family), "{format}: {}", artifact.mime_type());
    }
}

#[test]
fn empty_payload_always_fails() {
    let mut builder = QrBuilder::new();
    builder
        .writer_format("webp")
        .unwrap()
        .label_text("caption")
        .pixel_size(100)
        .unwrap();
    assert!(matches!(builder.build(), Err(QrError::MissingData)));
}

#[test]
fn unsupported_format_keeps_the_previous_writer() {
    let mut builder = QrBuilder::new();
    builder.writer_format("pdf").unwrap().writer_option("unit", "pt").unwrap();
    let options = builder.writer_options().clone();

    let err = builder.writer_format("gif").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(builder.format(), WriterFormat::Pdf);
    assert_eq!(builder.writer_options(), &options);
}

#[test]
fn repeated_builds_are_identical() {
    let mut builder = QrBuilder::new();
    builder.payload("same input").label_text("same label");
    for format in WriterFormat::ALL {
        builder.writer(format);
        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first.content(), second.content(), "{format} is not deterministic");
    }
}

#[test]
fn save_to_file_writes_the_artifact() {
    let mut builder = QrBuilder::new();
    builder.writer_format("svg").unwrap().payload("Testing SaveFile");

    let artifact = builder.save_to_file("testing", "/tmp").unwrap();
    let written = fs::read("/tmp/testing.svg").unwrap();
    assert!(!written.is_empty());
    assert_eq!(written, artifact.content());
}

#[test]
fn save_to_file_rejects_bad_targets() {
    let mut builder = QrBuilder::new();
    builder.payload("data");

    let err = builder.save_to_file("bad name!", "/tmp").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidFilename);

    let err = builder.save_to_file("ok_name", "/nonexistent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPath);
}

#[test]
fn empty_artifacts_embed_as_the_sentinel() {
    let artifact = Artifact::new(WriterFormat::Png, Vec::new());
    assert_eq!(deliver::embed_string(&artifact), "Invalid file data.");
}

#[test]
fn pdf_artifacts_embed_as_embed_tags() {
    let artifact = qrpress::qr("document", "pdf", "", "").unwrap();
    let tag = deliver::embed_tag(&artifact);
    assert!(tag.starts_with("<embed "));
    assert!(tag.contains("type=\"application/pdf\""));
}

#[test]
fn encoder_faults_become_build_failed() {
    let failing = |_: &ValidatedConfig| -> Result<Artifact, EncodeError> {
        Err("font resource is corrupt".into())
    };
    let mut builder = QrBuilder::with_encoder(failing);
    builder.payload("data");

    let err = builder.build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuildFailed);
    assert_eq!(err.source().unwrap().to_string(), "font resource is corrupt");
}

#[test]
fn missing_logo_is_a_build_failure() {
    let err = qrpress::qr("data", "png", "/nonexistent/logo.png", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BuildFailed);
}

#[test]
fn logo_files_are_resized_and_drawn() {
    let path = std::env::temp_dir().join(format!("qrpress-logo-{}.png", std::process::id()));
    image::RgbaImage::from_pixel(40, 20, image::Rgba([200, 0, 0, 255]))
        .save(&path)
        .unwrap();

    let mut builder = QrBuilder::new();
    builder
        .payload("https://example.com/logo")
        .logo_path(&path)
        .logo_resize_width(Some(60))
        .unwrap()
        .logo_punchout_background(true)
        .validate_result(true);

    let config = builder.draft().validate().unwrap();
    let logo = Logo::load(config.logo().unwrap(), 320).unwrap();
    assert_eq!(logo.image().dimensions(), (60, 30));

    builder.writer(WriterFormat::Png);
    let png = builder.build().unwrap();
    let decoded = image::load_from_memory(png.content()).unwrap().to_rgba8();
    // centre pixel belongs to the logo
    let [r, g, b, _] = decoded.get_pixel(160, 160).0;
    assert!(r > 150 && g < 50 && b < 50, "centre pixel is {r},{g},{b}");

    builder.validate_result(false).writer(WriterFormat::Svg);
    let svg = String::from_utf8(builder.build().unwrap().content().to_vec()).unwrap();
    assert!(svg.contains("data:image/png;base64,"));

    builder.writer(WriterFormat::Pdf);
    let pdf = builder.build().unwrap();
    assert!(pdf.content().windows(7).any(|w| w == b"/Im1 Do"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn oversized_logo_resize_is_rejected() {
    let mut builder = QrBuilder::new();
    builder.payload("data");
    let err = builder.logo_resize_width(Some(200_000)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}
