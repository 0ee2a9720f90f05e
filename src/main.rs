use clap::{Args, Parser, Subcommand};
use qrpress::fault::{FaultConfig, FaultHandler};
use qrpress::{
    deliver, Color, ErrorCorrectionLevel, LabelAlignment, LabelFont, QrBuilder, QrError,
    RoundBlockSizeMode, WriterFormat,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about = "qrpress - render QR codes as PNG, SVG, WebP or PDF", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Show fault details instead of a correlation code
    #[arg(long, global = true, env = "QRPRESS_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a QR code and print it as a data URI, or save it to a file
    Generate(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Text to encode
    #[arg(long)]
    data: String,

    /// Output format
    #[arg(long, default_value = "svg")]
    format: WriterFormat,

    /// Symbol size in pixels, without the margin
    #[arg(long, default_value_t = 300)]
    size: i64,

    /// Quiet zone around the symbol in pixels
    #[arg(long, default_value_t = 10)]
    margin: i64,

    /// Error correction level (L, M, Q, H)
    #[arg(long, default_value = "H")]
    ecc: ErrorCorrectionLevel,

    /// Block size rounding (none, margin, enlarge, shrink)
    #[arg(long, default_value = "margin")]
    round_mode: RoundBlockSizeMode,

    /// Character encoding of the payload
    #[arg(long, default_value = "UTF-8")]
    encoding: String,

    /// Logo placed in the centre of the symbol
    #[arg(long)]
    logo: Option<PathBuf>,

    #[arg(long)]
    logo_width: Option<u32>,

    #[arg(long)]
    logo_height: Option<u32>,

    /// Clear the modules behind the logo
    #[arg(long)]
    punchout: bool,

    /// Caption drawn below the symbol
    #[arg(long)]
    label: Option<String>,

    #[arg(long, default_value_t = LabelFont::DEFAULT_SIZE)]
    label_size: f32,

    /// TrueType/OpenType file for the caption
    #[arg(long)]
    label_font: Option<PathBuf>,

    /// Caption alignment (left, center, right)
    #[arg(long, default_value = "center")]
    align: LabelAlignment,

    /// Foreground color, #RRGGBB or #RRGGBBAA
    #[arg(long, default_value = "#000000")]
    fg: Color,

    /// Background color, #RRGGBB or #RRGGBBAA
    #[arg(long, default_value = "#ffffff")]
    bg: Color,

    /// Read raster output back and check it against the encoded data
    #[arg(long)]
    validate: bool,

    /// Directory to save the file in
    #[arg(long, requires = "name")]
    out_dir: Option<PathBuf>,

    /// File name without extension
    #[arg(long, requires = "out_dir")]
    name: Option<String>,

    /// Print an HTML tag instead of a data URI
    #[arg(long)]
    embed_tag: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let guard = FaultHandler::new(FaultConfig::default().debug(cli.debug)).install();
    let result = guard.run(|| match cli.command {
        Commands::Generate(args) => generate(args),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn generate(args: GenerateArgs) -> Result<(), QrError> {
    let mut builder = QrBuilder::new();
    builder
        .writer(args.format)
        .payload(args.data)
        .encoding(&args.encoding)?
        .pixel_size(args.size)?
        .margin(args.margin)?
        .error_correction_level(args.ecc)
        .round_block_size_mode(args.round_mode)
        .logo_resize_width(args.logo_width)?
        .logo_resize_height(args.logo_height)?
        .logo_punchout_background(args.punchout)
        .label_alignment(args.align)
        .foreground_color(args.fg)
        .background_color(args.bg)
        .validate_result(args.validate);

    if let Some(logo) = args.logo {
        builder.logo_path(logo);
    }
    if let Some(label) = args.label {
        builder.label_text(label);
    }
    let font = match args.label_font {
        Some(path) => LabelFont::from_file(path, args.label_size),
        None => LabelFont::new(LabelFont::DEFAULT_FAMILY, args.label_size),
    };
    builder.label_font(font)?;

    if let (Some(dir), Some(name)) = (args.out_dir, args.name) {
        let artifact = builder.save_to_file(&name, &dir)?;
        tracing::info!(
            path = %dir.join(format!("{name}.{}", artifact.format().extension())).display(),
            bytes = artifact.len(),
            "saved QR code"
        );
        return Ok(());
    }

    let artifact = builder.build()?;
    if args.embed_tag {
        println!("{}", deliver::embed_tag(&artifact));
    } else {
        println!("{}", deliver::embed_string(&artifact));
    }
    Ok(())
}
