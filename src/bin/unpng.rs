use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use unpng::decode_png_to_bitmap;

/// Decodes a PNG file and writes the pixels out as a binary PAM file.
#[derive(Parser, Debug)]
#[command(name = "unpng", version, about)]
struct Cli {
  /// The PNG file to decode.
  #[arg(default_value = "test.png")]
  path: PathBuf,

  /// Where to write the RGBA output (defaults to the input path with a
  /// `.pam` extension).
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Show per-chunk and per-block decoding detail.
  #[arg(short, long)]
  verbose: bool,
}

fn main() {
  let cli = Cli::parse();

  let subscriber = tracing_subscriber::fmt()
    .with_max_level(if cli.verbose { tracing::Level::TRACE } else { tracing::Level::INFO })
    .with_target(false)
    .with_writer(std::io::stderr)
    .finish();
  let _ = tracing::subscriber::set_global_default(subscriber);

  let bytes = match std::fs::read(&cli.path) {
    Ok(bytes) => bytes,
    Err(e) => {
      error!("can't read {}: {e}", cli.path.display());
      std::process::exit(1);
    }
  };

  let bitmap = match decode_png_to_bitmap(&bytes) {
    Ok(bitmap) => bitmap,
    Err(e) => {
      error!("{}: {e}", cli.path.display());
      std::process::exit(1);
    }
  };

  let output = cli.output.unwrap_or_else(|| cli.path.with_extension("pam"));
  if let Err(e) = write_pam(&output, &bitmap) {
    error!("can't write {}: {e}", output.display());
    std::process::exit(1);
  }
  info!(
    "wrote {width}x{height} pixels to {out}",
    width = bitmap.width,
    height = bitmap.height,
    out = output.display()
  );
}

/// Binary PAM: the netpbm format that keeps the alpha channel.
fn write_pam(path: &PathBuf, bitmap: &unpng::Bitmap<unpng::RGBA8888>) -> std::io::Result<()> {
  let mut out = format!(
    "P7\nWIDTH {}\nHEIGHT {}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n",
    bitmap.width, bitmap.height
  )
  .into_bytes();
  out.extend_from_slice(bytemuck::cast_slice(&bitmap.pixels));
  std::fs::write(path, out)
}
