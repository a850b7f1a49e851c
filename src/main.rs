use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use blurpass::blur::software::shader_library;
use blurpass::blur::{BlurMode, DEFAULT_KERNEL, DEFAULT_RADIUS};
use blurpass::logging::{init_logging, LoggingConfig};
use blurpass::{
    AppConfig, Backend, BlurApp, FrameStatus, GpuBackend, SoftwareBackend, SurfaceInfo,
    TextureData,
};

/// Two-pass Gaussian blur of an image.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Image to blur.
    image: PathBuf,

    /// Gaussian radius in texels.
    #[arg(long, default_value_t = DEFAULT_RADIUS)]
    radius: f32,

    /// Taps per side, center included.
    #[arg(long, default_value_t = DEFAULT_KERNEL)]
    kernel: usize,

    /// Start with the unblurred image.
    #[arg(long)]
    original: bool,

    /// Render one frame on the CPU and save it here instead of opening a window.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// With `--output`, render on the GPU into an offscreen screen.
    #[arg(long, requires = "output")]
    gpu: bool,

    /// Log filter, e.g. `debug` or `blurpass=trace,wgpu=warn`.
    #[arg(long)]
    log: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &args.log {
        logging = logging.with_filter(filter);
    }
    init_logging(logging);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    anyhow::ensure!(args.kernel > 0, "--kernel must be at least 1");
    let image = TextureData::decode(&args.image)
        .with_context(|| format!("failed to load {}", args.image.display()))?;

    let title = args
        .image
        .file_name()
        .map_or_else(|| "blurpass".to_string(), |n| n.to_string_lossy().into_owned());
    let mode = if args.original {
        BlurMode::Original
    } else {
        BlurMode::Blurred
    };
    let config = AppConfig::new()
        .title(title)
        .size(image.width, image.height)
        .radius(args.radius)
        .kernel(args.kernel)
        .mode(mode);

    match args.output {
        Some(output) => render_to_file(&image, &config, &output, args.gpu),
        None => blurpass::viewer::run(image, config),
    }
}

fn render_to_file(
    image: &TextureData,
    config: &AppConfig,
    output: &Path,
    gpu: bool,
) -> anyhow::Result<()> {
    let (width, height) = (image.width, image.height);
    let rgba = if gpu {
        let backend = GpuBackend::headless(width, height).context("failed to initialize wgpu")?;
        render_once(backend, image, config)?
            .read_screen_rgba8()
            .context("failed to read back the screen")?
    } else {
        let backend = SoftwareBackend::new(shader_library(), width, height);
        render_once(backend, image, config)?.read_screen_rgba8()
    };

    blurpass::texture::save_rgba8(output, width, height, rgba)
        .with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("wrote {}", output.display());
    Ok(())
}

/// Renders one frame at the image size and hands the backend back for readback.
fn render_once<B: Backend>(
    backend: B,
    image: &TextureData,
    config: &AppConfig,
) -> anyhow::Result<B> {
    let surface = SurfaceInfo::new(image.width, image.height, 1.0);
    let mut app = BlurApp::init(backend, surface, image, config)
        .context("failed to create blur resources")?;

    let status = app.render().context("failed to render")?;
    anyhow::ensure!(status == FrameStatus::Rendered, "frame was skipped");
    Ok(app.shutdown())
}
