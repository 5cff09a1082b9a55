#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice
)]

use std::{
    fmt::Display,
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use pixelette::{
    sample_frames, AnimationEncoder, AnimationPipeline, BackgroundRemover, BoxError, DitherMode,
    FrameDir, GifAnimation, Palette, PixelateConfig, PixelatePipeline, Resolution,
};

#[derive(Copy, Clone, ValueEnum)]
enum CliDither {
    None,
    FloydSteinberg,
}

impl From<CliDither> for DitherMode {
    fn from(value: CliDither) -> Self {
        match value {
            CliDither::None => DitherMode::None,
            CliDither::FloydSteinberg => DitherMode::FloydSteinberg,
        }
    }
}

impl Display for CliDither {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DitherMode::from(*self))
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum CliResolution {
    Original,
    Pixel,
}

impl From<CliResolution> for Resolution {
    fn from(value: CliResolution) -> Self {
        match value {
            CliResolution::Original => Resolution::Original,
            CliResolution::Pixel => Resolution::Pixel,
        }
    }
}

impl Display for CliResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CliResolution::Original => "original",
                CliResolution::Pixel => "pixel",
            }
        )
    }
}

/// Pipes each frame through an external command as PNG on stdin and reads the result from stdout.
struct CommandRemover {
    program: String,
}

impl BackgroundRemover for CommandRemover {
    fn remove(&self, image: &[u8]) -> Result<Vec<u8>, BoxError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let mut stdin = child.stdin.take().ok_or("no stdin")?;
        let output = std::thread::scope(|s| {
            let writer = s.spawn(move || stdin.write_all(image));
            let output = child.wait_with_output();
            writer.join().map_err(|_| "stdin writer panicked")??;
            Ok::<_, BoxError>(output?)
        })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(format!("{} exited with {}", self.program, output.status).into())
        }
    }
}

#[derive(Args)]
struct PixelateOptions {
    /// A JSON palette file of the form `{"colors": ["#rrggbb", ...]}`.
    #[arg(short, long)]
    palette: Option<PathBuf>,

    /// A JSON file with the default pixelation options.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    width: Option<u32>,

    #[arg(long)]
    dither: Option<CliDither>,

    #[arg(long)]
    strength: Option<f64>,

    #[arg(long)]
    resolution: Option<CliResolution>,
}

impl PixelateOptions {
    fn pipeline(self) -> Result<PixelatePipeline, BoxError> {
        let config = match self.config {
            Some(path) => serde_json::from_reader(std::fs::File::open(path)?)?,
            None => PixelateConfig::default(),
        };

        let mut pipeline = PixelatePipeline::from_config(&config);

        if let Some(path) = self.palette {
            pipeline.palette(Palette::from_file(path)?);
        }
        if let Some(width) = self.width {
            pipeline.width(width);
        }
        if let Some(dither) = self.dither {
            pipeline.dither_mode(dither.into());
        }
        if let Some(strength) = self.strength {
            pipeline.strength(strength);
        }
        if let Some(resolution) = self.resolution {
            pipeline.resolution(resolution.into());
        }

        pipeline.validate()?;
        Ok(pipeline)
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Pixelate a single image.
    Image {
        input: PathBuf,

        output: PathBuf,
    },
    /// Pixelate a directory of `.png` frames into an animated GIF.
    Frames {
        input: PathBuf,

        output: PathBuf,

        /// The delay between frames in milliseconds.
        #[arg(long, default_value_t = 100)]
        delay: u64,

        /// The frame rate the frames were extracted at.
        #[arg(long)]
        fps: Option<f64>,

        /// Keep one frame every this many seconds (requires `--fps`).
        #[arg(long, requires = "fps", default_value_t = 0.0)]
        interval: f64,

        /// A command that reads a PNG on stdin and writes the image without background to stdout.
        #[arg(long)]
        remove_background: Option<String>,

        /// Process frames on the current thread only.
        #[arg(long)]
        single_threaded: bool,
    },
}

#[derive(Parser)]
pub struct Options {
    #[command(flatten)]
    pixelate: PixelateOptions,

    #[command(subcommand)]
    mode: Mode,
}

fn main() -> Result<(), BoxError> {
    env_logger::init();

    let Options { pixelate, mode } = Options::parse();
    let pipeline = pixelate.pipeline()?;

    match mode {
        Mode::Image { input, output } => {
            let time = std::time::Instant::now();
            let image = image::open(input)?.into_rgba8();
            let image = pipeline.pixelate_par(&image)?;
            image.save(output)?;
            log::info!("pixelated image in {}ms", time.elapsed().as_millis());
        }
        Mode::Frames {
            input,
            output,
            delay,
            fps,
            interval,
            remove_background,
            single_threaded,
        } => {
            let time = std::time::Instant::now();
            let remover = remove_background.map(|program| CommandRemover { program });

            let mut animation = AnimationPipeline::new(pipeline);
            animation.frame_delay(Duration::from_millis(delay));
            if let Some(remover) = &remover {
                animation.background_remover(remover);
            }

            let frames = sample_frames(FrameDir::open(input)?, fps.unwrap_or(0.0), interval);
            let mut gif = GifAnimation::create(output)?;

            let count = if single_threaded {
                animation.render(frames, &mut gif)?
            } else {
                animation.render_par(frames, &mut gif)?
            };

            gif.finish()?;
            log::info!("encoded {count} frames in {}ms", time.elapsed().as_millis());
        }
    }

    Ok(())
}
