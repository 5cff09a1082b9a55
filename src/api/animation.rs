//! Contains the frame sources, collaborator traits, and the [`AnimationPipeline`]
//! for turning a sequence of frames into a pixelated animation.

use super::PixelatePipeline;
use crate::PipelineError;
use gif::Repeat;
use image::{ImageFormat, RgbaImage};
#[cfg(feature = "threads")]
use rayon::prelude::*;
use std::{
    error::Error,
    fs,
    io::{self, BufWriter, Cursor, Write},
    iter::StepBy,
    path::{Path, PathBuf},
    time::Duration,
};

/// A boxed error returned by external collaborators.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// A service that removes the background of an image.
///
/// Implementations typically wrap a remote API or a segmentation model.
/// Both the input and the output are encoded image files;
/// frames are handed over as PNG, and the output may be in any format the `image` crate can decode.
pub trait BackgroundRemover {
    /// Returns `image` with its background removed.
    ///
    /// # Errors
    /// Any failure of the service. The [`AnimationPipeline`] then keeps the original frame.
    fn remove(&self, image: &[u8]) -> Result<Vec<u8>, BoxError>;
}

/// A sink for an ordered sequence of frames that form an animation.
pub trait AnimationEncoder {
    /// Appends `frame` to the animation, shown for `delay`.
    ///
    /// # Errors
    /// Returns an error if the frame cannot be encoded or written.
    fn add_frame(&mut self, frame: RgbaImage, delay: Duration) -> Result<(), PipelineError>;

    /// Completes the animation.
    ///
    /// # Errors
    /// Returns an error if the animation cannot be finalized.
    fn finish(self) -> Result<(), PipelineError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// An [`AnimationEncoder`] that writes an animated GIF.
///
/// The GIF loops forever unless [`GifAnimation::repeat`] is used.
/// The size of the first frame sets the size of the GIF, and each frame replaces the previous one
/// (the background is restored between frames).
///
/// Call [`AnimationEncoder::finish`] to write the GIF trailer.
/// A [`GifAnimation`] that is only dropped still writes the trailer,
/// but any error doing so is lost.
pub struct GifAnimation<W: Write> {
    /// The writer, until the first frame creates the encoder.
    writer: Option<W>,
    /// The GIF encoder and the size of the GIF, once the first frame is added.
    encoder: Option<(gif::Encoder<W>, (u16, u16))>,
    /// The number of times the animation plays.
    repeat: Repeat,
}

impl<W: Write> GifAnimation<W> {
    /// Creates a new [`GifAnimation`] writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
            encoder: None,
            repeat: Repeat::Infinite,
        }
    }

    /// Creates a new [`GifAnimation`] that plays `times` times instead of looping forever.
    pub fn repeat(writer: W, times: u16) -> Self {
        Self { repeat: Repeat::Finite(times), ..Self::new(writer) }
    }

    /// Returns the encoder, writing the GIF header sized to the first frame if needed.
    fn encoder(&mut self, size: (u16, u16)) -> Result<&mut gif::Encoder<W>, PipelineError> {
        if let Some(writer) = self.writer.take() {
            let mut encoder = gif::Encoder::new(writer, size.0, size.1, &[])?;
            encoder.set_repeat(self.repeat)?;
            self.encoder = Some((encoder, size));
        }

        match &mut self.encoder {
            Some((encoder, gif_size)) if *gif_size == size => Ok(encoder),
            Some((_, (width, height))) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame is {}x{} but the GIF is {width}x{height}", size.0, size.1),
            )
            .into()),
            None => Err(io::Error::other("no GIF writer").into()),
        }
    }
}

impl GifAnimation<BufWriter<fs::File>> {
    /// Creates a new [`GifAnimation`] writing to a new file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self::new(BufWriter::new(fs::File::create(path)?)))
    }
}

/// Converts a frame dimension to the 16 bits a GIF allows.
fn gif_dimension(value: u32) -> Result<u16, PipelineError> {
    u16::try_from(value).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame dimension {value} is too large for a GIF"),
        )
        .into()
    })
}

impl<W: Write> AnimationEncoder for GifAnimation<W> {
    fn add_frame(&mut self, frame: RgbaImage, delay: Duration) -> Result<(), PipelineError> {
        let width = gif_dimension(frame.width())?;
        let height = gif_dimension(frame.height())?;
        let encoder = self.encoder((width, height))?;

        let mut pixels = frame.into_raw();
        let mut frame = gif::Frame::from_rgba_speed(width, height, &mut pixels, 10);
        // GIF delays are in hundredths of a second
        frame.delay = u16::try_from(delay.as_millis() / 10).unwrap_or(u16::MAX);
        frame.dispose = gif::DisposalMethod::Background;

        encoder.write_frame(&frame)?;
        Ok(())
    }

    fn finish(mut self) -> Result<(), PipelineError> {
        let mut writer = match self.encoder.take() {
            Some((encoder, _)) => encoder.into_inner()?,
            None => match self.writer.take() {
                Some(writer) => writer,
                None => return Ok(()),
            },
        };

        writer.flush()?;
        Ok(())
    }
}

/// Keeps one frame out of every `fps * interval` frames, starting with the first frame.
///
/// For example, an `interval` of `1.0` seconds keeps one frame per second of video.
/// At least every frame is kept, even if `fps * interval` is less than `1`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sample_frames<I: IntoIterator>(frames: I, fps: f64, interval: f64) -> StepBy<I::IntoIter> {
    // NAN and negative values saturate to 0
    let step = (fps * interval) as usize;
    frames.into_iter().step_by(step.max(1))
}

/// Lazily reads the `.png` frames in a directory, in file name order.
#[derive(Debug)]
pub struct FrameDir {
    /// The remaining frame paths.
    paths: std::vec::IntoIter<PathBuf>,
}

impl FrameDir {
    /// Lists the `.png` files in `dir`. No frame is decoded until it is requested.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let mut paths = fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()?;

        paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "png"));
        paths.sort();

        Ok(Self { paths: paths.into_iter() })
    }
}

impl Iterator for FrameDir {
    type Item = Result<RgbaImage, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        log::trace!("reading frame {}", path.display());
        Some(
            image::open(path)
                .map(image::DynamicImage::into_rgba8)
                .map_err(Into::into),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

impl ExactSizeIterator for FrameDir {}

/// A builder struct to turn a sequence of frames into a pixelated animation.
///
/// Each frame optionally has its background removed,
/// then goes through a [`PixelatePipeline`], and is finally handed to an [`AnimationEncoder`]
/// with a fixed per-frame delay.
///
/// # Examples
/// ```no_run
/// # use pixelette::{
/// #     AnimationEncoder, AnimationPipeline, DitherMode, FrameDir, GifAnimation, Palette,
/// #     PixelatePipeline,
/// # };
/// # use std::time::Duration;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pixelate = PixelatePipeline::new(175);
/// pixelate
///     .palette(Palette::from_file("palette/app.json")?)
///     .dither_mode(DitherMode::FloydSteinberg)
///     .strength(0.25);
///
/// let mut gif = GifAnimation::create("animation.gif")?;
/// let frames = AnimationPipeline::new(pixelate)
///     .frame_delay(Duration::from_millis(500))
///     .render(FrameDir::open("frames")?, &mut gif)?;
/// gif.finish()?;
/// # Ok(())
/// # }
/// ```
#[must_use]
pub struct AnimationPipeline<'a> {
    /// The pixelation applied to each frame.
    pixelate: PixelatePipeline,
    /// The background removal service, if any.
    remover: Option<&'a (dyn BackgroundRemover + Sync)>,
    /// How long each frame is shown.
    frame_delay: Duration,
}

impl<'a> AnimationPipeline<'a> {
    /// The default delay between frames.
    pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(100);

    /// Creates a new [`AnimationPipeline`] that pixelates each frame with `pixelate`.
    pub fn new(pixelate: PixelatePipeline) -> Self {
        Self {
            pixelate,
            remover: None,
            frame_delay: Self::DEFAULT_FRAME_DELAY,
        }
    }

    /// Sets the service used to remove the background of each frame before it is pixelated.
    ///
    /// By default, backgrounds are kept.
    pub fn background_remover(&mut self, remover: &'a (dyn BackgroundRemover + Sync)) -> &mut Self {
        self.remover = Some(remover);
        self
    }

    /// Sets how long each frame is shown.
    ///
    /// The default frame delay is [`AnimationPipeline::DEFAULT_FRAME_DELAY`].
    pub fn frame_delay(&mut self, delay: Duration) -> &mut Self {
        self.frame_delay = delay;
        self
    }

    /// Sends `frame` through `remover`, decoding the returned image.
    fn remove_background(
        remover: &(dyn BackgroundRemover + Sync),
        frame: &RgbaImage,
    ) -> Result<RgbaImage, PipelineError> {
        let mut png = Vec::new();
        frame.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let output = remover
            .remove(&png)
            .map_err(|e| PipelineError::BackgroundRemoval(e.to_string()))?;

        Ok(image::load_from_memory(&output)?.into_rgba8())
    }

    /// Runs a single frame through background removal (if set) and pixelation.
    ///
    /// If background removal fails, a warning is logged and the original frame is used.
    ///
    /// # Errors
    /// Returns an error if the pixelation options are invalid.
    pub fn process_frame(&self, frame: RgbaImage) -> Result<RgbaImage, PipelineError> {
        let frame = match self.remover {
            Some(remover) => Self::remove_background(remover, &frame).unwrap_or_else(|e| {
                log::warn!("keeping the original frame: {e}");
                frame
            }),
            None => frame,
        };

        Ok(self.pixelate.pixelate(&frame)?)
    }

    /// Processes the `frames` one at a time in order and adds them to `encoder`,
    /// returning the number of frames added.
    ///
    /// The options are validated before the first frame is read.
    ///
    /// # Errors
    /// Returns [`PipelineError::NoFrames`] if `frames` is empty,
    /// or the first error from reading, processing, or encoding a frame.
    pub fn render<I, E>(&self, frames: I, encoder: &mut E) -> Result<usize, PipelineError>
    where
        I: IntoIterator<Item = Result<RgbaImage, PipelineError>>,
        E: AnimationEncoder,
    {
        self.pixelate.validate()?;

        let mut count = 0;
        for frame in frames {
            let frame = self.process_frame(frame?)?;
            encoder.add_frame(frame, self.frame_delay)?;
            count += 1;
        }

        log::debug!("encoded {count} frames");

        if count == 0 {
            Err(PipelineError::NoFrames)
        } else {
            Ok(count)
        }
    }
}

#[cfg(feature = "threads")]
impl AnimationPipeline<'_> {
    /// Processes the `frames` in parallel and adds them to `encoder` in their original order,
    /// returning the number of frames added.
    ///
    /// Frames are read in batches of one frame per thread,
    /// so memory use does not grow with the length of the sequence.
    ///
    /// # Errors
    /// See [`AnimationPipeline::render`].
    pub fn render_par<I, E>(&self, frames: I, encoder: &mut E) -> Result<usize, PipelineError>
    where
        I: IntoIterator<Item = Result<RgbaImage, PipelineError>>,
        E: AnimationEncoder,
    {
        self.pixelate.validate()?;

        let batch_size = rayon::current_num_threads().max(1);
        let mut frames = frames.into_iter();
        let mut count = 0;

        loop {
            let batch = frames
                .by_ref()
                .take(batch_size)
                .collect::<Result<Vec<_>, _>>()?;

            if batch.is_empty() {
                break;
            }

            let batch = batch
                .into_par_iter()
                .map(|frame| self.process_frame(frame))
                .collect::<Result<Vec<_>, _>>()?;

            for frame in batch {
                encoder.add_frame(frame, self.frame_delay)?;
                count += 1;
            }
        }

        log::debug!("encoded {count} frames");

        if count == 0 {
            Err(PipelineError::NoFrames)
        } else {
            Ok(count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{tests::*, DitherMode, Resolution};
    use image::Rgba;

    /// Collects frames in memory.
    #[derive(Default)]
    struct Frames(Vec<(RgbaImage, Duration)>);

    impl AnimationEncoder for Frames {
        fn add_frame(&mut self, frame: RgbaImage, delay: Duration) -> Result<(), PipelineError> {
            self.0.push((frame, delay));
            Ok(())
        }
    }

    /// Always fails.
    struct Unavailable;

    impl BackgroundRemover for Unavailable {
        fn remove(&self, _: &[u8]) -> Result<Vec<u8>, BoxError> {
            Err("service unavailable".into())
        }
    }

    /// Makes the whole image transparent.
    struct Erase;

    impl BackgroundRemover for Erase {
        fn remove(&self, image: &[u8]) -> Result<Vec<u8>, BoxError> {
            let mut image = image::load_from_memory(image)?.into_rgba8();
            for pixel in image.pixels_mut() {
                pixel.0[3] = 0;
            }
            let mut png = Vec::new();
            image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
            Ok(png)
        }
    }

    fn frames(count: u8) -> Vec<Result<RgbaImage, PipelineError>> {
        (0..count)
            .map(|i| Ok(RgbaImage::from_pixel(8, 6, Rgba([i * 20, 100, 200, 255]))))
            .collect()
    }

    fn pixelate() -> PixelatePipeline {
        let mut pixelate = PixelatePipeline::new(4);
        pixelate
            .palette(black_and_white())
            .dither_mode(DitherMode::FloydSteinberg)
            .strength(0.25)
            .resolution(Resolution::Pixel);
        pixelate
    }

    #[test]
    fn sample_every_nth_frame() {
        let sampled = sample_frames(0..10, 3.0, 1.0).collect::<Vec<_>>();
        assert_eq!(sampled, [0, 3, 6, 9]);

        let sampled = sample_frames(0..4, 30.0, 0.01).collect::<Vec<_>>();
        assert_eq!(sampled, [0, 1, 2, 3]);

        let sampled = sample_frames(0..4, f64::NAN, 1.0).collect::<Vec<_>>();
        assert_eq!(sampled, [0, 1, 2, 3]);
    }

    #[test]
    fn render_keeps_order_and_delay() {
        let mut encoder = Frames::default();
        let count = AnimationPipeline::new(pixelate())
            .frame_delay(Duration::from_millis(500))
            .render(frames(5), &mut encoder)
            .unwrap();

        assert_eq!(count, 5);
        assert_eq!(encoder.0.len(), 5);
        for (frame, delay) in &encoder.0 {
            assert_eq!(frame.dimensions(), (4, 3));
            assert_eq!(*delay, Duration::from_millis(500));
        }
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let mut encoder = Frames::default();
        let result = AnimationPipeline::new(pixelate()).render(Vec::new(), &mut encoder);
        assert!(matches!(result, Err(PipelineError::NoFrames)));
    }

    #[test]
    fn invalid_options_fail_before_reading_frames() {
        let mut pixelate = pixelate();
        pixelate.strength(3.0);

        let mut read = 0;
        let frames = frames(3).into_iter().inspect(|_| read += 1);
        let mut encoder = Frames::default();
        let result = AnimationPipeline::new(pixelate).render(frames, &mut encoder);

        assert!(matches!(result, Err(PipelineError::Quantize(_))));
        assert_eq!(read, 0);
    }

    #[test]
    fn frame_errors_are_returned() {
        let mut frames = frames(3);
        frames[1] = Err(PipelineError::NoFrames);
        let mut encoder = Frames::default();
        let result = AnimationPipeline::new(pixelate()).render(frames, &mut encoder);
        assert!(result.is_err());
        assert_eq!(encoder.0.len(), 1);
    }

    #[test]
    fn failed_background_removal_keeps_frame() {
        let mut encoder = Frames::default();
        AnimationPipeline::new(pixelate())
            .background_remover(&Unavailable)
            .render(frames(2), &mut encoder)
            .unwrap();

        assert_eq!(encoder.0.len(), 2);
        assert!(encoder.0.iter().all(|(frame, _)| frame.pixels().all(|p| p.0[3] == 255)));
    }

    #[test]
    fn background_removal_output_is_used() {
        let mut encoder = Frames::default();
        AnimationPipeline::new(pixelate())
            .background_remover(&Erase)
            .render(frames(2), &mut encoder)
            .unwrap();

        assert!(encoder.0.iter().all(|(frame, _)| frame.pixels().all(|p| p.0[3] == 0)));
    }

    /// Accepts writes until `fail` is set.
    struct Flaky<'a> {
        fail: &'a std::cell::Cell<bool>,
        written: Vec<u8>,
    }

    impl Write for Flaky<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail.get() {
                Err(io::Error::other("disk full"))
            } else {
                self.written.write(buf)
            }
        }

        fn flush(&mut self) -> io::Result<()> {
            if self.fail.get() {
                Err(io::Error::other("disk full"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn gif_round_trip() {
        let mut gif = Vec::new();
        let mut encoder = GifAnimation::new(&mut gif);
        let count = AnimationPipeline::new(pixelate())
            .frame_delay(Duration::from_millis(500))
            .render(frames(3), &mut encoder)
            .unwrap();
        assert_eq!(count, 3);
        encoder.finish().unwrap();

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(Cursor::new(gif)).unwrap();
        assert_eq!((decoder.width(), decoder.height()), (4, 3));

        let mut decoded = 0;
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!((frame.width, frame.height), (4, 3));
            assert_eq!(frame.delay, 50);
            assert_eq!(frame.dispose, gif::DisposalMethod::Background);
            for pixel in frame.buffer.chunks_exact(4) {
                assert!(pixel[..3] == [0, 0, 0] || pixel[..3] == [255, 255, 255]);
            }
            decoded += 1;
        }
        assert_eq!(decoded, 3);
    }

    #[test]
    fn gif_write_errors_are_returned() {
        let fail = std::cell::Cell::new(false);
        let mut encoder = GifAnimation::new(Flaky { fail: &fail, written: Vec::new() });
        AnimationPipeline::new(pixelate())
            .render(frames(1), &mut encoder)
            .unwrap();

        fail.set(true);
        assert!(matches!(encoder.finish(), Err(PipelineError::Io(_))));

        let fail = std::cell::Cell::new(true);
        let mut encoder = GifAnimation::new(Flaky { fail: &fail, written: Vec::new() });
        let result = AnimationPipeline::new(pixelate()).render(frames(1), &mut encoder);
        assert!(matches!(result, Err(PipelineError::Gif(_))));
    }

    #[test]
    fn gif_frames_must_match_size() {
        let mut encoder = GifAnimation::new(Vec::new());
        encoder
            .add_frame(RgbaImage::new(4, 3), Duration::from_millis(100))
            .unwrap();
        assert!(encoder
            .add_frame(RgbaImage::new(3, 4), Duration::from_millis(100))
            .is_err());
        assert!(encoder
            .add_frame(RgbaImage::new(70_000, 1), Duration::from_millis(100))
            .is_err());
        encoder.finish().unwrap();
    }

    #[test]
    fn frame_dir_reads_sorted_pngs() {
        let dir = std::env::temp_dir().join(format!("pixelette-frames-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let files = [("frame_00002.png", 2), ("frame_00000.png", 0), ("frame_00001.png", 1)];
        for (name, value) in files {
            RgbaImage::from_pixel(2, 2, Rgba([value, 0, 0, 255]))
                .save(dir.join(name))
                .unwrap();
        }
        fs::write(dir.join("notes.txt"), "not a frame").unwrap();

        let frames = FrameDir::open(&dir).unwrap();
        assert_eq!(frames.len(), 3);
        let reds = frames
            .map(|frame| frame.unwrap().get_pixel(0, 0).0[0])
            .collect::<Vec<_>>();
        assert_eq!(reds, [0, 1, 2]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(feature = "threads")]
    #[test]
    fn single_and_multi_threaded_match() {
        let mut sequential = Frames::default();
        let mut parallel = Frames::default();
        let pipeline = AnimationPipeline::new(pixelate());
        let count = pipeline.render(frames(13), &mut sequential).unwrap();
        let count_par = pipeline.render_par(frames(13), &mut parallel).unwrap();

        assert_eq!(count, count_par);
        assert!(sequential.0.iter().map(|(f, _)| f).eq(parallel.0.iter().map(|(f, _)| f)));
    }
}
