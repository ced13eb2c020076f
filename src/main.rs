use ascii_cinema::playback::{cancel_pair, play, PlaybackState};
use ascii_cinema::renderer::TerminalRenderer;
use ascii_cinema::source::open_video;
use ascii_cinema::utils::{calculate_aspect_ratio, format_duration};
use ascii_cinema::Cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG still wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        bail!("Invalid arguments: {}", e);
    }

    let config = cli.render_config().context("Failed to build render configuration")?;
    debug!("Render configuration: {:?}", config);

    info!("Starting {} v{}", ascii_cinema::PACKAGE_NAME, ascii_cinema::VERSION);
    info!("Playing: {}", cli.file_path.display());

    // If info-only mode, skip terminal initialization and just print video info
    if cli.info_only {
        info!("Info-only mode: loading video information");
        let source = open_video(&cli.file_path)
            .with_context(|| format!("Failed to open {}", cli.file_path.display()))?;
        let video = source.info();

        println!("Video Information:");
        println!("  File: {}", cli.file_path.display());
        println!("  Dimensions: {}x{}", video.width, video.height);
        match video.fps {
            Some(fps) => println!("  Frame Rate: {:.2} FPS", fps),
            None => println!("  Frame Rate: unknown"),
        }
        match video.total_frames {
            Some(frames) => println!("  Frames: {}", frames),
            None => println!("  Frames: unknown"),
        }
        match video.duration {
            Some(seconds) => println!(
                "  Duration: {} ({:.2} seconds)",
                format_duration(seconds),
                seconds
            ),
            None => println!("  Duration: unknown"),
        }
        println!("  Aspect Ratio: {:.2}", calculate_aspect_ratio(video.width, video.height));
        return Ok(());
    }

    let mut source = open_video(&cli.file_path)
        .with_context(|| format!("Failed to open {}", cli.file_path.display()))?;

    if !atty::is(atty::Stream::Stdout) {
        warn!("Standard output is not a terminal; escape sequences will be written as-is");
    }

    let (canceller, token) = cancel_pair();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C pressed, stopping");
                canceller.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let mut renderer = TerminalRenderer::stdout();
    renderer.init().context("Failed to initialize terminal")?;
    let outcome = play(&mut source, &mut renderer, &config, token).await;

    // Cleanup
    info!("Cleaning up and exiting");
    renderer.cleanup()?;

    let report = outcome.context("Playback failed")?;
    let how = match report.state {
        PlaybackState::Stopped => "stopped",
        _ => "finished",
    };
    match report.progress_percent() {
        Some(percent) => println!(
            "Playback {}. Frames: {} ({:.1}%), skipped: {}, {:.2} FPS, {:.1}s",
            how,
            report.frames_rendered,
            percent,
            report.frames_skipped,
            report.fps,
            report.elapsed.as_secs_f64()
        ),
        None => println!(
            "Playback {}. Frames: {}, skipped: {}, {:.2} FPS, {:.1}s",
            how,
            report.frames_rendered,
            report.frames_skipped,
            report.fps,
            report.elapsed.as_secs_f64()
        ),
    }
    Ok(())
}
