//! Command-line arguments.
//!
//! Global flags override the matching environment variables read by
//! [`GenAiConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use veil_core::generation::GenerationConfig;
use veil_genai::config::GenAiConfig;

#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(about = "Video, image and lore generation for The Ashen Veil")]
pub struct Cli {
    /// Seconds between job status queries.
    #[arg(long, global = true)]
    pub poll_interval_secs: Option<u64>,

    /// Give up waiting on a job after this many seconds.
    #[arg(long, global = true)]
    pub deadline_secs: Option<u64>,

    /// Give up waiting on a job after this many status queries.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Override the REST API host.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a video, optionally animating a still image.
    Video {
        prompt: String,
        /// Seed image to animate: a file path or `data:` URL.
        #[arg(long)]
        image: Option<PathBuf>,
        #[command(flatten)]
        shape: ShapeArgs,
        /// Output file; defaults to a timestamped name in the working directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Continue a previously generated video.
    Extend {
        prompt: String,
        /// URI of the video to extend, as printed by `veil video`.
        #[arg(long)]
        from: String,
        #[command(flatten)]
        shape: ShapeArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate an image, or restyle an existing one.
    Image {
        prompt: String,
        /// Image to transform: a file path or `data:` URL.
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ask the ChronoScribe a question.
    Chat { prompt: String },
    /// Describe the visual style of an image as keywords.
    Style {
        /// Local file path, `data:` URL or remote image URL.
        source: String,
    },
}

/// Output shape of a video.
#[derive(clap::Args, Debug, Clone)]
pub struct ShapeArgs {
    #[arg(long, default_value = "720p")]
    pub resolution: String,

    #[arg(long, default_value = "16:9")]
    pub aspect_ratio: String,
}

impl ShapeArgs {
    pub fn to_config(&self) -> GenerationConfig {
        GenerationConfig {
            count: 1,
            resolution: self.resolution.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
        }
    }
}

impl Cli {
    /// Apply flag overrides on top of environment configuration.
    pub fn apply(&self, mut config: GenAiConfig) -> GenAiConfig {
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.deadline_secs {
            config.poll_deadline = Some(Duration::from_secs(secs));
        }
        if let Some(n) = self.max_attempts {
            config.poll_max_attempts = Some(n);
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        config
    }
}
