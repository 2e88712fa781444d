//! Reading seed images from disk and writing artifacts back.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use veil_core::data_url::DataUrl;
use veil_core::generation::{image_mime_for_extension, Artifact, SeedArtifact};

/// Load an image file, or decode a `data:` URL, as a generation seed.
pub async fn read_seed_image(path: &Path) -> anyhow::Result<SeedArtifact> {
    if let Some(url) = path.to_str().filter(|p| p.starts_with("data:")) {
        return Ok(DataUrl::parse(url)?.into_seed());
    }
    let mime_type = image_mime_for(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(SeedArtifact::Image {
        bytes,
        mime_type: mime_type.to_string(),
    })
}

/// Turn a style source into something the chat client accepts.
///
/// Existing local files are inlined as `data:` URLs; anything else is
/// passed through untouched.
pub async fn resolve_style_source(source: &str) -> anyhow::Result<String> {
    let path = Path::new(source);
    if source.starts_with("data:") || !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Ok(source.to_string());
    }
    let mime_type = image_mime_for(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(DataUrl::encode(mime_type, &bytes))
}

/// Where to write `artifact` when no `--out` was given.
pub fn default_output_path(stem: &str, artifact: &Artifact) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    PathBuf::from(format!("{stem}-{stamp}.{}", artifact.extension()))
}

/// Write the artifact and return the path it landed at.
pub async fn write_artifact(
    artifact: &Artifact,
    out: Option<PathBuf>,
    stem: &str,
) -> anyhow::Result<PathBuf> {
    let path = out.unwrap_or_else(|| default_output_path(stem, artifact));
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn image_mime_for(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match image_mime_for_extension(ext) {
        Some(mime) => Ok(mime),
        None => bail!("{} is not a supported image (png, jpg, webp, gif)", path.display()),
    }
}
