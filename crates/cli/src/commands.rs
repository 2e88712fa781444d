//! Command runners wiring the generation library together.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use veil_core::generation::{ArtifactLocator, GenerationConfig, GenerationRequest, SeedArtifact};
use veil_genai::api::GeminiApi;
use veil_genai::chat::ChatClient;
use veil_genai::config::GenAiConfig;
use veil_genai::error::GenerationError;
use veil_genai::image::ImageService;
use veil_genai::poller::JobPoller;
use veil_genai::service::GenerationService;
use veil_genai::session::{EnvKeySelector, KeySelector, Session};
use veil_genai::video::VideoService;

use crate::args::Command;
use crate::output::{read_seed_image, resolve_style_source, write_artifact};

/// Shared state for one invocation.
pub struct Context {
    pub config: GenAiConfig,
    pub api: Arc<GeminiApi>,
}

impl Context {
    pub fn new(config: GenAiConfig) -> anyhow::Result<Self> {
        let session = Arc::new(match &config.api_key {
            Some(key) => Session::with_key(key.clone()),
            None => Session::empty(),
        });
        let api = Arc::new(GeminiApi::with_client(
            config.http_client()?,
            config.base_url.clone(),
            session,
        ));
        Ok(Self { config, api })
    }

    pub fn session(&self) -> &Arc<Session> {
        self.api.session()
    }
}

/// Make sure a key is loaded before talking to the API.
pub async fn ensure_credential(
    session: &Session,
    selector: &dyn KeySelector,
) -> Result<(), GenerationError> {
    if session.has_valid_credential() || session.reacquire(selector).await {
        return Ok(());
    }
    Err(GenerationError::Credential(
        "no API key configured; set GEMINI_API_KEY".to_string(),
    ))
}

/// Run one subcommand to completion.
pub async fn run(
    ctx: &Context,
    command: Command,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    ensure_credential(ctx.session(), &EnvKeySelector).await?;

    match command {
        Command::Video {
            prompt,
            image,
            shape,
            out,
        } => {
            let seed = match image {
                Some(path) => Some(read_seed_image(&path).await?),
                None => None,
            };
            let service = Arc::new(VideoService::new(ctx.api.clone()));
            let req = request(ctx, prompt, seed, shape.to_config());
            generate(ctx, service, req, out, "veil-video", cancel).await
        }
        Command::Extend {
            prompt,
            from,
            shape,
            out,
        } => {
            let seed = Some(SeedArtifact::PriorJob(ArtifactLocator::Uri(from)));
            let service = Arc::new(VideoService::new(ctx.api.clone()));
            let req = request(ctx, prompt, seed, shape.to_config());
            generate(ctx, service, req, out, "veil-video", cancel).await
        }
        Command::Image { prompt, image, out } => {
            let seed = match image {
                Some(path) => Some(read_seed_image(&path).await?),
                None => None,
            };
            let service = Arc::new(ImageService::new(ctx.api.clone()));
            let req = request(ctx, prompt, seed, GenerationConfig::default());
            generate(ctx, service, req, out, "veil-image", cancel).await
        }
        Command::Chat { prompt } => {
            let answer = ChatClient::new(ctx.api.clone()).respond(&prompt).await;
            println!("{answer}");
            credential_survived(ctx.session())
        }
        Command::Style { source } => {
            let source = resolve_style_source(&source).await?;
            let keywords = ChatClient::new(ctx.api.clone()).analyze_style(&source).await;
            println!("{keywords}");
            credential_survived(ctx.session())
        }
    }
}

fn request(
    ctx: &Context,
    prompt: String,
    seed: Option<SeedArtifact>,
    config: GenerationConfig,
) -> GenerationRequest {
    let req = GenerationRequest::new(prompt)
        .with_config(config)
        .with_poll(ctx.config.poll_policy());
    match seed {
        Some(seed) => req.with_seed(seed),
        None => req,
    }
}

async fn generate(
    ctx: &Context,
    service: Arc<dyn GenerationService>,
    request: GenerationRequest,
    out: Option<PathBuf>,
    stem: &str,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let poller = JobPoller::new(service, ctx.session().clone());
    let mut events = poller.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => eprintln!("{}", event.display_text()),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = poller.run(&request, cancel).await;
    drop(poller);
    let _ = printer.await;

    let artifact = result?;
    let path = write_artifact(&artifact, out, stem).await?;
    println!("{}", path.display());
    if let Some(SeedArtifact::PriorJob(ArtifactLocator::Uri(uri))) = artifact.as_prior_job() {
        tracing::info!(uri = %uri, "Extend this video with `veil extend --from`");
    }
    Ok(())
}

/// Chat calls never fail, so a rejected key only shows up as an
/// invalidated session afterwards.
fn credential_survived(session: &Session) -> anyhow::Result<()> {
    if session.has_valid_credential() {
        Ok(())
    } else {
        Err(GenerationError::Credential("API key was rejected".to_string()).into())
    }
}

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<GenerationError>() {
        Some(e) if e.is_credential() => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use veil_core::polling::PollPolicy;

    use super::*;

    struct NoKey;

    #[async_trait::async_trait]
    impl KeySelector for NoKey {
        async fn select_key(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn credential_errors_exit_with_two() {
        let err: anyhow::Error = GenerationError::Credential("gone".into()).into();
        assert_eq!(exit_code(&err), 2);

        let err: anyhow::Error = GenerationError::JobFailed("blocked".into()).into();
        assert_eq!(exit_code(&err), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
    }

    #[tokio::test]
    async fn missing_key_is_credential_error() {
        let err = ensure_credential(&Session::empty(), &NoKey).await.unwrap_err();
        assert!(err.is_credential());
    }

    #[tokio::test]
    async fn loaded_key_skips_selection() {
        assert!(ensure_credential(&Session::with_key("k"), &NoKey).await.is_ok());
    }

    #[test]
    fn request_carries_configured_poll_policy() {
        let config = GenAiConfig {
            api_key: Some("k".into()),
            poll_max_attempts: Some(5),
            ..GenAiConfig::default()
        };
        let ctx = Context::new(config).unwrap();

        let req = request(&ctx, "orb".into(), None, GenerationConfig::default());
        assert_eq!(req.poll, PollPolicy::default().with_max_attempts(5));
        assert!(req.seed.is_none());
        assert!(ctx.session().has_valid_credential());
    }
}
