use terraform_provider_brightbox::BrightboxProvider;
use tf_provider::serve;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the plugin handshake, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    serve("brightbox", BrightboxProvider::default()).await
}
