use instana::InstanaProvider;
use std::env;
use std::path::PathBuf;
use tfplug::ServerConfig;

/// Certificate and key for local debugging; the host normally drives TLS
/// through the go-plugin handshake
const TLS_CERT_ENV: &str = "INSTANA_PROVIDER_TLS_CERT";
const TLS_KEY_ENV: &str = "INSTANA_PROVIDER_TLS_KEY";

#[tokio::main]
async fn main() -> tfplug::Result<()> {
    tfplug::init_logging();

    let mut config = ServerConfig::new();
    if let (Ok(cert), Ok(key)) = (env::var(TLS_CERT_ENV), env::var(TLS_KEY_ENV)) {
        config = config.with_tls(PathBuf::from(cert), PathBuf::from(key));
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting terraform-provider-instana");
    tfplug::serve(InstanaProvider::new(), config).await
}
