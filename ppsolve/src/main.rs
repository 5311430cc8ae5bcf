use clap::Parser as _;
use ppsolve::BaseArgs;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

pub fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so that stdout stays clean for piped output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = BaseArgs::parse();
    match args.evaluate()? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}
