use clap::Parser;
use tracing_subscriber::EnvFilter;
use training::{run_train, TrainArgs};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = TrainArgs::parse();
    let history = run_train(args)?;
    if let Some(last) = history.last() {
        println!(
            "Training complete: epochs={} final val_loss={:.4} val_accuracy={:.3}",
            history.len(),
            last.val_loss,
            last.val_accuracy
        );
    }
    Ok(())
}
