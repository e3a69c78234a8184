use clap::Parser;
use gpu_batch_cli::provision::{self, ProvisionArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gpu_batch_cli::init_tracing();
    let args = ProvisionArgs::parse();

    let config = args.aws.load().await;
    let batch = args.aws.batch(&config);
    let poll = args.poll.options(gpu_batch_cli::cancel_on_ctrl_c());

    provision::run(&args, batch, poll).await?;
    Ok(())
}
