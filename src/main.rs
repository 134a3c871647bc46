// main.rs

use gpu_dot_product::dot_product::DotProductCalculator;
use gpu_dot_product::RunConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gpu_dot_product::init_logging();

    let calculator = DotProductCalculator::new(RunConfig::dot_product().with_env_overrides());
    let report = calculator.run().await?;

    println!("COMPARING STATUS : {}", report.matched);
    Ok(())
}
