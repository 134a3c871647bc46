// heavy_calculation.rs

use gpu_dot_product::heavy_calculator::HeavyCalculator;
use gpu_dot_product::RunConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gpu_dot_product::init_logging();

    let calculator = HeavyCalculator::new(RunConfig::heavy_calculation().with_env_overrides());
    let report = calculator.run().await?;

    println!("COMPARING STATUS : {}", report.matched);
    Ok(())
}
