use viral_load_abm::runner::run_with_args;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let result = run_with_args()?;
    println!(
        "Completed {} replicates; final mean viral load {:.4}",
        result.replicates,
        result.mean_viral_load.last().copied().unwrap_or(0.0)
    );
    Ok(())
}
