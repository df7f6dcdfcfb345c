use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use image_puller::Opt;
// cargo run --bin image-puller -- registry.example.com:5000/team/app:1.2 --user alice

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opt = Opt::parse();
    let write_to_file = opt.output_path.is_some();
    let output = image_puller::pull_main(opt).await?;

    eprintln!(
        "{} {} ({} layers, analyzed layer: {})",
        style("Resolved").green().bold(),
        output.image.reference(),
        output.layers.len(),
        output.analyzed_layer.as_deref().unwrap_or("none")
    );

    if !write_to_file {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}
