use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = sierra_api::Args::parse();

	sierra_api::run(args).await
}
