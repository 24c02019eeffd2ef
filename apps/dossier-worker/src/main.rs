use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = dossier_worker::Args::parse();

	dossier_worker::run(args).await
}
