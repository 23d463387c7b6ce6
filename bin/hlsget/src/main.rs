use clap::Parser;
use sumire_hlsget::HlsgetArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = HlsgetArgs::parse();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.parse_filters(if args.verbose {
        "sumire=debug,sumire_hlsget=debug"
    } else {
        "info"
    });
    builder.init();

    args.run().await
}
