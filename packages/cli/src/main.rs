use clap::Parser;

use mungo_cli::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match mungo_cli::run(args).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
