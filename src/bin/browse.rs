use std::sync::Arc;

use movie_catalog::browser::{self, HttpMovieSource, UiEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "commands: /<text> search | s title | s year | f p n l (first/prev/next/last) | q quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "movie_catalog=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let base_url =
        std::env::var("CATALOG_API_URL").unwrap_or_else(|_| "http://localhost:5000".into());
    tracing::info!(%base_url, "starting catalog browser");

    let handle = browser::spawn(Arc::new(HttpMovieSource::new(base_url)));

    let mut views = handle.views.clone();
    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            println!("\n{view}");
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == "q" {
            break;
        }
        match UiEvent::parse_command(line) {
            Some(event) => {
                if handle.events.send(event).await.is_err() {
                    break;
                }
            }
            None => println!("{HELP}"),
        }
    }

    drop(handle.events);
    handle.task.await?;
    printer.abort();
    Ok(())
}
