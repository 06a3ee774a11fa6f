#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examhall::take_exam_cli().await {
        eprintln!("examhall-take: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
