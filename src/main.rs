use agent_orchestrator::cli::App;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let (app, args) = App::from_args()?;

    app.run(args).await?;

    Ok(())
}
