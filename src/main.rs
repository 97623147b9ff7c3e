// src/main.rs

use taskwarden::types::TaskStatus;
use taskwarden::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("taskwarden error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    let Some(result) = run(args).await? else {
        return Ok(0);
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(match result.task_state {
        TaskStatus::Success => 0,
        _ => 1,
    })
}
