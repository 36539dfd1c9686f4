//! Publishes a conversion job to the worker queue.
//!
//! Usage: send_job <docx|pptx> <inputKey> <outputKey> [bucket]

use std::env;
use std::process::exit;

use anyhow::anyhow;
use dotenvy::dotenv;
use serde_json::json;

use convert_worker::config::env::{self as config_env, EnvKey};
use convert_worker::infrastructure::queue::rabbitmq::RabbitMqService;

fn usage() -> ! {
    eprintln!("Usage: send_job <docx|pptx> <inputKey> <outputKey> [bucket]");
    eprintln!("Example: send_job pptx uploads/slides.pdf downloads/slides.pptx");
    exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        usage();
    }

    let format = args[0].to_lowercase();
    let input_key = args[1].clone();
    let mut output_key = args[2].clone();
    let bucket = args
        .get(3)
        .cloned()
        .unwrap_or_else(|| "pdf-converter-files".to_string());

    if format != "docx" && format != "pptx" {
        eprintln!("Error: format must be 'docx' or 'pptx'");
        exit(1);
    }

    // The worker derives the target format from the output extension, so
    // fix it up if it does not match the requested format.
    let expected_ext = format!(".{}", format);
    if !output_key.to_lowercase().ends_with(&expected_ext) {
        eprintln!("Warning: outputKey should end with {}", expected_ext);
        output_key = match output_key.rsplit_once('.') {
            Some((stem, _)) => format!("{}{}", stem, expected_ext),
            None => format!("{}{}", output_key, expected_ext),
        };
    }

    let url = config_env::get(EnvKey::AmqpUrl).map_err(|_| anyhow!("CLOUDAMQP_URL not set"))?;
    let queue_name = config_env::get_or(EnvKey::QueueName, "pdf-conversion-queue");

    let payload = serde_json::to_vec(&json!({
        "bucket": bucket,
        "inputKey": input_key,
        "outputKey": output_key,
    }))?;

    let queue = RabbitMqService::new(&url).await?;
    queue.publish(&queue_name, &payload).await?;

    println!("[{}] Job sent to {}", format.to_uppercase(), queue_name);
    println!("   Input : {}", input_key);
    println!("   Output: {}", output_key);
    println!("   Bucket: {}", bucket);

    queue.close().await?;

    Ok(())
}
