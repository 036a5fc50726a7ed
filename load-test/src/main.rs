use anyhow::{Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Target URL (e.g., http://localhost:8000)
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    /// Number of distinct voter identities to simulate
    #[arg(short, long, default_value_t = 50)]
    identities: usize,

    /// Vote attempts fired per identity (more than the limit, to exercise
    /// rejection)
    #[arg(short, long, default_value_t = 20)]
    attempts: usize,

    /// Number of concurrent requests
    #[arg(short, long, default_value_t = 64)]
    concurrency: usize,

    /// The backend's configured daily vote limit
    #[arg(short = 'l', long, default_value_t = 5)]
    vote_limit: usize,
}

#[derive(Deserialize, Debug)]
struct Category {
    id: i32,
    name: String,
    is_active: bool,
}

#[derive(Deserialize, Debug)]
struct Participant {
    id: i32,
    // name: String,
}

#[derive(Serialize)]
struct CastVoteRequest {
    category_id: i32,
    participant_id: i32,
}

#[derive(Deserialize, Debug)]
struct CastVoteResponse {
    accepted: bool,
    // remaining_votes: u32,
    reason: Option<String>,
}

// Identities are spread over a test range and presented via the proxy
// header Rocket resolves client addresses from (ip_header, default
// "X-Real-IP").
fn identity_address(index: usize) -> String {
    format!("10.77.{}.{}", (index / 250) % 250, index % 250 + 1)
}

async fn cast_vote(
    client: &Client,
    base_url: &str,
    identity: &str,
    category_id: i32,
    participant_id: i32,
) -> Result<CastVoteResponse> {
    let response = client
        .post(format!("{}/api/vote", base_url))
        .header("X-Real-IP", identity)
        .json(&CastVoteRequest {
            category_id,
            participant_id,
        })
        .send()
        .await
        .context("Failed to send vote request")?
        .error_for_status()
        .context("Vote request failed")?;

    response
        .json::<CastVoteResponse>()
        .await
        .context("Failed to parse vote response")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("🚀 Starting load test against {}", args.url);
    println!("👥 Identities: {}", args.identities);
    println!("🗳️  Attempts per identity: {}", args.attempts);
    println!("⚡ Concurrency: {}", args.concurrency);

    let client = Client::builder()
        .build()
        .context("Failed to build client")?;

    // 1. Pick an active category and its participants
    let categories: Vec<Category> = client
        .get(format!("{}/api/categories", args.url))
        .send()
        .await
        .context("Failed to fetch categories")?
        .json()
        .await
        .context("Failed to parse categories")?;

    let category = categories
        .iter()
        .find(|c| c.is_active)
        .context("No active category found on the server. Cannot vote.")?;
    println!("📋 Voting in category '{}' (id {})", category.name, category.id);

    let participants: Vec<Participant> = client
        .get(format!(
            "{}/api/categories/{}/participants",
            args.url, category.id
        ))
        .send()
        .await
        .context("Failed to fetch participants")?
        .json()
        .await
        .context("Failed to parse participants")?;

    if participants.is_empty() {
        anyhow::bail!("No participants in the selected category. Cannot vote.");
    }
    println!("🧑‍🎤 Found {} participants", participants.len());

    let participants = Arc::new(participants);
    let base_url = Arc::new(args.url.clone());
    let category_id = category.id;

    let accepted_per_identity: Arc<Vec<AtomicUsize>> = Arc::new(
        (0..args.identities).map(|_| AtomicUsize::new(0)).collect(),
    );
    let limit_rejections = Arc::new(AtomicUsize::new(0));
    let transient_errors = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));

    let total_requests = args.identities * args.attempts;
    let pb = ProgressBar::new(total_requests as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({eta}) {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let start_time = Instant::now();

    // 2. Fire every (identity, attempt) pair concurrently so same-identity
    // requests race against each other.
    stream::iter((0..args.identities).flat_map(|identity_index| {
        (0..args.attempts).map(move |_| identity_index)
    }))
    .map(|identity_index| {
        let client = client.clone();
        let base_url = base_url.clone();
        let participants = participants.clone();
        let accepted_per_identity = accepted_per_identity.clone();
        let limit_rejections = limit_rejections.clone();
        let transient_errors = transient_errors.clone();
        let failures = failures.clone();
        let pb = pb.clone();

        async move {
            let identity = identity_address(identity_index);
            let participant = {
                let mut rng = rand::thread_rng();
                participants.choose(&mut rng).unwrap().id
            };

            match cast_vote(&client, &base_url, &identity, category_id, participant).await {
                Ok(response) if response.accepted => {
                    accepted_per_identity[identity_index].fetch_add(1, Ordering::Relaxed);
                }
                Ok(response) => match response.reason.as_deref() {
                    Some("limit_exceeded") => {
                        limit_rejections.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {
                        transient_errors.fetch_add(1, Ordering::Relaxed);
                    }
                },
                Err(_) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
            pb.inc(1);
        }
    })
    .buffer_unordered(args.concurrency)
    .collect::<Vec<()>>()
    .await;

    pb.finish_with_message("Done");

    let duration = start_time.elapsed();
    let accepted: usize = accepted_per_identity
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum();
    let expected_per_identity = args.vote_limit.min(args.attempts);

    // 3. The defining property: every identity got exactly the limit
    // accepted, never more, never fewer.
    let violations: Vec<(usize, usize)> = accepted_per_identity
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.load(Ordering::Relaxed)))
        .filter(|(_, accepted)| *accepted != expected_per_identity)
        .collect();

    println!("\n📊 Results:");
    println!("   Time taken: {:?}", duration);
    println!("   Total requests: {}", total_requests);
    println!("   Accepted votes: {}", accepted);
    println!(
        "   Limit rejections: {}",
        limit_rejections.load(Ordering::Relaxed)
    );
    println!(
        "   Transient errors: {}",
        transient_errors.load(Ordering::Relaxed)
    );
    println!("   Request failures: {}", failures.load(Ordering::Relaxed));
    println!(
        "   Throughput: {:.2} votes/sec",
        accepted as f64 / duration.as_secs_f64()
    );

    if violations.is_empty() {
        println!(
            "✅ Rate limit held: every identity had exactly {} votes accepted",
            expected_per_identity
        );
        Ok(())
    } else {
        for (identity_index, got) in &violations {
            eprintln!(
                "❌ Identity {} ({}): {} accepted, expected {}",
                identity_index,
                identity_address(*identity_index),
                got,
                expected_per_identity
            );
        }
        anyhow::bail!("{} identities broke the vote limit", violations.len());
    }
}
