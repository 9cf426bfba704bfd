//! Pause, resume and cancel a simulated agent loop.
//!
//! Run with: `cargo run --example controlled_run`

use std::time::Duration;

use helm::prelude::*;

/// A stand-in for a real computer-use loop: five steps, 100ms each.
fn simulated_loop() -> FnLoop<()> {
    FnLoop::new(|request: LoopRequest<()>| async move {
        let mut gate = request.gate();
        let mut messages = vec![LoopMessage::user(request.query.clone())];
        while gate.step() < 5 {
            gate.checkpoint().await?;
            let step = gate.advance();
            println!("  step {step}: acting on the page");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        messages.push(LoopMessage::assistant(
            "Done.\n```json\n{\"title\": \"Example Domain\", \"links\": 1}\n```",
        ));
        Ok(messages)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let agent = Agent::new(AgentConfig::new("sk-demo"), (), simulated_loop());

    let controller = agent.controller().clone();
    let _pause = controller.on(|event: &PauseEvent| println!("⏸  paused at step {}", event.step));
    let _resume = controller.on(|event: &ResumeEvent| println!("▶  resumed at step {}", event.step));
    let _cancel = controller.on(|event: &CancelEvent| println!("⏹  cancelled at step {}", event.step));

    let remote = controller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        remote.pause();
        tokio::time::sleep(Duration::from_millis(300)).await;
        remote.resume();
    });

    let schema = OutputSchema::new(serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "links": { "type": "integer" }
        },
        "required": ["title"]
    }));
    let value = agent
        .execute_value("Summarise example.com", &schema, ExecuteOptions::default())
        .await?;
    println!("result: {value}");

    let remote = controller.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        remote.cancel();
    });
    match agent.execute("Do it again", ExecuteOptions::default()).await {
        Err(HelmError::Cancelled { step, .. }) => println!("second run cancelled at step {step}"),
        other => println!("second run finished: {other:?}"),
    }

    Ok(())
}
