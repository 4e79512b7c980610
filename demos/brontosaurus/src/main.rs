//! Brontosaurus example binary
//!
//! Walks a brontosaurus through meals, thunks and async requests, then lets a
//! herd graze a meadow in a combined state tree.

use brontosaurus::{BRONTOSAURUS, HERD, MEADOW, brontosaurus, ecosystem};
use rexmodule_runtime::Store;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brontosaurus=debug,rexmodule_runtime=debug,rexmodule_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Brontosaurus Example: rexmodule ===\n");

    let module = brontosaurus(|a, b| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        anyhow::Ok(a + b)
    })?;
    println!("Types: {:?}", module.types().keys().collect::<Vec<_>>());

    let eat = module.action("eatFood", "palm tree")?;
    let delayed = module.thunk("delayedFood", vec![json!("cycad"), json!(20)])?;
    let stretch = module.thunk("stretchAndEat", vec![json!("conifer")])?;
    let destiny = module.request("destiny", vec![json!(2), json!(3)])?;
    let repeat = module.request("destiny", vec![json!(40), json!(2)])?;
    let failure = module.request("failure", vec![json!(2)])?;

    let store = Store::new(module);
    let state = store.state(|s| s.neck_length);
    println!("Initial neck length: {state}");

    println!("\n>>> Dispatching: {BRONTOSAURUS}//eatFood");
    store.dispatch(eat);
    println!("Stomach: {:?}", store.state(|s| s.stomach_contents.clone()));

    println!("\n>>> Running: delayedFood, stretchAndEat");
    store.run(delayed).await?;
    let neck = store.run(stretch).await?;
    println!("Neck after stretching: {neck:?}");
    println!("Stomach: {:?}", store.state(|s| s.stomach_contents.clone()));

    println!("\n>>> Requesting destiny twice while the first is in flight");
    let first = store.run(destiny);
    println!("Destiny loading: {}", store.state(|s| s.destiny.is_loading));
    let second = store.run(repeat).await?;
    println!("Second trigger result: {second:?}");
    println!("First trigger result: {:?}", first.await?);
    println!("Destiny: {}", serde_json::to_string(&store.state(|s| s.destiny.clone()))?);

    println!("\n>>> Requesting failure");
    if let Err(error) = store.run(failure).await {
        println!("Failure request rejected with: {error}");
    }
    println!("Failure: {}", serde_json::to_string(&store.state(|s| s.failure.clone()))?);
    println!("\nDispatches: {}", store.dispatch_count());

    println!("\n=== Combined ecosystem ===\n");

    let root = Arc::new(ecosystem()?);
    let herd = root
        .module(HERD)
        .ok_or_else(|| anyhow::anyhow!("herd module missing"))?;
    let graze = herd.action("graze", "fern")?;
    let migrate = root.thunk(HERD, "migrate", vec![json!(10)])?;
    let eco = Store::new(Arc::clone(&root));
    println!("Initial: {}", eco.get_state());

    println!("\n>>> Dispatching: {HERD}//graze");
    eco.dispatch(graze);
    println!("Meadow: {}", eco.state(|s| s[MEADOW].clone()));
    println!("Herd: {}", eco.state(|s| s[HERD].clone()));

    println!("\n>>> Running: {HERD}//migrate (join, then census)");
    let census = eco.run(migrate).await?;
    println!("Census result: {census:?}");
    println!("Herd: {}", eco.state(|s| s[HERD].clone()));

    println!("\n=== Example Complete ===");
    Ok(())
}
