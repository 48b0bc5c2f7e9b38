//! Demo driver: runs the engine against the simulated agent at the
//! game tick rate until the user goal completes or ctrl-c.

use std::cell::Cell;
use std::rc::Rc;

use tracing::info;

use foreman::agent::sim::SimAgent;
use foreman::agent::types::BlockPos;
use foreman::catalogue::TaskCatalogue;
use foreman::chains::defense::MobDefenseChain;
use foreman::chains::food::FoodChain;
use foreman::chains::survival::WorldSurvivalChain;
use foreman::config;
use foreman::engine::chain::USER_CHAIN_NAME;
use foreman::{Runner, RunnerEvent};

/// A small survival scene: stone to mine, trees, a crafting table, and
/// some food in the pack.
fn seed_world(agent: &mut SimAgent) {
    agent
        .drops
        .insert("stone".to_string(), "cobblestone".to_string());
    for i in 0..12 {
        agent.set_block(BlockPos::new(4 + (i % 4), 64, 2 + (i / 4)), "stone");
    }
    for i in 0..4 {
        agent.set_block(BlockPos::new(-6, 64 + i, 4), "oak_log");
    }
    agent.set_block(BlockPos::new(2, 64, -3), "crafting_table");
    agent.give("bread", 3);
    agent.food_values.insert("bread".to_string(), 5);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let mut agent = SimAgent::new();
    seed_world(&mut agent);

    let catalogue = TaskCatalogue::with_default_tables();
    info!("catalogue knows {} obtainable items", catalogue.obtainable_items().len());
    match serde_json::to_string_pretty(&catalogue.derive_acquisition("torch")) {
        Ok(tree) => info!("torch acquisition tree:\n{tree}"),
        Err(e) => info!("derivation display failed: {e}"),
    }

    let mut runner = Runner::new();
    runner.register_chain(Box::new(FoodChain::new()));
    runner.register_chain(Box::new(MobDefenseChain::new()));
    runner.register_chain(Box::new(WorldSurvivalChain::new()));

    let done = Rc::new(Cell::new(false));
    let done_flag = Rc::clone(&done);
    runner.subscribe(Box::new(move |event| match event {
        RunnerEvent::ChainChanged { old, new } => info!(?old, %new, "chain changed"),
        RunnerEvent::TaskStarted { chain, task } => info!(%chain, %task, "task started"),
        RunnerEvent::TaskFinished {
            chain,
            task,
            failed,
        } => {
            info!(%chain, %task, failed, "task finished");
            if chain == USER_CHAIN_NAME {
                done_flag.set(true);
            }
        }
        RunnerEvent::Tick => {}
    }));

    let goal = catalogue.get_item_task(&agent, "cobblestone", 8);
    info!("user goal: {}", goal.display_name());
    runner.set_user_task(&mut agent, goal);
    runner.start();

    info!(
        "Tick rate: {} Hz ({}ms)",
        config::TICK_RATE,
        config::TICK_INTERVAL_MS
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_millis(config::TICK_INTERVAL_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }

        runner.tick(&mut agent);
        agent.step();

        if done.get() {
            info!(
                "Goal complete with {} cobblestone in the pack.",
                agent.count("cobblestone")
            );
            break;
        }
    }

    runner.stop();
}
