use lossgate::discard::DiscardConfig;
use lossgate::metrics::{render_metrics, start_metrics_server, MetricsConfig};
use lossgate::sim::{start_group, SimNode};
use lossgate::stack::Message;
use std::net::SocketAddr;
use std::time::Duration;

const ROUNDS: usize = 200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔══════════════════════════════════════════════════════════════════╗");
    println!("║          lossgate - Group Fault Injection Simulation             ║");
    println!("╚══════════════════════════════════════════════════════════════════╝\n");

    // Optional metrics address: lossgate-sim 127.0.0.1:9090
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        let addr: SocketAddr = args[1].parse()?;
        start_metrics_server(MetricsConfig::with_addr(addr))?;
        println!("📈 Prometheus exporter listening on http://{}/metrics\n", addr);
    }

    let (network, nodes) = start_group(3, DiscardConfig::none())?;
    println!("🌐 Started {} nodes:", nodes.len());
    for node in &nodes {
        println!("   - {}", node.address);
    }

    // Scenario 1: lossy uplink on node-1
    println!("\n━━ Scenario 1: 20% upward loss on node-1 ━━");
    nodes[1].discard.set_up_rate(0.2);
    broadcast_rounds(&nodes[0], ROUNDS)?;
    report(&nodes);
    nodes[1].discard.set_up_rate(0.0);
    reset(&nodes);

    // Scenario 2: node-2 ignores node-0
    println!("\n━━ Scenario 2: node-2 ignores node-0 ━━");
    nodes[2].discard.add_ignored(nodes[0].address.clone());
    broadcast_rounds(&nodes[0], ROUNDS)?;
    broadcast_rounds(&nodes[1], ROUNDS)?;
    report(&nodes);
    nodes[2].discard.reset_ignored();
    reset(&nodes);

    // Scenario 3: exact drop budget
    println!("\n━━ Scenario 3: node-0 drops its next 5 multicasts ━━");
    nodes[0].discard.set_drop_down_multicasts(5);
    broadcast_rounds(&nodes[0], 10)?;
    report(&nodes);
    reset(&nodes);

    // Scenario 4: kill switch
    println!("\n━━ Scenario 4: node-0 partitioned ━━");
    let sent_before = network.stats().total_sent();
    nodes[0].discard.set_discard_all(true);
    broadcast_rounds(&nodes[0], 10)?;
    nodes[0].app.wait_for(10, Duration::from_secs(2)).await;
    report(&nodes);
    println!(
        "   network sends during partition: {}",
        network.stats().total_sent() - sent_before
    );
    nodes[0].discard.set_discard_all(false);

    if let Some(rendered) = render_metrics() {
        println!("\n📊 Metrics:\n{}", rendered);
    }

    println!("\n✅ Simulation complete");
    Ok(())
}

fn broadcast_rounds(sender: &SimNode, rounds: usize) -> Result<(), Box<dyn std::error::Error>> {
    for i in 0..rounds {
        sender.send(Message::multicast(format!("{}-{}", sender.address, i)))?;
    }
    Ok(())
}

fn report(nodes: &[SimNode]) {
    for node in nodes {
        println!(
            "   {:<8} delivered: {:>4}  |  {}",
            node.address.to_string(),
            node.app.delivered_count(),
            node.discard.stats().summary()
        );
    }
}

fn reset(nodes: &[SimNode]) {
    for node in nodes {
        node.app.clear();
        node.discard.reset_stats();
    }
}
