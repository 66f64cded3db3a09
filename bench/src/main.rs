use std::time::Instant;

use graph_route_core::{props, Graph, Result, Route, RouteConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

type Generator = fn(u64) -> Result<Graph>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("all");
    let node_count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(200_000);

    if mode == "help" || mode == "--help" {
        println!("Usage: graph-route-bench [mode] [node_count]");
        println!();
        println!("Modes:");
        println!("  all         Run all generators and benchmark each (default)");
        println!("  lsystem     Fractal branching tree (deep paths)");
        println!("  scalefree   Preferential attachment via edge sampling (hub-and-spoke)");
        println!("  random      Erdos-Renyi uniform random edges");
        println!();
        println!("Default node_count: 200000");
        println!("Set RUST_LOG=graph_route_core=debug to see route descriptions.");
        return;
    }

    println!("graph-route-bench");
    println!("=================");
    println!();

    let generators: Vec<(&str, Generator)> = match mode {
        "lsystem" => vec![("L-system tree", gen_lsystem)],
        "scalefree" => vec![("Scale-free (edge sampling)", gen_scale_free)],
        "random" => vec![("Erdos-Renyi random", gen_random)],
        "all" => vec![
            ("L-system tree", gen_lsystem as Generator),
            ("Scale-free (edge sampling)", gen_scale_free),
            ("Erdos-Renyi random", gen_random),
        ],
        _ => {
            eprintln!("Unknown mode: {}. Use --help for options.", mode);
            return;
        }
    };

    for (name, generator) in generators {
        if let Err(e) = run_benchmark(name, generator, node_count) {
            error!(generator = name, error = %e, "benchmark failed");
            eprintln!("{}: {}", name, e);
        }
    }
}

fn run_benchmark(name: &str, generator: Generator, node_count: u64) -> Result<()> {
    println!("--- {} ---", name);
    println!("Target: {} vertices", node_count);

    let t = Instant::now();
    let graph = generator(node_count)?;
    let gen_time = t.elapsed();
    info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "graph generated"
    );
    println!(
        "Generated in {:.2}s, {} vertices, {} edges, ~{:.0}MB",
        gen_time.as_secs_f64(),
        graph.vertex_count(),
        graph.edge_count(),
        graph.memory_usage() as f64 / 1_048_576.0
    );

    // Expansion from vertex 0 (typically a hub or root)
    println!();
    println!("{:>8} {:>12} {:>10}", "depth", "reached", "time");
    println!("{:->8} {:->12} {:->10}", "", "", "");

    for depth in [1, 2, 3] {
        let route = graph
            .v()
            .at(0)
            .repeat(depth, |r| r.out_edges(&[]).in_vertex())?;
        let (count, elapsed) = time(&route)?;
        println!("{:>8} {:>12} {:>8.1}ms", depth, count, elapsed);
    }

    let hub = graph.v().at(0);
    let pipelines: Vec<(&str, Route<'_>)> = vec![
        ("one hop, all vertices", graph.v().out_edges(&[]).in_vertex()),
        ("one hop, unique", graph.v().out_edges(&[]).in_vertex().unique()),
        ("label filter", graph.v().out_edges(&["IMPLIES"])),
        ("property filter", graph.v().has("kind", "Leaf")),
        (
            "branch, round-robin",
            graph
                .v()
                .branch(|b| b.out_edges(&["IMPLIES"]).in_vertex())?
                .branch(|b| b.out_edges(&["SUPPORTS"]).in_vertex())?,
        ),
        (
            "branch, exhaustive",
            graph
                .v()
                .branch(|b| b.out_edges(&["IMPLIES"]).in_vertex())?
                .branch(|b| b.out_edges(&["SUPPORTS"]).in_vertex())?
                .exhaustive(),
        ),
        (
            "sample p=0.01",
            graph
                .v()
                .with_config(RouteConfig::default().with_seed(7))?
                .sample_probability(0.01)?,
        ),
        ("two hops from hub", hub.repeat(2, |r| r.out_edges(&[]).in_vertex())?),
    ];

    println!();
    println!("{:>24} {:>12} {:>10}", "pipeline", "results", "time");
    println!("{:->24} {:->12} {:->10}", "", "", "");
    for (label, route) in &pipelines {
        let (count, elapsed) = time(route)?;
        println!("{:>24} {:>12} {:>8.1}ms", label, count, elapsed);
    }

    // Paths and subgraph over the hub's two-hop neighborhood
    let paths = hub.out_edges(&[]).in_vertex().out_edges(&[]).in_vertex().paths();
    let t = Instant::now();
    let recorded = paths.to_vec()?;
    let paths_ms = t.elapsed().as_secs_f64() * 1000.0;
    let t = Instant::now();
    let sub = paths.subgraph()?;
    let sub_ms = t.elapsed().as_secs_f64() * 1000.0;
    println!();
    println!("Paths from vertex 0 (2 hops): {} in {:.1}ms", recorded.len(), paths_ms);
    println!(
        "Subgraph: {} vertices, {} edges in {:.1}ms",
        sub.vertex_count(),
        sub.edge_count(),
        sub_ms
    );
    println!();
    Ok(())
}

/// Drain `route`, returning the result count and elapsed milliseconds.
fn time(route: &Route<'_>) -> Result<(usize, f64)> {
    let t = Instant::now();
    let count = route.count()?;
    Ok((count, t.elapsed().as_secs_f64() * 1000.0))
}

// ---------------------------------------------------------------------------
// Generators: all O(n) or O(n + edges), single-threaded, deterministic
// ---------------------------------------------------------------------------

/// Simple LCG for deterministic, fast pseudo-random numbers.
struct FastRng(u64);

impl FastRng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next(&mut self, max: u64) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 33) % max
    }
}

const LABELS: [&str; 5] = ["IMPLIES", "SUPPORTS", "CONTRADICTS", "RELATED_TO", "REQUIRES"];

fn add_vertex(graph: &mut Graph, id: u64, kind: &str) -> Result<()> {
    graph.add_vertex(id, props([("kind", kind)]))?;
    Ok(())
}

fn add_edge(graph: &mut Graph, rng: &mut FastRng, id: &mut u64, tail: u64, head: u64) -> Result<()> {
    let label = LABELS[rng.next(LABELS.len() as u64) as usize];
    graph.add_edge(*id, tail, head, label, props([("weight", rng.next(100) as i64)]))?;
    *id += 1;
    Ok(())
}

/// L-system fractal tree: deep branching with self-similar structure.
///
/// Each vertex spawns three children. Produces deep paths (log depth) with
/// exponential width; leaves carry `kind = "Leaf"`.
fn gen_lsystem(node_count: u64) -> Result<Graph> {
    let mut graph = Graph::with_capacity(node_count as usize, node_count as usize);
    let mut rng = FastRng::new(42);
    let mut edge_id = 0u64;

    let branching = 3u64;
    add_vertex(&mut graph, 0, "Root")?;

    let mut next_id: u64 = 1;
    let mut frontier: Vec<u64> = vec![0];

    while next_id < node_count && !frontier.is_empty() {
        let mut next_frontier = Vec::with_capacity(frontier.len() * branching as usize);
        for &parent in &frontier {
            for _ in 0..branching {
                if next_id >= node_count {
                    break;
                }
                let child = next_id;
                next_id += 1;
                let kind = if child * branching + 1 >= node_count { "Leaf" } else { "Concept" };
                add_vertex(&mut graph, child, kind)?;
                add_edge(&mut graph, &mut rng, &mut edge_id, parent, child)?;
                next_frontier.push(child);
            }
        }
        frontier = next_frontier;
    }

    Ok(graph)
}

/// Scale-free via edge-list sampling (O(edges), not O(n²)).
///
/// Preferential attachment by picking a random existing edge and connecting
/// to one of its endpoints. Vertices with more edges are more likely to be picked.
fn gen_scale_free(node_count: u64) -> Result<Graph> {
    let edges_per_node = 10u64;
    let mut graph = Graph::with_capacity(node_count as usize, (node_count * edges_per_node) as usize);
    let mut rng = FastRng::new(12345);
    let mut edge_id = 0u64;

    // Edge list for O(1) preferential attachment sampling
    let mut edge_endpoints: Vec<u64> = Vec::with_capacity((node_count * edges_per_node * 2) as usize);

    // Seed: small clique
    let seed = 5u64.min(node_count);
    for i in 0..seed {
        add_vertex(&mut graph, i, "Hub")?;
    }
    for i in 0..seed {
        for j in (i + 1)..seed {
            add_edge(&mut graph, &mut rng, &mut edge_id, i, j)?;
            edge_endpoints.push(i);
            edge_endpoints.push(j);
        }
    }

    // Grow: each new vertex attaches to `edges_per_node` existing vertices
    for new_node in seed..node_count {
        add_vertex(&mut graph, new_node, "Leaf")?;

        let attach = edges_per_node.min(new_node);
        for _ in 0..attach {
            // Pick a random endpoint from the edge list, proportional to degree
            let idx = rng.next(edge_endpoints.len() as u64) as usize;
            let target = edge_endpoints[idx];
            if target != new_node {
                add_edge(&mut graph, &mut rng, &mut edge_id, new_node, target)?;
                edge_endpoints.push(new_node);
                edge_endpoints.push(target);
            }
        }
    }

    Ok(graph)
}

/// Erdos-Renyi: uniform random edges.
///
/// Targets ~10 edges per vertex on average. Baseline topology with no structure.
fn gen_random(node_count: u64) -> Result<Graph> {
    let target_edges = node_count * 10;
    let mut graph = Graph::with_capacity(node_count as usize, target_edges as usize);
    let mut rng = FastRng::new(54321);
    let mut edge_id = 0u64;

    for i in 0..node_count {
        let kind = if rng.next(4) == 0 { "Leaf" } else { "Concept" };
        add_vertex(&mut graph, i, kind)?;
    }

    for _ in 0..target_edges {
        let from = rng.next(node_count);
        let to = rng.next(node_count);
        if from != to {
            add_edge(&mut graph, &mut rng, &mut edge_id, from, to)?;
        }
    }

    Ok(graph)
}
