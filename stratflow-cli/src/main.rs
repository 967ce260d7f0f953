//! StratFlow CLI — scaffold, validate, render, and inspect strategy
//! documents.
//!
//! Commands:
//! - `new` — scaffold a demo strategy document and save it
//! - `validate` — structural audit of a saved document
//! - `render` — print every node with its condition text
//! - `positions` — recompute and list the virtual positions
//! - `fingerprint` — print the document's structural hash

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use stratflow_core::expr::{
    group_condition_to_string, CompareOp, Condition, ConditionNode, Expression, GroupCondition,
    GroupLogic,
};
use stratflow_core::graph::{
    is_acyclic, unreachable_from_start, GraphEditor, NodeData, NodeKind, NodePatch, RawPosition,
    ReEntryConfig, StrategyGraph,
};
use stratflow_core::persist::{JsonFileStore, StrategyDoc, StrategyStore};
use stratflow_core::positions::VirtualPositionStore;

#[derive(Parser)]
#[command(name = "stratflow", about = "StratFlow CLI — strategy graph tooling")]
struct Cli {
    /// Directory holding strategy documents.
    #[arg(long, default_value = "strategies", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a demo strategy (signal → entry → exit with re-entry) and save it.
    New {
        /// Document id (filename stem).
        id: String,

        /// Display name stored in the document.
        #[arg(long, default_value = "Demo strategy")]
        name: String,
    },
    /// Audit a saved document: start node, edge endpoints, acyclicity,
    /// reachability from the start node.
    Validate { id: String },
    /// Print each node and its rendered condition text.
    Render { id: String },
    /// Recompute and list the virtual positions declared by entry nodes.
    Positions { id: String },
    /// Print the document's structural fingerprint.
    Fingerprint { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let store = JsonFileStore::new(&cli.dir);

    match cli.command {
        Commands::New { id, name } => cmd_new(&store, &id, &name),
        Commands::Validate { id } => cmd_validate(&store, &id),
        Commands::Render { id } => cmd_render(&store, &id),
        Commands::Positions { id } => cmd_positions(&store, &id),
        Commands::Fingerprint { id } => {
            let doc = load(&store, &id)?;
            println!("{}", doc.fingerprint());
            Ok(())
        }
    }
}

fn load(store: &JsonFileStore, id: &str) -> Result<StrategyDoc> {
    store
        .load(id)
        .with_context(|| format!("no strategy document with id '{}'", id))
}

/// Build the demo graph: start → entry signal → entry, entry → exit signal
/// → exit, with re-entry enabled on the exit (which synthesizes the retry
/// subgraph and its dashed link back to the entry node).
fn cmd_new(store: &JsonFileStore, id: &str, name: &str) -> Result<()> {
    let mut editor = GraphEditor::new();
    let now = Instant::now();

    let start = editor
        .graph()
        .first_of_kind(NodeKind::Start)
        .context("fresh graph is missing its start node")?
        .id;
    let signal = editor.add_node(NodeKind::EntrySignal, Some(start), now)?;
    let entry = editor.add_node(NodeKind::Entry, Some(signal), now)?;
    let exit_signal = editor.add_node(NodeKind::ExitSignal, Some(entry), now)?;
    let exit = editor.add_node(NodeKind::Exit, Some(exit_signal), now)?;

    editor.connect(start, signal, now)?;
    editor.connect(signal, entry, now)?;
    editor.connect(entry, exit_signal, now)?;
    editor.connect(exit_signal, exit, now)?;

    // RSI(14) < 30: a plain oversold entry condition.
    let condition = {
        let ids = editor.id_gen_mut();
        let lhs = Expression::indicator("RSI", Some("14".to_string()), ids);
        let rhs = Expression::number(30.0, ids);
        let c = Condition::new(lhs, CompareOp::Lt, rhs, ids);
        GroupCondition::new(GroupLogic::And, vec![ConditionNode::Single(c)], ids)
    };
    editor.update_node_data(signal, NodePatch::conditions(condition), now)?;
    editor.update_node_data(entry, NodePatch::positions(vec![RawPosition::buy(1)]), now)?;
    editor.update_node_data(
        exit,
        NodePatch::re_entry(ReEntryConfig {
            enabled: true,
            group_number: 1,
            max_re_entries: 2,
        }),
        now,
    )?;

    let doc = StrategyDoc {
        name: name.to_string(),
        nodes: editor.graph().nodes().to_vec(),
        edges: editor.graph().edges().to_vec(),
    };
    if !store.save(id, &doc) {
        bail!("failed to save strategy '{}'", id);
    }
    println!(
        "saved '{}' ({} nodes, {} edges, fingerprint {})",
        id,
        doc.nodes.len(),
        doc.edges.len(),
        &doc.fingerprint()[..16]
    );
    Ok(())
}

fn cmd_validate(store: &JsonFileStore, id: &str) -> Result<()> {
    let doc = load(store, id)?;
    let graph = StrategyGraph::from_parts(doc.nodes, doc.edges);

    let starts = graph
        .nodes()
        .iter()
        .filter(|n| n.kind() == NodeKind::Start)
        .count();
    if starts != 1 {
        bail!("expected exactly one start node, found {}", starts);
    }

    for edge in graph.edges() {
        if graph.node(edge.source).is_none() || graph.node(edge.target).is_none() {
            bail!("edge {} references a nonexistent node", edge.id);
        }
    }

    if !is_acyclic(&graph) {
        bail!("graph contains a cycle");
    }

    let orphans = unreachable_from_start(&graph);
    if !orphans.is_empty() {
        let ids: Vec<String> = orphans.iter().map(|id| id.to_string()).collect();
        bail!(
            "{} node(s) unreachable from the start node: {}",
            orphans.len(),
            ids.join(", ")
        );
    }

    println!(
        "ok: {} nodes, {} edges, single start, acyclic, fully reachable",
        graph.nodes().len(),
        graph.edges().len()
    );
    Ok(())
}

fn cmd_render(store: &JsonFileStore, id: &str) -> Result<()> {
    let doc = load(store, id)?;
    println!("{}", doc.name);
    for node in &doc.nodes {
        let text = match &node.data {
            NodeData::EntrySignal { conditions } | NodeData::ExitSignal { conditions } => {
                group_condition_to_string(conditions)
            }
            NodeData::Entry { positions, .. } => format!("{} position(s)", positions.len()),
            NodeData::Modify { modifications, .. } => {
                format!("{} modification(s)", modifications.len())
            }
            NodeData::Exit { re_entry, .. } => match re_entry {
                Some(r) if r.enabled => format!(
                    "re-entry enabled (group {}, max {})",
                    r.group_number, r.max_re_entries
                ),
                _ => "re-entry disabled".to_string(),
            },
            NodeData::Alert { message } => message.clone(),
            NodeData::Start | NodeData::End => String::new(),
            NodeData::Retry { group_number } => format!("group {}", group_number),
        };
        println!("  {:>4}  {:<12} {}", node.id.to_string(), format!("{:?}", node.kind()), text);
    }
    Ok(())
}

fn cmd_positions(store: &JsonFileStore, id: &str) -> Result<()> {
    let doc = load(store, id)?;
    let graph = StrategyGraph::from_parts(doc.nodes, doc.edges);
    let mut positions = VirtualPositionStore::new();
    positions.recompute(&graph);

    if positions.is_empty() {
        println!("no positions declared");
        return Ok(());
    }
    for p in positions.positions() {
        println!(
            "vpi {:>3}  {:?} {:?} x{} lots  (priority {}, source {})",
            p.vpi, p.position_type, p.order_type, p.lots, p.priority, p.source_node
        );
    }
    Ok(())
}
