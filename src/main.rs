//! Demo runner for the dendra propagation tree.
//!
//! Runs a batch of propagation passes and reports what the root produced
//! each epoch, either as aligned text or as a JSON event stream.

use std::cell::RefCell;
use std::process;
use std::rc::Rc;

use dendra::observer::{TraceEvent, TreeAdapter};
use dendra::prelude::*;

struct DemoOptions {
    epochs: u32,
    depth: u32,
    seed: Option<u64>,
    goal: Option<Goal>,
    json: bool,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args
        .iter()
        .any(|a| a == "--help" || a == "-h" || a == "help")
    {
        print_help();
        return;
    }
    if args.first().map(String::as_str) == Some("grow-demo") {
        run_grow_demo();
        return;
    }

    let opts = match parse_options(&args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{msg}");
            print_help();
            process::exit(2);
        }
    };

    run_demo(&opts);
}

fn print_help() {
    println!("dendra (self-expanding signal-propagation tree)");
    println!("usage:");
    println!("  cargo run");
    println!("  cargo run -- --epochs 40 --depth 4 --seed 7");
    println!("  cargo run -- --goal chaos --json");
    println!("  cargo run -- grow-demo");
    println!("  cargo run -- --help");
    println!();
    println!("options:");
    println!("  --epochs N   propagation passes to run (default 40)");
    println!("  --depth D    depth limit (default 4; 0 makes the root its own leaf)");
    println!("  --seed S     fixed RNG seed for a reproducible run");
    println!("  --goal TAG   fixed goal: stability | chaos | inversion");
    println!("               (default: uniform draw; unrecognized tags learn toward 0.5)");
    println!("  --json       stream trace events as JSON lines");
}

fn parse_options(args: &[String]) -> Result<DemoOptions, String> {
    let mut opts = DemoOptions {
        epochs: 40,
        depth: 4,
        seed: None,
        goal: None,
        json: false,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--epochs" => opts.epochs = parse_value(args, &mut i, "--epochs")?,
            "--depth" => opts.depth = parse_value(args, &mut i, "--depth")?,
            "--seed" => opts.seed = Some(parse_value(args, &mut i, "--seed")?),
            "--goal" => {
                let tag: String = parse_value(args, &mut i, "--goal")?;
                opts.goal = Some(Goal::from_label(&tag));
            }
            "--json" => opts.json = true,
            other => return Err(format!("Unknown option: {other}")),
        }
        i += 1;
    }
    Ok(opts)
}

fn parse_value<T: std::str::FromStr>(
    args: &[String],
    i: &mut usize,
    flag: &str,
) -> Result<T, String> {
    *i += 1;
    let raw = args
        .get(*i)
        .ok_or_else(|| format!("{flag} needs a value"))?;
    raw.parse()
        .map_err(|_| format!("{flag}: invalid value '{raw}'"))
}

fn run_demo(opts: &DemoOptions) {
    let mut cfg = TreeConfig::default();
    cfg.seed = opts.seed;

    let mut tree = match PropagationTree::new(cfg) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("config error: {e}");
            process::exit(2);
        }
    };

    if opts.json {
        tree.set_sink(Box::new(|event: TraceEvent| {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
        }));
    }

    let mut policy = match opts.goal {
        Some(goal) => GoalPolicy::Fixed(goal),
        None => GoalPolicy::Uniform,
    };

    let records = match tree.run_epochs(opts.epochs, opts.depth, &mut policy) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("config error: {e}");
            process::exit(2);
        }
    };

    if !opts.json {
        for r in &records {
            println!(
                "epoch={:4} goal={:<9} output={:.4} mood={}",
                r.epoch,
                r.goal.as_label(),
                r.output,
                r.mood.as_label()
            );
        }
    }

    let diag = tree.diagnostics();
    if opts.json {
        if let Ok(line) = serde_json::to_string(&diag) {
            println!("{line}");
        }
    } else {
        println!(
            "nodes={} slots={} max_depth={}  moods: elated={} calm={} curious={} frustrated={}",
            diag.node_count,
            diag.slot_count,
            diag.max_depth,
            diag.elated,
            diag.calm,
            diag.curious,
            diag.frustrated
        );
    }
}

/// Showcase the growth rule.
///
/// An interior node whose children are themselves interior can never
/// land in the chaos success band (child outputs are positive, so its
/// own output stays above 0.6). The root therefore masters the chaos
/// band while the tree is shallow and its children are leaves, and the
/// banked elation turns into new slots once the passes go deeper.
fn run_grow_demo() {
    let cfg = TreeConfig::default().with_seed(7);
    let mut tree = match PropagationTree::new(cfg) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("config error: {e}");
            process::exit(2);
        }
    };

    let growth_count = Rc::new(RefCell::new(0u32));
    let counter = growth_count.clone();
    tree.set_sink(Box::new(move |event: TraceEvent| {
        if let TraceEvent::Growth {
            parent,
            child,
            weight,
        } = event
        {
            *counter.borrow_mut() += 1;
            println!("  grew {child} under {parent} (weight {weight:+.3})");
        }
    }));

    let mut policy = GoalPolicy::Fixed(Goal::Chaos);

    println!("phase 1: shallow passes until the root masters the chaos band");
    for block in 0..4 {
        if tree.run_epochs(80, 1, &mut policy).is_err() {
            eprintln!("run failed");
            process::exit(2);
        }
        let root_mood = tree
            .node(Coord::ROOT)
            .map(|n| n.mood.as_label())
            .unwrap_or("?");
        println!("  after {:3} epochs: root is {}", (block + 1) * 80, root_mood);
    }

    println!("phase 2: alternate shallow mastery with deeper passes");
    for cycle in 1..=6 {
        let shallow = tree.run_epochs(80, 1, &mut policy);
        let deep = tree.run_epochs(2, 4, &mut policy);
        if shallow.is_err() || deep.is_err() {
            eprintln!("run failed");
            process::exit(2);
        }
        let diag = tree.diagnostics();
        println!(
            "  cycle {cycle}: nodes={} slots={} root_slots={}",
            diag.node_count,
            diag.slot_count,
            tree.node(Coord::ROOT).map(|n| n.weights.len()).unwrap_or(0)
        );
    }

    println!();
    println!("total growth events: {}", growth_count.borrow());

    // Upper levels of the final shape.
    let snapshot = TreeAdapter::new(&tree).snapshot();
    for node in snapshot.nodes.iter().filter(|n| n.coord.depth <= 1) {
        println!(
            "{:>7}  mood={:<10} slots={} last_output={:.4}",
            node.coord.to_string(),
            node.mood.as_label(),
            node.weights.len(),
            node.last_output.unwrap_or(0.0)
        );
    }
}
