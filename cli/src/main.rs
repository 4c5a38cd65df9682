use cell_simulator_core_rs::{
    CellConfig, CombinedBilling, JobSource, Orchestrator, Pacer, RunEntry, StateSnapshot,
};
use std::error::Error;
use std::path::{Path, PathBuf};

struct Options {
    live: bool,
    config: Option<PathBuf>,
    state: Option<PathBuf>,
    command: Vec<String>,
}

fn print_usage(program: &str) {
    println!("Production cell simulator");
    println!("Usage:");
    println!("  {program} [flags] scenario-batch");
    println!("  {program} [flags] scenario-split");
    println!("  {program} [flags] direct <text> <site>");
    println!("  {program} [flags] batch <site> <text>...");
    println!("  {program} [flags] run <site>");
    println!("  {program} [flags] history [limit]");
    println!("  {program} defaults");
    println!("  {program} --help");
    println!();
    println!("Flags:");
    println!("  --live           pace ticks in real time instead of instantly");
    println!("  --config <path>  JSON cell configuration (defaults otherwise)");
    println!("  --state <path>   restore state from this file and save it back on exit");
    println!();
    println!("Set RUST_LOG=debug for per-leg detail.");
}

fn exit_with_usage(program: &str, message: &str) -> ! {
    eprintln!("{message}");
    print_usage(program);
    std::process::exit(2);
}

fn parse_options(program: &str, mut args: impl Iterator<Item = String>) -> Options {
    let mut options = Options {
        live: false,
        config: None,
        state: None,
        command: Vec::new(),
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--live" => options.live = true,
            "--config" => match args.next() {
                Some(path) => options.config = Some(PathBuf::from(path)),
                None => exit_with_usage(program, "--config needs a path"),
            },
            "--state" => match args.next() {
                Some(path) => options.state = Some(PathBuf::from(path)),
                None => exit_with_usage(program, "--state needs a path"),
            },
            "--help" | "-h" => {
                print_usage(program);
                std::process::exit(0);
            }
            _ => {
                options.command.push(arg);
                options.command.extend(args.by_ref());
            }
        }
    }
    options
}

fn load_config(path: Option<&Path>) -> Result<CellConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let config: CellConfig = serde_json::from_str(&text)?;
            config.validate()?;
            Ok(config)
        }
        None => Ok(CellConfig::default()),
    }
}

/// Write the snapshot to a sibling temp file, then rename it into place
fn save_state(cell: &Orchestrator, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = cell.snapshot()?.to_json()?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    log::info!("state saved to {}", path.display());
    Ok(())
}

fn print_run(entry: &RunEntry) {
    println!("run {}  [{:?}]  site {}", entry.run_id, entry.status, entry.site);
    if let Some(error) = &entry.error {
        println!("  error: {}", error);
    }
    if let Some(summary) = &entry.cycle_summary {
        println!("  reference  {}", summary.reference_id);
        for job in &summary.jobs {
            println!(
                "  job {:<14} {:>3} letters  {:>8.6} kWh  {:>10.6} {}",
                job.order_id, job.letter_count, job.billing.energy_kwh, job.billing.cost,
                summary.currency
            );
        }
        println!(
            "  engraver   {:.6} kWh  {:.6} g CO2  {:.6} {}",
            summary.engraver_energy_kwh,
            summary.engraver_co2_g,
            summary.engraver_cost,
            summary.currency
        );
        println!(
            "  transport  {:.6} m  {:.6} {}",
            summary.billed_distance_m, summary.transport_cost, summary.currency
        );
        println!("  total      {:.6} {}", summary.combined_cost, summary.currency);
        println!("  simulated  {:.1} s", summary.simulated_duration_s);
    }
}

fn print_combined(billing: &CombinedBilling) {
    println!(
        "billing ({:?}): {} job(s), {:.6} kWh, {:.6} m, total {:.6} {}",
        billing.origin,
        billing.job_count,
        billing.energy_kwh,
        billing.distance_m,
        billing.total_cost,
        billing.currency
    );
}

async fn execute(
    program: &str,
    cell: &Orchestrator,
    command: &[String],
) -> Result<(), Box<dyn Error>> {
    let mut args = command.iter().map(String::as_str);
    match args.next() {
        Some("scenario-batch") => {
            let entry = cell.run_batch_scenario()?.wait().await?;
            print_run(&entry);
        }
        Some("scenario-split") => {
            for entry in cell.run_split_scenario()?.wait().await? {
                print_run(&entry);
            }
        }
        Some("direct") => {
            let (Some(text), Some(site)) = (args.next(), args.next()) else {
                exit_with_usage(program, "direct needs <text> <site>");
            };
            let submission = cell.submit_direct(text, site)?;
            println!("order {}", submission.order_ids[0]);
            print_run(&submission.ticket.wait().await?);
        }
        Some("batch") => {
            let Some(site) = args.next() else {
                exit_with_usage(program, "batch needs <site> <text>...");
            };
            let texts: Vec<&str> = args.collect();
            let submission = cell.submit_batch(&texts, site)?;
            println!("orders {}", submission.order_ids.join(", "));
            print_run(&submission.ticket.wait().await?);
        }
        Some("run") => {
            let Some(site) = args.next() else {
                exit_with_usage(program, "run needs <site>");
            };
            let ticket = cell.trigger_cycle(site, None, JobSource::Direct)?;
            print_run(&ticket.wait().await?);
        }
        Some("history") => {
            let limit = args.next().and_then(|v| v.parse::<usize>().ok());
            println!("{}", cell.export_history_json(limit)?);
            return Ok(());
        }
        Some(other) => exit_with_usage(program, &format!("unknown command '{}'", other)),
        None => exit_with_usage(program, "missing command"),
    }

    print_combined(&cell.combined_billing());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "cell-sim".to_string());
    let options = parse_options(&program, std::env::args().skip(1));

    if options.command.first().map(String::as_str) == Some("defaults") {
        println!("{}", serde_json::to_string_pretty(&CellConfig::default())?);
        return Ok(());
    }

    let config = load_config(options.config.as_deref())?;
    let pacer = if options.live {
        Pacer::real_time()
    } else {
        Pacer::instant()
    };
    let cell = Orchestrator::with_pacer(config, pacer)?;

    if let Some(path) = options.state.as_deref().filter(|p| p.exists()) {
        let text = std::fs::read_to_string(path)?;
        let interrupted = cell.restore(StateSnapshot::from_json(&text)?).await?;
        log::info!(
            "restored state from {} ({} interrupted run(s))",
            path.display(),
            interrupted
        );
    }

    let outcome = execute(&program, &cell, &options.command).await;

    if let Some(path) = options.state.as_deref() {
        save_state(&cell, path)?;
    }
    outcome
}
