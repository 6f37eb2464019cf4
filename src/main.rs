use::std::env;
use::std::process;
use::std::time::Duration;

use concurrent_ledger::{CancellationToken, LedgerResult, Runner, Scenario, TransferCoordinator};
use log::info;

fn main() {
    // No arguments runs the built-in demo; otherwise an accounts file, an operations file
    // and an optional deadline in milliseconds
    let args: Vec<String> = env::args().collect();
    let (scenario, deadline) = match args.len() {
        1 => (Scenario::demo(), None),
        3 | 4 => {
            let deadline = match args.get(3).map(|ms| ms.parse::<u64>()) {
                Some(Ok(ms)) => Some(Duration::from_millis(ms)),
                Some(Err(e)) => {
                    eprintln!("Error: invalid deadline {:?}: {}", args[3], e);
                    process::exit(1);
                }
                None => None,
            };
            (Scenario::from_csv(&args[1], &args[2]), deadline)
        }
        _ => {
            eprintln!("Usage: {} [<accounts.csv> <operations.csv> [deadline_ms]]", args[0]);
            process::exit(1);
        }
    };
    // Initialize logger (respect RUST_LOG env var if set)
    env_logger::init();

    if let Err(e) = scenario.and_then(|scenario| run(scenario, deadline)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(scenario: Scenario, deadline: Option<Duration>) -> LedgerResult<()> {
    println!("=== Initial Account Balances ===");
    for account in &scenario.accounts {
        println!("{}", account);
    }

    let mut runner = Runner::new(TransferCoordinator::default());
    if let Some(deadline) = deadline {
        runner = runner.with_deadline(deadline);
    }

    info!("starting {} workers", scenario.workers.len());
    let report = runner.run(&scenario.accounts, scenario.workers, &CancellationToken::new())?;

    for name in report.interrupted_workers() {
        info!("{} stopped before finishing its script", name);
    }

    println!("\n=== Final Account Balances ===");
    report.write_csv(std::io::stdout())?;
    Ok(())
}
