//! Demo driver: one baseline run with periodic aggregates, then a small
//! seed batch. Set RUST_LOG=debug for per-event detail.

use computer_industry::{run_batch, Model, SimParams, StatisticsRecorder};

fn main() {
    env_logger::init();

    let params = SimParams::computer_industry();
    let seed = 13;
    println!(
        "computer industry: {} periods, {} technologies, {} segments, seed {seed}",
        params.horizon,
        params.technologies.len(),
        params.user_classes.len()
    );

    let mut model = match Model::new(params.clone(), seed) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("invalid parameters: {err}");
            std::process::exit(1);
        }
    };

    let mut recorder = StatisticsRecorder::new();
    while model.time < model.params.horizon {
        model.step();
        recorder.record(&model);
        if model.time % 10 == 0 {
            report(recorder.last().expect("just recorded"));
        }
    }

    println!("\nbatch of 8 runs:");
    match run_batch(&params, 8, 100) {
        Ok(summaries) => {
            for s in summaries {
                println!(
                    "  seed {:>3}: {} firms alive, herfindahl {}",
                    s.seed,
                    s.alive_firms,
                    s.herfindahl
                        .iter()
                        .map(|h| format!("{h:.3}"))
                        .collect::<Vec<_>>()
                        .join(" / ")
                );
            }
        }
        Err(err) => {
            eprintln!("batch failed: {err}");
            std::process::exit(1);
        }
    }
}

fn report(row: &computer_industry::PeriodRecord) {
    let [first, second, diversified] = row.alive_by_generation;
    print!(
        "t={:>3}  alive {:>2} (1st {first}, 2nd {second}, div {diversified})",
        row.period, row.alive_firms
    );
    for class in &row.classes {
        print!(
            "  | {}: {} firms, size {:.0}, H {:.3}",
            class.label, class.serving_firms, class.size, class.herfindahl
        );
    }
    println!();
}
