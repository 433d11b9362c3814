use robocycle_core::Diagnostics;
use robocycle_sim::{SimConfig, Simulation};

#[tokio::test]
async fn test_realtime_runs_requested_cycles() {
    let config = SimConfig {
        period_ms: 5,
        ..SimConfig::default()
    };
    let mut sim = Simulation::realtime(&config, &Diagnostics::silent()).unwrap();

    let summary = sim.run_realtime(4).await;

    assert_eq!(summary.cycles, 4);
    // Three gaps of at least one period each
    assert!(summary.elapsed_us >= 15_000);
}
