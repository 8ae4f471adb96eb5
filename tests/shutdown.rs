use sonar_bands::api;
use sonar_bands::bus::indicators::IndicatorBank;
use sonar_bands::bus::sim::SimLine;
use sonar_bands::control::{ControlLoop, spawn_control_thread};
use sonar_bands::error::AppError;
use sonar_bands::logger::DistanceLog;
use sonar_bands::sensor::mock::{MockEchoBehavior, MockRangefinder};
use sonar_bands::state::{AppState, ControlStatus};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use time::UtcOffset;
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_signal_releases_indicators_while_a_client_hangs()
-> Result<(), Box<dyn std::error::Error>> {
    let lines = [
        SimLine::new("near"),
        SimLine::new("mid"),
        SimLine::new("far"),
    ];
    let indicators = IndicatorBank::new(lines[0].clone(), lines[1].clone(), lines[2].clone())?;
    let rangefinder = MockRangefinder::new([])
        .with_fallback(MockEchoBehavior::Pulse(Duration::from_millis(1)));
    let state = AppState::shared();
    let control = ControlLoop::new(
        rangefinder,
        indicators,
        DistanceLog::new(Vec::new(), UtcOffset::UTC),
        Arc::clone(&state),
        Duration::from_millis(10),
    );
    let stop = Arc::new(AtomicBool::new(false));
    let control_handle = spawn_control_thread(control, Arc::clone(&stop));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !lines[1].is_high() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(lines[1].is_high());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (signal_tx, signal_rx) = oneshot::channel::<()>();
    let drain = Duration::from_secs(2);
    let server = tokio::spawn(api::serve_until(
        listener,
        Arc::clone(&state),
        async move {
            let _ = signal_rx.await;
        },
        Arc::clone(&stop),
        drain,
    ));

    // Request headers without the terminating blank line keep the connection open.
    let mut client = std::net::TcpStream::connect(addr)?;
    client.write_all(b"GET /distance HTTP/1.1\r\nHost: x\r\n")?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let signalled_at = Instant::now();
    let _ = signal_tx.send(());

    let deadline = Instant::now() + Duration::from_secs(1);
    while !control_handle.is_finished() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(stop.load(Ordering::Relaxed));
    assert!(control_handle.is_finished(), "control loop still running");
    assert!(!server.is_finished(), "server should still be draining");
    assert!(lines.iter().all(|line| !line.is_high()));

    control_handle
        .join()
        .map_err(|_| "control thread panicked")?;
    {
        let guard = state.read().map_err(|_| AppError::StateLock)?;
        assert_eq!(guard.status(), &ControlStatus::Stopped);
    }

    tokio::time::timeout(drain + Duration::from_secs(3), server).await???;
    assert!(signalled_at.elapsed() < drain + Duration::from_secs(3));
    drop(client);
    Ok(())
}
