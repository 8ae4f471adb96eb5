use sonar_bands::api;
use sonar_bands::bus::OutputLine;
use sonar_bands::bus::indicators::IndicatorBank;
use sonar_bands::bus::sim::SimLine;
use sonar_bands::config::{self, Config, SensorMode};
use sonar_bands::control::{ControlLoop, spawn_control_thread};
use sonar_bands::error::AppError;
use sonar_bands::logger::DistanceLog;
use sonar_bands::sensor::Rangefinder;
use sonar_bands::sensor::sim::SimRangefinder;
use sonar_bands::state::{AppState, SharedState};
use std::fs::File;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;
use time::UtcOffset;
use tracing::{error, info, warn};

fn init_tracing(level: &str) {
    // Config validation has already rejected unknown levels.
    let max_level = level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(max_level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The local offset can only be read soundly while the process is single-threaded.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level());
    info!(
        app = %config.app.name,
        config_path = config::DEFAULT_CONFIG_PATH,
        "Ultrasonic sensor system starting"
    );
    if local_offset == UtcOffset::UTC {
        info!("Distance log timestamps use UTC");
    }

    // The shared slot must exist before either task starts.
    let state = AppState::shared();

    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let log = DistanceLog::open(config.log_path(), local_offset)?;
    info!(path = %config.log_path().display(), "Distance log opened");

    let stop = Arc::new(AtomicBool::new(false));
    let control_handle = start_control_loop(&config, log, &state, Arc::clone(&stop))?;

    info!(%addr, "API server listening");
    let served = api::serve_until(
        listener,
        Arc::clone(&state),
        shutdown_signal(),
        Arc::clone(&stop),
        api::DRAIN_TIMEOUT,
    )
    .await;

    match tokio::task::spawn_blocking(move || control_handle.join()).await {
        Ok(Ok(())) => info!("Control loop stopped"),
        Ok(Err(_)) => error!("Control thread panicked"),
        Err(err) => error!(error = %err, "Failed to join control thread"),
    }

    served?;
    info!("Exiting program");
    Ok(())
}

type Hardware = (
    Box<dyn Rangefinder + Send>,
    IndicatorBank<Box<dyn OutputLine + Send>>,
);

fn start_control_loop(
    config: &Config,
    log: DistanceLog<File>,
    state: &SharedState,
    stop: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, AppError> {
    let (rangefinder, indicators) = match config.sensor_mode() {
        SensorMode::Simulated => acquire_simulated()?,
        SensorMode::Gpio => acquire_gpio(config)?,
    };
    let control = ControlLoop::new(
        rangefinder,
        indicators,
        log,
        Arc::clone(state),
        config.interval(),
    );
    Ok(spawn_control_thread(control, stop))
}

fn acquire_simulated() -> Result<Hardware, AppError> {
    warn!("Running with simulated sensor and indicators");
    let indicators = IndicatorBank::<Box<dyn OutputLine + Send>>::new(
        Box::new(SimLine::new("near")),
        Box::new(SimLine::new("mid")),
        Box::new(SimLine::new("far")),
    )?;
    Ok((Box::new(SimRangefinder::new()), indicators))
}

#[cfg(target_os = "linux")]
fn acquire_gpio(config: &Config) -> Result<Hardware, AppError> {
    use sonar_bands::bus::rppal_lines::RppalGpio;
    use sonar_bands::sensor::HcSr04;

    let sensor_pins = config.sensor_pins();
    let indicator_pins = config.indicator_pins();
    let gpio = RppalGpio::new()?;

    let rangefinder = HcSr04::new(
        gpio.output(sensor_pins.trigger)?,
        gpio.input(sensor_pins.echo)?,
        config.echo_timeout(),
    )?;
    let indicators = IndicatorBank::<Box<dyn OutputLine + Send>>::new(
        Box::new(gpio.output(indicator_pins.near)?),
        Box::new(gpio.output(indicator_pins.mid)?),
        Box::new(gpio.output(indicator_pins.far)?),
    )?;
    info!(
        trigger = sensor_pins.trigger,
        echo = sensor_pins.echo,
        near = indicator_pins.near,
        mid = indicator_pins.mid,
        far = indicator_pins.far,
        echo_timeout_ms = config.echo_timeout().as_millis(),
        "GPIO lines acquired"
    );
    Ok((Box::new(rangefinder), indicators))
}

#[cfg(not(target_os = "linux"))]
fn acquire_gpio(_config: &Config) -> Result<Hardware, AppError> {
    Err(AppError::Gpio(
        "GPIO mode requires Linux/Raspberry Pi; set sensor.mode = \"simulated\"".to_string(),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal (Ctrl+C)"),
            Err(err) => {
                error!(error = %err, "Unable to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received shutdown signal (SIGTERM)");
            }
            Err(err) => {
                error!(error = %err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
