//! Ingest PPG measurements from a device or a capture log

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ppgguard_connectors::mqtt::MEASURE_REQUEST;
use ppgguard_connectors::{
    AppConfig, CaptureLog, ConnectorError, ConnectorResult, IngestService, MqttConnector,
};
use ppgguard_core::{MeasureId, MeasurementStore, Pipeline, PipelineOutcome, SensorConfig};
use ppgguard_store::JsonFileStore;

#[derive(Parser)]
#[command(name = "ppgguard-ingest", version, about)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the store file from the configuration
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to the data topic and ingest every payload
    Listen {
        /// Switch the device to this configuration first (name or code)
        #[arg(long)]
        sensor_config: Option<SensorConfig>,
        /// Stop after this many payloads
        #[arg(long)]
        count: Option<u64>,
    },
    /// Request one measurement and ingest the reply
    Measure {
        /// IR channel only
        #[arg(long, conflicts_with = "command_topic")]
        ir_only: bool,
        /// Send the request on the command topic (older firmware)
        #[arg(long)]
        command_topic: bool,
        /// Configuration the device is currently in (name or code)
        #[arg(long, default_value = "Default")]
        sensor_config: SensorConfig,
        /// Seconds to wait for the reply
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Replay a capture log through the pipeline
    Replay {
        file: PathBuf,
        /// Every line instead of only the last
        #[arg(long)]
        all: bool,
    },
    /// List stored measurements
    List {
        #[arg(long)]
        sensor_config: Option<SensorConfig>,
    },
    /// Delete a stored measurement; later ids shift down
    Delete {
        #[arg(long)]
        sensor_config: SensorConfig,
        /// `measure_N`
        id: MeasureId,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> ConnectorResult<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file_with_env(path)?,
        None => AppConfig::from_env()?,
    };
    if let Some(path) = cli.store {
        config.storage.path = path;
    }

    let store = JsonFileStore::open(&config.storage.path)?;
    let pipeline = Pipeline::new(config.pipeline.clone());
    let mut service = IngestService::new(pipeline, store);

    match cli.cmd {
        Commands::Listen {
            sensor_config,
            count,
        } => block_on(listen(&config, &mut service, sensor_config, count)),
        Commands::Measure {
            ir_only,
            command_topic,
            sensor_config,
            timeout_secs,
        } => {
            service.set_active_config(sensor_config);
            let request = match (ir_only, command_topic) {
                (true, _) => Request::IrOnly,
                (false, true) => Request::Command,
                (false, false) => Request::Both,
            };
            block_on(measure(&config, &mut service, request, timeout_secs))
        }
        Commands::Replay { file, all } => {
            let log = CaptureLog::new(file);
            let payloads = if all {
                log.payloads()?
            } else {
                log.last_payload()?.into_iter().collect()
            };
            let accepted = service.handle_all(&payloads);
            println!("{accepted} of {} payload(s) accepted", payloads.len());
            Ok(())
        }
        Commands::List { sensor_config } => {
            let store = service.store();
            let configs = match sensor_config {
                Some(c) => vec![c],
                None => store.configs()?,
            };
            for config in configs {
                println!("{config}");
                for (id, m) in store.load_all(config)? {
                    println!(
                        "  {id:<12} {}  {:>5.1} s  {:>7.2} Hz",
                        m.captured_at(),
                        m.duration_secs(),
                        m.sampling_rate()
                    );
                }
            }
            Ok(())
        }
        Commands::Delete { sensor_config, id } => {
            service.store().delete(sensor_config, id)?;
            println!("Deleted {id} from '{sensor_config}'");
            Ok(())
        }
    }
}

fn block_on<F>(future: F) -> ConnectorResult<()>
where
    F: std::future::Future<Output = ConnectorResult<()>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| ConnectorError::Io {
            path: PathBuf::from("<runtime>"),
            source,
        })?
        .block_on(future)
}

async fn listen(
    config: &AppConfig,
    service: &mut IngestService<JsonFileStore>,
    sensor_config: Option<SensorConfig>,
    count: Option<u64>,
) -> ConnectorResult<()> {
    let mut mqtt = MqttConnector::new(config.mqtt.clone());
    mqtt.subscribe_data().await?;

    if let Some(target) = sensor_config {
        match config.sensor_parameters.setup_payload(target) {
            Some(setup) => {
                mqtt.configure_sensor(setup).await?;
                service.set_active_config(target);
            }
            None => log::warn!("No sensor parameters configured for '{}'", target),
        }
    }

    loop {
        tokio::select! {
            payload = mqtt.next_payload() => match payload {
                Ok(payload) => report(service.handle(&payload)),
                Err(e) => {
                    log::warn!("{}; retrying", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                break;
            }
        }
        if count.is_some_and(|n| service.stats().received >= n) {
            break;
        }
    }

    let stats = service.stats();
    log::info!(
        "{} received, {} accepted, {} rejected, {} undecodable, {} storage failures",
        stats.received,
        stats.accepted,
        stats.rejected,
        stats.decode_failures,
        stats.storage_failures
    );
    Ok(())
}

enum Request {
    Both,
    IrOnly,
    Command,
}

async fn measure(
    config: &AppConfig,
    service: &mut IngestService<JsonFileStore>,
    request: Request,
    timeout_secs: u64,
) -> ConnectorResult<()> {
    let mut mqtt = MqttConnector::new(config.mqtt.clone());
    mqtt.subscribe_data().await?;
    match request {
        Request::Both => mqtt.request_measure().await?,
        Request::IrOnly => mqtt.request_ir_measure().await?,
        Request::Command => mqtt.send_command(MEASURE_REQUEST).await?,
    }

    let payload = tokio::time::timeout(Duration::from_secs(timeout_secs), mqtt.next_payload())
        .await
        .map_err(|_| ConnectorError::Timeout(timeout_secs))??;
    report(service.handle(&payload));
    Ok(())
}

fn report(outcome: Option<PipelineOutcome>) {
    match outcome {
        Some(PipelineOutcome::Accepted { id, sensor_config }) => {
            println!("accepted: {id} under '{sensor_config}'")
        }
        Some(PipelineOutcome::Rejected { reason, .. }) => println!("rejected: {reason}"),
        None => println!("dropped"),
    }
}
